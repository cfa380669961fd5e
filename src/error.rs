use thiserror::Error;

/// Failures opening or reading a pose source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("pose source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid CSV record: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed frame {frame}: {reason}")]
    Malformed { frame: usize, reason: String },
}

/// An exercise id outside the fixed catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown exercise '{id}' (expected one of: {expected})")]
pub struct UnknownExercise {
    pub id: String,
    pub expected: String,
}
