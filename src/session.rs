use crate::rep_counter::{RepTally, Stage};

/// Status label shown next to the counter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    /// Running, no person seen yet
    Searching,
    Calibrated,
    Recalibrating,
    CameraOff,
    CaptureFailed(String),
    /// Recording ran out of frames
    InputEnded,
}

impl Status {
    pub fn label(&self) -> String {
        match self {
            Status::Idle => "PRESS START".to_string(),
            Status::Searching => "CALIBRATING...".to_string(),
            Status::Calibrated => "CALIBRATED".to_string(),
            Status::Recalibrating => "RE-CALIBRATING...".to_string(),
            Status::CameraOff => "CAMERA OFF".to_string(),
            Status::CaptureFailed(reason) => format!("CAMERA ERROR: {reason}"),
            Status::InputEnded => "INPUT ENDED".to_string(),
        }
    }
}

/// All mutable state of the single active workout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub tally: RepTally,
    pub is_calibrated: bool,
    pub is_running: bool,
    pub elapsed_seconds: u64,
    /// Remaining travel to the top, 0-100
    pub progress: f64,
    /// Last measured joint angle, `None` when unmeasurable
    pub last_angle: Option<f64>,
    pub status: Status,
    /// Frames the capture worker discarded because one was still in flight
    pub dropped_frames: u64,
}

impl SessionState {
    pub fn rep_count(&self) -> u32 {
        self.tally.rep_count
    }

    pub fn stage(&self) -> Stage {
        self.tally.stage
    }

    pub fn has_reached_bottom(&self) -> bool {
        self.tally.has_reached_bottom
    }
}
