//! Pose sources stand in for the camera and the pose engine together:
//! each call yields the engine's result for the next captured frame.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use clap::ValueEnum;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::config::PoseEngineOptions;
use crate::error::SourceError;
use crate::exercise::Exercise;
use crate::landmark::{Landmark, Pose, PoseResult, POSE_LANDMARK_COUNT};

pub trait PoseSource: Send + 'static {
    /// Result for the next frame, or `Ok(None)` once the stream is over.
    fn next_result(&mut self) -> Result<Option<PoseResult>, SourceError>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RecordingFormat {
    Jsonl,
    Csv,
}

/// Where frames come from. Opened afresh on every start.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSpec {
    Synthetic { seed: Option<u64> },
    Recording {
        path: PathBuf,
        format: RecordingFormat,
    },
}

impl InputSpec {
    /// Guess the format from the file extension, defaulting to JSON lines.
    pub fn recording(path: PathBuf, format: Option<RecordingFormat>) -> Self {
        let format = format.unwrap_or_else(|| {
            match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("csv") => RecordingFormat::Csv,
                _ => RecordingFormat::Jsonl,
            }
        });
        InputSpec::Recording { path, format }
    }

    pub fn open(&self, engine: &PoseEngineOptions) -> Result<Box<dyn PoseSource>, SourceError> {
        match self {
            InputSpec::Synthetic { seed } => {
                let rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(*seed),
                    None => StdRng::from_entropy(),
                };
                Ok(Box::new(SyntheticSource::new(rng)))
            }
            InputSpec::Recording { path, format } => {
                let file = File::open(path)?;
                let min_score = engine.min_detection_confidence;
                Ok(match format {
                    RecordingFormat::Jsonl => {
                        Box::new(JsonLinesSource::new(BufReader::new(file), min_score))
                    }
                    RecordingFormat::Csv => Box::new(CsvSource::new(file)),
                })
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            InputSpec::Synthetic { .. } => "synthetic".to_string(),
            InputSpec::Recording { path, format } => format!("{} ({format})", path.display()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FrameRecord {
    landmarks: Option<Vec<Landmark>>,
    score: Option<f64>,
}

/// One JSON object per line:
/// `{"landmarks":[{"x":0.4,"y":0.3}, ...], "score":0.9}` or
/// `{"landmarks":null}` when nobody was detected.
pub struct JsonLinesSource<R> {
    reader: R,
    line: usize,
    min_score: f64,
    buf: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R, min_score: f64) -> Self {
        Self {
            reader,
            line: 0,
            min_score,
            buf: String::new(),
        }
    }
}

impl<R: BufRead + Send + 'static> PoseSource for JsonLinesSource<R> {
    fn next_result(&mut self) -> Result<Option<PoseResult>, SourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            let record: FrameRecord = serde_json::from_str(text).map_err(|source| {
                SourceError::Json {
                    line: self.line,
                    source,
                }
            })?;

            if let Some(landmarks) = &record.landmarks {
                ensure_finite(landmarks, self.line)?;
            }

            let below_confidence = record.score.is_some_and(|s| s < self.min_score);
            return Ok(Some(match record.landmarks {
                Some(landmarks) if !landmarks.is_empty() && !below_confidence => {
                    PoseResult::Detected(Pose::new(landmarks))
                }
                _ => PoseResult::NotDetected,
            }));
        }
    }
}

fn ensure_finite(landmarks: &[Landmark], frame: usize) -> Result<(), SourceError> {
    let bad = landmarks
        .iter()
        .position(|lm| ![lm.x, lm.y, lm.z, lm.visibility].iter().all(|v| v.is_finite()));
    match bad {
        Some(index) => Err(SourceError::Malformed {
            frame,
            reason: format!("landmark {index} has a non-finite coordinate"),
        }),
        None => Ok(()),
    }
}

/// One record per frame with flattened coordinates: stride 2 (x,y),
/// 3 (x,y,z) or 4 (x,y,z,visibility). An empty record means nobody was
/// detected.
pub struct CsvSource<R> {
    records: csv::StringRecordsIntoIter<R>,
    frame: usize,
}

impl<R: Read> CsvSource<R> {
    pub fn new(reader: R) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader)
            .into_records();
        Self { records, frame: 0 }
    }
}

impl<R: Read + Send + 'static> PoseSource for CsvSource<R> {
    fn next_result(&mut self) -> Result<Option<PoseResult>, SourceError> {
        let Some(record) = self.records.next() else {
            return Ok(None);
        };
        let record = record?;
        self.frame += 1;

        let values = record
            .iter()
            .filter(|field| !field.is_empty())
            .map(|field| match field.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                Ok(_) => Err(SourceError::Malformed {
                    frame: self.frame,
                    reason: format!("'{field}' is not a finite coordinate"),
                }),
                Err(e) => Err(SourceError::Malformed {
                    frame: self.frame,
                    reason: format!("'{field}': {e}"),
                }),
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if values.is_empty() {
            return Ok(Some(PoseResult::NotDetected));
        }

        let stride = [4, 3, 2]
            .into_iter()
            .find(|s| values.len() == s * POSE_LANDMARK_COUNT)
            .or_else(|| [2, 3, 4].into_iter().find(|s| values.len() % s == 0))
            .ok_or_else(|| SourceError::Malformed {
                frame: self.frame,
                reason: format!("{} values do not form whole landmarks", values.len()),
            })?;

        let landmarks = values
            .chunks_exact(stride)
            .map(|c| Landmark {
                x: c[0],
                y: c[1],
                z: c.get(2).copied().unwrap_or(0.0),
                visibility: c.get(3).copied().unwrap_or(1.0),
            })
            .collect();
        Ok(Some(PoseResult::Detected(Pose::new(landmarks))))
    }
}

/// Neutral standing pose, mirrored left/right, used as the body around
/// the animated joint.
const STANDING: [(f64, f64); POSE_LANDMARK_COUNT] = [
    (0.50, 0.12), // nose
    (0.49, 0.10),
    (0.48, 0.10),
    (0.47, 0.10),
    (0.51, 0.10),
    (0.52, 0.10),
    (0.53, 0.10),
    (0.45, 0.11),
    (0.55, 0.11),
    (0.49, 0.14),
    (0.51, 0.14),
    (0.42, 0.22), // left shoulder
    (0.58, 0.22),
    (0.40, 0.35), // left elbow
    (0.60, 0.35),
    (0.39, 0.47), // left wrist
    (0.61, 0.47),
    (0.38, 0.49),
    (0.62, 0.49),
    (0.38, 0.50),
    (0.62, 0.50),
    (0.39, 0.49),
    (0.61, 0.49),
    (0.45, 0.50), // left hip
    (0.55, 0.50),
    (0.45, 0.68), // left knee
    (0.55, 0.68),
    (0.45, 0.86), // left ankle
    (0.55, 0.86),
    (0.44, 0.88),
    (0.56, 0.88),
    (0.47, 0.90),
    (0.53, 0.90),
];

/// Frames per simulated rep
const REP_FRAMES: f64 = 75.0;
/// Chance per frame of starting a detection dropout
const DROPOUT_CHANCE: f64 = 0.004;
const DROPOUT_FRAMES: std::ops::Range<u32> = 5..25;
/// Angle noise, degrees either side
const JITTER_DEG: f64 = 3.0;

/// Animates every catalog joint through full excursions at once, with
/// jitter and the occasional detection dropout, so any selected exercise
/// sees reps.
pub struct SyntheticSource {
    rng: StdRng,
    frame: u64,
    dropout_left: u32,
}

impl SyntheticSource {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            frame: 0,
            dropout_left: 0,
        }
    }

    /// Angle range swept by a joint, wide enough for every exercise that
    /// measures it.
    fn sweep(landmarks: [usize; 3]) -> (f64, f64) {
        Exercise::ALL
            .iter()
            .map(|e| e.profile())
            .filter(|p| p.landmarks == landmarks)
            .fold((180.0_f64, 0.0_f64), |(low, high), p| {
                (
                    low.min((p.thresholds.down - 15.0).max(5.0)),
                    high.max((p.thresholds.up + 12.0).min(179.0)),
                )
            })
    }

    /// Noise-free angle of the exercise's joint for a frame, starting at
    /// the top.
    pub fn target_angle(exercise: Exercise, frame: u64) -> f64 {
        let (low, high) = Self::sweep(exercise.profile().landmarks);
        let phase = (frame as f64 / REP_FRAMES) * std::f64::consts::TAU;
        let mid = (low + high) / 2.0;
        let amplitude = (high - low) / 2.0;
        mid + amplitude * phase.cos()
    }

    fn pose_at(&mut self, frame: u64) -> Pose {
        let mut landmarks: Vec<Landmark> =
            STANDING.iter().map(|&(x, y)| Landmark::new(x, y)).collect();

        for exercise in Exercise::ALL.iter().unique_by(|e| e.profile().landmarks) {
            let [proximal, joint, distal] = exercise.profile().landmarks;
            let noise = self.rng.gen_range(-JITTER_DEG..=JITTER_DEG);
            let angle = (Self::target_angle(*exercise, frame) + noise).clamp(0.0, 180.0);

            let a = landmarks[proximal];
            let b = landmarks[joint];
            let (ux, uy) = (a.x - b.x, a.y - b.y);
            let len = (ux * ux + uy * uy).sqrt();
            let rad = angle.to_radians();
            // Rotate the joint→proximal ray by the angle to place the distal end
            let (rx, ry) = (
                ux * rad.cos() - uy * rad.sin(),
                ux * rad.sin() + uy * rad.cos(),
            );
            let scale = if len > 0.0 { 0.12 / len } else { 0.0 };
            landmarks[distal] = Landmark::new(b.x + rx * scale, b.y + ry * scale);
        }
        Pose::new(landmarks)
    }
}

impl PoseSource for SyntheticSource {
    fn next_result(&mut self) -> Result<Option<PoseResult>, SourceError> {
        let frame = self.frame;
        self.frame += 1;

        if self.dropout_left > 0 {
            self.dropout_left -= 1;
            return Ok(Some(PoseResult::NotDetected));
        }
        // No dropouts during the first rep so the demo calibrates cleanly
        if frame > REP_FRAMES as u64 && self.rng.gen_bool(DROPOUT_CHANCE) {
            self.dropout_left = self.rng.gen_range(DROPOUT_FRAMES);
            return Ok(Some(PoseResult::NotDetected));
        }

        Ok(Some(PoseResult::Detected(self.pose_at(frame))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::measure;
    use assert_matches::assert_matches;
    use std::io::{Cursor, Write};

    fn jsonl(text: &str) -> JsonLinesSource<Cursor<Vec<u8>>> {
        JsonLinesSource::new(Cursor::new(text.as_bytes().to_vec()), 0.7)
    }

    #[test]
    fn jsonl_reads_detected_and_missing_frames() {
        let mut src = jsonl(
            "{\"landmarks\":[{\"x\":0.1,\"y\":0.2},{\"x\":0.3,\"y\":0.4,\"visibility\":0.5}]}\n\
             \n\
             {\"landmarks\":null}\n",
        );
        let first = src.next_result().unwrap().unwrap();
        let pose = first.pose().unwrap();
        assert!(pose.landmark(2).is_none());
        assert_eq!(pose.landmark(1).unwrap().visibility, 0.5);

        assert_eq!(src.next_result().unwrap(), Some(PoseResult::NotDetected));
        assert_eq!(src.next_result().unwrap(), None);
    }

    #[test]
    fn jsonl_low_score_counts_as_not_detected() {
        let mut src = jsonl(
            "{\"landmarks\":[{\"x\":0.1,\"y\":0.2}],\"score\":0.4}\n\
             {\"landmarks\":[{\"x\":0.1,\"y\":0.2}],\"score\":0.9}\n",
        );
        assert_eq!(src.next_result().unwrap(), Some(PoseResult::NotDetected));
        assert!(src.next_result().unwrap().unwrap().is_detected());
    }

    #[test]
    fn jsonl_reports_bad_line_number() {
        let mut src = jsonl("{\"landmarks\":null}\n{oops}\n");
        src.next_result().unwrap();
        assert_matches!(src.next_result(), Err(SourceError::Json { line: 2, .. }));
    }

    #[test]
    fn csv_reads_strides_and_empty_records() {
        let xy = vec!["0.5"; 66].join(",");
        let xyzv = vec!["0.25"; 132].join(",");
        let data = format!("# header comment\n{xy}\n\n{xyzv}\n\"\"\n");
        let mut src = CsvSource::new(Cursor::new(data.into_bytes()));

        let first = src.next_result().unwrap().unwrap();
        assert!(first.pose().unwrap().landmark(32).is_some());
        assert!(first.pose().unwrap().landmark(33).is_none());
        assert_eq!(first.pose().unwrap().landmark(0).unwrap().visibility, 1.0);

        let second = src.next_result().unwrap().unwrap();
        let lm = *second.pose().unwrap().landmark(32).unwrap();
        assert_eq!(lm.z, 0.25);
        assert_eq!(lm.visibility, 0.25);

        assert_eq!(src.next_result().unwrap(), Some(PoseResult::NotDetected));
        assert_eq!(src.next_result().unwrap(), None);
    }

    #[test]
    fn csv_three_value_stride_from_full_pose() {
        let xyz = vec!["0.1"; 99].join(",");
        let mut src = CsvSource::new(Cursor::new(xyz.into_bytes()));
        let pose = src.next_result().unwrap().unwrap();
        assert!(pose.pose().unwrap().landmark(32).is_some());
        assert!(pose.pose().unwrap().landmark(33).is_none());
    }

    #[test]
    fn csv_rejects_garbage() {
        let mut src = CsvSource::new(Cursor::new(b"0.1,abc\n".to_vec()));
        assert_matches!(src.next_result(), Err(SourceError::Malformed { frame: 1, .. }));

        let mut src = CsvSource::new(Cursor::new(b"0.1\n".to_vec()));
        assert_matches!(src.next_result(), Err(SourceError::Malformed { .. }));
    }

    #[test]
    fn csv_rejects_non_finite_coordinates() {
        let nan = vec!["NaN"; 66].join(",");
        let mut src = CsvSource::new(Cursor::new(nan.into_bytes()));
        assert_matches!(src.next_result(), Err(SourceError::Malformed { frame: 1, .. }));

        let mut row = vec!["0.5"; 66];
        row[27] = "-inf";
        let data = format!("{}\n", row.join(","));
        let mut src = CsvSource::new(Cursor::new(data.into_bytes()));
        assert_matches!(src.next_result(), Err(SourceError::Malformed { frame: 1, .. }));
    }

    #[test]
    fn non_finite_landmarks_are_malformed() {
        let good = vec![Landmark::new(0.5, 0.5); 3];
        assert!(ensure_finite(&good, 1).is_ok());

        let mut bad = good.clone();
        bad[2].y = f64::INFINITY;
        assert_matches!(
            ensure_finite(&bad, 7),
            Err(SourceError::Malformed { frame: 7, ref reason }) if reason.contains("landmark 2")
        );
        bad[2] = Landmark::new(f64::NAN, 0.5);
        assert_matches!(ensure_finite(&bad, 7), Err(SourceError::Malformed { .. }));
    }

    #[test]
    fn jsonl_out_of_range_number_is_a_parse_error() {
        let mut src = jsonl("{\"landmarks\":[{\"x\":1e999,\"y\":0.5}]}\n");
        assert_matches!(src.next_result(), Err(SourceError::Json { line: 1, .. }));
    }

    #[test]
    fn synthetic_angle_sweeps_past_both_thresholds() {
        for exercise in Exercise::ALL {
            let t = exercise.profile().thresholds;
            let angles: Vec<f64> = (0..REP_FRAMES as u64)
                .map(|f| SyntheticSource::target_angle(exercise, f))
                .collect();
            let max = angles.iter().cloned().fold(f64::MIN, f64::max);
            let min = angles.iter().cloned().fold(f64::MAX, f64::min);
            assert!(max - JITTER_DEG >= t.up, "{exercise} never reaches top");
            assert!(min + JITTER_DEG <= t.down, "{exercise} never reaches bottom");
        }
    }

    #[test]
    fn synthetic_pose_measures_close_to_target_for_every_exercise() {
        let mut src = SyntheticSource::new(StdRng::seed_from_u64(7));
        for frame in 0..20 {
            let result = src.next_result().unwrap().unwrap();
            for exercise in Exercise::ALL {
                let angle = measure(result.pose().unwrap(), exercise.profile()).unwrap();
                let target = SyntheticSource::target_angle(exercise, frame);
                assert!((angle - target).abs() <= JITTER_DEG + 1e-6);
            }
        }
    }

    #[test]
    fn synthetic_is_deterministic_for_a_seed() {
        let mut a = SyntheticSource::new(StdRng::seed_from_u64(42));
        let mut b = SyntheticSource::new(StdRng::seed_from_u64(42));
        for _ in 0..200 {
            assert_eq!(a.next_result().unwrap(), b.next_result().unwrap());
        }
    }

    #[test]
    fn input_spec_guesses_format_from_extension() {
        assert_matches!(
            InputSpec::recording("run.CSV".into(), None),
            InputSpec::Recording { format: RecordingFormat::Csv, .. }
        );
        assert_matches!(
            InputSpec::recording("run.jsonl".into(), None),
            InputSpec::Recording { format: RecordingFormat::Jsonl, .. }
        );
        assert_matches!(
            InputSpec::recording("run.csv".into(), Some(RecordingFormat::Jsonl)),
            InputSpec::Recording { format: RecordingFormat::Jsonl, .. }
        );
    }

    #[test]
    fn opening_missing_recording_fails() {
        let spec = InputSpec::recording("/definitely/not/here.jsonl".into(), None);
        let result = spec.open(&PoseEngineOptions::default());
        assert!(matches!(result, Err(SourceError::Io(_))));
    }

    #[test]
    fn opened_recording_yields_frames() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"landmarks\":null}}").unwrap();
        let spec = InputSpec::recording(file.path().to_path_buf(), Some(RecordingFormat::Jsonl));
        let mut src = spec.open(&PoseEngineOptions::default()).unwrap();
        assert_eq!(src.next_result().unwrap(), Some(PoseResult::NotDetected));
        assert_eq!(src.next_result().unwrap(), None);
    }
}
