//! Pose landmarks as delivered by the pose engine, one set per frame.

use serde::{Deserialize, Serialize};

/// Number of body landmarks in a full pose.
pub const POSE_LANDMARK_COUNT: usize = 33;

pub const LEFT_SHOULDER: usize = 11;
pub const LEFT_ELBOW: usize = 13;
pub const LEFT_WRIST: usize = 15;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

/// A single landmark in normalized image coordinates (0-1).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Relative depth, unused by the counter
    #[serde(default)]
    pub z: f64,
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }
}

/// Landmarks for one detected person. Indices past the end are absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pose {
    landmarks: Vec<Landmark>,
}

impl Pose {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }
}

/// What the pose engine produced for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PoseResult {
    Detected(Pose),
    NotDetected,
}

impl PoseResult {
    pub fn pose(&self) -> Option<&Pose> {
        match self {
            PoseResult::Detected(pose) => Some(pose),
            PoseResult::NotDetected => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, PoseResult::Detected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landmark_lookup_past_end_is_absent() {
        let pose = Pose::new(vec![Landmark::new(0.1, 0.2); 14]);
        assert!(pose.landmark(LEFT_ELBOW).is_some());
        assert!(pose.landmark(LEFT_WRIST).is_none());
    }

    #[test]
    fn landmark_deserializes_with_defaults() {
        let lm: Landmark = serde_json::from_str(r#"{"x":0.5,"y":0.25}"#).unwrap();
        assert_eq!(lm.x, 0.5);
        assert_eq!(lm.y, 0.25);
        assert_eq!(lm.z, 0.0);
        assert_eq!(lm.visibility, 1.0);
    }

    #[test]
    fn not_detected_has_no_pose() {
        assert!(PoseResult::NotDetected.pose().is_none());
        assert!(!PoseResult::NotDetected.is_detected());
        assert!(PoseResult::Detected(Pose::default()).is_detected());
    }
}
