//! Exercise catalog: which joint each exercise measures and where its
//! top and bottom thresholds sit.

use std::str::FromStr;

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::UnknownExercise;
use crate::landmark::{
    LEFT_ANKLE, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, RIGHT_ANKLE,
    RIGHT_HIP, RIGHT_KNEE,
};

/// Angle thresholds in degrees. `down` is always below `up`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Extended / top position
    pub up: f64,
    /// Flexed / bottom position
    pub down: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExerciseProfile {
    pub name: &'static str,
    /// Proximal, joint and distal landmark indices
    pub landmarks: [usize; 3],
    pub thresholds: Thresholds,
}

const PUSHUPS: ExerciseProfile = ExerciseProfile {
    name: "Push-ups",
    landmarks: [LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST],
    thresholds: Thresholds {
        up: 160.0,
        down: 95.0,
    },
};

const SQUATS: ExerciseProfile = ExerciseProfile {
    name: "Squats",
    landmarks: [LEFT_HIP, LEFT_KNEE, LEFT_ANKLE],
    thresholds: Thresholds {
        up: 165.0,
        down: 100.0,
    },
};

const CURLS: ExerciseProfile = ExerciseProfile {
    name: "Curls",
    landmarks: [LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST],
    thresholds: Thresholds {
        up: 150.0,
        down: 50.0,
    },
};

const LUNGES: ExerciseProfile = ExerciseProfile {
    name: "Lunges",
    landmarks: [RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE],
    thresholds: Thresholds {
        up: 160.0,
        down: 110.0,
    },
};

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Exercise {
    #[default]
    Pushups,
    Squats,
    Curls,
    Lunges,
}

impl Exercise {
    pub const ALL: [Exercise; 4] = [
        Exercise::Pushups,
        Exercise::Squats,
        Exercise::Curls,
        Exercise::Lunges,
    ];

    pub fn profile(&self) -> &'static ExerciseProfile {
        match self {
            Exercise::Pushups => &PUSHUPS,
            Exercise::Squats => &SQUATS,
            Exercise::Curls => &CURLS,
            Exercise::Lunges => &LUNGES,
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|e| e == self).unwrap_or(0)
    }

    pub fn next(&self) -> Exercise {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Exercise {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl FromStr for Exercise {
    type Err = UnknownExercise;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|e| e.to_string() == id)
            .copied()
            .ok_or_else(|| UnknownExercise {
                id: id.to_string(),
                expected: Self::ALL.iter().join(", "),
            })
    }
}

/// Profile for a catalog id such as `"squats"`.
pub fn lookup(id: &str) -> Result<&'static ExerciseProfile, UnknownExercise> {
    id.parse::<Exercise>().map(|e| e.profile())
}
