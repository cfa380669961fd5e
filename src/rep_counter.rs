//! Hysteresis rep detection.
//!
//! A rep is counted only after the joint angle first drops to the bottom
//! threshold and then rises to the top threshold. Angles between the two
//! thresholds never change state, so jitter around either boundary cannot
//! double count.

use crate::exercise::Thresholds;

/// Display label for where the athlete should head next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Ready,
    GoDown,
    GoUp,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Ready => "READY",
            Stage::GoDown => "GO DOWN",
            Stage::GoUp => "GO UP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepPhase {
    WaitingForBottom,
    WaitingForTop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepEvent {
    ReachedBottom,
    RepCompleted { count: u32 },
}

/// The counting part of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepTally {
    pub rep_count: u32,
    pub has_reached_bottom: bool,
    pub stage: Stage,
}

impl RepTally {
    pub fn phase(&self) -> RepPhase {
        if self.has_reached_bottom {
            RepPhase::WaitingForTop
        } else {
            RepPhase::WaitingForBottom
        }
    }

    /// Feed one angle sample. NaN never crosses a threshold.
    pub fn advance(&mut self, angle: f64, thresholds: Thresholds) -> Option<RepEvent> {
        if angle.is_nan() {
            return None;
        }
        match self.phase() {
            RepPhase::WaitingForBottom if angle <= thresholds.down => {
                self.has_reached_bottom = true;
                self.stage = Stage::GoUp;
                Some(RepEvent::ReachedBottom)
            }
            RepPhase::WaitingForTop if angle >= thresholds.up => {
                self.rep_count += 1;
                self.has_reached_bottom = false;
                self.stage = Stage::GoDown;
                Some(RepEvent::RepCompleted {
                    count: self.rep_count,
                })
            }
            _ => None,
        }
    }

    /// Drop the bottom latch without touching the count.
    pub fn clear_latch(&mut self) {
        self.has_reached_bottom = false;
        self.stage = Stage::Ready;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// How far the joint still has to travel to reach the top, 0-100.
///
/// 100 at or below the bottom threshold, 0 at or above the top.
pub fn progress_percent(angle: f64, thresholds: Thresholds) -> f64 {
    let completion =
        ((angle - thresholds.down) / (thresholds.up - thresholds.down) * 100.0).clamp(0.0, 100.0);
    100.0 - completion
}
