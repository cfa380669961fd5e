//! Session controller: the only writer of [`SessionState`].
//!
//! Every frame result and clock tick carries the epoch of the start that
//! produced it. Anything arriving while stopped, or from an earlier start,
//! is dropped without touching state.

use tracing::{debug, info};

use crate::angle::measure;
use crate::config::DropoutPolicy;
use crate::exercise::Exercise;
use crate::landmark::PoseResult;
use crate::rep_counter::{progress_percent, RepEvent};
use crate::session::{SessionState, Status};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started,
    Stopped,
    Reset,
    Calibrated,
    CalibrationLost,
    Rep(RepEvent),
    Tick { elapsed_seconds: u64 },
    CaptureFailed(String),
    InputEnded,
}

#[derive(Debug)]
pub struct SessionController {
    state: SessionState,
    exercise: Exercise,
    dropout_policy: DropoutPolicy,
    epoch: u64,
}

impl SessionController {
    pub fn new(exercise: Exercise, dropout_policy: DropoutPolicy) -> Self {
        Self {
            state: SessionState::default(),
            exercise,
            dropout_policy,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn exercise(&self) -> Exercise {
        self.exercise
    }

    /// Epoch of the current (or most recent) start.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    /// Begin a session. Returns `None` if one is already running.
    pub fn start(&mut self) -> Option<SessionEvent> {
        if self.state.is_running {
            return None;
        }
        self.epoch += 1;
        self.state.is_running = true;
        self.state.is_calibrated = false;
        self.state.status = Status::Searching;
        info!(epoch = self.epoch, exercise = %self.exercise, "session started");
        Some(SessionEvent::Started)
    }

    /// Pause the session, keeping count and stage. Returns `None` if
    /// nothing was running.
    pub fn stop(&mut self) -> Option<SessionEvent> {
        if !self.state.is_running {
            return None;
        }
        self.halt(Status::CameraOff);
        info!(
            epoch = self.epoch,
            reps = self.state.tally.rep_count,
            elapsed = self.state.elapsed_seconds,
            "session stopped"
        );
        Some(SessionEvent::Stopped)
    }

    /// Stop, then zero the count, timer, latch and progress. The status
    /// always ends as CAMERA OFF, even if nothing was running.
    pub fn reset(&mut self) -> SessionEvent {
        self.stop();
        self.state.status = Status::CameraOff;
        self.state.tally.reset();
        self.state.elapsed_seconds = 0;
        self.state.progress = 0.0;
        self.state.last_angle = None;
        self.state.dropped_frames = 0;
        info!("session reset");
        SessionEvent::Reset
    }

    /// The capture source could not be opened; the session does not start.
    pub fn capture_failed(&mut self, reason: impl Into<String>) -> SessionEvent {
        let reason = reason.into();
        self.halt(Status::CaptureFailed(reason.clone()));
        SessionEvent::CaptureFailed(reason)
    }

    /// The source of the given start ran out of frames.
    pub fn input_ended(&mut self, epoch: u64) -> Option<SessionEvent> {
        if !self.accepts(epoch) {
            return None;
        }
        self.halt(Status::InputEnded);
        info!(epoch, reps = self.state.tally.rep_count, "input ended");
        Some(SessionEvent::InputEnded)
    }

    /// Switch exercise. The count and timer carry over; the bottom latch
    /// does not, since it belonged to a different joint.
    pub fn select_exercise(&mut self, exercise: Exercise) -> bool {
        if exercise == self.exercise {
            return false;
        }
        self.exercise = exercise;
        self.state.tally.clear_latch();
        self.state.progress = 0.0;
        self.state.last_angle = None;
        info!(%exercise, "exercise selected");
        true
    }

    pub fn note_dropped_frames(&mut self, count: u64) {
        self.state.dropped_frames += count;
    }

    /// Apply one pose engine result.
    pub fn on_pose(&mut self, epoch: u64, result: &PoseResult) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.accepts(epoch) {
            return events;
        }

        let Some(pose) = result.pose() else {
            self.state.last_angle = None;
            if self.state.is_calibrated {
                self.state.is_calibrated = false;
                self.state.status = Status::Recalibrating;
                if self.dropout_policy == DropoutPolicy::ClearLatch {
                    self.state.tally.clear_latch();
                }
                info!("person lost, re-calibrating");
                events.push(SessionEvent::CalibrationLost);
            }
            return events;
        };

        if !self.state.is_calibrated {
            self.state.is_calibrated = true;
            self.state.status = Status::Calibrated;
            info!("calibrated");
            events.push(SessionEvent::Calibrated);
        }

        let profile = self.exercise.profile();
        let angle = measure(pose, profile);
        self.state.last_angle = angle;
        let Some(angle) = angle else {
            return events;
        };

        if let Some(rep) = self.state.tally.advance(angle, profile.thresholds) {
            match rep {
                RepEvent::ReachedBottom => debug!(angle, "reached bottom"),
                RepEvent::RepCompleted { count } => info!(count, angle, "rep completed"),
            }
            events.push(SessionEvent::Rep(rep));
        }
        self.state.progress = progress_percent(angle, profile.thresholds);

        events
    }

    /// One second of wall time passed.
    pub fn on_second(&mut self, epoch: u64) -> Option<SessionEvent> {
        if !self.accepts(epoch) {
            return None;
        }
        self.state.elapsed_seconds += 1;
        Some(SessionEvent::Tick {
            elapsed_seconds: self.state.elapsed_seconds,
        })
    }

    fn accepts(&self, epoch: u64) -> bool {
        self.state.is_running && epoch == self.epoch
    }

    fn halt(&mut self, status: Status) {
        self.state.is_running = false;
        self.state.is_calibrated = false;
        self.state.status = status;
    }
}
