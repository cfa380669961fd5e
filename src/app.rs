//! The running application: one session controller plus the capture and
//! clock workers feeding it, driven one event at a time.

use std::sync::mpsc::Sender;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use crate::config::Config;
use crate::controller::{SessionController, SessionEvent};
use crate::exercise::Exercise;
use crate::feedback::{Cue, FeedbackSink};
use crate::runtime::{spawn_capture, spawn_clock, AppEvent, FrameGate, Worker};
use crate::session::SessionState;
use crate::source::InputSpec;

pub const TICK_RATE_MS: u64 = 100;
/// Redraw ticks a rep banner stays up
const BANNER_TICKS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    ticks_left: u32,
}

impl Banner {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ticks_left: BANNER_TICKS,
        }
    }
}

pub struct App {
    pub controller: SessionController,
    pub config: Config,
    pub input: InputSpec,
    pub banner: Option<Banner>,
    feedback: Box<dyn FeedbackSink>,
    events: Sender<AppEvent>,
    capture: Option<Worker>,
    clock: Option<Worker>,
    gate: FrameGate,
    clock_interval: Duration,
}

impl App {
    pub fn new(
        config: Config,
        input: InputSpec,
        events: Sender<AppEvent>,
        mut feedback: Box<dyn FeedbackSink>,
    ) -> Self {
        feedback.set_enabled(config.sound);
        Self {
            controller: SessionController::new(config.exercise, config.dropout_policy),
            config,
            input,
            banner: None,
            feedback,
            events,
            capture: None,
            clock: None,
            gate: FrameGate::new(),
            clock_interval: Duration::from_secs(1),
        }
    }

    /// Shorten the elapsed-time clock, for tests.
    pub fn with_clock_interval(mut self, interval: Duration) -> Self {
        self.clock_interval = interval;
        self
    }

    pub fn state(&self) -> &SessionState {
        self.controller.state()
    }

    pub fn exercise(&self) -> Exercise {
        self.controller.exercise()
    }

    /// Acquire the source and begin counting. No-op while running.
    pub fn start(&mut self) {
        if self.controller.is_running() {
            return;
        }
        let source = match self.input.open(&self.config.pose_engine) {
            Ok(source) => source,
            Err(e) => {
                warn!(input = %self.input.describe(), "cannot start: {e}");
                let event = self.controller.capture_failed(e.to_string());
                self.dispatch(vec![event]);
                return;
            }
        };
        let Some(event) = self.controller.start() else {
            return;
        };
        let epoch = self.controller.epoch();
        self.gate = FrameGate::new();
        self.capture = Some(spawn_capture(
            source,
            self.config.capture.fps,
            epoch,
            self.gate.clone(),
            self.events.clone(),
        ));
        self.clock = Some(spawn_clock(self.clock_interval, epoch, self.events.clone()));
        self.dispatch(vec![event]);
    }

    pub fn stop(&mut self) {
        self.halt_workers();
        if let Some(event) = self.controller.stop() {
            self.dispatch(vec![event]);
        }
    }

    pub fn reset(&mut self) {
        self.halt_workers();
        let event = self.controller.reset();
        self.banner = None;
        self.dispatch(vec![event]);
    }

    pub fn select_exercise(&mut self, exercise: Exercise) {
        if self.controller.select_exercise(exercise) {
            self.config.exercise = exercise;
        }
    }

    pub fn toggle_sound(&mut self) {
        self.config.sound = !self.config.sound;
        self.feedback.set_enabled(self.config.sound);
    }

    /// Apply one loop event. Key events may ask to quit.
    pub fn handle(&mut self, event: AppEvent) -> Control {
        match event {
            AppEvent::Key(key) => return self.on_key(key),
            AppEvent::Resize => {}
            AppEvent::Tick => self.on_tick(),
            AppEvent::Frame { epoch, result } => {
                let events = self.controller.on_pose(epoch, &result);
                // Only the current capture holds this gate
                if epoch == self.controller.epoch() {
                    self.gate.release();
                }
                self.dispatch(events);
            }
            AppEvent::Second { epoch } => {
                if let Some(event) = self.controller.on_second(epoch) {
                    self.dispatch(vec![event]);
                }
            }
            AppEvent::CaptureEnded { epoch, error } => {
                let event = match error {
                    Some(reason) if self.controller.is_running() && epoch == self.controller.epoch() => {
                        Some(self.controller.capture_failed(reason))
                    }
                    _ => self.controller.input_ended(epoch),
                };
                if let Some(event) = event {
                    self.halt_workers();
                    self.dispatch(vec![event]);
                }
            }
        }
        Control::Continue
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Control::Quit,
            KeyCode::Char('s') | KeyCode::Enter => self.start(),
            KeyCode::Char('p') | KeyCode::Char(' ') => self.stop(),
            KeyCode::Char('r') => self.reset(),
            KeyCode::Char('m') => self.toggle_sound(),
            KeyCode::Tab | KeyCode::Right => self.select_exercise(self.exercise().next()),
            KeyCode::BackTab | KeyCode::Left => self.select_exercise(self.exercise().previous()),
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                self.select_exercise(Exercise::ALL[index]);
            }
            _ => {}
        }
        Control::Continue
    }

    fn on_tick(&mut self) {
        let dropped = self.gate.take_dropped();
        if dropped > 0 {
            self.controller.note_dropped_frames(dropped);
        }
        if let Some(banner) = self.banner.as_mut() {
            banner.ticks_left = banner.ticks_left.saturating_sub(1);
            if banner.ticks_left == 0 {
                self.banner = None;
            }
        }
    }

    fn dispatch(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            let Some(cue) = Cue::for_event(&event) else {
                continue;
            };
            if let Cue::Announce(count) = cue {
                self.banner = Some(Banner::new(count.to_string()));
            }
            self.feedback.play(&cue);
        }
    }

    fn halt_workers(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(mut clock) = self.clock.take() {
            clock.stop();
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.halt_workers();
    }
}
