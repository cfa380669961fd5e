//! Audible/visual cues derived from session events.

use std::io::{self, Write};

use crate::controller::SessionEvent;
use crate::rep_counter::RepEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cue {
    /// Short confirmation when a person is first picked up
    Ping,
    /// Speak the rep count
    Announce(u32),
}

impl Cue {
    pub fn for_event(event: &SessionEvent) -> Option<Cue> {
        match event {
            SessionEvent::Calibrated => Some(Cue::Ping),
            SessionEvent::Rep(RepEvent::RepCompleted { count }) => Some(Cue::Announce(*count)),
            _ => None,
        }
    }
}

pub trait FeedbackSink {
    fn play(&mut self, cue: &Cue);
    fn set_enabled(&mut self, _enabled: bool) {}
}

/// Rings the terminal bell. Counting is announced by the UI banner.
pub struct TerminalBell<W: Write> {
    out: W,
    enabled: bool,
}

impl TerminalBell<io::Stdout> {
    pub fn stdout(enabled: bool) -> Self {
        Self::new(io::stdout(), enabled)
    }
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W, enabled: bool) -> Self {
        Self { out, enabled }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FeedbackSink for TerminalBell<W> {
    fn play(&mut self, cue: &Cue) {
        if !self.enabled {
            return;
        }
        // Ping gets a double bell so it is distinguishable from a rep
        let bells: &[u8] = match cue {
            Cue::Ping => b"\x07\x07",
            Cue::Announce(_) => b"\x07",
        };
        let _ = self.out.write_all(bells).and_then(|_| self.out.flush());
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Keeps every cue, for tests and headless runs.
#[derive(Debug, Default)]
pub struct CueLog {
    pub cues: Vec<Cue>,
}

impl FeedbackSink for CueLog {
    fn play(&mut self, cue: &Cue) {
        self.cues.push(cue.clone());
    }
}
