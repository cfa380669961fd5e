use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use tracing::{trace, warn};

use crate::landmark::PoseResult;
use crate::source::PoseSource;

/// Unified event type consumed by the app loop
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    /// Redraw tick, not wall-clock seconds
    Tick,
    Frame { epoch: u64, result: PoseResult },
    Second { epoch: u64 },
    CaptureEnded { epoch: u64, error: Option<String> },
}

/// Source of events for the app loop
pub trait AppEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Event source reading from a channel. Terminal input, capture and
/// clock workers all write into the sending half.
pub struct ChannelEventSource {
    rx: Receiver<AppEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl AppEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Forward crossterm key and resize events into the app channel.
pub fn spawn_terminal_events(tx: Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::read() {
            Ok(CtEvent::Key(key)) => {
                if tx.send(AppEvent::Key(key)).is_err() {
                    break;
                }
            }
            Ok(CtEvent::Resize(_, _)) => {
                if tx.send(AppEvent::Resize).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    });
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: AppEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: AppEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

/// Single-slot hand-off between the capture worker and the app loop.
///
/// The worker may only send a frame after claiming the slot; the loop
/// releases it once the frame has been fully applied. Frames captured
/// while the slot is taken are dropped, never queued.
#[derive(Clone, Debug, Default)]
pub struct FrameGate {
    busy: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_claim(&self) -> bool {
        let claimed = self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !claimed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        claimed
    }

    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// Dropped frames since the last call.
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

/// A background worker that can be told to stop.
#[derive(Debug)]
pub struct Worker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Ask the worker to exit. Does not wait for it; anything it sends
    /// afterwards is stale and gets discarded by epoch.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.handle.take();
    }

    /// Stop and wait for the thread to finish.
    pub fn join(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Sleep until `deadline`, waking early to check the stop flag.
fn sleep_until(deadline: Instant, stop: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(20);
    loop {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLICE));
    }
}

/// Pull results from `source` at `fps` and hand them to the loop through
/// `gate`.
pub fn spawn_capture(
    mut source: Box<dyn PoseSource>,
    fps: u32,
    epoch: u64,
    gate: FrameGate,
    tx: Sender<AppEvent>,
) -> Worker {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));

    let handle = thread::spawn(move || {
        let mut next = Instant::now();
        loop {
            if !sleep_until(next, &flag) {
                break;
            }
            next += period;

            let error = match source.next_result() {
                Ok(Some(result)) => {
                    if gate.try_claim() {
                        if tx.send(AppEvent::Frame { epoch, result }).is_err() {
                            break;
                        }
                    } else {
                        trace!(epoch, "frame dropped, previous still in flight");
                    }
                    continue;
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(epoch, "pose source failed: {e}");
                    Some(e.to_string())
                }
            };
            let _ = tx.send(AppEvent::CaptureEnded { epoch, error });
            break;
        }
    });

    Worker {
        stop,
        handle: Some(handle),
    }
}

/// Send a `Second` event every `interval` until stopped.
pub fn spawn_clock(interval: Duration, epoch: u64, tx: Sender<AppEvent>) -> Worker {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    let handle = thread::spawn(move || {
        let mut next = Instant::now() + interval;
        while sleep_until(next, &flag) {
            if tx.send(AppEvent::Second { epoch }).is_err() {
                break;
            }
            next += interval;
        }
    });

    Worker {
        stop,
        handle: Some(handle),
    }
}
