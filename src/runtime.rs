use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseButton, MouseEventKind};
use log::warn;

use crate::clock::SessionClock;

/// Unified event type consumed by the app runner. Input events carry the
/// session time at which they were read.
#[derive(Clone, Debug)]
pub enum StrafeEvent {
    Key { key: KeyEvent, at_ms: f64 },
    Click { at_ms: f64 },
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, mouse, resize)
pub trait StrafeEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<StrafeEvent, RecvTimeoutError>;
}

/// Maps a raw crossterm event onto a [`StrafeEvent`], stamping it with `at_ms`.
pub fn translate(event: CtEvent, at_ms: f64) -> Option<StrafeEvent> {
    match event {
        CtEvent::Key(key) => Some(StrafeEvent::Key { key, at_ms }),
        CtEvent::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(StrafeEvent::Click { at_ms }),
            _ => None,
        },
        CtEvent::Resize(_, _) => Some(StrafeEvent::Resize),
        _ => None,
    }
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<StrafeEvent>,
}

impl CrosstermEventSource {
    pub fn new(clock: SessionClock) -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(ev) => {
                    let at_ms = clock.now_ms();
                    if let Some(ev) = translate(ev, at_ms) {
                        if tx.send(ev).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!("terminal event reader stopped: {e}");
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl StrafeEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<StrafeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
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

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<StrafeEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<StrafeEvent>) -> Self {
        Self { rx }
    }
}

impl StrafeEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<StrafeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: StrafeEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: StrafeEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> StrafeEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                StrafeEvent::Tick
            }
        }
    }
}
