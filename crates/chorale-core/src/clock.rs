//! The audio clock adapter.
//!
//! Every scheduled note start and every position poll is expressed against
//! one monotonically increasing clock. The clock has three states mirroring
//! hardware audio contexts: it can be suspended (common before the first
//! user gesture on some hosts) and it can be closed, after which it must be
//! replaced wholesale. Sound backends are bound to the clock instance they
//! were loaded against and do not survive a replacement.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Instant;

use crate::error::PlaybackError;

/// Lifecycle state of an audio clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    /// The clock is gone for good; a new instance must be created.
    Closed,
    /// The clock exists but time is not advancing.
    Suspended,
    /// Time is advancing.
    Running,
}

/// A monotonically increasing clock that scheduled playback is anchored to.
///
/// `now()` is seconds since an arbitrary epoch fixed at clock creation.
pub trait AudioClock: Send + Sync {
    /// Current time in seconds. Frozen while suspended or closed.
    fn now(&self) -> f64;

    /// Current lifecycle state.
    fn state(&self) -> ClockState;

    /// Bring a suspended clock back to running.
    ///
    /// A no-op on a running clock; fails on a closed one.
    fn resume(&self) -> Result<(), PlaybackError>;
}

/// Creates replacement clocks when the current one has been closed.
pub trait ClockFactory: Send + Sync {
    /// Create a fresh clock in the running state.
    fn create(&self) -> Arc<dyn AudioClock>;
}

struct SystemClockInner {
    state: ClockState,
    /// Instant the clock last entered the running state.
    anchor: Instant,
    /// Seconds accumulated across previous running intervals.
    accumulated: f64,
}

/// An [`AudioClock`] driven by the host's monotonic clock.
///
/// Time accumulates only while running; suspending freezes the reading and
/// resuming continues from it, so `now()` never jumps over a suspension.
pub struct SystemClock {
    inner: Mutex<SystemClockInner>,
}

impl SystemClock {
    /// Create a running clock with `now() == 0.0`.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SystemClockInner {
                state: ClockState::Running,
                anchor: Instant::now(),
                accumulated: 0.0,
            }),
        }
    }

    /// Freeze the clock. A no-op unless running.
    pub fn suspend(&self) {
        let mut inner = self.inner.lock().expect("clock lock poisoned");
        if inner.state == ClockState::Running {
            inner.accumulated += inner.anchor.elapsed().as_secs_f64();
            inner.state = ClockState::Suspended;
        }
    }

    /// Close the clock permanently; `resume()` will fail from here on.
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("clock lock poisoned");
        if inner.state == ClockState::Running {
            inner.accumulated += inner.anchor.elapsed().as_secs_f64();
        }
        inner.state = ClockState::Closed;
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        let inner = self.inner.lock().expect("clock lock poisoned");
        match inner.state {
            ClockState::Running => inner.accumulated + inner.anchor.elapsed().as_secs_f64(),
            ClockState::Suspended | ClockState::Closed => inner.accumulated,
        }
    }

    fn state(&self) -> ClockState {
        self.inner.lock().expect("clock lock poisoned").state
    }

    fn resume(&self) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock().expect("clock lock poisoned");
        match inner.state {
            ClockState::Running => Ok(()),
            ClockState::Suspended => {
                inner.anchor = Instant::now();
                inner.state = ClockState::Running;
                Ok(())
            }
            ClockState::Closed => Err(PlaybackError::ClockUnavailable {
                reason: "clock has been closed".to_string(),
            }),
        }
    }
}

/// Factory producing [`SystemClock`] instances.
pub struct SystemClockFactory;

impl ClockFactory for SystemClockFactory {
    fn create(&self) -> Arc<dyn AudioClock> {
        Arc::new(SystemClock::new())
    }
}
