//! The playback context: shared resources behind every transport.
//!
//! A [`PlaybackContext`] owns the one-audio-clock-per-process invariant and
//! the process-wide backend cache. It is constructed explicitly and handed
//! to each [`crate::player::Player`] rather than living in module-level
//! statics, so embedders and tests can inject their own clock and backend
//! factories.

use std::sync::{Arc, RwLock};

use crate::backend::{BackendCache, BackendFactory};
use crate::clock::{AudioClock, ClockFactory, ClockState, SystemClockFactory};
use crate::error::PlaybackError;

/// Shared clock and backend resources for one process.
pub struct PlaybackContext {
    clock: RwLock<Arc<dyn AudioClock>>,
    clock_factory: Box<dyn ClockFactory>,
    backends: BackendCache,
}

impl PlaybackContext {
    /// Create a context with explicit clock and backend factories.
    pub fn new(
        clock_factory: Box<dyn ClockFactory>,
        backend_factory: Arc<dyn BackendFactory>,
    ) -> Self {
        let clock = clock_factory.create();
        Self {
            clock: RwLock::new(clock),
            clock_factory,
            backends: BackendCache::new(backend_factory),
        }
    }

    /// Create a context over the host's monotonic clock.
    pub fn with_system_clock(backend_factory: Arc<dyn BackendFactory>) -> Self {
        Self::new(Box::new(SystemClockFactory), backend_factory)
    }

    /// The current clock instance.
    pub fn clock(&self) -> Arc<dyn AudioClock> {
        self.clock.read().expect("clock slot lock poisoned").clone()
    }

    /// The backend cache.
    pub fn backends(&self) -> &BackendCache {
        &self.backends
    }

    /// Make sure a running clock exists, replacing a closed one.
    ///
    /// Replacing the clock invalidates every cached backend, since backends
    /// are bound to the clock instance they were loaded against. Resuming a
    /// suspended clock may block on hardware activation, which is why this
    /// must be callable right at the start of a user-gesture handler,
    /// before any other blocking step.
    pub fn ensure_running(&self) -> Result<Arc<dyn AudioClock>, PlaybackError> {
        let clock = self.clock();
        match clock.state() {
            ClockState::Running => Ok(clock),
            ClockState::Suspended => {
                clock.resume()?;
                Ok(clock)
            }
            ClockState::Closed => {
                let clock = {
                    let mut slot = self.clock.write().expect("clock slot lock poisoned");
                    // Another caller may have replaced it while we waited.
                    if slot.state() == ClockState::Closed {
                        log::info!("[CLOCK] recreating closed audio clock");
                        *slot = self.clock_factory.create();
                        self.backends.invalidate();
                    }
                    slot.clone()
                };
                if clock.state() == ClockState::Suspended {
                    clock.resume()?;
                }
                Ok(clock)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NullBackend, SoundBackend};
    use crate::clock::SystemClock;
    use std::sync::Mutex;

    struct NullFactory;

    impl BackendFactory for NullFactory {
        fn load(&self, _instrument: &str) -> Result<Arc<dyn SoundBackend>, PlaybackError> {
            Ok(Arc::new(NullBackend))
        }
    }

    struct TrackingClockFactory {
        created: Mutex<Vec<Arc<SystemClock>>>,
    }

    impl TrackingClockFactory {
        fn new() -> Self {
            Self {
                created: Mutex::new(Vec::new()),
            }
        }

        fn latest(&self) -> Arc<SystemClock> {
            self.created.lock().unwrap().last().unwrap().clone()
        }

        fn count(&self) -> usize {
            self.created.lock().unwrap().len()
        }
    }

    impl ClockFactory for Arc<TrackingClockFactory> {
        fn create(&self) -> Arc<dyn AudioClock> {
            let clock = Arc::new(SystemClock::new());
            self.created.lock().unwrap().push(clock.clone());
            clock
        }
    }

    #[test]
    fn test_ensure_running_resumes_suspended_clock() {
        let factory = Arc::new(TrackingClockFactory::new());
        let ctx = PlaybackContext::new(Box::new(factory.clone()), Arc::new(NullFactory));

        factory.latest().suspend();
        assert_eq!(ctx.clock().state(), ClockState::Suspended);

        ctx.ensure_running().unwrap();
        assert_eq!(ctx.clock().state(), ClockState::Running);
        assert_eq!(factory.count(), 1);
    }

    #[test]
    fn test_closed_clock_is_replaced_and_backends_invalidated() {
        let factory = Arc::new(TrackingClockFactory::new());
        let ctx = PlaybackContext::new(Box::new(factory.clone()), Arc::new(NullFactory));

        ctx.backends().load("organ").unwrap();
        assert!(!ctx.backends().is_empty());

        factory.latest().close();
        let clock = ctx.ensure_running().unwrap();

        assert_eq!(clock.state(), ClockState::Running);
        assert_eq!(factory.count(), 2);
        // Backends were bound to the dead clock.
        assert!(ctx.backends().is_empty());
    }

    #[test]
    fn test_ensure_running_noop_when_running() {
        let factory = Arc::new(TrackingClockFactory::new());
        let ctx = PlaybackContext::new(Box::new(factory.clone()), Arc::new(NullFactory));
        ctx.ensure_running().unwrap();
        assert_eq!(factory.count(), 1);
    }
}
