//! Sound backends and the process-wide backend cache.
//!
//! A backend is an external sound-rendering unit: hand it a pitch, a
//! velocity, an absolute clock time and a duration, and it makes the note
//! happen. Backends are expensive to construct (typically a network fetch
//! plus sample decoding), so loaded instances are memoized per resolved
//! instrument name and reused across playback sessions. Entries only die
//! when the audio clock they were loaded against is replaced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::PlaybackError;

/// A loaded sound-rendering unit.
///
/// Exactly two capabilities: schedule a note, and silence everything.
/// Note starts are fire-and-forget: the backend owns all per-note timing
/// once `start` returns.
pub trait SoundBackend: Send + Sync {
    /// Schedule one note.
    ///
    /// `when` is an absolute time on the audio clock the backend was loaded
    /// against; `duration` is in seconds.
    fn start(&self, pitch: u8, velocity: u8, when: f64, duration: f64);

    /// Immediately silence any sounding or scheduled notes.
    fn stop(&self) -> anyhow::Result<()>;
}

/// Constructs backends on demand.
///
/// `load` receives an already-resolved backend identifier and may block
/// while fetching and decoding; the transport treats that block as a
/// suspension point and re-checks its generation afterwards.
pub trait BackendFactory: Send + Sync {
    /// Construct a backend for the given resolved instrument identifier.
    fn load(&self, instrument: &str) -> Result<Arc<dyn SoundBackend>, PlaybackError>;
}

/// Logical instrument name -> backend identifier.
const INSTRUMENT_MAP: [(&str, &str); 6] = [
    ("organ", "church_organ"),
    ("harpsichord", "harpsichord"),
    ("piano", "acoustic_grand_piano"),
    ("violin", "violin"),
    ("cello", "cello"),
    ("guitar", "acoustic_guitar_nylon"),
];

/// Resolve a logical instrument name to its backend identifier.
///
/// Unmapped names pass through unchanged so callers can address backends
/// directly by identifier.
pub fn resolve_instrument(name: &str) -> &str {
    INSTRUMENT_MAP
        .iter()
        .find(|(logical, _)| *logical == name)
        .map(|(_, resolved)| *resolved)
        .unwrap_or(name)
}

type Slot = Arc<Mutex<Option<Arc<dyn SoundBackend>>>>;

/// Memoizing cache of loaded backends, keyed by resolved instrument name.
///
/// Loading is single-flight per name: concurrent `load` calls for the same
/// instrument serialize on a per-name slot, so the factory runs at most
/// once per entry. Different instruments load independently.
pub struct BackendCache {
    factory: Arc<dyn BackendFactory>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl BackendCache {
    /// Create an empty cache over the given factory.
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            factory,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached backend for an instrument, constructing and
    /// memoizing it if absent.
    ///
    /// A failed construction leaves the slot empty, so a later call can
    /// retry.
    pub fn load(&self, instrument: &str) -> Result<Arc<dyn SoundBackend>, PlaybackError> {
        let resolved = resolve_instrument(instrument).to_string();

        let slot = {
            let mut slots = self.slots.lock().expect("backend cache lock poisoned");
            slots
                .entry(resolved.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .clone()
        };

        // Holding the slot lock across construction is what makes
        // overlapping loads of the same name single-flight.
        let mut entry = slot.lock().expect("backend slot lock poisoned");
        if let Some(backend) = entry.as_ref() {
            return Ok(backend.clone());
        }

        log::debug!("[BACKEND] loading '{resolved}'");
        let backend = self.factory.load(&resolved)?;
        *entry = Some(backend.clone());
        Ok(backend)
    }

    /// Whether a backend for this instrument is loaded and ready.
    ///
    /// An in-flight load counts as not ready.
    pub fn contains(&self, instrument: &str) -> bool {
        let resolved = resolve_instrument(instrument);
        let slots = self.slots.lock().expect("backend cache lock poisoned");
        slots
            .get(resolved)
            .is_some_and(|slot| slot.try_lock().map(|entry| entry.is_some()).unwrap_or(false))
    }

    /// Ask every loaded backend to silence its notes.
    ///
    /// Best-effort: failures are logged and discarded, and in-flight loads
    /// are skipped rather than waited for.
    pub fn stop_all(&self) {
        let slots: Vec<(String, Slot)> = {
            let map = self.slots.lock().expect("backend cache lock poisoned");
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        for (name, slot) in slots {
            let backend = match slot.try_lock() {
                Ok(entry) => entry.clone(),
                Err(_) => continue,
            };
            if let Some(backend) = backend {
                if let Err(e) = backend.stop() {
                    log::debug!("[BACKEND] stop failed for '{name}': {e}");
                }
            }
        }
    }

    /// Drop every cached entry.
    ///
    /// Invoked when the audio clock is recreated: backends are bound to the
    /// clock instance they were loaded against and cannot outlive it.
    pub fn invalidate(&self) {
        self.slots
            .lock()
            .expect("backend cache lock poisoned")
            .clear();
    }

    /// Number of cached (or in-flight) entries.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("backend cache lock poisoned").len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A backend that renders nothing.
///
/// Useful for validation and dry runs where the scheduling path should be
/// exercised without making sound.
pub struct NullBackend;

impl SoundBackend for NullBackend {
    fn start(&self, _pitch: u8, _velocity: u8, _when: f64, _duration: f64) {}

    fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
