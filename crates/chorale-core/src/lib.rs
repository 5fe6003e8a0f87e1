//! Chorale Core - Playback transport for precomputed musical timelines.
//!
//! This crate renders an event timeline (tick-based voice/note data from an
//! external composition engine) into scheduled playback on an audio clock:
//!
//! - **Timing** - Tick/second conversion at a fixed 480 PPQ resolution
//! - **Events** - The immutable timeline structure the engine produces
//! - **Clock** - The audio clock adapter and its lifecycle states
//! - **Backend** - Sound backends, instrument resolution, the load cache
//! - **Scheduler** - One-shot note scheduling against the clock
//! - **Player** - The transport state machine and position tracker
//! - **Presets** - Static form metadata
//! - **Generator** - The composition-engine boundary
//!
//! # Architecture
//!
//! A [`PlaybackContext`] owns the process-wide resources (one audio clock,
//! one backend cache) and is injected into each [`Player`]. Transport
//! commands are totally ordered by a generation counter; any work that
//! blocked (backend loads, clock bring-up) re-checks its generation before
//! touching state, so the last command always wins and stale position
//! trackers wind down on their own.

pub mod backend;
pub mod clock;
pub mod context;
pub mod error;
pub mod events;
pub mod generator;
pub mod pitch;
pub mod player;
pub mod presets;
pub mod scheduler;
pub mod timing;

// Re-export main types for convenience.
pub use backend::{BackendCache, BackendFactory, NullBackend, SoundBackend, resolve_instrument};
pub use clock::{AudioClock, ClockFactory, ClockState, SystemClock, SystemClockFactory};
pub use context::PlaybackContext;
pub use error::PlaybackError;
pub use events::{EventData, NoteEvent, TrackData};
pub use generator::{Generator, GeneratorConfig};
pub use player::{Player, TransportEvent, TransportState};
pub use presets::{FormCategory, FormPreset, FORM_PRESETS, form_preset, forms_in_category};
pub use timing::{PPQ, seconds_to_ticks, ticks_to_seconds};
