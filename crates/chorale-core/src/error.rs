//! Error types for the playback subsystem.
//!
//! Only resource failures are surfaced as errors: a sound backend that
//! cannot be loaded, or an audio clock that cannot be brought up. Transport
//! precondition violations (pausing while stopped, resuming without a
//! session) are silent no-ops, and cleanup failures while silencing
//! backends are swallowed; see the transport documentation.

use thiserror::Error;

/// Errors that can escape the playback subsystem.
///
/// Every variant leaves the transport in a consistent, re-enterable state:
/// a failed `play()` rolls back to Stopped and the caller may simply retry.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// A sound backend could not be constructed for an instrument.
    #[error("failed to load instrument '{name}': {reason}")]
    InstrumentLoad {
        /// The resolved backend identifier that failed to load.
        name: String,
        /// Human-readable failure description from the factory.
        reason: String,
    },

    /// The audio clock could not be resumed or recreated.
    #[error("audio clock unavailable: {reason}")]
    ClockUnavailable {
        /// Human-readable failure description from the clock.
        reason: String,
    },
}
