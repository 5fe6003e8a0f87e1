//! Tick/time conversion.
//!
//! Musical time is expressed in ticks at a fixed resolution of [`PPQ`]
//! pulses per quarter note. Conversion to wall-clock seconds is
//! parameterized by tempo only; both directions are pure functions.

/// Pulses per quarter note.
///
/// This resolution is load-bearing: it must match the resolution used by
/// the generator that produced the event timeline, or every scheduled
/// note lands at the wrong time.
pub const PPQ: u32 = 480;

/// Convert a tick count to seconds at the given tempo.
#[inline]
pub fn ticks_to_seconds(ticks: f64, bpm: f64) -> f64 {
    (ticks / PPQ as f64) * (60.0 / bpm)
}

/// Convert seconds to a (fractional) tick count at the given tempo.
#[inline]
pub fn seconds_to_ticks(seconds: f64, bpm: f64) -> f64 {
    (seconds * bpm / 60.0) * PPQ as f64
}
