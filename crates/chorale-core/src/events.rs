//! The event timeline produced by the composition engine.
//!
//! These types mirror the generator's output structure field for field;
//! the playback subsystem accepts the data as-is and never mutates it.
//! `description` and per-track `note_count` are carried through untouched
//! for display by unrelated components.

use serde::{Deserialize, Serialize};

use crate::timing;

/// A single note in the timeline.
///
/// Immutable once produced by the generator. `start_tick` and `duration`
/// are in ticks at [`timing::PPQ`] resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI pitch (0-127).
    pub pitch: u8,
    /// MIDI velocity (0-127).
    pub velocity: u8,
    /// Tick at which the note starts.
    pub start_tick: u64,
    /// Note length in ticks; always positive in generator output.
    pub duration: u64,
    /// Voice index the note belongs to.
    pub voice: u8,
}

impl NoteEvent {
    /// Tick at which the note ends.
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration
    }
}

/// One voice/track of the timeline.
///
/// Notes are in generator insertion order, which is not necessarily
/// time-sorted; consumers must not rely on ordering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    /// Display name supplied by the generator.
    pub name: String,
    /// MIDI channel.
    pub channel: u8,
    /// MIDI program number.
    pub program: u8,
    /// Generator-reported note count, passed through for display.
    #[serde(default)]
    pub note_count: u32,
    /// The notes of this track.
    pub notes: Vec<NoteEvent>,
}

/// A complete precomputed timeline.
///
/// Owned by the caller and read-only to the playback subsystem. The
/// transport caches one snapshot per session to support resume-after-pause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Tempo in beats per minute.
    pub bpm: f64,
    /// Total timeline length in ticks.
    pub total_ticks: u64,
    /// Human-readable description from the generator, passed through.
    #[serde(default)]
    pub description: String,
    /// The tracks of the timeline.
    pub tracks: Vec<TrackData>,
}

impl EventData {
    /// Total number of notes across all tracks.
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    /// Timeline length in seconds at its own tempo.
    pub fn duration_seconds(&self) -> f64 {
        timing::ticks_to_seconds(self.total_ticks as f64, self.effective_bpm())
    }

    /// The timeline's tempo, falling back to 100 BPM when the generator
    /// emitted a non-positive value.
    pub fn effective_bpm(&self) -> f64 {
        if self.bpm > 0.0 {
            self.bpm
        } else {
            100.0
        }
    }
}
