//! One-shot note scheduling against the audio clock.
//!
//! Given a timeline and a starting tick offset, every qualifying note is
//! handed to the backend with an absolute clock start time and a duration.
//! The backend owns per-note timing from there; the only timer the playback
//! subsystem keeps for itself is the aggregate auto-stop in the transport.

use crate::backend::SoundBackend;
use crate::events::EventData;
use crate::timing::ticks_to_seconds;

/// Schedule all notes of `timeline` from `from_tick` onward.
///
/// Rules, applied per note independently of ordering:
/// - a note that ends at or before `from_tick` is skipped;
/// - a note straddling `from_tick` starts immediately with its duration
///   shortened by the part already in the past (skipped if nothing
///   remains);
/// - a note at or after `from_tick` keeps its full duration and starts at
///   its tick distance from the offset.
///
/// `clock_now` is the current reading of the clock the backend is bound
/// to. Returns the number of notes handed to the backend.
pub fn schedule_notes(
    timeline: &EventData,
    from_tick: u64,
    clock_now: f64,
    backend: &dyn SoundBackend,
) -> usize {
    let bpm = timeline.effective_bpm();
    let offset_seconds = ticks_to_seconds(from_tick as f64, bpm);

    let mut scheduled = 0;
    for track in &timeline.tracks {
        for note in &track.notes {
            if note.end_tick() <= from_tick {
                continue;
            }

            let start_seconds = ticks_to_seconds(note.start_tick as f64, bpm);
            let duration_seconds = ticks_to_seconds(note.duration as f64, bpm);

            let adjusted_start = (start_seconds - offset_seconds).max(0.0);
            let adjusted_duration = if note.start_tick < from_tick {
                duration_seconds - (offset_seconds - start_seconds)
            } else {
                duration_seconds
            };

            if adjusted_duration <= 0.0 {
                continue;
            }

            backend.start(
                note.pitch,
                note.velocity,
                clock_now + adjusted_start,
                adjusted_duration,
            );
            scheduled += 1;
        }
    }

    log::debug!(
        "[SCHED] {scheduled}/{} notes scheduled from tick {from_tick}",
        timeline.note_count()
    );
    scheduled
}
