//! Pitch naming and frequency helpers.

/// Key names as the generator spells them (flats for Eb/Ab/Bb).
pub const KEY_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Chromatic note names, sharp-spelled.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert a MIDI note number to a note name, e.g. 60 -> "C4".
pub fn midi_to_note_name(midi: u8) -> String {
    let name = NOTE_NAMES[(midi % 12) as usize];
    let octave = (midi / 12) as i32 - 1;
    format!("{name}{octave}")
}

/// Convert a MIDI note number to a frequency in Hz (A4 = 440 Hz).
pub fn midi_to_freq(midi: u8) -> f64 {
    440.0 * 2.0_f64.powf((midi as f64 - 69.0) / 12.0)
}

/// Whether a MIDI note falls on a black key.
pub fn is_black_key(midi: u8) -> bool {
    matches!(midi % 12, 1 | 3 | 6 | 8 | 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_names() {
        assert_eq!(midi_to_note_name(60), "C4");
        assert_eq!(midi_to_note_name(69), "A4");
        assert_eq!(midi_to_note_name(0), "C-1");
        assert_eq!(midi_to_note_name(61), "C#4");
    }

    #[test]
    fn test_frequencies() {
        assert!((midi_to_freq(69) - 440.0).abs() < 1e-9);
        assert!((midi_to_freq(57) - 220.0).abs() < 1e-9);
        assert!((midi_to_freq(60) - 261.6256).abs() < 0.001);
    }

    #[test]
    fn test_black_keys() {
        assert!(!is_black_key(60)); // C
        assert!(is_black_key(61)); // C#
        assert!(!is_black_key(64)); // E
        assert!(is_black_key(70)); // Bb
    }
}
