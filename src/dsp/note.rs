/*
Note Names and Equal Temperament
================================

Notes arrive as names like "C4", "F#3" or "Bb5". The MIDI number is

    midi = (octave + 1) * 12 + pitch_class

where pitch_class: C=0, C#=1, D=2, D#=3, E=4, F=5, F#=6, G=7, G#=8, A=9,
A#=10, B=11, and a flat lowers its letter by one semitone. Middle C (C4) is
MIDI 60, A4 is MIDI 69.

Frequency uses 12-tone equal temperament around a reference pitch for A4:

    f = tuning * 2^((midi - 69) / 12)
*/

/// Standard concert pitch for A4.
pub const A4_HZ: f32 = 440.0;

const MIDI_A4: i32 = 69;

/// Parse a note name into a MIDI note number.
///
/// Accepts an upper- or lower-case letter, an optional `#` or `b`, and an
/// octave (which may be negative, e.g. `C-1` = 0). Returns `None` for anything
/// else or for results outside 0..=127.
pub fn note_to_midi(note: &str) -> Option<u8> {
    let mut chars = note.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let mut semitone: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let octave_str = if let Some(stripped) = rest.strip_prefix('#') {
        semitone += 1;
        stripped
    } else if let Some(stripped) = rest.strip_prefix('b') {
        semitone -= 1;
        stripped
    } else {
        rest
    };

    let octave: i32 = octave_str.parse().ok()?;
    let midi = octave.checked_add(1)?.checked_mul(12)?.checked_add(semitone)?;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

/// Convert a MIDI note number to frequency in Hz.
#[inline]
pub fn midi_to_frequency(midi: f32, tuning: f32) -> f32 {
    tuning * 2.0_f32.powf((midi - MIDI_A4 as f32) / 12.0)
}

/// Note name straight to frequency at the given A4 tuning.
pub fn note_to_frequency(note: &str, tuning: f32) -> Option<f32> {
    note_to_midi(note).map(|m| midi_to_frequency(m as f32, tuning))
}

/// Frequency ratio for an offset in semitones plus cents.
#[inline]
pub fn pitch_ratio(semitones: f32, cents: f32) -> f32 {
    2.0_f32.powf((semitones + cents / 100.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naturals_map_to_midi() {
        assert_eq!(note_to_midi("C4"), Some(60));
        assert_eq!(note_to_midi("A4"), Some(69));
        assert_eq!(note_to_midi("B3"), Some(59));
        assert_eq!(note_to_midi("C-1"), Some(0));
        assert_eq!(note_to_midi("G9"), Some(127));
    }

    #[test]
    fn accidentals_shift_by_semitone() {
        assert_eq!(note_to_midi("C#4"), Some(61));
        assert_eq!(note_to_midi("Db4"), Some(61));
        assert_eq!(note_to_midi("F#3"), Some(54));
        assert_eq!(note_to_midi("Bb5"), Some(82));
        assert_eq!(note_to_midi("e2"), Some(40));
    }

    #[test]
    fn malformed_names_are_rejected() {
        for bad in ["", "H4", "C", "C#", "4C", "Cx4", "C4.5", "G#9", "Cb-1"] {
            assert_eq!(note_to_midi(bad), None, "{:?} should not parse", bad);
        }
    }

    #[test]
    fn huge_octaves_are_rejected_without_overflow() {
        for bad in ["C999999999", "E357913940", "B2147483647", "C-2147483648", "A-999999999"] {
            assert_eq!(note_to_midi(bad), None, "{:?} should not parse", bad);
        }
        assert_eq!(note_to_midi("C10"), None);
        assert_eq!(note_to_midi("C-2"), None);
    }

    #[test]
    fn a4_is_reference_pitch() {
        let f = note_to_frequency("A4", A4_HZ).unwrap();
        assert!((f - 440.0).abs() < 1e-3);
        let a5 = note_to_frequency("A5", A4_HZ).unwrap();
        assert!((a5 - 880.0).abs() < 1e-2);
        let c4 = note_to_frequency("C4", A4_HZ).unwrap();
        assert!((c4 - 261.6256).abs() < 1e-2);
    }

    #[test]
    fn pitch_ratio_octave_and_cents() {
        assert!((pitch_ratio(12.0, 0.0) - 2.0).abs() < 1e-5);
        assert!((pitch_ratio(-12.0, 0.0) - 0.5).abs() < 1e-5);
        assert!((pitch_ratio(0.0, 1200.0) - 2.0).abs() < 1e-5);
    }
}
