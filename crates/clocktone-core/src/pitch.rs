//! Note name to frequency conversion (A4 = 440 Hz, equal temperament)

use crate::scale::{CHROMATIC, Note};

/// Reference pitch of A4 in Hz
pub const A4_HZ: f64 = 440.0;

/// Frequency of `note` in `octave` (scientific pitch notation, C4 = middle C)
pub fn note_to_frequency(note: Note, octave: i32) -> f64 {
    let semitones = note.offset_from_a() + (octave - 4) * 12;
    A4_HZ * 2f64.powf(semitones as f64 / 12.0)
}

/// Lenient lookup by name. Unrecognised names are treated as A.
pub fn name_to_frequency(name: &str, octave: i32) -> f64 {
    note_to_frequency(Note::from_name(name).unwrap_or(Note::A), octave)
}

/// Shift a frequency by a (possibly fractional or negative) number of semitones
pub fn transpose(frequency: f64, semitones: f64) -> f64 {
    frequency * 2f64.powf(semitones / 12.0)
}

/// Closest octave-4 note to `frequency`, measured linearly in Hz
pub fn nearest_note(frequency: f64) -> Note {
    CHROMATIC
        .iter()
        .copied()
        .min_by(|a, b| {
            let da = (note_to_frequency(*a, 4) - frequency).abs();
            let db = (note_to_frequency(*b, 4) - frequency).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(Note::C)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_pitches() {
        assert_eq!(note_to_frequency(Note::A, 4), 440.0);
        assert_eq!(note_to_frequency(Note::A, 5), 880.0);
        assert_eq!(note_to_frequency(Note::A, 3), 220.0);
        assert!((note_to_frequency(Note::C, 4) - 261.63).abs() < 0.1);
        assert!((note_to_frequency(Note::C, 2) - 65.41).abs() < 0.01);
    }

    #[test]
    fn test_names_and_fallback() {
        assert_eq!(name_to_frequency("Db", 4), note_to_frequency(Note::CSharp, 4));
        assert_eq!(name_to_frequency("not-a-note", 4), 440.0);
    }

    #[test]
    fn test_transpose() {
        assert!((transpose(440.0, 12.0) - 880.0).abs() < 1e-9);
        assert!((transpose(440.0, -12.0) - 220.0).abs() < 1e-9);
        assert!((transpose(note_to_frequency(Note::C, 4), 7.0) - note_to_frequency(Note::G, 4)).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_note() {
        assert_eq!(nearest_note(440.0), Note::A);
        assert_eq!(nearest_note(263.0), Note::C);
        assert_eq!(nearest_note(20.0), Note::C);
    }
}
