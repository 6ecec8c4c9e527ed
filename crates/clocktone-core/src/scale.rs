//! Twelve-tone scales generated by modular arithmetic

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of slots in every scale (one per pitch class)
pub const SCALE_LEN: usize = 12;

/// A pitch class of the chromatic alphabet, spelled with sharps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Note {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

/// Chromatic alphabet, indexed by semitones above C
pub const CHROMATIC: [Note; SCALE_LEN] = [
    Note::C,
    Note::CSharp,
    Note::D,
    Note::DSharp,
    Note::E,
    Note::F,
    Note::FSharp,
    Note::G,
    Note::GSharp,
    Note::A,
    Note::ASharp,
    Note::B,
];

impl Note {
    /// Note at `index` semitones above C (wraps modulo 12)
    pub fn from_index(index: usize) -> Self {
        CHROMATIC[index % SCALE_LEN]
    }

    /// Semitones above C, 0..=11
    pub fn index(self) -> usize {
        self as usize
    }

    /// Semitone offset from A in the same octave (C = -9, B = +2)
    pub fn offset_from_a(self) -> i32 {
        self.index() as i32 - 9
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::CSharp => "C#",
            Self::D => "D",
            Self::DSharp => "D#",
            Self::E => "E",
            Self::F => "F",
            Self::FSharp => "F#",
            Self::G => "G",
            Self::GSharp => "G#",
            Self::A => "A",
            Self::ASharp => "A#",
            Self::B => "B",
        }
    }

    /// Parse a note name, accepting flat spellings as enharmonic aliases
    pub fn from_name(name: &str) -> Option<Self> {
        let note = match name.trim() {
            "C" => Self::C,
            "C#" | "Db" => Self::CSharp,
            "D" => Self::D,
            "D#" | "Eb" => Self::DSharp,
            "E" => Self::E,
            "F" => Self::F,
            "F#" | "Gb" => Self::FSharp,
            "G" => Self::G,
            "G#" | "Ab" => Self::GSharp,
            "A" => Self::A,
            "A#" | "Bb" => Self::ASharp,
            "B" => Self::B,
            _ => return None,
        };
        Some(note)
    }

    /// Note `semitones` above (or below) this one, wrapping within the octave
    pub fn transposed(self, semitones: i32) -> Self {
        let index = (self.index() as i32 + semitones).rem_euclid(SCALE_LEN as i32);
        Self::from_index(index as usize)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Note {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| CoreError::UnknownNote(s.to_string()))
    }
}

/// Named generating intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalePattern {
    Chromatic,
    CircleOfFourths,
    #[default]
    CircleOfFifths,
}

impl ScalePattern {
    pub const ALL: [ScalePattern; 3] = [Self::Chromatic, Self::CircleOfFourths, Self::CircleOfFifths];

    /// Semitones added per step
    pub fn interval(&self) -> u8 {
        match self {
            Self::Chromatic => 1,
            Self::CircleOfFourths => 5,
            Self::CircleOfFifths => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chromatic => "Chromatic",
            Self::CircleOfFourths => "Circle of Fourths",
            Self::CircleOfFifths => "Circle of Fifths",
        }
    }

    pub fn scale(&self, start: Note) -> Scale {
        generate_scale(self.interval(), start.index() as u8)
    }
}

impl FromStr for ScalePattern {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromatic" => Ok(Self::Chromatic),
            "fourths" | "circle_of_fourths" => Ok(Self::CircleOfFourths),
            "fifths" | "circle_of_fifths" => Ok(Self::CircleOfFifths),
            _ => Err(CoreError::UnknownScalePattern(s.to_string())),
        }
    }
}

/// An ordered sequence of exactly 12 notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale([Note; SCALE_LEN]);

impl Default for Scale {
    fn default() -> Self {
        ScalePattern::default().scale(Note::C)
    }
}

impl Scale {
    pub fn notes(&self) -> &[Note; SCALE_LEN] {
        &self.0
    }

    /// Note in slot `index` (wraps modulo 12)
    pub fn note(&self, index: usize) -> Note {
        self.0[index % SCALE_LEN]
    }

    /// Position of `note` in the scale, if present
    pub fn position_of(&self, note: Note) -> Option<usize> {
        self.0.iter().position(|&n| n == note)
    }

    /// Random permutation of the chromatic alphabet (Fisher-Yates)
    pub fn shuffled(rng: &mut fastrand::Rng) -> Self {
        let mut notes = CHROMATIC;
        for i in (1..SCALE_LEN).rev() {
            let j = rng.usize(0..=i);
            notes.swap(i, j);
        }
        Self(notes)
    }

    /// Labels such as `"C3"`, `"G3"`, ...
    pub fn labels_with_octave(&self, octave: i32) -> Vec<String> {
        self.0.iter().map(|note| format!("{note}{octave}")).collect()
    }
}

/// Generate a 12-note scale by stepping `interval_semitones` around the
/// chromatic circle from `start_note` (0 = C).
///
/// Intervals sharing a factor with 12 revisit notes; callers pick from
/// [`ScalePattern`], whose intervals are all coprime with 12.
pub fn generate_scale(interval_semitones: u8, start_note: u8) -> Scale {
    let mut notes = [Note::C; SCALE_LEN];
    let mut current = start_note as usize % SCALE_LEN;
    for slot in notes.iter_mut() {
        *slot = CHROMATIC[current];
        current = (current + interval_semitones as usize) % SCALE_LEN;
    }
    Scale(notes)
}
