// Keys, note spelling, and meters: the top-level inputs of a request.
//
// A key keeps its tonic as a letter plus accidental rather than a bare
// pitch class, because diatonic chord symbols are spelled by letter from the
// tonic (F major needs "Bb", not "A#"). Parsing here is the fail-fast
// boundary: an unparsable key or meter is a configuration error and no
// measure is generated.
//
// Used by theory.rs for spelling and scale construction and by engine.rs
// for input validation.

use crate::error::{ChoraleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Natural letter names in scale order, C first.
pub const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

/// Pitch class of each natural letter.
pub const LETTER_PCS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Semitone offsets of the major scale from its tonic.
pub const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Semitone offsets of the natural minor scale.
pub const NATURAL_MINOR_SCALE: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Semitone offsets of the harmonic minor scale (raised 7th).
pub const HARMONIC_MINOR_SCALE: [u8; 7] = [0, 2, 3, 5, 7, 8, 11];

/// Major or minor tonality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    Major,
    Minor,
}

/// Largest accidental a note name may carry (a double sharp or flat).
pub const MAX_ACCIDENTAL: i8 = 2;

/// A spelled note name: letter index into `LETTERS` plus accidental in
/// semitones (-2..=2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawNoteName")]
pub struct NoteName {
    pub letter: u8,
    pub accidental: i8,
}

#[derive(Deserialize)]
struct RawNoteName {
    letter: u8,
    accidental: i8,
}

impl TryFrom<RawNoteName> for NoteName {
    type Error = String;

    fn try_from(raw: RawNoteName) -> std::result::Result<Self, Self::Error> {
        let name = NoteName {
            letter: raw.letter,
            accidental: raw.accidental,
        };
        if name.is_valid() {
            Ok(name)
        } else {
            Err(format!(
                "note letter {} / accidental {} out of range",
                raw.letter, raw.accidental
            ))
        }
    }
}

impl NoteName {
    pub fn new(letter: u8, accidental: i8) -> Self {
        NoteName {
            letter: letter % 7,
            accidental,
        }
    }

    /// Letter within `LETTERS` and accidental within `MAX_ACCIDENTAL`.
    pub fn is_valid(self) -> bool {
        (self.letter as usize) < LETTERS.len() && self.accidental.abs() <= MAX_ACCIDENTAL
    }

    pub fn pitch_class(self) -> u8 {
        let natural = LETTER_PCS[(self.letter % 7) as usize] as i16;
        (natural + self.accidental as i16).rem_euclid(12) as u8
    }

    pub fn letter_char(self) -> char {
        LETTERS[(self.letter % 7) as usize]
    }

    /// Spell `pc` on the given letter, choosing the accidental that reaches
    /// it by the shortest route.
    pub fn spell(letter: u8, pc: u8) -> Self {
        let natural = LETTER_PCS[(letter % 7) as usize] as i16;
        let mut diff = (pc as i16 - natural).rem_euclid(12);
        if diff > 6 {
            diff -= 12;
        }
        NoteName::new(letter, diff as i8)
    }

    /// Parse a leading note name ("C", "F#", "Bb", "ebb") and return it with
    /// the unconsumed remainder of the string.
    pub fn parse_prefix(s: &str) -> Option<(NoteName, &str)> {
        let mut chars = s.char_indices();
        let (_, first) = chars.next()?;
        let letter = LETTERS
            .iter()
            .position(|&l| l == first.to_ascii_uppercase())? as u8;

        let mut accidental: i8 = 0;
        let mut consumed = first.len_utf8();
        for (i, c) in chars {
            match c {
                '#' => accidental += 1,
                'b' => accidental -= 1,
                _ => {
                    consumed = i;
                    break;
                }
            }
            consumed = i + c.len_utf8();
        }
        if accidental.abs() > MAX_ACCIDENTAL {
            return None;
        }
        Some((NoteName::new(letter, accidental), &s[consumed..]))
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter_char())?;
        let sign = if self.accidental > 0 { '#' } else { 'b' };
        for _ in 0..self.accidental.unsigned_abs() {
            write!(f, "{sign}")?;
        }
        Ok(())
    }
}

/// A key: spelled tonic plus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub tonic: NoteName,
    pub mode: KeyMode,
}

impl Key {
    pub fn new(tonic: NoteName, mode: KeyMode) -> Self {
        Key { tonic, mode }
    }

    /// C major, the default key of the CLI.
    pub fn c_major() -> Self {
        Key::new(NoteName::new(0, 0), KeyMode::Major)
    }

    /// Parse "C", "Am", "F#m", "Bb major", "c minor", "Ebmin".
    ///
    /// Tonics whose scale would need triple accidentals ("E##", "Fbb minor")
    /// are rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let invalid = || ChoraleError::InvalidKey(text.to_string());
        let (tonic, rest) = NoteName::parse_prefix(trimmed).ok_or_else(invalid)?;
        let mode = match rest.trim().to_ascii_lowercase().as_str() {
            "" | "maj" | "major" => KeyMode::Major,
            "m" | "min" | "minor" => KeyMode::Minor,
            _ => return Err(invalid()),
        };
        let key = Key::new(tonic, mode);
        if !key.is_spellable() {
            return Err(invalid());
        }
        Ok(key)
    }

    /// True when the tonic is a valid note name and every degree of the
    /// key's scale (both sevenths in minor) spells with at most a double
    /// accidental.
    pub fn is_spellable(&self) -> bool {
        if !self.tonic.is_valid() {
            return false;
        }
        let scales: &[&[u8; 7]] = match self.mode {
            KeyMode::Major => &[&MAJOR_SCALE],
            KeyMode::Minor => &[&NATURAL_MINOR_SCALE, &HARMONIC_MINOR_SCALE],
        };
        let tonic_pc = self.tonic_pc();
        scales.iter().all(|scale| {
            scale.iter().enumerate().all(|(degree, iv)| {
                let pc = (tonic_pc + iv) % 12;
                NoteName::spell(self.tonic.letter + degree as u8, pc).is_valid()
            })
        })
    }

    pub fn tonic_pc(&self) -> u8 {
        self.tonic.pitch_class()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            KeyMode::Major => "major",
            KeyMode::Minor => "minor",
        };
        write!(f, "{} {}", self.tonic, mode)
    }
}

/// Note value of one beat, serialized with the short symbols used by
/// notation front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Duration {
    #[serde(rename = "h")]
    Half,
    #[serde(rename = "q")]
    Quarter,
    #[serde(rename = "8")]
    Eighth,
    #[serde(rename = "16")]
    Sixteenth,
}

impl Duration {
    /// Length in quarter-note units as a (numerator, denominator) pair.
    pub fn quarters(self) -> (u32, u32) {
        match self {
            Duration::Half => (2, 1),
            Duration::Quarter => (1, 1),
            Duration::Eighth => (1, 2),
            Duration::Sixteenth => (1, 4),
        }
    }
}

/// A time signature such as 3/4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meter {
    pub beats: u32,
    pub beat_value: u32,
}

impl Meter {
    pub fn new(beats: u32, beat_value: u32) -> Result<Self> {
        if beats == 0 {
            return Err(ChoraleError::InvalidMeter(format!("{beats}/{beat_value}")));
        }
        if !matches!(beat_value, 2 | 4 | 8 | 16) {
            return Err(ChoraleError::UnsupportedBeatValue(beat_value));
        }
        Ok(Meter { beats, beat_value })
    }

    /// Parse "beats/beat-value", e.g. "4/4" or "6/8".
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ChoraleError::InvalidMeter(text.to_string());
        let (beats, value) = text.trim().split_once('/').ok_or_else(invalid)?;
        let beats: u32 = beats.trim().parse().map_err(|_| invalid())?;
        let value: u32 = value.trim().parse().map_err(|_| invalid())?;
        Meter::new(beats, value)
    }

    pub fn beat_duration(&self) -> Duration {
        match self.beat_value {
            2 => Duration::Half,
            8 => Duration::Eighth,
            16 => Duration::Sixteenth,
            _ => Duration::Quarter,
        }
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_value)
    }
}
