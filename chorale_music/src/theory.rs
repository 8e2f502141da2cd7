// Diatonic theory: key signatures, diatonic triads, chord symbols, scales.
//
// The harmonization engine never hard-codes chord spellings. It asks a
// `DiatonicTheory` implementation four questions: what mode and accidental
// sign a key has, what its seven diatonic triads are called, what a chord
// symbol contains, and what pitch classes a named scale has. `TertianTheory`
// is the stateless built-in answer; the trait exists so an alternate theory
// (other spellings, modal vocabularies) can be swapped in without touching
// the engine.
//
// Minor keys follow common-practice usage: triads come from the natural
// minor scale except V and vii°, which take the raised leading tone from
// harmonic minor.

use crate::key::{
    HARMONIC_MINOR_SCALE, Key, KeyMode, MAJOR_SCALE, NATURAL_MINOR_SCALE, NoteName,
};
use serde::{Deserialize, Serialize};

/// Accidental sign used when spelling a key's notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alteration {
    Natural,
    Sharp,
    Flat,
}

/// Mode and accidental sign of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    pub mode: KeyMode,
    pub alteration: Alteration,
}

/// The decoded contents of a chord symbol such as "G7" or "F#dim".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordInfo {
    pub symbol: String,
    /// Spelled root; `None` when the symbol is invalid.
    pub root: Option<NoteName>,
    /// Semitone offsets from the root, root first.
    pub intervals: Vec<u8>,
    pub valid: bool,
}

impl ChordInfo {
    fn invalid(symbol: &str) -> Self {
        ChordInfo {
            symbol: symbol.to_string(),
            root: None,
            intervals: Vec::new(),
            valid: false,
        }
    }

    pub fn root_pc(&self) -> Option<u8> {
        self.root.map(NoteName::pitch_class)
    }
}

/// Music-theory queries consumed by the harmonization engine.
///
/// Implementations must be stateless or independently reentrant; the engine
/// calls them from whichever thread runs a request.
pub trait DiatonicTheory {
    fn key_signature(&self, key: &Key) -> KeySignature;

    /// The seven diatonic triad symbols, tonic first.
    fn diatonic_triads(&self, key: &Key) -> Vec<String>;

    /// Decode a chord symbol. Unknown symbols come back with `valid: false`.
    fn chord(&self, symbol: &str) -> ChordInfo;

    /// Pitch classes of a scale named "<tonic> <type>", e.g. "D harmonic
    /// minor". Unknown names give an empty list.
    fn scale(&self, name: &str) -> Vec<u8>;
}

/// Chord suffixes recognized by `TertianTheory`, with their intervals.
/// Longer suffixes first so "m7b5" is not read as "m".
const CHORD_SUFFIXES: &[(&str, &[u8])] = &[
    ("m7b5", &[0, 3, 6, 10]),
    ("maj7", &[0, 4, 7, 11]),
    ("dim7", &[0, 3, 6, 9]),
    ("dim", &[0, 3, 6]),
    ("aug", &[0, 4, 8]),
    ("m7", &[0, 3, 7, 10]),
    ("7", &[0, 4, 7, 10]),
    ("m", &[0, 3, 7]),
    ("", &[0, 4, 7]),
];

/// Built-in tertian harmony over major and minor keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct TertianTheory;

impl TertianTheory {
    /// Spell each degree of `intervals` by letter from the key's tonic.
    fn spell_scale(key: &Key, intervals: &[u8; 7]) -> [NoteName; 7] {
        let tonic_pc = key.tonic_pc();
        std::array::from_fn(|degree| {
            let pc = (tonic_pc + intervals[degree]) % 12;
            NoteName::spell(key.tonic.letter + degree as u8, pc)
        })
    }

    fn scale_intervals(kind: &str) -> Option<&'static [u8; 7]> {
        match kind {
            "major" | "ionian" => Some(&MAJOR_SCALE),
            "minor" | "natural minor" | "aeolian" => Some(&NATURAL_MINOR_SCALE),
            "harmonic minor" => Some(&HARMONIC_MINOR_SCALE),
            _ => None,
        }
    }
}

/// Triad quality suffix from the semitone sizes of its third and fifth.
fn triad_suffix(third: u8, fifth: u8) -> &'static str {
    match (third, fifth) {
        (4, 7) => "",
        (3, 7) => "m",
        (3, 6) => "dim",
        (4, 8) => "aug",
        _ => "",
    }
}

impl DiatonicTheory for TertianTheory {
    fn key_signature(&self, key: &Key) -> KeySignature {
        let natural = match key.mode {
            KeyMode::Major => &MAJOR_SCALE,
            KeyMode::Minor => &NATURAL_MINOR_SCALE,
        };
        let spelled = Self::spell_scale(key, natural);
        let alteration = if spelled.iter().any(|n| n.accidental > 0) {
            Alteration::Sharp
        } else if spelled.iter().any(|n| n.accidental < 0) {
            Alteration::Flat
        } else {
            Alteration::Natural
        };
        KeySignature {
            mode: key.mode,
            alteration,
        }
    }

    fn diatonic_triads(&self, key: &Key) -> Vec<String> {
        let natural = match key.mode {
            KeyMode::Major => &MAJOR_SCALE,
            KeyMode::Minor => &NATURAL_MINOR_SCALE,
        };
        (0..7)
            .map(|degree| {
                // The dominant and leading-tone triads of a minor key take
                // the raised 7th.
                let scale = if key.mode == KeyMode::Minor && matches!(degree, 4 | 6) {
                    &HARMONIC_MINOR_SCALE
                } else {
                    natural
                };
                let root = Self::spell_scale(key, scale)[degree];
                let at = |step: usize| scale[(degree + step) % 7] as i16;
                let third = (at(2) - at(0)).rem_euclid(12) as u8;
                let fifth = (at(4) - at(0)).rem_euclid(12) as u8;
                format!("{}{}", root, triad_suffix(third, fifth))
            })
            .collect()
    }

    fn chord(&self, symbol: &str) -> ChordInfo {
        let Some((root, suffix)) = NoteName::parse_prefix(symbol.trim()) else {
            return ChordInfo::invalid(symbol);
        };
        match CHORD_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
            Some((_, intervals)) => ChordInfo {
                symbol: symbol.to_string(),
                root: Some(root),
                intervals: intervals.to_vec(),
                valid: true,
            },
            None => ChordInfo::invalid(symbol),
        }
    }

    fn scale(&self, name: &str) -> Vec<u8> {
        let Some((tonic, kind)) = NoteName::parse_prefix(name.trim()) else {
            return Vec::new();
        };
        let kind = kind.trim().to_ascii_lowercase();
        match Self::scale_intervals(&kind) {
            Some(intervals) => intervals
                .iter()
                .map(|iv| (tonic.pitch_class() + iv) % 12)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Pitch class of the leading tone of `key`: degree 7 of the major or
/// harmonic minor scale. Falls back to a semitone below the tonic if the
/// theory cannot name the scale.
pub fn leading_tone_pc(theory: &impl DiatonicTheory, key: &Key) -> u8 {
    let kind = match key.mode {
        KeyMode::Major => "major",
        KeyMode::Minor => "harmonic minor",
    };
    theory
        .scale(&format!("{} {}", key.tonic, kind))
        .get(6)
        .copied()
        .unwrap_or((key.tonic_pc() + 11) % 12)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_major_triads() {
        let theory = TertianTheory;
        let key = Key::parse("C").unwrap();
        assert_eq!(
            theory.diatonic_triads(&key),
            vec!["C", "Dm", "Em", "F", "G", "Am", "Bdim"]
        );
    }

    #[test]
    fn test_a_minor_triads_use_raised_leading_tone() {
        let theory = TertianTheory;
        let key = Key::parse("Am").unwrap();
        assert_eq!(
            theory.diatonic_triads(&key),
            vec!["Am", "Bdim", "C", "Dm", "E", "F", "G#dim"]
        );
    }

    #[test]
    fn test_flat_key_spelling() {
        let theory = TertianTheory;
        let key = Key::parse("F").unwrap();
        let triads = theory.diatonic_triads(&key);
        assert_eq!(triads[3], "Bb");
        assert_eq!(triads[6], "Edim");
        assert_eq!(theory.key_signature(&key).alteration, Alteration::Flat);
    }

    #[test]
    fn test_key_signatures() {
        let theory = TertianTheory;
        let sig = theory.key_signature(&Key::parse("D").unwrap());
        assert_eq!(sig.mode, KeyMode::Major);
        assert_eq!(sig.alteration, Alteration::Sharp);

        let sig = theory.key_signature(&Key::parse("Am").unwrap());
        assert_eq!(sig.mode, KeyMode::Minor);
        assert_eq!(sig.alteration, Alteration::Natural);

        let sig = theory.key_signature(&Key::parse("C minor").unwrap());
        assert_eq!(sig.alteration, Alteration::Flat);
    }

    #[test]
    fn test_chord_symbols() {
        let theory = TertianTheory;
        let g7 = theory.chord("G7");
        assert!(g7.valid);
        assert_eq!(g7.root_pc(), Some(7));
        assert_eq!(g7.intervals, vec![0, 4, 7, 10]);

        let bdim = theory.chord("Bdim");
        assert!(bdim.valid);
        assert_eq!(bdim.intervals, vec![0, 3, 6]);

        let bb = theory.chord("Bb");
        assert_eq!(bb.root_pc(), Some(10));
        assert_eq!(bb.intervals, vec![0, 4, 7]);

        assert!(theory.chord("Bdim7").valid);
        assert!(!theory.chord("Caug7").valid);
        assert!(!theory.chord("X").valid);
        assert!(!theory.chord("").valid);
    }

    #[test]
    fn test_scales_and_leading_tone() {
        let theory = TertianTheory;
        assert_eq!(theory.scale("C major"), vec![0, 2, 4, 5, 7, 9, 11]);
        assert_eq!(theory.scale("A harmonic minor"), vec![9, 11, 0, 2, 4, 5, 8]);
        assert!(theory.scale("C bebop").is_empty());

        assert_eq!(leading_tone_pc(&theory, &Key::parse("C").unwrap()), 11);
        assert_eq!(leading_tone_pc(&theory, &Key::parse("Am").unwrap()), 8);
    }
}
