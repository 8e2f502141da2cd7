// Roman-numeral chord progressions.
//
// A progression is planned before any pitch is chosen: one numeral per
// measure, opening on the tonic and closing with an authentic cadence. The
// chord vocabulary widens with the harmonic complexity slider, and interior
// chords follow a small table of functional preferences (predominant moves
// to dominant, dominant resolves to tonic or deceptively to vi, and so on).
//
// Randomness comes only from the caller's `RandomSource`, so a seeded
// request always plans the same progression.
//
// Consumed by chord.rs, which resolves each numeral against the key.

use crate::key::{Key, KeyMode};
use crate::theory::DiatonicTheory;
use chorale_prng::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scale-degree chord label: degree 0-6 (I-VII) plus a seventh flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RomanNumeral {
    pub degree: u8,
    pub seventh: bool,
}

const NUMERALS: [&str; 7] = ["I", "II", "III", "IV", "V", "VI", "VII"];

impl RomanNumeral {
    pub const TONIC: RomanNumeral = RomanNumeral::triad(0);
    pub const SUPERTONIC: RomanNumeral = RomanNumeral::triad(1);
    pub const MEDIANT: RomanNumeral = RomanNumeral::triad(2);
    pub const SUBDOMINANT: RomanNumeral = RomanNumeral::triad(3);
    pub const DOMINANT: RomanNumeral = RomanNumeral::triad(4);
    pub const SUBMEDIANT: RomanNumeral = RomanNumeral::triad(5);
    pub const LEADING_TONE: RomanNumeral = RomanNumeral::triad(6);
    pub const DOMINANT_SEVENTH: RomanNumeral = RomanNumeral {
        degree: 4,
        seventh: true,
    };

    pub const fn triad(degree: u8) -> Self {
        RomanNumeral {
            degree,
            seventh: false,
        }
    }

    /// Parse a numeral such as "V7", "ii", "vii°" or "viio7".
    ///
    /// Case and quality marks are ignored; the degree comes from the letters
    /// alone and the seventh from a trailing "7".
    pub fn parse(text: &str) -> Option<Self> {
        let mut s = text.trim();
        let seventh = s.ends_with('7');
        if seventh {
            s = &s[..s.len() - 1];
        }
        let s = s.trim_end_matches(['°', 'o', 'ø', '+']);
        let upper = s.to_ascii_uppercase();
        let degree = NUMERALS.iter().position(|&n| n == upper)? as u8;
        Some(RomanNumeral { degree, seventh })
    }

    /// The conventional symbol in a given mode: case shows triad quality,
    /// "°" marks diminished.
    pub fn symbol(self, mode: KeyMode) -> String {
        let base = NUMERALS[(self.degree % 7) as usize];
        let (lower, diminished) = match (mode, self.degree) {
            (KeyMode::Major, 1 | 2 | 5) => (true, false),
            (KeyMode::Major, 6) => (true, true),
            (KeyMode::Minor, 0 | 3) => (true, false),
            (KeyMode::Minor, 1 | 6) => (true, true),
            _ => (false, false),
        };
        let mut out = if lower {
            base.to_ascii_lowercase()
        } else {
            base.to_string()
        };
        if diminished {
            out.push('°');
        }
        if self.seventh {
            out.push('7');
        }
        out
    }
}

impl fmt::Display for RomanNumeral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol(KeyMode::Major))
    }
}

/// How many times a repeated chord is redrawn before the repeat is accepted.
pub const MAX_REPEAT_RETRIES: usize = 5;

/// Complexity at which vi and ii join the vocabulary.
pub const SECONDARY_COMPLEXITY: u8 = 3;
/// Complexity at which V becomes available as V7.
pub const SEVENTH_COMPLEXITY: u8 = 5;
/// Complexity at which iii and vii° join the vocabulary.
pub const TERTIARY_COMPLEXITY: u8 = 7;

/// A planned progression, one numeral per measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub mode: KeyMode,
    pub numerals: Vec<RomanNumeral>,
}

impl Progression {
    pub fn symbols(&self) -> Vec<String> {
        self.numerals.iter().map(|n| n.symbol(self.mode)).collect()
    }
}

/// The chord vocabulary for a complexity level, in tier order.
pub fn allowed_chords(complexity: u8) -> Vec<RomanNumeral> {
    let mut allowed = vec![
        RomanNumeral::TONIC,
        RomanNumeral::SUBDOMINANT,
        RomanNumeral::DOMINANT,
    ];
    if complexity >= SECONDARY_COMPLEXITY {
        allowed.extend([RomanNumeral::SUBMEDIANT, RomanNumeral::SUPERTONIC]);
    }
    if complexity >= TERTIARY_COMPLEXITY {
        allowed.extend([RomanNumeral::MEDIANT, RomanNumeral::LEADING_TONE]);
    }
    if complexity >= SEVENTH_COMPLEXITY && !allowed.contains(&RomanNumeral::DOMINANT_SEVENTH) {
        allowed.push(RomanNumeral::DOMINANT_SEVENTH);
    }
    allowed
}

/// Functional successors preferred after `prev`, or `None` for "anything".
fn preferred_successors(prev: RomanNumeral) -> Option<&'static [RomanNumeral]> {
    const TO_DOMINANT: &[RomanNumeral] = &[
        RomanNumeral::DOMINANT,
        RomanNumeral::DOMINANT_SEVENTH,
        RomanNumeral::LEADING_TONE,
    ];
    const TO_TONIC: &[RomanNumeral] = &[RomanNumeral::TONIC, RomanNumeral::SUBMEDIANT];
    const FROM_SUBMEDIANT: &[RomanNumeral] = &[
        RomanNumeral::SUPERTONIC,
        RomanNumeral::SUBDOMINANT,
        RomanNumeral::DOMINANT,
        RomanNumeral::DOMINANT_SEVENTH,
    ];
    match prev {
        RomanNumeral::SUBDOMINANT | RomanNumeral::SUPERTONIC => Some(TO_DOMINANT),
        RomanNumeral::DOMINANT | RomanNumeral::DOMINANT_SEVENTH => Some(TO_TONIC),
        RomanNumeral::SUBMEDIANT => Some(FROM_SUBMEDIANT),
        _ => None,
    }
}

/// Draw the chord following `prev` from the allowed vocabulary.
fn next_chord(
    prev: RomanNumeral,
    allowed: &[RomanNumeral],
    rng: &mut impl RandomSource,
) -> RomanNumeral {
    let preferred: Vec<RomanNumeral> = match preferred_successors(prev) {
        Some(prefs) => prefs.iter().copied().filter(|c| allowed.contains(c)).collect(),
        None => Vec::new(),
    };
    let options = if preferred.is_empty() {
        allowed
    } else {
        &preferred[..]
    };

    let mut choice = rng.choose(options).copied().unwrap_or(prev);
    let mut attempts = 0;
    while choice == prev && options.len() > 1 && attempts < MAX_REPEAT_RETRIES {
        choice = rng.choose(options).copied().unwrap_or(prev);
        attempts += 1;
    }
    choice
}

/// Plan a progression of `measures` chords for `key`.
///
/// Opens on the tonic and, for three or more measures, closes V(7)-I. Two
/// measures give the degenerate cadence I-I.
pub fn generate_progression(
    key: &Key,
    complexity: u8,
    measures: usize,
    theory: &impl DiatonicTheory,
    rng: &mut impl RandomSource,
) -> Progression {
    let mode = theory.key_signature(key).mode;
    let allowed = allowed_chords(complexity);

    let mut numerals = Vec::with_capacity(measures);
    if measures > 0 {
        numerals.push(RomanNumeral::TONIC);
    }
    for i in 1..measures {
        let prev = numerals[i - 1];
        numerals.push(next_chord(prev, &allowed, rng));
    }

    let n = numerals.len();
    if n > 2 {
        numerals[n - 2] = if allowed.contains(&RomanNumeral::DOMINANT_SEVENTH) {
            RomanNumeral::DOMINANT_SEVENTH
        } else {
            RomanNumeral::DOMINANT
        };
        numerals[n - 1] = RomanNumeral::TONIC;
    } else if n == 2 {
        numerals[1] = RomanNumeral::TONIC;
    }

    Progression { mode, numerals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::TertianTheory;
    use chorale_prng::{ChoraleRng, ScriptedSource};

    #[test]
    fn test_parse_numerals() {
        assert_eq!(RomanNumeral::parse("I"), Some(RomanNumeral::TONIC));
        assert_eq!(RomanNumeral::parse("v7"), Some(RomanNumeral::DOMINANT_SEVENTH));
        assert_eq!(RomanNumeral::parse("vii°"), Some(RomanNumeral::LEADING_TONE));
        assert_eq!(RomanNumeral::parse("ii"), Some(RomanNumeral::SUPERTONIC));
        assert_eq!(
            RomanNumeral::parse("viio7"),
            Some(RomanNumeral {
                degree: 6,
                seventh: true
            })
        );
        assert_eq!(RomanNumeral::parse("VIII"), None);
        assert_eq!(RomanNumeral::parse("X"), None);
        assert_eq!(RomanNumeral::parse(""), None);
    }

    #[test]
    fn test_symbols_by_mode() {
        assert_eq!(RomanNumeral::SUPERTONIC.symbol(KeyMode::Major), "ii");
        assert_eq!(RomanNumeral::LEADING_TONE.symbol(KeyMode::Major), "vii°");
        assert_eq!(RomanNumeral::DOMINANT_SEVENTH.symbol(KeyMode::Major), "V7");
        assert_eq!(RomanNumeral::TONIC.symbol(KeyMode::Minor), "i");
        assert_eq!(RomanNumeral::SUPERTONIC.symbol(KeyMode::Minor), "ii°");
        assert_eq!(RomanNumeral::MEDIANT.symbol(KeyMode::Minor), "III");
        assert_eq!(RomanNumeral::DOMINANT.symbol(KeyMode::Minor), "V");
    }

    #[test]
    fn test_vocabulary_tiers() {
        assert_eq!(
            allowed_chords(0),
            vec![
                RomanNumeral::TONIC,
                RomanNumeral::SUBDOMINANT,
                RomanNumeral::DOMINANT
            ]
        );
        let mid = allowed_chords(3);
        assert!(mid.contains(&RomanNumeral::SUBMEDIANT));
        assert!(mid.contains(&RomanNumeral::SUPERTONIC));
        assert!(!mid.contains(&RomanNumeral::DOMINANT_SEVENTH));

        let seventh = allowed_chords(5);
        assert!(seventh.contains(&RomanNumeral::DOMINANT));
        assert!(seventh.contains(&RomanNumeral::DOMINANT_SEVENTH));
        assert!(!seventh.contains(&RomanNumeral::MEDIANT));

        let full = allowed_chords(10);
        assert_eq!(full.len(), 8);
        assert!(full.contains(&RomanNumeral::LEADING_TONE));
    }

    #[test]
    fn test_c_major_simple_cadence() {
        let key = Key::parse("C").unwrap();
        let mut rng = ChoraleRng::new(1);
        let prog = generate_progression(&key, 0, 4, &TertianTheory, &mut rng);
        let symbols = prog.symbols();
        assert_eq!(symbols.len(), 4);
        assert_eq!(symbols[0], "I");
        assert_eq!(&symbols[2..], &["V", "I"]);
        for s in &symbols {
            assert!(["I", "IV", "V"].contains(&s.as_str()), "unexpected chord {s}");
        }
    }

    #[test]
    fn test_cadence_uses_seventh_when_allowed() {
        let key = Key::parse("G").unwrap();
        for seed in 0..20 {
            let mut rng = ChoraleRng::new(seed);
            let prog = generate_progression(&key, 6, 8, &TertianTheory, &mut rng);
            assert_eq!(prog.numerals[0], RomanNumeral::TONIC);
            assert_eq!(prog.numerals[6], RomanNumeral::DOMINANT_SEVENTH);
            assert_eq!(prog.numerals[7], RomanNumeral::TONIC);
        }
    }

    #[test]
    fn test_short_progressions() {
        let key = Key::parse("C").unwrap();
        let mut rng = ChoraleRng::new(3);
        assert_eq!(
            generate_progression(&key, 10, 1, &TertianTheory, &mut rng).numerals,
            vec![RomanNumeral::TONIC]
        );
        assert_eq!(
            generate_progression(&key, 10, 2, &TertianTheory, &mut rng).numerals,
            vec![RomanNumeral::TONIC, RomanNumeral::TONIC]
        );
        assert!(
            generate_progression(&key, 10, 0, &TertianTheory, &mut rng)
                .numerals
                .is_empty()
        );
    }

    #[test]
    fn test_transition_preferences_followed() {
        // After IV at complexity 0 the only preferred option is V.
        let allowed = allowed_chords(0);
        let mut rng = ScriptedSource::new(vec![0, 1, 2, 3]);
        for _ in 0..4 {
            assert_eq!(
                next_chord(RomanNumeral::SUBDOMINANT, &allowed, &mut rng),
                RomanNumeral::DOMINANT
            );
        }
        // After V at complexity 0 the preference narrows to I.
        assert_eq!(
            next_chord(RomanNumeral::DOMINANT, &allowed, &mut rng),
            RomanNumeral::TONIC
        );
    }

    #[test]
    fn test_repeat_retry_is_bounded() {
        // From I the full vocabulary applies; a source that always picks
        // index 0 keeps drawing I, so after the retries the repeat stands.
        let allowed = allowed_chords(0);
        let mut rng = ScriptedSource::new(vec![0]);
        assert_eq!(
            next_chord(RomanNumeral::TONIC, &allowed, &mut rng),
            RomanNumeral::TONIC
        );

        // A source that picks I first and IV second escapes the repeat.
        let mut rng = ScriptedSource::new(vec![0, 1]);
        assert_eq!(
            next_chord(RomanNumeral::TONIC, &allowed, &mut rng),
            RomanNumeral::SUBDOMINANT
        );
    }

    #[test]
    fn test_progression_is_deterministic() {
        let key = Key::parse("Eb").unwrap();
        let a = generate_progression(&key, 8, 16, &TertianTheory, &mut ChoraleRng::new(99));
        let b = generate_progression(&key, 8, 16, &TertianTheory, &mut ChoraleRng::new(99));
        assert_eq!(a, b);
    }
}
