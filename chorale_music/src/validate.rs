// Voice-leading checks between consecutive voicings.
//
// Findings are advisory. They are collected into the returned `Chorale` and
// logged at warn level, but nothing here alters a pitch. The checks only run
// once dissonance strictness exceeds `STRICTNESS_THRESHOLD`.
//
// Parallel motion is judged on octave-reduced intervals: a pair of voices
// that both move and sit a fifth (or octave/unison) apart before and after.

use crate::config::EngineConfig;
use crate::voicing::{Voice, Voicing};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strictness above which voice leading is checked.
pub const STRICTNESS_THRESHOLD: u8 = 3;

/// The six voice pairs, upper voice first.
const VOICE_PAIRS: [(Voice, Voice); 6] = [
    (Voice::Soprano, Voice::Alto),
    (Voice::Soprano, Voice::Tenor),
    (Voice::Soprano, Voice::Bass),
    (Voice::Alto, Voice::Tenor),
    (Voice::Alto, Voice::Bass),
    (Voice::Tenor, Voice::Bass),
];

/// One voice-leading problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// `lower` sounds above `upper`.
    Crossing { upper: Voice, lower: Voice },
    /// Adjacent voices further apart than the configured limit.
    Spacing {
        upper: Voice,
        lower: Voice,
        semitones: u8,
        limit: u8,
    },
    ParallelFifth { upper: Voice, lower: Voice },
    ParallelOctave { upper: Voice, lower: Voice },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Violation::Crossing { upper, lower } => {
                write!(f, "{} crosses above {}", lower.name(), upper.name())
            }
            Violation::Spacing {
                upper,
                lower,
                semitones,
                limit,
            } => write!(
                f,
                "{}-{} spacing {semitones} exceeds {limit}",
                upper.name(),
                lower.name()
            ),
            Violation::ParallelFifth { upper, lower } => {
                write!(f, "parallel fifths between {} and {}", upper.name(), lower.name())
            }
            Violation::ParallelOctave { upper, lower } => {
                write!(f, "parallel octaves between {} and {}", upper.name(), lower.name())
            }
        }
    }
}

/// A violation located at a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Zero-based measure of the second voicing of the pair.
    pub measure: usize,
    pub violation: Violation,
}

/// Check the move from `previous` to `current`.
///
/// Returns nothing when `strictness` is at or below the threshold or there
/// is no previous voicing.
pub fn check_voice_leading(
    previous: Option<&Voicing>,
    current: &Voicing,
    config: &EngineConfig,
    strictness: u8,
) -> Vec<Violation> {
    if strictness <= STRICTNESS_THRESHOLD {
        return Vec::new();
    }
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut found = Vec::new();

    // Crossing and spacing on adjacent pairs of the current voicing.
    for pair in Voice::ALL.windows(2) {
        let (upper, lower) = (pair[0], pair[1]);
        let (Some(hi), Some(lo)) = (current.get(upper), current.get(lower)) else {
            continue;
        };
        if lo > hi {
            found.push(Violation::Crossing { upper, lower });
        }
        if let Some(limit) = config.spacing_below(upper) {
            let semitones = hi.abs_diff(lo);
            if semitones > limit {
                found.push(Violation::Spacing {
                    upper,
                    lower,
                    semitones,
                    limit,
                });
            }
        }
    }

    for (upper, lower) in VOICE_PAIRS {
        let (Some(prev_hi), Some(prev_lo), Some(curr_hi), Some(curr_lo)) = (
            previous.get(upper),
            previous.get(lower),
            current.get(upper),
            current.get(lower),
        ) else {
            continue;
        };
        if prev_hi == curr_hi || prev_lo == curr_lo {
            continue;
        }
        let prev_ic = prev_hi.abs_diff(prev_lo) % 12;
        let curr_ic = curr_hi.abs_diff(curr_lo) % 12;
        if prev_ic == 7 && curr_ic == 7 {
            found.push(Violation::ParallelFifth { upper, lower });
        }
        if prev_ic == 0 && curr_ic == 0 {
            found.push(Violation::ParallelOctave { upper, lower });
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voicing(s: u8, a: u8, t: u8, b: u8) -> Voicing {
        Voicing {
            soprano: Some(s),
            alto: Some(a),
            tenor: Some(t),
            bass: Some(b),
        }
    }

    #[test]
    fn test_parallel_fifths_detected() {
        let config = EngineConfig::default();
        // Tenor and bass both move up a step a fifth apart.
        let prev = voicing(72, 64, 55, 48);
        let curr = voicing(72, 65, 57, 50);
        let found = check_voice_leading(Some(&prev), &curr, &config, 5);
        assert!(found.contains(&Violation::ParallelFifth {
            upper: Voice::Tenor,
            lower: Voice::Bass
        }));
    }

    #[test]
    fn test_parallel_octaves_detected() {
        let config = EngineConfig::default();
        let prev = voicing(72, 64, 55, 48);
        let curr = voicing(74, 65, 57, 50);
        let found = check_voice_leading(Some(&prev), &curr, &config, 10);
        assert!(found.contains(&Violation::ParallelOctave {
            upper: Voice::Soprano,
            lower: Voice::Bass
        }));
    }

    #[test]
    fn test_held_voice_is_not_parallel() {
        let config = EngineConfig::default();
        // Soprano holds 72; bass 48 -> 53 is oblique motion.
        let prev = voicing(72, 64, 55, 48);
        let curr = voicing(72, 65, 57, 53);
        let found = check_voice_leading(Some(&prev), &curr, &config, 10);
        assert!(!found.contains(&Violation::ParallelOctave {
            upper: Voice::Soprano,
            lower: Voice::Bass
        }));
    }

    #[test]
    fn test_crossing_and_spacing() {
        let config = EngineConfig::default();
        let prev = voicing(72, 64, 55, 48);
        let crossed = voicing(64, 67, 55, 36);
        let found = check_voice_leading(Some(&prev), &crossed, &config, 6);
        assert!(found.contains(&Violation::Crossing {
            upper: Voice::Soprano,
            lower: Voice::Alto
        }));
        // A twelfth between tenor and bass is exactly at the limit.
        assert!(!found.iter().any(|v| matches!(v, Violation::Spacing { .. })));

        let wide = voicing(79, 64, 55, 35);
        let found = check_voice_leading(Some(&prev), &wide, &config, 6);
        assert!(found.contains(&Violation::Spacing {
            upper: Voice::Soprano,
            lower: Voice::Alto,
            semitones: 15,
            limit: 12,
        }));
        assert!(found.contains(&Violation::Spacing {
            upper: Voice::Tenor,
            lower: Voice::Bass,
            semitones: 20,
            limit: 19,
        }));
    }

    #[test]
    fn test_low_strictness_and_first_measure_skip() {
        let config = EngineConfig::default();
        let prev = voicing(72, 64, 55, 48);
        let curr = voicing(74, 65, 57, 50);
        assert!(check_voice_leading(Some(&prev), &curr, &config, 3).is_empty());
        assert!(check_voice_leading(None, &curr, &config, 10).is_empty());
    }

    #[test]
    fn test_rests_are_skipped() {
        let config = EngineConfig::default();
        let prev = voicing(72, 64, 55, 48);
        let curr = Voicing {
            bass: None,
            ..voicing(74, 65, 57, 50)
        };
        let found = check_voice_leading(Some(&prev), &curr, &config, 10);
        assert!(found.iter().all(|v| !matches!(
            v,
            Violation::ParallelOctave { lower: Voice::Bass, .. }
                | Violation::ParallelFifth { lower: Voice::Bass, .. }
        )));
    }

    #[test]
    fn test_violation_display() {
        let v = Violation::ParallelFifth {
            upper: Voice::Tenor,
            lower: Voice::Bass,
        };
        assert_eq!(v.to_string(), "parallel fifths between tenor and bass");
    }
}
