// Chord resolution: Roman numeral + key -> concrete pitches.
//
// A numeral is looked up among the key's diatonic triads (asking the theory
// for a seventh chord when the numeral carries one), the chord symbol is
// decoded into root and intervals, and the root is anchored in a middle
// register. The anchored chord is then spread across several octaves into
// the candidate pool that voice assignment chooses from.
//
// Any failure along the way yields a chord with no pitches. That is not an
// error: the assembler turns it into a measure of rests and generation goes
// on with the next chord.

use crate::key::{Key, LETTER_PCS, NoteName};
use crate::progression::RomanNumeral;
use crate::theory::{ChordInfo, DiatonicTheory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Octave the chord root is anchored in (MIDI convention, C4 = 60).
pub const DEFAULT_ANCHOR_OCTAVE: i16 = 4;

/// Anchor octave for roots lettered A or B, which would otherwise sit near
/// the top of the middle register.
pub const LOW_ANCHOR_OCTAVE: i16 = 3;

/// Octave offsets applied when expanding a chord into its candidate pool.
pub const POOL_OCTAVES: std::ops::RangeInclusive<i16> = -2..=3;

/// A chord resolved in a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChord {
    /// Roman-numeral label as requested.
    pub numeral: String,
    /// Chord symbol the numeral resolved to, e.g. "G7". Empty on failure.
    pub symbol: String,
    pub root_pc: Option<u8>,
    /// Member pitch classes, root first, in stacking order.
    pub pitch_classes: Vec<u8>,
    pub seventh: bool,
    /// Anchored absolute pitches, root first.
    pub pitches: Vec<u8>,
}

impl ResolvedChord {
    fn unresolved(numeral: &str) -> Self {
        ResolvedChord {
            numeral: numeral.to_string(),
            symbol: String::new(),
            root_pc: None,
            pitch_classes: Vec::new(),
            seventh: false,
            pitches: Vec::new(),
        }
    }

    /// True when resolution failed and the measure must rest.
    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    /// The anchored root pitch.
    pub fn root_pitch(&self) -> Option<u8> {
        self.pitches.first().copied()
    }

    /// The chord fifth's pitch class (third stacked interval), if any.
    pub fn fifth_pc(&self) -> Option<u8> {
        self.pitch_classes.get(2).copied()
    }

    /// The chord third's pitch class, if any.
    pub fn third_pc(&self) -> Option<u8> {
        self.pitch_classes.get(1).copied()
    }
}

/// Resolve a numeral in `key`.
pub fn resolve_numeral(
    numeral: RomanNumeral,
    key: &Key,
    theory: &impl DiatonicTheory,
) -> ResolvedChord {
    let label = numeral.symbol(key.mode);
    let triads = theory.diatonic_triads(key);
    let Some(triad) = triads.get(numeral.degree as usize) else {
        return ResolvedChord::unresolved(&label);
    };

    let mut info = theory.chord(triad);
    if numeral.seventh && !triad.contains('7') {
        let seventh = theory.chord(&format!("{triad}7"));
        if seventh.valid {
            info = seventh;
        }
    }
    if !info.valid {
        return ResolvedChord::unresolved(&label);
    }

    let pitches = anchor_pitches(&info);
    if pitches.is_empty() {
        return ResolvedChord::unresolved(&label);
    }
    ResolvedChord {
        numeral: label,
        symbol: info.symbol.clone(),
        root_pc: info.root_pc(),
        pitch_classes: pitches.iter().map(|p| p % 12).collect(),
        seventh: info.intervals.len() > 3,
        pitches,
    }
}

/// Resolve a numeral given as text. Unparsable numerals resolve to an empty
/// chord.
pub fn resolve_symbol(text: &str, key: &Key, theory: &impl DiatonicTheory) -> ResolvedChord {
    match RomanNumeral::parse(text) {
        Some(numeral) => {
            let mut chord = resolve_numeral(numeral, key, theory);
            chord.numeral = text.to_string();
            chord
        }
        None => ResolvedChord::unresolved(text),
    }
}

/// MIDI pitch of `note` in `octave`, or `None` outside 0..=127.
fn midi_pitch(note: NoteName, octave: i16) -> Option<u8> {
    let pitch =
        (octave + 1) * 12 + LETTER_PCS[note.letter as usize] as i16 + note.accidental as i16;
    u8::try_from(pitch).ok().filter(|&p| p <= 127)
}

/// Anchor a chord's root and stack its intervals above it. Intervals that
/// would leave the MIDI range are dropped.
pub fn anchor_pitches(info: &ChordInfo) -> Vec<u8> {
    let Some(root) = info.root else {
        return Vec::new();
    };
    let octave = match root.letter_char() {
        'A' | 'B' => LOW_ANCHOR_OCTAVE,
        _ => DEFAULT_ANCHOR_OCTAVE,
    };
    let Some(root_pitch) = midi_pitch(root, octave) else {
        return Vec::new();
    };
    info.intervals
        .iter()
        .filter_map(|&iv| root_pitch.checked_add(iv).filter(|&p| p <= 127))
        .collect()
}

/// Spread chord pitches over several octaves: the candidate universe for one
/// measure's voice assignment. Sorted ascending, no duplicates.
pub fn expand_pool(pitches: &[u8]) -> Vec<u8> {
    let mut pool = BTreeSet::new();
    for &p in pitches {
        for offset in POOL_OCTAVES {
            let shifted = p as i16 + offset * 12;
            if (0..=127).contains(&shifted) {
                pool.insert(shifted as u8);
            }
        }
    }
    pool.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::TertianTheory;

    #[test]
    fn test_resolve_tonic_in_c() {
        let key = Key::parse("C").unwrap();
        let chord = resolve_numeral(RomanNumeral::TONIC, &key, &TertianTheory);
        assert_eq!(chord.symbol, "C");
        assert_eq!(chord.root_pc, Some(0));
        assert_eq!(chord.pitches, vec![60, 64, 67]);
        assert_eq!(chord.pitch_classes, vec![0, 4, 7]);
        assert!(!chord.seventh);
    }

    #[test]
    fn test_a_and_b_roots_anchor_lower() {
        let key = Key::parse("C").unwrap();
        let vi = resolve_numeral(RomanNumeral::SUBMEDIANT, &key, &TertianTheory);
        assert_eq!(vi.symbol, "Am");
        assert_eq!(vi.pitches, vec![57, 60, 64]);

        let vii = resolve_numeral(RomanNumeral::LEADING_TONE, &key, &TertianTheory);
        assert_eq!(vii.symbol, "Bdim");
        assert_eq!(vii.pitches, vec![59, 62, 65]);

        // Bb in F major is lettered B and anchors low too.
        let key = Key::parse("F").unwrap();
        let iv = resolve_numeral(RomanNumeral::SUBDOMINANT, &key, &TertianTheory);
        assert_eq!(iv.symbol, "Bb");
        assert_eq!(iv.root_pitch(), Some(58));
    }

    #[test]
    fn test_dominant_seventh() {
        let key = Key::parse("C").unwrap();
        let v7 = resolve_numeral(RomanNumeral::DOMINANT_SEVENTH, &key, &TertianTheory);
        assert_eq!(v7.symbol, "G7");
        assert!(v7.seventh);
        assert_eq!(v7.pitches, vec![67, 71, 74, 77]);
        assert_eq!(v7.pitch_classes, vec![7, 11, 2, 5]);
        assert_eq!(v7.third_pc(), Some(11));
        assert_eq!(v7.fifth_pc(), Some(2));
    }

    #[test]
    fn test_minor_dominant_is_major() {
        let key = Key::parse("Am").unwrap();
        let v = resolve_numeral(RomanNumeral::DOMINANT, &key, &TertianTheory);
        assert_eq!(v.symbol, "E");
        assert_eq!(v.pitch_classes, vec![4, 8, 11]);
        assert_eq!(v.numeral, "V");
    }

    #[test]
    fn test_unavailable_seventh_keeps_triad() {
        // "Caug7" is not a recognized symbol; a theory that spelled III+ in
        // minor would fall back to the plain triad.
        let theory = TertianTheory;
        let info = theory.chord("Caug");
        assert!(info.valid);
        assert!(!theory.chord("Caug7").valid);
        assert_eq!(anchor_pitches(&info), vec![60, 64, 68]);
    }

    #[test]
    fn test_invalid_numeral_resolves_empty() {
        let key = Key::parse("C").unwrap();
        let chord = resolve_symbol("IX", &key, &TertianTheory);
        assert!(chord.is_empty());
        assert!(chord.pitch_classes.is_empty());
        assert_eq!(chord.root_pc, None);
        assert_eq!(chord.numeral, "IX");

        let ok = resolve_symbol("iv", &key, &TertianTheory);
        assert_eq!(ok.symbol, "F");
    }

    #[test]
    fn test_expand_pool() {
        let pool = expand_pool(&[60, 64, 67]);
        assert_eq!(pool.first(), Some(&36));
        assert_eq!(pool.last(), Some(&103));
        assert_eq!(pool.len(), 18);
        assert!(pool.windows(2).all(|w| w[0] < w[1]));
        assert!(pool.iter().all(|p| [0, 4, 7].contains(&(p % 12))));
    }

    #[test]
    fn test_expand_pool_dedups_and_clips() {
        let pool = expand_pool(&[120, 108]);
        assert!(pool.iter().all(|&p| p <= 127));
        // 108 + 12 = 120 coincides with the other pitch.
        assert_eq!(pool.iter().filter(|&&p| p == 120).count(), 1);
        assert!(expand_pool(&[]).is_empty());
    }
}
