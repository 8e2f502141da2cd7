// Voice assignment: one resolved chord -> one SATB voicing.
//
// Voices are placed in dependency order. The bass comes first and prefers
// the chord root. The soprano follows as a freely moving melody above it.
// The alto and tenor then fill in whichever chord tones the outer voices
// left uncovered, each confined between its neighbours and within the
// spacing limits. Every placement goes through `select_closest`, so the
// smoothness slider governs how much each voice prefers to stay put.
//
// Candidate exhaustion never fails the measure outright. The soprano avoids
// pitches that leave the inner voices no chord tone to sing, when it can.
// The inner voices fall back by dropping the pitch-class preference, then
// (tenor only) the alto-tenor spacing limit, and finally force a pitch
// clamped between their neighbours. Only when even that has nowhere to go
// does the voice rest. A resting voice is `None` here and
// becomes a measure of rests in assemble.rs.
//
// The voicing from the previous measure is passed in by value; nothing in
// this module holds state between calls.

use crate::chord::ResolvedChord;
use crate::config::EngineConfig;
use crate::selector::select_closest;
use chorale_prng::RandomSource;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Voice index in SATB order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Soprano = 0,
    Alto = 1,
    Tenor = 2,
    Bass = 3,
}

impl Voice {
    pub const ALL: [Voice; 4] = [Voice::Soprano, Voice::Alto, Voice::Tenor, Voice::Bass];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Voice::Soprano => "soprano",
            Voice::Alto => "alto",
            Voice::Tenor => "tenor",
            Voice::Bass => "bass",
        }
    }
}

/// One pitch (or rest) per voice: the state carried from measure to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Voicing {
    pub soprano: Option<u8>,
    pub alto: Option<u8>,
    pub tenor: Option<u8>,
    pub bass: Option<u8>,
}

impl Voicing {
    /// All voices resting; the state at the start of a request and after a
    /// failed chord.
    pub fn silent() -> Self {
        Voicing::default()
    }

    pub fn get(&self, voice: Voice) -> Option<u8> {
        match voice {
            Voice::Soprano => self.soprano,
            Voice::Alto => self.alto,
            Voice::Tenor => self.tenor,
            Voice::Bass => self.bass,
        }
    }

    pub fn set(&mut self, voice: Voice, pitch: Option<u8>) {
        match voice {
            Voice::Soprano => self.soprano = pitch,
            Voice::Alto => self.alto = pitch,
            Voice::Tenor => self.tenor = pitch,
            Voice::Bass => self.bass = pitch,
        }
    }

    /// Pitches in SATB order.
    pub fn as_array(&self) -> [Option<u8>; 4] {
        Voice::ALL.map(|v| self.get(v))
    }

    pub fn is_silent(&self) -> bool {
        self.as_array().iter().all(Option::is_none)
    }
}

/// Per-request inputs shared by every assignment step.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentContext<'a> {
    pub config: &'a EngineConfig,
    pub smoothness: u8,
    /// Leading-tone pitch class of the key; never doubled.
    pub leading_tone_pc: u8,
}

impl AssignmentContext<'_> {
    fn select(&self, target: u8, candidates: &[u8], previous: Option<u8>) -> u8 {
        select_closest(
            target,
            candidates,
            previous,
            self.smoothness,
            self.config.leap_threshold,
        )
    }

    /// Select preferring candidates of pitch class `pc`, falling back to the
    /// whole set when none match.
    fn select_preferring(
        &self,
        target: u8,
        candidates: &[u8],
        pc: u8,
        previous: Option<u8>,
    ) -> u8 {
        let matching: Vec<u8> = candidates.iter().copied().filter(|p| p % 12 == pc).collect();
        if matching.is_empty() {
            self.select(target, candidates, previous)
        } else {
            self.select(target, &matching, previous)
        }
    }
}

/// Pitch classes the inner voices should aim for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerTargets {
    pub tenor: u8,
    pub alto: u8,
}

fn midpoint(a: u8, b: u8) -> u8 {
    ((a as u16 + b as u16) / 2) as u8
}

/// Move one semitone from `prev` toward `goal`.
fn nudge_toward(prev: u8, goal: u8) -> u8 {
    match prev.cmp(&goal) {
        Ordering::Less => prev + 1,
        Ordering::Greater => prev - 1,
        Ordering::Equal => prev,
    }
}

/// Place the bass, preferring the chord root.
///
/// Targets the previous bass, or an octave below the anchored root at the
/// start of a phrase. Returns `None` only when no pool pitch lies in range.
pub fn assign_bass(
    pool: &[u8],
    chord: &ResolvedChord,
    previous: Option<u8>,
    ctx: &AssignmentContext<'_>,
) -> Option<u8> {
    let range = ctx.config.ranges.bass;
    let in_range: Vec<u8> = pool.iter().copied().filter(|&p| range.contains(p)).collect();
    if in_range.is_empty() {
        return None;
    }
    let target = previous
        .or_else(|| chord.root_pitch().map(|r| r.saturating_sub(12)))
        .unwrap_or(range.low);
    Some(match chord.root_pc {
        Some(root) => ctx.select_preferring(target, &in_range, root, previous),
        None => ctx.select(target, &in_range, previous),
    })
}

/// Place the soprano above the bass.
///
/// The target climbs 1-5 semitones from the previous soprano (drawn from
/// `rng`), or sits a fourth above the range floor at the start. Pitches that
/// leave room for an alto and tenor from the pool are preferred over those
/// that don't.
pub fn assign_soprano(
    pool: &[u8],
    bass: Option<u8>,
    previous: Option<u8>,
    ctx: &AssignmentContext<'_>,
    rng: &mut impl RandomSource,
) -> Option<u8> {
    let range = ctx.config.ranges.soprano;
    let candidates: Vec<u8> = pool
        .iter()
        .copied()
        .filter(|&p| range.contains(p) && bass.is_none_or(|b| p > b))
        .collect();
    let target = match previous {
        Some(prev) => prev.saturating_add(rng.range_u8_inclusive(1, 5)).min(127),
        None => range.low + 5,
    };
    if candidates.is_empty() {
        return None;
    }
    let roomy: Vec<u8> = candidates
        .iter()
        .copied()
        .filter(|&s| leaves_inner_room(pool, s, bass, ctx.config))
        .collect();
    if roomy.is_empty() {
        Some(ctx.select(target, &candidates, previous))
    } else {
        Some(ctx.select(target, &roomy, previous))
    }
}

/// Whether some alto and tenor from `pool` fit under `soprano` and above
/// `bass`, in range and within every spacing limit.
fn leaves_inner_room(pool: &[u8], soprano: u8, bass: Option<u8>, config: &EngineConfig) -> bool {
    let spacing = config.spacing;
    let above_bass = |p: u8| bass.is_none_or(|b| p > b);
    let tenor_fits = |alto: u8| {
        pool.iter().any(|&t| {
            config.ranges.tenor.contains(t)
                && t < alto
                && alto - t <= spacing.alto_tenor
                && above_bass(t)
                && bass.is_none_or(|b| t - b <= spacing.tenor_bass)
        })
    };
    pool.iter().any(|&a| {
        config.ranges.alto.contains(a)
            && a < soprano
            && soprano - a <= spacing.soprano_alto
            && above_bass(a)
            && tenor_fits(a)
    })
}

/// Decide which pitch classes the tenor and alto should supply.
///
/// Chord tones the outer voices missed come first. If fewer than two remain,
/// doubling fills the gap in the order root, fifth, third, never doubling
/// the leading tone or repeating a pitch class already listed; the root is
/// forced in as a last resort.
pub fn inner_voice_targets(
    chord: &ResolvedChord,
    bass: Option<u8>,
    soprano: Option<u8>,
    leading_tone_pc: u8,
) -> InnerTargets {
    let covered = [bass.map(|p| p % 12), soprano.map(|p| p % 12)];
    let mut needed: Vec<u8> = chord
        .pitch_classes
        .iter()
        .copied()
        .filter(|pc| !covered.contains(&Some(*pc)))
        .collect();

    let root = chord
        .root_pc
        .or_else(|| chord.pitch_classes.first().copied())
        .unwrap_or_default();
    for pc in [Some(root), chord.fifth_pc(), chord.third_pc()]
        .into_iter()
        .flatten()
    {
        if needed.len() >= 2 {
            break;
        }
        if pc == leading_tone_pc || needed.contains(&pc) {
            continue;
        }
        needed.push(pc);
    }
    while needed.len() < 2 {
        needed.push(root);
    }

    InnerTargets {
        tenor: needed[0],
        alto: needed[1],
    }
}

/// Place the alto strictly between soprano and bass, within the
/// soprano-alto spacing limit.
///
/// With no pool pitch in that window the alto is forced to the midpoint of
/// the outer voices, clamped into the window.
pub fn assign_alto(
    pool: &[u8],
    soprano: Option<u8>,
    bass: Option<u8>,
    target_pc: u8,
    previous: Option<u8>,
    ctx: &AssignmentContext<'_>,
) -> Option<u8> {
    let range = ctx.config.ranges.alto;
    let limit = ctx.config.spacing.soprano_alto;
    let candidates: Vec<u8> = pool
        .iter()
        .copied()
        .filter(|&p| {
            range.contains(p)
                && soprano.is_none_or(|s| p < s && s - p <= limit)
                && bass.is_none_or(|b| p > b)
        })
        .collect();
    if candidates.is_empty() {
        return forced_alto(soprano?, bass, ctx);
    }

    let center = match (soprano, bass) {
        (Some(s), Some(b)) => midpoint(s, b),
        _ => midpoint(range.low, range.high),
    };
    let target = previous.map_or(center, |prev| nudge_toward(prev, center));
    Some(ctx.select_preferring(target, &candidates, target_pc, previous))
}

/// Last-resort alto: halfway between soprano and bass (or the range floor),
/// clamped into range, under the soprano within its spacing limit and above
/// the bass.
fn forced_alto(soprano: u8, bass: Option<u8>, ctx: &AssignmentContext<'_>) -> Option<u8> {
    let range = ctx.config.ranges.alto;
    let low = range
        .low
        .max(soprano.saturating_sub(ctx.config.spacing.soprano_alto))
        .max(bass.map_or(0, |b| b.saturating_add(1)));
    let high = range.high.min(soprano.saturating_sub(1));
    if soprano == 0 || low > high {
        return None;
    }
    Some(midpoint(soprano, bass.unwrap_or(range.low)).clamp(low, high))
}

/// Place the tenor below the alto (or the soprano when the alto rests) and
/// above the bass.
///
/// Falls back from the spacing-constrained set to any in-range pitch between
/// its neighbours (still within reach of the bass), and from there to a pitch
/// forced just below the upper neighbour and clamped into range.
pub fn assign_tenor(
    pool: &[u8],
    alto: Option<u8>,
    soprano: Option<u8>,
    bass: Option<u8>,
    target_pc: u8,
    previous: Option<u8>,
    ctx: &AssignmentContext<'_>,
) -> Option<u8> {
    let range = ctx.config.ranges.tenor;
    let spacing = ctx.config.spacing;
    let upper = alto.or(soprano);
    let between = |p: u8| {
        range.contains(p) && upper.is_none_or(|u| p < u) && bass.is_none_or(|b| p > b)
    };

    let center = match (upper, bass) {
        (Some(u), Some(b)) => midpoint(u, b),
        _ => midpoint(range.low, range.high),
    };
    let target = previous.map_or(center, |prev| nudge_toward(prev, center));

    let spaced: Vec<u8> = pool
        .iter()
        .copied()
        .filter(|&p| {
            between(p)
                && alto.is_none_or(|a| a - p <= spacing.alto_tenor)
                && bass.is_none_or(|b| p - b <= spacing.tenor_bass)
        })
        .collect();
    if !spaced.is_empty() {
        return Some(ctx.select_preferring(target, &spaced, target_pc, previous));
    }

    let unspaced: Vec<u8> = pool
        .iter()
        .copied()
        .filter(|&p| between(p) && bass.is_none_or(|b| p - b <= spacing.tenor_bass))
        .collect();
    if !unspaced.is_empty() {
        return Some(ctx.select(target, &unspaced, previous));
    }

    forced_tenor(upper?, bass, ctx)
}

/// Last-resort tenor: two semitones under the upper voice (one if that
/// would land on the leading tone), clamped above the bass and into range.
///
/// The one-or-two semitone offset is kept for compatibility with earlier
/// output; it has no voice-leading rationale of its own.
fn forced_tenor(upper: u8, bass: Option<u8>, ctx: &AssignmentContext<'_>) -> Option<u8> {
    let range = ctx.config.ranges.tenor;
    let mut forced = upper.saturating_sub(2);
    if forced % 12 == ctx.leading_tone_pc {
        forced = upper.saturating_sub(1);
    }

    let low = bass.map_or(range.low, |b| range.low.max(b.saturating_add(1)));
    let mut high = range.high.min(upper.saturating_sub(1));
    if let Some(b) = bass {
        high = high.min(b.saturating_add(ctx.config.spacing.tenor_bass));
    }
    if upper == 0 || low > high {
        return None;
    }
    Some(forced.clamp(low, high))
}

/// Assign all four voices for one chord, given the previous measure's
/// voicing.
pub fn assign_voicing(
    chord: &ResolvedChord,
    pool: &[u8],
    previous: &Voicing,
    ctx: &AssignmentContext<'_>,
    rng: &mut impl RandomSource,
) -> Voicing {
    let bass = assign_bass(pool, chord, previous.bass, ctx);
    let soprano = assign_soprano(pool, bass, previous.soprano, ctx, rng);
    let targets = inner_voice_targets(chord, bass, soprano, ctx.leading_tone_pc);
    let alto = assign_alto(pool, soprano, bass, targets.alto, previous.alto, ctx);
    let tenor = assign_tenor(
        pool,
        alto,
        soprano,
        bass,
        targets.tenor,
        previous.tenor,
        ctx,
    );
    Voicing {
        soprano,
        alto,
        tenor,
        bass,
    }
}
