// Closest-note selection: the scoring primitive behind every voice choice.
//
// Each candidate pitch is scored by its distance to a target pitch, scaled by
// how it moves from the voice's previous pitch. With the smoothness slider at
// w = smoothness / 10, repeated notes and steps get cheaper as w rises while
// leaps get costlier, and leaps beyond the threshold cost more still. The
// cheapest candidate wins; a winner that leaps past the threshold is then
// traded for a nearby stepwise alternative when one lands close enough to
// the target.
//
// The constants below are the whole behavioral contract of "smoothness".
// Their ordering must hold: unison cheapest, then steps, then leaps.

/// Largest melodic interval, in semitones, treated as a step.
pub const STEP_LIMIT: u8 = 2;

/// Default leap threshold: a perfect fifth.
pub const DEFAULT_LEAP_THRESHOLD: u8 = 7;

/// Multiplier base for a repeated note.
pub const UNISON_FACTOR: f64 = 0.1;

/// Multiplier base for stepwise motion.
pub const STEP_FACTOR: f64 = 0.5;

/// Offset subtracted from by w in the unison and step multipliers; keeps them
/// positive at w = 1.
pub const SMOOTHNESS_OFFSET: f64 = 1.1;

/// Scale of the w-weighted penalty for leaps within the threshold.
pub const LEAP_WEIGHT: f64 = 0.5;

/// Multiplier floor for leaps beyond the threshold.
pub const LARGE_LEAP_BASE: f64 = 1.5;

/// A stepwise alternative replaces a leaping winner when its raw distance to
/// the target is at most this many times the winner's cost.
pub const STEP_SWAP_RATIO: f64 = 2.0;

/// Motion multiplier for moving `interval` semitones with weight `w`.
pub fn motion_multiplier(interval: u8, w: f64, leap_threshold: u8) -> f64 {
    let threshold = f64::from(leap_threshold.max(1));
    if interval == 0 {
        UNISON_FACTOR * (SMOOTHNESS_OFFSET - w)
    } else if interval <= STEP_LIMIT {
        STEP_FACTOR * (SMOOTHNESS_OFFSET - w)
    } else if interval <= leap_threshold {
        1.0 + (f64::from(interval) / threshold) * LEAP_WEIGHT * w
    } else {
        LARGE_LEAP_BASE + (f64::from(interval) / 12.0) * w
    }
}

/// Cost of choosing `candidate`.
pub fn candidate_cost(
    candidate: u8,
    target: u8,
    previous: Option<u8>,
    smoothness: u8,
    leap_threshold: u8,
) -> f64 {
    let base = f64::from(candidate.abs_diff(target));
    match previous {
        Some(prev) => {
            let w = f64::from(smoothness.min(10)) / 10.0;
            base * motion_multiplier(candidate.abs_diff(prev), w, leap_threshold)
        }
        None => base,
    }
}

/// Choose the candidate closest to `target`, weighted by motion from
/// `previous`.
///
/// With no candidates, returns `previous` if there is one, else `target`.
/// Ties go to the earliest candidate, which for an ascending pool is the
/// lower pitch.
pub fn select_closest(
    target: u8,
    candidates: &[u8],
    previous: Option<u8>,
    smoothness: u8,
    leap_threshold: u8,
) -> u8 {
    match candidates {
        [] => return previous.unwrap_or(target),
        [only] => return *only,
        _ => {}
    }

    let mut best = candidates[0];
    let mut best_cost = f64::INFINITY;
    for &c in candidates {
        let cost = candidate_cost(c, target, previous, smoothness, leap_threshold);
        if cost < best_cost {
            best = c;
            best_cost = cost;
        }
    }

    if let Some(prev) = previous {
        if best.abs_diff(prev) > leap_threshold {
            let stepwise = candidates
                .iter()
                .copied()
                .filter(|&c| c.abs_diff(prev) <= STEP_LIMIT)
                .min_by_key(|&c| c.abs_diff(target));
            if let Some(step) = stepwise {
                if f64::from(step.abs_diff(target)) <= STEP_SWAP_RATIO * best_cost {
                    best = step;
                }
            }
        }
    }

    best
}
