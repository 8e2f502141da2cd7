// Deterministic, portable pseudo-random numbers for the chorale engine.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding,
// and the `RandomSource` trait through which every random decision in
// `chorale_music` is drawn (progression branching, soprano step size).
// Generation functions take `&mut impl RandomSource` rather than owning a
// generator, so a request can be replayed exactly from a seed and tests can
// substitute a `ScriptedSource` that replays fixed values.
//
// **Critical constraint: determinism.** Given the same prior state, every
// method here must produce identical output on every platform. No
// floating-point arithmetic in the core generator, no OS entropy.

use serde::{Deserialize, Serialize};

/// A source of uniformly distributed `u64` values.
///
/// Only `next_u64` is required. The range helpers are derived from it with
/// rejection sampling to avoid modulo bias.
pub trait RandomSource {
    /// Produce the next raw value.
    fn next_u64(&mut self) -> u64;

    /// Uniform integer in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        // Reject the short tail so every residue is equally likely.
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `usize` in `[low, high)`.
    fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Uniform `u8` in `[low, high]`, inclusive on both ends.
    ///
    /// Panics if `low > high`.
    fn range_u8_inclusive(&mut self, low: u8, high: u8) -> u8 {
        assert!(low <= high, "range_u8_inclusive: low must be <= high");
        self.range_u64(low as u64, high as u64 + 1) as u8
    }

    /// Pick one element of a non-empty slice, or `None` if it is empty.
    fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.range_usize(0, items.len())])
        }
    }
}

/// Xoshiro256++ generator, the default `RandomSource`.
///
/// Serializable so a caller can snapshot the stream position alongside a
/// generated chorale and resume from it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChoraleRng {
    s: [u64; 4],
}

impl ChoraleRng {
    /// Create a generator seeded from a `u64`.
    ///
    /// SplitMix64 expands the seed into the 256-bit state. Equal seeds give
    /// equal streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }
}

impl RandomSource for ChoraleRng {
    fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }
}

/// Replays a fixed list of raw values, cycling when exhausted.
///
/// Ranges are mapped by plain modulo with no rejection, so raw value `k`
/// always lands on position `k % n` of a width-`n` range. This lets tests
/// dictate individual choices without reverse-engineering a seed.
#[derive(Clone, Debug)]
pub struct ScriptedSource {
    values: Vec<u64>,
    pos: usize,
}

impl ScriptedSource {
    /// Panics if `values` is empty.
    pub fn new(values: Vec<u64>) -> Self {
        assert!(!values.is_empty(), "ScriptedSource needs at least one value");
        Self { values, pos: 0 }
    }
}

impl RandomSource for ScriptedSource {
    fn next_u64(&mut self) -> u64 {
        let v = self.values[self.pos % self.values.len()];
        self.pos += 1;
        v
    }

    fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        low + self.next_u64() % (high - low)
    }
}

/// SplitMix64, used only to expand a `u64` seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = ChoraleRng::new(42);
        let mut b = ChoraleRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = ChoraleRng::new(42);
        let mut b = ChoraleRng::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = ChoraleRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn range_u8_inclusive_reaches_both_ends() {
        let mut rng = ChoraleRng::new(666);
        let mut seen = [false; 5];
        for _ in 0..10_000 {
            let v = rng.range_u8_inclusive(1, 5);
            assert!((1..=5).contains(&v), "range_u8_inclusive out of range: {v}");
            seen[(v - 1) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s), "every step size should appear: {seen:?}");
    }

    #[test]
    fn choose_handles_empty_and_single() {
        let mut rng = ChoraleRng::new(7);
        let empty: [u8; 0] = [];
        assert_eq!(rng.choose(&empty), None);
        assert_eq!(rng.choose(&[9]), Some(&9));
    }

    #[test]
    fn scripted_source_maps_small_values_to_positions() {
        let mut src = ScriptedSource::new(vec![0, 2, 4]);
        let items = ["a", "b", "c", "d", "e"];
        assert_eq!(src.choose(&items), Some(&"a"));
        assert_eq!(src.choose(&items), Some(&"c"));
        assert_eq!(src.choose(&items), Some(&"e"));
        // Cycles back to the first value.
        assert_eq!(src.choose(&items), Some(&"a"));
    }

    #[test]
    fn scripted_inclusive_range() {
        // range 1..=5 has width 5; raw 3 lands on 1 + 3.
        let mut src = ScriptedSource::new(vec![3]);
        assert_eq!(src.range_u8_inclusive(1, 5), 4);
    }

    #[test]
    fn serialization_roundtrip_resumes_stream() {
        let mut rng = ChoraleRng::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: ChoraleRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
