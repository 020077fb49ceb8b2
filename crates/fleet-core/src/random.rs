//! Random-decision sources for the tick engine.
//!
//! Every probabilistic branch of a tick (battery drain, lane choice,
//! whether to assign, which robot, bin drift) draws from a
//! [`RandomSource`]. Production uses [`SeededRandom`]; tests plug in
//! [`FixedRandom`] to force a specific branch, or a seeded generator to
//! make a run reproducible.

use std::ops::Range;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A source of random decisions.
pub trait RandomSource: Send {
    /// `true` with probability `p`. Values outside `[0, 1]` are clamped.
    fn chance(&mut self, p: f64) -> bool;

    /// A value in `[range.start, range.end)`. An empty range yields `start`.
    fn uniform(&mut self, range: Range<f64>) -> f64;

    /// An index in `0..len`. Callers guarantee `len > 0`; `0` yields `0`.
    fn pick(&mut self, len: usize) -> usize;

    /// One of `-1`, `0`, or `1`.
    fn step(&mut self) -> i64;
}

/// [`RandomSource`] backed by a small, fast, seedable PRNG.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: SmallRng,
}

impl SeededRandom {
    /// Deterministic source: the same seed replays the same decisions.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Source seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Seeded if `seed` is given, otherwise from entropy.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::from_seed)
    }
}

impl RandomSource for SeededRandom {
    fn chance(&mut self, p: f64) -> bool {
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }

    fn uniform(&mut self, range: Range<f64>) -> f64 {
        if range.is_empty() {
            return range.start;
        }
        self.rng.random_range(range)
    }

    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.random_range(0..len)
    }

    fn step(&mut self) -> i64 {
        self.rng.random_range(-1..=1)
    }
}

/// Largest position [`FixedRandom`] uses, keeping results below the range end.
const MAX_FRACTION: f64 = 0.999_999;

/// [`RandomSource`] returning scripted values.
///
/// `fraction` positions [`uniform`](RandomSource::uniform) within its
/// range: `0.0` returns the start, values close to `1.0` approach the end.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedRandom {
    /// Answer to every [`chance`](RandomSource::chance) call.
    pub chance: bool,
    /// Position within the range for [`uniform`](RandomSource::uniform).
    pub fraction: f64,
    /// Index returned by [`pick`](RandomSource::pick), reduced modulo `len`.
    pub index: usize,
    /// Value returned by [`step`](RandomSource::step), clamped to `-1..=1`.
    pub step: i64,
}

impl FixedRandom {
    /// Every branch fires, ranges yield their start, picks the first item,
    /// drift is zero.
    pub const fn always() -> Self {
        Self {
            chance: true,
            fraction: 0.0,
            index: 0,
            step: 0,
        }
    }

    /// No probabilistic branch fires.
    pub const fn never() -> Self {
        Self {
            chance: false,
            fraction: 0.0,
            index: 0,
            step: 0,
        }
    }

    /// Same source with a different uniform position.
    #[must_use]
    pub const fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    /// Same source with a different pick index.
    #[must_use]
    pub const fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Same source with a different drift step.
    #[must_use]
    pub const fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }
}

impl RandomSource for FixedRandom {
    fn chance(&mut self, _p: f64) -> bool {
        self.chance
    }

    fn uniform(&mut self, range: Range<f64>) -> f64 {
        let fraction = self.fraction.clamp(0.0, MAX_FRACTION);
        (range.end - range.start).mul_add(fraction, range.start)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.index.checked_rem(len).unwrap_or(0)
    }

    fn step(&mut self) -> i64 {
        self.step.clamp(-1, 1)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn seeded_sources_replay() {
        let mut a = SeededRandom::from_seed(7);
        let mut b = SeededRandom::from_seed(7);
        for _ in 0..50 {
            assert_eq!(a.pick(10), b.pick(10));
            assert_eq!(a.step(), b.step());
        }
    }

    #[test]
    fn seeded_uniform_stays_in_range() {
        let mut rng = SeededRandom::from_seed(1);
        for _ in 0..1000 {
            let v = rng.uniform(2.0..5.0);
            assert!((2.0..5.0).contains(&v));
        }
    }

    #[test]
    fn seeded_step_covers_all_values() {
        let mut rng = SeededRandom::from_seed(3);
        let seen: BTreeSet<i64> = (0..300).map(|_| rng.step()).collect();
        assert_eq!(seen, BTreeSet::from([-1, 0, 1]));
    }

    #[test]
    fn chance_frequency_tracks_probability() {
        let mut rng = SeededRandom::from_seed(99);
        let hits = (0..10_000).filter(|_| rng.chance(0.7)).count();
        assert!((6_700..7_300).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn empty_inputs_are_safe() {
        let mut rng = SeededRandom::from_seed(5);
        assert_eq!(rng.pick(0), 0);
        assert!((rng.uniform(3.0..3.0) - 3.0).abs() < f64::EPSILON);
        assert!(!rng.chance(-0.5));
        assert!(rng.chance(2.0));
    }

    #[test]
    fn fixed_uniform_positions_within_range() {
        let mut start = FixedRandom::always();
        assert!((start.uniform(2.0..5.0) - 2.0).abs() < f64::EPSILON);
        let mut end = FixedRandom::always().with_fraction(1.0);
        let v = end.uniform(2.0..5.0);
        assert!(v < 5.0 && v > 4.99);
    }

    #[test]
    fn fixed_pick_wraps() {
        let mut rng = FixedRandom::always().with_index(7);
        assert_eq!(rng.pick(3), 1);
        assert_eq!(rng.pick(0), 0);
    }
}
