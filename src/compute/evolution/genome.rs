//! Shared genome machinery: the random source and the capability trait both
//! representations implement.

use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;

use crate::schema::{
    FitnessConfig, GenomeKind, Level, LevelConfig, OperatorConfig, WeightedMeasurement,
};

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// `true` with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.r#gen::<f64>() < p
    }

    /// Uniform sample in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen()
    }

    /// Uniform integer in `lo..=hi`, or `None` when the range is empty.
    #[inline]
    pub fn range(&mut self, lo: usize, hi: usize) -> Option<usize> {
        (lo <= hi).then(|| self.rng.gen_range(lo..=hi))
    }

    /// Uniform integer in `lo..=hi`, falling back to `lo` for an empty range.
    #[inline]
    pub fn range_or_low(&mut self, lo: usize, hi: usize) -> usize {
        self.range(lo, hi).unwrap_or(lo)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// Index drawn proportionally to `weights`. `None` if no weight is
    /// positive.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        WeightedIndex::new(weights)
            .ok()
            .map(|dist| dist.sample(&mut self.rng))
    }

    /// Gaussian offset: `value + N(0, variance)`, clamped to `[min, max]`
    /// and truncated back to an integer.
    pub fn offset_by_upto(&mut self, value: usize, variance: f64, min: usize, max: usize) -> usize {
        let max = max.max(min);
        let noise: f64 = self.rng.sample(rand_distr::StandardNormal);
        let shifted = value as f64 + noise * variance.max(0.0).sqrt();
        shifted.clamp(min as f64, max as f64) as usize
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

/// Operations every genome representation supports.
///
/// Operators never modify `self`: mutation and crossover return new genomes
/// that share no storage with their parents.
pub trait LevelGenome: Clone + Send + Sync + 'static {
    /// Representation tag, used in logs and summaries.
    const KIND: GenomeKind;

    /// Generate a random genome.
    fn random(level: &LevelConfig, ops: &OperatorConfig, rng: &mut GenomeRng) -> Self;

    /// Minimal genome that renders to the baseline level.
    fn empty(level: &LevelConfig) -> Self;

    /// Produce a mutated copy.
    fn mutate(&self, ops: &OperatorConfig, rng: &mut GenomeRng) -> Self;

    /// Recombine with `other` into two mutated children.
    fn generate_children(
        &self,
        other: &Self,
        ops: &OperatorConfig,
        rng: &mut GenomeRng,
    ) -> (Self, Self);

    /// Render to a dense level. Repeated calls return identical grids.
    fn to_level(&self) -> &Level;

    /// Coefficient table used to score this representation.
    fn coefficients(fitness: &FitnessConfig) -> &[WeightedMeasurement];

    /// Structural penalty subtracted from the weighted measurement sum.
    fn penalty(&self, _fitness: &FitnessConfig) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = GenomeRng::new(42);
        let mut b = GenomeRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_seed(), b.next_seed());
        }
    }

    #[test]
    fn test_offset_stays_in_bounds() {
        let mut rng = GenomeRng::new(7);
        for _ in 0..1000 {
            let v = rng.offset_by_upto(5, 64.0, 1, 8);
            assert!((1..=8).contains(&v));
        }
        // Inverted bounds collapse onto the minimum.
        assert_eq!(rng.offset_by_upto(5, 4.0, 3, 1), 3);
    }

    #[test]
    fn test_empty_range() {
        let mut rng = GenomeRng::new(1);
        assert_eq!(rng.range(5, 4), None);
        assert_eq!(rng.range_or_low(5, 4), 5);
        assert_eq!(rng.range(3, 3), Some(3));
    }

    #[test]
    fn test_weighted_index_skips_zero_weights() {
        let mut rng = GenomeRng::new(3);
        for _ in 0..200 {
            assert_eq!(rng.weighted_index(&[0.0, 2.0, 0.0]), Some(1));
        }
        assert_eq!(rng.weighted_index(&[0.0, 0.0]), None);
    }
}
