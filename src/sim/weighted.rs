//! Cumulative-weight selection tables
//!
//! Built once from tuning data, then sampled with the run's seeded RNG.

use rand::Rng;

use crate::error::ConfigError;

/// Immutable weighted distribution over `T`
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    items: Vec<T>,
    /// Running sums, same length as `items`
    cumulative: Vec<f64>,
    total: f64,
}

impl<T> WeightedTable<T> {
    /// Build from `(item, weight)` pairs. Zero-weight items are kept but can
    /// never be drawn. `name` only labels errors.
    pub fn new(
        name: &'static str,
        entries: impl IntoIterator<Item = (T, f32)>,
    ) -> Result<Self, ConfigError> {
        let mut items = Vec::new();
        let mut cumulative = Vec::new();
        let mut total = 0.0f64;
        for (item, weight) in entries {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight { table: name });
            }
            total += weight as f64;
            items.push(item);
            cumulative.push(total);
        }
        if total <= 0.0 {
            return Err(ConfigError::EmptyWeights(name));
        }
        Ok(Self {
            items,
            cumulative,
            total,
        })
    }

    /// Draw one item. Always returns an item with positive weight.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        let roll = rng.random::<f64>() * self.total;
        // First bucket whose upper bound lies above the roll; zero-width
        // buckets share their bound with the previous one and are skipped.
        let index = self
            .cumulative
            .partition_point(|&bound| bound <= roll)
            .min(self.items.len() - 1);
        &self.items[index]
    }

    /// Normalized probability of the item at `index`
    pub fn probability(&self, index: usize) -> f64 {
        let lower = if index == 0 { 0.0 } else { self.cumulative[index - 1] };
        (self.cumulative[index] - lower) / self.total
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_rejects_empty_and_negative() {
        let empty: Result<WeightedTable<u8>, _> = WeightedTable::new("t", []);
        assert!(matches!(empty, Err(ConfigError::EmptyWeights("t"))));

        let zeros = WeightedTable::new("t", [(1u8, 0.0), (2, 0.0)]);
        assert!(matches!(zeros, Err(ConfigError::EmptyWeights(_))));

        let negative = WeightedTable::new("t", [(1u8, 3.0), (2, -1.0)]);
        assert!(matches!(negative, Err(ConfigError::InvalidWeight { .. })));
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let table = WeightedTable::new("t", [('a', 0.0), ('b', 1.0), ('c', 0.0)]).unwrap();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..2_000 {
            assert_eq!(*table.sample(&mut rng), 'b');
        }
    }

    #[test]
    fn test_converges_to_weights() {
        let weights = [25.0, 20.0, 15.0, 10.0, 7.0, 4.0, 2.0];
        let table =
            WeightedTable::new("asteroids", weights.iter().enumerate().map(|(i, &w)| (i, w)))
                .unwrap();
        let total: f32 = weights.iter().sum();

        let mut rng = Pcg32::seed_from_u64(12345);
        let draws = 100_000;
        let mut counts = [0u32; 7];
        for _ in 0..draws {
            counts[*table.sample(&mut rng)] += 1;
        }

        for (i, &weight) in weights.iter().enumerate() {
            let expected = (weight / total) as f64;
            let observed = counts[i] as f64 / draws as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "bucket {i}: expected {expected:.3}, observed {observed:.3}"
            );
            assert!((table.probability(i) - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let table = WeightedTable::new("t", [(1u8, 1.0), (2, 2.0), (3, 3.0)]).unwrap();
        let mut a = Pcg32::seed_from_u64(99);
        let mut b = Pcg32::seed_from_u64(99);
        let seq_a: Vec<u8> = (0..50).map(|_| *table.sample(&mut a)).collect();
        let seq_b: Vec<u8> = (0..50).map(|_| *table.sample(&mut b)).collect();
        assert_eq!(seq_a, seq_b);
    }
}
