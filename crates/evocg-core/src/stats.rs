//! Summary statistics over objective and fitness values.

use serde::{Deserialize, Serialize};

/// Population-level statistics for one scalar attribute
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population variance (divides by the sample count)
    pub variance: f64,
    pub deviation: f64,
}

impl Stats {
    /// Compute statistics over `values`; an empty slice yields all zeros.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        let iter = values.into_iter();
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for v in iter.clone() {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        if count == 0 {
            return Self::default();
        }

        let mean = sum / count as f64;
        let dev_sum: f64 = iter.map(|v| (v - mean) * (v - mean)).sum();
        let variance = dev_sum / count as f64;

        Self {
            sum,
            mean,
            min,
            max,
            variance,
            deviation: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_basic() {
        let stats = Stats::from_values(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.sum, 10.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.variance - 1.25).abs() < 1e-12);
        assert!((stats.deviation - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_stats_empty() {
        let stats = Stats::from_values(Vec::<f64>::new());
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn test_stats_constant_population() {
        let stats = Stats::from_values([3.0; 5]);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.min, stats.max);
    }
}
