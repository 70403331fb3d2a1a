//! Objective → fitness scaling strategies.

use evocg_core::Stats;

use crate::genome::Direction;

/// Maps raw objectives to the fitness values used by parent selection
pub trait ScalingOperator {
    fn scale(&self, objectives: &[f64], stats: &Stats, direction: Direction) -> Vec<f64>;
}

/// Fitness equals objective
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScaling;

impl ScalingOperator for NoScaling {
    fn scale(&self, objectives: &[f64], _stats: &Stats, _direction: Direction) -> Vec<f64> {
        objectives.to_vec()
    }
}

/// Linear scaling around the mean.
///
/// When minimizing, the best objective maps to `mean / k`; when maximizing,
/// to `k * mean`. The mean keeps its value.
#[derive(Debug, Clone, Copy)]
pub struct LinearScaling {
    pub k: f64,
    /// Clamp negative fitness to zero
    pub truncate: bool,
}

impl LinearScaling {
    pub fn new(k: f64, truncate: bool) -> Self {
        Self { k, truncate }
    }
}

impl ScalingOperator for LinearScaling {
    fn scale(&self, objectives: &[f64], stats: &Stats, direction: Direction) -> Vec<f64> {
        let mean = stats.mean;
        let slope = match direction {
            Direction::Maximize if stats.max > mean => (self.k * mean - mean) / (stats.max - mean),
            Direction::Minimize if mean > stats.min => (mean / self.k - mean) / (stats.min - mean),
            _ => 1.0,
        };

        objectives
            .iter()
            .map(|&obj| {
                let f = slope * (obj - mean) + mean;
                if self.truncate && f < 0.0 {
                    0.0
                } else {
                    f
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_scaling_minimize() {
        let objectives = [1.0, 2.0, 3.0];
        let stats = Stats::from_values(objectives);
        let fitness = LinearScaling::new(2.0, true).scale(&objectives, &stats, Direction::Minimize);

        assert!((fitness[0] - 1.0).abs() < 1e-12); // mean / k
        assert!((fitness[1] - 2.0).abs() < 1e-12); // mean unchanged
        assert!((fitness[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_scaling_truncates() {
        let objectives = [1.0, 1.0, 1.0, 10.0];
        let stats = Stats::from_values(objectives);
        let fitness = LinearScaling::new(4.0, true).scale(&objectives, &stats, Direction::Maximize);
        assert!(fitness.iter().all(|&f| f >= 0.0));
        assert!((fitness[3] - 4.0 * stats.mean).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_population_is_identity() {
        let objectives = [5.0; 4];
        let stats = Stats::from_values(objectives);
        let fitness = LinearScaling::new(2.0, true).scale(&objectives, &stats, Direction::Minimize);
        assert_eq!(fitness, vec![5.0; 4]);
    }
}
