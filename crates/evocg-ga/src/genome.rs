//! Genome and operator contracts.

use evocg_core::Result;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Optimization direction of the objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

impl Direction {
    /// True if objective `a` is strictly better than `b`.
    pub fn better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Minimize => a < b,
            Direction::Maximize => a > b,
        }
    }
}

/// An encoded candidate solution
pub trait Genome: Clone {
    /// Normalized distance to `other` in `[0, 1]`.
    fn difference_to(&self, other: &Self) -> f64;

    /// Whether the genome satisfies all hard constraints.
    fn is_valid(&self) -> bool {
        true
    }
}

/// Computes the objective of a genome
pub trait Evaluator<G> {
    fn evaluate(&mut self, genome: &mut G, generation: u64, rng: &mut ChaCha8Rng) -> Result<f64>;
}

/// Recombines two offspring in place
pub trait CrossoverOperator<G> {
    fn cross(&self, a: &mut G, b: &mut G, generation: u64, rng: &mut ChaCha8Rng);
}

/// Mutates an offspring in place. The operator decides how to use `p_mutation`.
pub trait MutationOperator<G> {
    fn mutate(&self, genome: &mut G, p_mutation: f64, generation: u64, rng: &mut ChaCha8Rng);
}

/// A genome with its raw objective and scaled fitness
#[derive(Debug, Clone)]
pub struct Individual<G> {
    pub genome: G,
    pub objective: f64,
    pub fitness: f64,
}

impl<G> Individual<G> {
    pub fn new(genome: G) -> Self {
        Self {
            genome,
            objective: 0.0,
            fitness: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_better() {
        assert!(Direction::Minimize.better(1.0, 2.0));
        assert!(!Direction::Minimize.better(2.0, 2.0));
        assert!(Direction::Maximize.better(3.0, 2.0));
    }
}
