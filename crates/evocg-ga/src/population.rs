//! A fixed-size population with its running statistics.

use evocg_core::Stats;

use crate::genome::{Direction, Genome, Individual};

/// Individuals sorted ascending by objective after every evaluation
#[derive(Debug, Clone)]
pub struct Population<G> {
    pub(crate) individuals: Vec<Individual<G>>,
    pub(crate) direction: Direction,
    pub(crate) objective: Stats,
    pub(crate) fitness: Option<Stats>,
    pub(crate) diversity: Option<f64>,
}

impl<G: Genome> Population<G> {
    pub fn new(genomes: Vec<G>, direction: Direction) -> Self {
        Self {
            individuals: genomes.into_iter().map(Individual::new).collect(),
            direction,
            objective: Stats::default(),
            fitness: None,
            diversity: None,
        }
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> &[Individual<G>] {
        &self.individuals
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Index of the best individual in sorted order.
    pub fn best_index(&self) -> usize {
        match self.direction {
            Direction::Minimize => 0,
            Direction::Maximize => self.individuals.len().saturating_sub(1),
        }
    }

    /// The best individual. Panics on an empty population.
    pub fn best(&self) -> &Individual<G> {
        &self.individuals[self.best_index()]
    }

    /// Indices of the `count` best individuals, best first.
    pub fn elite_indices(&self, count: usize) -> Vec<usize> {
        let n = self.individuals.len();
        let count = count.min(n);
        match self.direction {
            Direction::Minimize => (0..count).collect(),
            Direction::Maximize => (0..count).map(|i| n - 1 - i).collect(),
        }
    }

    pub fn objective_stats(&self) -> &Stats {
        &self.objective
    }

    pub fn fitness_stats(&self) -> Option<&Stats> {
        self.fitness.as_ref()
    }

    pub fn diversity(&self) -> Option<f64> {
        self.diversity
    }

    pub(crate) fn objectives(&self) -> Vec<f64> {
        self.individuals.iter().map(|i| i.objective).collect()
    }

    pub(crate) fn fitness_values(&self) -> Vec<f64> {
        self.individuals.iter().map(|i| i.fitness).collect()
    }

    pub(crate) fn sort(&mut self) {
        self.individuals
            .sort_by(|a, b| a.objective.total_cmp(&b.objective));
    }

    /// Mean pairwise genome difference.
    pub fn compute_diversity(&self) -> f64 {
        let n = self.individuals.len();
        if n < 2 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                sum += self.individuals[i]
                    .genome
                    .difference_to(&self.individuals[j].genome);
            }
        }
        2.0 * sum / (n * (n - 1)) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Bits(Vec<bool>);

    impl Genome for Bits {
        fn difference_to(&self, other: &Self) -> f64 {
            let diff = self.0.iter().zip(&other.0).filter(|(a, b)| a != b).count();
            diff as f64 / self.0.len() as f64
        }
    }

    #[test]
    fn test_diversity() {
        let pop = Population::new(
            vec![Bits(vec![true, true]), Bits(vec![false, false]), Bits(vec![true, true])],
            Direction::Minimize,
        );
        // Pairs: 1.0, 0.0, 1.0 → mean 2/3.
        assert!((pop.compute_diversity() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_elite_indices_follow_direction() {
        let pop = Population::new(vec![Bits(vec![]); 4], Direction::Maximize);
        assert_eq!(pop.elite_indices(2), vec![3, 2]);
        assert_eq!(pop.best_index(), 3);

        let pop = Population::new(vec![Bits(vec![]); 4], Direction::Minimize);
        assert_eq!(pop.elite_indices(9), vec![0, 1, 2, 3]);
    }
}
