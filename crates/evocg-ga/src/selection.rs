//! Parent selection strategies over scaled fitness.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::genome::Direction;

/// Picks parents by index into the current population
pub trait SelectionOperator {
    /// Refresh internal tables from the population's fitness values.
    fn update(&mut self, fitness: &[f64], direction: Direction);

    fn select(&self, rng: &mut ChaCha8Rng) -> usize;
}

/// Every individual equally likely
#[derive(Debug, Clone, Default)]
pub struct UniformSelection {
    size: usize,
}

impl SelectionOperator for UniformSelection {
    fn update(&mut self, fitness: &[f64], _direction: Direction) {
        self.size = fitness.len();
    }

    fn select(&self, rng: &mut ChaCha8Rng) -> usize {
        rng.gen_range(0..self.size.max(1))
    }
}

/// Better of two uniform picks
#[derive(Debug, Clone, Default)]
pub struct RandomTournamentSelection {
    fitness: Vec<f64>,
    direction: Direction,
}

impl SelectionOperator for RandomTournamentSelection {
    fn update(&mut self, fitness: &[f64], direction: Direction) {
        self.fitness = fitness.to_vec();
        self.direction = direction;
    }

    fn select(&self, rng: &mut ChaCha8Rng) -> usize {
        let n = self.fitness.len().max(1);
        let i = rng.gen_range(0..n);
        let j = rng.gen_range(0..n);
        pick_better(&self.fitness, self.direction, i, j)
    }
}

/// Fitness-proportional selection.
///
/// When minimizing, selection weight is the inverse fitness. Individuals
/// with zero or non-finite weight are never picked; if no individual has a
/// usable weight the pick is uniform.
#[derive(Debug, Clone, Default)]
pub struct RouletteWheelSelection {
    partial_sums: Vec<f64>,
    fitness: Vec<f64>,
    direction: Direction,
}

impl SelectionOperator for RouletteWheelSelection {
    fn update(&mut self, fitness: &[f64], direction: Direction) {
        self.fitness = fitness.to_vec();
        self.direction = direction;

        let weights: Vec<f64> = fitness
            .iter()
            .map(|&f| {
                let w = match direction {
                    Direction::Maximize => f,
                    Direction::Minimize if f > 0.0 => 1.0 / f,
                    Direction::Minimize => 0.0,
                };
                if w.is_finite() && w > 0.0 {
                    w
                } else {
                    0.0
                }
            })
            .collect();
        let total: f64 = weights.iter().sum();

        self.partial_sums.clear();
        if total > 0.0 && total.is_finite() {
            let mut acc = 0.0;
            for w in weights {
                acc += w / total;
                self.partial_sums.push(acc);
            }
        }
    }

    fn select(&self, rng: &mut ChaCha8Rng) -> usize {
        let n = self.fitness.len();
        if self.partial_sums.is_empty() {
            return rng.gen_range(0..n.max(1));
        }

        let cutoff = rng.gen::<f64>();
        let idx = self.partial_sums.partition_point(|&s| s < cutoff);
        idx.min(n - 1)
    }
}

/// Better of two roulette picks
#[derive(Debug, Clone, Default)]
pub struct TournamentSelection {
    roulette: RouletteWheelSelection,
}

impl SelectionOperator for TournamentSelection {
    fn update(&mut self, fitness: &[f64], direction: Direction) {
        self.roulette.update(fitness, direction);
    }

    fn select(&self, rng: &mut ChaCha8Rng) -> usize {
        let i = self.roulette.select(rng);
        let j = self.roulette.select(rng);
        pick_better(&self.roulette.fitness, self.roulette.direction, i, j)
    }
}

fn pick_better(fitness: &[f64], direction: Direction, i: usize, j: usize) -> usize {
    match (fitness.get(i), fitness.get(j)) {
        (Some(&fi), Some(&fj)) if direction.better(fi, fj) => i,
        _ => j,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn histogram(op: &dyn SelectionOperator, n: usize, draws: usize) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut counts = vec![0; n];
        for _ in 0..draws {
            counts[op.select(&mut rng)] += 1;
        }
        counts
    }

    #[test]
    fn test_roulette_minimize_prefers_small_fitness() {
        let mut op = RouletteWheelSelection::default();
        op.update(&[1.0, 4.0], Direction::Minimize);
        let counts = histogram(&op, 2, 10_000);
        // Weights 1 and 1/4 → 80% / 20%.
        assert!(counts[0] > 7_500 && counts[0] < 8_500, "{counts:?}");
    }

    #[test]
    fn test_roulette_maximize_prefers_large_fitness() {
        let mut op = RouletteWheelSelection::default();
        op.update(&[1.0, 3.0], Direction::Maximize);
        let counts = histogram(&op, 2, 10_000);
        assert!(counts[1] > 7_000 && counts[1] < 8_000, "{counts:?}");
    }

    #[test]
    fn test_roulette_skips_zero_fitness_when_minimizing() {
        let mut op = RouletteWheelSelection::default();
        op.update(&[0.0, 2.0, 2.0], Direction::Minimize);
        let counts = histogram(&op, 3, 2_000);
        assert_eq!(counts[0], 0);
    }

    #[test]
    fn test_roulette_degenerate_is_uniform() {
        let mut op = RouletteWheelSelection::default();
        op.update(&[0.0, 0.0, 0.0], Direction::Minimize);
        let counts = histogram(&op, 3, 3_000);
        assert!(counts.iter().all(|&c| c > 800));
    }

    #[test]
    fn test_tournament_biased_towards_better() {
        let mut roulette = RouletteWheelSelection::default();
        let mut tournament = TournamentSelection::default();
        let fitness = [1.0, 2.0, 3.0, 4.0];
        roulette.update(&fitness, Direction::Minimize);
        tournament.update(&fitness, Direction::Minimize);

        let r = histogram(&roulette, 4, 10_000);
        let t = histogram(&tournament, 4, 10_000);
        assert!(t[0] > r[0]);
    }

    #[test]
    fn test_random_tournament() {
        let mut op = RandomTournamentSelection::default();
        op.update(&[5.0, 1.0], Direction::Minimize);
        let counts = histogram(&op, 2, 4_000);
        // Index 1 wins unless both picks hit index 0.
        assert!(counts[1] > 2_700);
    }

    #[test]
    fn test_uniform_covers_population() {
        let mut op = UniformSelection::default();
        op.update(&[0.0; 5], Direction::Minimize);
        let counts = histogram(&op, 5, 5_000);
        assert!(counts.iter().all(|&c| c > 800));
    }
}
