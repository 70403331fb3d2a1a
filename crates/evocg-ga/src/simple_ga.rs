//! Generational loop with elitism.

use evocg_core::{Result, StatisticsConfig, Stats};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::genome::{CrossoverOperator, Direction, Evaluator, Genome, MutationOperator};
use crate::observer::{GenerationReport, SearchKind};
use crate::population::Population;
use crate::scaling::ScalingOperator;
use crate::selection::SelectionOperator;

/// Parameters of the generational loop
#[derive(Debug, Clone, PartialEq)]
pub struct GaSettings {
    pub elitists: usize,
    pub p_crossover: f64,
    pub p_mutation: f64,
    pub direction: Direction,
    pub statistics: StatisticsConfig,
}

impl Default for GaSettings {
    fn default() -> Self {
        Self {
            elitists: 1,
            p_crossover: 0.6,
            p_mutation: 0.01,
            direction: Direction::Minimize,
            statistics: StatisticsConfig::default(),
        }
    }
}

/// Steady-state genetic algorithm.
///
/// Each generation keeps the elitists, fills the rest of the mating pool by
/// selection over scaled fitness, crosses and mutates the non-elite
/// offspring, then evaluates and sorts the new population.
pub struct SimpleGa<G, C, M, E> {
    settings: GaSettings,
    population: Population<G>,
    crossover: C,
    mutation: M,
    evaluator: E,
    scaling: Box<dyn ScalingOperator>,
    selection: Box<dyn SelectionOperator>,
    generation: u64,
}

impl<G, C, M, E> SimpleGa<G, C, M, E>
where
    G: Genome,
    C: CrossoverOperator<G>,
    M: MutationOperator<G>,
    E: Evaluator<G>,
{
    /// Build the GA around an initial set of genomes and evaluate them as
    /// generation zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: GaSettings,
        genomes: Vec<G>,
        crossover: C,
        mutation: M,
        evaluator: E,
        scaling: Box<dyn ScalingOperator>,
        selection: Box<dyn SelectionOperator>,
        rng: &mut ChaCha8Rng,
    ) -> Result<Self> {
        let mut ga = Self {
            population: Population::new(genomes, settings.direction),
            settings,
            crossover,
            mutation,
            evaluator,
            scaling,
            selection,
            generation: 0,
        };
        ga.evaluate_generation(rng)?;
        Ok(ga)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn population(&self) -> &Population<G> {
        &self.population
    }

    pub fn best(&self) -> &crate::genome::Individual<G> {
        self.population.best()
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }

    /// Advance by one generation.
    pub fn compute_next_generation(&mut self, rng: &mut ChaCha8Rng) -> Result<()> {
        let n = self.population.len();
        let elitists = self.settings.elitists.min(n);

        let mut pool = Vec::with_capacity(n);
        for i in self.population.elite_indices(elitists) {
            pool.push(self.population.individuals[i].clone());
        }

        self.selection
            .update(&self.population.fitness_values(), self.settings.direction);
        while pool.len() < n {
            let pick = self.selection.select(rng);
            pool.push(self.population.individuals[pick].clone());
        }

        if elitists < n {
            for i in elitists..n {
                if rng.gen::<f64>() < self.settings.p_crossover {
                    let j = rng.gen_range(elitists..n);
                    if i != j {
                        let (a, b) = pair_mut(&mut pool, i, j);
                        self.crossover
                            .cross(&mut a.genome, &mut b.genome, self.generation, rng);
                    }
                }
            }

            for individual in pool.iter_mut().skip(elitists) {
                self.mutation.mutate(
                    &mut individual.genome,
                    self.settings.p_mutation,
                    self.generation,
                    rng,
                );
            }
        }

        self.population.individuals = pool;
        self.generation += 1;
        self.evaluate_generation(rng)
    }

    fn evaluate_generation(&mut self, rng: &mut ChaCha8Rng) -> Result<()> {
        for individual in &mut self.population.individuals {
            individual.objective =
                self.evaluator
                    .evaluate(&mut individual.genome, self.generation, rng)?;
        }

        let objectives = self.population.objectives();
        let stats = Stats::from_values(objectives.iter().copied());
        let fitness = self
            .scaling
            .scale(&objectives, &stats, self.settings.direction);
        for (individual, f) in self.population.individuals.iter_mut().zip(fitness) {
            individual.fitness = f;
        }
        self.population.objective = stats;
        self.population.sort();

        let statistics = self.settings.statistics;
        self.population.fitness = statistics
            .fitness
            .then(|| Stats::from_values(self.population.fitness_values()));
        self.population.diversity = statistics
            .diversity
            .then(|| self.population.compute_diversity());

        trace!(
            generation = self.generation,
            best = self.population.best().objective,
            mean = stats.mean,
            "generation evaluated"
        );
        Ok(())
    }

    /// Snapshot of the current generation for observers.
    pub fn report(&self, search: SearchKind) -> GenerationReport {
        let best = self.population.best();
        GenerationReport {
            search,
            generation: self.generation,
            best_objective: best.objective,
            best_valid: best.genome.is_valid(),
            objective: *self.population.objective_stats(),
            fitness: self.population.fitness_stats().copied(),
            diversity: self.population.diversity(),
        }
    }
}

fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = items.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}
