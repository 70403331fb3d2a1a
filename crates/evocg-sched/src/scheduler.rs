//! Driver of the scheduling search.

use std::sync::Arc;

use evocg_core::{Result, SchedulerConfig};
use evocg_ga::{
    ConvergenceMonitor, Direction, GaSettings, GenerationObserver, LinearScaling, SearchKind,
    SimpleGa, TournamentSelection,
};
use evocg_ir::{InstructionGraph, MachineDescription};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::context::ScheduleContext;
use crate::crossover::ScheduleCrossover;
use crate::evaluator::ScheduleEvaluator;
use crate::genome::SchedulingGenome;
use crate::mutation::ScheduleMutation;
use crate::outcome::ScheduleOutcome;

/// Finds a short valid schedule and register assignment for an instruction graph
#[derive(Debug, Clone, Default)]
pub struct GaScheduler {
    config: SchedulerConfig,
}

impl GaScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run a complete search from a fresh population.
    ///
    /// Stops once the generation limit is passed or the best objective has
    /// not changed over the monitored window.
    #[instrument(
        skip_all,
        fields(
            instructions = graph.num_instructions(),
            population = self.config.population_size
        )
    )]
    pub fn optimize(
        &self,
        machine: &MachineDescription,
        graph: &InstructionGraph,
        observer: &mut dyn GenerationObserver,
        rng: &mut ChaCha8Rng,
    ) -> Result<ScheduleOutcome> {
        let context = Arc::new(ScheduleContext::new(machine, graph)?);
        debug!(
            event = "scheduling_started",
            register_values = context.num_register_values(),
            dependencies = context.dependencies().num_pairs(),
        );

        let genomes = (0..self.config.population_size)
            .map(|_| {
                let mut genome = SchedulingGenome::new(Arc::clone(&context), 0);
                genome.initialize(self.config.random_initialization, rng);
                genome
            })
            .collect();

        let settings = GaSettings {
            elitists: 1,
            p_crossover: self.config.p_crossover,
            p_mutation: 1.0,
            direction: Direction::Minimize,
            statistics: self.config.statistics,
        };
        let mut ga = SimpleGa::new(
            settings,
            genomes,
            ScheduleCrossover::from_config(&self.config),
            ScheduleMutation::from_config(&self.config),
            ScheduleEvaluator,
            Box::new(LinearScaling::new(self.config.scaling_factor, true)),
            Box::new(TournamentSelection::default()),
            rng,
        )?;

        let mut monitor = ConvergenceMonitor::new(self.config.monitored_generations);
        loop {
            ga.compute_next_generation(rng)?;
            let generation = ga.generation();
            monitor.record(generation, ga.best().objective);
            observer.generation_computed(&ga.report(SearchKind::Scheduling));

            if ConvergenceMonitor::exceeded(generation, self.config.max_generations) {
                break;
            }
            if monitor.is_converged(generation) {
                debug!(event = "scheduling_converged", generation);
                break;
            }
        }

        let best = ga.best();
        let outcome = ScheduleOutcome::from_genome(&best.genome, best.objective, ga.generation());
        debug!(
            event = "scheduling_finished",
            generations = outcome.generations,
            valid = outcome.is_valid,
            length = outcome.schedule_length,
            objective = outcome.objective,
        );
        Ok(outcome)
    }
}
