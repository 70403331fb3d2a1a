//! Driver of the instruction selection search.

use std::sync::Arc;

use evocg_core::{Result, SchedulerConfig, SelectorConfig};
use evocg_ga::{
    ConvergenceMonitor, Direction, GaSettings, GenerationObserver, Genome, LinearScaling,
    RouletteWheelSelection, SearchKind, SimpleGa,
};
use evocg_sched::GaScheduler;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::context::SelectionContext;
use crate::crossover::SelectionCrossover;
use crate::evaluator::SelectionEvaluator;
use crate::genome::SelectionGenome;
use crate::mutation::SelectionMutation;
use crate::solution::CodeGenOutcome;

/// Searches for the selection whose best schedule is shortest
#[derive(Debug, Clone, Default)]
pub struct GaInstructionSelector {
    config: SelectorConfig,
    scheduler: GaScheduler,
}

impl GaInstructionSelector {
    pub fn new(config: SelectorConfig, scheduler: SchedulerConfig) -> Self {
        Self {
            config,
            scheduler: GaScheduler::new(scheduler),
        }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Run the selection search over a prepared context.
    ///
    /// Every evaluated selection triggers a complete scheduling search whose
    /// generations are reported to `observer` alongside the selection ones.
    /// The search stops at the generation limit, or once a valid best
    /// selection has not improved over the monitored window.
    #[instrument(
        skip_all,
        fields(
            operations = context.num_operations(),
            population = self.config.population_size
        )
    )]
    pub fn optimize(
        &self,
        context: Arc<SelectionContext>,
        observer: &mut dyn GenerationObserver,
        rng: &mut ChaCha8Rng,
    ) -> Result<CodeGenOutcome> {
        info!(
            event = "selection_started",
            coverings = context.coverings().len(),
            roots = context.roots().len(),
        );

        let genomes = (0..self.config.population_size)
            .map(|_| {
                let mut genome = SelectionGenome::new(Arc::clone(&context));
                genome.initialize(rng);
                genome
            })
            .collect();

        let settings = GaSettings {
            elitists: 1,
            p_crossover: self.config.p_crossover,
            p_mutation: self.config.p_mutation,
            direction: Direction::Minimize,
            statistics: self.config.statistics,
        };
        let mut ga = SimpleGa::new(
            settings,
            genomes,
            SelectionCrossover,
            SelectionMutation,
            SelectionEvaluator::new(self.scheduler.clone(), observer),
            Box::new(LinearScaling::new(self.config.scaling_factor, true)),
            Box::new(RouletteWheelSelection::default()),
            rng,
        )?;

        let mut monitor = ConvergenceMonitor::new(self.config.monitored_generations);
        loop {
            ga.compute_next_generation(rng)?;
            let generation = ga.generation();
            monitor.record(generation, ga.best().objective);
            let report = ga.report(SearchKind::Selection);
            ga.evaluator_mut().observer().generation_computed(&report);

            if ConvergenceMonitor::exceeded(generation, self.config.max_generations) {
                break;
            }
            if report.best_valid && monitor.is_converged(generation) {
                info!(event = "selection_converged", generation);
                break;
            }
        }

        let best = ga.best();
        let outcome = CodeGenOutcome {
            solution: best.genome.solution().clone(),
            is_valid: best.genome.is_valid(),
            objective: best.objective,
            generations: ga.generation(),
            scheduler_runs: ga.evaluator().scheduler_runs(),
        };
        info!(
            event = "selection_finished",
            generations = outcome.generations,
            valid = outcome.is_valid,
            objective = outcome.objective,
            steps = outcome.solution.schedule.len(),
            scheduler_runs = outcome.scheduler_runs,
        );
        Ok(outcome)
    }
}
