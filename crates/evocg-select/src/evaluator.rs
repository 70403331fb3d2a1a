//! Objective of a selection: the best result of a full scheduling search.

use std::sync::Arc;

use evocg_core::Result;
use evocg_ga::{Evaluator, GenerationObserver};
use evocg_sched::GaScheduler;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::genome::SelectionGenome;
use crate::lowering::build_instruction_graph;
use crate::solution::Solution;

/// Lowers a selection and schedules it from scratch.
///
/// Genomes whose selection has not changed since their last evaluation
/// keep their cached objective and skip the scheduling run.
pub struct SelectionEvaluator<'a> {
    scheduler: GaScheduler,
    scheduler_runs: usize,
    observer: &'a mut dyn GenerationObserver,
}

impl<'a> SelectionEvaluator<'a> {
    pub fn new(scheduler: GaScheduler, observer: &'a mut dyn GenerationObserver) -> Self {
        Self {
            scheduler,
            scheduler_runs: 0,
            observer,
        }
    }

    /// Number of scheduling searches run so far.
    pub fn scheduler_runs(&self) -> usize {
        self.scheduler_runs
    }

    pub fn observer(&mut self) -> &mut dyn GenerationObserver {
        &mut *self.observer
    }
}

impl Evaluator<SelectionGenome> for SelectionEvaluator<'_> {
    fn evaluate(&mut self, genome: &mut SelectionGenome, generation: u64, rng: &mut ChaCha8Rng) -> Result<f64> {
        if !genome.modified {
            return Ok(genome.objective);
        }

        let context = Arc::clone(genome.context_arc());
        let graph = build_instruction_graph(&context, &genome.selection, rng)?;
        let outcome = self
            .scheduler
            .optimize(context.machine(), &graph, &mut *self.observer, rng)?;
        self.scheduler_runs += 1;
        trace!(
            event = "selection_evaluated",
            generation,
            objective = outcome.objective,
            valid = outcome.is_valid,
            length = outcome.schedule_length,
        );

        genome.solution = Solution {
            instruction_graph: graph,
            register_assignment: outcome.register_assignment,
            schedule: outcome.schedule,
        };
        genome.objective = outcome.objective;
        genome.is_valid = outcome.is_valid;
        genome.modified = false;
        Ok(outcome.objective)
    }
}
