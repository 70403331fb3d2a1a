//! Constraint-penalized objective of a scheduling genome.

use std::collections::BTreeMap;

use evocg_core::Result;
use evocg_ga::Evaluator;
use rand_chacha::ChaCha8Rng;

use crate::genome::SchedulingGenome;

/// Schedule length, inflated by violated constraints.
///
/// The penalty grows with the age of a genome, so fresh offspring may be
/// infeasible for a generation before they are pushed out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleEvaluator;

impl ScheduleEvaluator {
    /// Pairs of simultaneously live values sharing a register, summed over
    /// all steps. Lifetimes must be up to date.
    pub fn register_violations(genome: &SchedulingGenome) -> usize {
        let mut violations = 0;
        for step in 0..genome.rows() as i64 {
            let mut live: BTreeMap<_, usize> = BTreeMap::new();
            for info in genome.values.iter().filter(|info| info.is_live_at(step)) {
                if let Some(register) = info.register {
                    *live.entry(register).or_default() += 1;
                }
            }
            violations += live.values().map(|&c| c * (c - 1) / 2).sum::<usize>();
        }
        violations
    }

    /// Dependencies not scheduled strictly before their dependent.
    pub fn scheduling_violations(genome: &SchedulingGenome) -> usize {
        let deps = genome.context().dependencies();
        (0..genome.rows())
            .map(|i| {
                deps.of(i)
                    .iter()
                    .filter(|&&d| genome.step_of(i) <= genome.step_of(d))
                    .count()
            })
            .sum()
    }

    /// Refresh lifetimes, violation counts, validity and length, and return
    /// the objective as seen in `generation`.
    pub fn score(genome: &mut SchedulingGenome, generation: u64) -> f64 {
        genome.update_lifetimes();
        genome.register_violations = Self::register_violations(genome);
        genome.scheduling_violations = Self::scheduling_violations(genome);
        genome.is_valid = genome.register_violations == 0 && genome.scheduling_violations == 0;
        genome.schedule_length = (0..genome.rows())
            .map(|i| genome.step_of(i) + 1)
            .max()
            .unwrap_or(0);

        let violations = (genome.register_violations + genome.scheduling_violations) as f64;
        let age = generation as i64 - genome.birth as i64;
        let c = 2.0 * violations / (2 - age).max(1) as f64;
        genome.schedule_length as f64 * (1.0 + c * c)
    }
}

impl Evaluator<SchedulingGenome> for ScheduleEvaluator {
    fn evaluate(&mut self, genome: &mut SchedulingGenome, generation: u64, _rng: &mut ChaCha8Rng) -> Result<f64> {
        Ok(Self::score(genome, generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScheduleContext;
    use crate::fixtures;
    use evocg_core::RegisterId;
    use std::sync::Arc;

    fn placed(steps: [usize; 3]) -> SchedulingGenome {
        let (machine, graph) = fixtures::sum_of_products();
        let ctx = Arc::new(ScheduleContext::new(&machine, &graph).unwrap());
        let mut g = SchedulingGenome::new(ctx, 0);
        for (i, &step) in steps.iter().enumerate() {
            g.place(i, step);
        }
        // a b c d e f g
        for (v, r) in [0, 1, 2, 3, 0, 1, 2].into_iter().enumerate() {
            g.assign_register(v, Some(RegisterId(r)));
        }
        g
    }

    #[test]
    fn test_valid_schedule() {
        let mut g = placed([0, 0, 1]);
        let objective = ScheduleEvaluator::score(&mut g, 0);
        assert!(g.is_valid());
        assert_eq!(g.schedule_length(), 2);
        assert_eq!(objective, 2.0);
    }

    #[test]
    fn test_scheduling_violation_penalized() {
        let mut g = placed([0, 1, 1]);
        let objective = ScheduleEvaluator::score(&mut g, 0);
        assert!(!g.is_valid());
        assert_eq!(g.scheduling_violations(), 1);
        assert_eq!(g.register_violations(), 0);
        // Age 0: c = 2 * 1 / 2 = 1.
        assert_eq!(objective, 2.0 * 2.0);
        // Age 2 and older: c = 2.
        assert_eq!(ScheduleEvaluator::score(&mut g, 5), 2.0 * 5.0);
    }

    #[test]
    fn test_register_violation_counted_per_step() {
        // Sums are produced at step 0 and read at step 2, so both live over
        // steps 0 and 1. Giving them one register conflicts twice.
        let mut g = placed([0, 0, 2]);
        g.assign_register(5, Some(RegisterId(0)));
        ScheduleEvaluator::score(&mut g, 0);
        assert_eq!(g.register_violations(), 2);
        assert!(!g.is_valid());
    }

    #[test]
    fn test_validity_is_recomputed() {
        let mut g = placed([0, 0, 1]);
        ScheduleEvaluator::score(&mut g, 0);
        assert!(g.is_valid());
        g.swap_slots(1, 0, 0);
        ScheduleEvaluator::score(&mut g, 1);
        assert!(!g.is_valid());
    }

    #[test]
    fn test_inputs_do_not_conflict_when_read_first() {
        // Inputs are read at step 0 and never occupy a register inside the block.
        let mut g = placed([0, 0, 1]);
        for v in 0..4 {
            g.assign_register(v, Some(RegisterId(0)));
        }
        ScheduleEvaluator::score(&mut g, 0);
        assert_eq!(g.register_violations(), 0);
    }
}
