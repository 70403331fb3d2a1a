//! Region re-covering of a single selection.

use std::sync::Arc;

use evocg_core::NodeId;
use evocg_ga::{mutation_sample_size, sample_depth, MutationOperator};
use evocg_ir::CoveringId;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::crossover::close_region;
use crate::genome::SelectionGenome;

/// Re-covers a small region below a random operation
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionMutation;

impl SelectionMutation {
    /// Replace the coverings of a region with random ones covering exactly
    /// the same operations. Returns false, leaving the genome untouched, if
    /// the random choices paint themselves into a corner.
    pub fn recover_region(genome: &mut SelectionGenome, rng: &mut ChaCha8Rng) -> bool {
        let ctx = Arc::clone(genome.context_arc());
        let selected: Vec<NodeId> = genome.selected_operations().collect();
        let Some(&start) = selected.choose(rng) else {
            return false;
        };

        let depth = sample_depth(mutation_sample_size(rng, selected.len()));
        let mut pending = ctx.operations_below(start, depth);
        close_region(&mut pending, &[&*genome]);

        let snapshot = genome.selection.clone();
        for op in &pending {
            genome.selection[op.index()] = None;
        }

        // Consumers first: an operation still pending when reached is not
        // absorbed by anything above it, so its value must be produced.
        for &op in ctx.operations.iter().rev() {
            if !pending.contains(&op) {
                continue;
            }
            let options: Vec<CoveringId> = ctx
                .program
                .graph
                .result_value(op)
                .map(|value| {
                    ctx.coverings
                        .for_value(value)
                        .iter()
                        .copied()
                        .filter(|&id| {
                            ctx.covering(id)
                                .covered_operations
                                .iter()
                                .all(|o| pending.contains(o))
                        })
                        .collect()
                })
                .unwrap_or_default();

            let Some(&id) = options.choose(rng) else {
                genome.selection = snapshot;
                return false;
            };
            for &o in &ctx.covering(id).covered_operations {
                genome.selection[o.index()] = Some(id);
                pending.remove(&o);
            }
        }

        if genome.selection != snapshot {
            genome.invalidate();
        }
        true
    }
}

impl MutationOperator<SelectionGenome> for SelectionMutation {
    fn mutate(&self, genome: &mut SelectionGenome, p_mutation: f64, _generation: u64, rng: &mut ChaCha8Rng) {
        if rng.gen::<f64>() < p_mutation {
            Self::recover_region(genome, rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SelectionContext;
    use evocg_ga::Genome;
    use evocg_samples::{dot_product, sample_dsp, sum_of_products, two_unit_machine, weighted_vector_sum};
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn genome(ctx: &Arc<SelectionContext>, rng: &mut ChaCha8Rng) -> SelectionGenome {
        let mut g = SelectionGenome::new(Arc::clone(ctx));
        g.initialize(rng);
        g
    }

    #[test]
    fn test_mutation_keeps_selection_consistent() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ctx = Arc::new(SelectionContext::new(sample_dsp(), dot_product(2)).unwrap());
        let mut g = genome(&ctx, &mut rng);

        let mut changed = 0;
        for _ in 0..300 {
            let before = g.clone();
            SelectionMutation.mutate(&mut g, 1.0, 0, &mut rng);
            assert!(g.is_consistent());
            assert_eq!(g.selected_operations().count(), ctx.num_operations());
            if g.difference_to(&before) > 0.0 {
                changed += 1;
                assert!(g.is_modified());
            }
        }
        // MACF and ADDF on two units leave plenty of room to move.
        assert!(changed > 0);
    }

    #[test]
    fn test_zero_probability_is_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ctx = Arc::new(SelectionContext::new(two_unit_machine(), sum_of_products()).unwrap());
        let mut g = genome(&ctx, &mut rng);
        g.modified = false;
        let before = g.clone();

        for _ in 0..50 {
            SelectionMutation.mutate(&mut g, 0.0, 0, &mut rng);
        }
        assert_eq!(g.difference_to(&before), 0.0);
        assert!(!g.is_modified());
    }

    #[test]
    fn test_mutation_reaches_other_units() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ctx = Arc::new(SelectionContext::new(two_unit_machine(), sum_of_products()).unwrap());
        let mut g = genome(&ctx, &mut rng);

        let units = |g: &SelectionGenome| -> Vec<usize> {
            g.selected_coverings()
                .into_iter()
                .map(|id| ctx.machine().instruction(ctx.covering(id).instruction).execution_unit)
                .collect()
        };
        let first = units(&g);
        let mut seen_other = false;
        for _ in 0..100 {
            SelectionMutation.mutate(&mut g, 1.0, 0, &mut rng);
            seen_other |= units(&g) != first;
        }
        assert!(seen_other);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn prop_mutation_preserves_consistency(seed in any::<u64>(), k in 1usize..4) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let ctx = Arc::new(SelectionContext::new(sample_dsp(), weighted_vector_sum(k)).unwrap());
            let mut g = genome(&ctx, &mut rng);
            for _ in 0..10 {
                SelectionMutation::recover_region(&mut g, &mut rng);
                prop_assert!(g.is_consistent());
            }
        }
    }
}
