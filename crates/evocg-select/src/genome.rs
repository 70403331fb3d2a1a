//! Selection genome: one chosen covering per program operation.

use std::collections::BTreeSet;
use std::sync::Arc;

use evocg_core::NodeId;
use evocg_ga::Genome;
use evocg_ir::CoveringId;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::context::SelectionContext;
use crate::solution::Solution;

/// Coverings chosen for the operations of a program graph.
///
/// Every operation a selected covering absorbs maps to that covering, and
/// every operand a selected covering reads is produced by a covering rooted
/// at that operand. The objective and solution of the last evaluation are
/// cached until the selection changes.
#[derive(Debug, Clone)]
pub struct SelectionGenome {
    context: Arc<SelectionContext>,
    /// Indexed by program node
    pub(crate) selection: Vec<Option<CoveringId>>,
    pub(crate) modified: bool,
    pub(crate) objective: f64,
    pub(crate) is_valid: bool,
    pub(crate) solution: Solution,
}

impl SelectionGenome {
    pub fn new(context: Arc<SelectionContext>) -> Self {
        let size = context.program.graph.len();
        Self {
            context,
            selection: vec![None; size],
            modified: true,
            objective: f64::INFINITY,
            is_valid: false,
            solution: Solution::default(),
        }
    }

    pub fn context(&self) -> &SelectionContext {
        &self.context
    }

    pub(crate) fn context_arc(&self) -> &Arc<SelectionContext> {
        &self.context
    }

    /// Covering chosen for `operation`, if it is selected.
    pub fn selected(&self, operation: NodeId) -> Option<CoveringId> {
        self.selection.get(operation.index()).copied().flatten()
    }

    pub fn selected_operations(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.context
            .operations
            .iter()
            .copied()
            .filter(|&op| self.selected(op).is_some())
    }

    /// Distinct coverings in use, in operation order.
    pub fn selected_coverings(&self) -> Vec<CoveringId> {
        let mut seen = BTreeSet::new();
        self.selected_operations()
            .filter_map(|op| self.selected(op))
            .filter(|&id| seen.insert(id))
            .collect()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Objective of the last evaluation.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    /// Drop the cached evaluation.
    pub fn invalidate(&mut self) {
        self.modified = true;
        self.is_valid = false;
        self.solution = Solution::default();
    }

    /// Pick a covering for every root value and, transitively, for every
    /// operand those coverings read.
    pub fn initialize(&mut self, rng: &mut ChaCha8Rng) {
        self.selection.iter_mut().for_each(|s| *s = None);
        let context = Arc::clone(&self.context);
        let mut pending: Vec<NodeId> = context.roots.iter().rev().copied().collect();

        while let Some(value) = pending.pop() {
            let Some(op) = context.program.graph.producing_operation(value) else {
                continue;
            };
            if self.selected(op).is_some() {
                continue;
            }
            let options: Vec<CoveringId> = context
                .coverings
                .for_value(value)
                .iter()
                .copied()
                .filter(|&id| {
                    context
                        .covering(id)
                        .covered_operations
                        .iter()
                        .all(|&o| self.selected(o).is_none())
                })
                .collect();
            let Some(&id) = options.choose(rng) else {
                continue;
            };

            let covering = context.covering(id);
            for &o in &covering.covered_operations {
                self.selection[o.index()] = Some(id);
            }
            pending.extend(covering.operand_values.iter().rev());
        }
        self.invalidate();
    }

    /// Check the covering invariants over the whole selection.
    pub fn is_consistent(&self) -> bool {
        let graph = &self.context.program.graph;
        self.selected_operations().all(|op| {
            let Some(id) = self.selected(op) else {
                return false;
            };
            let covering = self.context.covering(id);
            let grouped = covering
                .covered_operations
                .iter()
                .all(|&o| self.selected(o) == Some(id));
            let fed = covering.operand_values.iter().all(|&v| match graph.producing_operation(v) {
                None => true,
                Some(p) => self
                    .selected(p)
                    .map(|pid| self.context.covering(pid).result == v)
                    .unwrap_or(false),
            });
            covering.covers(op) && grouped && fed
        })
    }
}

impl Genome for SelectionGenome {
    /// Fraction of operations whose covering differs.
    fn difference_to(&self, other: &Self) -> f64 {
        let operations = &self.context.operations;
        if operations.is_empty() {
            return 0.0;
        }
        let differing = operations
            .iter()
            .filter(|&&op| self.selected(op) != other.selected(op))
            .count();
        differing as f64 / operations.len() as f64
    }

    fn is_valid(&self) -> bool {
        self.is_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evocg_samples::{dot_product, sample_dsp, sum_of_products, two_unit_machine, weighted_vector_sum};
    use rand::SeedableRng;

    fn context(machine: evocg_ir::MachineDescription, program: evocg_ir::ProgramGraph) -> Arc<SelectionContext> {
        Arc::new(SelectionContext::new(machine, program).unwrap())
    }

    #[test]
    fn test_initialize_selects_every_operation() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for ctx in [
            context(two_unit_machine(), sum_of_products()),
            context(sample_dsp(), weighted_vector_sum(2)),
            context(sample_dsp(), dot_product(2)),
        ] {
            for _ in 0..20 {
                let mut genome = SelectionGenome::new(Arc::clone(&ctx));
                genome.initialize(&mut rng);
                assert_eq!(genome.selected_operations().count(), ctx.num_operations());
                assert!(genome.is_consistent());
                assert!(genome.is_modified());
            }
        }
    }

    #[test]
    fn test_increment_absorbs_constant() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ctx = context(sample_dsp(), weighted_vector_sum(1));
        let mut genome = SelectionGenome::new(Arc::clone(&ctx));
        genome.initialize(&mut rng);

        let graph = &ctx.program().graph;
        for op in ctx.operations().iter().copied() {
            if graph.operation(op) == evocg_ir::OperationKind::Const {
                let covering = ctx.covering(genome.selected(op).unwrap());
                assert_eq!(covering.covered_operations.len(), 2);
                assert_ne!(graph.result_value(op), Some(covering.result));
            }
        }
    }

    #[test]
    fn test_difference_to() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ctx = context(sample_dsp(), dot_product(1));
        let mut a = SelectionGenome::new(Arc::clone(&ctx));
        a.initialize(&mut rng);
        let mut b = a.clone();
        assert_eq!(a.difference_to(&b), 0.0);

        let op = ctx.operations()[0];
        b.selection[op.index()] = None;
        let expected = 1.0 / ctx.num_operations() as f64;
        assert!((a.difference_to(&b) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalidate_drops_cache() {
        let ctx = context(two_unit_machine(), sum_of_products());
        let mut genome = SelectionGenome::new(ctx);
        genome.modified = false;
        genome.is_valid = true;
        genome.invalidate();
        assert!(genome.is_modified());
        assert!(!genome.is_valid());
        assert_eq!(genome.solution(), &Solution::default());
    }
}
