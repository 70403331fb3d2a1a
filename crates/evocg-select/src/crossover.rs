//! Region exchange between two selections.

use std::collections::BTreeSet;
use std::sync::Arc;

use evocg_core::NodeId;
use evocg_ga::{crossover_sample_size, sample_depth, CrossoverOperator};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::genome::SelectionGenome;

/// Extend `region` until no selected covering of any genome straddles its
/// boundary.
pub(crate) fn close_region(region: &mut BTreeSet<NodeId>, genomes: &[&SelectionGenome]) {
    let mut pending: Vec<NodeId> = region.iter().copied().collect();
    while let Some(op) = pending.pop() {
        for genome in genomes {
            let Some(id) = genome.selected(op) else {
                continue;
            };
            for &o in &genome.context().covering(id).covered_operations {
                if region.insert(o) {
                    pending.push(o);
                }
            }
        }
    }
}

/// Swaps the coverings of a region rooted at an operation where both
/// parents produce the same value
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionCrossover;

impl SelectionCrossover {
    /// Operations whose coverings produce the same value in both genomes.
    fn shared_roots(a: &SelectionGenome, b: &SelectionGenome) -> Vec<NodeId> {
        let ctx = a.context();
        ctx.operations()
            .iter()
            .copied()
            .filter(|&op| match (a.selected(op), b.selected(op)) {
                (Some(x), Some(y)) => ctx.covering(x).result == ctx.covering(y).result,
                _ => false,
            })
            .collect()
    }
}

impl CrossoverOperator<SelectionGenome> for SelectionCrossover {
    fn cross(&self, a: &mut SelectionGenome, b: &mut SelectionGenome, _generation: u64, rng: &mut ChaCha8Rng) {
        let ctx = Arc::clone(a.context_arc());
        let roots = Self::shared_roots(a, b);
        let Some(&root) = roots.choose(rng) else {
            return;
        };

        let depth = sample_depth(crossover_sample_size(rng, ctx.num_operations()));
        let mut region = ctx.operations_below(root, depth);
        close_region(&mut region, &[&*a, &*b]);

        let mut changed = false;
        for op in region {
            let i = op.index();
            if a.selection[i] != b.selection[i] {
                std::mem::swap(&mut a.selection[i], &mut b.selection[i]);
                changed = true;
            }
        }
        if changed {
            a.invalidate();
            b.invalidate();
        }
    }
}
