//! Mutation of a single scheduling genome.

use std::sync::Arc;

use evocg_core::SchedulerConfig;
use evocg_ga::{mutation_sample_size, MutationOperator};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::genome::SchedulingGenome;

/// Applies each of four independent mutations with its own probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleMutation {
    pub p_schedule: f64,
    pub p_register: f64,
    pub p_cross_swap: f64,
    pub p_compaction: f64,
}

impl ScheduleMutation {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            p_schedule: config.p_schedule_mutation,
            p_register: config.p_register_mutation,
            p_cross_swap: config.p_schedule_cross_swap,
            p_compaction: config.p_schedule_compaction,
        }
    }

    /// Move sampled instructions to random steps on their own unit.
    pub fn schedule(&self, genome: &mut SchedulingGenome, rng: &mut ChaCha8Rng) {
        let ctx = Arc::clone(genome.context_arc());
        let n = ctx.num_instructions();
        for _ in 0..mutation_sample_size(rng, n) {
            let i = rng.gen_range(0..n);
            let target = rng.gen_range(0..genome.rows());
            genome.swap_slots(genome.step_of(i), target, ctx.unit_of(i));
        }
    }

    /// Draw new registers for sampled register values.
    pub fn register(&self, genome: &mut SchedulingGenome, rng: &mut ChaCha8Rng) {
        let n = genome.context().num_register_values();
        for _ in 0..mutation_sample_size(rng, n) {
            let v = rng.gen_range(0..n);
            genome.assign_random_register(v, rng);
        }
    }

    /// Swap sampled pairs of dependent instructions that are in the wrong
    /// order. Only the dependency between the two instructions themselves is
    /// checked.
    pub fn cross_swap(&self, genome: &mut SchedulingGenome, rng: &mut ChaCha8Rng) {
        let ctx = Arc::clone(genome.context_arc());
        let n = ctx.num_instructions();
        let deps = ctx.dependencies();
        for _ in 0..mutation_sample_size(rng, n) {
            let i1 = rng.gen_range(0..n);
            let i2 = rng.gen_range(0..n);
            let (t1, t2) = (genome.step_of(i1), genome.step_of(i2));

            let misordered = (deps.depends_on(i1, i2) && t1 <= t2)
                || (deps.depends_on(i2, i1) && t2 <= t1);
            if !misordered {
                continue;
            }
            let (u1, u2) = (ctx.unit_of(i1), ctx.unit_of(i2));
            genome.swap_slots(t1, t2, u1);
            if u1 != u2 {
                genome.swap_slots(t1, t2, u2);
            }
        }
    }

    /// Move sampled instructions one step earlier when that slot is free.
    pub fn compaction(&self, genome: &mut SchedulingGenome, rng: &mut ChaCha8Rng) {
        let ctx = Arc::clone(genome.context_arc());
        let n = ctx.num_instructions();
        for _ in 0..mutation_sample_size(rng, n) {
            let i = rng.gen_range(0..n);
            let t = genome.step_of(i);
            let unit = ctx.unit_of(i);
            if t > 0 && genome.slot(t - 1, unit).is_none() {
                genome.swap_slots(t, t - 1, unit);
            }
        }
    }
}

impl MutationOperator<SchedulingGenome> for ScheduleMutation {
    fn mutate(&self, genome: &mut SchedulingGenome, _p_mutation: f64, generation: u64, rng: &mut ChaCha8Rng) {
        let mut mutated = false;
        if rng.gen::<f64>() < self.p_schedule {
            self.schedule(genome, rng);
            mutated = true;
        }
        if rng.gen::<f64>() < self.p_register {
            self.register(genome, rng);
            mutated = true;
        }
        if rng.gen::<f64>() < self.p_cross_swap {
            self.cross_swap(genome, rng);
            mutated = true;
        }
        if rng.gen::<f64>() < self.p_compaction {
            self.compaction(genome, rng);
            mutated = true;
        }
        if mutated {
            genome.set_birth(generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScheduleContext;
    use crate::fixtures;
    use evocg_ga::Genome;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn genome(seed: u64, random: bool) -> (SchedulingGenome, ChaCha8Rng) {
        let (machine, graph) = fixtures::chain(6);
        let ctx = Arc::new(ScheduleContext::new(&machine, &graph).unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut g = SchedulingGenome::new(ctx, 0);
        g.initialize(random, &mut rng);
        (g, rng)
    }

    fn all_operators() -> ScheduleMutation {
        ScheduleMutation {
            p_schedule: 1.0,
            p_register: 1.0,
            p_cross_swap: 1.0,
            p_compaction: 1.0,
        }
    }

    fn misordered_pairs(g: &SchedulingGenome) -> usize {
        let deps = g.context().dependencies();
        (0..g.rows())
            .map(|i| deps.of(i).iter().filter(|&&d| g.step_of(d) >= g.step_of(i)).count())
            .sum()
    }

    #[test]
    fn test_no_mutation_keeps_birth() {
        let (mut g, mut rng) = genome(42, false);
        let none = ScheduleMutation {
            p_schedule: 0.0,
            p_register: 0.0,
            p_cross_swap: 0.0,
            p_compaction: 0.0,
        };
        let before = g.clone();
        none.mutate(&mut g, 1.0, 9, &mut rng);
        assert_eq!(g.birth(), 0);
        assert_eq!(g.difference_to(&before), 0.0);

        all_operators().mutate(&mut g, 1.0, 9, &mut rng);
        assert_eq!(g.birth(), 9);
    }

    #[test]
    fn test_compaction_only_moves_into_free_slots() {
        let (mut g, mut rng) = genome(42, true);
        let mutation = all_operators();
        let ctx = Arc::clone(g.context_arc());
        let mut moved = 0;
        for _ in 0..50 {
            let before: Vec<usize> = (0..g.rows()).map(|i| g.step_of(i)).collect();
            mutation.compaction(&mut g, &mut rng);
            assert!(g.is_consistent());
            for (i, &t) in before.iter().enumerate() {
                let now = g.step_of(i);
                assert!(now <= t);
                moved += usize::from(now < t);
                // Moves only fill free slots, so nothing overtakes an
                // instruction on its own unit.
                for (j, &u) in before.iter().enumerate() {
                    if ctx.unit_of(i) == ctx.unit_of(j) && t < u {
                        assert!(now < g.step_of(j));
                    }
                }
            }
        }
        assert!(moved > 0);
    }

    #[test]
    fn test_cross_swap_repairs_misordered_pairs() {
        let (machine, graph) = fixtures::sum_of_products();
        let ctx = Arc::new(ScheduleContext::new(&machine, &graph).unwrap());
        let mut g = SchedulingGenome::new(ctx, 0);
        // Multiply first, then both adds.
        g.place(2, 0);
        g.place(0, 1);
        g.place(1, 2);
        assert_eq!(misordered_pairs(&g), 2);

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            all_operators().cross_swap(&mut g, &mut rng);
            assert!(g.is_consistent());
        }
        assert_eq!(misordered_pairs(&g), 0);
    }

    proptest! {
        #[test]
        fn test_mutation_keeps_tables_consistent(seed in any::<u64>(), random in any::<bool>()) {
            let (mut g, mut rng) = genome(seed, random);
            for generation in 0..10 {
                all_operators().mutate(&mut g, 1.0, generation, &mut rng);
                prop_assert!(g.is_consistent());
                for v in 0..g.context().num_register_values() {
                    let r = g.register_of(v).unwrap();
                    prop_assert!(g.context().assignable[v].contains(r));
                }
            }
        }
    }
}
