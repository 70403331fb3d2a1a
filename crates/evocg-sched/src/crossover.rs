//! Recombination of two scheduling genomes.

use std::sync::Arc;

use evocg_core::SchedulerConfig;
use evocg_ga::{crossover_sample_size, CrossoverOperator};
use rand::seq::index;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::genome::SchedulingGenome;

/// Applies each of four independent crossovers with its own probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleCrossover {
    pub p_position_exchange: f64,
    pub p_relative_order: f64,
    pub p_register: f64,
    pub p_unit_exchange: f64,
}

impl ScheduleCrossover {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            p_position_exchange: config.p_position_exchange,
            p_relative_order: config.p_relative_order,
            p_register: config.p_register_crossover,
            p_unit_exchange: config.p_unit_exchange,
        }
    }

    /// Exchange the steps of sampled instructions, and the registers of
    /// their results, between the two genomes.
    pub fn position_exchange(
        &self,
        a: &mut SchedulingGenome,
        b: &mut SchedulingGenome,
        rng: &mut ChaCha8Rng,
    ) {
        let ctx = Arc::clone(a.context_arc());
        let n = ctx.num_instructions();
        if n == 0 {
            return;
        }
        for _ in 0..crossover_sample_size(rng, n) {
            let i = rng.gen_range(0..n);
            let unit = ctx.unit_of(i);
            let (t1, t2) = (a.step_of(i), b.step_of(i));
            a.swap_slots(t1, t2, unit);
            b.swap_slots(t1, t2, unit);

            if let Some(v) = ctx.writes[i] {
                swap_register(a, b, v);
                if let Some(partner) = ctx.partner(v) {
                    swap_register(a, b, partner);
                }
            }
        }
    }

    /// Per unit, reorder a sample of instructions in each genome to follow
    /// their relative order in the other, reusing the same slots.
    pub fn relative_order(
        &self,
        a: &mut SchedulingGenome,
        b: &mut SchedulingGenome,
        rng: &mut ChaCha8Rng,
    ) {
        let ctx = Arc::clone(a.context_arc());
        for unit in 0..ctx.num_units() {
            let on_unit = ctx.instructions_on_unit(unit);
            if on_unit.is_empty() {
                continue;
            }
            let k = crossover_sample_size(rng, on_unit.len());
            let sample: Vec<usize> = index::sample(rng, on_unit.len(), k)
                .into_iter()
                .map(|j| on_unit[j])
                .collect();

            let mut by_a = sample.clone();
            by_a.sort_by_key(|&i| a.step_of(i));
            let mut by_b = sample;
            by_b.sort_by_key(|&i| b.step_of(i));

            let steps_a: Vec<usize> = by_a.iter().map(|&i| a.step_of(i)).collect();
            let steps_b: Vec<usize> = by_b.iter().map(|&i| b.step_of(i)).collect();
            for k in 0..by_a.len() {
                a.place(by_b[k], steps_a[k]);
                b.place(by_a[k], steps_b[k]);
            }
        }
    }

    /// Exchange the registers of sampled register values.
    pub fn register(&self, a: &mut SchedulingGenome, b: &mut SchedulingGenome, rng: &mut ChaCha8Rng) {
        let n = a.context().num_register_values();
        if n == 0 {
            return;
        }
        for _ in 0..crossover_sample_size(rng, n) {
            let v = rng.gen_range(0..n);
            let (ra, rb) = (a.register_of(v), b.register_of(v));
            a.assign_register(v, rb);
            b.assign_register(v, ra);
        }
    }

    /// Exchange whole unit columns of the step table.
    pub fn unit_exchange(&self, a: &mut SchedulingGenome, b: &mut SchedulingGenome, rng: &mut ChaCha8Rng) {
        let units = a.context().num_units();
        if units == 0 {
            return;
        }
        for _ in 0..crossover_sample_size(rng, units) {
            let unit = rng.gen_range(0..units);
            a.swap_unit_column(b, unit);
        }
    }
}

fn swap_register(a: &mut SchedulingGenome, b: &mut SchedulingGenome, v: usize) {
    let ra = a.values[v].register;
    a.values[v].register = b.values[v].register;
    b.values[v].register = ra;
}

impl CrossoverOperator<SchedulingGenome> for ScheduleCrossover {
    fn cross(&self, a: &mut SchedulingGenome, b: &mut SchedulingGenome, generation: u64, rng: &mut ChaCha8Rng) {
        if rng.gen::<f64>() < self.p_position_exchange {
            self.position_exchange(a, b, rng);
        }
        if rng.gen::<f64>() < self.p_relative_order {
            self.relative_order(a, b, rng);
        }
        if rng.gen::<f64>() < self.p_register {
            self.register(a, b, rng);
        }
        if rng.gen::<f64>() < self.p_unit_exchange {
            self.unit_exchange(a, b, rng);
        }
        a.set_birth(generation);
        b.set_birth(generation);
    }
}
