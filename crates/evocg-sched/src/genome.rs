//! Schedule plus register assignment genome.

use std::sync::Arc;

use evocg_core::RegisterId;
use evocg_ga::Genome;
use evocg_ir::{InstructionSchedule, RegisterAssignment};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::context::ScheduleContext;

/// Register and lifetime interval of one register value.
///
/// `production` is `-1` for values never written inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueInfo {
    pub register: Option<RegisterId>,
    pub production: i64,
    pub last_usage: i64,
}

impl ValueInfo {
    /// Whether the value occupies its register during `step`.
    pub fn is_live_at(&self, step: i64) -> bool {
        self.production <= step && step <= self.last_usage
    }
}

/// A complete schedule and register assignment.
///
/// The step table has one row per instruction, so every instruction fits
/// even when nothing issues in parallel. `table[step * units + unit]` and
/// `steps[instruction]` are kept in agreement by every operation.
#[derive(Debug, Clone)]
pub struct SchedulingGenome {
    context: Arc<ScheduleContext>,
    table: Vec<Option<usize>>,
    steps: Vec<usize>,
    pub(crate) values: Vec<ValueInfo>,
    pub(crate) is_valid: bool,
    pub(crate) schedule_length: usize,
    pub(crate) register_violations: usize,
    pub(crate) scheduling_violations: usize,
    pub(crate) birth: u64,
}

impl SchedulingGenome {
    /// An empty genome born in `generation`. Call [`initialize`](Self::initialize) before use.
    pub fn new(context: Arc<ScheduleContext>, generation: u64) -> Self {
        let rows = context.num_instructions();
        let table = vec![None; rows * context.num_units()];
        let steps = vec![0; rows];
        let values = vec![ValueInfo::default(); context.num_register_values()];
        Self {
            context,
            table,
            steps,
            values,
            is_valid: false,
            schedule_length: 0,
            register_violations: 0,
            scheduling_violations: 0,
            birth: generation,
        }
    }

    pub fn context(&self) -> &ScheduleContext {
        &self.context
    }

    pub(crate) fn context_arc(&self) -> &Arc<ScheduleContext> {
        &self.context
    }

    /// Rows of the step table.
    pub fn rows(&self) -> usize {
        self.steps.len()
    }

    pub fn slot(&self, step: usize, unit: usize) -> Option<usize> {
        self.table[step * self.context.num_units() + unit]
    }

    fn slot_mut(&mut self, step: usize, unit: usize) -> &mut Option<usize> {
        let units = self.context.num_units();
        &mut self.table[step * units + unit]
    }

    pub fn step_of(&self, instruction: usize) -> usize {
        self.steps[instruction]
    }

    pub fn register_of(&self, value: usize) -> Option<RegisterId> {
        self.values[value].register
    }

    pub fn value_info(&self, value: usize) -> &ValueInfo {
        &self.values[value]
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn schedule_length(&self) -> usize {
        self.schedule_length
    }

    pub fn register_violations(&self) -> usize {
        self.register_violations
    }

    pub fn scheduling_violations(&self) -> usize {
        self.scheduling_violations
    }

    pub fn birth(&self) -> u64 {
        self.birth
    }

    pub fn set_birth(&mut self, generation: u64) {
        self.birth = generation;
    }

    pub fn initialize(&mut self, random: bool, rng: &mut ChaCha8Rng) {
        if random {
            self.initialize_random_schedule(rng);
        } else {
            self.initialize_list_schedule(rng);
        }
        self.initialize_registers(rng);
    }

    /// Randomized list scheduling. Each ready instruction issues at the
    /// first step that is free on its unit and follows all its producers.
    fn initialize_list_schedule(&mut self, rng: &mut ChaCha8Rng) {
        let ctx = Arc::clone(&self.context);
        let n = ctx.num_instructions();
        let mut scheduled = vec![false; n];
        let mut next_free = vec![0usize; ctx.num_units()];
        let producers = &ctx.producers;

        for _ in 0..n {
            let ready: Vec<usize> = (0..n)
                .filter(|&i| !scheduled[i] && producers[i].iter().all(|&p| scheduled[p]))
                .collect();
            let Some(&i) = ready.choose(rng) else {
                break;
            };
            let unit = ctx.unit_of(i);
            let after_producers = producers[i]
                .iter()
                .map(|&p| self.steps[p] + 1)
                .max()
                .unwrap_or(0);
            let step = next_free[unit].max(after_producers);
            self.place(i, step);
            next_free[unit] = step + 1;
            scheduled[i] = true;
        }
    }

    /// Pack every unit in instruction order, then shuffle by slot swaps.
    fn initialize_random_schedule(&mut self, rng: &mut ChaCha8Rng) {
        let ctx = Arc::clone(&self.context);
        let rows = self.rows();
        for unit in 0..ctx.num_units() {
            for (step, &i) in ctx.instructions_on_unit(unit).iter().enumerate() {
                self.place(i, step);
            }
        }
        if rows == 0 || ctx.num_units() == 0 {
            return;
        }
        for _ in 0..10 * rows {
            let unit = rng.gen_range(0..ctx.num_units());
            let t1 = rng.gen_range(0..rows);
            let t2 = rng.gen_range(0..rows);
            self.swap_slots(t1, t2, unit);
        }
    }

    fn initialize_registers(&mut self, rng: &mut ChaCha8Rng) {
        for v in 0..self.values.len() {
            if self.values[v].register.is_none() {
                self.assign_random_register(v, rng);
            }
        }
    }

    /// Put `instruction` at `step` on its unit without touching the
    /// instruction previously in that slot.
    pub(crate) fn place(&mut self, instruction: usize, step: usize) {
        let unit = self.context.unit_of(instruction);
        *self.slot_mut(step, unit) = Some(instruction);
        self.steps[instruction] = step;
    }

    /// Exchange the contents of two steps on one unit.
    pub fn swap_slots(&mut self, t1: usize, t2: usize, unit: usize) {
        let i1 = self.slot(t1, unit);
        let i2 = self.slot(t2, unit);
        *self.slot_mut(t1, unit) = i2;
        *self.slot_mut(t2, unit) = i1;
        if let Some(i) = i1 {
            self.steps[i] = t2;
        }
        if let Some(i) = i2 {
            self.steps[i] = t1;
        }
    }

    /// Exchange one unit's column of the step table with `other`.
    pub(crate) fn swap_unit_column(&mut self, other: &mut Self, unit: usize) {
        for step in 0..self.rows() {
            let mine = self.slot(step, unit);
            let theirs = other.slot(step, unit);
            *self.slot_mut(step, unit) = theirs;
            *other.slot_mut(step, unit) = mine;
            if let Some(i) = theirs {
                self.steps[i] = step;
            }
            if let Some(i) = mine {
                other.steps[i] = step;
            }
        }
    }

    /// Set the register of `value` and of its cyclic partner.
    pub fn assign_register(&mut self, value: usize, register: Option<RegisterId>) {
        self.values[value].register = register;
        if let Some(partner) = self.context.partner(value) {
            self.values[partner].register = register;
        }
    }

    pub(crate) fn assign_random_register(&mut self, value: usize, rng: &mut ChaCha8Rng) {
        let register = self.context.assignable[value].as_slice().choose(rng).copied();
        self.assign_register(value, register);
    }

    /// Recompute every lifetime interval from the current steps.
    pub fn update_lifetimes(&mut self) {
        for info in &mut self.values {
            info.production = -1;
            info.last_usage = -1;
        }
        let ctx = Arc::clone(&self.context);
        for i in 0..ctx.num_instructions() {
            let step = self.steps[i] as i64;
            if let Some(v) = ctx.writes[i] {
                self.values[v].production = step;
            }
            for &v in &ctx.reads[i] {
                let info = &mut self.values[v];
                info.last_usage = info.last_usage.max(step - 1);
            }
        }
        let rows = self.rows() as i64;
        for &v in &ctx.outputs {
            self.values[v].last_usage = rows;
        }
    }

    pub fn register_assignment(&self) -> RegisterAssignment {
        let mut assignment = RegisterAssignment::new();
        for (v, info) in self.values.iter().enumerate() {
            if let Some(register) = info.register {
                assignment.insert(self.context.register_value_node(v), register);
            }
        }
        assignment
    }

    /// Steps `0..schedule_length` with instruction graph nodes.
    pub fn instruction_schedule(&self) -> InstructionSchedule {
        let steps = (0..self.schedule_length.min(self.rows()))
            .map(|step| {
                (0..self.context.num_units())
                    .map(|unit| {
                        self.slot(step, unit)
                            .map(|i| self.context.instruction_node(i))
                    })
                    .collect()
            })
            .collect();
        InstructionSchedule::new(steps)
    }

    /// Every instruction occupies exactly the slot its step says, on its
    /// own unit, and no slot holds anything else.
    pub fn is_consistent(&self) -> bool {
        let units = self.context.num_units();
        let mut seen = vec![false; self.steps.len()];
        for (index, slot) in self.table.iter().enumerate() {
            let Some(i) = *slot else { continue };
            let (step, unit) = (index / units, index % units);
            if seen[i] || self.steps[i] != step || self.context.unit_of(i) != unit {
                return false;
            }
            seen[i] = true;
        }
        seen.into_iter().all(|s| s)
    }
}

impl Genome for SchedulingGenome {
    fn difference_to(&self, other: &Self) -> f64 {
        let total = self.steps.len() + self.values.len();
        if total == 0 {
            return 0.0;
        }
        let steps = self
            .steps
            .iter()
            .zip(&other.steps)
            .filter(|(a, b)| a != b)
            .count();
        let registers = self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a.register != b.register)
            .count();
        (steps + registers) as f64 / total as f64
    }

    fn is_valid(&self) -> bool {
        self.is_valid
    }
}
