//! Result of one scheduling run.

use evocg_ir::{InstructionSchedule, RegisterAssignment};
use serde::{Deserialize, Serialize};

use crate::genome::SchedulingGenome;

/// Best genome of a finished scheduling run, decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub register_assignment: RegisterAssignment,
    pub schedule: InstructionSchedule,
    pub is_valid: bool,
    pub objective: f64,
    pub schedule_length: usize,
    pub register_violations: usize,
    pub scheduling_violations: usize,
    pub generations: u64,
}

impl ScheduleOutcome {
    pub fn from_genome(genome: &SchedulingGenome, objective: f64, generations: u64) -> Self {
        Self {
            register_assignment: genome.register_assignment(),
            schedule: genome.instruction_schedule(),
            is_valid: genome.is_valid(),
            objective,
            schedule_length: genome.schedule_length(),
            register_violations: genome.register_violations(),
            scheduling_violations: genome.scheduling_violations(),
            generations,
        }
    }
}
