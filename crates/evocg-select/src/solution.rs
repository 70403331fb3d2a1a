//! Artifacts of a finished code generation run.

use evocg_ir::{InstructionGraph, InstructionSchedule, RegisterAssignment};
use serde::{Deserialize, Serialize};

/// A lowered, register-assigned and scheduled selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub instruction_graph: InstructionGraph,
    pub register_assignment: RegisterAssignment,
    pub schedule: InstructionSchedule,
}

/// Best result of a code generation run.
///
/// An invalid outcome still carries the best artifacts found so callers can
/// inspect them or retry with larger budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeGenOutcome {
    pub solution: Solution,
    pub is_valid: bool,
    pub objective: f64,
    pub generations: u64,
    pub scheduler_runs: usize,
}

impl CodeGenOutcome {
    pub fn into_valid(self) -> Option<Solution> {
        self.is_valid.then_some(self.solution)
    }
}
