//! Results of the scheduling search: register assignment and step table.

use evocg_core::{NodeId, RegisterId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Concrete register chosen for each register value of an instruction graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAssignment(BTreeMap<NodeId, RegisterId>);

impl RegisterAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: NodeId, register: RegisterId) {
        self.0.insert(value, register);
    }

    pub fn get(&self, value: NodeId) -> Option<RegisterId> {
        self.0.get(&value).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, RegisterId)> + '_ {
        self.0.iter().map(|(&v, &r)| (v, r))
    }
}

/// Instruction nodes per scheduling step and execution unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSchedule {
    steps: Vec<Vec<Option<NodeId>>>,
}

impl InstructionSchedule {
    pub fn new(steps: Vec<Vec<Option<NodeId>>>) -> Self {
        Self { steps }
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> &[Option<NodeId>] {
        &self.steps[index]
    }

    pub fn steps(&self) -> impl Iterator<Item = &[Option<NodeId>]> {
        self.steps.iter().map(Vec::as_slice)
    }

    /// Step at which `instruction` issues.
    pub fn step_of(&self, instruction: NodeId) -> Option<usize> {
        self.steps
            .iter()
            .position(|row| row.contains(&Some(instruction)))
    }

    pub fn num_instructions(&self) -> usize {
        self.steps.iter().flatten().filter(|slot| slot.is_some()).count()
    }
}
