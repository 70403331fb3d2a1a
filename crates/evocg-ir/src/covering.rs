//! Tree-pattern covering of program graphs by instruction patterns.
//!
//! For every computed value the engine records which instructions can
//! produce it and which program operations and values each of them would
//! absorb. The table is built once per program graph and shared read-only by
//! the selection search.

use evocg_core::{Error, InstructionId, NodeId, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::graph::Graph;
use crate::machine::{InstructionPattern, MachineDescription};
use crate::operation::OpNode;
use crate::program::ProgramGraph;

/// Index into a [`CoveringTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoveringId(pub u32);

impl CoveringId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One way of producing a program value with a single instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Covering {
    pub instruction: InstructionId,
    /// Program value written by the instruction
    pub result: NodeId,
    /// Program operations absorbed by the instruction
    pub covered_operations: Vec<NodeId>,
    /// Program values matched by the pattern: the result, absorbed
    /// intermediates and the operand values bound to pattern leaves
    pub covered_values: Vec<NodeId>,
    /// Program values read by the instruction, in pattern operand order
    pub operand_values: Vec<NodeId>,
}

impl Covering {
    pub fn covers(&self, operation: NodeId) -> bool {
        self.covered_operations.contains(&operation)
    }
}

/// In-progress match state
struct Match {
    operations: Vec<NodeId>,
    values: Vec<NodeId>,
    bindings: Vec<(NodeId, NodeId)>,
}

fn cover_value(
    program: &Graph<OpNode>,
    value: NodeId,
    pattern: &Graph<OpNode>,
    pattern_value: NodeId,
    m: &mut Match,
) -> bool {
    if !program.value(value).is_covered_by(pattern.value(pattern_value)) {
        return false;
    }

    let matched = if pattern.is_input_value(pattern_value) {
        match m.bindings.iter().find(|(p, _)| *p == pattern_value) {
            Some(&(_, bound)) => bound == value,
            None => {
                m.bindings.push((pattern_value, value));
                true
            }
        }
    } else if program.is_input_value(value) {
        false
    } else {
        // A value read outside the instruction cannot be absorbed into it.
        let absorbable = pattern.outputs(pattern_value).is_empty()
            || (program.outputs(value).len() <= 1 && !program.value(value).output);
        match (
            program.producing_operation(value),
            pattern.producing_operation(pattern_value),
        ) {
            (Some(op), Some(pattern_op)) if absorbable => {
                cover_operation(program, op, pattern, pattern_op, m)
            }
            _ => false,
        }
    };

    if matched {
        m.values.push(value);
    }
    matched
}

fn cover_operation(
    program: &Graph<OpNode>,
    operation: NodeId,
    pattern: &Graph<OpNode>,
    pattern_operation: NodeId,
    m: &mut Match,
) -> bool {
    if program.operation(operation) != pattern.operation(pattern_operation) {
        return false;
    }

    let operands = program.operand_values(operation);
    let pattern_operands = pattern.operand_values(pattern_operation);
    if operands.len() != pattern_operands.len() {
        return false;
    }

    let matched = operands
        .iter()
        .zip(pattern_operands)
        .all(|(&v, &pv)| cover_value(program, v, pattern, pv, m));

    if matched {
        m.operations.push(operation);
    }
    matched
}

/// Try to produce `value` with an instruction of the given pattern.
pub fn match_pattern(
    program: &ProgramGraph,
    value: NodeId,
    instruction: InstructionId,
    pattern: &InstructionPattern,
) -> Option<Covering> {
    let mut m = Match {
        operations: Vec::new(),
        values: Vec::new(),
        bindings: Vec::new(),
    };
    if !cover_value(&program.graph, value, &pattern.graph, pattern.result, &mut m) {
        return None;
    }

    let operand_values = pattern
        .operands
        .iter()
        .map(|p| {
            m.bindings
                .iter()
                .find(|(leaf, _)| leaf == p)
                .map(|&(_, v)| v)
        })
        .collect::<Option<Vec<_>>>()?;

    Some(Covering {
        instruction,
        result: value,
        covered_operations: m.operations,
        covered_values: m.values,
        operand_values,
    })
}

/// All coverings of a program graph, grouped by the value they produce
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoveringTable {
    coverings: Vec<Covering>,
    by_value: Vec<Vec<CoveringId>>,
}

impl CoveringTable {
    /// Match every instruction against every computed value.
    ///
    /// Coverings whose operands cannot themselves be produced are dropped.
    /// Fails with [`Error::NoCoveringFound`] when a value that must be
    /// written by some instruction (an output, or a value read by several
    /// operations) has no usable covering.
    #[instrument(skip_all, fields(values = program.graph.len(), instructions = machine.instructions.len()))]
    pub fn build(program: &ProgramGraph, machine: &MachineDescription) -> Result<Self> {
        let mut candidates = Vec::new();
        for value in program.computed_values() {
            for id in machine.instruction_ids() {
                if let Some(c) = match_pattern(program, value, id, &machine.instruction(id).pattern) {
                    candidates.push(c);
                }
            }
        }

        // Keep only coverings whose computed operands are producible.
        let node_count = program.graph.len();
        let mut producible = vec![false; node_count];
        let mut usable = vec![false; candidates.len()];
        let mut changed = true;
        while changed {
            changed = false;
            for (i, c) in candidates.iter().enumerate() {
                if usable[i] {
                    continue;
                }
                let ready = c
                    .operand_values
                    .iter()
                    .all(|&v| program.is_input_value(v) || producible[v.index()]);
                if ready {
                    usable[i] = true;
                    producible[c.result.index()] = true;
                    changed = true;
                }
            }
        }

        let mut table = CoveringTable {
            coverings: Vec::new(),
            by_value: vec![Vec::new(); node_count],
        };
        for (c, keep) in candidates.into_iter().zip(usable) {
            if keep {
                let id = CoveringId(table.coverings.len() as u32);
                table.by_value[c.result.index()].push(id);
                table.coverings.push(c);
            }
        }

        for value in program.computed_values() {
            let must_be_written =
                program.is_output_value(value) || program.graph.outputs(value).len() > 1;
            if must_be_written && table.by_value[value.index()].is_empty() {
                let v = program.value(value);
                return Err(Error::NoCoveringFound {
                    value,
                    description: format!("{v} of type {:?}", v.datatype),
                });
            }
        }

        debug!(
            event = "coverings_built",
            coverings = table.coverings.len(),
            "covering table ready"
        );
        Ok(table)
    }

    pub fn covering(&self, id: CoveringId) -> &Covering {
        &self.coverings[id.index()]
    }

    /// Coverings producing `value`; empty for inputs and absorbed-only values.
    pub fn for_value(&self, value: NodeId) -> &[CoveringId] {
        self.by_value
            .get(value.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.coverings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coverings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CoveringId, &Covering)> {
        self.coverings
            .iter()
            .enumerate()
            .map(|(i, c)| (CoveringId(i as u32), c))
    }
}
