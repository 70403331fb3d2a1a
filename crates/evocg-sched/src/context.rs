//! Read-only tables shared by every genome of one scheduling run.

use evocg_core::{Error, NodeId, Result};
use evocg_ir::{InstructionGraph, MachineDescription, RegisterSet};

use crate::dependencies::Dependencies;

/// Dense view of an instruction graph.
///
/// Instructions and register values are renumbered `0..n` in node order so
/// genomes can keep their state in plain vectors.
#[derive(Debug, Clone)]
pub struct ScheduleContext {
    pub(crate) instructions: Vec<NodeId>,
    pub(crate) units: Vec<usize>,
    pub(crate) on_unit: Vec<Vec<usize>>,
    /// Register values read by each instruction
    pub(crate) reads: Vec<Vec<usize>>,
    /// Register value written by each instruction
    pub(crate) writes: Vec<Option<usize>>,
    /// Instructions writing an operand of each instruction
    pub(crate) producers: Vec<Vec<usize>>,
    pub(crate) dependencies: Dependencies,
    pub(crate) register_values: Vec<NodeId>,
    pub(crate) assignable: Vec<RegisterSet>,
    pub(crate) partners: Vec<Option<usize>>,
    pub(crate) outputs: Vec<usize>,
    pub(crate) num_units: usize,
}

impl ScheduleContext {
    pub fn new(machine: &MachineDescription, graph: &InstructionGraph) -> Result<Self> {
        let num_nodes = graph.graph.len();
        let num_units = machine.execution_units;

        let instructions: Vec<NodeId> = graph.instruction_nodes().collect();
        let mut instruction_index = vec![None; num_nodes];
        for (i, &node) in instructions.iter().enumerate() {
            instruction_index[node.index()] = Some(i);
        }

        let register_values: Vec<NodeId> = graph.register_values().collect();
        let mut register_index = vec![None; num_nodes];
        for (v, &node) in register_values.iter().enumerate() {
            register_index[node.index()] = Some(v);
        }

        let mut units = Vec::with_capacity(instructions.len());
        let mut on_unit = vec![Vec::new(); num_units];
        let mut reads = Vec::with_capacity(instructions.len());
        let mut writes = Vec::with_capacity(instructions.len());
        let mut producers = Vec::with_capacity(instructions.len());

        for (i, &node) in instructions.iter().enumerate() {
            let unit = machine.instruction(graph.instruction(node)).execution_unit;
            if unit >= num_units {
                return Err(Error::InvalidMachine(format!(
                    "instruction {node} issues on unit {unit} of {num_units}"
                )));
            }
            units.push(unit);
            on_unit[unit].push(i);

            let operands = graph.operand_values(node);
            reads.push(
                operands
                    .iter()
                    .filter_map(|v| register_index[v.index()])
                    .collect::<Vec<_>>(),
            );
            producers.push(
                operands
                    .iter()
                    .filter_map(|&v| graph.producing_instruction(v))
                    .filter_map(|p| instruction_index[p.index()])
                    .collect::<Vec<_>>(),
            );
            writes.push(
                graph
                    .result_value(node)
                    .and_then(|v| register_index[v.index()]),
            );
        }

        let mut assignable = Vec::with_capacity(register_values.len());
        for &node in &register_values {
            match graph.assignable_registers(node) {
                Some(set) if !set.is_empty() => assignable.push(set.clone()),
                _ => {
                    return Err(Error::InvalidProgram(format!(
                        "register value {node} has no assignable registers"
                    )))
                }
            }
        }

        let partners: Vec<Option<usize>> = register_values
            .iter()
            .map(|node| {
                graph
                    .cyclic
                    .get(node)
                    .and_then(|partner| register_index[partner.index()])
            })
            .collect();

        // Partners always share one register, so only registers legal for
        // both sides are usable when the sides overlap.
        for (v, partner) in partners.iter().enumerate() {
            if let Some(p) = *partner {
                let common = assignable[v].intersection(&assignable[p]);
                if !common.is_empty() {
                    assignable[v] = common.clone();
                    assignable[p] = common;
                }
            }
        }

        let outputs = register_values
            .iter()
            .enumerate()
            .filter(|&(_, &node)| graph.is_output_value(node))
            .map(|(v, _)| v)
            .collect();

        Ok(Self {
            instructions,
            units,
            on_unit,
            reads,
            writes,
            dependencies: Dependencies::compute(&producers),
            producers,
            register_values,
            assignable,
            partners,
            outputs,
            num_units,
        })
    }

    pub fn num_instructions(&self) -> usize {
        self.instructions.len()
    }

    pub fn num_register_values(&self) -> usize {
        self.register_values.len()
    }

    pub fn num_units(&self) -> usize {
        self.num_units
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Instruction graph node of dense instruction `i`.
    pub fn instruction_node(&self, i: usize) -> NodeId {
        self.instructions[i]
    }

    pub fn register_value_node(&self, v: usize) -> NodeId {
        self.register_values[v]
    }

    pub fn unit_of(&self, i: usize) -> usize {
        self.units[i]
    }

    pub fn instructions_on_unit(&self, unit: usize) -> &[usize] {
        &self.on_unit[unit]
    }

    /// Cyclic partner of register value `v`, if any.
    pub fn partner(&self, v: usize) -> Option<usize> {
        self.partners[v]
    }
}
