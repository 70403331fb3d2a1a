//! Instruction graphs: program graphs after instruction selection.

use evocg_core::{InstructionId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::graph::Graph;
use crate::machine::RegisterSet;
use crate::value::Value;

/// Node of an instruction graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstrNode {
    Value(Value),
    Instruction(InstructionId),
}

/// Values and concrete target instructions, plus the register constraints
/// resolved for every register-resident value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructionGraph {
    pub graph: Graph<InstrNode>,
    pub inputs: Vec<NodeId>,
    pub outputs: Vec<NodeId>,
    /// Loop-carried identities, in instruction graph ids
    pub cyclic: BTreeMap<NodeId, NodeId>,
    /// Registers each register value may legally occupy
    pub assignable: BTreeMap<NodeId, RegisterSet>,
    /// Program graph value → instruction graph value, for materialized values
    pub value_map: BTreeMap<NodeId, NodeId>,
}

impl InstructionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value(&mut self, value: Value) -> NodeId {
        self.graph.add_node(InstrNode::Value(value))
    }

    pub fn add_instruction(&mut self, instruction: InstructionId) -> NodeId {
        self.graph.add_node(InstrNode::Instruction(instruction))
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.graph.add_edge(from, to);
    }

    /// The value payload of `id`. Panics if `id` is an instruction node.
    pub fn value(&self, id: NodeId) -> &Value {
        match self.graph.data(id) {
            InstrNode::Value(v) => v,
            InstrNode::Instruction(i) => panic!("node {id} is instruction {i}, not a value"),
        }
    }

    /// The instruction of node `id`. Panics if `id` is a value node.
    pub fn instruction(&self, id: NodeId) -> InstructionId {
        match self.graph.data(id) {
            InstrNode::Instruction(i) => *i,
            InstrNode::Value(_) => panic!("node {id} is a value, not an instruction"),
        }
    }

    pub fn is_value(&self, id: NodeId) -> bool {
        matches!(self.graph.data(id), InstrNode::Value(_))
    }

    pub fn is_instruction(&self, id: NodeId) -> bool {
        matches!(self.graph.data(id), InstrNode::Instruction(_))
    }

    pub fn is_input_value(&self, id: NodeId) -> bool {
        self.graph.inputs(id).is_empty()
    }

    /// Declared live-out, or never read inside the block.
    pub fn is_output_value(&self, id: NodeId) -> bool {
        self.outputs.contains(&id) || self.graph.outputs(id).is_empty()
    }

    pub fn instruction_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_ids().filter(|&id| self.is_instruction(id))
    }

    pub fn value_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_ids().filter(|&id| self.is_value(id))
    }

    pub fn register_values(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.value_nodes().filter(|&id| self.value(id).is_register())
    }

    pub fn num_instructions(&self) -> usize {
        self.instruction_nodes().count()
    }

    pub fn producing_instruction(&self, value: NodeId) -> Option<NodeId> {
        self.graph.inputs(value).first().copied()
    }

    pub fn result_value(&self, instruction: NodeId) -> Option<NodeId> {
        self.graph.outputs(instruction).first().copied()
    }

    pub fn operand_values(&self, instruction: NodeId) -> &[NodeId] {
        self.graph.inputs(instruction)
    }

    pub fn consumers(&self, value: NodeId) -> &[NodeId] {
        self.graph.outputs(value)
    }

    pub fn assignable_registers(&self, value: NodeId) -> Option<&RegisterSet> {
        self.assignable.get(&value)
    }

    /// Instruction graph node of a program graph value, if it was materialized.
    pub fn lookup(&self, program_value: NodeId) -> Option<NodeId> {
        self.value_map.get(&program_value).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Datatype;

    #[test]
    fn test_structure_queries() {
        let mut ig = InstructionGraph::new();
        let a = ig.add_value(Value::register(Datatype::Int));
        let b = ig.add_value(Value::memory(Datatype::Int));
        let add = ig.add_instruction(InstructionId(0));
        let c = ig.add_value(Value::register(Datatype::Int));
        ig.add_edge(a, add);
        ig.add_edge(b, add);
        ig.add_edge(add, c);

        assert_eq!(ig.instruction(add), InstructionId(0));
        assert_eq!(ig.operand_values(add), &[a, b]);
        assert_eq!(ig.result_value(add), Some(c));
        assert_eq!(ig.producing_instruction(c), Some(add));
        assert!(ig.is_input_value(a));
        assert!(ig.is_output_value(c));
        assert!(!ig.is_output_value(a));
        assert_eq!(ig.register_values().collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(ig.num_instructions(), 1);
    }
}
