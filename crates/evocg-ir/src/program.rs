//! Program graphs: the machine-independent input to code generation.

use evocg_core::{Error, NodeId, RegisterId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::graph::Graph;
use crate::operation::{OpNode, OperationKind};
use crate::value::Value;

/// Data-flow graph of one basic block (or unrolled loop body)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramGraph {
    pub graph: Graph<OpNode>,
    /// Live-in values
    pub inputs: Vec<NodeId>,
    /// Live-out values
    pub outputs: Vec<NodeId>,
    /// Values that must be held in a specific register
    pub preassigned: BTreeMap<NodeId, RegisterId>,
    /// Loop-carried identities: value at iteration start ↔ value at iteration end
    pub cyclic: BTreeMap<NodeId, NodeId>,
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value(&mut self, value: Value) -> NodeId {
        self.graph.add_node(OpNode::Value(value))
    }

    pub fn add_operation(&mut self, kind: OperationKind) -> NodeId {
        self.graph.add_node(OpNode::Operation(kind))
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.graph.add_edge(from, to);
    }

    /// Add `result = kind(operands..)` over existing value nodes and return
    /// the operation node.
    pub fn apply(&mut self, kind: OperationKind, operands: &[NodeId], result: NodeId) -> NodeId {
        let op = self.add_operation(kind);
        for &operand in operands {
            self.graph.add_edge(operand, op);
        }
        self.graph.add_edge(op, result);
        op
    }

    /// Add `kind(operands..)` producing a fresh value and return that value.
    pub fn compute(&mut self, kind: OperationKind, operands: &[NodeId], result: Value) -> NodeId {
        let result = self.add_value(result);
        self.apply(kind, operands, result);
        result
    }

    /// Collect every value without a producer as an input.
    pub fn init_input_values(&mut self) {
        self.inputs = self
            .graph
            .value_nodes()
            .filter(|&v| self.graph.is_input_value(v))
            .collect();
    }

    /// Collect every value without a consumer as an output.
    pub fn init_output_values(&mut self) {
        self.outputs = self
            .graph
            .value_nodes()
            .filter(|&v| self.graph.outputs(v).is_empty())
            .collect();
    }

    /// Declare `value` live-out even if other operations consume it.
    pub fn mark_output(&mut self, value: NodeId) {
        if let Some(v) = self.graph.data_mut(value).as_value_mut() {
            v.output = true;
        }
        if !self.outputs.contains(&value) {
            self.outputs.push(value);
        }
    }

    pub fn preassign(&mut self, value: NodeId, register: RegisterId) {
        self.preassigned.insert(value, register);
    }

    /// Record that `start` and `end` share storage across loop iterations.
    /// The identity is stored in both directions.
    pub fn add_cyclic_dependency(&mut self, start: NodeId, end: NodeId) {
        self.cyclic.insert(start, end);
        self.cyclic.insert(end, start);
    }

    pub fn value(&self, id: NodeId) -> &Value {
        self.graph.value(id)
    }

    pub fn is_input_value(&self, id: NodeId) -> bool {
        self.graph.is_input_value(id)
    }

    /// No consumer, or explicitly flagged live-out.
    pub fn is_output_value(&self, id: NodeId) -> bool {
        self.graph.outputs(id).is_empty() || self.graph.value(id).output
    }

    /// Values produced by some operation.
    pub fn computed_values(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .value_nodes()
            .filter(|&v| !self.graph.is_input_value(v))
    }

    pub fn operations(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.operation_nodes()
    }

    pub fn num_operations(&self) -> usize {
        self.operations().count()
    }

    /// Serialize the program graph to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::from)
    }

    /// Deserialize a program graph from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(Error::from)
    }
}
