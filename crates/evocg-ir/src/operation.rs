//! Machine-independent operations and the node type of operation/value graphs.

use serde::{Deserialize, Serialize};
use std::fmt;

use evocg_core::NodeId;

use crate::graph::Graph;
use crate::value::Value;

/// Operation kinds of the program graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    // Arithmetic
    Add,
    /// Add with carry
    Addc,
    Sub,
    /// Subtract with borrow
    Subb,
    Mul,
    Div,
    Mod,
    Neg,

    // Logical
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,

    // Data movement
    Const,
    Conv,
    Move,
    Load,
    Store,
}

impl OperationKind {
    /// Returns the number of operands this operation expects
    pub fn num_operands(&self) -> usize {
        if self.is_binary() {
            2
        } else {
            1
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            OperationKind::Add
                | OperationKind::Addc
                | OperationKind::Sub
                | OperationKind::Subb
                | OperationKind::Mul
                | OperationKind::Div
                | OperationKind::Mod
                | OperationKind::And
                | OperationKind::Or
                | OperationKind::Xor
                | OperationKind::Shl
                | OperationKind::Shr
                | OperationKind::Store
        )
    }

    /// Operand order does not affect the result. Covering does not exploit
    /// this; patterns match operands positionally.
    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            OperationKind::Add
                | OperationKind::Addc
                | OperationKind::Mul
                | OperationKind::And
                | OperationKind::Or
                | OperationKind::Xor
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{self:?}").to_lowercase();
        f.write_str(&name)
    }
}

/// Node of a program graph or instruction pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpNode {
    Value(Value),
    Operation(OperationKind),
}

impl OpNode {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            OpNode::Value(v) => Some(v),
            OpNode::Operation(_) => None,
        }
    }

    pub fn as_value_mut(&mut self) -> Option<&mut Value> {
        match self {
            OpNode::Value(v) => Some(v),
            OpNode::Operation(_) => None,
        }
    }

    pub fn as_operation(&self) -> Option<OperationKind> {
        match self {
            OpNode::Operation(kind) => Some(*kind),
            OpNode::Value(_) => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, OpNode::Value(_))
    }

    pub fn is_operation(&self) -> bool {
        matches!(self, OpNode::Operation(_))
    }
}

/// Queries shared by program graphs and instruction patterns.
impl Graph<OpNode> {
    /// The value payload of `id`. Panics if `id` is an operation node.
    pub fn value(&self, id: NodeId) -> &Value {
        match self.data(id) {
            OpNode::Value(v) => v,
            OpNode::Operation(kind) => panic!("node {id} is a {kind} operation, not a value"),
        }
    }

    /// The kind of operation `id`. Panics if `id` is a value node.
    pub fn operation(&self, id: NodeId) -> OperationKind {
        match self.data(id) {
            OpNode::Operation(kind) => *kind,
            OpNode::Value(_) => panic!("node {id} is a value, not an operation"),
        }
    }

    pub fn is_value(&self, id: NodeId) -> bool {
        self.data(id).is_value()
    }

    pub fn is_operation(&self, id: NodeId) -> bool {
        self.data(id).is_operation()
    }

    /// A value without a producer.
    pub fn is_input_value(&self, id: NodeId) -> bool {
        self.inputs(id).is_empty()
    }

    pub fn producing_operation(&self, value: NodeId) -> Option<NodeId> {
        self.inputs(value).first().copied()
    }

    pub fn result_value(&self, operation: NodeId) -> Option<NodeId> {
        self.outputs(operation).first().copied()
    }

    pub fn operand_values(&self, operation: NodeId) -> &[NodeId] {
        self.inputs(operation)
    }

    pub fn value_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids().filter(|&id| self.is_value(id))
    }

    pub fn operation_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids().filter(|&id| self.is_operation(id))
    }
}
