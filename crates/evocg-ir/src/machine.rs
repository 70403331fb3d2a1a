//! Target machine description: registers, instructions and their patterns.

use evocg_core::{Error, InstructionId, NodeId, RegisterId, Result};
use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::operation::{OpNode, OperationKind};
use crate::value::{Datatype, Value};

/// A machine register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub mnemonic: String,
    pub datatype: Datatype,
}

/// Ordered, duplicate-free set of registers.
///
/// An empty set on an instruction operand means the operand is not held in
/// a register (memory or constant).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterSet(Vec<RegisterId>);

impl RegisterSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn singleton(register: RegisterId) -> Self {
        Self(vec![register])
    }

    pub fn insert(&mut self, register: RegisterId) -> bool {
        if self.0.contains(&register) {
            false
        } else {
            self.0.push(register);
            true
        }
    }

    pub fn contains(&self, register: RegisterId) -> bool {
        self.0.contains(&register)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<RegisterId> {
        self.0.get(index).copied()
    }

    pub fn first(&self) -> Option<RegisterId> {
        self.0.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = RegisterId> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[RegisterId] {
        &self.0
    }

    /// Registers of `self` followed by those only in `other`.
    pub fn union(&self, other: &RegisterSet) -> RegisterSet {
        let mut result = self.clone();
        for r in other.iter() {
            result.insert(r);
        }
        result
    }

    /// Registers of `self` that are also in `other`, in `self`'s order.
    pub fn intersection(&self, other: &RegisterSet) -> RegisterSet {
        RegisterSet(self.iter().filter(|&r| other.contains(r)).collect())
    }

    /// Registers of `self` that are not in `other`.
    pub fn difference(&self, other: &RegisterSet) -> RegisterSet {
        RegisterSet(self.iter().filter(|&r| !other.contains(r)).collect())
    }

    pub fn intersects(&self, other: &RegisterSet) -> bool {
        self.iter().any(|r| other.contains(r))
    }
}

impl FromIterator<RegisterId> for RegisterSet {
    fn from_iter<T: IntoIterator<Item = RegisterId>>(iter: T) -> Self {
        let mut set = RegisterSet::new();
        for r in iter {
            set.insert(r);
        }
        set
    }
}

/// A named memory region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub mnemonic: String,
    pub address: u64,
    pub size: u64,
}

/// The operation/value tree an instruction implements.
///
/// `result` is the value the instruction writes, `operands` are the leaf
/// values it reads, in the order the mnemonic template refers to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionPattern {
    pub graph: Graph<OpNode>,
    pub result: NodeId,
    pub operands: Vec<NodeId>,
}

impl InstructionPattern {
    pub fn new(graph: Graph<OpNode>, result: NodeId, operands: Vec<NodeId>) -> Self {
        Self {
            graph,
            result,
            operands,
        }
    }

    /// `result = op(a)`
    pub fn unary(op: OperationKind, result: Value, a: Value) -> Self {
        let mut g = Graph::new();
        let o = g.add_node(OpNode::Operation(op));
        let r = g.add_node(OpNode::Value(result));
        let a = g.add_node(OpNode::Value(a));
        g.add_edge(o, r);
        g.add_edge(a, o);
        Self::new(g, r, vec![a])
    }

    /// `result = op(a, b)`
    pub fn binary(op: OperationKind, result: Value, a: Value, b: Value) -> Self {
        let mut g = Graph::new();
        let o = g.add_node(OpNode::Operation(op));
        let r = g.add_node(OpNode::Value(result));
        let a = g.add_node(OpNode::Value(a));
        let b = g.add_node(OpNode::Value(b));
        g.add_edge(o, r);
        g.add_edge(a, o);
        g.add_edge(b, o);
        Self::new(g, r, vec![a, b])
    }

    /// `result = outer(inner(a, b), c)`, e.g. a multiply-accumulate
    pub fn left_ternary(
        inner: OperationKind,
        outer: OperationKind,
        result: Value,
        a: Value,
        b: Value,
        c: Value,
    ) -> Self {
        let mut g = Graph::new();
        let o1 = g.add_node(OpNode::Operation(inner));
        let o2 = g.add_node(OpNode::Operation(outer));
        let r = g.add_node(OpNode::Value(result));
        let t = g.add_node(OpNode::Value(Value::register(a.datatype)));
        let a = g.add_node(OpNode::Value(a));
        let b = g.add_node(OpNode::Value(b));
        let c = g.add_node(OpNode::Value(c));
        g.add_edge(a, o1);
        g.add_edge(b, o1);
        g.add_edge(o1, t);
        g.add_edge(t, o2);
        g.add_edge(c, o2);
        g.add_edge(o2, r);
        Self::new(g, r, vec![a, b, c])
    }

    /// `result = outer(a, inner(b, c))`
    pub fn right_ternary(
        inner: OperationKind,
        outer: OperationKind,
        result: Value,
        a: Value,
        b: Value,
        c: Value,
    ) -> Self {
        let mut g = Graph::new();
        let o1 = g.add_node(OpNode::Operation(inner));
        let o2 = g.add_node(OpNode::Operation(outer));
        let r = g.add_node(OpNode::Value(result));
        let t = g.add_node(OpNode::Value(Value::register(b.datatype)));
        let a = g.add_node(OpNode::Value(a));
        let b = g.add_node(OpNode::Value(b));
        let c = g.add_node(OpNode::Value(c));
        g.add_edge(b, o1);
        g.add_edge(c, o1);
        g.add_edge(o1, t);
        g.add_edge(a, o2);
        g.add_edge(t, o2);
        g.add_edge(o2, r);
        Self::new(g, r, vec![a, b, c])
    }

    /// `result = outer(a, inner(b))` where `inner` materializes the constant `b`
    pub fn binary_right_constant(
        inner: OperationKind,
        outer: OperationKind,
        result: Value,
        a: Value,
        b: Value,
    ) -> Self {
        let intermediate = b.datatype;
        Self::right_nested(inner, outer, result, a, b, intermediate)
    }

    /// `result = outer(inner(a), b)`, e.g. an add reading its left operand
    /// through an address register
    pub fn left_nested(
        inner: OperationKind,
        outer: OperationKind,
        result: Value,
        a: Value,
        b: Value,
        intermediate: Datatype,
    ) -> Self {
        let mut g = Graph::new();
        let o1 = g.add_node(OpNode::Operation(inner));
        let o2 = g.add_node(OpNode::Operation(outer));
        let r = g.add_node(OpNode::Value(result));
        let t = g.add_node(OpNode::Value(Value::register(intermediate)));
        let a = g.add_node(OpNode::Value(a));
        let b = g.add_node(OpNode::Value(b));
        g.add_edge(a, o1);
        g.add_edge(o1, t);
        g.add_edge(t, o2);
        g.add_edge(b, o2);
        g.add_edge(o2, r);
        Self::new(g, r, vec![a, b])
    }

    /// `result = outer(a, inner(b))`
    pub fn right_nested(
        inner: OperationKind,
        outer: OperationKind,
        result: Value,
        a: Value,
        b: Value,
        intermediate: Datatype,
    ) -> Self {
        let mut g = Graph::new();
        let o1 = g.add_node(OpNode::Operation(inner));
        let o2 = g.add_node(OpNode::Operation(outer));
        let r = g.add_node(OpNode::Value(result));
        let t = g.add_node(OpNode::Value(Value::register(intermediate)));
        let a = g.add_node(OpNode::Value(a));
        let b = g.add_node(OpNode::Value(b));
        g.add_edge(b, o1);
        g.add_edge(o1, t);
        g.add_edge(a, o2);
        g.add_edge(t, o2);
        g.add_edge(o2, r);
        Self::new(g, r, vec![a, b])
    }

    /// `result = outer(left(a), right(b))`
    #[allow(clippy::too_many_arguments)]
    pub fn both_nested(
        left: OperationKind,
        right: OperationKind,
        outer: OperationKind,
        result: Value,
        a: Value,
        b: Value,
        left_type: Datatype,
        right_type: Datatype,
    ) -> Self {
        let mut g = Graph::new();
        let o1 = g.add_node(OpNode::Operation(left));
        let o2 = g.add_node(OpNode::Operation(right));
        let o3 = g.add_node(OpNode::Operation(outer));
        let r = g.add_node(OpNode::Value(result));
        let t1 = g.add_node(OpNode::Value(Value::register(left_type)));
        let t2 = g.add_node(OpNode::Value(Value::register(right_type)));
        let a = g.add_node(OpNode::Value(a));
        let b = g.add_node(OpNode::Value(b));
        g.add_edge(a, o1);
        g.add_edge(b, o2);
        g.add_edge(o1, t1);
        g.add_edge(o2, t2);
        g.add_edge(t1, o3);
        g.add_edge(t2, o3);
        g.add_edge(o3, r);
        Self::new(g, r, vec![a, b])
    }

    /// The operation writing the pattern's result.
    pub fn root_operation(&self) -> Option<NodeId> {
        self.graph.producing_operation(self.result)
    }

    /// A bare `result = move(operand)` pattern.
    pub fn is_transfer(&self) -> bool {
        self.graph.len() == 3
            && self.operands.len() == 1
            && self
                .root_operation()
                .map(|op| self.graph.operation(op) == OperationKind::Move)
                .unwrap_or(false)
    }
}

/// A target instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Assembly template; `$0..$n` name operands, `$r` the result
    pub mnemonic: String,
    pub pattern: InstructionPattern,
    pub execution_unit: usize,
    /// Allowed registers per pattern operand, empty for non-register operands
    pub operand_registers: Vec<RegisterSet>,
    /// Allowed registers for the result, empty for non-register results
    pub result_registers: RegisterSet,
}

impl Instruction {
    pub fn new(mnemonic: impl Into<String>, pattern: InstructionPattern, execution_unit: usize) -> Self {
        let operand_registers = vec![RegisterSet::new(); pattern.operands.len()];
        Self {
            mnemonic: mnemonic.into(),
            pattern,
            execution_unit,
            operand_registers,
            result_registers: RegisterSet::new(),
        }
    }

    pub fn with_result_registers(mut self, registers: RegisterSet) -> Self {
        self.result_registers = registers;
        self
    }

    /// Set the allowed registers of every operand, in operand order.
    pub fn with_operand_registers(mut self, registers: Vec<RegisterSet>) -> Self {
        self.operand_registers = registers;
        self
    }

    pub fn num_operands(&self) -> usize {
        self.pattern.operands.len()
    }

    /// Latency in scheduling steps.
    pub fn cycles(&self) -> usize {
        1
    }

    pub fn operand_registers(&self, position: usize) -> &RegisterSet {
        &self.operand_registers[position]
    }
}

/// Complete description of a target machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineDescription {
    pub registers: Vec<Register>,
    pub instructions: Vec<Instruction>,
    pub memories: Vec<Memory>,
    pub execution_units: usize,
}

impl MachineDescription {
    pub fn new(execution_units: usize) -> Self {
        Self {
            execution_units,
            ..Self::default()
        }
    }

    pub fn add_register(&mut self, mnemonic: impl Into<String>, datatype: Datatype) -> RegisterId {
        self.registers.push(Register {
            mnemonic: mnemonic.into(),
            datatype,
        });
        RegisterId((self.registers.len() - 1) as u16)
    }

    /// Add `count` registers named `{prefix}0..{prefix}{count-1}` and return them as a set.
    pub fn add_register_class(&mut self, prefix: &str, count: usize, datatype: Datatype) -> RegisterSet {
        (0..count)
            .map(|i| self.add_register(format!("{prefix}{i}"), datatype))
            .collect()
    }

    pub fn add_instruction(&mut self, instruction: Instruction) -> InstructionId {
        self.instructions.push(instruction);
        InstructionId((self.instructions.len() - 1) as u32)
    }

    pub fn add_memory(&mut self, mnemonic: impl Into<String>, address: u64, size: u64) {
        self.memories.push(Memory {
            mnemonic: mnemonic.into(),
            address,
            size,
        });
    }

    pub fn register(&self, id: RegisterId) -> &Register {
        &self.registers[id.index()]
    }

    pub fn instruction(&self, id: InstructionId) -> &Instruction {
        &self.instructions[id.index()]
    }

    pub fn instruction_ids(&self) -> impl Iterator<Item = InstructionId> {
        (0..self.instructions.len() as u32).map(InstructionId)
    }

    /// Instructions that only move a value between registers.
    pub fn transfer_instructions(&self) -> Vec<InstructionId> {
        self.instruction_ids()
            .filter(|&id| self.instruction(id).pattern.is_transfer())
            .collect()
    }

    /// Human readable register set, e.g. `{GR0, GR1}`.
    pub fn format_registers(&self, set: &RegisterSet) -> String {
        let names: Vec<&str> = set
            .iter()
            .map(|r| self.register(r).mnemonic.as_str())
            .collect();
        format!("{{{}}}", names.join(", "))
    }

    /// Serialize the machine description to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::from)
    }

    /// Deserialize a machine description from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(Error::from)
    }
}
