//! Hand-built instruction graphs for the scheduling tests.

use evocg_core::{InstructionId, NodeId};
use evocg_ir::{
    Datatype, Instruction, InstructionGraph, InstructionPattern, MachineDescription, OperationKind,
    RegisterSet, Value,
};

fn binary_instruction(mnemonic: &str, op: OperationKind, unit: usize, regs: &RegisterSet) -> Instruction {
    let reg = || Value::register(Datatype::Int);
    Instruction::new(mnemonic, InstructionPattern::binary(op, reg(), reg(), reg()), unit)
        .with_result_registers(regs.clone())
        .with_operand_registers(vec![regs.clone(), regs.clone()])
}

/// `ADD`/`MUL` on both of two units over one integer register class.
pub(crate) fn two_unit_machine(registers: usize) -> (MachineDescription, RegisterSet) {
    let mut machine = MachineDescription::new(2);
    let regs = machine.add_register_class("R", registers, Datatype::Int);
    for unit in 0..2 {
        machine.add_instruction(binary_instruction("ADD $0, $1, $r", OperationKind::Add, unit, &regs));
        machine.add_instruction(binary_instruction("MUL $0, $1, $r", OperationKind::Mul, unit, &regs));
    }
    (machine, regs)
}

struct Builder {
    graph: InstructionGraph,
    regs: RegisterSet,
}

impl Builder {
    fn value(&mut self) -> NodeId {
        let v = self.graph.add_value(Value::register(Datatype::Int));
        self.graph.assignable.insert(v, self.regs.clone());
        v
    }

    fn instruction(&mut self, id: u32, operands: &[NodeId]) -> NodeId {
        let node = self.graph.add_instruction(InstructionId(id));
        for &operand in operands {
            self.graph.add_edge(operand, node);
        }
        let result = self.value();
        self.graph.add_edge(node, result);
        result
    }
}

/// `(a + b) * (c + d)` with the adds on different units.
pub(crate) fn sum_of_products() -> (MachineDescription, InstructionGraph) {
    let (machine, regs) = two_unit_machine(4);
    let mut b = Builder {
        graph: InstructionGraph::new(),
        regs,
    };
    let inputs: Vec<NodeId> = (0..4).map(|_| b.value()).collect();
    // ADD on unit 0 is instruction 0, ADD on unit 1 is 2, MUL on unit 0 is 1.
    let e = b.instruction(0, &inputs[0..2]);
    let f = b.instruction(2, &inputs[2..4]);
    let g = b.instruction(1, &[e, f]);
    b.graph.inputs = inputs;
    b.graph.outputs = vec![g];
    (machine, b.graph)
}

/// `acc1 = acc0 + x` with `acc0` and `acc1` sharing storage across iterations.
pub(crate) fn accumulator() -> (MachineDescription, InstructionGraph) {
    let (machine, regs) = two_unit_machine(2);
    let mut b = Builder {
        graph: InstructionGraph::new(),
        regs,
    };
    let acc0 = b.value();
    let x = b.value();
    let acc1 = b.instruction(0, &[acc0, x]);
    b.graph.inputs = vec![acc0, x];
    b.graph.outputs = vec![acc1];
    b.graph.cyclic.insert(acc0, acc1);
    b.graph.cyclic.insert(acc1, acc0);
    (machine, b.graph)
}

/// A chain of `n` dependent adds spread over both units, plus `n`
/// independent multiplies.
pub(crate) fn chain(n: usize) -> (MachineDescription, InstructionGraph) {
    let (machine, regs) = two_unit_machine(24);
    let mut b = Builder {
        graph: InstructionGraph::new(),
        regs,
    };
    let seed = b.value();
    let mut inputs = vec![seed];
    let mut acc = seed;
    let mut outputs = Vec::new();
    for k in 0..n {
        let x = b.value();
        let y = b.value();
        inputs.extend([x, y]);
        let add = if k % 2 == 0 { 0 } else { 2 };
        let mul = if k % 2 == 0 { 3 } else { 1 };
        acc = b.instruction(add, &[acc, x]);
        outputs.push(b.instruction(mul, &[x, y]));
    }
    outputs.push(acc);
    b.graph.inputs = inputs;
    b.graph.outputs = outputs;
    (machine, b.graph)
}
