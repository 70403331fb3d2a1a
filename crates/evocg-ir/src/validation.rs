//! Structural validation of machine descriptions and program graphs.

use evocg_core::{Error, NodeId, Result};

use crate::machine::{Instruction, MachineDescription};
use crate::operation::OpNode;
use crate::graph::Graph;
use crate::program::ProgramGraph;

/// Validate that a machine description is well-formed
pub fn validate_machine(machine: &MachineDescription) -> Result<()> {
    if machine.execution_units == 0 {
        return Err(Error::InvalidMachine("machine has no execution units".to_string()));
    }
    if machine.instructions.is_empty() {
        return Err(Error::InvalidMachine("machine has no instructions".to_string()));
    }

    for (idx, instr) in machine.instructions.iter().enumerate() {
        validate_instruction(machine, instr, idx)?;
    }

    Ok(())
}

fn validate_instruction(machine: &MachineDescription, instr: &Instruction, idx: usize) -> Result<()> {
    let fail = |msg: String| Err(Error::InvalidMachine(format!("instruction {idx} ({}): {msg}", instr.mnemonic)));

    if instr.execution_unit >= machine.execution_units {
        return fail(format!("execution unit {} out of range", instr.execution_unit));
    }

    let pattern = &instr.pattern;
    if !pattern.graph.contains(pattern.result) || !pattern.graph.is_value(pattern.result) {
        return fail("pattern result is not a value node".to_string());
    }
    if pattern.root_operation().is_none() {
        return fail("pattern result has no producing operation".to_string());
    }
    if let Err(msg) = check_operations(&pattern.graph) {
        return fail(format!("pattern {msg}"));
    }

    for (position, &operand) in pattern.operands.iter().enumerate() {
        if !pattern.graph.contains(operand)
            || !pattern.graph.is_value(operand)
            || !pattern.graph.is_input_value(operand)
        {
            return fail(format!("operand {position} is not a pattern leaf value"));
        }
    }
    let leaves = pattern
        .graph
        .value_nodes()
        .filter(|&v| pattern.graph.is_input_value(v))
        .count();
    if leaves != pattern.operands.len() {
        return fail(format!(
            "pattern has {leaves} leaves but lists {} operands",
            pattern.operands.len()
        ));
    }

    if instr.operand_registers.len() != pattern.operands.len() {
        return fail(format!(
            "{} operand register sets for {} operands",
            instr.operand_registers.len(),
            pattern.operands.len()
        ));
    }
    for (position, (&operand, set)) in pattern.operands.iter().zip(&instr.operand_registers).enumerate() {
        if pattern.graph.value(operand).is_register() && set.is_empty() {
            return fail(format!("register operand {position} has no allowed registers"));
        }
    }
    if pattern.graph.value(pattern.result).is_register() && instr.result_registers.is_empty() {
        return fail("register result has no allowed registers".to_string());
    }
    let all_sets = instr.operand_registers.iter().chain(std::iter::once(&instr.result_registers));
    for set in all_sets {
        if let Some(r) = set.iter().find(|r| r.index() >= machine.registers.len()) {
            return fail(format!("unknown register {r}"));
        }
    }

    for position in template_operands(&instr.mnemonic) {
        if position >= pattern.operands.len() {
            return fail(format!("template refers to missing operand ${position}"));
        }
    }

    Ok(())
}

/// Operand indices referenced by a mnemonic template.
pub(crate) fn template_operands(template: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut chars = template.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '$' {
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while let Some(&(j, d)) = chars.peek() {
            if d.is_ascii_digit() {
                end = j + d.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        if let Ok(n) = template[start..end].parse() {
            positions.push(n);
        }
    }
    positions
}

/// Every operation has its arity of value operands and exactly one value result.
fn check_operations(graph: &Graph<OpNode>) -> std::result::Result<(), String> {
    for op in graph.operation_nodes() {
        let kind = graph.operation(op);
        let operands = graph.operand_values(op);
        if operands.len() != kind.num_operands() {
            return Err(format!(
                "operation {op} ({kind}) has {} operands, expected {}",
                operands.len(),
                kind.num_operands()
            ));
        }
        if operands.iter().any(|&v| !graph.is_value(v)) {
            return Err(format!("operation {op} ({kind}) reads a non-value node"));
        }
        let results = graph.outputs(op);
        if results.len() != 1 || !graph.is_value(results[0]) {
            return Err(format!("operation {op} ({kind}) must write exactly one value"));
        }
    }
    for v in graph.value_nodes() {
        if graph.inputs(v).len() > 1 {
            return Err(format!("value {v} has several producers"));
        }
    }
    Ok(())
}

/// Validate that a program graph is well-formed and fits the machine
pub fn validate_program(program: &ProgramGraph, machine: &MachineDescription) -> Result<()> {
    let graph = &program.graph;
    check_operations(graph).map_err(Error::InvalidProgram)?;

    if program.outputs.is_empty() {
        return Err(Error::InvalidProgram("program has no output values".to_string()));
    }
    let is_value = |v: NodeId| graph.contains(v) && graph.is_value(v);
    for &v in program.inputs.iter().chain(&program.outputs) {
        if !is_value(v) {
            return Err(Error::InvalidProgram(format!("{v} listed as input/output is not a value")));
        }
    }
    for (&v, &r) in &program.preassigned {
        if !is_value(v) || !graph.value(v).is_register() {
            return Err(Error::InvalidProgram(format!("pre-assigned {v} is not a register value")));
        }
        if r.index() >= machine.registers.len() {
            return Err(Error::InvalidProgram(format!("pre-assigned {v} uses unknown register {r}")));
        }
    }
    for (&a, &b) in &program.cyclic {
        if !is_value(a) || !is_value(b) {
            return Err(Error::InvalidProgram(format!("cyclic dependency {a} → {b} between non-values")));
        }
    }

    check_acyclic(graph).map_err(Error::InvalidProgram)
}

fn check_acyclic(graph: &Graph<OpNode>) -> std::result::Result<(), String> {
    let mut pending: Vec<usize> = graph.node_ids().map(|id| graph.inputs(id).len()).collect();
    let mut ready: Vec<NodeId> = graph.node_ids().filter(|&id| pending[id.index()] == 0).collect();
    let mut visited = 0;
    while let Some(id) = ready.pop() {
        visited += 1;
        for &next in graph.outputs(id) {
            pending[next.index()] -= 1;
            if pending[next.index()] == 0 {
                ready.push(next);
            }
        }
    }
    if visited == graph.len() {
        Ok(())
    } else {
        Err("program graph contains a cycle".to_string())
    }
}
