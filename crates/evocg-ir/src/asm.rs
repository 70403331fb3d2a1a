//! Assembly text rendering of scheduled instruction graphs.

use evocg_core::NodeId;

use crate::instruction_graph::InstructionGraph;
use crate::machine::MachineDescription;
use crate::schedule::{InstructionSchedule, RegisterAssignment};
use crate::value::ValueKind;

/// Renders instruction mnemonics with operands substituted
pub struct AssemblyRenderer<'a> {
    machine: &'a MachineDescription,
    graph: &'a InstructionGraph,
    registers: &'a RegisterAssignment,
}

impl<'a> AssemblyRenderer<'a> {
    pub fn new(
        machine: &'a MachineDescription,
        graph: &'a InstructionGraph,
        registers: &'a RegisterAssignment,
    ) -> Self {
        Self {
            machine,
            graph,
            registers,
        }
    }

    /// Expand `$r` and `$<n>` in the instruction's mnemonic template.
    pub fn render_instruction(&self, node: NodeId) -> String {
        let template = &self.machine.instruction(self.graph.instruction(node)).mnemonic;
        let operands = self.graph.operand_values(node);
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'r') {
                chars.next();
                match self.graph.result_value(node) {
                    Some(v) => out.push_str(&self.render_value(v)),
                    None => out.push('?'),
                }
                continue;
            }
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            match digits.parse::<usize>().ok().and_then(|i| operands.get(i)) {
                Some(&v) => out.push_str(&self.render_value(v)),
                None => {
                    out.push('$');
                    out.push_str(&digits);
                }
            }
        }
        out
    }

    /// Operand text: register mnemonic, memory label or constant literal.
    pub fn render_value(&self, value: NodeId) -> String {
        let v = self.graph.value(value);
        match &v.kind {
            ValueKind::Register { .. } => self
                .registers
                .get(value)
                .map(|r| self.machine.register(r).mnemonic.clone())
                .unwrap_or_else(|| "?".to_string()),
            ValueKind::Memory { label } => label.clone().unwrap_or_else(|| "mem".to_string()),
            ValueKind::Constant { literal: Some(lit) } => lit.to_string(),
            ValueKind::Constant { literal: None } => "#".to_string(),
        }
    }

    /// One line per step, unit slots joined by ` || `.
    pub fn render_schedule(&self, schedule: &InstructionSchedule) -> Vec<String> {
        schedule
            .steps()
            .map(|row| {
                row.iter()
                    .map(|slot| match slot {
                        Some(node) => self.render_instruction(*node),
                        None => "NOP".to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" || ")
            })
            .collect()
    }
}
