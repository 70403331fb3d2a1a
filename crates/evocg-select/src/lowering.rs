//! Lowering of a selection to an instruction graph.

use std::collections::BTreeMap;

use evocg_core::{Error, NodeId, RegisterId, Result};
use evocg_ir::{CoveringId, InstructionGraph};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::context::SelectionContext;
use crate::registers::{insert_cyclic_transfers, resolve_assignable_registers};

struct Lowering<'a> {
    context: &'a SelectionContext,
    selection: &'a [Option<CoveringId>],
    graph: InstructionGraph,
}

impl Lowering<'_> {
    /// Covering selected to produce `value`, if one is rooted there.
    fn producer_of(&self, value: NodeId) -> Option<CoveringId> {
        let op = self.context.program.graph.producing_operation(value)?;
        let id = self.selection.get(op.index()).copied().flatten()?;
        (self.context.covering(id).result == value).then_some(id)
    }

    /// Clone `value` into the instruction graph together with the
    /// instruction producing it and, recursively, that instruction's operands.
    fn materialize(&mut self, value: NodeId) -> Result<NodeId> {
        if let Some(node) = self.graph.lookup(value) {
            return Ok(node);
        }
        let context = self.context;
        let program = &context.program;
        let node = self.graph.add_value(program.value(value).clone());
        self.graph.value_map.insert(value, node);

        if program.is_input_value(value) {
            return Ok(node);
        }
        let id = self.producer_of(value).ok_or_else(|| {
            Error::InvalidProgram(format!("no selected covering produces value {value}"))
        })?;
        let covering = context.covering(id);
        let instruction = self.graph.add_instruction(covering.instruction);
        self.graph.add_edge(instruction, node);
        for &operand in &covering.operand_values {
            let operand = self.materialize(operand)?;
            self.graph.add_edge(operand, instruction);
        }
        Ok(node)
    }
}

/// Build the instruction graph of a selection and reconcile its register
/// classes.
///
/// Materialization starts from the context's root values. Roots absorbed
/// into another covering are skipped. Inputs, outputs, cyclic pairs and
/// pre-assigned registers are carried over for materialized values only.
pub fn build_instruction_graph(
    context: &SelectionContext,
    selection: &[Option<CoveringId>],
    rng: &mut ChaCha8Rng,
) -> Result<InstructionGraph> {
    let mut lowering = Lowering {
        context,
        selection,
        graph: InstructionGraph::new(),
    };
    let program = &context.program;
    for &root in &context.roots {
        if program.is_input_value(root) || lowering.producer_of(root).is_some() {
            lowering.materialize(root)?;
        }
    }

    let mut graph = lowering.graph;
    graph.inputs = program.inputs.iter().filter_map(|&v| graph.lookup(v)).collect();
    graph.outputs = program.outputs.iter().filter_map(|&v| graph.lookup(v)).collect();
    graph.cyclic = program
        .cyclic
        .iter()
        .filter_map(|(&a, &b)| Some((graph.lookup(a)?, graph.lookup(b)?)))
        .collect();
    let pinned: BTreeMap<NodeId, RegisterId> = program
        .preassigned
        .iter()
        .filter_map(|(&v, &r)| Some((graph.lookup(v)?, r)))
        .collect();

    let machine = &context.machine;
    let transfers = resolve_assignable_registers(&mut graph, machine, &pinned, rng)?;
    let cyclic_transfers = insert_cyclic_transfers(&mut graph, machine, rng)?;
    trace!(
        event = "selection_lowered",
        instructions = graph.num_instructions(),
        transfers,
        cyclic_transfers,
    );
    Ok(graph)
}
