//! Register-class resolution and transfer insertion on instruction graphs.

use std::collections::{BTreeMap, VecDeque};

use evocg_core::{Error, InstructionId, NodeId, RegisterId, Result};
use evocg_ir::{InstructionGraph, MachineDescription, RegisterSet};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// Pick a transfer moving a value out of `from` into `to`.
///
/// Transfers reaching `to` are preferred; otherwise any transfer able to
/// read `from` is taken and the mismatch is resolved further downstream.
fn choose_transfer(
    machine: &MachineDescription,
    transfers: &[InstructionId],
    from: &RegisterSet,
    to: &RegisterSet,
    rng: &mut ChaCha8Rng,
) -> Result<InstructionId> {
    let reads = |id: &&InstructionId| machine.instruction(**id).operand_registers(0).intersects(from);
    let exact: Vec<InstructionId> = transfers
        .iter()
        .filter(reads)
        .filter(|id| machine.instruction(**id).result_registers.intersects(to))
        .copied()
        .collect();
    let options = if exact.is_empty() {
        transfers.iter().filter(reads).copied().collect()
    } else {
        exact
    };
    options.choose(rng).copied().ok_or_else(|| Error::NoTransferInstruction {
        from: machine.format_registers(from),
        to: machine.format_registers(to),
    })
}

/// Every register of the machine holding `value`'s datatype.
fn registers_for(machine: &MachineDescription, graph: &InstructionGraph, value: NodeId) -> RegisterSet {
    let datatype = graph.value(value).datatype;
    machine
        .registers
        .iter()
        .enumerate()
        .filter(|(_, r)| r.datatype == datatype)
        .map(|(i, _)| RegisterId(i as u16))
        .collect()
}

/// Registers `value` may occupy before looking at its consumers.
fn initial_registers(machine: &MachineDescription, graph: &InstructionGraph, value: NodeId) -> RegisterSet {
    if let Some(producer) = graph.producing_instruction(value) {
        return machine.instruction(graph.instruction(producer)).result_registers.clone();
    }
    graph
        .consumers(value)
        .first()
        .and_then(|&consumer| {
            let position = graph.operand_values(consumer).iter().position(|&v| v == value)?;
            Some(
                machine
                    .instruction(graph.instruction(consumer))
                    .operand_registers(position)
                    .clone(),
            )
        })
        .unwrap_or_else(|| registers_for(machine, graph, value))
}

/// Every `(consumer, operand position)` reading `value`.
fn uses(graph: &InstructionGraph, value: NodeId) -> Vec<(NodeId, usize)> {
    let mut uses: Vec<(NodeId, usize)> = Vec::new();
    for &consumer in graph.consumers(value) {
        if uses.iter().any(|&(c, _)| c == consumer) {
            continue;
        }
        for (position, &operand) in graph.operand_values(consumer).iter().enumerate() {
            if operand == value {
                uses.push((consumer, position));
            }
        }
    }
    uses
}

/// Compute the assignable registers of every register value.
///
/// A value starts from its producer's result registers, or for inputs from
/// its first reader's operand registers, and is narrowed by every reader.
/// When a reader shares no register with the value, a transfer is spliced
/// in front of that reader and both the value and the transfer's result
/// are revisited. Values in `pinned` are fixed to their register.
///
/// Returns the number of transfers inserted.
pub fn resolve_assignable_registers(
    graph: &mut InstructionGraph,
    machine: &MachineDescription,
    pinned: &BTreeMap<NodeId, RegisterId>,
    rng: &mut ChaCha8Rng,
) -> Result<usize> {
    let transfers = machine.transfer_instructions();
    graph.assignable.clear();
    let mut queue: VecDeque<NodeId> = graph.register_values().collect();
    let limit = queue.len() * (transfers.len() + 1);
    let mut inserted = 0;

    while let Some(value) = queue.pop_front() {
        if let Some(&register) = pinned.get(&value) {
            graph.assignable.insert(value, RegisterSet::singleton(register));
            continue;
        }

        let mut registers = initial_registers(machine, graph, value);
        for (consumer, position) in uses(graph, value) {
            let required = machine
                .instruction(graph.instruction(consumer))
                .operand_registers(position)
                .clone();
            let common = registers.intersection(&required);
            if !common.is_empty() {
                registers = common;
                continue;
            }

            if inserted >= limit {
                return Err(Error::TransferLimitExceeded(inserted));
            }
            let transfer = choose_transfer(machine, &transfers, &registers, &required, rng)?;
            let moved = graph.add_value(graph.value(value).fresh_like());
            let node = graph.add_instruction(transfer);
            graph.graph.replace_input(consumer, position, moved);
            graph.add_edge(value, node);
            graph.add_edge(node, moved);
            inserted += 1;
            trace!(
                event = "transfer_inserted",
                value = %value,
                consumer = %consumer,
                transfer = %machine.instruction(transfer).mnemonic,
            );

            queue.push_back(value);
            queue.push_back(moved);
        }
        graph.assignable.insert(value, registers);
    }
    Ok(inserted)
}

/// Reconcile loop-carried pairs whose register sets are disjoint.
///
/// The value leaving the iteration is rerouted through a transfer so that
/// it lands in registers the entering value may occupy. Returns the number
/// of transfers inserted.
pub fn insert_cyclic_transfers(
    graph: &mut InstructionGraph,
    machine: &MachineDescription,
    rng: &mut ChaCha8Rng,
) -> Result<usize> {
    let transfers = machine.transfer_instructions();
    let pairs: Vec<(NodeId, NodeId)> = graph
        .cyclic
        .iter()
        .filter(|&(&entering, _)| graph.is_input_value(entering))
        .map(|(&entering, &leaving)| (entering, leaving))
        .collect();

    let mut inserted = 0;
    for (entering, leaving) in pairs {
        let (Some(in_set), Some(out_set)) = (
            graph.assignable.get(&entering).cloned(),
            graph.assignable.get(&leaving).cloned(),
        ) else {
            continue;
        };
        if in_set.intersects(&out_set) {
            continue;
        }

        let transfer = choose_transfer(machine, &transfers, &out_set, &in_set, rng)?;
        let instruction = machine.instruction(transfer);
        let moved = graph.add_value(graph.value(leaving).fresh_like());
        if let Some(producer) = graph.producing_instruction(leaving) {
            graph.graph.remove_edge(producer, leaving);
            graph.add_edge(producer, moved);
        }
        let node = graph.add_instruction(transfer);
        graph.add_edge(moved, node);
        graph.add_edge(node, leaving);

        let landed = in_set.intersection(&instruction.result_registers);
        let read = out_set.intersection(instruction.operand_registers(0));
        graph.assignable.insert(leaving, if landed.is_empty() { in_set } else { landed });
        graph.assignable.insert(moved, read);
        inserted += 1;
        trace!(
            event = "cyclic_transfer_inserted",
            entering = %entering,
            leaving = %leaving,
            transfer = %instruction.mnemonic,
        );
    }
    Ok(inserted)
}
