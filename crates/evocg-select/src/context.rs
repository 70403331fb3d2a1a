//! Read-only state shared by every genome of one selection run.

use std::collections::BTreeSet;

use evocg_core::{NodeId, Result};
use evocg_ir::{
    validate_machine, validate_program, Covering, CoveringId, CoveringTable, MachineDescription,
    ProgramGraph,
};
use tracing::debug;

/// Program, target and the coverings of one code generation problem
#[derive(Debug, Clone)]
pub struct SelectionContext {
    pub(crate) program: ProgramGraph,
    pub(crate) machine: MachineDescription,
    pub(crate) coverings: CoveringTable,
    /// Operations with producers before consumers
    pub(crate) operations: Vec<NodeId>,
    /// Values every selection must produce: sinks, then declared outputs
    pub(crate) roots: Vec<NodeId>,
}

impl SelectionContext {
    /// Validate the inputs and build their covering table.
    pub fn new(machine: MachineDescription, program: ProgramGraph) -> Result<Self> {
        validate_machine(&machine)?;
        validate_program(&program, &machine)?;
        let coverings = CoveringTable::build(&program, &machine)?;

        let operations = topological_operations(&program);
        let mut roots: Vec<NodeId> = program
            .graph
            .value_nodes()
            .filter(|&v| program.graph.outputs(v).is_empty())
            .collect();
        for &v in &program.outputs {
            if !roots.contains(&v) {
                roots.push(v);
            }
        }

        debug!(
            event = "selection_context_ready",
            operations = operations.len(),
            coverings = coverings.len(),
            roots = roots.len(),
        );
        Ok(Self {
            program,
            machine,
            coverings,
            operations,
            roots,
        })
    }

    pub fn program(&self) -> &ProgramGraph {
        &self.program
    }

    pub fn machine(&self) -> &MachineDescription {
        &self.machine
    }

    pub fn coverings(&self) -> &CoveringTable {
        &self.coverings
    }

    pub fn covering(&self, id: CoveringId) -> &Covering {
        self.coverings.covering(id)
    }

    pub fn operations(&self) -> &[NodeId] {
        &self.operations
    }

    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Operations reached from `root` by following operands down at most
    /// `depth` levels, `root` included.
    pub fn operations_below(&self, root: NodeId, depth: usize) -> BTreeSet<NodeId> {
        let graph = &self.program.graph;
        let mut region = BTreeSet::new();
        let mut frontier = vec![root];
        for _ in 0..depth {
            let mut next = Vec::new();
            for op in frontier {
                if !region.insert(op) {
                    continue;
                }
                next.extend(
                    graph
                        .operand_values(op)
                        .iter()
                        .filter_map(|&v| graph.producing_operation(v)),
                );
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        region
    }
}

/// Kahn's algorithm over the operation nodes of an acyclic program.
fn topological_operations(program: &ProgramGraph) -> Vec<NodeId> {
    let graph = &program.graph;
    let mut pending: Vec<usize> = graph.node_ids().map(|id| graph.inputs(id).len()).collect();
    let mut ready: Vec<NodeId> = graph
        .node_ids()
        .filter(|&id| pending[id.index()] == 0)
        .collect();
    ready.reverse();

    let mut order = Vec::new();
    while let Some(id) = ready.pop() {
        if graph.is_operation(id) {
            order.push(id);
        }
        for &next in graph.outputs(id) {
            pending[next.index()] -= 1;
            if pending[next.index()] == 0 {
                ready.push(next);
            }
        }
    }
    order
}
