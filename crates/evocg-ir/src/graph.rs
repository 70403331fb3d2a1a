//! Arena-backed directed graph with ordered edge lists.
//!
//! Every node keeps its incoming and outgoing neighbours in insertion order.
//! The order of incoming edges is the operand order of an operation, and the
//! first outgoing edge of an operation is its result.

use evocg_core::NodeId;
use serde::{Deserialize, Serialize};

/// A node record: payload plus ordered adjacency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<N> {
    pub data: N,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
}

impl<N> Node<N> {
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }
}

/// Directed graph whose nodes are addressed by stable [`NodeId`] indices.
///
/// Nodes are never removed, so an id stays valid for the lifetime of the
/// graph. Cloning a graph keeps every index, which makes the old→new node
/// table of a copy the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph<N> {
    nodes: Vec<Node<N>>,
}

impl<N> Graph<N> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn add_node(&mut self, data: N) -> NodeId {
        self.nodes.push(Node {
            data,
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        NodeId::from(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::from)
    }

    pub fn node(&self, id: NodeId) -> &Node<N> {
        &self.nodes[id.index()]
    }

    pub fn data(&self, id: NodeId) -> &N {
        &self.nodes[id.index()].data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut N {
        &mut self.nodes[id.index()].data
    }

    pub fn inputs(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].inputs
    }

    pub fn outputs(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].outputs
    }

    /// Append an edge `from → to` to both adjacency lists.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from.index()].outputs.push(to);
        self.nodes[to.index()].inputs.push(from);
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.nodes[from.index()].outputs.contains(&to)
    }

    /// Remove the first `from → to` edge. Returns false if none existed.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        let outputs = &mut self.nodes[from.index()].outputs;
        let Some(out_pos) = outputs.iter().position(|&n| n == to) else {
            return false;
        };
        outputs.remove(out_pos);

        let inputs = &mut self.nodes[to.index()].inputs;
        if let Some(in_pos) = inputs.iter().position(|&n| n == from) {
            inputs.remove(in_pos);
        }
        true
    }

    /// Reroute the first `old_start → end` edge to start at `new_start`,
    /// keeping its position in `end`'s incoming list.
    pub fn replace_edge_start(&mut self, old_start: NodeId, end: NodeId, new_start: NodeId) {
        if let Some(position) = self.inputs(end).iter().position(|&n| n == old_start) {
            self.replace_input(end, position, new_start);
        }
    }

    /// Reroute incoming edge number `position` of `end` to start at
    /// `new_start`. Operand order is preserved.
    pub fn replace_input(&mut self, end: NodeId, position: usize, new_start: NodeId) {
        let old_start = self.nodes[end.index()].inputs[position];
        let outputs = &mut self.nodes[old_start.index()].outputs;
        if let Some(out_pos) = outputs.iter().position(|&n| n == end) {
            outputs.remove(out_pos);
        }
        self.nodes[end.index()].inputs[position] = new_start;
        self.nodes[new_start.index()].outputs.push(end);
    }

    /// Copy the graph node for node, converting every payload. Indices are
    /// preserved, so the returned graph shares this graph's ids.
    pub fn map<M>(&self, mut f: impl FnMut(NodeId, &N) -> M) -> Graph<M> {
        Graph {
            nodes: self
                .nodes
                .iter()
                .enumerate()
                .map(|(i, node)| Node {
                    data: f(NodeId::from(i), &node.data),
                    inputs: node.inputs.clone(),
                    outputs: node.outputs.clone(),
                })
                .collect(),
        }
    }
}

impl<N> Default for Graph<N> {
    fn default() -> Self {
        Self::new()
    }
}
