//! Connection graph of a workflow using petgraph.
//!
//! The document keeps connections as a name-keyed map; reachability and
//! inbound counts are easier to answer on a real directed graph, so the
//! validator builds one of these per check. Nodes are node names, edges
//! are resolved target references. References to names that do not exist
//! are left out here and reported by the connection pass instead.

use crate::definition::Workflow;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};

/// Directed view over a workflow's resolvable connections.
#[derive(Debug, Clone)]
pub struct ConnectionGraph<'a> {
    graph: DiGraph<&'a str, ()>,
    /// Map from node name to petgraph's NodeIndex. The first node with a
    /// given name wins; duplicates are a shape error.
    node_index_map: HashMap<&'a str, NodeIndex>,
}

impl<'a> ConnectionGraph<'a> {
    /// Builds the graph of named nodes and resolvable edges.
    #[must_use]
    pub fn build(workflow: &'a Workflow) -> Self {
        let mut graph = DiGraph::new();
        let mut node_index_map = HashMap::new();

        for name in workflow.nodes().iter().filter_map(|node| node.name()) {
            node_index_map
                .entry(name)
                .or_insert_with(|| graph.add_node(name));
        }

        if let Some(connections) = &workflow.connections {
            for edge in connections.edges() {
                let (Some(&source), Some(&target)) = (
                    node_index_map.get(edge.source),
                    node_index_map.get(edge.target.node.as_str()),
                ) else {
                    continue;
                };
                graph.add_edge(source, target, ());
            }
        }

        Self {
            graph,
            node_index_map,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the number of resolved references pointing at `name`.
    #[must_use]
    pub fn inbound_count(&self, name: &str) -> usize {
        self.node_index_map.get(name).map_or(0, |&index| {
            self.graph
                .edges_directed(index, Direction::Incoming)
                .count()
        })
    }

    /// Returns every node name reachable from any of `roots`, the roots
    /// themselves included. Unknown roots are ignored.
    pub fn reachable_from<'r>(&self, roots: impl IntoIterator<Item = &'r str>) -> HashSet<&'a str> {
        let mut reached = HashSet::new();
        let mut dfs = Dfs::empty(&self.graph);
        for root in roots {
            let Some(&start) = self.node_index_map.get(root) else {
                continue;
            };
            dfs.move_to(start);
            while let Some(idx) = dfs.next(&self.graph) {
                reached.insert(self.graph[idx]);
            }
        }
        reached
    }
}
