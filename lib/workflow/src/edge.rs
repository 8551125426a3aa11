//! Connections between nodes.
//!
//! Connections are keyed by source node *name* and fan out through named
//! output slots (conventionally `main`). Each slot holds parallel branches,
//! and each branch an ordered list of target references:
//!
//! ```json
//! { "Fetch": { "main": [[{ "node": "Notify", "type": "main", "index": 0 }]] } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The conventional output/input slot name.
pub const MAIN_SLOT: &str = "main";

fn default_slot() -> String {
    MAIN_SLOT.to_string()
}

/// One end of a connection: the target node and the input it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionTarget {
    /// Name of the target node.
    pub node: String,
    /// Name of the input slot on the target node.
    #[serde(rename = "type", default = "default_slot")]
    pub input_slot: String,
    /// Input index on the target node (merge nodes have several).
    #[serde(default)]
    pub index: u32,
}

impl ConnectionTarget {
    /// Targets input `index` of the `main` slot.
    #[must_use]
    pub fn main(node: impl Into<String>, index: u32) -> Self {
        Self {
            node: node.into(),
            input_slot: default_slot(),
            index,
        }
    }
}

/// Output slots of one source node: slot name → branches → targets.
pub type NodeOutputs = BTreeMap<String, Vec<Vec<ConnectionTarget>>>;

/// A fully-qualified reference to one target inside [`Connections`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRef<'a> {
    pub source: &'a str,
    pub slot: &'a str,
    pub branch: usize,
    pub target: &'a ConnectionTarget,
}

impl fmt::Display for EdgeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' {}[{}] -> '{}'",
            self.source, self.slot, self.branch, self.target.node
        )
    }
}

/// The connection multigraph of a workflow, keyed by source node name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Connections(BTreeMap<String, NodeOutputs>);

impl Connections {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects output branch `branch` of `source`'s main slot to input
    /// `input_index` of `target`. Missing intermediate branches are created
    /// empty.
    pub fn connect(
        &mut self,
        source: impl Into<String>,
        branch: usize,
        target: impl Into<String>,
        input_index: u32,
    ) {
        let branches = self
            .0
            .entry(source.into())
            .or_default()
            .entry(default_slot())
            .or_default();
        if branches.len() <= branch {
            branches.resize_with(branch + 1, Vec::new);
        }
        branches[branch].push(ConnectionTarget::main(target, input_index));
    }

    /// Returns the names of all source nodes.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates every target reference in deterministic order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> {
        self.0.iter().flat_map(|(source, outputs)| {
            outputs.iter().flat_map(move |(slot, branches)| {
                branches.iter().enumerate().flat_map(move |(branch, targets)| {
                    targets.iter().map(move |target| EdgeRef {
                        source: source.as_str(),
                        slot: slot.as_str(),
                        branch,
                        target,
                    })
                })
            })
        })
    }

    /// Returns the targets reached from `source` through its `main` slot.
    pub fn targets_of<'a>(&'a self, source: &str) -> impl Iterator<Item = &'a ConnectionTarget> {
        self.0
            .get(source)
            .and_then(|outputs| outputs.get(MAIN_SLOT))
            .into_iter()
            .flatten()
            .flatten()
    }

    /// Removes the record of a source node, returning whether it existed.
    pub fn remove_source(&mut self, source: &str) -> bool {
        self.0.remove(source).is_some()
    }

    /// Keeps only the target references for which `keep` returns true.
    ///
    /// Returns a description of every removed reference. Branch and slot
    /// structure is left in place so sibling targets keep their positions.
    pub fn retain_targets<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&str, &ConnectionTarget) -> bool,
    {
        let mut removed = Vec::new();
        for (source, outputs) in &mut self.0 {
            for (slot, branches) in outputs.iter_mut() {
                for (branch, targets) in branches.iter_mut().enumerate() {
                    targets.retain(|target| {
                        let retained = keep(source.as_str(), target);
                        if !retained {
                            removed.push(format!(
                                "'{source}' {slot}[{branch}] -> '{}'",
                                target.node
                            ));
                        }
                        retained
                    });
                }
            }
        }
        removed
    }

    /// Returns the number of target references.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
