//! Structural repair of draft workflows.
//!
//! Repair only fills gaps. It never removes nodes and never invents
//! parameter values; the single destructive rule drops connection
//! references that cannot be resolved. Every rule is a no-op on its own
//! output, so repairing a repaired workflow applies no fixes.

use crate::definition::{Meta, Settings, Workflow};
use crate::edge::Connections;
use crate::node::{Parameters, Position};
use crate::registry::NodeTypeRegistry;
use flowsmith_core::NodeId;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Name given to drafts that arrive without one.
pub const UNTITLED_WORKFLOW: &str = "Untitled workflow";

/// Deterministic canvas position for the node at `index`.
#[must_use]
pub fn layout_position(index: usize) -> Position {
    Position::new(250.0 + 220.0 * index as f64, 300.0)
}

/// A repaired workflow and the fixes that were applied to it.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub workflow: Workflow,
    pub applied_fixes: Vec<String>,
}

/// Fills structural gaps in draft workflows.
#[derive(Debug, Clone)]
pub struct AutoRepairEngine {
    registry: Arc<NodeTypeRegistry>,
}

impl AutoRepairEngine {
    #[must_use]
    pub fn new(registry: Arc<NodeTypeRegistry>) -> Self {
        Self { registry }
    }

    /// Repairs a draft, returning it together with the applied fixes.
    #[must_use]
    pub fn repair(&self, mut workflow: Workflow) -> RepairOutcome {
        let applied_fixes = self.repair_in_place(&mut workflow);
        RepairOutcome {
            workflow,
            applied_fixes,
        }
    }

    /// Repairs a draft in place and returns one description per fix.
    #[instrument(skip_all, fields(nodes = workflow.node_count()))]
    pub fn repair_in_place(&self, workflow: &mut Workflow) -> Vec<String> {
        let mut fixes = Vec::new();

        self.repair_document(workflow, &mut fixes);
        self.repair_nodes(workflow, &mut fixes);
        self.repair_connections(workflow, &mut fixes);

        debug!(fixes = fixes.len(), "draft repaired");
        fixes
    }

    fn repair_document(&self, workflow: &mut Workflow, fixes: &mut Vec<String>) {
        if workflow.name.is_none() {
            workflow.name = Some(UNTITLED_WORKFLOW.to_string());
            fixes.push(format!("set workflow name to '{UNTITLED_WORKFLOW}'"));
        }
        if workflow.active != Some(false) {
            workflow.active = Some(false);
            fixes.push("set active to false".to_string());
        }
        if workflow.nodes.is_none() {
            workflow.nodes = Some(Vec::new());
            fixes.push("set nodes to an empty list".to_string());
        }
        if workflow.connections.is_none() {
            workflow.connections = Some(Connections::new());
            fixes.push("set connections to an empty map".to_string());
        }
        if workflow.settings.is_none() {
            workflow.settings = Some(Settings::default());
            fixes.push("set settings to defaults".to_string());
        }
        if workflow.tags.is_none() {
            workflow.tags = Some(BTreeSet::new());
            fixes.push("set tags to an empty set".to_string());
        }
        if workflow.meta.is_none() {
            workflow.meta = Some(Meta::default());
            fixes.push("set meta to an empty record".to_string());
        }
    }

    fn repair_nodes(&self, workflow: &mut Workflow, fixes: &mut Vec<String>) {
        let Some(nodes) = workflow.nodes.as_mut() else {
            return;
        };

        let mut seen_ids = HashSet::new();
        for (index, node) in nodes.iter_mut().enumerate() {
            let label = node.label(index);

            let id_is_fresh = node
                .id
                .as_ref()
                .is_some_and(|id| seen_ids.insert(id.clone()));
            if !id_is_fresh {
                let id = NodeId::new().to_string();
                fixes.push(match &node.id {
                    Some(old) => format!("node '{label}': replaced duplicate id '{old}'"),
                    None => format!("node '{label}': assigned id"),
                });
                seen_ids.insert(id.clone());
                node.id = Some(id);
            }

            if !node.position.is_some_and(|p| p.is_well_formed()) {
                let position = layout_position(index);
                fixes.push(format!(
                    "node '{label}': set position to [{}, {}]",
                    position.x, position.y
                ));
                node.position = Some(position);
            }

            let spec = node
                .type_id()
                .and_then(|type_id| self.registry.lookup(type_id).ok());
            match (node.type_version, spec) {
                (None, spec) => {
                    let version = spec.map_or(1, |spec| spec.current_version);
                    fixes.push(format!("node '{label}': set typeVersion to {version}"));
                    node.type_version = Some(version);
                }
                (Some(version), Some(spec)) if !spec.supports_version(version) => {
                    fixes.push(format!(
                        "node '{label}': replaced unsupported typeVersion {version} with {}",
                        spec.current_version
                    ));
                    node.type_version = Some(spec.current_version);
                }
                _ => {}
            }

            if node.parameters.is_none() {
                node.parameters = Some(Parameters::new());
                fixes.push(format!("node '{label}': set parameters to an empty map"));
            }
        }
    }

    fn repair_connections(&self, workflow: &mut Workflow, fixes: &mut Vec<String>) {
        let names: HashSet<String> = workflow
            .node_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let Some(connections) = workflow.connections.as_mut() else {
            return;
        };

        let unknown_sources: Vec<String> = connections
            .sources()
            .filter(|source| !names.contains(*source))
            .map(str::to_string)
            .collect();
        for source in unknown_sources {
            connections.remove_source(&source);
            fixes.push(format!("dropped connections from unknown node '{source}'"));
        }

        let dropped = connections.retain_targets(|_, target| names.contains(&target.node));
        fixes.extend(
            dropped
                .into_iter()
                .map(|edge| format!("dropped connection {edge}: target node does not exist")),
        );
    }
}
