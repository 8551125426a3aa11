//! Workflow document types.
//!
//! A workflow document is what the engine produces and consumes:
//!
//! ```json
//! { "name": "...", "nodes": [...], "connections": {...}, "active": false,
//!   "settings": {...}, "tags": [...], "meta": {...} }
//! ```
//!
//! Fields are optional at the type level so that drafts from untrusted
//! sources can be represented, repaired and reported on.

use crate::edge::Connections;
use crate::error::DocumentError;
use crate::lenient;
use crate::node::Node;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeSet, HashSet};

fn default_execution_order() -> String {
    "v1".to_string()
}

fn default_save_manual_executions() -> bool {
    true
}

fn default_caller_policy() -> String {
    "workflowsFromSameOwner".to_string()
}

/// Execution policy record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_execution_order")]
    pub execution_order: String,
    #[serde(default = "default_save_manual_executions")]
    pub save_manual_executions: bool,
    #[serde(default = "default_caller_policy")]
    pub caller_policy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Keys this engine does not interpret, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            execution_order: default_execution_order(),
            save_manual_executions: default_save_manual_executions(),
            caller_policy: default_caller_policy(),
            timezone: None,
            extra: Map::new(),
        }
    }
}

/// Where the returned workflow came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationSource {
    /// Parsed from the AI collaborator's response.
    Ai,
    /// Composed by the template generator.
    Template,
    /// The minimal single-trigger fallback.
    Minimal,
}

/// Provenance record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// The originating request, as received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<GenerationSource>,
    /// Present (and `true`) only on minimal fallback results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_fixes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Meta {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded == Some(true)
    }
}

/// A workflow document, possibly still a draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Connections>,
    #[serde(
        default,
        deserialize_with = "lenient::boolean",
        skip_serializing_if = "Option::is_none"
    )]
    pub active: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub settings: Option<Settings>,
    #[serde(
        default,
        deserialize_with = "lenient::tags",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<BTreeSet<String>>,
    #[serde(
        default,
        deserialize_with = "lenient::or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub meta: Option<Meta>,
}

impl Workflow {
    /// Creates a complete, empty, inactive workflow.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            nodes: Some(Vec::new()),
            connections: Some(Connections::new()),
            active: Some(false),
            settings: Some(Settings::default()),
            tags: Some(BTreeSet::new()),
            meta: Some(Meta::default()),
        }
    }

    /// Parses a workflow document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or its top level cannot be
    /// read as a workflow (not an object, `nodes` not a list of objects,
    /// `connections` not slot/branch/target nesting).
    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        let value: JsonValue =
            serde_json::from_str(text).map_err(|e| DocumentError::InvalidJson {
                reason: e.to_string(),
            })?;
        Self::from_json_value(value)
    }

    /// Reads a workflow from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// See [`Workflow::from_json_str`].
    pub fn from_json_value(value: JsonValue) -> Result<Self, DocumentError> {
        if !value.is_object() {
            return Err(DocumentError::NotAnObject);
        }
        serde_json::from_value(value).map_err(|e| DocumentError::Shape {
            reason: e.to_string(),
        })
    }

    /// Renders the document as indented JSON.
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        // Maps with string keys and finite numbers always serialize.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the nodes, or an empty slice if the list is absent.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        self.nodes.as_deref().unwrap_or_default()
    }

    /// Returns the first node with the given name.
    #[must_use]
    pub fn node_named(&self, name: &str) -> Option<&Node> {
        self.nodes().iter().find(|node| node.name() == Some(name))
    }

    /// Returns the set of node names present.
    #[must_use]
    pub fn node_names(&self) -> HashSet<&str> {
        self.nodes().iter().filter_map(Node::name).collect()
    }

    /// Appends a node, creating the node list if needed.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.get_or_insert_with(Vec::new).push(node);
    }

    /// Connects `source` branch `branch` to input `input_index` of `target`.
    pub fn connect(&mut self, source: &str, branch: usize, target: &str, input_index: u32) {
        self.connections
            .get_or_insert_with(Connections::new)
            .connect(source, branch, target, input_index);
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.meta.as_ref().is_some_and(Meta::is_degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_workflow_is_complete_and_inactive() {
        let workflow = Workflow::new("Daily summary");
        assert_eq!(workflow.name(), Some("Daily summary"));
        assert_eq!(workflow.active, Some(false));
        assert!(workflow.settings.is_some());
        assert_eq!(workflow.node_count(), 0);
        assert!(!workflow.is_degraded());
    }

    #[test]
    fn wire_format_field_names() {
        let mut workflow = Workflow::new("Wire");
        workflow.add_node(Node::new("Start", "n8n-nodes-base.manualTrigger", 1));
        let value = serde_json::to_value(&workflow).expect("serialize");

        for field in ["name", "nodes", "connections", "active", "settings", "tags", "meta"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["settings"]["executionOrder"], "v1");
        assert!(value["meta"].get("degraded").is_none());
    }

    #[test]
    fn draft_tolerates_odd_fields() {
        let workflow = Workflow::from_json_value(json!({
            "name": "From AI",
            "nodes": [{ "name": "Start", "type": "n8n-nodes-base.manualTrigger" }],
            "active": "yes",
            "settings": "fast",
            "tags": [{ "name": "crm" }, "leads", 7],
            "meta": { "instanceId": "abc" }
        }))
        .expect("lenient parse");

        assert_eq!(workflow.active, None);
        assert_eq!(workflow.settings, None);
        assert_eq!(workflow.connections, None);
        assert_eq!(
            workflow.tags,
            Some(BTreeSet::from(["crm".to_string(), "leads".to_string()]))
        );
        let meta = workflow.meta.expect("meta kept");
        assert_eq!(meta.extra.get("instanceId"), Some(&json!("abc")));
    }

    #[test]
    fn rejects_non_workflow_shapes() {
        assert!(matches!(
            Workflow::from_json_str("[1, 2]"),
            Err(DocumentError::NotAnObject)
        ));
        assert!(matches!(
            Workflow::from_json_str("{\"nodes\": 3}"),
            Err(DocumentError::Shape { .. })
        ));
        assert!(matches!(
            Workflow::from_json_str("not json"),
            Err(DocumentError::InvalidJson { .. })
        ));
    }

    #[test]
    fn node_lookup_by_name() {
        let mut workflow = Workflow::new("Lookup");
        workflow.add_node(Node::new("A", "n8n-nodes-base.manualTrigger", 1));
        workflow.add_node(Node::new("B", "n8n-nodes-base.noOp", 1));
        workflow.connect("A", 0, "B", 0);

        assert!(workflow.node_named("B").is_some());
        assert!(workflow.node_named("C").is_none());
        assert_eq!(workflow.node_names().len(), 2);
    }

    #[test]
    fn degraded_flag_roundtrip() {
        let mut workflow = Workflow::new("Fallback");
        if let Some(meta) = workflow.meta.as_mut() {
            meta.degraded = Some(true);
        }
        let text = workflow.to_pretty_json();
        let parsed = Workflow::from_json_str(&text).expect("parse");
        assert!(parsed.is_degraded());
    }
}
