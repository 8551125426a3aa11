//! Workflow nodes.
//!
//! A node is a typed unit of work. Its `name` is the identifier that
//! connections refer to, so it must be unique within a workflow; the `id`
//! is an opaque token.
//!
//! Every field is optional because drafts may arrive incomplete; see
//! [`crate::repair`] for how gaps are filled.

use crate::lenient;
use flowsmith_core::NodeId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

/// Free-form node parameters. Required keys are checked per node type by
/// the registry, values are never statically typed.
pub type Parameters = Map<String, JsonValue>;

/// Canvas position of a node. Purely cosmetic but must be present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns whether both coordinates are finite.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.x, self.y).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (x, y) = <(f64, f64)>::deserialize(deserializer)?;
        Ok(Self::new(x, y))
    }
}

/// A node in a workflow document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Registry key of the node type.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::version",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_version: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient::position",
        skip_serializing_if = "Option::is_none"
    )]
    pub position: Option<Position>,
    #[serde(
        default,
        deserialize_with = "lenient::object",
        skip_serializing_if = "Option::is_none"
    )]
    pub parameters: Option<Parameters>,
    /// Credential references keyed by credential type.
    #[serde(
        default,
        deserialize_with = "lenient::object",
        skip_serializing_if = "Option::is_none"
    )]
    pub credentials: Option<Map<String, JsonValue>>,
}

impl Node {
    /// Creates a complete node with a fresh id, origin position and no
    /// parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, type_id: impl Into<String>, type_version: u32) -> Self {
        Self {
            id: Some(NodeId::new().to_string()),
            name: Some(name.into()),
            type_id: Some(type_id.into()),
            type_version: Some(type_version),
            position: Some(Position::new(0.0, 0.0)),
            parameters: Some(Parameters::new()),
            credentials: None,
        }
    }

    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    /// Sets one parameter, creating the parameter map if needed.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.parameters
            .get_or_insert_with(Parameters::new)
            .insert(key.into(), value);
        self
    }

    /// Replaces the parameter map. Non-object values clear it.
    #[must_use]
    pub fn with_parameters(mut self, parameters: JsonValue) -> Self {
        self.parameters = match parameters {
            JsonValue::Object(map) => Some(map),
            _ => None,
        };
        self
    }

    /// Attaches a credential reference.
    #[must_use]
    pub fn with_credential(mut self, credential_type: impl Into<String>, name: &str) -> Self {
        self.credentials.get_or_insert_with(Map::new).insert(
            credential_type.into(),
            serde_json::json!({ "id": "", "name": name }),
        );
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn type_id(&self) -> Option<&str> {
        self.type_id.as_deref()
    }

    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&JsonValue> {
        self.parameters.as_ref()?.get(key)
    }

    /// Returns whether any credential reference is attached.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.credentials.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Name for diagnostics: the node name, or its position in the list.
    #[must_use]
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_builder_is_complete() {
        let node = Node::new("Fetch", "n8n-nodes-base.httpRequest", 4)
            .at(250.0, 300.0)
            .with_parameter("url", json!("https://api.github.com/events"));

        assert!(node.id.as_deref().is_some_and(|id| id.starts_with("node_")));
        assert_eq!(node.name(), Some("Fetch"));
        assert_eq!(node.position, Some(Position::new(250.0, 300.0)));
        assert_eq!(
            node.parameter("url"),
            Some(&json!("https://api.github.com/events"))
        );
    }

    #[test]
    fn serializes_wire_names() {
        let node = Node::new("Start", "n8n-nodes-base.manualTrigger", 1).at(10.0, 20.0);
        let value = serde_json::to_value(&node).expect("serialize");

        assert_eq!(value["type"], "n8n-nodes-base.manualTrigger");
        assert_eq!(value["typeVersion"], 1);
        assert_eq!(value["position"], json!([10.0, 20.0]));
        assert!(value.get("credentials").is_none());
    }

    #[test]
    fn malformed_fields_read_as_absent() {
        let node: Node = serde_json::from_value(json!({
            "name": "Fetch",
            "type": "n8n-nodes-base.httpRequest",
            "typeVersion": 4.2,
            "position": "top-left",
            "parameters": ["url"]
        }))
        .expect("lenient parse");

        assert_eq!(node.name(), Some("Fetch"));
        assert_eq!(node.id, None);
        assert_eq!(node.type_version, None);
        assert_eq!(node.position, None);
        assert_eq!(node.parameters, None);
    }

    #[test]
    fn integral_versions_are_accepted() {
        let node: Node = serde_json::from_value(json!({ "typeVersion": "2" })).expect("parse");
        assert_eq!(node.type_version, Some(2));

        let node: Node = serde_json::from_value(json!({ "typeVersion": 3.0 })).expect("parse");
        assert_eq!(node.type_version, Some(3));

        let node: Node = serde_json::from_value(json!({ "typeVersion": 0 })).expect("parse");
        assert_eq!(node.type_version, None);
    }

    #[test]
    fn position_object_form_is_accepted() {
        let node: Node =
            serde_json::from_value(json!({ "position": { "x": 1, "y": 2 } })).expect("parse");
        assert_eq!(node.position, Some(Position::new(1.0, 2.0)));
    }

    #[test]
    fn credentials_flag() {
        let node = Node::new("Post", "n8n-nodes-base.slack", 2);
        assert!(!node.has_credentials());
        assert!(node.with_credential("slackApi", "Slack account").has_credentials());
    }
}
