//! Structural validation of workflow documents.
//!
//! Five independent passes run in order and all of them always run, so a
//! single call yields the complete list of problems:
//!
//! 1. shape: required document and node fields, duplicate names and ids
//! 2. type/version: registry lookup, supported version, required params
//! 3. connection: resolvable references, inbound edges, trigger reachability
//! 4. content: placeholder endpoints and credential-less authentication
//! 5. expression: every string parameter through [`ExpressionValidator`]

use crate::definition::Workflow;
use crate::diagnostic::{Diagnostic, DiagnosticKind, ValidationReport};
use crate::expression::{ExpressionClass, ExpressionValidator};
use crate::graph::ConnectionGraph;
use crate::node::{Node, Parameters};
use crate::registry::NodeTypeRegistry;
use crate::rules::{PatternRule, compile_table, first_match};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, instrument};

/// Parameter keys that denote an external endpoint.
const ENDPOINT_KEYS: &[&str] = &["url", "endpoint", "baseUrl", "webhookUrl", "uri"];

const PLACEHOLDERS: &[(&str, &str)] = &[
    (
        "example_domain",
        r"(?i)^(?:https?://)?(?:[a-z0-9-]+\.)*example\.(?:com|org|net)(?:[:/?#]|$)",
    ),
    (
        "your_domain",
        r"(?i)your[-_]?(?:domain|api|server|company|instance|endpoint)",
    ),
    ("your_token", r"\bYOUR_[A-Z0-9_]+\b"),
    ("angle_marker", r"<[^<>]+>"),
    ("placeholder_word", r"(?i)\bplaceholder\b"),
    ("todo_marker", r"(?i)^\s*(?:todo|tbd|fixme|changeme)\b"),
];

static PLACEHOLDER_RULES: LazyLock<Vec<PatternRule>> =
    LazyLock::new(|| compile_table(PLACEHOLDERS));

/// A string value somewhere inside a parameter map.
struct StringParam<'a> {
    path: String,
    /// Nearest enclosing object key.
    key: &'a str,
    text: &'a str,
}

fn string_params(parameters: &Parameters) -> Vec<StringParam<'_>> {
    let mut found = Vec::new();
    for (key, value) in parameters {
        collect_strings(value, key.clone(), key, &mut found);
    }
    found
}

fn collect_strings<'a>(
    value: &'a JsonValue,
    path: String,
    key: &'a str,
    found: &mut Vec<StringParam<'a>>,
) {
    match value {
        JsonValue::String(text) => found.push(StringParam { path, key, text }),
        JsonValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_strings(item, format!("{path}[{i}]"), key, found);
            }
        }
        JsonValue::Object(map) => {
            for (child, item) in map {
                collect_strings(item, format!("{path}.{child}"), child, found);
            }
        }
        _ => {}
    }
}

/// A required parameter is missing when absent, `null` or blank text.
fn is_missing(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Checks workflows against a node type registry.
#[derive(Debug, Clone)]
pub struct StructuralValidator {
    registry: Arc<NodeTypeRegistry>,
    expressions: ExpressionValidator,
    placeholders: Vec<PatternRule>,
}

impl StructuralValidator {
    /// Creates a validator with the built-in expression and placeholder rules.
    #[must_use]
    pub fn new(registry: Arc<NodeTypeRegistry>) -> Self {
        Self {
            registry,
            expressions: ExpressionValidator::new(),
            placeholders: PLACEHOLDER_RULES.clone(),
        }
    }

    #[must_use]
    pub fn with_expressions(mut self, expressions: ExpressionValidator) -> Self {
        self.expressions = expressions;
        self
    }

    /// Replaces the ordered placeholder rule table.
    #[must_use]
    pub fn with_placeholder_rules(mut self, rules: Vec<PatternRule>) -> Self {
        self.placeholders = rules;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<NodeTypeRegistry> {
        &self.registry
    }

    /// Validates a workflow.
    #[instrument(skip_all, fields(nodes = workflow.node_count()))]
    pub fn validate(&self, workflow: &Workflow) -> ValidationReport {
        let mut report = ValidationReport::new();

        self.check_shape(workflow, &mut report);
        self.check_types(workflow, &mut report);
        self.check_connections(workflow, &mut report);
        self.check_content(workflow, &mut report);
        self.check_expressions(workflow, &mut report);

        debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "workflow validated"
        );
        report
    }

    fn check_shape(&self, workflow: &Workflow, report: &mut ValidationReport) {
        let missing = |field: &str| {
            Diagnostic::new(
                DiagnosticKind::SchemaShape,
                format!("missing or malformed field `{field}`"),
            )
        };

        let top_level = [
            ("name", workflow.name.is_some()),
            ("nodes", workflow.nodes.is_some()),
            ("connections", workflow.connections.is_some()),
            ("active", workflow.active.is_some()),
            ("settings", workflow.settings.is_some()),
            ("tags", workflow.tags.is_some()),
            ("meta", workflow.meta.is_some()),
        ];
        for (field, present) in top_level {
            if !present {
                report.error(missing(field));
            }
        }
        if workflow.nodes.as_ref().is_some_and(Vec::is_empty) {
            report.error(Diagnostic::new(
                DiagnosticKind::SchemaShape,
                "workflow has no nodes",
            ));
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for (index, node) in workflow.nodes().iter().enumerate() {
            let label = node.label(index);
            let node_fields = [
                ("id", node.id.is_some()),
                ("name", node.name.is_some()),
                ("type", node.type_id.is_some()),
                ("typeVersion", node.type_version.is_some()),
                (
                    "position",
                    node.position.is_some_and(|p| p.is_well_formed()),
                ),
                ("parameters", node.parameters.is_some()),
            ];
            for (field, present) in node_fields {
                if !present {
                    report.error(Diagnostic::for_node(
                        DiagnosticKind::SchemaShape,
                        label.clone(),
                        format!("missing or malformed node field `{field}`"),
                    ));
                }
            }

            if let Some(name) = node.name() {
                if !names.insert(name) {
                    report.error(Diagnostic::for_node(
                        DiagnosticKind::SchemaShape,
                        label.clone(),
                        format!("duplicate node name '{name}'"),
                    ));
                }
            }
            if let Some(id) = node.id.as_deref() {
                if !ids.insert(id) {
                    report.error(Diagnostic::for_node(
                        DiagnosticKind::SchemaShape,
                        label,
                        format!("duplicate node id '{id}'"),
                    ));
                }
            }
        }
    }

    fn check_types(&self, workflow: &Workflow, report: &mut ValidationReport) {
        for (index, node) in workflow.nodes().iter().enumerate() {
            let Some(type_id) = node.type_id() else {
                continue;
            };
            let label = node.label(index);

            let spec = match self.registry.lookup(type_id) {
                Ok(spec) => spec,
                Err(err) => {
                    report.error(Diagnostic::for_node(
                        DiagnosticKind::UnknownNodeType,
                        label,
                        err.to_string(),
                    ));
                    continue;
                }
            };

            let unsupported = node
                .type_version
                .filter(|version| !spec.supports_version(*version));
            if let Some(version) = unsupported {
                report.error(Diagnostic::for_node(
                    DiagnosticKind::UnsupportedVersion,
                    label.clone(),
                    format!(
                        "typeVersion {version} is not supported by {type_id} (supported: {:?})",
                        spec.supported_versions
                    ),
                ));
            }

            let missing: Vec<&str> = spec
                .required_params
                .iter()
                .map(String::as_str)
                .filter(|param| is_missing(node.parameter(param)))
                .collect();
            if !missing.is_empty() {
                report.error(Diagnostic::for_node(
                    DiagnosticKind::MissingParameter,
                    label,
                    format!("missing required parameters: {}", missing.join(", ")),
                ));
            }
        }
    }

    fn check_connections(&self, workflow: &Workflow, report: &mut ValidationReport) {
        let names = workflow.node_names();

        if let Some(connections) = &workflow.connections {
            for source in connections.sources() {
                if !names.contains(source) {
                    report.error(Diagnostic::new(
                        DiagnosticKind::DanglingConnection,
                        format!("connection source '{source}' is not a node"),
                    ));
                }
            }
            for edge in connections.edges() {
                if !names.contains(edge.target.node.as_str()) {
                    report.error(Diagnostic::for_node(
                        DiagnosticKind::DanglingConnection,
                        edge.source,
                        format!("{edge} targets a node that does not exist"),
                    ));
                }
            }
        }

        let is_trigger =
            |node: &Node| node.type_id().is_some_and(|t| self.registry.is_trigger(t));
        let triggers: Vec<&str> = workflow
            .nodes()
            .iter()
            .filter(|node| is_trigger(*node))
            .filter_map(Node::name)
            .collect();
        if workflow.node_count() > 0 && triggers.is_empty() {
            report.error(Diagnostic::new(
                DiagnosticKind::UnreachableNode,
                "workflow has no trigger node",
            ));
        }

        let graph = ConnectionGraph::build(workflow);
        let reached = graph.reachable_from(triggers.iter().copied());
        let mut seen = HashSet::new();
        for node in workflow.nodes() {
            let Some(name) = node.name() else {
                continue;
            };
            if is_trigger(node) || !seen.insert(name) {
                continue;
            }
            if graph.inbound_count(name) == 0 {
                report.error(Diagnostic::for_node(
                    DiagnosticKind::UnreachableNode,
                    name,
                    "non-trigger node has no inbound connection",
                ));
            } else if !reached.contains(name) {
                report.warning(Diagnostic::for_node(
                    DiagnosticKind::UnreachableNode,
                    name,
                    "node is not reachable from any trigger",
                ));
            }
        }
    }

    fn check_content(&self, workflow: &Workflow, report: &mut ValidationReport) {
        for (index, node) in workflow.nodes().iter().enumerate() {
            let Some(parameters) = &node.parameters else {
                continue;
            };

            for param in string_params(parameters) {
                if !ENDPOINT_KEYS.contains(&param.key) {
                    continue;
                }
                if let Some(rule) = first_match(&self.placeholders, param.text) {
                    report.error(Diagnostic::for_node(
                        DiagnosticKind::PlaceholderValue,
                        node.label(index),
                        format!(
                            "`{}` holds a placeholder value '{}' ({})",
                            param.path,
                            param.text,
                            rule.name()
                        ),
                    ));
                }
            }

            let auth = node
                .parameter("authentication")
                .and_then(JsonValue::as_str)
                .map(str::trim)
                .filter(|auth| !auth.is_empty() && !auth.eq_ignore_ascii_case("none"));
            if let Some(auth) = auth.filter(|_| !node.has_credentials()) {
                report.error(Diagnostic::for_node(
                    DiagnosticKind::MissingCredential,
                    node.label(index),
                    format!("authentication '{auth}' requires a credential reference"),
                ));
            }
        }
    }

    fn check_expressions(&self, workflow: &Workflow, report: &mut ValidationReport) {
        for (index, node) in workflow.nodes().iter().enumerate() {
            let Some(parameters) = &node.parameters else {
                continue;
            };
            for param in string_params(parameters) {
                if let ExpressionClass::InvalidPattern { segment, rule } =
                    self.expressions.classify(param.text)
                {
                    report.error(Diagnostic::for_node(
                        DiagnosticKind::InvalidExpression,
                        node.label(index),
                        format!(
                            "`{}` references '{segment}' ({rule}); use $json, $('Node') or $input accessors",
                            param.path
                        ),
                    ));
                }
            }
        }
    }
}
