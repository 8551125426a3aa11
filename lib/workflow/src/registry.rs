//! Node type registry.
//!
//! The registry is the catalog of known node types and their contracts:
//! which versions exist, which parameters are required, and whether the
//! type starts a workflow. It is built once, never mutated, and shared
//! behind an `Arc` by every component that needs it.

use crate::error::RegistryError;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Type ids of the built-in catalog.
pub mod types {
    pub const MANUAL_TRIGGER: &str = "n8n-nodes-base.manualTrigger";
    pub const SCHEDULE_TRIGGER: &str = "n8n-nodes-base.scheduleTrigger";
    pub const WEBHOOK: &str = "n8n-nodes-base.webhook";
    pub const HTTP_REQUEST: &str = "n8n-nodes-base.httpRequest";
    pub const SET: &str = "n8n-nodes-base.set";
    pub const IF: &str = "n8n-nodes-base.if";
    pub const MERGE: &str = "n8n-nodes-base.merge";
    pub const CODE: &str = "n8n-nodes-base.code";
    pub const NO_OP: &str = "n8n-nodes-base.noOp";
    pub const SLACK: &str = "n8n-nodes-base.slack";
    pub const HUBSPOT: &str = "n8n-nodes-base.hubspot";
    pub const GOOGLE_SHEETS: &str = "n8n-nodes-base.googleSheets";
    pub const POSTGRES: &str = "n8n-nodes-base.postgres";
    pub const EMAIL_SEND: &str = "n8n-nodes-base.emailSend";
    pub const RESPOND_TO_WEBHOOK: &str = "n8n-nodes-base.respondToWebhook";
}

/// Contract of one node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeSpec {
    pub type_id: String,
    pub display_name: String,
    pub supported_versions: BTreeSet<u32>,
    pub current_version: u32,
    pub required_params: BTreeSet<String>,
    pub optional_params: BTreeSet<String>,
    /// Trigger types may have no inbound connection.
    pub is_trigger_kind: bool,
}

impl NodeTypeSpec {
    /// Creates a non-trigger type supporting version 1 only.
    #[must_use]
    pub fn action(type_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            display_name: display_name.into(),
            supported_versions: BTreeSet::from([1]),
            current_version: 1,
            required_params: BTreeSet::new(),
            optional_params: BTreeSet::new(),
            is_trigger_kind: false,
        }
    }

    /// Creates a trigger type supporting version 1 only.
    #[must_use]
    pub fn trigger(type_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            is_trigger_kind: true,
            ..Self::action(type_id, display_name)
        }
    }

    /// Sets the supported versions. The highest becomes the current one.
    #[must_use]
    pub fn with_versions(mut self, versions: impl IntoIterator<Item = u32>) -> Self {
        self.supported_versions = versions.into_iter().filter(|v| *v > 0).collect();
        if self.supported_versions.is_empty() {
            self.supported_versions.insert(1);
        }
        self.current_version = self.supported_versions.last().copied().unwrap_or(1);
        self
    }

    #[must_use]
    pub fn with_required(mut self, params: &[&str]) -> Self {
        self.required_params
            .extend(params.iter().map(|p| (*p).to_string()));
        self
    }

    #[must_use]
    pub fn with_optional(mut self, params: &[&str]) -> Self {
        self.optional_params
            .extend(params.iter().map(|p| (*p).to_string()));
        self
    }

    #[must_use]
    pub fn supports_version(&self, version: u32) -> bool {
        self.supported_versions.contains(&version)
    }
}

struct SpecRow {
    type_id: &'static str,
    display_name: &'static str,
    versions: &'static [u32],
    required: &'static [&'static str],
    optional: &'static [&'static str],
    trigger: bool,
}

const BUILTIN: &[SpecRow] = &[
    SpecRow {
        type_id: types::MANUAL_TRIGGER,
        display_name: "Manual Trigger",
        versions: &[1],
        required: &[],
        optional: &[],
        trigger: true,
    },
    SpecRow {
        type_id: types::SCHEDULE_TRIGGER,
        display_name: "Schedule Trigger",
        versions: &[1],
        required: &["rule"],
        optional: &[],
        trigger: true,
    },
    SpecRow {
        type_id: types::WEBHOOK,
        display_name: "Webhook",
        versions: &[1, 2],
        required: &["path", "httpMethod"],
        optional: &["responseMode", "options"],
        trigger: true,
    },
    SpecRow {
        type_id: types::HTTP_REQUEST,
        display_name: "HTTP Request",
        versions: &[1, 2, 3, 4],
        required: &["url"],
        optional: &[
            "method",
            "authentication",
            "sendQuery",
            "queryParameters",
            "sendHeaders",
            "headerParameters",
            "sendBody",
            "bodyParameters",
            "options",
        ],
        trigger: false,
    },
    SpecRow {
        type_id: types::SET,
        display_name: "Edit Fields (Set)",
        versions: &[1, 2, 3],
        required: &[],
        optional: &["mode", "assignments", "values", "includeOtherFields", "options"],
        trigger: false,
    },
    SpecRow {
        type_id: types::IF,
        display_name: "If",
        versions: &[1, 2],
        required: &["conditions"],
        optional: &["options"],
        trigger: false,
    },
    SpecRow {
        type_id: types::MERGE,
        display_name: "Merge",
        versions: &[1, 2, 3],
        required: &["mode"],
        optional: &["options"],
        trigger: false,
    },
    SpecRow {
        type_id: types::CODE,
        display_name: "Code",
        versions: &[1, 2],
        required: &["jsCode"],
        optional: &["mode", "language"],
        trigger: false,
    },
    SpecRow {
        type_id: types::NO_OP,
        display_name: "No Operation",
        versions: &[1],
        required: &[],
        optional: &[],
        trigger: false,
    },
    SpecRow {
        type_id: types::SLACK,
        display_name: "Slack",
        versions: &[1, 2],
        required: &["text"],
        optional: &[
            "resource",
            "operation",
            "select",
            "channel",
            "channelId",
            "authentication",
            "otherOptions",
        ],
        trigger: false,
    },
    SpecRow {
        type_id: types::HUBSPOT,
        display_name: "HubSpot",
        versions: &[1, 2],
        required: &["resource", "operation"],
        optional: &["email", "authentication", "additionalFields"],
        trigger: false,
    },
    SpecRow {
        type_id: types::GOOGLE_SHEETS,
        display_name: "Google Sheets",
        versions: &[1, 2, 3, 4],
        required: &["operation", "documentId", "sheetName"],
        optional: &["columns", "authentication", "options"],
        trigger: false,
    },
    SpecRow {
        type_id: types::POSTGRES,
        display_name: "Postgres",
        versions: &[1, 2],
        required: &["operation", "table"],
        optional: &["schema", "columns", "query", "options"],
        trigger: false,
    },
    SpecRow {
        type_id: types::EMAIL_SEND,
        display_name: "Send Email",
        versions: &[1, 2],
        required: &["toEmail", "subject"],
        optional: &["fromEmail", "text", "html", "options"],
        trigger: false,
    },
    SpecRow {
        type_id: types::RESPOND_TO_WEBHOOK,
        display_name: "Respond to Webhook",
        versions: &[1],
        required: &[],
        optional: &["respondWith", "responseBody", "options"],
        trigger: false,
    },
];

/// Read-only catalog of node types.
#[derive(Debug, Clone, Default)]
pub struct NodeTypeRegistry {
    specs: HashMap<String, NodeTypeSpec>,
}

impl NodeTypeRegistry {
    /// Creates a registry with no types, for building fakes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the registry of built-in node types.
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.iter().fold(Self::empty(), |registry, row| {
            let spec = if row.trigger {
                NodeTypeSpec::trigger(row.type_id, row.display_name)
            } else {
                NodeTypeSpec::action(row.type_id, row.display_name)
            };
            registry.with_spec(
                spec.with_versions(row.versions.iter().copied())
                    .with_required(row.required)
                    .with_optional(row.optional),
            )
        })
    }

    /// Adds or replaces a type. Only used while constructing a registry.
    #[must_use]
    pub fn with_spec(mut self, spec: NodeTypeSpec) -> Self {
        self.specs.insert(spec.type_id.clone(), spec);
        self
    }

    /// Looks up a node type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownNodeType`] if the type is not registered.
    pub fn lookup(&self, type_id: &str) -> Result<&NodeTypeSpec, RegistryError> {
        self.specs
            .get(type_id)
            .ok_or_else(|| RegistryError::UnknownNodeType {
                type_id: type_id.to_string(),
            })
    }

    /// Returns whether `version` is supported. False for unknown types.
    #[must_use]
    pub fn is_valid_version(&self, type_id: &str, version: u32) -> bool {
        self.specs
            .get(type_id)
            .is_some_and(|spec| spec.supports_version(version))
    }

    /// Returns the required parameter names.
    ///
    /// Unknown types yield an empty set; callers must treat the unknown type
    /// itself as an error rather than as "no requirements".
    #[must_use]
    pub fn required_params(&self, type_id: &str) -> BTreeSet<&str> {
        self.specs
            .get(type_id)
            .map(|spec| spec.required_params.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns whether the type is a known trigger type.
    #[must_use]
    pub fn is_trigger(&self, type_id: &str) -> bool {
        self.specs
            .get(type_id)
            .is_some_and(|spec| spec.is_trigger_kind)
    }

    /// Returns all specs sorted by type id.
    #[must_use]
    pub fn specs(&self) -> Vec<&NodeTypeSpec> {
        let mut specs: Vec<_> = self.specs.values().collect();
        specs.sort_by(|a, b| a.type_id.cmp(&b.type_id));
        specs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let registry = NodeTypeRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN.len());

        let http = registry.lookup(types::HTTP_REQUEST).expect("http type");
        assert_eq!(http.current_version, 4);
        assert!(http.required_params.contains("url"));
        assert!(!http.is_trigger_kind);
    }

    #[test]
    fn unknown_type_lookup_fails() {
        let registry = NodeTypeRegistry::builtin();
        let err = registry
            .lookup("n8n-nodes-base.teleport")
            .expect_err("unknown");
        assert_eq!(
            err,
            RegistryError::UnknownNodeType {
                type_id: "n8n-nodes-base.teleport".to_string()
            }
        );
        assert!(registry.required_params("n8n-nodes-base.teleport").is_empty());
        assert!(!registry.is_valid_version("n8n-nodes-base.teleport", 1));
    }

    #[test]
    fn version_support() {
        let registry = NodeTypeRegistry::builtin();
        assert!(registry.is_valid_version(types::WEBHOOK, 2));
        assert!(!registry.is_valid_version(types::WEBHOOK, 3));
    }

    #[test]
    fn trigger_kinds() {
        let registry = NodeTypeRegistry::builtin();
        let triggers: Vec<_> = registry
            .specs()
            .into_iter()
            .filter(|spec| spec.is_trigger_kind)
            .map(|spec| spec.type_id.as_str())
            .collect();
        assert_eq!(
            triggers,
            vec![types::MANUAL_TRIGGER, types::SCHEDULE_TRIGGER, types::WEBHOOK]
        );
    }

    #[test]
    fn fake_registry_from_builder() {
        let registry = NodeTypeRegistry::empty()
            .with_spec(NodeTypeSpec::trigger("test.start", "Start"))
            .with_spec(
                NodeTypeSpec::action("test.step", "Step")
                    .with_versions([1, 3])
                    .with_required(&["target"]),
            );

        let step = registry.lookup("test.step").expect("step");
        assert_eq!(step.current_version, 3);
        assert!(!step.supports_version(2));
        assert_eq!(
            registry.required_params("test.step"),
            BTreeSet::from(["target"])
        );
        assert!(registry.is_trigger("test.start"));
    }

    #[test]
    fn required_and_optional_do_not_overlap() {
        let registry = NodeTypeRegistry::builtin();
        for spec in registry.specs() {
            assert!(
                spec.required_params.is_disjoint(&spec.optional_params),
                "{} lists a parameter as both required and optional",
                spec.type_id
            );
            assert!(spec.supports_version(spec.current_version));
        }
    }
}
