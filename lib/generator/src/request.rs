//! Generation requests and results.

use flowsmith_workflow::Workflow;
use flowsmith_workflow::registry::types;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// What starts the generated workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Webhook,
    Schedule,
    #[default]
    Manual,
}

impl TriggerKind {
    pub const ALL: [Self; 3] = [Self::Webhook, Self::Schedule, Self::Manual];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Schedule => "schedule",
            Self::Manual => "manual",
        }
    }

    /// Registry type id of the trigger node for this kind.
    #[must_use]
    pub const fn type_id(self) -> &'static str {
        match self {
            Self::Webhook => types::WEBHOOK,
            Self::Schedule => types::SCHEDULE_TRIGGER,
            Self::Manual => types::MANUAL_TRIGGER,
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested size of the generated workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    #[default]
    Simple,
    Medium,
    Complex,
}

impl ComplexityTier {
    pub const ALL: [Self; 3] = [Self::Simple, Self::Medium, Self::Complex];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }

    /// Inclusive node-count band for the tier.
    #[must_use]
    pub const fn node_band(self) -> (usize, usize) {
        match self {
            Self::Simple => (2, 3),
            Self::Medium => (4, 6),
            Self::Complex => (7, usize::MAX),
        }
    }

    /// Human form of [`ComplexityTier::node_band`].
    #[must_use]
    pub const fn band_label(self) -> &'static str {
        match self {
            Self::Simple => "2-3",
            Self::Medium => "4-6",
            Self::Complex => "7+",
        }
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic cache key for a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request to generate a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "trigger_type")]
    pub trigger_type: TriggerKind,
    #[serde(default)]
    pub complexity: ComplexityTier,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        trigger_type: TriggerKind,
        complexity: ComplexityTier,
    ) -> Self {
        Self {
            description: description.into(),
            trigger_type,
            complexity,
        }
    }

    /// Lowercased description with runs of whitespace collapsed.
    #[must_use]
    pub fn normalized_description(&self) -> String {
        self.description
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Returns whether the request is too empty to act on.
    #[must_use]
    pub fn needs_prompt_help(&self) -> bool {
        self.description.trim().is_empty()
    }

    /// SHA-256 over the normalized description, trigger kind and tier.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.normalized_description().as_bytes());
        hasher.update([0]);
        hasher.update(self.trigger_type.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.complexity.as_str().as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Keyword hints for template selection.
    #[must_use]
    pub fn topic_hints(&self) -> Vec<String> {
        self.normalized_description()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect()
    }
}

const PROMPT_HELP: &str = "Describe what the workflow should do, for example: \
\"When a new lead signs up, add them to HubSpot and notify the sales channel in Slack.\"";

/// Result handed to the HTTP layer.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GenerationResult {
    Generated {
        success: bool,
        workflow: Box<Workflow>,
        filename: String,
        formatted_json: String,
    },
    NeedsPromptHelp {
        success: bool,
        needs_prompt_help: bool,
        helper_message: String,
    },
}

impl GenerationResult {
    #[must_use]
    pub fn generated(workflow: Workflow) -> Self {
        Self::Generated {
            success: true,
            filename: filename_for(workflow.name().unwrap_or_default()),
            formatted_json: workflow.to_pretty_json(),
            workflow: Box::new(workflow),
        }
    }

    #[must_use]
    pub fn prompt_help() -> Self {
        Self::NeedsPromptHelp {
            success: false,
            needs_prompt_help: true,
            helper_message: PROMPT_HELP.to_string(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

/// File name for a downloaded workflow: a slug of its name plus `.json`.
#[must_use]
pub fn filename_for(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "workflow.json".to_string()
    } else {
        format!("{slug}.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let request: GenerationRequest = serde_json::from_value(json!({
            "description": "send a daily slack summary",
            "triggerType": "schedule",
            "complexity": "medium"
        }))
        .expect("parse");
        assert_eq!(request.trigger_type, TriggerKind::Schedule);
        assert_eq!(request.complexity, ComplexityTier::Medium);

        let defaulted: GenerationRequest =
            serde_json::from_value(json!({ "description": "x" })).expect("parse");
        assert_eq!(defaulted.trigger_type, TriggerKind::Manual);
        assert_eq!(defaulted.complexity, ComplexityTier::Simple);

        assert!(
            serde_json::from_value::<GenerationRequest>(json!({ "triggerType": "cron" })).is_err()
        );
    }

    #[test]
    fn fingerprint_normalizes_description() {
        let a = GenerationRequest::new(
            "Send  a daily\tSlack summary ",
            TriggerKind::Schedule,
            ComplexityTier::Medium,
        );
        let b = GenerationRequest::new(
            "send a daily slack summary",
            TriggerKind::Schedule,
            ComplexityTier::Medium,
        );
        let c = GenerationRequest::new(
            "send a daily slack summary",
            TriggerKind::Manual,
            ComplexityTier::Medium,
        );

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().as_str().len(), 64);
    }

    #[test]
    fn blank_description_needs_help() {
        let request = GenerationRequest::new("   ", TriggerKind::Manual, ComplexityTier::Simple);
        assert!(request.needs_prompt_help());

        let value = serde_json::to_value(GenerationResult::prompt_help()).expect("serialize");
        assert_eq!(value["success"], false);
        assert_eq!(value["needs_prompt_help"], true);
        assert!(value["helper_message"].is_string());
    }

    #[test]
    fn generated_result_shape() {
        let result = GenerationResult::generated(Workflow::new("Sync Leads to HubSpot!"));
        assert!(result.is_success());

        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["success"], true);
        assert_eq!(value["filename"], "sync-leads-to-hubspot.json");
        assert_eq!(value["workflow"]["name"], "Sync Leads to HubSpot!");
        assert!(value["formatted_json"].as_str().is_some_and(|s| s.contains('\n')));
    }

    #[test]
    fn filename_fallback() {
        assert_eq!(filename_for(""), "workflow.json");
        assert_eq!(filename_for("  --  "), "workflow.json");
        assert_eq!(filename_for("Daily report (v2)"), "daily-report-v2.json");
    }

    #[test]
    fn topic_hints_split_words() {
        let request = GenerationRequest::new(
            "Sync CRM-leads, hourly!",
            TriggerKind::Schedule,
            ComplexityTier::Simple,
        );
        assert_eq!(request.topic_hints(), vec!["sync", "crm", "leads", "hourly"]);
    }
}
