//! Deterministic workflow templates.
//!
//! A template is a fixed sub-graph for one [`Topic`] (where data comes from
//! and where it goes), stretched to the requested [`ComplexityTier`] and
//! fronted by a trigger node for the requested [`TriggerKind`]:
//!
//! ```text
//! simple:  trigger → source → action
//! medium:  trigger → source → IF ─┬→ action
//!                                 └→ skip
//! complex: trigger → source → code → IF ─┬→ action ───────┬→ merge → finish
//!                                        └→ mark skipped ─┘
//! ```
//!
//! Templates never depend on anything outside the registry, so their output
//! always passes structural validation.

use crate::request::{ComplexityTier, GenerationRequest, TriggerKind};
use crate::topic::Topic;
use flowsmith_workflow::registry::types;
use flowsmith_workflow::repair::UNTITLED_WORKFLOW;
use flowsmith_workflow::{Node, NodeTypeRegistry, Workflow};
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeSet;
use std::sync::Arc;

const MAX_NAME_CHARS: usize = 60;
const NAME_WORDS: usize = 8;

/// Input to the template generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateDescriptor {
    pub trigger_kind: TriggerKind,
    pub complexity: ComplexityTier,
    pub topic_hints: Vec<String>,
    /// Free text the workflow name is derived from.
    pub description: String,
}

impl From<&GenerationRequest> for TemplateDescriptor {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            trigger_kind: request.trigger_type,
            complexity: request.complexity,
            topic_hints: request.topic_hints(),
            description: request.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cadence {
    Hourly,
    Daily,
    Weekly,
}

impl Cadence {
    fn from_hints(hints: &[String]) -> Self {
        let has = |stem: &str| hints.iter().any(|word| word.starts_with(stem));
        if has("hour") {
            Self::Hourly
        } else if has("week") {
            Self::Weekly
        } else {
            Self::Daily
        }
    }

    fn rule(self) -> JsonValue {
        let interval = match self {
            Self::Hourly => json!({ "field": "hours", "hoursInterval": 1 }),
            Self::Daily => json!({ "field": "days", "daysInterval": 1, "triggerAtHour": 9 }),
            Self::Weekly => json!({
                "field": "weeks",
                "weeksInterval": 1,
                "triggerAtDay": [1],
                "triggerAtHour": 9
            }),
        };
        json!({ "interval": [interval] })
    }
}

/// A templated node before it is placed on the canvas.
struct Step {
    name: &'static str,
    type_id: &'static str,
    parameters: JsonValue,
    credential: Option<(&'static str, &'static str)>,
}

fn source_step(topic: Topic) -> Step {
    match topic {
        Topic::LeadCrm => Step {
            name: "Fetch New Contacts",
            type_id: types::HTTP_REQUEST,
            parameters: json!({
                "method": "GET",
                "url": "https://api.hubapi.com/crm/v3/objects/contacts",
                "authentication": "predefinedCredentialType",
                "nodeCredentialType": "hubspotAppToken",
                "sendQuery": true,
                "queryParameters": {
                    "parameters": [{ "name": "limit", "value": "50" }]
                },
                "options": {}
            }),
            credential: Some(("hubspotAppToken", "HubSpot app token")),
        },
        Topic::Notification => Step {
            name: "Fetch Activity",
            type_id: types::HTTP_REQUEST,
            parameters: json!({
                "method": "GET",
                "url": "https://api.github.com/events",
                "options": {}
            }),
            credential: None,
        },
        Topic::DataSync => Step {
            name: "Read Orders",
            type_id: types::POSTGRES,
            parameters: json!({
                "operation": "select",
                "schema": "public",
                "table": "orders",
                "options": {}
            }),
            credential: Some(("postgres", "Postgres account")),
        },
        Topic::HttpFetch => Step {
            name: "Fetch Records",
            type_id: types::HTTP_REQUEST,
            parameters: json!({
                "method": "GET",
                "url": "https://api.github.com/repos/rust-lang/rust/releases",
                "options": {}
            }),
            credential: None,
        },
    }
}

fn action_step(topic: Topic) -> Step {
    match topic {
        Topic::LeadCrm => Step {
            name: "Upsert Contact",
            type_id: types::HUBSPOT,
            parameters: json!({
                "resource": "contact",
                "operation": "upsert",
                "email": "={{ $json.properties.email }}",
                "additionalFields": {
                    "firstName": "={{ $json.properties.firstname }}",
                    "lastName": "={{ $json.properties.lastname }}"
                }
            }),
            credential: Some(("hubspotApi", "HubSpot account")),
        },
        Topic::Notification => Step {
            name: "Post to Slack",
            type_id: types::SLACK,
            parameters: json!({
                "resource": "message",
                "operation": "post",
                "select": "channel",
                "channelId": "#general",
                "text": "=New {{ $json.type }} event in {{ $json.repo.name }}",
                "otherOptions": {}
            }),
            credential: Some(("slackApi", "Slack account")),
        },
        Topic::DataSync => Step {
            name: "Append to Sheet",
            type_id: types::GOOGLE_SHEETS,
            parameters: json!({
                "operation": "append",
                "documentId": {
                    "__rl": true,
                    "mode": "id",
                    "value": "1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms"
                },
                "sheetName": { "__rl": true, "mode": "name", "value": "Orders" },
                "columns": { "mappingMode": "autoMapInputData" },
                "options": {}
            }),
            credential: Some(("googleSheetsOAuth2Api", "Google Sheets account")),
        },
        Topic::HttpFetch => Step {
            name: "Store Records",
            type_id: types::POSTGRES,
            parameters: json!({
                "operation": "insert",
                "schema": "public",
                "table": "api_records",
                "columns": "id,name,published_at",
                "options": {}
            }),
            credential: Some(("postgres", "Postgres account")),
        },
    }
}

/// Field the conditional step tests before the action runs.
const fn condition_field(topic: Topic) -> &'static str {
    match topic {
        Topic::LeadCrm => "={{ $json.properties.email }}",
        Topic::Notification => "={{ $json.type }}",
        Topic::DataSync | Topic::HttpFetch => "={{ $json.id }}",
    }
}

fn condition_step(topic: Topic) -> Step {
    Step {
        name: "Check Record",
        type_id: types::IF,
        parameters: json!({
            "conditions": {
                "options": { "caseSensitive": true, "typeValidation": "strict" },
                "conditions": [{
                    "leftValue": condition_field(topic),
                    "rightValue": "",
                    "operator": { "type": "string", "operation": "notEmpty", "singleValue": true }
                }],
                "combinator": "and"
            },
            "options": {}
        }),
        credential: None,
    }
}

fn transform_step() -> Step {
    Step {
        name: "Normalize Records",
        type_id: types::CODE,
        parameters: json!({
            "mode": "runOnceForAllItems",
            "language": "javaScript",
            "jsCode": "return $input.all().map(item => ({\n  json: { ...item.json, processedAt: new Date().toISOString() },\n}));"
        }),
        credential: None,
    }
}

fn skip_step() -> Step {
    Step {
        name: "Skip",
        type_id: types::NO_OP,
        parameters: json!({}),
        credential: None,
    }
}

fn mark_skipped_step() -> Step {
    Step {
        name: "Mark Skipped",
        type_id: types::SET,
        parameters: json!({
            "mode": "manual",
            "assignments": {
                "assignments": [{ "name": "status", "value": "skipped", "type": "string" }]
            },
            "includeOtherFields": true,
            "options": {}
        }),
        credential: None,
    }
}

fn merge_step() -> Step {
    Step {
        name: "Combine Results",
        type_id: types::MERGE,
        parameters: json!({ "mode": "append", "options": {} }),
        credential: None,
    }
}

fn finish_step(trigger: TriggerKind) -> Step {
    match trigger {
        TriggerKind::Webhook => Step {
            name: "Respond to Webhook",
            type_id: types::RESPOND_TO_WEBHOOK,
            parameters: json!({ "respondWith": "allIncomingItems", "options": {} }),
            credential: None,
        },
        TriggerKind::Schedule | TriggerKind::Manual => Step {
            name: "Done",
            type_id: types::NO_OP,
            parameters: json!({}),
            credential: None,
        },
    }
}

/// Canvas coordinates for a grid cell. Branches sit on lower rows.
fn grid(column: u32, row: u32) -> (f64, f64) {
    (
        250.0 + 220.0 * f64::from(column),
        300.0 + 180.0 * f64::from(row),
    )
}

/// Workflow name from the first words of the description.
fn workflow_name(description: &str, topic: Topic) -> String {
    let words: Vec<&str> = description.split_whitespace().take(NAME_WORDS).collect();
    if words.is_empty() {
        return format!("{} workflow", topic.title());
    }

    let joined = words.join(" ");
    let mut chars = joined.chars();
    let mut name: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    if name.chars().count() > MAX_NAME_CHARS {
        name = name.chars().take(MAX_NAME_CHARS).collect();
        name.truncate(name.trim_end().len());
    }
    name
}

/// Builds workflows from the built-in templates.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    registry: Arc<NodeTypeRegistry>,
}

impl TemplateGenerator {
    #[must_use]
    pub fn new(registry: Arc<NodeTypeRegistry>) -> Self {
        Self { registry }
    }

    /// Current registry version of a type, or 1 for types the registry
    /// does not carry.
    fn version(&self, type_id: &str) -> u32 {
        self.registry
            .lookup(type_id)
            .map(|spec| spec.current_version)
            .unwrap_or(1)
    }

    fn place(&self, step: Step, column: u32, row: u32) -> Node {
        let (x, y) = grid(column, row);
        let node = Node::new(step.name, step.type_id, self.version(step.type_id))
            .at(x, y)
            .with_parameters(step.parameters);
        match step.credential {
            Some((credential_type, label)) => node.with_credential(credential_type, label),
            None => node,
        }
    }

    fn trigger_step(kind: TriggerKind, cadence: Cadence, path: &str, responds: bool) -> Step {
        match kind {
            TriggerKind::Manual => Step {
                name: "Manual Trigger",
                type_id: types::MANUAL_TRIGGER,
                parameters: json!({}),
                credential: None,
            },
            TriggerKind::Schedule => Step {
                name: "Schedule Trigger",
                type_id: types::SCHEDULE_TRIGGER,
                parameters: json!({ "rule": cadence.rule() }),
                credential: None,
            },
            TriggerKind::Webhook => Step {
                name: "Webhook",
                type_id: types::WEBHOOK,
                parameters: json!({
                    "httpMethod": "POST",
                    "path": path,
                    "responseMode": if responds { "responseNode" } else { "onReceived" },
                    "options": {}
                }),
                credential: None,
            },
        }
    }

    /// Composes a workflow for the descriptor.
    #[must_use]
    pub fn generate(&self, descriptor: &TemplateDescriptor) -> Workflow {
        let topic = Topic::detect(&descriptor.topic_hints);
        let complex = descriptor.complexity == ComplexityTier::Complex;

        let mut workflow = Workflow::new(workflow_name(&descriptor.description, topic));
        workflow.tags = Some(BTreeSet::from([topic.tag().to_string()]));

        let trigger = Self::trigger_step(
            descriptor.trigger_kind,
            Cadence::from_hints(&descriptor.topic_hints),
            topic.tag(),
            complex,
        );
        let source = source_step(topic);
        let (trigger_name, source_name) = (trigger.name, source.name);
        workflow.add_node(self.place(trigger, 0, 0));
        workflow.add_node(self.place(source, 1, 0));
        workflow.connect(trigger_name, 0, source_name, 0);

        let action = action_step(topic);
        let action_name = action.name;
        match descriptor.complexity {
            ComplexityTier::Simple => {
                workflow.add_node(self.place(action, 2, 0));
                workflow.connect(source_name, 0, action_name, 0);
            }
            ComplexityTier::Medium => {
                let (check, skip) = (condition_step(topic), skip_step());
                let (check_name, skip_name) = (check.name, skip.name);
                workflow.add_node(self.place(check, 2, 0));
                workflow.add_node(self.place(action, 3, 0));
                workflow.add_node(self.place(skip, 3, 1));
                workflow.connect(source_name, 0, check_name, 0);
                workflow.connect(check_name, 0, action_name, 0);
                workflow.connect(check_name, 1, skip_name, 0);
            }
            ComplexityTier::Complex => {
                let (transform, check) = (transform_step(), condition_step(topic));
                let (skipped, merge) = (mark_skipped_step(), merge_step());
                let finish = finish_step(descriptor.trigger_kind);
                let (transform_name, check_name) = (transform.name, check.name);
                let (skipped_name, merge_name, finish_name) =
                    (skipped.name, merge.name, finish.name);

                workflow.add_node(self.place(transform, 2, 0));
                workflow.add_node(self.place(check, 3, 0));
                workflow.add_node(self.place(action, 4, 0));
                workflow.add_node(self.place(skipped, 4, 1));
                workflow.add_node(self.place(merge, 5, 0));
                workflow.add_node(self.place(finish, 6, 0));

                workflow.connect(source_name, 0, transform_name, 0);
                workflow.connect(transform_name, 0, check_name, 0);
                workflow.connect(check_name, 0, action_name, 0);
                workflow.connect(check_name, 1, skipped_name, 0);
                workflow.connect(action_name, 0, merge_name, 0);
                workflow.connect(skipped_name, 0, merge_name, 1);
                workflow.connect(merge_name, 0, finish_name, 0);
            }
        }

        workflow
    }

    /// The smallest valid workflow: one trigger node and nothing else.
    #[must_use]
    pub fn minimal(&self, trigger_kind: TriggerKind, description: &str) -> Workflow {
        let name = if description.trim().is_empty() {
            UNTITLED_WORKFLOW.to_string()
        } else {
            workflow_name(description, Topic::HttpFetch)
        };
        let mut workflow = Workflow::new(name);
        workflow.add_node(self.place(
            Self::trigger_step(trigger_kind, Cadence::Daily, "flowsmith", false),
            0,
            0,
        ));
        workflow
    }
}
