//! Prompt templates.
//!
//! A template is a system prompt and a user prompt with `{{variable}}`
//! placeholders. Only declared variables are substituted, so the n8n
//! expression examples in the workflow prompt (`{{ $json.field }}`) reach
//! the model untouched.

use crate::error::PromptError;
use std::collections::HashMap;

/// Name of the built-in workflow generation prompt.
pub const WORKFLOW_GENERATION: &str = "workflow_generation";

const WORKFLOW_GENERATION_SYSTEM: &str = "You design automation workflows. \
Respond with exactly one JSON object and nothing else: no markdown, no commentary.";

const WORKFLOW_GENERATION_USER: &str = r#"Create an automation workflow.

Description: {{description}}
Trigger: {{trigger_type}}
Complexity: {{complexity}} ({{node_band}} nodes)

Use only these node types (type id, supported versions, required parameters):
{{node_types}}

Return a JSON object with fields "name", "nodes" and "connections".
Each node has "name" (unique), "type", "typeVersion", "position" ([x, y]) and "parameters".
Connections map a source node name to {"main": [[{"node": "<target name>", "type": "main", "index": 0}]]}.
Every node except the trigger must have an incoming connection.
Reference earlier data only as {{ $json.field }}, {{ $('Node Name').item.json.field }} or {{ $input.first().json.field }}.
Use real endpoints, never example.com or placeholder values."#;

/// A placeholder a template accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    pub name: &'static str,
    /// Used when the caller supplies nothing. Variables without a default
    /// are required.
    pub default: Option<&'static str>,
}

impl Variable {
    #[must_use]
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    #[must_use]
    pub const fn defaulted(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }
}

/// A rendered prompt, ready to hand to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// A system/user prompt pair with declared variables.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: &'static str,
    system: &'static str,
    user: &'static str,
    variables: &'static [Variable],
}

const WORKFLOW_GENERATION_VARIABLES: &[Variable] = &[
    Variable::required("description"),
    Variable::defaulted("trigger_type", "manual"),
    Variable::defaulted("complexity", "simple"),
    Variable::defaulted("node_band", "2-3"),
    Variable::required("node_types"),
];

impl PromptTemplate {
    #[must_use]
    pub const fn new(
        name: &'static str,
        system: &'static str,
        user: &'static str,
        variables: &'static [Variable],
    ) -> Self {
        Self {
            name,
            system,
            user,
            variables,
        }
    }

    /// The built-in workflow generation prompt.
    #[must_use]
    pub const fn workflow_generation() -> Self {
        Self::new(
            WORKFLOW_GENERATION,
            WORKFLOW_GENERATION_SYSTEM,
            WORKFLOW_GENERATION_USER,
            WORKFLOW_GENERATION_VARIABLES,
        )
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn variables(&self) -> &'static [Variable] {
        self.variables
    }

    /// Substitutes every declared variable in both prompts.
    ///
    /// Supplied values that are not declared are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MissingVariables`] naming every required
    /// variable without a value, in declaration order.
    pub fn render(&self, values: &HashMap<&str, String>) -> Result<RenderedPrompt, PromptError> {
        let missing: Vec<&'static str> = self
            .variables
            .iter()
            .filter(|variable| variable.default.is_none() && !values.contains_key(variable.name))
            .map(|variable| variable.name)
            .collect();
        if !missing.is_empty() {
            return Err(PromptError::MissingVariables {
                template: self.name,
                variables: missing,
            });
        }

        Ok(RenderedPrompt {
            system: self.substitute(self.system, values),
            user: self.substitute(self.user, values),
        })
    }

    /// Replaces each declared `{{name}}` token in one left-to-right pass.
    /// Substituted values are copied as-is and never scanned again.
    fn substitute(&self, text: &str, values: &HashMap<&str, String>) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let token = after.find("}}").and_then(|close| {
                let value = self.value_of(&after[..close], values)?;
                Some((value, &after[close + 2..]))
            });
            match token {
                Some((value, tail)) => {
                    out.push_str(value);
                    rest = tail;
                }
                None => {
                    out.push_str("{{");
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn value_of<'v>(&self, name: &str, values: &'v HashMap<&str, String>) -> Option<&'v str> {
        let variable = self.variables.iter().find(|variable| variable.name == name)?;
        values.get(name).map(String::as_str).or(variable.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs
            .iter()
            .map(|(name, value)| (*name, (*value).to_string()))
            .collect()
    }

    #[test]
    fn workflow_prompt_fills_defaults_and_keeps_expressions() {
        let rendered = PromptTemplate::workflow_generation()
            .render(&values(&[
                ("description", "send a daily slack summary"),
                ("node_types", "- n8n-nodes-base.slack (v1, v2) requires: text"),
                ("json", "oops"),
            ]))
            .expect("all required");

        assert!(rendered.user.contains("Description: send a daily slack summary"));
        assert!(rendered.user.contains("Trigger: manual"));
        assert!(rendered.user.contains("(2-3 nodes)"));
        assert!(rendered.user.contains("{{ $json.field }}"));
        assert!(!rendered.user.contains("{{description}}"));
        assert!(rendered.system.contains("exactly one JSON object"));
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let rendered = PromptTemplate::workflow_generation()
            .render(&values(&[
                ("description", "copy {{node_types}} and {{complexity}} verbatim"),
                ("node_types", "- n8n-nodes-base.noOp (v1) requires: nothing"),
            ]))
            .expect("all required");

        assert!(
            rendered
                .user
                .contains("Description: copy {{node_types}} and {{complexity}} verbatim")
        );
        assert_eq!(rendered.user.matches("n8n-nodes-base.noOp").count(), 1);
        assert!(rendered.user.contains("Complexity: simple (2-3 nodes)"));
    }

    #[test]
    fn missing_required_variables_are_named() {
        let err = PromptTemplate::workflow_generation()
            .render(&values(&[("complexity", "medium")]))
            .expect_err("missing");
        assert_eq!(
            err,
            PromptError::MissingVariables {
                template: WORKFLOW_GENERATION,
                variables: vec!["description", "node_types"],
            }
        );
    }

    #[test]
    fn supplied_values_override_defaults() {
        const VARIABLES: &[Variable] = &[
            Variable::required("who"),
            Variable::defaulted("tone", "plainly"),
        ];
        let template =
            PromptTemplate::new("greet", "Answer {{tone}}.", "Greet {{who}}.", VARIABLES);

        let rendered = template
            .render(&values(&[("who", "the ops team"), ("tone", "briefly")]))
            .expect("rendered");
        assert_eq!(
            rendered,
            RenderedPrompt {
                system: "Answer briefly.".to_string(),
                user: "Greet the ops team.".to_string(),
            }
        );
    }
}
