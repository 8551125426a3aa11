//! Inter-node data reference checks.
//!
//! Parameter values may embed `{{ ... }}` references to data produced by
//! earlier nodes. Only a small accessor vocabulary resolves when the
//! workflow runs; generic-looking roots such as `data.x` or `item.x` read
//! as plausible but fail at execution time, so they are rejected outright.
//!
//! Classification of a string:
//! 1. no `{{ }}` segment → [`ExpressionClass::NotAnExpression`]
//! 2. any segment matching a rejected rule → [`ExpressionClass::InvalidPattern`]
//! 3. any segment matching an accepted rule → [`ExpressionClass::Valid`]
//! 4. otherwise the text passes through unchecked as a literal

use crate::rules::{PatternRule, compile_table, first_match};
use regex::Regex;
use std::sync::LazyLock;

const ACCEPTED: &[(&str, &str)] = &[
    ("json_field", r"^\$json\.[A-Za-z_$][\w$]*"),
    ("json_bracket", r#"^\$json\[\s*(?:'[^']+'|"[^"]+")\s*\]"#),
    (
        "node_scoped",
        r#"^\$\(\s*(?:'[^']+'|"[^"]+")\s*\)\.(?:item\b|first\(\)|last\(\)|all\(\))"#,
    ),
    ("node_legacy", r#"^\$node\[\s*(?:'[^']+'|"[^"]+")\s*\]\.json"#),
    ("input_all", r"^\$input\.all\(\)"),
    ("input_first", r"^\$input\.(?:first\(\)|last\(\)|item\b)"),
];

const REJECTED: &[(&str, &str)] = &[
    ("bare_data", r"^\$?data\s*(?:\.|\[)"),
    ("bare_item", r"^\$?items?\s*(?:\.|\[)"),
    ("bare_json", r"^json\s*(?:\.|\[)"),
    ("bare_input", r"^input\s*(?:\.|\[)"),
    ("bare_body", r"^\$?(?:body|payload)\s*(?:\.|\[)"),
];

static SEGMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{(.*?)\}\}").expect("segment pattern must compile")
});
static ACCEPTED_RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| compile_table(ACCEPTED));
static REJECTED_RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| compile_table(REJECTED));

/// Result of classifying one string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionClass {
    /// Contains at least one reference using the accepted vocabulary.
    Valid,
    /// Contains a reference using a known-bad form.
    InvalidPattern {
        /// The offending `{{ }}` body, trimmed.
        segment: String,
        /// Name of the rejected rule that matched.
        rule: String,
    },
    /// Literal text.
    NotAnExpression,
}

/// Stateless reference-expression classifier.
#[derive(Debug, Clone)]
pub struct ExpressionValidator {
    segments: Regex,
    accepted: Vec<PatternRule>,
    rejected: Vec<PatternRule>,
}

impl ExpressionValidator {
    /// Creates a validator with the built-in rule tables.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rules(ACCEPTED_RULES.clone(), REJECTED_RULES.clone())
    }

    /// Creates a validator with custom ordered rule tables.
    #[must_use]
    pub fn with_rules(accepted: Vec<PatternRule>, rejected: Vec<PatternRule>) -> Self {
        Self {
            segments: SEGMENTS.clone(),
            accepted,
            rejected,
        }
    }

    /// Classifies a parameter string.
    #[must_use]
    pub fn classify(&self, text: &str) -> ExpressionClass {
        let segments: Vec<&str> = self
            .segments
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .collect();

        for segment in &segments {
            if let Some(rule) = first_match(&self.rejected, segment) {
                return ExpressionClass::InvalidPattern {
                    segment: (*segment).to_string(),
                    rule: rule.name().to_string(),
                };
            }
        }

        if segments
            .iter()
            .any(|segment| first_match(&self.accepted, segment).is_some())
        {
            ExpressionClass::Valid
        } else {
            ExpressionClass::NotAnExpression
        }
    }
}

impl Default for ExpressionValidator {
    fn default() -> Self {
        Self::new()
    }
}
