//! Named pattern rules.
//!
//! Expression and placeholder checks are driven by ordered tables of named
//! regular expressions so the rule sets can be tested and extended without
//! touching the passes that apply them.

use regex::Regex;

/// A named regular expression.
#[derive(Debug, Clone)]
pub struct PatternRule {
    name: String,
    pattern: Regex,
}

impl PatternRule {
    /// Compiles a rule.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` does not compile.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Compiles a built-in table.
///
/// Only called from `LazyLock` initializers over literal tables, each of
/// which has a test that forces it. A pattern that fails to compile is a
/// programming error.
pub(crate) fn compile_table(table: &[(&str, &str)]) -> Vec<PatternRule> {
    table
        .iter()
        .map(|(name, pattern)| {
            PatternRule::new(*name, pattern).expect("built-in pattern rule must compile")
        })
        .collect()
}

/// Returns the first rule in `rules` that matches `text`.
pub(crate) fn first_match<'a>(rules: &'a [PatternRule], text: &str) -> Option<&'a PatternRule> {
    rules.iter().find(|rule| rule.matches(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_respects_order() {
        let rules = compile_table(&[("digits", r"^\d+$"), ("anything", r".*")]);
        assert_eq!(first_match(&rules, "42").map(PatternRule::name), Some("digits"));
        assert_eq!(first_match(&rules, "x").map(PatternRule::name), Some("anything"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        assert!(PatternRule::new("broken", "(").is_err());
    }
}
