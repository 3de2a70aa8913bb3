//! LINT_CP_001: Keyword capitalisation.
//!
//! Keywords follow `capitalisation_policy`: `upper`, `lower`, `capitalise`
//! or `consistent` (the default), where the first keyword in the file sets
//! the case for the rest. Words listed in `ignore_words` are skipped.

use std::collections::HashSet;

use crate::linter::config::LintConfig;
use crate::linter::context::RuleContext;
use crate::linter::fix::{Fix, Violation};
use crate::linter::rule::{LintRule, RuleDescriptor, RuleError};
use crate::query::NodeRef;
use crate::tree::{node_types, Segment};
use crate::types::issue_codes;

const POLICY_KEY: &str = "capitalisation_policy";

const DESCRIPTOR: RuleDescriptor = RuleDescriptor::new(
    issue_codes::LINT_CP_001,
    "capitalisation.keywords",
    "Inconsistent capitalisation of keywords.",
)
.post_phase()
.with_raw_stack();

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CapitalisationPolicy {
    Consistent,
    Upper,
    Lower,
    Capitalise,
}

impl CapitalisationPolicy {
    pub fn from_raw_value(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "consistent" => Some(Self::Consistent),
            "upper" | "uppercase" => Some(Self::Upper),
            "lower" | "lowercase" => Some(Self::Lower),
            "capitalise" | "capitalize" => Some(Self::Capitalise),
            _ => None,
        }
    }

    /// The policy a keyword already follows, if its case is unambiguous.
    fn of(token: &str) -> Option<Self> {
        if !token.chars().any(|ch| ch.is_ascii_alphabetic()) {
            return None;
        }
        if token == token.to_ascii_uppercase() {
            Some(Self::Upper)
        } else if token == token.to_ascii_lowercase() {
            Some(Self::Lower)
        } else if token == capitalise(token) {
            Some(Self::Capitalise)
        } else {
            None
        }
    }

    fn apply(self, token: &str) -> String {
        match self {
            Self::Consistent => token.to_string(),
            Self::Upper => token.to_ascii_uppercase(),
            Self::Lower => token.to_ascii_lowercase(),
            Self::Capitalise => capitalise(token),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Consistent => "consistent",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Capitalise => "capitalised",
        }
    }
}

fn capitalise(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut seen_alpha = false;
    for ch in token.chars() {
        if ch.is_ascii_alphabetic() && !seen_alpha {
            out.push(ch.to_ascii_uppercase());
            seen_alpha = true;
        } else {
            out.push(ch.to_ascii_lowercase());
        }
    }
    out
}

pub struct CapitalisationKeywords {
    policy: Result<CapitalisationPolicy, String>,
    ignore_words: HashSet<String>,
}

impl CapitalisationKeywords {
    pub fn from_config(config: &LintConfig) -> Self {
        let policy = match config.rule_option_str(issue_codes::LINT_CP_001, POLICY_KEY) {
            Some(raw) => CapitalisationPolicy::from_raw_value(raw).ok_or_else(|| raw.to_string()),
            None => Ok(CapitalisationPolicy::Consistent),
        };
        let ignore_words = config
            .rule_option_string_list(issue_codes::LINT_CP_001, "ignore_words")
            .unwrap_or_default()
            .into_iter()
            .map(|word| word.to_ascii_uppercase())
            .collect();
        Self {
            policy,
            ignore_words,
        }
    }

    pub fn with_policy(policy: CapitalisationPolicy) -> Self {
        Self {
            policy: Ok(policy),
            ignore_words: HashSet::new(),
        }
    }

    fn is_tracked(&self, node: &NodeRef<'_>) -> bool {
        node.is_type(&[node_types::KEYWORD])
            && !self
                .ignore_words
                .contains(&node.text().to_ascii_uppercase())
    }

    /// Policy to enforce at the current keyword, or `None` when the current
    /// keyword is the one that sets a consistent policy.
    fn target_policy(
        &self,
        policy: CapitalisationPolicy,
        ctx: &RuleContext<'_>,
    ) -> Option<CapitalisationPolicy> {
        if policy != CapitalisationPolicy::Consistent {
            return Some(policy);
        }
        ctx.raw_stack()
            .iter()
            .filter(|leaf| self.is_tracked(leaf))
            .find_map(|leaf| CapitalisationPolicy::of(leaf.text()))
    }
}

impl Default for CapitalisationKeywords {
    fn default() -> Self {
        Self::with_policy(CapitalisationPolicy::Consistent)
    }
}

impl LintRule for CapitalisationKeywords {
    fn descriptor(&self) -> RuleDescriptor {
        DESCRIPTOR
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let policy = match &self.policy {
            Ok(policy) => *policy,
            // Reported once per crawl, at the root.
            Err(value) if ctx.segment == ctx.tree.root() => {
                return Err(RuleError::InvalidOption {
                    key: POLICY_KEY.to_string(),
                    value: value.clone(),
                })
            }
            Err(_) => return Ok(Vec::new()),
        };

        let segment = ctx.segment();
        if !self.is_tracked(&segment) {
            return Ok(Vec::new());
        }
        let Some(target) = self.target_policy(policy, ctx) else {
            return Ok(Vec::new());
        };
        let fixed = target.apply(segment.text());
        if fixed == segment.text() {
            return Ok(Vec::new());
        }

        Ok(vec![ctx
            .violation(
                format!("Keywords must be {} case.", target.label()),
                &segment,
            )
            .with_fix(Fix::replace(
                &segment,
                vec![Segment::leaf(node_types::KEYWORD, &fixed)],
            ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linter::rules::test_support::{fix, lint};
    use crate::types::{issue_codes, Severity};

    fn with_options(options: serde_json::Value) -> CapitalisationKeywords {
        let mut config = LintConfig::default();
        if let serde_json::Value::Object(map) = options {
            for (key, value) in map {
                config = config.with_rule_option("CP01", &key, value);
            }
        }
        CapitalisationKeywords::from_config(&config)
    }

    #[test]
    fn consistent_follows_first_keyword() {
        let result = lint(CapitalisationKeywords::default(), "SELECT a from t WHERE b");
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].description, "Keywords must be upper case.");
        assert_eq!(result.violations[0].span.start, 9);
    }

    #[test]
    fn consistent_mixed_file_is_fixed_to_first_case() {
        let result = fix(CapitalisationKeywords::default(), "select a FROM t Where b");
        assert_eq!(result.fixed_sql, "select a from t where b");
        assert!(result.violations.is_empty());
    }

    #[test]
    fn explicit_policies() {
        let upper = with_options(serde_json::json!({ "capitalisation_policy": "upper" }));
        assert_eq!(fix(upper, "select a from t").fixed_sql, "SELECT a FROM t");

        let capitalise = with_options(serde_json::json!({ "capitalisation_policy": "capitalise" }));
        assert_eq!(fix(capitalise, "SELECT a from t").fixed_sql, "Select a From t");
    }

    #[test]
    fn identifiers_and_ignored_words_are_untouched() {
        let rule = with_options(serde_json::json!({
            "capitalisation_policy": "lower",
            "ignore_words": ["FROM"],
        }));
        assert_eq!(fix(rule, "SELECT Name FROM t").fixed_sql, "select Name FROM t");
    }

    #[test]
    fn invalid_policy_is_a_single_rule_error() {
        let rule = with_options(serde_json::json!({ "capitalisation_policy": "shouty" }));
        let result = lint(rule, "select a from t");
        assert!(result.violations.is_empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, issue_codes::RULE_INTERNAL_ERROR);
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
        assert!(result.diagnostics[0].message.contains("shouty"));
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(
            CapitalisationPolicy::from_raw_value("Capitalize"),
            Some(CapitalisationPolicy::Capitalise)
        );
        assert_eq!(CapitalisationPolicy::from_raw_value("pascal"), None);
        assert_eq!(CapitalisationPolicy::of("Select"), Some(CapitalisationPolicy::Capitalise));
        assert_eq!(CapitalisationPolicy::of("sElect"), None);
    }
}
