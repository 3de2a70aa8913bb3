//! Configuration for the SQL linter.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main-phase pass budget used when none is configured.
pub const DEFAULT_RUNAWAY_LIMIT: usize = 10;

/// Configuration for the SQL linter.
///
/// Controls which rules run, their options, and the fix loop budget. By
/// default, all bundled rules are enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LintConfig {
    /// Master toggle for linting (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Rule codes or dotted names to disable (e.g., ["LT01", "capitalisation.keywords"]).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_rules: Vec<String>,

    /// Optional allowlist; when set, only these rules run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<String>>,

    /// Maximum number of main-phase passes in fix mode (default: 10, minimum: 1).
    #[serde(default = "default_runaway_limit")]
    pub runaway_limit: usize,

    /// Per-rule options keyed by rule code, e.g. `{"CP01": {"capitalisation_policy": "lower"}}`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rule_options: BTreeMap<String, serde_json::Value>,

    /// Drop violations whose span touches templated or block slices.
    #[serde(default)]
    pub ignore_templated_areas: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_rules: Vec::new(),
            rules: None,
            runaway_limit: DEFAULT_RUNAWAY_LIMIT,
            rule_options: BTreeMap::new(),
            ignore_templated_areas: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_runaway_limit() -> usize {
    DEFAULT_RUNAWAY_LIMIT
}

impl LintConfig {
    /// Returns true if the rule identified by `code` (or its dotted `name`) is enabled.
    pub fn is_rule_enabled(&self, code: &str, name: &str) -> bool {
        let matches = |entry: &String| {
            let entry = entry.trim();
            entry.eq_ignore_ascii_case(code) || (!name.is_empty() && entry.eq_ignore_ascii_case(name))
        };
        self.enabled
            && !self.disabled_rules.iter().any(matches)
            && self
                .rules
                .as_ref()
                .is_none_or(|allowed| allowed.iter().any(matches))
    }

    /// Runaway limit clamped to at least one pass.
    pub fn effective_runaway_limit(&self) -> usize {
        self.runaway_limit.max(1)
    }

    pub fn with_runaway_limit(mut self, limit: usize) -> Self {
        self.runaway_limit = limit;
        self
    }

    pub fn with_rule_option(mut self, code: &str, key: &str, value: serde_json::Value) -> Self {
        let entry = self
            .rule_options
            .entry(code.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if let serde_json::Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
        self
    }

    /// Looks up a string option for `code`.
    pub fn rule_option_str(&self, code: &str, key: &str) -> Option<&str> {
        self.rule_option(code, key)?.as_str()
    }

    /// Looks up a list option given either as a JSON array or a comma-separated string.
    pub fn rule_option_string_list(&self, code: &str, key: &str) -> Option<Vec<String>> {
        match self.rule_option(code, key)? {
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect(),
            ),
            serde_json::Value::String(raw) => Some(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn rule_option(&self, code: &str, key: &str) -> Option<&serde_json::Value> {
        self.rule_options
            .iter()
            .find(|(rule, _)| rule.eq_ignore_ascii_case(code))
            .and_then(|(_, options)| options.get(key))
    }
}
