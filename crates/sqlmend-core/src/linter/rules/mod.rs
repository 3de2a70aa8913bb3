//! Lint rule implementations and registry.

use super::config::LintConfig;
use super::rule::LintRule;

pub mod cp_001;
pub mod lt_001;
pub mod lt_002;
pub mod lt_004;
pub mod lt_012;

/// Returns all bundled lint rules in registration order.
///
/// Registration order is also fix priority: when two rules' fixes overlap in
/// one pass, the rule listed first wins and the other retries next pass.
pub fn all_rules(config: &LintConfig) -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(lt_001::ExcessWhitespace),
        Box::new(lt_002::TrailingWhitespace),
        Box::new(lt_004::SpaceBeforeComma),
        Box::new(cp_001::CapitalisationKeywords::from_config(config)),
        Box::new(lt_012::LayoutEndOfFile),
    ]
}
