//! SQL linter module.
//!
//! The [`Linter`] owns a closed table of rules and drives them over a tree:
//! [`Linter::lint`] makes one read-only pass, [`Linter::fix`] runs the phased
//! convergence loop. The main phase re-crawls until a pass is clean, stops
//! changing the tree, or hits the runaway limit; the post phase then runs the
//! post rules exactly twice, once to fix and once to confirm.

pub mod config;
mod context;
mod crawler;
mod fix;
mod noqa;
mod result;
pub mod rule;
pub mod rules;

pub use config::LintConfig;
pub use context::RuleContext;
pub use fix::{Fix, FixKind, FixRejection, FixValidator, Violation};
pub use noqa::NoqaMap;
pub use result::{FixResult, LintResult, PassRecord};
pub use rule::{LintPhase, LintRule, RuleDescriptor, RuleError};

use crate::slice::SliceMap;
use crate::tree::{TextEdit, Tree, TreeError};
use crate::types::{issue_codes, Dialect, Issue, Severity};
use crawler::Crawler;
#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// The SQL linter, holding a set of rules and configuration.
pub struct Linter {
    rules: Vec<Box<dyn LintRule>>,
    config: LintConfig,
    dialect: Dialect,
}

/// Mutable state threaded through the passes of one `fix` call.
struct FixState {
    tree: Tree,
    slices: SliceMap,
    diagnostics: Vec<Issue>,
    passes: Vec<PassRecord>,
    changed: bool,
}

struct PassOutcome {
    found: usize,
    applied: usize,
    unresolved: Vec<Violation>,
}

impl Linter {
    /// Creates a linter with the bundled rule table.
    pub fn new(config: LintConfig) -> Self {
        Self {
            rules: rules::all_rules(&config),
            config,
            dialect: Dialect::Generic,
        }
    }

    /// Creates a linter over an explicit rule table, in registration order.
    pub fn with_rules(config: LintConfig, rules: Vec<Box<dyn LintRule>>) -> Self {
        Self {
            rules,
            config,
            dialect: Dialect::Generic,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Returns true if linting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// Enabled rules in registration order.
    pub fn active_rules(&self) -> Vec<&dyn LintRule> {
        self.rules
            .iter()
            .map(Box::as_ref)
            .filter(|rule| {
                let descriptor = rule.descriptor();
                self.config
                    .is_rule_enabled(descriptor.code, descriptor.name)
            })
            .collect()
    }

    fn rules_in_phase(&self, phase: LintPhase) -> Vec<&dyn LintRule> {
        self.active_rules()
            .into_iter()
            .filter(|rule| rule.descriptor().lint_phase == phase)
            .collect()
    }

    /// One read-only pass with every rule, post rules included. Fixes are
    /// validated to set [`Violation::fixable`] but never applied.
    pub fn lint(&self, tree: &Tree, slices: &SliceMap) -> LintResult {
        if !self.config.enabled {
            return LintResult {
                violations: Vec::new(),
                diagnostics: Vec::new(),
                passes: Vec::new(),
            };
        }

        let rules = self.active_rules();
        let mut diagnostics = Vec::new();
        let outcome = self.check_pass(tree, slices, &rules, false, &mut diagnostics);
        LintResult {
            violations: normalize_violations(outcome.unresolved),
            diagnostics: normalize_diagnostics(diagnostics),
            passes: vec![PassRecord {
                phase: LintPhase::Main,
                index: 1,
                violations_found: outcome.found,
                fixes_applied: 0,
            }],
        }
    }

    /// Runs the phased fix loop and returns the final text with every
    /// violation left unresolved.
    pub fn fix(&self, tree: Tree, slices: SliceMap) -> FixResult {
        self.fix_inner(tree, slices).0
    }

    /// Like [`Linter::fix`], additionally rebuilding the fixed original
    /// source through the slice map when every edit stayed in literal text.
    pub fn fix_source(&self, source: &str, tree: Tree, slices: SliceMap) -> FixResult {
        let (mut result, slices) = self.fix_inner(tree, slices);
        result.fixed_source = slices.reconstruct_source(source, &result.fixed_sql);
        result
    }

    fn fix_inner(&self, tree: Tree, slices: SliceMap) -> (FixResult, SliceMap) {
        let mut state = FixState {
            tree,
            slices,
            diagnostics: Vec::new(),
            passes: Vec::new(),
            changed: false,
        };
        if !self.config.enabled {
            return self.finish(state, Vec::new(), true);
        }

        let all_rules = self.active_rules();
        let main_rules = self.rules_in_phase(LintPhase::Main);
        let post_rules = self.rules_in_phase(LintPhase::Post);
        let limit = self.config.effective_runaway_limit();

        #[cfg(feature = "tracing")]
        info!(
            rules = all_rules.len(),
            runaway_limit = limit,
            "starting fix loop"
        );

        let mut main_clean = false;
        let mut runaway = false;
        for index in 1..=limit {
            // Post rules join only the first main pass.
            let rules = if index == 1 { &all_rules } else { &main_rules };
            let outcome = self.fix_pass(&mut state, rules, LintPhase::Main, index);
            if outcome.found == 0 {
                main_clean = true;
                break;
            }
            if outcome.applied == 0 {
                break;
            }
            if index == limit {
                runaway = true;
            }
        }

        self.fix_pass(&mut state, &post_rules, LintPhase::Post, 1);
        let mut unresolved = self.confirm_pass(&mut state, &post_rules, LintPhase::Post, 2);

        // Re-check the main rules on the final tree so reported spans match
        // the returned text.
        let mut converged = true;
        if !main_clean {
            let outcome = self.check_pass(
                &state.tree,
                &state.slices,
                &main_rules,
                false,
                &mut state.diagnostics,
            );
            if runaway && outcome.found > 0 {
                converged = false;
                #[cfg(feature = "tracing")]
                warn!(
                    runaway_limit = limit,
                    outstanding = outcome.found,
                    "fix loop did not converge"
                );
                state.diagnostics.push(Issue::warning(
                    issue_codes::RUNAWAY_LIMIT_EXCEEDED,
                    format!(
                        "Fix loop did not converge within {limit} main passes; {} violation(s) remain",
                        outcome.found
                    ),
                ));
            }
            unresolved.extend(outcome.unresolved);
        }

        self.finish(state, unresolved, converged)
    }

    fn finish(
        &self,
        state: FixState,
        unresolved: Vec<Violation>,
        converged: bool,
    ) -> (FixResult, SliceMap) {
        let result = FixResult {
            fixed_sql: state.tree.raw(),
            fixed_source: None,
            violations: normalize_violations(unresolved),
            diagnostics: normalize_diagnostics(state.diagnostics),
            passes: state.passes,
            converged,
            changed: state.changed,
        };
        (result, state.slices)
    }

    /// A recorded pass that validates but does not apply fixes.
    fn confirm_pass(
        &self,
        state: &mut FixState,
        rules: &[&dyn LintRule],
        phase: LintPhase,
        index: usize,
    ) -> Vec<Violation> {
        let outcome = self.check_pass(
            &state.tree,
            &state.slices,
            rules,
            false,
            &mut state.diagnostics,
        );
        state.passes.push(PassRecord {
            phase,
            index,
            violations_found: outcome.found,
            fixes_applied: 0,
        });
        outcome.unresolved
    }

    /// Crawls once and marks which violations could be fixed.
    fn check_pass(
        &self,
        tree: &Tree,
        slices: &SliceMap,
        rules: &[&dyn LintRule],
        fix_mode: bool,
        diagnostics: &mut Vec<Issue>,
    ) -> PassOutcome {
        let outcome = Crawler::new(tree, slices, self.dialect, fix_mode, rules).crawl();
        diagnostics.extend(outcome.diagnostics);

        let noqa = NoqaMap::from_tree(tree);
        let mut validator = FixValidator::new(tree, slices);
        let mut unresolved = Vec::new();
        for (rule, violations) in rules.iter().zip(outcome.per_rule) {
            let template_aware = rule.descriptor().template_aware;
            for mut violation in violations {
                if !self.is_reportable(&violation, &noqa, slices) {
                    continue;
                }
                violation.fixable = violation.has_fixes()
                    && validator.claim(&violation.fixes, template_aware).is_ok();
                unresolved.push(violation);
            }
        }
        PassOutcome {
            found: unresolved.len(),
            applied: 0,
            unresolved,
        }
    }

    /// Crawls once, applies every accepted fix and records the pass.
    fn fix_pass(
        &self,
        state: &mut FixState,
        rules: &[&dyn LintRule],
        phase: LintPhase,
        index: usize,
    ) -> PassOutcome {
        let outcome = Crawler::new(&state.tree, &state.slices, self.dialect, true, rules).crawl();
        state.diagnostics.extend(outcome.diagnostics);

        let noqa = NoqaMap::from_tree(&state.tree);
        let mut validator = FixValidator::new(&state.tree, &state.slices);
        let mut accepted = Vec::new();
        let mut unresolved = Vec::new();
        let mut found = 0;
        for (rule, violations) in rules.iter().zip(outcome.per_rule) {
            let template_aware = rule.descriptor().template_aware;
            for mut violation in violations {
                if !self.is_reportable(&violation, &noqa, &state.slices) {
                    continue;
                }
                found += 1;
                if !violation.has_fixes() {
                    unresolved.push(violation);
                    continue;
                }
                match validator.claim(&violation.fixes, template_aware) {
                    Ok(()) => {
                        violation.fixable = true;
                        accepted.push(violation);
                    }
                    Err(rejection) => {
                        #[cfg(feature = "tracing")]
                        debug!(rule = %violation.rule_code, reason = %rejection, "fix rejected");
                        state.diagnostics.push(rejection.to_issue(&violation));
                        unresolved.push(violation);
                    }
                }
            }
        }

        let mut applied = 0;
        for violation in accepted {
            match apply_violation(&state.tree, &violation) {
                Ok((tree, edits)) => {
                    #[cfg(feature = "tracing")]
                    debug!(rule = %violation.rule_code, fixes = violation.fixes.len(), generation = tree.generation(), "fix applied");
                    state.tree = tree;
                    for edit in &edits {
                        state.slices.apply_edit(edit);
                    }
                    applied += violation.fixes.len();
                    state.changed = true;
                }
                Err(err) => {
                    let rejection = FixRejection::from(err);
                    state.diagnostics.push(rejection.to_issue(&violation));
                    unresolved.push(violation);
                }
            }
        }

        #[cfg(feature = "tracing")]
        debug!(?phase, pass = index, found, applied, "pass complete");

        state.passes.push(PassRecord {
            phase,
            index,
            violations_found: found,
            fixes_applied: applied,
        });
        PassOutcome {
            found,
            applied,
            unresolved,
        }
    }

    fn is_reportable(&self, violation: &Violation, noqa: &NoqaMap, slices: &SliceMap) -> bool {
        if noqa.suppresses(violation) {
            return false;
        }
        !(self.config.ignore_templated_areas
            && slices
                .slices_touching(violation.span)
                .iter()
                .any(|slice| !slice.is_literal()))
    }
}

/// Applies all of a violation's fixes in order, or none of them.
///
/// The round-trip invariant is re-checked after every single application.
fn apply_violation(
    tree: &Tree,
    violation: &Violation,
) -> Result<(Tree, Vec<TextEdit>), TreeError> {
    let mut current: Option<Tree> = None;
    let mut edits = Vec::with_capacity(violation.fixes.len());
    for fix in &violation.fixes {
        let base = current.as_ref().unwrap_or(tree);
        let before = base.raw();
        let (next, edit) = base.apply_fix(fix)?;
        let inserted: String = fix.splice_content().iter().map(|s| s.raw()).collect();
        let expected = edit.apply_to(&before, &inserted).ok_or(TreeError::RoundTrip {
            expected_len: before.len(),
            actual_len: next.span_len(),
        })?;
        next.check_round_trip(&expected)?;
        edits.push(edit);
        current = Some(next);
    }
    match current {
        Some(next) => Ok((next, edits)),
        None => Ok((tree.clone(), edits)),
    }
}

/// Sorts by position and drops duplicates of (rule, span, description).
fn normalize_violations(mut violations: Vec<Violation>) -> Vec<Violation> {
    violations.sort_by(|left, right| violation_sort_key(left).cmp(&violation_sort_key(right)));
    violations.dedup_by(|left, right| left.dedup_key() == right.dedup_key());
    violations
}

fn violation_sort_key(violation: &Violation) -> (usize, usize, &str, &str) {
    (
        violation.span.start,
        violation.span.end,
        violation.rule_code.as_str(),
        violation.description.as_str(),
    )
}

fn normalize_diagnostics(mut issues: Vec<Issue>) -> Vec<Issue> {
    issues.sort_by(|left, right| issue_sort_key(left).cmp(&issue_sort_key(right)));
    issues.dedup();
    issues
}

fn issue_sort_key(issue: &Issue) -> (usize, usize, u8, &str, &str) {
    (
        issue.span.map_or(usize::MAX, |span| span.start),
        issue.span.map_or(usize::MAX, |span| span.end),
        severity_rank(issue.severity),
        issue.code.as_str(),
        issue.message.as_str(),
    )
}

const fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Error => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    }
}
