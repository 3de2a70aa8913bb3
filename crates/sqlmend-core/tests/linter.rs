//! Integration tests for the lint and fix loops.
//!
//! Custom rules are registered through `Linter::with_rules`; the bundled
//! rules run through `Linter::new` and the `lint_sql`/`fix_sql` entry points.

mod common;

use common::{parse, AppendMarker, Recorder, RemoveMarker, MARKER};
use rstest::rstest;
use sqlmend_core::linter::rules::cp_001::CapitalisationKeywords;
use sqlmend_core::linter::rules::lt_001::ExcessWhitespace;
use sqlmend_core::tree::node_types;
use sqlmend_core::{
    fix_sql, issue_codes, lint_sql, Fix, LintConfig, LintPhase, LintRequest, LintRule, Linter,
    RuleContext, RuleDescriptor, RuleError, Segment, Severity, SliceKind, SliceMap, Span,
    TemplateSlice, Violation,
};
use std::collections::HashSet;

fn only(codes: &[&str]) -> LintConfig {
    LintConfig {
        rules: Some(codes.iter().map(|code| code.to_string()).collect()),
        ..LintConfig::default()
    }
}

#[test]
fn collapses_excess_whitespace_in_two_passes() {
    let linter = Linter::new(only(&["LT01"]));
    let (tree, slices) = parse("select   1");

    let result = linter.fix(tree, slices);

    assert_eq!(result.fixed_sql, "select 1");
    assert_eq!(result.main_passes(), 2);
    assert!(result.converged);
    assert!(result.changed);
    assert!(result.violations.is_empty());
    assert_eq!(result.passes[0].fixes_applied, 1);
    assert_eq!(result.passes[1].violations_found, 0);
}

#[test]
fn oscillating_rules_stop_at_the_runaway_limit() {
    let linter = Linter::with_rules(
        LintConfig::default().with_runaway_limit(3),
        vec![Box::new(AppendMarker), Box::new(RemoveMarker)],
    );
    let (tree, slices) = parse("select 1");

    let result = linter.fix(tree, slices);

    assert_eq!(result.main_passes(), 3);
    assert!(!result.converged);
    // Pass 3 appended the marker again.
    assert_eq!(result.fixed_sql, format!("select 1{MARKER}"));
    let warning = result
        .diagnostics
        .iter()
        .find(|issue| issue.code == issue_codes::RUNAWAY_LIMIT_EXCEEDED)
        .expect("non-convergence warning");
    assert_eq!(warning.severity, Severity::Warning);
    let codes: Vec<&str> = result.violations.iter().map(|v| v.rule_code.as_str()).collect();
    assert_eq!(codes, vec!["XX02"]);
}

/// Grows the file by one space on every visit.
struct Grow;

impl LintRule for Grow {
    fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor::new("XX03", "test.grow", "Always wants more.").no_recurse()
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let root = ctx.root();
        Ok(vec![ctx.violation("More.", &root).with_fix(Fix::insert_after(
            &root,
            vec![Segment::leaf(node_types::WHITESPACE, " ")],
        ))])
    }
}

#[test]
fn default_runaway_limit_is_ten_passes() {
    let linter = Linter::with_rules(LintConfig::default(), vec![Box::new(Grow)]);
    let (tree, slices) = parse("select 1");

    let result = linter.fix(tree, slices);

    assert_eq!(result.main_passes(), 10);
    assert_eq!(result.fixed_sql, format!("select 1{}", " ".repeat(10)));
    assert!(!result.converged);
}

#[test]
fn runaway_limit_of_zero_still_runs_one_pass() {
    let linter = Linter::with_rules(LintConfig::default().with_runaway_limit(0), vec![Box::new(Grow)]);
    let (tree, slices) = parse("select 1");
    assert_eq!(linter.fix(tree, slices).main_passes(), 1);
}

#[test]
fn post_phase_runs_exactly_twice_and_joins_the_first_main_pass() {
    let recorder = Recorder::new(RuleDescriptor::new("XX04", "test.post", "Post.").no_recurse().post_phase());
    let visits = recorder.visits.clone();
    let linter = Linter::with_rules(
        LintConfig::default(),
        vec![Box::new(ExcessWhitespace), Box::new(recorder)],
    );
    let (tree, slices) = parse("select   1");

    let result = linter.fix(tree, slices);

    assert_eq!(result.main_passes(), 2);
    let post_passes: Vec<usize> = result
        .passes
        .iter()
        .filter(|pass| pass.phase == LintPhase::Post)
        .map(|pass| pass.index)
        .collect();
    assert_eq!(post_passes, vec![1, 2]);
    // Main pass 1, then post passes 1 and 2.
    assert_eq!(visits.lock().unwrap().len(), 3);
}

#[test]
fn each_node_is_visited_once_per_rule_per_pass() {
    let recorder = Recorder::new(RuleDescriptor::new("XX05", "test.record", "Record."));
    let visits = recorder.visits.clone();
    let linter = Linter::with_rules(LintConfig::default(), vec![Box::new(recorder)]);
    let (tree, slices) = parse("select a, (b + 1) from t;\nselect 2");

    linter.lint(&tree, &slices);

    let visits = visits.lock().unwrap();
    let unique: HashSet<_> = visits.iter().map(|(id, _)| *id).collect();
    assert_eq!(unique.len(), visits.len());
    assert_eq!(visits.len(), tree.preorder(tree.root()).len());
}

#[test]
fn unparsable_regions_are_skipped_unless_the_rule_opts_in() {
    let skipping = Recorder::new(RuleDescriptor::new("XX06", "test.skip", "Skip.").skip_unparsable());
    let skipped_visits = skipping.visits.clone();
    let tolerant = Recorder::new(RuleDescriptor::new("XX07", "test.all", "All."));
    let tolerant_visits = tolerant.visits.clone();
    let linter = Linter::with_rules(
        LintConfig::default(),
        vec![Box::new(skipping), Box::new(tolerant)],
    );
    let (tree, slices) = parse("select 1; selec oops from; select 2");

    linter.lint(&tree, &slices);

    let skipped = skipped_visits.lock().unwrap();
    assert!(skipped
        .iter()
        .all(|(id, node_type)| node_type != node_types::UNPARSABLE && !tree.is_within_unparsable(*id)));
    let tolerant = tolerant_visits.lock().unwrap();
    assert!(tolerant.iter().any(|(_, node_type)| node_type == node_types::UNPARSABLE));
    assert!(tolerant.len() > skipped.len());
}

#[test]
fn fixes_into_generated_text_are_rejected_and_left_unresolved() {
    let linter = Linter::new(only(&["LT01"]));
    let (tree, _) = parse("select   a");
    // "   " came out of a template expression.
    let slices = SliceMap::new(
        vec![
            TemplateSlice::new(SliceKind::Literal, Span::new(0, 6), Span::new(0, 6)),
            TemplateSlice::new(SliceKind::Templated, Span::new(6, 9), Span::new(6, 15)),
            TemplateSlice::new(SliceKind::Literal, Span::new(9, 10), Span::new(15, 16)),
        ],
        10,
    )
    .unwrap();

    let result = linter.fix(tree, slices);

    assert_eq!(result.fixed_sql, "select   a");
    assert!(!result.changed);
    assert!(result.converged);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].span, Span::new(6, 9));
    assert!(!result.violations[0].fixable);
    assert!(result
        .diagnostics
        .iter()
        .any(|issue| issue.code == issue_codes::TEMPLATE_BOUNDARY));
}

#[test]
fn templated_violations_can_be_ignored() {
    let config = LintConfig {
        ignore_templated_areas: true,
        ..only(&["LT01"])
    };
    let (tree, _) = parse("select   a");
    let slices = SliceMap::new(
        vec![
            TemplateSlice::new(SliceKind::Literal, Span::new(0, 6), Span::new(0, 6)),
            TemplateSlice::new(SliceKind::Templated, Span::new(6, 9), Span::new(6, 15)),
            TemplateSlice::new(SliceKind::Literal, Span::new(9, 10), Span::new(15, 16)),
        ],
        10,
    )
    .unwrap();
    assert!(Linter::new(config).lint(&tree, &slices).violations.is_empty());
}

struct Explodes;

impl LintRule for Explodes {
    fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor::new("XX99", "test.explodes", "Panics.").no_recurse()
    }

    fn evaluate(&self, _ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        panic!("boom");
    }
}

struct Refuses;

impl LintRule for Refuses {
    fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor::new("XX98", "test.refuses", "Errors.").no_recurse()
    }

    fn evaluate(&self, _ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        Err(RuleError::msg("cannot evaluate"))
    }
}

#[test]
fn failing_rules_do_not_stop_the_others() {
    let linter = Linter::with_rules(
        LintConfig::default(),
        vec![Box::new(Explodes), Box::new(Refuses), Box::new(ExcessWhitespace)],
    );
    let (tree, slices) = parse("select   1");

    let result = linter.fix(tree, slices);

    assert_eq!(result.fixed_sql, "select 1");
    assert!(result.has_errors());
    let failed: HashSet<Option<&str>> = result
        .diagnostics
        .iter()
        .filter(|issue| issue.code == issue_codes::RULE_INTERNAL_ERROR)
        .map(|issue| issue.rule_code.as_deref())
        .collect();
    assert_eq!(failed, HashSet::from([Some("XX99"), Some("XX98")]));
    assert!(result.diagnostics.iter().any(|issue| issue.message.contains("boom")));
}

/// Reports the same finding twice at the root.
struct Repeats;

impl LintRule for Repeats {
    fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor::new("XX08", "test.repeats", "Repeats.").no_recurse()
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let root = ctx.root();
        Ok(vec![ctx.violation("Twice.", &root), ctx.violation("Twice.", &root)])
    }
}

#[test]
fn duplicate_findings_are_reported_once() {
    let linter = Linter::with_rules(LintConfig::default(), vec![Box::new(Repeats)]);
    let (tree, slices) = parse("select 1");
    assert_eq!(linter.lint(&tree, &slices).violations.len(), 1);
    let (tree, slices) = parse("select 1");
    assert_eq!(linter.fix(tree, slices).violations.len(), 1);
}

#[test]
fn lint_reports_post_phase_rules_too() {
    let result = lint_sql(&LintRequest::new("SELECT a from t"));
    let found: Vec<(&str, Span)> = result
        .violations
        .iter()
        .map(|v| (v.rule_code.as_str(), v.span))
        .collect();
    assert_eq!(found, vec![("CP01", Span::new(9, 13))]);
    assert!(result.violations[0].fixable);
}

/// Flags every identifier without offering a fix.
struct FlagsIdentifiers;

impl LintRule for FlagsIdentifiers {
    fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor::new("XX07", "test.flags_identifiers", "Flags identifiers.").post_phase()
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let segment = ctx.segment();
        if !segment.is_type(&[node_types::IDENTIFIER]) {
            return Ok(Vec::new());
        }
        Ok(vec![ctx.violation("Identifier.", &segment)])
    }
}

#[test]
fn lint_and_fix_report_the_same_unfixable_post_phase_findings() {
    let config = LintConfig::default();
    let linter = Linter::with_rules(
        config.clone(),
        vec![
            Box::new(CapitalisationKeywords::from_config(&config)),
            Box::new(FlagsIdentifiers),
        ],
    );
    // "from" came out of a template expression, so CP01 cannot fix it.
    let slices = || {
        SliceMap::new(
            vec![
                TemplateSlice::new(SliceKind::Literal, Span::new(0, 9), Span::new(0, 9)),
                TemplateSlice::new(SliceKind::Templated, Span::new(9, 13), Span::new(9, 22)),
                TemplateSlice::new(SliceKind::Literal, Span::new(13, 15), Span::new(22, 24)),
            ],
            15,
        )
        .unwrap()
    };
    let keys = |violations: &[Violation]| -> Vec<(String, Span, String)> {
        violations
            .iter()
            .map(|v| (v.rule_code.clone(), v.span, v.description.clone()))
            .collect()
    };

    let (tree, _) = parse("SELECT a from t");
    let linted = linter.lint(&tree, &slices());
    let (tree, _) = parse("SELECT a from t");
    let fixed = linter.fix(tree, slices());

    assert_eq!(fixed.fixed_sql, "SELECT a from t");
    assert!(!fixed.changed);
    assert_eq!(keys(&linted.violations), keys(&fixed.violations));
    let codes: Vec<&str> = fixed.violations.iter().map(|v| v.rule_code.as_str()).collect();
    assert_eq!(codes, vec!["XX07", "CP01", "XX07"]);
}

#[rstest]
#[case::messy_list("SELECT a ,  b\nFROM t  \n", "SELECT a, b\nFROM t\n")]
#[case::missing_newline("select a,\n  b\nfrom t", "select a,\n  b\nfrom t\n")]
#[case::mixed_case("select a\nFROM t\n", "select a\nfrom t\n")]
#[case::already_clean("select 1\n", "select 1\n")]
fn bundled_rules_converge(#[case] sql: &str, #[case] expected: &str) {
    let first = fix_sql(&LintRequest::new(sql));
    assert_eq!(first.fixed_sql, expected);
    assert!(first.converged);
    assert!(first.violations.is_empty(), "{:?}", first.violations);
    assert_eq!(first.changed, sql != expected);

    let second = fix_sql(&LintRequest::new(first.fixed_sql.as_str()));
    assert_eq!(second.fixed_sql, first.fixed_sql);
    assert!(!second.changed);
}

#[test]
fn noqa_comments_suppress_findings_on_their_line() {
    let suppressed = fix_sql(&LintRequest::new("select   1 -- noqa: LT01").with_config(only(&["LT01"])));
    assert_eq!(suppressed.fixed_sql, "select   1 -- noqa: LT01");
    assert!(suppressed.violations.is_empty());

    let other = fix_sql(&LintRequest::new("select   1 -- noqa: CP01").with_config(only(&["LT01"])));
    assert_eq!(other.fixed_sql, "select 1 -- noqa: CP01");
}

#[test]
fn parse_errors_are_reported_alongside_fixes() {
    let result = fix_sql(&LintRequest::new("select   1;\nselec oops;").with_config(only(&["LT01"])));
    assert_eq!(result.fixed_sql, "select 1;\nselec oops;");
    assert_eq!(
        result
            .diagnostics
            .iter()
            .filter(|issue| issue.code == issue_codes::PARSE_ERROR)
            .count(),
        1
    );
}

#[test]
fn untokenizable_input_is_returned_unchanged() {
    let sql = "select 'unterminated";
    let result = fix_sql(&LintRequest::new(sql));
    assert_eq!(result.fixed_sql, sql);
    assert!(!result.changed);
    assert!(result.diagnostics.iter().any(|issue| issue.code == issue_codes::PARSE_ERROR));
}

#[test]
fn disabled_rules_are_not_run() {
    let config = LintConfig {
        disabled_rules: vec!["layout.spacing".to_string()],
        ..only(&["LT01", "LT04"])
    };
    let result = fix_sql(&LintRequest::new("select   1").with_config(config));
    assert_eq!(result.fixed_sql, "select   1");
}

#[test]
fn linter_can_be_shared_between_threads() {
    let linter = Linter::new(LintConfig::default());
    let inputs = ["select   1\n", "SELECT a ,b\nfrom t\n", "select x  \n"];
    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|sql| {
                let linter = &linter;
                scope.spawn(move || {
                    let (tree, slices) = parse(sql);
                    linter.fix(tree, slices).fixed_sql
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });
    assert_eq!(outputs, vec!["select 1\n", "SELECT a,b\nFROM t\n", "select x\n"]);
}
