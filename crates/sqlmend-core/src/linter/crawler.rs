//! Deterministic pre-order crawl of one tree generation.
//!
//! A single traversal serves every active rule. At each node the rules are
//! evaluated in registration order; results are bucketed per rule so the
//! final order is registration order first and document order second.

use super::context::RuleContext;
use super::fix::Violation;
use super::rule::{LintRule, RuleDescriptor};
use crate::slice::SliceMap;
use crate::tree::{NodeId, Tree};
use crate::types::{issue_codes, Dialect, Issue};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
#[cfg(feature = "tracing")]
use tracing::debug;

/// Violations found by one crawl, bucketed by rule index.
pub(crate) struct CrawlOutcome {
    pub per_rule: Vec<Vec<Violation>>,
    pub diagnostics: Vec<Issue>,
    /// Number of `evaluate` calls made, per rule index.
    pub invocations: Vec<usize>,
}

pub(crate) struct Crawler<'a> {
    tree: &'a Tree,
    slices: &'a SliceMap,
    dialect: Dialect,
    fix_mode: bool,
    rules: &'a [&'a dyn LintRule],
    descriptors: Vec<RuleDescriptor>,
}

struct CrawlState {
    parent_stack: Vec<NodeId>,
    raw_stack: Vec<NodeId>,
    track_raw: bool,
    outcome: CrawlOutcome,
}

impl<'a> Crawler<'a> {
    pub fn new(
        tree: &'a Tree,
        slices: &'a SliceMap,
        dialect: Dialect,
        fix_mode: bool,
        rules: &'a [&'a dyn LintRule],
    ) -> Self {
        Self {
            tree,
            slices,
            dialect,
            fix_mode,
            rules,
            descriptors: rules.iter().map(|rule| rule.descriptor()).collect(),
        }
    }

    pub fn crawl(&self) -> CrawlOutcome {
        let rule_count = self.rules.len();
        let mut state = CrawlState {
            parent_stack: Vec::new(),
            raw_stack: Vec::new(),
            track_raw: self
                .descriptors
                .iter()
                .any(|d| d.recurse_into && d.needs_raw_stack),
            outcome: CrawlOutcome {
                per_rule: vec![Vec::new(); rule_count],
                diagnostics: Vec::new(),
                invocations: vec![0; rule_count],
            },
        };

        let root = self.tree.root();
        let root_unparsable = self.tree.node(root).is_unparsable();
        for (index, descriptor) in self.descriptors.iter().enumerate() {
            if descriptor.recurse_into || (root_unparsable && !descriptor.works_on_unparsable) {
                continue;
            }
            let raw_stack: &[NodeId] = &[];
            let ctx = self.context(descriptor, root, &[], 0, descriptor.needs_raw_stack.then_some(raw_stack));
            self.evaluate(index, &ctx, &mut state.outcome);
        }

        if self.descriptors.iter().any(|d| d.recurse_into) {
            self.visit(root, 0, false, &mut state);
        }
        state.outcome
    }

    fn visit(&self, id: NodeId, segment_idx: usize, inherited_unparsable: bool, state: &mut CrawlState) {
        let node = self.tree.node(id);
        let in_unparsable = inherited_unparsable || node.is_unparsable();

        for (index, descriptor) in self.descriptors.iter().enumerate() {
            if !descriptor.recurse_into || (in_unparsable && !descriptor.works_on_unparsable) {
                continue;
            }
            let raw_stack = descriptor
                .needs_raw_stack
                .then_some(state.raw_stack.as_slice());
            let ctx = self.context(descriptor, id, &state.parent_stack, segment_idx, raw_stack);
            self.evaluate(index, &ctx, &mut state.outcome);
        }

        if node.is_leaf() {
            if state.track_raw {
                state.raw_stack.push(id);
            }
            return;
        }

        state.parent_stack.push(id);
        for (child_idx, child) in node.children().iter().enumerate() {
            self.visit(*child, child_idx, in_unparsable, state);
        }
        state.parent_stack.pop();
    }

    fn context<'c>(
        &'c self,
        descriptor: &RuleDescriptor,
        segment: NodeId,
        parent_stack: &'c [NodeId],
        segment_idx: usize,
        raw_stack: Option<&'c [NodeId]>,
    ) -> RuleContext<'c> {
        RuleContext {
            tree: self.tree,
            slices: self.slices,
            dialect: self.dialect,
            segment,
            parent_stack,
            segment_idx,
            raw_stack,
            fix_mode: self.fix_mode,
            rule_code: descriptor.code,
        }
    }

    /// Runs one rule at one site. Errors and panics are contained here.
    fn evaluate(&self, index: usize, ctx: &RuleContext<'_>, outcome: &mut CrawlOutcome) {
        let rule = self.rules[index];
        outcome.invocations[index] += 1;
        let result = panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(ctx)));
        let failure = match result {
            Ok(Ok(violations)) => {
                #[cfg(feature = "tracing")]
                for violation in &violations {
                    debug!(
                        rule = rule.code(),
                        start = violation.span.start,
                        end = violation.span.end,
                        fixes = violation.fixes.len(),
                        "violation found"
                    );
                }
                outcome.per_rule[index].extend(violations);
                return;
            }
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        #[cfg(feature = "tracing")]
        debug!(rule = rule.code(), node = %ctx.segment, error = %failure, "rule evaluation failed");

        let span = ctx.tree.node(ctx.segment).span();
        outcome.diagnostics.push(
            Issue::error(
                issue_codes::RULE_INTERNAL_ERROR,
                format!("Unexpected exception in {}: {failure}", rule.code()),
            )
            .with_span(span)
            .with_rule(rule.code()),
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "rule panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linter::rule::RuleError;
    use crate::tree::{node_types, Segment};
    use std::sync::Mutex;

    /// Records every visit as (node type, parent count, raw stack length).
    struct Recorder {
        descriptor: RuleDescriptor,
        visits: Mutex<Vec<(String, usize, Option<usize>)>>,
    }

    impl Recorder {
        fn new(descriptor: RuleDescriptor) -> Self {
            Self {
                descriptor,
                visits: Mutex::new(Vec::new()),
            }
        }
    }

    impl LintRule for Recorder {
        fn descriptor(&self) -> RuleDescriptor {
            self.descriptor
        }

        fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
            self.visits.lock().unwrap().push((
                ctx.segment().node_type().to_string(),
                ctx.parent_stack.len(),
                ctx.raw_stack.map(<[NodeId]>::len),
            ));
            Ok(Vec::new())
        }
    }

    struct Failing;

    impl LintRule for Failing {
        fn descriptor(&self) -> RuleDescriptor {
            RuleDescriptor::new("XX99", "test.failing", "Always fails.")
        }

        fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
            if ctx.segment().is_type(&[node_types::KEYWORD]) {
                panic!("boom");
            }
            Err(RuleError::msg("nope"))
        }
    }

    fn tree() -> Tree {
        Tree::from_segment(&Segment::compound(
            node_types::FILE,
            vec![
                Segment::compound(
                    node_types::STATEMENT,
                    vec![
                        Segment::leaf(node_types::KEYWORD, "select"),
                        Segment::leaf(node_types::WHITESPACE, " "),
                        Segment::leaf(node_types::NUMERIC_LITERAL, "1"),
                    ],
                ),
                Segment::compound(
                    node_types::UNPARSABLE,
                    vec![Segment::leaf(node_types::IDENTIFIER, "garbage")],
                ),
            ],
        ))
    }

    fn crawl(tree: &Tree, rules: &[&dyn LintRule]) -> CrawlOutcome {
        let slices = SliceMap::literal(tree.raw().len());
        Crawler::new(tree, &slices, Dialect::Generic, false, rules).crawl()
    }

    #[test]
    fn visits_in_pre_order_with_parent_stack() {
        let tree = tree();
        let rule = Recorder::new(RuleDescriptor::new("XX01", "t", "t"));
        crawl(&tree, &[&rule]);
        let visits = rule.visits.lock().unwrap();
        let types: Vec<&str> = visits.iter().map(|(t, _, _)| t.as_str()).collect();
        assert_eq!(
            types,
            vec!["file", "statement", "keyword", "whitespace", "numeric_literal", "unparsable", "identifier"]
        );
        assert_eq!(visits[2].1, 2);
        assert!(visits.iter().all(|(_, _, raw)| raw.is_none()));
    }

    #[test]
    fn raw_stack_only_for_rules_that_need_it() {
        let tree = tree();
        let with_stack = Recorder::new(RuleDescriptor::new("XX01", "t", "t").with_raw_stack());
        let without = Recorder::new(RuleDescriptor::new("XX02", "t", "t"));
        crawl(&tree, &[&with_stack, &without]);
        let raw_lengths: Vec<Option<usize>> =
            with_stack.visits.lock().unwrap().iter().map(|v| v.2).collect();
        assert_eq!(
            raw_lengths,
            vec![Some(0), Some(0), Some(0), Some(1), Some(2), Some(3), Some(3)]
        );
        assert!(without.visits.lock().unwrap().iter().all(|v| v.2.is_none()));
    }

    #[test]
    fn unparsable_subtrees_are_gated() {
        let tree = tree();
        let rule = Recorder::new(RuleDescriptor::new("XX01", "t", "t").skip_unparsable());
        crawl(&tree, &[&rule]);
        let visits = rule.visits.lock().unwrap();
        assert!(visits
            .iter()
            .all(|(t, _, _)| t != node_types::UNPARSABLE && t != node_types::IDENTIFIER));
        assert_eq!(visits.len(), 5);
    }

    #[test]
    fn non_recursive_rules_run_once_with_root() {
        let tree = tree();
        let rule = Recorder::new(RuleDescriptor::new("XX01", "t", "t").no_recurse().with_raw_stack());
        let outcome = crawl(&tree, &[&rule]);
        assert_eq!(outcome.invocations, vec![1]);
        assert_eq!(
            rule.visits.lock().unwrap().as_slice(),
            &[("file".to_string(), 0, Some(0))]
        );
    }

    #[test]
    fn rule_errors_and_panics_become_diagnostics() {
        let tree = tree();
        let recorder = Recorder::new(RuleDescriptor::new("XX01", "t", "t"));
        let outcome = crawl(&tree, &[&Failing, &recorder]);
        assert_eq!(outcome.diagnostics.len(), 7);
        assert!(outcome
            .diagnostics
            .iter()
            .all(|d| d.code == issue_codes::RULE_INTERNAL_ERROR && d.rule_code.as_deref() == Some("XX99")));
        assert!(outcome.diagnostics.iter().any(|d| d.message.contains("boom")));
        assert_eq!(recorder.visits.lock().unwrap().len(), 7);
    }
}
