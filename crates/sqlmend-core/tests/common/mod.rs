#![allow(dead_code)]

use sqlmend_core::tree::node_types;
use sqlmend_core::{
    parse_tree, Dialect, Fix, LintRule, NodeId, RuleContext, RuleDescriptor, RuleError, Segment,
    SliceMap, Tree, Violation,
};
use std::sync::{Arc, Mutex};

pub const MARKER: &str = "/* m */";

/// Parses plain SQL and pairs it with an all-literal slice map.
pub fn parse(sql: &str) -> (Tree, SliceMap) {
    let parsed = parse_tree(sql, Dialect::Generic);
    let slices = SliceMap::literal(sql.len());
    (parsed.tree, slices)
}

fn ends_with_marker(ctx: &RuleContext<'_>) -> Option<bool> {
    let last = ctx.root().children().last()?;
    Some(last.is_type(&[node_types::BLOCK_COMMENT]) && last.text() == MARKER)
}

/// Appends a marker comment to the end of the file when it is missing.
pub struct AppendMarker;

impl LintRule for AppendMarker {
    fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor::new("XX01", "test.append_marker", "Files end with a marker.").no_recurse()
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let Some(last) = ctx.root().children().last() else {
            return Ok(Vec::new());
        };
        if ends_with_marker(ctx) == Some(true) {
            return Ok(Vec::new());
        }
        Ok(vec![ctx.violation("Missing marker.", &last).with_fix(Fix::insert_after(
            &last,
            vec![Segment::leaf(node_types::BLOCK_COMMENT, MARKER)],
        ))])
    }
}

/// Removes a trailing marker comment.
pub struct RemoveMarker;

impl LintRule for RemoveMarker {
    fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor::new("XX02", "test.remove_marker", "Files never end with a marker.").no_recurse()
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let Some(last) = ctx.root().children().last() else {
            return Ok(Vec::new());
        };
        if ends_with_marker(ctx) != Some(true) {
            return Ok(Vec::new());
        }
        Ok(vec![ctx
            .violation("Unexpected marker.", &last)
            .with_fix(Fix::delete(&last))])
    }
}

/// Records every node it is evaluated on.
pub struct Recorder {
    descriptor: RuleDescriptor,
    pub visits: Arc<Mutex<Vec<(NodeId, String)>>>,
}

impl Recorder {
    pub fn new(descriptor: RuleDescriptor) -> Self {
        Self {
            descriptor,
            visits: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl LintRule for Recorder {
    fn descriptor(&self) -> RuleDescriptor {
        self.descriptor
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        self.visits
            .lock()
            .unwrap()
            .push((ctx.segment, ctx.segment().node_type().to_string()));
        Ok(Vec::new())
    }
}
