//! Rule-crawling and fix-convergence engine for SQL linting.
//!
//! The engine works on a lossless arena [`tree::Tree`] plus a
//! [`slice::SliceMap`] describing which parts of the rendered SQL came from
//! templates. A [`linter::Linter`] crawls the tree with a closed table of
//! rules, validates their fixes and applies them pass by pass until the
//! tree converges.
//!
//! ```
//! use sqlmend_core::{fix_sql, LintConfig, LintRequest};
//!
//! let config = LintConfig {
//!     rules: Some(vec!["LT01".to_string()]),
//!     ..LintConfig::default()
//! };
//! let result = fix_sql(&LintRequest::new("select   1").with_config(config));
//! assert_eq!(result.fixed_sql, "select 1");
//! assert!(result.converged);
//! ```

pub mod error;
pub mod linter;
pub mod parser;
pub mod query;
pub mod slice;
#[cfg(feature = "templating")]
pub mod templater;
pub mod tree;
pub mod types;

pub use error::ParseError;
pub use linter::{
    Fix, FixKind, FixResult, LintConfig, LintPhase, LintResult, LintRule, Linter, PassRecord,
    RuleContext, RuleDescriptor, RuleError, Violation,
};
pub use parser::{parse_tree, ParsedTree};
pub use query::{NodeRef, Segments};
pub use slice::{SliceKind, SliceMap, TemplateSlice};
pub use tree::{NodeId, Segment, Tree};
pub use types::{issue_codes, Dialect, Issue, LintRequest, Severity, Span};

#[cfg(feature = "tracing")]
use tracing::info_span;

/// Rendered, parsed input ready for the engine.
struct Prepared {
    tree: Tree,
    slices: SliceMap,
    diagnostics: Vec<Issue>,
}

/// Renders and parses the request. A template failure is returned as the
/// diagnostic to report in place of any lint results.
fn prepare(request: &LintRequest) -> Result<Prepared, Issue> {
    let (sql, slices) = render(request)?;
    let parsed = parse_tree(&sql, request.dialect);
    Ok(Prepared {
        diagnostics: parsed.errors.iter().map(ParseError::to_issue).collect(),
        tree: parsed.tree,
        slices,
    })
}

#[cfg(feature = "templating")]
fn render(request: &LintRequest) -> Result<(String, SliceMap), Issue> {
    match &request.template_config {
        Some(config) => templater::render_template(&request.sql, config)
            .map(|rendered| (rendered.sql, rendered.slices))
            .map_err(|err| Issue::error(issue_codes::TEMPLATE_ERROR, err.to_string())),
        None => Ok((request.sql.clone(), SliceMap::literal(request.sql.len()))),
    }
}

#[cfg(not(feature = "templating"))]
fn render(request: &LintRequest) -> Result<(String, SliceMap), Issue> {
    Ok((request.sql.clone(), SliceMap::literal(request.sql.len())))
}

/// Lints one request: template, parse, then a single read-only pass.
pub fn lint_sql(request: &LintRequest) -> LintResult {
    #[cfg(feature = "tracing")]
    let _span = info_span!("lint_sql", source = request.source_name.as_deref().unwrap_or("<input>")).entered();

    let prepared = match prepare(request) {
        Ok(prepared) => prepared,
        Err(issue) => {
            return LintResult {
                violations: Vec::new(),
                diagnostics: vec![issue],
                passes: Vec::new(),
            }
        }
    };
    let linter = Linter::new(request.config.clone()).with_dialect(request.dialect);
    let mut result = linter.lint(&prepared.tree, &prepared.slices);
    result.diagnostics = prepend(prepared.diagnostics, result.diagnostics);
    result
}

/// Fixes one request and, where possible, maps the fixes back onto the
/// template source.
pub fn fix_sql(request: &LintRequest) -> FixResult {
    #[cfg(feature = "tracing")]
    let _span = info_span!("fix_sql", source = request.source_name.as_deref().unwrap_or("<input>")).entered();

    let prepared = match prepare(request) {
        Ok(prepared) => prepared,
        Err(issue) => {
            return FixResult {
                fixed_sql: request.sql.clone(),
                fixed_source: None,
                violations: Vec::new(),
                diagnostics: vec![issue],
                passes: Vec::new(),
                converged: true,
                changed: false,
            }
        }
    };
    let linter = Linter::new(request.config.clone()).with_dialect(request.dialect);
    let mut result = linter.fix_source(&request.sql, prepared.tree, prepared.slices);
    result.diagnostics = prepend(prepared.diagnostics, result.diagnostics);
    result
}

fn prepend(mut first: Vec<Issue>, mut rest: Vec<Issue>) -> Vec<Issue> {
    first.append(&mut rest);
    first
}
