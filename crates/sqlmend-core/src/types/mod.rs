//! Types for the SQL lint/fix API.
//!
//! Value types that cross the API boundary: spans into rendered text, the
//! non-lint diagnostics collected alongside violations, and the request
//! type used by the convenience entry points.

mod common;
mod request;

// Re-export all public types
pub use common::{issue_codes, Issue, Severity, Span};
pub use request::{Dialect, LintRequest};
