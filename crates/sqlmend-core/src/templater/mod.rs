//! SQL template rendering with a source slice map.
//!
//! Templating runs before parsing. Besides the rendered SQL it yields a
//! [`SliceMap`] that says, for each region of the rendered text, whether it
//! is verbatim source, generated text or a control tag. The fix validator
//! uses that map to keep edits out of generated text.
//!
//! ```text
//! source → [templater] → rendered SQL + slice map → [parser] → tree → [linter]
//! ```
//!
//! # Example
//!
//! ```
//! use sqlmend_core::slice::SliceKind;
//! use sqlmend_core::templater::{render_template, TemplateConfig, TemplateMode};
//!
//! let config = TemplateConfig {
//!     mode: TemplateMode::Dbt,
//!     ..TemplateConfig::default()
//! };
//! let rendered = render_template("select * from {{ ref('users') }}", &config).unwrap();
//! assert_eq!(rendered.sql, "select * from users");
//! assert_eq!(rendered.slices.slices()[1].kind, SliceKind::Templated);
//! ```

mod dbt;
mod error;
mod jinja;
mod slicer;

pub use error::TemplateError;

use crate::slice::SliceMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for SQL template preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    #[serde(default)]
    pub mode: TemplateMode,

    /// Context variables available to the template.
    ///
    /// In dbt mode, `vars` and `env_vars` back `var()` and `env_var()`.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateMode {
    /// No templating; the source is linted as-is.
    #[default]
    Raw,
    /// Jinja2 with strict undefined-variable checking.
    Jinja,
    /// Jinja2 with dbt builtin stubs.
    Dbt,
}

/// Rendered SQL and where each part of it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub sql: String,
    pub slices: SliceMap,
}

/// Renders `source` according to `config`.
pub fn render_template(
    source: &str,
    config: &TemplateConfig,
) -> Result<RenderedTemplate, TemplateError> {
    let sql = match config.mode {
        TemplateMode::Raw => {
            return Ok(RenderedTemplate {
                sql: source.to_string(),
                slices: SliceMap::literal(source.len()),
            })
        }
        TemplateMode::Jinja => jinja::render_jinja(source, &config.context)?,
        TemplateMode::Dbt => jinja::render_dbt(source, &config.context)?,
    };
    let slices = slicer::slice_template(source, &sql)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        mode = ?config.mode,
        slices = slices.slices().len(),
        literal_only = slices.is_literal_only(),
        "template rendered"
    );

    Ok(RenderedTemplate { sql, slices })
}
