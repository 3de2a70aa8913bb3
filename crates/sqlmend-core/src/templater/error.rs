//! Error types for the templating module.

use crate::slice::SliceMapError;
use thiserror::Error;

/// Errors that can occur while rendering a template or mapping its output.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template syntax is invalid (e.g., unclosed tags, invalid expressions).
    #[error("template syntax error: {0}")]
    SyntaxError(String),

    /// A variable referenced in the template is undefined and has no default.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// Template rendering failed for any other reason.
    #[error("render error: {0}")]
    RenderError(String),

    /// The rendered text could not be mapped back onto the source.
    #[error("slice map error: {0}")]
    SliceMap(#[from] SliceMapError),
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        match err.kind() {
            ErrorKind::SyntaxError => Self::SyntaxError(err.to_string()),
            ErrorKind::UndefinedError => Self::UndefinedVariable(err.to_string()),
            _ => Self::RenderError(err.to_string()),
        }
    }
}
