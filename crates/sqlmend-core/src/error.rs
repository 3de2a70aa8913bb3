//! Parse errors reported by the reference parser.
//!
//! # Error Handling Strategy
//!
//! Two patterns are used side by side:
//!
//! - Typed errors ([`ParseError`], [`crate::tree::TreeError`],
//!   [`crate::slice::SliceMapError`], [`crate::linter::RuleError`]) are
//!   returned through `Result` at the boundary where they occur.
//!
//! - [`crate::types::Issue`]: non-fatal diagnostics collected while a file is
//!   linted (unparsable statements, crashing rules, rejected fixes,
//!   non-convergence). They are accumulated and returned alongside the
//!   violations so that a run always produces a best-effort result.
//!
//! A parse failure never stops the engine: the failing statement becomes an
//! `unparsable` node and the error is surfaced as a `PARSE_ERROR` issue.

use crate::types::{issue_codes, Dialect, Issue, Span};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
#[cfg(feature = "tracing")]
use tracing::trace;

/// A statement (or the whole file) the reference parser could not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message.
    pub message: String,
    /// Line/column reported by sqlparser, relative to the failing statement.
    pub position: Option<Position>,
    /// Rendered span of the unparsable node.
    pub span: Option<Span>,
    /// The SQL dialect being parsed when the error occurred.
    pub dialect: Option<Dialect>,
    /// The specific category of parse error.
    pub kind: ParseErrorKind,
}

/// Position information for a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
}

/// Category of parse error for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrorKind {
    /// Unexpected token or character in input.
    #[default]
    SyntaxError,
    /// Missing required clause or keyword.
    MissingClause,
    /// Invalid or unexpected end of input.
    UnexpectedEof,
    /// Feature not supported by the current dialect.
    UnsupportedFeature,
    /// Lexer/tokenization error.
    LexerError,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            span: None,
            dialect: None,
            kind: ParseErrorKind::SyntaxError,
        }
    }

    pub fn with_position(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            position: Some(Position { line, column }),
            ..Self::new(message)
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_kind(mut self, kind: ParseErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// The diagnostic reported for this error.
    pub fn to_issue(&self) -> Issue {
        let issue = Issue::warning(issue_codes::PARSE_ERROR, self.to_string());
        match self.span {
            Some(span) => issue.with_span(span),
            None => issue,
        }
    }

    /// Extracts "Line: X, Column: Y" from a sqlparser error message.
    ///
    /// Coupled to sqlparser's message format; returns `None` when it changes.
    fn parse_position_from_message(message: &str) -> Option<Position> {
        static POSITION_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = POSITION_REGEX.get_or_init(|| {
            Regex::new(r"Line:\s*(\d+)\s*,\s*Column:\s*(\d+)").expect("Invalid regex pattern")
        });

        let result = re.captures(message).and_then(|caps| {
            let line: usize = caps.get(1)?.as_str().parse().ok()?;
            let column: usize = caps.get(2)?.as_str().parse().ok()?;
            Some(Position { line, column })
        });

        #[cfg(feature = "tracing")]
        if result.is_none() && (message.contains("Line") || message.contains("Column")) {
            trace!(
                "Failed to parse position from error message that appears to contain position info: {}",
                message
            );
        }

        result
    }

    fn infer_kind_from_message(message: &str) -> ParseErrorKind {
        let lower = message.to_lowercase();
        if lower.contains("unexpected end") || lower.contains("eof") {
            ParseErrorKind::UnexpectedEof
        } else if lower.contains("expected") {
            ParseErrorKind::MissingClause
        } else if lower.contains("not supported") || lower.contains("unsupported") {
            ParseErrorKind::UnsupportedFeature
        } else if lower.contains("lexer") || lower.contains("token") {
            ParseErrorKind::LexerError
        } else {
            ParseErrorKind::SyntaxError
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error")?;

        if let Some(dialect) = self.dialect {
            write!(f, " ({dialect:?})")?;
        }

        if let Some(pos) = self.position {
            write!(f, " at line {}, column {}", pos.line, pos.column)?;
        }

        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        let message = err.to_string();
        Self {
            position: Self::parse_position_from_message(&message),
            kind: Self::infer_kind_from_message(&message),
            ..Self::new(message)
        }
    }
}

impl From<sqlparser::tokenizer::TokenizerError> for ParseError {
    fn from(err: sqlparser::tokenizer::TokenizerError) -> Self {
        let message = err.to_string();
        Self {
            position: Self::parse_position_from_message(&message),
            kind: ParseErrorKind::LexerError,
            ..Self::new(message)
        }
    }
}
