//! Reference parser producing lossless trees.
//!
//! The tree keeps every byte of the input: tokens become leaves, statements
//! and bracketed groups become compound nodes. Each statement is also run
//! through the sqlparser grammar; statements it rejects are kept as
//! `unparsable` nodes so rules can decide whether to look inside them.

mod lexer;

use crate::error::{ParseError, ParseErrorKind};
use crate::tree::{node_types, Segment, Tree, TreeBuilder, TreeError};
use crate::types::{Dialect, Span};
use lexer::Lexeme;
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
#[cfg(feature = "tracing")]
use tracing::debug;

/// A tree together with the problems found while building it.
#[derive(Debug, Clone)]
pub struct ParsedTree {
    pub tree: Tree,
    /// One entry per statement (or lexer failure) that did not parse.
    pub errors: Vec<ParseError>,
}

impl ParsedTree {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parses rendered SQL into a lossless tree.
///
/// Never fails: text the tokenizer cannot handle ends up in a single
/// `unparsable` leaf under the file root.
pub fn parse_tree(sql: &str, dialect: Dialect) -> ParsedTree {
    let lexemes = match lexer::lex(sql, dialect) {
        Ok(lexemes) => lexemes,
        Err(err) => return unparsable_file(sql, err),
    };

    let statements = statement_ranges(&lexemes);
    let mut errors = Vec::new();
    let mut unparsable = Vec::with_capacity(statements.len());
    for range in &statements {
        let span = Span::new(lexemes[range.start].start, lexemes[range.end - 1].end);
        match parse_sql_with_dialect(&sql[span.start..span.end], dialect) {
            Ok(_) => unparsable.push(false),
            Err(err) => {
                #[cfg(feature = "tracing")]
                debug!(start = span.start, end = span.end, error = %err, "statement did not parse");
                errors.push(err.with_dialect(dialect).with_span(span));
                unparsable.push(true);
            }
        }
    }

    match build(sql, &lexemes, &statements, &unparsable) {
        Ok(tree) => ParsedTree { tree, errors },
        Err(err) => unparsable_file(
            sql,
            ParseError::new(format!("failed to assemble tree: {err}"))
                .with_dialect(dialect)
                .with_kind(ParseErrorKind::LexerError),
        ),
    }
}

/// Parse SQL using the specified dialect.
pub fn parse_sql_with_dialect(sql: &str, dialect: Dialect) -> Result<Vec<Statement>, ParseError> {
    let sqlparser_dialect = dialect.to_sqlparser_dialect();
    match Parser::parse_sql(sqlparser_dialect.as_ref(), sql) {
        Ok(statements) => Ok(statements),
        Err(primary_err) => {
            // Generic often trips over Postgres-only operators (`::`, `->>`, `?|`)
            // that show up in warehouse SQL.
            if matches!(dialect, Dialect::Generic) && looks_like_postgres_syntax(sql) {
                let postgres = PostgreSqlDialect {};
                if let Ok(statements) = Parser::parse_sql(&postgres, sql) {
                    return Ok(statements);
                }
            }
            Err(primary_err.into())
        }
    }
}

fn looks_like_postgres_syntax(sql: &str) -> bool {
    sql.contains("::")
        || sql.contains("->")
        || sql.contains("?|")
        || sql.contains("?&")
        || sql.contains(" ? ")
}

/// Lexeme index ranges covered by each statement. A statement runs from its
/// first code lexeme through its terminator, or through the last code lexeme
/// when the input ends without one. Anything between statements stays at
/// file level.
fn statement_ranges(lexemes: &[Lexeme]) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<usize> = None;
    let mut last_code = 0;
    for (index, lexeme) in lexemes.iter().enumerate() {
        if !lexeme.is_code() {
            continue;
        }
        let start = *open.get_or_insert(index);
        last_code = index;
        if lexeme.node_type == node_types::STATEMENT_TERMINATOR {
            ranges.push(start..index + 1);
            open = None;
        }
    }
    if let Some(start) = open {
        ranges.push(start..last_code + 1);
    }
    ranges
}

fn build(
    sql: &str,
    lexemes: &[Lexeme],
    statements: &[std::ops::Range<usize>],
    unparsable: &[bool],
) -> Result<Tree, TreeError> {
    let mut builder = TreeBuilder::new(node_types::FILE);
    let mut cursor = 0;
    for (range, unparsable) in statements.iter().zip(unparsable) {
        for lexeme in &lexemes[cursor..range.start] {
            builder.leaf(lexeme.node_type, &sql[lexeme.start..lexeme.end]);
        }
        builder.start_node(if *unparsable {
            node_types::UNPARSABLE
        } else {
            node_types::STATEMENT
        });
        let mut brackets = 0usize;
        for lexeme in &lexemes[range.clone()] {
            let text = &sql[lexeme.start..lexeme.end];
            match lexeme.node_type {
                node_types::START_BRACKET => {
                    builder.start_node(node_types::BRACKETED);
                    builder.leaf(lexeme.node_type, text);
                    brackets += 1;
                }
                node_types::END_BRACKET if brackets > 0 => {
                    builder.leaf(lexeme.node_type, text);
                    builder.finish_node()?;
                    brackets -= 1;
                }
                node_type => {
                    builder.leaf(node_type, text);
                }
            }
        }
        for _ in 0..=brackets {
            builder.finish_node()?;
        }
        cursor = range.end;
    }
    for lexeme in &lexemes[cursor..] {
        builder.leaf(lexeme.node_type, &sql[lexeme.start..lexeme.end]);
    }
    builder.finish()
}

fn unparsable_file(sql: &str, error: ParseError) -> ParsedTree {
    #[cfg(feature = "tracing")]
    debug!(error = %error, "input could not be tokenized");

    let children = if sql.is_empty() {
        Vec::new()
    } else {
        vec![Segment::leaf(node_types::UNPARSABLE, sql)]
    };
    let tree = Tree::from_segment(&Segment::compound(node_types::FILE, children));
    let span = Span::new(0, sql.len());
    ParsedTree {
        tree,
        errors: vec![error.with_span(span)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::NodeRef;

    fn types_under(tree: &Tree, id: crate::tree::NodeId) -> Vec<String> {
        tree.node(id)
            .children()
            .iter()
            .map(|child| tree.node(*child).node_type().to_string())
            .collect()
    }

    #[test]
    fn test_parse_valid_select() {
        let result = parse_sql_with_dialect("SELECT * FROM users", Dialect::Generic);
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn test_parse_invalid_sql() {
        assert!(parse_sql_with_dialect("SELECT * FROM", Dialect::Generic).is_err());
    }

    #[test]
    fn test_postgres_fallback_for_generic() {
        let result = parse_sql_with_dialect("SELECT data->>'name' FROM users", Dialect::Generic);
        assert!(result.is_ok());
    }

    #[test]
    fn tree_round_trips_input() {
        let sql = "  -- lead\nselect a, (b + 1) from t;\n\nselect   2  \n";
        let parsed = parse_tree(sql, Dialect::Generic);
        assert!(parsed.is_clean());
        assert_eq!(parsed.tree.raw(), sql);
        parsed.tree.check_round_trip(sql).unwrap();
    }

    #[test]
    fn statements_and_file_level_trivia() {
        let sql = "select 1;\nselect 2\n";
        let parsed = parse_tree(sql, Dialect::Generic);
        let root = parsed.tree.root();
        assert_eq!(
            types_under(&parsed.tree, root),
            vec!["statement", "newline", "statement", "newline"]
        );
        let first = parsed.tree.node(root).children()[0];
        assert_eq!(parsed.tree.raw_of(first), "select 1;");
    }

    #[test]
    fn brackets_nest_and_unclosed_brackets_close_at_statement_end() {
        let parsed = parse_tree("select (1 + (2))", Dialect::Generic);
        let statement = parsed.tree.node(parsed.tree.root()).children()[0];
        let bracketed = *parsed.tree.node(statement).children().last().unwrap();
        assert_eq!(parsed.tree.node(bracketed).node_type(), node_types::BRACKETED);
        assert!(types_under(&parsed.tree, bracketed).contains(&"bracketed".to_string()));

        let sql = "select (1";
        let parsed = parse_tree(sql, Dialect::Generic);
        assert_eq!(parsed.tree.raw(), sql);
        assert!(!parsed.is_clean());
    }

    #[test]
    fn failed_statements_become_unparsable() {
        let sql = "select 1; selec oops from; select 2";
        let parsed = parse_tree(sql, Dialect::Generic);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].span, Some(Span::new(10, 26)));
        let types = types_under(&parsed.tree, parsed.tree.root());
        assert_eq!(
            types,
            vec!["statement", "whitespace", "unparsable", "whitespace", "statement"]
        );
        let bad = parsed.tree.node(parsed.tree.root()).children()[2];
        assert!(NodeRef::new(&parsed.tree, bad).is_unparsable());
    }

    #[test]
    fn lexer_failure_yields_single_unparsable_leaf() {
        let sql = "select 'unterminated";
        let parsed = parse_tree(sql, Dialect::Generic);
        assert_eq!(parsed.tree.raw(), sql);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].kind, ParseErrorKind::LexerError);
        let leaves = parsed.tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert!(parsed.tree.node(leaves[0]).is_unparsable());
    }

    #[test]
    fn empty_input_is_an_empty_file() {
        let parsed = parse_tree("", Dialect::Generic);
        assert!(parsed.is_clean());
        assert_eq!(parsed.tree.raw(), "");
        assert!(parsed.tree.node(parsed.tree.root()).children().is_empty());
    }
}
