//! Lossless lexing on top of the sqlparser tokenizer.
//!
//! sqlparser reports where each token starts; a leaf's text is everything
//! from its start to the next token's start. Concatenating leaf text thus
//! reproduces the input exactly, whatever the token payloads look like.

use crate::error::ParseError;
use crate::tree::node_types;
use crate::types::Dialect;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer, Whitespace};

/// One leaf-to-be: a node type and a byte range of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lexeme {
    pub node_type: &'static str,
    pub start: usize,
    pub end: usize,
}

impl Lexeme {
    pub fn is_code(&self) -> bool {
        node_types::is_code(self.node_type)
    }
}

pub(crate) fn lex(sql: &str, dialect: Dialect) -> Result<Vec<Lexeme>, ParseError> {
    let sqlparser_dialect = dialect.to_sqlparser_dialect();
    let tokens: Vec<TokenWithSpan> = Tokenizer::new(sqlparser_dialect.as_ref(), sql)
        .tokenize_with_location()
        .map_err(|err| ParseError::from(err).with_dialect(dialect))?;

    let offsets = LineIndex::new(sql);
    let mut starts = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let start = offsets
            .offset(token.span.start)
            .ok_or_else(|| ParseError::new("token location outside of input").with_dialect(dialect))?;
        starts.push(start);
    }
    if starts.first().is_some_and(|first| *first != 0) || starts.windows(2).any(|w| w[0] > w[1]) {
        return Err(ParseError::new("tokenizer locations are not monotonic").with_dialect(dialect));
    }

    let mut lexemes: Vec<Lexeme> = Vec::with_capacity(tokens.len());
    for (index, token) in tokens.iter().enumerate() {
        let start = starts[index];
        let end = starts.get(index + 1).copied().unwrap_or(sql.len());
        if start == end {
            continue;
        }
        let node_type = classify(&token.token);
        let text = &sql[start..end];

        if node_type == node_types::WHITESPACE {
            if let Some(previous) = lexemes.last_mut() {
                if previous.node_type == node_types::WHITESPACE && previous.end == start {
                    previous.end = end;
                    continue;
                }
            }
        }

        if node_type == node_types::INLINE_COMMENT {
            let trimmed = text.trim_end_matches(['\r', '\n']);
            if trimmed.len() < text.len() && !trimmed.is_empty() {
                let split = start + trimmed.len();
                lexemes.push(Lexeme { node_type, start, end: split });
                lexemes.push(Lexeme {
                    node_type: node_types::NEWLINE,
                    start: split,
                    end,
                });
                continue;
            }
        }

        lexemes.push(Lexeme { node_type, start, end });
    }
    Ok(lexemes)
}

fn classify(token: &Token) -> &'static str {
    match token {
        Token::Word(word) if word.quote_style.is_some() => node_types::QUOTED_IDENTIFIER,
        Token::Word(word) if is_reserved_keyword(&word.value) => node_types::KEYWORD,
        Token::Word(_) => node_types::IDENTIFIER,
        Token::Number(_, _) => node_types::NUMERIC_LITERAL,
        Token::SingleQuotedString(_)
        | Token::DoubleQuotedString(_)
        | Token::TripleSingleQuotedString(_)
        | Token::TripleDoubleQuotedString(_)
        | Token::DollarQuotedString(_)
        | Token::NationalStringLiteral(_)
        | Token::EscapedStringLiteral(_)
        | Token::UnicodeStringLiteral(_)
        | Token::HexStringLiteral(_)
        | Token::SingleQuotedByteStringLiteral(_)
        | Token::DoubleQuotedByteStringLiteral(_)
        | Token::SingleQuotedRawStringLiteral(_)
        | Token::DoubleQuotedRawStringLiteral(_) => node_types::STRING_LITERAL,
        Token::Placeholder(_) => node_types::PLACEHOLDER,
        Token::Comma => node_types::COMMA,
        Token::Period => node_types::DOT,
        Token::LParen => node_types::START_BRACKET,
        Token::RParen => node_types::END_BRACKET,
        Token::SemiColon => node_types::STATEMENT_TERMINATOR,
        Token::Eq
        | Token::DoubleEq
        | Token::Neq
        | Token::Lt
        | Token::Gt
        | Token::LtEq
        | Token::GtEq
        | Token::Spaceship
        | Token::Plus
        | Token::Minus
        | Token::Mul
        | Token::Div
        | Token::DuckIntDiv
        | Token::Mod
        | Token::StringConcat
        | Token::DoubleColon
        | Token::Assignment
        | Token::Arrow
        | Token::LongArrow => node_types::OPERATOR,
        Token::Whitespace(Whitespace::Newline) => node_types::NEWLINE,
        Token::Whitespace(Whitespace::SingleLineComment { .. }) => node_types::INLINE_COMMENT,
        Token::Whitespace(Whitespace::MultiLineComment(_)) => node_types::BLOCK_COMMENT,
        Token::Whitespace(_) => node_types::WHITESPACE,
        _ => node_types::SYMBOL,
    }
}

/// Words treated as keywords by the bundled rules. Non-reserved words such
/// as `name` or `date` stay identifiers so that capitalisation rules leave
/// column names alone.
fn is_reserved_keyword(value: &str) -> bool {
    matches!(
        value.to_ascii_uppercase().as_str(),
        "SELECT"
            | "FROM"
            | "WHERE"
            | "JOIN"
            | "LEFT"
            | "RIGHT"
            | "FULL"
            | "INNER"
            | "OUTER"
            | "CROSS"
            | "ON"
            | "USING"
            | "GROUP"
            | "ORDER"
            | "BY"
            | "HAVING"
            | "LIMIT"
            | "OFFSET"
            | "UNION"
            | "INTERSECT"
            | "EXCEPT"
            | "ALL"
            | "DISTINCT"
            | "AS"
            | "AND"
            | "OR"
            | "NOT"
            | "NULL"
            | "IS"
            | "IN"
            | "BETWEEN"
            | "LIKE"
            | "ILIKE"
            | "EXISTS"
            | "CASE"
            | "WHEN"
            | "THEN"
            | "ELSE"
            | "END"
            | "WITH"
            | "RECURSIVE"
            | "INSERT"
            | "INTO"
            | "VALUES"
            | "UPDATE"
            | "SET"
            | "DELETE"
            | "MERGE"
            | "CREATE"
            | "REPLACE"
            | "TABLE"
            | "VIEW"
            | "DROP"
            | "ALTER"
            | "IF"
            | "ASC"
            | "DESC"
            | "TRUE"
            | "FALSE"
            | "CAST"
            | "OVER"
            | "PARTITION"
            | "WINDOW"
            | "QUALIFY"
    )
}

/// Maps sqlparser's 1-based line/column locations to byte offsets.
struct LineIndex<'a> {
    sql: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(sql: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(sql.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        Self { sql, line_starts }
    }

    fn offset(&self, location: Location) -> Option<usize> {
        let line = usize::try_from(location.line).ok()?;
        let column = usize::try_from(location.column).ok()?;
        if line == 0 || column == 0 {
            return None;
        }
        let line_start = *self.line_starts.get(line - 1)?;
        let rest = self.sql.get(line_start..)?;
        if column == 1 {
            return Some(line_start);
        }
        rest.char_indices()
            .map(|(index, _)| line_start + index)
            .chain(std::iter::once(self.sql.len()))
            .nth(column - 1)
    }
}
