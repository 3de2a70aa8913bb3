//! Node type tags produced by the bundled parser and understood by the
//! bundled rules. Trees from other producers may use any tag.

pub const FILE: &str = "file";
pub const STATEMENT: &str = "statement";
pub const BRACKETED: &str = "bracketed";
pub const UNPARSABLE: &str = "unparsable";

pub const KEYWORD: &str = "keyword";
pub const IDENTIFIER: &str = "identifier";
pub const QUOTED_IDENTIFIER: &str = "quoted_identifier";
pub const NUMERIC_LITERAL: &str = "numeric_literal";
pub const STRING_LITERAL: &str = "string_literal";
pub const PLACEHOLDER: &str = "placeholder";
pub const OPERATOR: &str = "operator";
pub const COMMA: &str = "comma";
pub const DOT: &str = "dot";
pub const START_BRACKET: &str = "start_bracket";
pub const END_BRACKET: &str = "end_bracket";
pub const STATEMENT_TERMINATOR: &str = "statement_terminator";
pub const SYMBOL: &str = "symbol";

pub const WHITESPACE: &str = "whitespace";
pub const NEWLINE: &str = "newline";
pub const INLINE_COMMENT: &str = "inline_comment";
pub const BLOCK_COMMENT: &str = "block_comment";

/// Leaves that carry no tokens of the language.
pub fn is_whitespace(node_type: &str) -> bool {
    matches!(node_type, WHITESPACE | NEWLINE)
}

pub fn is_comment(node_type: &str) -> bool {
    matches!(node_type, INLINE_COMMENT | BLOCK_COMMENT)
}

/// Leaves that are neither whitespace nor comments.
pub fn is_code(node_type: &str) -> bool {
    !is_whitespace(node_type) && !is_comment(node_type)
}
