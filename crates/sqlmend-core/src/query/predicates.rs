//! Composable node predicates for [`super::Segments`] queries.

use super::NodeRef;
use regex::Regex;

pub fn is_type<'a>(types: &'a [&'a str]) -> impl Fn(&NodeRef<'_>) -> bool + 'a {
    move |node| node.is_type(types)
}

/// Keyword leaves, optionally restricted to the given words (case-insensitive).
pub fn is_keyword<'a>(words: &'a [&'a str]) -> impl Fn(&NodeRef<'_>) -> bool + 'a {
    move |node| {
        node.is_type(&[crate::tree::node_types::KEYWORD])
            && (words.is_empty() || words.iter().any(|w| w.eq_ignore_ascii_case(node.text())))
    }
}

pub fn is_code() -> impl Fn(&NodeRef<'_>) -> bool {
    |node| node.is_code()
}

pub fn is_whitespace() -> impl Fn(&NodeRef<'_>) -> bool {
    |node| node.is_whitespace()
}

pub fn is_comment() -> impl Fn(&NodeRef<'_>) -> bool {
    |node| node.is_comment()
}

pub fn is_leaf() -> impl Fn(&NodeRef<'_>) -> bool {
    |node| node.is_leaf()
}

pub fn raw_is<'a>(text: &'a str) -> impl Fn(&NodeRef<'_>) -> bool + 'a {
    move |node| node.raw() == text
}

pub fn raw_matches(pattern: Regex) -> impl Fn(&NodeRef<'_>) -> bool {
    move |node| pattern.is_match(&node.raw())
}

/// Nodes with an ancestor of one of `types`.
pub fn within<'a>(types: &'a [&'a str]) -> impl Fn(&NodeRef<'_>) -> bool + 'a {
    move |node| node.ancestors().any(|ancestor| ancestor.is_type(types))
}

pub fn always() -> impl Fn(&NodeRef<'_>) -> bool {
    |_| true
}

pub fn never() -> impl Fn(&NodeRef<'_>) -> bool {
    |_| false
}

pub fn and<A, B>(a: A, b: B) -> impl Fn(&NodeRef<'_>) -> bool
where
    A: Fn(&NodeRef<'_>) -> bool,
    B: Fn(&NodeRef<'_>) -> bool,
{
    move |node| a(node) && b(node)
}

pub fn or<A, B>(a: A, b: B) -> impl Fn(&NodeRef<'_>) -> bool
where
    A: Fn(&NodeRef<'_>) -> bool,
    B: Fn(&NodeRef<'_>) -> bool,
{
    move |node| a(node) || b(node)
}

pub fn not<A>(a: A) -> impl Fn(&NodeRef<'_>) -> bool
where
    A: Fn(&NodeRef<'_>) -> bool,
{
    move |node| !a(node)
}
