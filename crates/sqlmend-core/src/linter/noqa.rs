//! Inline `-- noqa` suppression.

use super::fix::Violation;
use crate::query::NodeRef;
use crate::tree::Tree;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NoqaDirective {
    All,
    Rules(HashSet<String>),
}

/// `-- noqa` suppression directives indexed by 1-based line number.
#[derive(Debug, Clone, Default)]
pub struct NoqaMap {
    directives: HashMap<usize, NoqaDirective>,
    line_starts: Vec<usize>,
}

impl NoqaMap {
    /// Collects directives from every comment leaf of `tree`.
    pub fn from_tree(tree: &Tree) -> Self {
        let text = tree.raw();
        let mut map = NoqaMap {
            directives: HashMap::new(),
            line_starts: line_starts(&text),
        };
        for leaf in tree.leaves() {
            let node = NodeRef::new(tree, leaf);
            if !node.is_comment() {
                continue;
            }
            let Some(parsed) = parse_noqa_comment(node.text()) else {
                continue;
            };
            let line = map.line_of(node.span().start);
            match parsed {
                NoqaDirective::All => map.suppress_all(line),
                NoqaDirective::Rules(rules) => map.suppress_rules(line, rules),
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Returns true if `code` is suppressed on `line`.
    pub fn is_suppressed(&self, line: usize, code: &str) -> bool {
        match self.directives.get(&line) {
            None => false,
            Some(NoqaDirective::All) => true,
            Some(NoqaDirective::Rules(rules)) => rules.contains(&code.trim().to_ascii_uppercase()),
        }
    }

    /// Suppression is keyed on the line where the violation starts.
    pub fn suppresses(&self, violation: &Violation) -> bool {
        self.is_suppressed(self.line_of(violation.span.start), &violation.rule_code)
    }

    fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|start| *start <= offset).max(1)
    }

    fn suppress_all(&mut self, line: usize) {
        self.directives.insert(line, NoqaDirective::All);
    }

    fn suppress_rules(&mut self, line: usize, codes: HashSet<String>) {
        match self.directives.get_mut(&line) {
            Some(NoqaDirective::All) => {}
            Some(NoqaDirective::Rules(existing)) => existing.extend(codes),
            None => {
                self.directives.insert(line, NoqaDirective::Rules(codes));
            }
        }
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(index, _)| index + 1))
        .collect()
}

fn parse_noqa_comment(comment_text: &str) -> Option<NoqaDirective> {
    static NOQA_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = NOQA_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:--|#|/\*)\s*noqa\s*(?::\s*(?P<rules>[^*]*))?").expect("Invalid regex pattern")
    });

    let caps = re.captures(comment_text)?;
    let Some(rule_list) = caps.name("rules") else {
        return Some(NoqaDirective::All);
    };

    let rules: HashSet<String> = rule_list
        .as_str()
        .split(',')
        .map(|item| item.trim().trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | ';')))
        .filter(|item| !item.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();

    if rules.is_empty() {
        Some(NoqaDirective::All)
    } else {
        Some(NoqaDirective::Rules(rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{node_types, Segment};

    #[test]
    fn parses_directive_forms() {
        assert_eq!(parse_noqa_comment("-- noqa"), Some(NoqaDirective::All));
        assert_eq!(parse_noqa_comment("--NOQA:"), Some(NoqaDirective::All));
        assert_eq!(parse_noqa_comment("-- not a directive"), None);
        assert_eq!(
            parse_noqa_comment("-- noqa: lt01, 'CP01'"),
            Some(NoqaDirective::Rules(
                ["LT01".to_string(), "CP01".to_string()].into_iter().collect()
            ))
        );
    }

    #[test]
    fn directives_apply_to_their_line() {
        let tree = Tree::from_segment(&Segment::compound(
            node_types::FILE,
            vec![
                Segment::leaf(node_types::KEYWORD, "select"),
                Segment::leaf(node_types::WHITESPACE, " "),
                Segment::leaf(node_types::INLINE_COMMENT, "-- noqa: LT01"),
                Segment::leaf(node_types::NEWLINE, "\n"),
                Segment::leaf(node_types::KEYWORD, "from"),
                Segment::leaf(node_types::WHITESPACE, " "),
                Segment::leaf(node_types::INLINE_COMMENT, "-- noqa"),
            ],
        ));
        let map = NoqaMap::from_tree(&tree);
        assert!(map.is_suppressed(1, "LT01"));
        assert!(!map.is_suppressed(1, "CP01"));
        assert!(map.is_suppressed(2, "CP01"));

        let keyword = NodeRef::new(&tree, tree.leaves()[0]);
        assert!(map.suppresses(&Violation::new("lt01", "x", &keyword)));
    }
}
