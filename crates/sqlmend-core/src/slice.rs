//! Slice map: where each region of the rendered text came from.
//!
//! A templater splits its output into contiguous slices. Literal slices are
//! verbatim author text, templated slices were generated, and block slices
//! are control tags with no rendered counterpart. Fixes may only touch
//! literal text unless a rule explicitly opts in.

use crate::tree::TextEdit;
use crate::types::Span;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SliceKind {
    /// Verbatim author text.
    Literal,
    /// Text produced by the templater (substitutions, loop expansions).
    Templated,
    /// Template control syntax. Always zero-width in the rendered text.
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSlice {
    pub kind: SliceKind,
    /// Span of the rendered text covered by this slice.
    pub rendered: Span,
    /// Span of the original source this slice came from.
    pub source: Span,
}

impl TemplateSlice {
    pub fn new(kind: SliceKind, rendered: Span, source: Span) -> Self {
        Self {
            kind,
            rendered,
            source,
        }
    }

    pub fn is_literal(&self) -> bool {
        self.kind == SliceKind::Literal
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SliceMapError {
    #[error("slice {index} starts at {found}, expected {expected}")]
    Gap {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("slice {index} has an inverted span")]
    Inverted { index: usize },

    #[error("literal slice {index} maps {rendered} rendered bytes to {source_len} source bytes")]
    LiteralLengthMismatch {
        index: usize,
        rendered: usize,
        source_len: usize,
    },

    #[error("block slice {index} covers rendered text")]
    BlockNotEmpty { index: usize },

    #[error("slices cover {covered} bytes of a {expected} byte rendered text")]
    Coverage { covered: usize, expected: usize },
}

/// Ordered, contiguous slices covering the whole rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SliceMap {
    slices: Vec<TemplateSlice>,
    rendered_len: usize,
    /// Cleared once an edit lands outside a single literal slice, after which
    /// the original source can no longer be reconstructed.
    source_consistent: bool,
}

impl SliceMap {
    /// Validates that `slices` tile `0..rendered_len` without gaps.
    pub fn new(slices: Vec<TemplateSlice>, rendered_len: usize) -> Result<Self, SliceMapError> {
        let mut expected = 0;
        for (index, slice) in slices.iter().enumerate() {
            if slice.rendered.end < slice.rendered.start || slice.source.end < slice.source.start {
                return Err(SliceMapError::Inverted { index });
            }
            if slice.rendered.start != expected {
                return Err(SliceMapError::Gap {
                    index,
                    expected,
                    found: slice.rendered.start,
                });
            }
            match slice.kind {
                SliceKind::Literal if slice.rendered.len() != slice.source.len() => {
                    return Err(SliceMapError::LiteralLengthMismatch {
                        index,
                        rendered: slice.rendered.len(),
                        source_len: slice.source.len(),
                    });
                }
                SliceKind::Block if !slice.rendered.is_empty() => {
                    return Err(SliceMapError::BlockNotEmpty { index });
                }
                _ => {}
            }
            expected = slice.rendered.end;
        }
        if expected != rendered_len {
            return Err(SliceMapError::Coverage {
                covered: expected,
                expected: rendered_len,
            });
        }
        Ok(Self {
            slices,
            rendered_len,
            source_consistent: true,
        })
    }

    /// A map for untemplated input: one literal slice covering everything.
    pub fn literal(len: usize) -> Self {
        Self {
            slices: vec![TemplateSlice::new(
                SliceKind::Literal,
                Span::new(0, len),
                Span::new(0, len),
            )],
            rendered_len: len,
            source_consistent: true,
        }
    }

    pub fn slices(&self) -> &[TemplateSlice] {
        &self.slices
    }

    pub fn rendered_len(&self) -> usize {
        self.rendered_len
    }

    pub fn is_literal_only(&self) -> bool {
        self.slices.iter().all(TemplateSlice::is_literal)
    }

    /// Slices an edit of `span` would interact with.
    ///
    /// For a non-empty span: slices overlapping it plus zero-width slices
    /// strictly inside it. For an insertion point: slices containing the
    /// point or adjacent to it on either side.
    pub fn slices_touching(&self, span: Span) -> Vec<&TemplateSlice> {
        self.slices
            .iter()
            .filter(|slice| {
                let rendered = slice.rendered;
                if span.is_empty() {
                    rendered.start <= span.start && span.start <= rendered.end
                } else if rendered.is_empty() {
                    span.contains_point_strictly(rendered.start)
                } else {
                    rendered.overlaps(&span)
                }
            })
            .collect()
    }

    /// True if `span` may be rewritten without corrupting generated text.
    ///
    /// Rewrites must touch literal slices only. Insertion points are allowed
    /// when at least one neighbouring slice is literal.
    pub fn edit_is_template_safe(&self, span: Span) -> bool {
        let touching = self.slices_touching(span);
        if touching.is_empty() {
            return true;
        }
        if span.is_empty() {
            touching.iter().any(|slice| slice.is_literal())
        } else {
            touching.iter().all(|slice| slice.is_literal())
        }
    }

    /// True if `span` reaches into more than one literal block, i.e. the
    /// edit would straddle a template tag or generated region.
    pub fn spans_multiple_blocks(&self, span: Span) -> bool {
        if span.is_empty() {
            return false;
        }
        self.slices_touching(span)
            .iter()
            .filter(|slice| slice.is_literal() && !slice.rendered.is_empty())
            .count()
            > 1
    }

    /// Maps a rendered span back to the source. Exact inside one literal
    /// slice, otherwise the hull of the touched slices' source spans.
    ///
    /// Returns `None` inside a literal slice an edit has resized, since its
    /// rendered offsets no longer line up with the source.
    pub fn to_source_span(&self, span: Span) -> Option<Span> {
        let touching = self.slices_touching(span);
        if let [slice] = touching.as_slice() {
            if slice.is_literal() {
                if slice.rendered.len() != slice.source.len() {
                    return None;
                }
                let start = slice.source.start + (span.start - slice.rendered.start);
                return Some(Span::new(start, start + span.len()));
            }
        }
        let start = touching.iter().map(|slice| slice.source.start).min()?;
        let end = touching.iter().map(|slice| slice.source.end).max()?;
        Some(Span::new(start, end))
    }

    /// Shifts the map after `edit` so it stays authoritative for the next
    /// tree generation.
    pub fn apply_edit(&mut self, edit: &TextEdit) {
        let delta = edit.delta();
        let span = edit.span;
        let contains = |slice: &TemplateSlice| {
            slice.rendered.start <= span.start && span.end <= slice.rendered.end
        };

        let host = self
            .slices
            .iter()
            .position(|s| s.is_literal() && !s.rendered.is_empty() && contains(s))
            .or_else(|| {
                self.slices
                    .iter()
                    .position(|s| !s.rendered.is_empty() && contains(s))
            })
            .or_else(|| self.slices.iter().position(|s| contains(s)));

        match host {
            Some(index) => {
                let slice = &mut self.slices[index];
                slice.rendered.end = shift(slice.rendered.end, delta);
                if !slice.is_literal() {
                    self.source_consistent = false;
                    if slice.kind == SliceKind::Block && !slice.rendered.is_empty() {
                        slice.kind = SliceKind::Templated;
                    }
                }
                for later in &mut self.slices[index + 1..] {
                    later.rendered = shift_span(later.rendered, delta);
                }
            }
            None => self.merge_over(span, delta),
        }
        self.rendered_len = shift(self.rendered_len, delta);
    }

    fn merge_over(&mut self, span: Span, delta: isize) {
        self.source_consistent = false;
        let first = self.slices.iter().position(|s| s.rendered.end > span.start);
        let Some(first) = first else {
            return;
        };
        let last = self
            .slices
            .iter()
            .rposition(|s| s.rendered.start < span.end)
            .unwrap_or(first)
            .max(first);
        let merged = TemplateSlice::new(
            SliceKind::Templated,
            Span::new(
                self.slices[first].rendered.start,
                shift(self.slices[last].rendered.end, delta),
            ),
            Span::new(
                self.slices[first..=last]
                    .iter()
                    .map(|s| s.source.start)
                    .min()
                    .unwrap_or(0),
                self.slices[first..=last]
                    .iter()
                    .map(|s| s.source.end)
                    .max()
                    .unwrap_or(0),
            ),
        );
        for later in &mut self.slices[last + 1..] {
            later.rendered = shift_span(later.rendered, delta);
        }
        drop(self.slices.splice(first..=last, [merged]));
    }

    /// Rebuilds the original source with every edit to literal text carried
    /// over. Returns `None` once an edit has touched generated text, or when
    /// an edited literal belongs to a repeated (looped) region.
    pub fn reconstruct_source(&self, source: &str, rendered: &str) -> Option<String> {
        if !self.source_consistent {
            return None;
        }
        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for slice in &self.slices {
            let original = source.get(slice.source.start..slice.source.end)?;
            let current = match slice.kind {
                SliceKind::Literal => rendered.get(slice.rendered.start..slice.rendered.end)?,
                SliceKind::Templated | SliceKind::Block => original,
            };
            if slice.source.start < cursor {
                if current != original {
                    return None;
                }
                continue;
            }
            out.push_str(source.get(cursor..slice.source.start)?);
            out.push_str(current);
            cursor = slice.source.end;
        }
        out.push_str(source.get(cursor..)?);
        Some(out)
    }
}

fn shift(offset: usize, delta: isize) -> usize {
    offset.saturating_add_signed(delta)
}

fn shift_span(span: Span, delta: isize) -> Span {
    Span::new(shift(span.start, delta), shift(span.end, delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `select {{ col }} from t` rendered as `select a from t`.
    fn templated_map() -> SliceMap {
        SliceMap::new(
            vec![
                TemplateSlice::new(SliceKind::Literal, Span::new(0, 7), Span::new(0, 7)),
                TemplateSlice::new(SliceKind::Templated, Span::new(7, 8), Span::new(7, 16)),
                TemplateSlice::new(SliceKind::Literal, Span::new(8, 15), Span::new(16, 23)),
            ],
            15,
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_gaps_and_bad_coverage() {
        let gap = SliceMap::new(
            vec![
                TemplateSlice::new(SliceKind::Literal, Span::new(0, 2), Span::new(0, 2)),
                TemplateSlice::new(SliceKind::Literal, Span::new(3, 4), Span::new(3, 4)),
            ],
            4,
        );
        assert!(matches!(gap, Err(SliceMapError::Gap { index: 1, .. })));

        let short = SliceMap::new(
            vec![TemplateSlice::new(SliceKind::Literal, Span::new(0, 2), Span::new(0, 2))],
            4,
        );
        assert!(matches!(short, Err(SliceMapError::Coverage { .. })));

        let block = SliceMap::new(
            vec![TemplateSlice::new(SliceKind::Block, Span::new(0, 2), Span::new(0, 9))],
            2,
        );
        assert!(matches!(block, Err(SliceMapError::BlockNotEmpty { index: 0 })));
    }

    #[test]
    fn template_safety_checks_touched_slices() {
        let map = templated_map();
        assert!(map.edit_is_template_safe(Span::new(0, 6)));
        assert!(!map.edit_is_template_safe(Span::new(7, 8)));
        assert!(!map.edit_is_template_safe(Span::new(6, 9)));
        // Insertion at the edge of generated text is fine.
        assert!(map.edit_is_template_safe(Span::point(7)));
        assert!(map.spans_multiple_blocks(Span::new(6, 9)));
        assert!(!map.spans_multiple_blocks(Span::new(0, 7)));
    }

    #[test]
    fn source_spans_map_through_literals() {
        let map = templated_map();
        assert_eq!(map.to_source_span(Span::new(9, 13)), Some(Span::new(17, 21)));
        assert_eq!(map.to_source_span(Span::new(7, 8)), Some(Span::new(7, 16)));
    }

    #[test]
    fn resized_literals_no_longer_map_to_the_source() {
        let mut map = templated_map();
        map.apply_edit(&TextEdit {
            span: Span::new(10, 12),
            replacement_len: 0,
        });
        assert_eq!(map.to_source_span(Span::new(11, 12)), None);
        // The untouched literal still maps exactly.
        assert_eq!(map.to_source_span(Span::new(0, 6)), Some(Span::new(0, 6)));
    }

    #[test]
    fn apply_edit_shifts_later_slices_and_rebuilds_source() {
        let source = "select  {{ col }} from t";
        let mut map = SliceMap::new(
            vec![
                TemplateSlice::new(SliceKind::Literal, Span::new(0, 8), Span::new(0, 8)),
                TemplateSlice::new(SliceKind::Templated, Span::new(8, 9), Span::new(8, 17)),
                TemplateSlice::new(SliceKind::Literal, Span::new(9, 16), Span::new(17, 24)),
            ],
            16,
        )
        .unwrap();

        map.apply_edit(&TextEdit {
            span: Span::new(6, 8),
            replacement_len: 1,
        });

        assert_eq!(map.rendered_len(), 15);
        assert_eq!(map.slices()[0].rendered, Span::new(0, 7));
        assert_eq!(map.slices()[1].rendered, Span::new(7, 8));
        assert_eq!(
            map.reconstruct_source(source, "select a from t").as_deref(),
            Some("select {{ col }} from t")
        );
    }

    #[test]
    fn edits_over_generated_text_disable_source_reconstruction() {
        let mut map = templated_map();
        map.apply_edit(&TextEdit {
            span: Span::new(6, 9),
            replacement_len: 0,
        });
        assert_eq!(map.rendered_len(), 12);
        assert!(map.reconstruct_source("select {{ col }} from t", "selectrom t").is_none());
        let covered: usize = map.slices().iter().map(|s| s.rendered.len()).sum();
        assert_eq!(covered, 12);
    }
}
