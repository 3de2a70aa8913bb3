//! Aligns rendered output with its template source.
//!
//! The source is split into literal chunks and tags. A trailing literal
//! chunk is pinned to the end of the rendered text first. The remaining
//! chunks are matched front to back: a chunk that follows a literal or a
//! control tag must start exactly at the cursor, and a chunk that follows
//! rendered output must occur exactly once before the pinned tail. Whatever
//! the renderer produced between two matched chunks is attributed to the
//! tags in between. Chunks that cannot be placed (whitespace control, loops
//! that never ran, text a variable also produced) are folded into the
//! surrounding templated region.

use crate::slice::{SliceKind, SliceMap, SliceMapError, TemplateSlice};
use crate::types::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Literal(Span),
    /// `{{ ... }}`: renders text.
    Expression(Span),
    /// `{% ... %}` and `{# ... #}`: render nothing by themselves.
    Control(Span),
}

/// Source consumed since the last matched literal.
#[derive(Default)]
struct Pending {
    source: Option<Span>,
    renders_text: bool,
}

impl Pending {
    fn add(&mut self, span: Span, renders_text: bool) {
        self.source = Some(match self.source {
            Some(existing) => Span::new(existing.start, span.end),
            None => span,
        });
        self.renders_text |= renders_text;
    }
}

pub(crate) fn slice_template(source: &str, rendered: &str) -> Result<SliceMap, SliceMapError> {
    let mut parts = split_source(source);
    let tail = pin_tail(&mut parts, source, rendered);
    let limit = tail.map_or(rendered.len(), |slice| slice.rendered.start);

    let mut slices = Vec::new();
    let mut pending = Pending::default();
    let mut cursor = 0;
    let mut source_cursor = 0;

    for part in parts {
        match part {
            Part::Expression(span) => pending.add(span, true),
            Part::Control(span) => pending.add(span, false),
            Part::Literal(span) => {
                let text = &source[span.start..span.end];
                match locate(rendered, cursor, limit, text, pending.renders_text) {
                    Some(at) => {
                        flush(&mut slices, &mut pending, Span::new(cursor, at), source_cursor);
                        slices.push(TemplateSlice::new(
                            SliceKind::Literal,
                            Span::new(at, at + text.len()),
                            span,
                        ));
                        cursor = at + text.len();
                    }
                    None => pending.add(span, true),
                }
            }
        }
        source_cursor = part_span(part).end;
    }
    flush(&mut slices, &mut pending, Span::new(cursor, limit), source_cursor);
    slices.extend(tail);
    SliceMap::new(slices, rendered.len())
}

/// Removes a trailing literal chunk from `parts` when the rendered text ends
/// with it. Everything after the last tag is always rendered verbatim.
fn pin_tail(parts: &mut Vec<Part>, source: &str, rendered: &str) -> Option<TemplateSlice> {
    if parts.len() < 2 {
        return None;
    }
    let Some(Part::Literal(span)) = parts.last().copied() else {
        return None;
    };
    if !rendered.ends_with(&source[span.start..span.end]) {
        return None;
    }
    parts.pop();
    let start = rendered.len() - span.len();
    Some(TemplateSlice::new(
        SliceKind::Literal,
        Span::new(start, rendered.len()),
        span,
    ))
}

/// Rendered offset of a literal chunk, searched in `cursor..limit`.
fn locate(rendered: &str, cursor: usize, limit: usize, text: &str, after_output: bool) -> Option<usize> {
    let window = rendered.get(cursor..limit)?;
    if !after_output {
        return window.starts_with(text).then_some(cursor);
    }
    let first = window.find(text)?;
    let step = window[first..].chars().next().map_or(1, char::len_utf8);
    if window[first + step..].contains(text) {
        return None;
    }
    Some(cursor + first)
}

fn flush(slices: &mut Vec<TemplateSlice>, pending: &mut Pending, rendered: Span, source_cursor: usize) {
    let taken = std::mem::take(pending);
    let kind = if rendered.is_empty() && !taken.renders_text {
        SliceKind::Block
    } else {
        SliceKind::Templated
    };
    match taken.source {
        Some(source) => slices.push(TemplateSlice::new(kind, rendered, source)),
        None if !rendered.is_empty() => slices.push(TemplateSlice::new(
            SliceKind::Templated,
            rendered,
            Span::point(source_cursor),
        )),
        None => {}
    }
}

fn part_span(part: Part) -> Span {
    match part {
        Part::Literal(span) | Part::Expression(span) | Part::Control(span) => span,
    }
}

fn split_source(source: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut position = 0;
    while position < source.len() {
        let Some((open, close, renders_text)) = next_tag(source, position) else {
            parts.push(Part::Literal(Span::new(position, source.len())));
            break;
        };
        if open > position {
            parts.push(Part::Literal(Span::new(position, open)));
        }
        let span = Span::new(open, close);
        parts.push(if renders_text {
            Part::Expression(span)
        } else {
            Part::Control(span)
        });
        position = close;
    }
    parts
}

/// Finds the next tag at or after `from`: (start, end, renders text).
fn next_tag(source: &str, from: usize) -> Option<(usize, usize, bool)> {
    let bytes = source.as_bytes();
    let mut index = from;
    while index + 1 < bytes.len() {
        if bytes[index] == b'{' {
            let closer = match bytes[index + 1] {
                b'{' => Some(("}}", true)),
                b'%' => Some(("%}", false)),
                b'#' => Some(("#}", false)),
                _ => None,
            };
            if let Some((closer, renders_text)) = closer {
                let end = source[index + 2..]
                    .find(closer)
                    .map_or(source.len(), |offset| index + 2 + offset + closer.len());
                return Some((index, end, renders_text));
            }
        }
        index += 1;
    }
    None
}
