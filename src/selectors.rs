//! Position and quote selectors: the portable half of a range.
//!
//! A range is described twice for resilience. The position selector is exact
//! but brittle (any text inserted before the span shifts it); the quote
//! selector survives shifts but needs context to disambiguate repeated
//! occurrences. Resolution tries position first, checks it against the
//! quote, and falls back to a context-scored quote search when the document
//! has drifted.

use serde::{Deserialize, Serialize};

use crate::collect::semantic_text_nodes;
use crate::dom::{Boundary, Document, DomRange, NodeId};

/// Default number of bytes of context captured on each side of the quoted
/// text (clamped to character boundaries and document edges).
pub const DEFAULT_CONTEXT_LEN: usize = 32;

/// A serializable description of a text span, relative to an anchor
/// element's semantic text: foreign elements are detached and text nodes
/// sitting directly in table structure (layout whitespace between rows and
/// cells) are skipped before measuring, so a stored position means the same
/// thing whether or not the document contains tables.
///
/// Offsets and context lengths are UTF-8 byte counts; the same convention is
/// applied on encode and decode so round-trips are exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selector {
    #[serde(rename = "TextPositionSelector")]
    TextPosition { start: usize, end: usize },

    #[serde(rename = "TextQuoteSelector")]
    TextQuote {
        exact: String,
        prefix: String,
        suffix: String,
    },
}

/// Converts between ranges and selector pairs within one anchor element.
#[derive(Debug, Clone)]
pub struct SelectorCodec {
    context_len: usize,
}

impl SelectorCodec {
    pub fn new() -> Self {
        SelectorCodec {
            context_len: DEFAULT_CONTEXT_LEN,
        }
    }

    pub fn with_context_len(context_len: usize) -> Self {
        SelectorCodec { context_len }
    }

    /// Describe `range` as a position selector and a quote selector, both
    /// relative to `anchor`'s text content.
    ///
    /// Returns `None` when either boundary lies outside the anchor's
    /// measurable text (e.g. inside skipped table structure).
    pub fn describe(
        &self,
        doc: &Document,
        anchor: NodeId,
        range: &DomRange,
    ) -> Option<(Selector, Selector)> {
        let flat = FlatText::build(doc, anchor);
        let start = flat.offset_of_boundary(doc, &range.start)?;
        let end = flat.offset_of_boundary(doc, &range.end)?;
        if end < start {
            return None;
        }

        let exact = flat.text.get(start..end)?.to_string();
        let prefix_start = floor_char_boundary(&flat.text, start.saturating_sub(self.context_len));
        let suffix_end = ceil_char_boundary(&flat.text, (end + self.context_len).min(flat.text.len()));
        let prefix = flat.text[prefix_start..start].to_string();
        let suffix = flat.text[end..suffix_end].to_string();

        Some((
            Selector::TextPosition { start, end },
            Selector::TextQuote {
                exact,
                prefix,
                suffix,
            },
        ))
    }

    /// Resolve selectors back to a range within `anchor`.
    ///
    /// A position selector whose text still equals the quoted `exact` wins
    /// outright; a mismatch signals drift and falls through to a quote
    /// search scored by context similarity. `None` means the span cannot be
    /// located in the current document.
    pub fn resolve(
        &self,
        doc: &Document,
        anchor: NodeId,
        selectors: &[Selector],
    ) -> Option<DomRange> {
        let flat = FlatText::build(doc, anchor);
        let position = selectors.iter().find_map(|s| match s {
            Selector::TextPosition { start, end } => Some((*start, *end)),
            _ => None,
        });
        let quote = selectors.iter().find_map(|s| match s {
            Selector::TextQuote {
                exact,
                prefix,
                suffix,
            } => Some((exact.as_str(), prefix.as_str(), suffix.as_str())),
            _ => None,
        });

        if let Some((start, end)) = position {
            if start <= end {
                if let Some(found) = flat.text.get(start..end) {
                    match quote {
                        // Document unchanged at this position
                        Some((exact, _, _)) if found == exact => {
                            return flat.range_at(doc, start, end);
                        }
                        Some(_) => {} // drift: fall through to quote search
                        None => return flat.range_at(doc, start, end),
                    }
                }
            }
        }

        let (exact, prefix, suffix) = quote?;
        if exact.is_empty() {
            return None;
        }
        let (start, end) = self.best_quote_match(&flat.text, exact, prefix, suffix)?;
        flat.range_at(doc, start, end)
    }

    /// Best occurrence of `exact`, scored by similarity of the observed
    /// context around each candidate against the stored prefix/suffix.
    fn best_quote_match(
        &self,
        haystack: &str,
        exact: &str,
        prefix: &str,
        suffix: &str,
    ) -> Option<(usize, usize)> {
        let mut best: Option<(f64, usize)> = None;
        for (start, _) in haystack.match_indices(exact) {
            let end = start + exact.len();
            let ctx_start = floor_char_boundary(haystack, start.saturating_sub(self.context_len));
            let ctx_end = ceil_char_boundary(haystack, (end + self.context_len).min(haystack.len()));
            let observed_prefix = &haystack[ctx_start..start];
            let observed_suffix = &haystack[end..ctx_end];

            let score = strsim::normalized_levenshtein(observed_prefix, prefix)
                + strsim::normalized_levenshtein(observed_suffix, suffix);
            // Ties keep the earliest occurrence
            if best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, start));
            }
        }
        best.map(|(_, start)| (start, start + exact.len()))
    }
}

impl Default for SelectorCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Flattened view of an anchor's measurable text: the concatenation of its
/// semantic text nodes plus the flat offset at which each node starts.
pub(crate) struct FlatText {
    pub text: String,
    /// (text node, flat offset of its first byte), in document order
    segments: Vec<(NodeId, usize)>,
}

impl FlatText {
    pub(crate) fn build(doc: &Document, root: NodeId) -> FlatText {
        let mut text = String::new();
        let mut segments = Vec::new();
        for node in semantic_text_nodes(doc, root) {
            segments.push((node, text.len()));
            text.push_str(doc.text(node).unwrap_or_default());
        }
        FlatText { text, segments }
    }

    /// Flat offset of a range boundary, or `None` when the boundary's node
    /// does not participate in the measurable text.
    pub(crate) fn offset_of_boundary(&self, doc: &Document, boundary: &Boundary) -> Option<usize> {
        if doc.is_text(boundary.node) {
            let (_, seg_start) = self
                .segments
                .iter()
                .find(|(node, _)| *node == boundary.node)?;
            return Some(seg_start + boundary.offset);
        }
        // Element boundary: flat offset where the first segment at or after
        // the boundary point begins. Node paths compare lexicographically,
        // so extending the element's path by the child index orders the
        // boundary against every text node.
        let mut boundary_key = doc.node_path(boundary.node);
        boundary_key.push(boundary.offset);
        for &(node, seg_start) in &self.segments {
            if doc.node_path(node) >= boundary_key {
                return Some(seg_start);
            }
        }
        Some(self.text.len())
    }

    /// Map flat offsets back to a validated range.
    pub(crate) fn range_at(&self, doc: &Document, start: usize, end: usize) -> Option<DomRange> {
        let start_boundary = self.start_boundary_at(doc, start)?;
        let end_boundary = self.end_boundary_at(doc, end)?;
        DomRange::new(
            doc,
            start_boundary.node,
            start_boundary.offset,
            end_boundary.node,
            end_boundary.offset,
        )
        .ok()
    }

    /// Clip the flat span `[start, end)` against segment boundaries,
    /// yielding one flat sub-span per text node it touches. This is how a
    /// per-node text search sees a match that crosses node boundaries.
    pub(crate) fn split_into_segments(
        &self,
        doc: &Document,
        start: usize,
        end: usize,
    ) -> Vec<(usize, usize)> {
        let mut pieces = Vec::new();
        for (i, &(_, seg_start)) in self.segments.iter().enumerate() {
            let seg_end = seg_start + self.segment_len(doc, i);
            let piece_start = start.max(seg_start);
            let piece_end = end.min(seg_end);
            if piece_start < piece_end {
                pieces.push((piece_start, piece_end));
            }
        }
        pieces
    }

    fn segment_len(&self, doc: &Document, index: usize) -> usize {
        doc.text(self.segments[index].0).unwrap_or_default().len()
    }

    /// Boundary for a span start: prefers the beginning of the next node
    /// over the end of the previous one.
    fn start_boundary_at(&self, doc: &Document, offset: usize) -> Option<Boundary> {
        for (i, &(node, seg_start)) in self.segments.iter().enumerate() {
            let seg_end = seg_start + self.segment_len(doc, i);
            if offset < seg_end || (offset == seg_end && i == self.segments.len() - 1) {
                return Some(Boundary {
                    node,
                    offset: offset - seg_start,
                });
            }
        }
        None
    }

    /// Boundary for a span end: prefers the end of the previous node over
    /// the beginning of the next one.
    fn end_boundary_at(&self, doc: &Document, offset: usize) -> Option<Boundary> {
        for (i, &(node, seg_start)) in self.segments.iter().enumerate() {
            let seg_end = seg_start + self.segment_len(doc, i);
            if offset <= seg_end && (offset > seg_start || offset == 0) {
                return Some(Boundary {
                    node,
                    offset: offset - seg_start,
                });
            }
        }
        None
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn ceil_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset < text.len() && !text.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}
