//! Portable targets: the top-level range conversion API.
//!
//! A [`Target`] is the serializable description of a text span that gets
//! persisted or sent to an annotation store: the id of the closest stable
//! anchor element plus a position/quote selector pair. Conversion never
//! fails loudly: a span that cannot be described or re-located in the
//! current document yields `None`, and the caller decides what that means.

use serde::{Deserialize, Serialize};

use crate::anchor::resolve_anchor;
use crate::dom::{Document, DomRange, NodeId};
use crate::foreign::{without_foreign_elements, ForeignMatcher};
use crate::selectors::{Selector, SelectorCodec};

/// Wire format consumed from and produced to the annotation store:
/// `{ "anchor_id": ..., "selectors": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub anchor_id: String,
    pub selectors: Vec<Selector>,
}

/// Converts between live ranges and portable targets.
#[derive(Debug, Clone, Default)]
pub struct TargetConverter {
    codec: SelectorCodec,
    foreign: ForeignMatcher,
}

impl TargetConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parts(codec: SelectorCodec, foreign: ForeignMatcher) -> Self {
        TargetConverter { codec, foreign }
    }

    pub(crate) fn foreign_matcher(&self) -> &ForeignMatcher {
        &self.foreign
    }

    /// Describe a live range as a portable target.
    ///
    /// The anchor is the closest ancestor of the range's common ancestor
    /// carrying an id. When `scope` is given and the anchor falls outside
    /// it, conversion fails: a range must not escape the caller's document
    /// scope. Selectors are measured with foreign elements detached.
    pub fn range_to_target(
        &self,
        doc: &mut Document,
        range: &DomRange,
        scope: Option<NodeId>,
    ) -> Option<Target> {
        let common = range.common_ancestor(doc)?;
        let anchor = doc.closest_with_id(common)?;
        if let Some(scope) = scope {
            if !doc.is_inclusive_ancestor(scope, anchor) {
                return None;
            }
        }
        let anchor_id = doc.element_id(anchor)?.to_string();
        let (position, quote) = without_foreign_elements(doc, anchor, &self.foreign, |doc| {
            self.codec.describe(doc, anchor, range)
        })?;
        Some(Target {
            anchor_id,
            selectors: vec![position, quote],
        })
    }

    /// Reconstruct a live range from a stored target.
    ///
    /// The anchor id resolves under `scope` with hierarchical fallback;
    /// selectors decode with foreign elements detached. `None` when the
    /// anchor is gone or the document has drifted beyond what the quote
    /// search can recover.
    pub fn target_to_range(
        &self,
        doc: &mut Document,
        target: &Target,
        scope: NodeId,
    ) -> Option<DomRange> {
        let anchor = resolve_anchor(doc, scope, &target.anchor_id)?;
        without_foreign_elements(doc, anchor, &self.foreign, |doc| {
            self.codec.resolve(doc, anchor, &target.selectors)
        })
    }
}
