//! Anchor id resolution with hierarchical fallback.
//!
//! Rendered documents carry compound ids with `__`-joined segments, e.g.
//! `part_I__chp_One__art_I__para_1`. When renumbering removes the exact id,
//! the closest surviving ancestor id is still a usable (if coarser) anchor.

use crate::dom::{Document, NodeId};

/// Resolve `anchor_id` to an element under `scope` (inclusive).
///
/// On a miss, trailing `__segment`s are stripped one at a time and the
/// lookup retried, so `a__b__c` can degrade to `a__b` and then `a`. Callers
/// must accept that the returned element may cover a wider span than the id
/// originally named. `None` once no segments remain.
pub fn resolve_anchor(doc: &Document, scope: NodeId, anchor_id: &str) -> Option<NodeId> {
    let mut id = anchor_id;
    loop {
        if !id.is_empty() {
            if let Some(node) = doc.find_by_id(scope, id) {
                return Some(node);
            }
        }
        match id.rfind("__") {
            Some(split) if split > 0 => id = &id[..split],
            _ => return None,
        }
    }
}
