//! Visual decoration of ranges by wrapping their text nodes.
//!
//! Wrapping is a structural mutation: any other live range or freshly
//! resolved target that referred through the wrapped nodes is stale
//! afterwards and must be recomputed.

use crate::collect::collect_text_nodes;
use crate::dom::{Document, DomError, DomRange, NodeId};

/// Wrap every text node covered by `range` in a fresh element with the
/// given tag. Returns the wrapper elements in document order.
pub fn mark_range(
    doc: &mut Document,
    range: &DomRange,
    tag: &str,
) -> Result<Vec<NodeId>, DomError> {
    mark_range_with(doc, range, |doc| doc.create_element(tag), |_, _, _| true)
}

/// Wrap the text nodes of `range` using a caller-supplied element factory.
///
/// For each covered text node, `make_element` builds a detached wrapper and
/// `mutate(doc, wrapper, text_node)` may adjust it, or veto the wrap by
/// returning `false`, in which case the text node stays untouched and the
/// wrapper is discarded. Kept wrappers are inserted in the text node's
/// place with the text node moved inside.
pub fn mark_range_with(
    doc: &mut Document,
    range: &DomRange,
    mut make_element: impl FnMut(&mut Document) -> NodeId,
    mut mutate: impl FnMut(&mut Document, NodeId, NodeId) -> bool,
) -> Result<Vec<NodeId>, DomError> {
    let nodes = collect_text_nodes(doc, range)?;
    let mut wrappers = Vec::with_capacity(nodes.len());
    for node in nodes {
        let wrapper = make_element(doc);
        if !mutate(doc, wrapper, node) {
            continue;
        }
        doc.insert_before(wrapper, node)?;
        doc.detach(node)?;
        doc.append(wrapper, node)?;
        wrappers.push(wrapper);
    }
    Ok(wrappers)
}

/// Undo one wrap: move the wrapper's children back into its place and
/// detach the wrapper. The inverse of a single [`mark_range`] step; callers
/// normalize afterwards to restore original text-node adjacency.
pub fn unwrap_element(doc: &mut Document, wrapper: NodeId) -> Result<(), DomError> {
    let children: Vec<NodeId> = doc.children(wrapper).to_vec();
    for child in children {
        doc.insert_before(child, wrapper)?;
    }
    doc.detach(wrapper)?;
    Ok(())
}
