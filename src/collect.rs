//! Enumeration of the text nodes covered by a range.
//!
//! Boundary text nodes are split first so that collection always works on
//! whole nodes; the caller gets back exactly the nodes whose full content
//! lies inside the range.

use crate::dom::{Boundary, Document, DomError, DomRange, NodeId};

/// Tags whose immediate text children are layout artifacts (whitespace
/// between rows/cells), not semantic content.
const TABLE_STRUCTURE: [&str; 4] = ["table", "thead", "tbody", "tr"];

fn is_table_structure(tag: &str) -> bool {
    TABLE_STRUCTURE.contains(&tag)
}

/// All text nodes under `root` in document order, excluding those parented
/// directly by a table-structure element.
pub(crate) fn semantic_text_nodes(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.text_nodes_under(root)
        .into_iter()
        .filter(|&node| {
            doc.parent(node)
                .and_then(|p| doc.tag(p))
                .map(|tag| !is_table_structure(tag))
                .unwrap_or(true)
        })
        .collect()
}

/// Collect the text nodes fully covered by `range`, in document order.
///
/// Text boundary containers are split at the range offsets so the boundaries
/// align with node edges; splitting subdivides content but never loses it.
/// Element boundary containers resolve to the first text node at or after
/// the boundary point. Returns an empty list when the range touches no text.
/// Collapsed ranges cover nothing and leave the tree untouched.
pub fn collect_text_nodes(doc: &mut Document, range: &DomRange) -> Result<Vec<NodeId>, DomError> {
    if range.is_collapsed() {
        return Ok(Vec::new());
    }
    let mut start = range.start;
    let mut end = range.end;

    if doc.is_text(start.node) && start.offset > 0 {
        let tail = doc.split_text(start.node, start.offset)?;
        // A range contained in a single text node ends in the tail half
        if end.node == start.node {
            end = Boundary {
                node: tail,
                offset: end.offset - start.offset,
            };
        }
        start = Boundary {
            node: tail,
            offset: 0,
        };
    }
    if doc.is_text(end.node) {
        let len = doc.text(end.node).map(str::len).unwrap_or(0);
        if end.offset < len {
            doc.split_text(end.node, end.offset)?;
        }
    }

    let Some(ancestor) = common_ancestor_of(doc, start.node, end.node) else {
        return Ok(Vec::new());
    };

    // Lexicographic keys over node paths: a text start node is included from
    // itself onwards; an element boundary (node, i) sits before child i.
    let start_key = if doc.is_text(start.node) {
        doc.node_path(start.node)
    } else {
        boundary_key(doc, &start)
    };
    let end_key = if doc.is_text(end.node) {
        let mut key = doc.node_path(end.node);
        key.push(usize::MAX); // include the end node itself
        key
    } else {
        boundary_key(doc, &end)
    };

    let mut collected = Vec::new();
    for node in semantic_text_nodes(doc, ancestor) {
        let path = doc.node_path(node);
        if path < start_key {
            continue;
        }
        if path >= end_key {
            break;
        }
        collected.push(node);
    }
    Ok(collected)
}

fn common_ancestor_of(doc: &Document, a: NodeId, b: NodeId) -> Option<NodeId> {
    let mut current = Some(a);
    while let Some(id) = current {
        if doc.is_inclusive_ancestor(id, b) {
            return Some(id);
        }
        current = doc.parent(id);
    }
    None
}

fn boundary_key(doc: &Document, boundary: &Boundary) -> Vec<usize> {
    let mut key = doc.node_path(boundary.node);
    key.push(boundary.offset);
    key
}
