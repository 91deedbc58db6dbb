use crate::dom::tree::{Document, NodeId};
use crate::dom::DomError;

/// One endpoint of a [`DomRange`].
///
/// For text nodes the offset is a byte offset into the node's content; for
/// elements it is a child index (the boundary sits before that child, or
/// after the last child when equal to the child count).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

/// A live span between two boundaries of a [`Document`].
///
/// Ranges are ephemeral: any structural mutation of the tree (splitting,
/// wrapping, replacement) can invalidate them, so they are derived from and
/// converted back to portable targets rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl DomRange {
    /// Build a range after validating both boundaries and their order.
    pub fn new(
        doc: &Document,
        start_node: NodeId,
        start_offset: usize,
        end_node: NodeId,
        end_offset: usize,
    ) -> Result<Self, DomError> {
        let start = Boundary {
            node: start_node,
            offset: start_offset,
        };
        let end = Boundary {
            node: end_node,
            offset: end_offset,
        };
        validate_boundary(doc, &start)?;
        validate_boundary(doc, &end)?;
        let range = DomRange { start, end };
        if range.is_inverted(doc) {
            return Err(DomError::InvertedRange);
        }
        Ok(range)
    }

    /// Range covering the full content of a single text node.
    pub fn over_text_node(doc: &Document, node: NodeId) -> Result<Self, DomError> {
        let len = doc.text(node).ok_or(DomError::NotText)?.len();
        DomRange::new(doc, node, 0, node, len)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Deepest node containing both boundaries.
    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        let mut current = Some(self.start.node);
        while let Some(id) = current {
            if doc.is_inclusive_ancestor(id, self.end.node) {
                return Some(id);
            }
            current = doc.parent(id);
        }
        None
    }

    fn is_inverted(&self, doc: &Document) -> bool {
        boundary_sort_key(doc, &self.start) > boundary_sort_key(doc, &self.end)
    }
}

/// Lexicographic sort key placing a boundary in document order. Text offsets
/// and element child indices both extend the node path by one step, which is
/// enough for ordering boundaries against each other.
pub(crate) fn boundary_sort_key(doc: &Document, boundary: &Boundary) -> Vec<usize> {
    let mut key = doc.node_path(boundary.node);
    key.push(boundary.offset);
    key
}

fn validate_boundary(doc: &Document, boundary: &Boundary) -> Result<(), DomError> {
    if let Some(text) = doc.text(boundary.node) {
        if boundary.offset > text.len() {
            return Err(DomError::OffsetOutOfBounds {
                offset: boundary.offset,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(boundary.offset) {
            return Err(DomError::NotCharBoundary(boundary.offset));
        }
    } else {
        let child_count = doc.children(boundary.node).len();
        if boundary.offset > child_count {
            return Err(DomError::OffsetOutOfBounds {
                offset: boundary.offset,
                len: child_count,
            });
        }
    }
    Ok(())
}
