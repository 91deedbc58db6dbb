//! Minimal document tree used as the substrate for anchoring.
//!
//! This is deliberately not a full DOM: it models exactly what the anchoring
//! algorithms need: an arena of element/text nodes with parent/child links,
//! attributes, text splitting and merging, and total document ordering.
//! Detached nodes stay in the arena so they can be reinserted later, which is
//! what the foreign-element guard relies on.

mod range;
mod tree;

pub use range::{Boundary, DomRange};
pub use tree::{Document, NodeId};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("node is not a text node")]
    NotText,

    #[error("node is not an element")]
    NotElement,

    #[error("offset {offset} out of bounds (length {len})")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("offset {0} is not a character boundary")]
    NotCharBoundary(usize),

    #[error("node has no parent in the tree")]
    Detached,

    #[error("cannot insert a node into its own subtree")]
    CyclicInsertion,

    #[error("range start is after range end")]
    InvertedRange,
}
