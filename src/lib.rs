//! dom-anchor: portable text anchors for document trees
//!
//! Robust conversion between a live range (a span across arbitrary nodes of
//! a document tree) and a portable, serializable [`Target`] (an anchor
//! element id plus a text-position/text-quote selector pair), and back
//! again, tolerant of document drift, injected foreign elements, and
//! approximate matches.
//!
//! # Architecture
//!
//! Everything is built on a small arena-backed [`Document`] tree standing in
//! for the browser DOM, so the algorithms run headlessly. Layered on top:
//! text-node collection with boundary splitting, exception-safe detachment
//! of foreign UI elements during measurement, the selector codec, anchor id
//! resolution with hierarchical fallback, and range marking. The
//! [`replace`] module adds reversible, target-anchored substitutions with
//! suggestion discovery.
//!
//! # Resolution policy
//!
//! Expected failure modes (a renumbered anchor, drifted offsets, text that
//! no longer exists) are answered with `None`, never an error. The
//! position selector is tried first and checked against the quoted text; on
//! a mismatch the quote selector is searched for, scored by context
//! similarity. Errors are reserved for structural misuse such as
//! out-of-bounds offsets.
//!
//! # Example
//!
//! ```no_run
//! use dom_anchor::{Document, DomRange, TargetConverter};
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let p = doc.push_element(root, "p")?;
//! doc.set_attr(p, "id", "sec_1")?;
//! let text = doc.push_text(p, "The quick brown fox")?;
//!
//! let converter = TargetConverter::new();
//! let range = DomRange::new(&doc, text, 4, text, 15)?;
//! let target = converter.range_to_target(&mut doc, &range, None).unwrap();
//! // ... persist `target` as JSON, reload it later ...
//! let restored = converter.target_to_range(&mut doc, &target, root).unwrap();
//! # Ok::<(), dom_anchor::DomError>(())
//! ```

pub mod anchor;
pub mod collect;
pub mod dom;
pub mod foreign;
pub mod mark;
pub mod replace;
pub mod selectors;
pub mod target;

// Re-exports
pub use anchor::resolve_anchor;
pub use collect::collect_text_nodes;
pub use dom::{Boundary, Document, DomError, DomRange, NodeId};
pub use foreign::{without_foreign_elements, ForeignMatcher, DEFAULT_FOREIGN_SELECTOR};
pub use mark::{mark_range, mark_range_with, unwrap_element};
pub use replace::{
    ReplaceError, ReplaceResult, Replacement, ReplacementData, ReplacementGroup, ReplacementIds,
};
pub use selectors::{Selector, SelectorCodec, DEFAULT_CONTEXT_LEN};
pub use target::{Target, TargetConverter};
