//! Temporary removal of injected UI elements during measurement.
//!
//! Annotation gutters, citation popups and similar decorations are inserted
//! into the rendered document but are not part of its semantic text. Any
//! offset measurement or marking must run with them detached, and they must
//! come back at their original positions no matter how the measured code
//! exits; the restore lives in a `Drop` impl so unwinding cannot skip it.

use crate::dom::{Document, NodeId};

/// Selector for elements injected by the rendering UI, excluded from all
/// text measurement.
pub const DEFAULT_FOREIGN_SELECTOR: &str = ".tausi";

/// Matches the elements to treat as foreign: either a `.class` or a tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignMatcher {
    Class(String),
    Tag(String),
}

impl ForeignMatcher {
    /// Parse a selector string: a leading `.` selects by class, anything
    /// else by tag name.
    pub fn parse(selector: &str) -> Self {
        match selector.strip_prefix('.') {
            Some(class) => ForeignMatcher::Class(class.to_string()),
            None => ForeignMatcher::Tag(selector.to_string()),
        }
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            ForeignMatcher::Class(class) => doc.has_class(node, class),
            ForeignMatcher::Tag(tag) => doc.tag(node) == Some(tag.as_str()),
        }
    }
}

impl Default for ForeignMatcher {
    fn default() -> Self {
        ForeignMatcher::parse(DEFAULT_FOREIGN_SELECTOR)
    }
}

/// Where a detached element goes back to: before its recorded next sibling,
/// or appended to its recorded parent when it was the last child or when
/// the callback has since removed the sibling.
#[derive(Debug, Clone, Copy)]
struct RestoreSite {
    parent: NodeId,
    before: Option<NodeId>,
}

/// RAII stash of detached foreign elements. Dropping it reinserts every
/// element at its recorded position, in reverse removal order so that nested
/// foreign elements land back inside their restored parents.
struct ForeignStash<'a> {
    doc: &'a mut Document,
    removed: Vec<(NodeId, RestoreSite)>,
}

impl<'a> ForeignStash<'a> {
    fn detach(doc: &'a mut Document, root: NodeId, matcher: &ForeignMatcher) -> Self {
        let mut matched = Vec::new();
        collect_matching(doc, root, matcher, &mut matched);

        let mut removed = Vec::new();
        for node in matched {
            let Some(parent) = doc.parent(node) else {
                continue;
            };
            let site = RestoreSite {
                parent,
                before: doc.next_sibling(node),
            };
            let _ = doc.detach(node);
            removed.push((node, site));
        }
        ForeignStash { doc, removed }
    }
}

impl Drop for ForeignStash<'_> {
    fn drop(&mut self) {
        // Reverse removal order: a recorded sibling or parent that was itself
        // detached later is already back in place when we need it.
        for (node, site) in self.removed.drain(..).rev() {
            let result = match reinsertion_anchor(self.doc, &site) {
                Some(sibling) => self.doc.insert_before(node, sibling),
                // The callback removed the recorded sibling outright; the
                // parent's end is the best remaining position.
                None => self.doc.append(site.parent, node),
            };
            let _ = result;
        }
    }
}

/// Child of `site.parent` to reinsert before. The recorded sibling may have
/// been wrapped by the callback (marking moves text nodes inside fresh
/// elements), in which case the wrapper now occupies the sibling's slot, so
/// the closest ancestor of the sibling that is still a direct child of the
/// recorded parent keeps the element at its original position.
fn reinsertion_anchor(doc: &Document, site: &RestoreSite) -> Option<NodeId> {
    let mut current = site.before;
    while let Some(id) = current {
        if doc.parent(id) == Some(site.parent) {
            return Some(id);
        }
        current = doc.parent(id);
    }
    None
}

/// Pre-order walk collecting matching elements under `root` (exclusive).
fn collect_matching(doc: &Document, root: NodeId, matcher: &ForeignMatcher, out: &mut Vec<NodeId>) {
    for &child in doc.children(root) {
        if doc.is_element(child) {
            if matcher.matches(doc, child) {
                out.push(child);
            }
            collect_matching(doc, child, matcher, out);
        }
    }
}

/// Run `f` with every element under `root` matching `matcher` detached from
/// the tree, restoring all of them afterwards, including when `f` panics.
/// Returns whatever `f` returns.
pub fn without_foreign_elements<R>(
    doc: &mut Document,
    root: NodeId,
    matcher: &ForeignMatcher,
    f: impl FnOnce(&mut Document) -> R,
) -> R {
    let mut stash = ForeignStash::detach(doc, root, matcher);
    f(&mut *stash.doc)
}
