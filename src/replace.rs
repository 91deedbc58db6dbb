//! Reversible text substitutions anchored to targets.
//!
//! A [`Replacement`] tracks one find/replace pair at one location. Applying
//! it rewrites the live document and refreshes the target to describe the
//! new span, so the operation round-trips: unapply restores the original
//! text at the original place. Groups of replacements sharing the same pair
//! can re-discover further occurrences of the original text elsewhere in
//! the document as suggestions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collect::collect_text_nodes;
use crate::dom::{Document, DomError, DomRange, NodeId};
use crate::foreign::without_foreign_elements;
use crate::mark::{mark_range_with, unwrap_element};
use crate::selectors::FlatText;
use crate::target::{Target, TargetConverter};

#[derive(Error, Debug)]
pub enum ReplaceError {
    #[error("document error: {0}")]
    Dom(#[from] DomError),

    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Outcome of an apply/unapply request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "ReplaceResult should be checked for Unresolved"]
pub enum ReplaceResult {
    /// The document was rewritten and the target refreshed.
    Applied,
    /// Already in the requested state; the document was not touched.
    AlreadyDone,
    /// The target no longer resolves in this document.
    Unresolved,
}

/// Issues replacement ids scoped to one document session, so ids from
/// unrelated documents (or tests) never collide.
#[derive(Debug, Default)]
pub struct ReplacementIds {
    next: u64,
}

impl ReplacementIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Serialized form of a replacement:
/// `{ "old_text": ..., "new_text": ..., "target": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementData {
    pub old_text: String,
    pub new_text: String,
    pub target: Target,
}

/// One reversible substitution anchored to a [`Target`].
#[derive(Debug, Clone)]
pub struct Replacement {
    pub id: u64,
    /// Scope element owning this replacement; targets are resolved and
    /// recomputed relative to it.
    pub root: NodeId,
    pub old_text: String,
    pub new_text: String,
    pub target: Target,
    pub applied: bool,
    /// Whether this replacement was auto-discovered rather than user-made.
    pub suggestion: bool,
    /// Live mark elements from the last `mark()` call.
    marks: Vec<NodeId>,
}

impl Replacement {
    pub fn new(
        ids: &mut ReplacementIds,
        root: NodeId,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
        target: Target,
    ) -> Self {
        Replacement {
            id: ids.next_id(),
            root,
            old_text: old_text.into(),
            new_text: new_text.into(),
            target,
            applied: false,
            suggestion: false,
            marks: Vec::new(),
        }
    }

    pub fn from_data(ids: &mut ReplacementIds, root: NodeId, data: ReplacementData) -> Self {
        Self::new(ids, root, data.old_text, data.new_text, data.target)
    }

    pub fn data(&self) -> ReplacementData {
        ReplacementData {
            old_text: self.old_text.clone(),
            new_text: self.new_text.clone(),
            target: self.target.clone(),
        }
    }

    /// Replace the targeted span with `new_text`. No-op when already
    /// applied. On success the target describes the new span, so a
    /// following [`Replacement::unapply`] restores the original text.
    pub fn apply(
        &mut self,
        doc: &mut Document,
        converter: &TargetConverter,
    ) -> Result<ReplaceResult, ReplaceError> {
        if self.applied {
            return Ok(ReplaceResult::AlreadyDone);
        }
        let replacement = self.new_text.clone();
        let outcome = self.swap_span(doc, converter, &replacement)?;
        if outcome == ReplaceResult::Applied {
            self.applied = true;
        }
        Ok(outcome)
    }

    /// Restore the original text at the targeted span. No-op when not
    /// applied.
    pub fn unapply(
        &mut self,
        doc: &mut Document,
        converter: &TargetConverter,
    ) -> Result<ReplaceResult, ReplaceError> {
        if !self.applied {
            return Ok(ReplaceResult::AlreadyDone);
        }
        let replacement = self.old_text.clone();
        let outcome = self.swap_span(doc, converter, &replacement)?;
        if outcome == ReplaceResult::Applied {
            self.applied = false;
        }
        Ok(outcome)
    }

    /// Rewrite the targeted span to `replacement` and refresh the target.
    ///
    /// The new text node is inserted before the old span's first node and
    /// the old nodes removed after, keeping the replacement at the start of
    /// the original span rather than drifting past trailing structure.
    fn swap_span(
        &mut self,
        doc: &mut Document,
        converter: &TargetConverter,
        replacement: &str,
    ) -> Result<ReplaceResult, ReplaceError> {
        self.unmark(doc)?;
        let root = self.root;
        let matcher = converter.foreign_matcher().clone();
        // The whole resolve-collect-rewrite sequence runs with foreign
        // elements detached, so their text cannot leak into the removed span
        without_foreign_elements(doc, root, &matcher, |doc| -> Result<ReplaceResult, ReplaceError> {
            let Some(range) = converter.target_to_range(doc, &self.target, root) else {
                return Ok(ReplaceResult::Unresolved);
            };
            let nodes = collect_text_nodes(doc, &range)?;
            let Some(&first) = nodes.first() else {
                return Ok(ReplaceResult::Unresolved);
            };
            let inserted = doc.create_text(replacement);
            doc.insert_before(inserted, first)?;
            for node in nodes {
                doc.detach(node)?;
            }
            let new_range = DomRange::over_text_node(doc, inserted)?;
            if let Some(target) = converter.range_to_target(doc, &new_range, Some(root)) {
                self.target = target;
            }
            Ok(ReplaceResult::Applied)
        })
    }

    /// Wrap the targeted span in `mark` elements carrying the applied state.
    /// Any previous marks are removed first, so re-marking is idempotent.
    /// Returns `false` when the target does not resolve.
    pub fn mark(
        &mut self,
        doc: &mut Document,
        converter: &TargetConverter,
    ) -> Result<bool, ReplaceError> {
        self.unmark(doc)?;
        let root = self.root;
        let applied = self.applied;
        let matcher = converter.foreign_matcher().clone();
        let wrappers = without_foreign_elements(doc, root, &matcher, |doc| -> Result<Option<Vec<NodeId>>, ReplaceError> {
            let Some(range) = converter.target_to_range(doc, &self.target, root) else {
                return Ok(None);
            };
            let wrappers = mark_range_with(
                doc,
                &range,
                |doc| {
                    let mark = doc.create_element("mark");
                    let _ =
                        doc.set_attr(mark, "data-applied", if applied { "true" } else { "false" });
                    mark
                },
                |_, _, _| true,
            )?;
            Ok(Some(wrappers))
        })?;
        let Some(wrappers) = wrappers else {
            return Ok(false);
        };
        self.marks = wrappers;
        Ok(true)
    }

    /// Remove this replacement's marks and merge the text back together.
    pub fn unmark(&mut self, doc: &mut Document) -> Result<(), ReplaceError> {
        if self.marks.is_empty() {
            return Ok(());
        }
        for wrapper in std::mem::take(&mut self.marks) {
            unwrap_element(doc, wrapper)?;
        }
        doc.normalize(self.root);
        Ok(())
    }
}

/// Replacements sharing one `(old_text, new_text)` pair, plus the
/// suggestions discovered for them.
#[derive(Debug, Default)]
pub struct ReplacementGroup {
    pub old_text: String,
    pub new_text: String,
    pub replacements: Vec<Replacement>,
    pub suggestions: Vec<Replacement>,
}

impl ReplacementGroup {
    pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        ReplacementGroup {
            old_text: old_text.into(),
            new_text: new_text.into(),
            replacements: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn push(&mut self, replacement: Replacement) {
        self.replacements.push(replacement);
    }

    /// Re-discover occurrences of `old_text` elsewhere under `scope`.
    ///
    /// Previous suggestions are unmarked and dropped first. The search is a
    /// whole-word match over the foreign-free text; per-text-node hits are
    /// merged while a run is shorter than the needle, and hits inside
    /// existing `mark` elements (already annotated) are skipped. Each
    /// surviving occurrence becomes a suggested replacement carrying the
    /// group's `new_text`, flagged as applied.
    pub fn populate_suggestions(
        &mut self,
        doc: &mut Document,
        converter: &TargetConverter,
        ids: &mut ReplacementIds,
        scope: NodeId,
    ) -> Result<(), ReplaceError> {
        for suggestion in &mut self.suggestions {
            suggestion.unmark(doc)?;
        }
        self.suggestions.clear();

        if self.old_text.is_empty() {
            return Ok(());
        }
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&self.old_text)))?;
        let matcher = converter.foreign_matcher().clone();
        let needle_len = self.old_text.len();
        let new_text = self.new_text.clone();
        let old_text = self.old_text.clone();

        let suggestions = without_foreign_elements(doc, scope, &matcher, |doc| {
            let flat = FlatText::build(doc, scope);
            let mut spans = Vec::new();
            for found in pattern.find_iter(&flat.text) {
                let pieces = flat.split_into_segments(doc, found.start(), found.end());
                merge_short_runs(&pieces, needle_len, &mut spans);
            }

            let mut out = Vec::new();
            for (start, end) in spans {
                let Some(range) = flat.range_at(doc, start, end) else {
                    continue;
                };
                if inside_mark(doc, range.start.node) {
                    continue;
                }
                let Some(target) = converter.range_to_target(doc, &range, Some(scope)) else {
                    continue;
                };
                let mut replacement =
                    Replacement::new(ids, scope, old_text.clone(), new_text.clone(), target);
                replacement.applied = true;
                replacement.suggestion = true;
                out.push(replacement);
            }
            out
        });

        self.suggestions = suggestions;
        Ok(())
    }
}

/// Merge consecutive per-node hit pieces until each emitted span is at
/// least `needle_len` long; a shorter trailing run extends the previous
/// span. Kept from the front-end's behavior with its per-node text-search
/// library; it can over-merge when the needle recurs tightly packed.
fn merge_short_runs(pieces: &[(usize, usize)], needle_len: usize, out: &mut Vec<(usize, usize)>) {
    let mut run: Option<(usize, usize)> = None;
    for &(start, end) in pieces {
        let (run_start, _) = run.unwrap_or((start, end));
        let merged = (run_start, end);
        if merged.1 - merged.0 >= needle_len {
            out.push(merged);
            run = None;
        } else {
            run = Some(merged);
        }
    }
    if let Some(leftover) = run {
        match out.last_mut() {
            Some(last) if last.1 == leftover.0 => last.1 = leftover.1,
            _ => out.push(leftover),
        }
    }
}

fn inside_mark(doc: &Document, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if doc.tag(id) == Some("mark") {
            return true;
        }
        current = doc.parent(id);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Document, NodeId, NodeId, TargetConverter, ReplacementIds) {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.push_element(root, "p").unwrap();
        doc.set_attr(p, "id", "sec_1").unwrap();
        doc.push_text(p, "The quick brown fox").unwrap();
        (doc, root, p, TargetConverter::new(), ReplacementIds::new())
    }

    fn target_for(
        doc: &mut Document,
        converter: &TargetConverter,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> Target {
        let text_node = doc.text_nodes_under(node)[0];
        let range = DomRange::new(doc, text_node, start, text_node, end).unwrap();
        converter.range_to_target(doc, &range, None).unwrap()
    }

    #[test]
    fn apply_rewrites_and_unapply_restores() {
        let (mut doc, root, p, converter, mut ids) = fixture();
        let target = target_for(&mut doc, &converter, p, 4, 9); // "quick"
        let mut replacement = Replacement::new(&mut ids, root, "quick", "slow", target);

        let result = replacement.apply(&mut doc, &converter).unwrap();
        assert_eq!(result, ReplaceResult::Applied);
        assert!(replacement.applied);
        assert_eq!(doc.text_content(p), "The slow brown fox");

        let result = replacement.unapply(&mut doc, &converter).unwrap();
        assert_eq!(result, ReplaceResult::Applied);
        assert_eq!(doc.text_content(p), "The quick brown fox");

        doc.normalize(p);
        assert_eq!(doc.children(p).len(), 1);
    }

    #[test]
    fn apply_is_idempotent() {
        let (mut doc, root, p, converter, mut ids) = fixture();
        let target = target_for(&mut doc, &converter, p, 4, 9);
        let mut replacement = Replacement::new(&mut ids, root, "quick", "slow", target);

        let _ = replacement.apply(&mut doc, &converter).unwrap();
        let after_first = doc.text_content(p);
        let result = replacement.apply(&mut doc, &converter).unwrap();
        assert_eq!(result, ReplaceResult::AlreadyDone);
        assert_eq!(doc.text_content(p), after_first);
    }

    #[test]
    fn apply_refreshes_target_to_new_span() {
        let (mut doc, root, p, converter, mut ids) = fixture();
        let target = target_for(&mut doc, &converter, p, 4, 9);
        let mut replacement = Replacement::new(&mut ids, root, "quick", "slow", target);

        let _ = replacement.apply(&mut doc, &converter).unwrap();
        let range = converter
            .target_to_range(&mut doc, &replacement.target, root)
            .unwrap();
        let nodes = collect_text_nodes(&mut doc, &range).unwrap();
        let text: String = nodes
            .iter()
            .map(|&n| doc.text(n).unwrap_or_default())
            .collect();
        assert_eq!(text, "slow");
    }

    #[test]
    fn unresolved_target_is_reported() {
        let (mut doc, root, _, converter, mut ids) = fixture();
        let target = Target {
            anchor_id: "vanished".to_string(),
            selectors: Vec::new(),
        };
        let mut replacement = Replacement::new(&mut ids, root, "a", "b", target);
        let result = replacement.apply(&mut doc, &converter).unwrap();
        assert_eq!(result, ReplaceResult::Unresolved);
        assert!(!replacement.applied);
    }

    #[test]
    fn mark_tags_applied_state_and_is_idempotent() {
        let (mut doc, root, p, converter, mut ids) = fixture();
        let target = target_for(&mut doc, &converter, p, 4, 9);
        let mut replacement = Replacement::new(&mut ids, root, "quick", "slow", target);

        assert!(replacement.mark(&mut doc, &converter).unwrap());
        assert_eq!(replacement.marks.len(), 1);
        assert_eq!(doc.attr(replacement.marks[0], "data-applied"), Some("false"));

        // Re-marking replaces rather than nests
        assert!(replacement.mark(&mut doc, &converter).unwrap());
        assert_eq!(replacement.marks.len(), 1);

        replacement.unmark(&mut doc).unwrap();
        doc.normalize(p);
        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(p), "The quick brown fox");
    }

    #[test]
    fn suggestions_find_whole_word_occurrences() {
        let mut doc = Document::new();
        let root = doc.root();
        let p1 = doc.push_element(root, "p").unwrap();
        doc.set_attr(p1, "id", "sec_1").unwrap();
        doc.push_text(p1, "the fox jumped").unwrap();
        let p2 = doc.push_element(root, "p").unwrap();
        doc.set_attr(p2, "id", "sec_2").unwrap();
        doc.push_text(p2, "a fox, a foxtrot, another fox").unwrap();

        let converter = TargetConverter::new();
        let mut ids = ReplacementIds::new();
        let mut group = ReplacementGroup::new("fox", "wolf");
        group
            .populate_suggestions(&mut doc, &converter, &mut ids, root)
            .unwrap();

        // "foxtrot" is not a whole-word match
        assert_eq!(group.suggestions.len(), 3);
        for suggestion in &group.suggestions {
            assert!(suggestion.applied);
            assert!(suggestion.suggestion);
            assert_eq!(suggestion.new_text, "wolf");
        }
        assert_eq!(group.suggestions[1].target.anchor_id, "sec_2");
    }

    #[test]
    fn suggestions_skip_marked_occurrences() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.push_element(root, "p").unwrap();
        doc.set_attr(p, "id", "sec_1").unwrap();
        doc.push_text(p, "fox here and fox there").unwrap();

        let converter = TargetConverter::new();
        let mut ids = ReplacementIds::new();

        // Annotate the first occurrence
        let text_node = doc.text_nodes_under(p)[0];
        let range = DomRange::new(&doc, text_node, 0, text_node, 3).unwrap();
        let target = converter.range_to_target(&mut doc, &range, None).unwrap();
        let mut existing = Replacement::new(&mut ids, root, "fox", "wolf", target);
        assert!(existing.mark(&mut doc, &converter).unwrap());

        let mut group = ReplacementGroup::new("fox", "wolf");
        group
            .populate_suggestions(&mut doc, &converter, &mut ids, root)
            .unwrap();
        assert_eq!(group.suggestions.len(), 1);
    }

    #[test]
    fn suggestions_merge_matches_split_across_nodes() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.push_element(root, "p").unwrap();
        doc.set_attr(p, "id", "sec_1").unwrap();
        doc.push_text(p, "the br").unwrap();
        doc.push_text(p, "own fox").unwrap();

        let converter = TargetConverter::new();
        let mut ids = ReplacementIds::new();
        let mut group = ReplacementGroup::new("brown", "red");
        group
            .populate_suggestions(&mut doc, &converter, &mut ids, root)
            .unwrap();

        assert_eq!(group.suggestions.len(), 1);
        let exact = group.suggestions[0].target.selectors.iter().find_map(|s| {
            match s {
                crate::selectors::Selector::TextQuote { exact, .. } => Some(exact.clone()),
                _ => None,
            }
        });
        assert_eq!(exact.as_deref(), Some("brown"));
    }

    #[test]
    fn repopulating_clears_previous_suggestions() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.push_element(root, "p").unwrap();
        doc.set_attr(p, "id", "sec_1").unwrap();
        doc.push_text(p, "one fox").unwrap();

        let converter = TargetConverter::new();
        let mut ids = ReplacementIds::new();
        let mut group = ReplacementGroup::new("fox", "wolf");
        group
            .populate_suggestions(&mut doc, &converter, &mut ids, root)
            .unwrap();
        assert_eq!(group.suggestions.len(), 1);
        for s in &mut group.suggestions {
            let _ = s.mark(&mut doc, &converter).unwrap();
        }

        group
            .populate_suggestions(&mut doc, &converter, &mut ids, root)
            .unwrap();
        assert_eq!(group.suggestions.len(), 1);
        // Old marks were removed, not left to shadow the re-discovered span
        assert_eq!(doc.text_content(p), "one fox");
        assert!(doc.find_by_id(root, "sec_1").is_some());
    }

    #[test]
    fn replacement_data_round_trips() {
        let (mut doc, root, p, converter, mut ids) = fixture();
        let target = target_for(&mut doc, &converter, p, 4, 9);
        let replacement = Replacement::new(&mut ids, root, "quick", "slow", target);

        let json = serde_json::to_value(replacement.data()).unwrap();
        assert_eq!(json["old_text"], "quick");
        assert_eq!(json["new_text"], "slow");
        assert_eq!(json["target"]["anchor_id"], "sec_1");

        let data: ReplacementData = serde_json::from_value(json).unwrap();
        let restored = Replacement::from_data(&mut ids, root, data);
        assert!(!restored.applied);
        assert_eq!(restored.target, replacement.target);
    }
}
