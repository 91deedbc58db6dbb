//! End-to-end find/replace workflow: create, apply, mark, suggest, revert.

use dom_anchor::{
    Document, DomRange, NodeId, ReplaceResult, Replacement, ReplacementData, ReplacementGroup,
    ReplacementIds, TargetConverter,
};

struct Session {
    doc: Document,
    converter: TargetConverter,
    ids: ReplacementIds,
}

impl Session {
    fn new() -> Self {
        Session {
            doc: Document::new(),
            converter: TargetConverter::new(),
            ids: ReplacementIds::new(),
        }
    }

    fn paragraph(&mut self, id: &str, text: &str) -> NodeId {
        let root = self.doc.root();
        let p = self.doc.push_element(root, "p").unwrap();
        self.doc.set_attr(p, "id", id).unwrap();
        self.doc.push_text(p, text).unwrap();
        p
    }

    fn replacement_over(
        &mut self,
        paragraph: NodeId,
        start: usize,
        end: usize,
        new_text: &str,
    ) -> Replacement {
        let text_node = self.doc.text_nodes_under(paragraph)[0];
        let range = DomRange::new(&self.doc, text_node, start, text_node, end).unwrap();
        let target = self
            .converter
            .range_to_target(&mut self.doc, &range, None)
            .unwrap();
        let old_text = self
            .doc
            .text(text_node)
            .unwrap()
            .get(start..end)
            .unwrap()
            .to_string();
        let root = self.doc.root();
        Replacement::new(&mut self.ids, root, old_text, new_text, target)
    }
}

#[test]
fn apply_unapply_restores_original_document() {
    let mut session = Session::new();
    let p = session.paragraph("sec_1", "the defendant John Smith appeared");
    let mut replacement = session.replacement_over(p, 14, 24, "XXXX");
    assert_eq!(replacement.old_text, "John Smith");

    let result = replacement
        .apply(&mut session.doc, &session.converter)
        .unwrap();
    assert_eq!(result, ReplaceResult::Applied);
    assert_eq!(
        session.doc.text_content(p),
        "the defendant XXXX appeared"
    );

    // Applying again changes nothing
    let result = replacement
        .apply(&mut session.doc, &session.converter)
        .unwrap();
    assert_eq!(result, ReplaceResult::AlreadyDone);
    assert_eq!(
        session.doc.text_content(p),
        "the defendant XXXX appeared"
    );

    let result = replacement
        .unapply(&mut session.doc, &session.converter)
        .unwrap();
    assert_eq!(result, ReplaceResult::Applied);
    assert_eq!(
        session.doc.text_content(p),
        "the defendant John Smith appeared"
    );

    // Original adjacency comes back once merged
    session.doc.normalize(p);
    assert_eq!(session.doc.children(p).len(), 1);
}

#[test]
fn repeated_apply_unapply_cycles_are_stable() {
    let mut session = Session::new();
    let p = session.paragraph("sec_1", "pay the sum of ten pounds");
    let mut replacement = session.replacement_over(p, 15, 18, "fifty");

    for _ in 0..3 {
        let _ = replacement
            .apply(&mut session.doc, &session.converter)
            .unwrap();
        assert_eq!(session.doc.text_content(p), "pay the sum of fifty pounds");
        let _ = replacement
            .unapply(&mut session.doc, &session.converter)
            .unwrap();
        assert_eq!(session.doc.text_content(p), "pay the sum of ten pounds");
    }
}

#[test]
fn marks_track_applied_state_through_the_lifecycle() {
    let mut session = Session::new();
    let p = session.paragraph("sec_1", "strike the word hereby");
    let mut replacement = session.replacement_over(p, 16, 22, "forthwith");

    assert!(replacement
        .mark(&mut session.doc, &session.converter)
        .unwrap());
    let marked: Vec<NodeId> = session
        .doc
        .text_nodes_under(p)
        .into_iter()
        .filter(|&n| {
            session
                .doc
                .parent(n)
                .and_then(|parent| session.doc.tag(parent))
                == Some("mark")
        })
        .collect();
    assert_eq!(marked.len(), 1);
    assert_eq!(session.doc.text(marked[0]), Some("hereby"));

    let _ = replacement
        .apply(&mut session.doc, &session.converter)
        .unwrap();
    assert!(replacement
        .mark(&mut session.doc, &session.converter)
        .unwrap());
    assert_eq!(session.doc.text_content(p), "strike the word forthwith");

    // Unmounting the UI removes all decoration and leaves clean text
    replacement.unmark(&mut session.doc).unwrap();
    session.doc.normalize(p);
    assert_eq!(session.doc.text_content(p), "strike the word forthwith");
    assert_eq!(session.doc.children(p).len(), 1);
}

#[test]
fn group_discovers_and_applies_suggestions() {
    let mut session = Session::new();
    let p1 = session.paragraph("sec_1", "the accused fled the scene");
    session.paragraph("sec_2", "witnesses saw the accused running");
    session.paragraph("sec_3", "an accusedly unrelated word"); // not whole-word

    let mut replacement = session.replacement_over(p1, 4, 11, "[REDACTED]");
    let _ = replacement
        .apply(&mut session.doc, &session.converter)
        .unwrap();

    let mut group = ReplacementGroup::new("accused", "[REDACTED]");
    group.push(replacement);
    let root = session.doc.root();
    group
        .populate_suggestions(
            &mut session.doc,
            &session.converter,
            &mut session.ids,
            root,
        )
        .unwrap();

    // Only the occurrence in sec_2 qualifies: sec_1 now reads [REDACTED]
    // and sec_3 is not a whole-word match
    assert_eq!(group.suggestions.len(), 1);
    assert_eq!(group.suggestions[0].target.anchor_id, "sec_2");
    assert!(group.suggestions[0].suggestion);

    // Suggested replacements arrive applied; reverting one rewrites its span
    let mut suggestion = group.suggestions.remove(0);
    assert!(suggestion.applied);
    let result = suggestion
        .unapply(&mut session.doc, &session.converter)
        .unwrap();
    assert_eq!(result, ReplaceResult::Applied);
}

#[test]
fn replacement_survives_serialization() {
    let mut session = Session::new();
    let p = session.paragraph("sec_1", "old wording stands");
    let replacement = session.replacement_over(p, 0, 11, "new wording");

    let json = serde_json::to_string(&replacement.data()).unwrap();
    let data: ReplacementData = serde_json::from_str(&json).unwrap();
    let root = session.doc.root();
    let mut restored = Replacement::from_data(&mut session.ids, root, data);

    let _ = restored.apply(&mut session.doc, &session.converter).unwrap();
    assert_eq!(session.doc.text_content(p), "new wording stands");
}

#[test]
fn marking_keeps_foreign_elements_in_place() {
    let mut session = Session::new();
    let p = session.paragraph("sec_1", "The quick ");
    let gutter = session.doc.push_element(p, "span").unwrap();
    session.doc.set_attr(gutter, "class", "tausi").unwrap();
    session.doc.push_text(gutter, "[note]").unwrap();
    let tail = session.doc.push_text(p, "brown fox").unwrap();

    let range = DomRange::new(&session.doc, tail, 0, tail, 5).unwrap();
    let target = session
        .converter
        .range_to_target(&mut session.doc, &range, None)
        .unwrap();
    let root = session.doc.root();
    let mut replacement = Replacement::new(&mut session.ids, root, "brown", "red", target);

    // Marking wraps the text node the gutter was recorded next to; the
    // gutter must come back mid-paragraph, not at the end
    assert!(replacement
        .mark(&mut session.doc, &session.converter)
        .unwrap());
    assert_eq!(session.doc.text_content(p), "The quick [note]brown fox");
    assert_eq!(session.doc.parent(gutter), Some(p));

    replacement.unmark(&mut session.doc).unwrap();
    assert_eq!(session.doc.text_content(p), "The quick [note]brown fox");
}

#[test]
fn foreign_elements_do_not_corrupt_replacement() {
    let mut session = Session::new();
    let p = session.paragraph("sec_1", "delete this phrase entirely");
    // Annotation gutter injected in the middle of the paragraph
    let text_node = session.doc.text_nodes_under(p)[0];
    let tail = session.doc.split_text(text_node, 12).unwrap();
    let gutter = session.doc.create_element("span");
    session.doc.set_attr(gutter, "class", "tausi").unwrap();
    session.doc.insert_before(gutter, tail).unwrap();
    session.doc.push_text(gutter, "[note 7]").unwrap();

    // Replace "this phrase" (offsets in the foreign-free text)
    let range = DomRange::new(&session.doc, text_node, 7, tail, 7).unwrap();
    let target = session
        .converter
        .range_to_target(&mut session.doc, &range, None)
        .unwrap();
    let root = session.doc.root();
    let mut replacement = Replacement::new(
        &mut session.ids,
        root,
        "this phrase",
        "it",
        target,
    );

    let _ = replacement
        .apply(&mut session.doc, &session.converter)
        .unwrap();
    // The gutter is still present and untouched; only semantic text changed
    assert_eq!(session.doc.parent(gutter), Some(p));
    assert_eq!(session.doc.text_content(gutter), "[note 7]");
    let full = session.doc.text_content(p);
    assert!(full.contains("delete it"));
    assert!(full.contains("entirely"));

    let _ = replacement
        .unapply(&mut session.doc, &session.converter)
        .unwrap();
    let full = session.doc.text_content(p);
    assert!(full.contains("delete this phrase"));
    assert!(full.contains("entirely"));
}
