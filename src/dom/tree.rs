use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::dom::DomError;

/// Handle to a node in a [`Document`] arena.
///
/// Ids are only meaningful for the document that issued them and stay valid
/// for the lifetime of that document, whether or not the node is currently
/// attached to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Element { tag: String, attrs: BTreeMap<String, String> },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Arena-backed document tree.
///
/// Nodes are created once and never deallocated; [`Document::detach`] only
/// unlinks a node from its parent, so a detached subtree can be reinserted
/// at a different position. All structural mutation goes through `append`,
/// `insert_before`, `detach`, and `split_text`.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create a document with an empty `body` root element.
    pub fn new() -> Self {
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.create_element("body");
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_string()))
    }

    /// Create an element and append it to `parent`.
    pub fn push_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        let id = self.create_element(tag);
        self.append(parent, id)?;
        Ok(id)
    }

    /// Create a text node and append it to `parent`.
    pub fn push_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        let id = self.create_text(text);
        self.append(parent, id)?;
        Ok(id)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element { .. })
    }

    /// Tag name, or `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    /// Text content of a text node, or `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        match &mut self.node_mut(id).data {
            NodeData::Text(current) => {
                *current = text.to_string();
                Ok(())
            }
            NodeData::Element { .. } => Err(DomError::NotText),
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        match &mut self.node_mut(id).data {
            NodeData::Element { attrs, .. } => {
                attrs.insert(name.to_string(), value.to_string());
                Ok(())
            }
            NodeData::Text(_) => Err(DomError::NotElement),
        }
    }

    /// The `id` attribute of an element, if set and non-empty.
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id").filter(|v| !v.is_empty())
    }

    /// Whether an element's `class` attribute contains `class` as a
    /// whitespace-separated word.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|v| v.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let siblings = &self.node(parent).children;
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// current parent first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.is_element(parent) {
            return Err(DomError::NotElement);
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::CyclicInsertion);
        }
        self.detach(child)?;
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Insert `new` immediately before `reference` under the reference's
    /// parent, detaching `new` from any current parent first.
    pub fn insert_before(&mut self, new: NodeId, reference: NodeId) -> Result<(), DomError> {
        let parent = self.node(reference).parent.ok_or(DomError::Detached)?;
        if self.is_inclusive_ancestor(new, parent) {
            return Err(DomError::CyclicInsertion);
        }
        self.detach(new)?;
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::Detached)?;
        self.node_mut(parent).children.insert(pos, new);
        self.node_mut(new).parent = Some(parent);
        Ok(())
    }

    /// Unlink a node from its parent. A no-op for already-detached nodes;
    /// the node and its subtree stay alive in the arena.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let Some(parent) = self.node(id).parent else {
            return Ok(());
        };
        self.node_mut(parent).children.retain(|&c| c != id);
        self.node_mut(id).parent = None;
        Ok(())
    }

    /// Split a text node at a byte offset, keeping `[..offset)` in place and
    /// returning a new following sibling holding `[offset..)`.
    ///
    /// Splitting only subdivides: the two halves together carry exactly the
    /// original content. Either half may be empty when the offset sits at a
    /// node edge.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let text = self.text(id).ok_or(DomError::NotText)?;
        if offset > text.len() {
            return Err(DomError::OffsetOutOfBounds {
                offset,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(offset) {
            return Err(DomError::NotCharBoundary(offset));
        }
        let tail = text[offset..].to_string();
        let head = text[..offset].to_string();
        self.set_text(id, &head)?;
        let new = self.create_text(&tail);
        match self.next_sibling(id) {
            Some(sib) => self.insert_before(new, sib)?,
            None => {
                let parent = self.node(id).parent.ok_or(DomError::Detached)?;
                self.append(parent, new)?;
            }
        }
        Ok(new)
    }

    /// Merge adjacent text children and drop empty text nodes, recursively,
    /// under `subtree`.
    pub fn normalize(&mut self, subtree: NodeId) {
        if !self.is_element(subtree) {
            return;
        }
        let children: Vec<NodeId> = self.children(subtree).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            if let Some(text) = self.text(child).map(str::to_string) {
                if text.is_empty() {
                    let _ = self.detach(child);
                    continue;
                }
                if let Some(prev) = previous_text {
                    let mut merged = self.text(prev).unwrap_or_default().to_string();
                    merged.push_str(&text);
                    let _ = self.set_text(prev, &merged);
                    let _ = self.detach(child);
                } else {
                    previous_text = Some(child);
                }
            } else {
                previous_text = None;
                self.normalize(child);
            }
        }
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// All text nodes under `root` (inclusive), in document order.
    pub fn text_nodes_under(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.is_text(id) {
                out.push(id);
            } else {
                for &child in self.children(id).iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// First element under `scope` (inclusive) whose `id` attribute equals
    /// `value`, in document order.
    pub fn find_by_id(&self, scope: NodeId, value: &str) -> Option<NodeId> {
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            if self.element_id(id) == Some(value) {
                return Some(id);
            }
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
        }
        None
    }

    /// Closest inclusive ancestor carrying a non-empty `id` attribute.
    pub fn closest_with_id(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.element_id(id).is_some() {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Path of child indices from the node's highest ancestor down to the
    /// node. Attached nodes share the root, so paths give a total document
    /// order under lexicographic comparison (a prefix sorts before its
    /// extensions, i.e. an ancestor before its descendants).
    pub(crate) fn node_path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let pos = self
                .node(parent)
                .children
                .iter()
                .position(|&c| c == current)
                .unwrap_or(0);
            path.push(pos);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Relative document order of two attached nodes.
    pub fn compare_positions(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.node_path(a).cmp(&self.node_path(b))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
