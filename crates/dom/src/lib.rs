//! Arena-backed document tree the style engine operates on.
//!
//! The tree is deliberately small: it only carries what cascading needs —
//! namespaced attributes, the stylable flag, stylesheet-carrier metadata and
//! import-host links. Everything else (parsing, layout, scripting) lives
//! elsewhere.

mod mutation;
mod printing;

pub use mutation::{AttrChange, MutationEvent};

use indextree::Arena;
pub use indextree::NodeId;
use smallvec::SmallVec;

/// A namespaced attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub ns: Option<String>,
    pub local: String,
    pub value: String,
}

/// Metadata marking an element as a stylesheet carrier. The CSS text itself
/// is the concatenation of the element's text children.
#[derive(Debug, Clone, Default)]
pub struct StyleSheetInfo {
    pub title: Option<String>,
    pub alternate: bool,
    pub media: String,
}

/// Payload of an element node.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: String,
    pub attrs: SmallVec<[Attr; 4]>,
    /// Whether the element participates in cascading at all.
    pub stylable: bool,
    /// Present iff the element carries an embedded stylesheet.
    pub style_sheet: Option<StyleSheetInfo>,
    /// Root of an imported subtree hosted by this element, if any.
    pub imported: Option<NodeId>,
}

impl ElementData {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: SmallVec::new(),
            stylable: true,
            style_sheet: None,
            imported: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text { text: String },
    /// Parentless container for an imported subtree; `host` points back at
    /// the import-host element.
    ImportedRoot { host: NodeId },
}

pub struct Document {
    arena: Arena<NodeKind>,
    root: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeKind::Document);
        Self { arena, root }
    }

    /// The document node itself (not an element).
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The outermost element of the document, if one has been created.
    pub fn document_element(&self) -> Option<NodeId> {
        self.root
            .children(&self.arena)
            .find(|n| self.is_element(*n))
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.arena.get(node).map(indextree::Node::get)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.kind(node) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match self.arena.get_mut(node).map(indextree::Node::get_mut) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    #[inline]
    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Element(_)))
    }

    /// Whether the node is an element that participates in cascading.
    #[inline]
    pub fn is_stylable(&self, node: NodeId) -> bool {
        self.element(node).map_or(false, |e| e.stylable)
    }

    /// Whether the node carries an embedded stylesheet.
    #[inline]
    pub fn is_style_sheet_carrier(&self, node: NodeId) -> bool {
        self.element(node).map_or(false, |e| e.style_sheet.is_some())
    }

    /// Whether the node hosts an imported subtree.
    #[inline]
    pub fn is_import_host(&self, node: NodeId) -> bool {
        self.element(node).map_or(false, |e| e.imported.is_some())
    }

    /// The imported-subtree root hosted by `node`, if any.
    pub fn imported_root(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).and_then(|e| e.imported)
    }

    /// The host element of an imported-subtree root.
    pub fn import_host(&self, node: NodeId) -> Option<NodeId> {
        match self.kind(node) {
            Some(NodeKind::ImportedRoot { host }) => Some(*host),
            _ => None,
        }
    }

    #[inline]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node).and_then(indextree::Node::parent)
    }

    #[inline]
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node).and_then(indextree::Node::next_sibling)
    }

    #[inline]
    pub fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.arena
            .get(node)
            .and_then(indextree::Node::previous_sibling)
    }

    #[inline]
    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node).and_then(indextree::Node::first_child)
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.children(&self.arena)
    }

    // Tree building ------------------------------------------------------

    pub fn append_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        let node = self.arena.new_node(NodeKind::Element(ElementData::new(name)));
        parent.append(node, &mut self.arena);
        node
    }

    /// Insert a new element among `parent`'s children at `pos` (clamped).
    pub fn insert_element(&mut self, parent: NodeId, name: &str, pos: usize) -> NodeId {
        let node = self.arena.new_node(NodeKind::Element(ElementData::new(name)));
        self.insert_at(parent, node, pos);
        node
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.arena.new_node(NodeKind::Text {
            text: text.to_string(),
        });
        parent.append(node, &mut self.arena);
        node
    }

    fn insert_at(&mut self, parent: NodeId, node: NodeId, pos: usize) {
        let count = parent.children(&self.arena).count();
        if pos >= count {
            parent.append(node, &mut self.arena);
        } else if let Some(sibling) = parent.children(&self.arena).nth(pos) {
            sibling.insert_before(node, &mut self.arena);
        } else {
            parent.append(node, &mut self.arena);
        }
    }

    /// Create a detached imported-subtree root hosted by `host`. Children
    /// appended under the returned node form the imported tree; the host's
    /// `imported` link is set.
    pub fn new_imported_root(&mut self, host: NodeId) -> NodeId {
        let root = self.arena.new_node(NodeKind::ImportedRoot { host });
        if let Some(data) = self.element_mut(host) {
            data.imported = Some(root);
        }
        root
    }

    /// Detach a node (and its subtree) from its parent. The arena keeps the
    /// nodes alive so ids stay valid.
    pub fn detach(&mut self, node: NodeId) {
        node.detach(&mut self.arena);
    }

    // Attributes ---------------------------------------------------------

    pub fn attribute(&self, node: NodeId, ns: Option<&str>, local: &str) -> Option<&str> {
        self.element(node).and_then(|e| {
            e.attrs
                .iter()
                .find(|a| a.local == local && a.ns.as_deref() == ns)
                .map(|a| a.value.as_str())
        })
    }

    pub fn attributes(&self, node: NodeId) -> &[Attr] {
        self.element(node).map_or(&[], |e| e.attrs.as_slice())
    }

    /// The concatenated text of the node's text children; used as the CSS
    /// source of stylesheet carriers.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in node.children(&self.arena) {
            if let Some(NodeKind::Text { text }) = self.kind(child) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace the text of a text node, returning the mutation event to
    /// dispatch.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> MutationEvent {
        if let Some(NodeKind::Text { text: t }) = self.arena.get_mut(node).map(indextree::Node::get_mut) {
            *t = text.to_string();
        }
        MutationEvent::CharacterDataModified { target: node }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_namespaced() {
        let mut doc = Document::new();
        let svg = doc.append_element(doc.root(), "svg");
        doc.set_attribute(svg, None, "width", "10");
        doc.set_attribute(svg, Some("http://example.org/x"), "width", "20");

        assert_eq!(doc.attribute(svg, None, "width"), Some("10"));
        assert_eq!(
            doc.attribute(svg, Some("http://example.org/x"), "width"),
            Some("20")
        );
        assert_eq!(doc.attribute(svg, Some("http://other"), "width"), None);
    }

    #[test]
    fn imported_root_links_back_to_host() {
        let mut doc = Document::new();
        let svg = doc.append_element(doc.root(), "svg");
        let use_el = doc.append_element(svg, "use");
        let root = doc.new_imported_root(use_el);
        let rect = doc.append_element(root, "rect");

        assert!(doc.is_import_host(use_el));
        assert_eq!(doc.imported_root(use_el), Some(root));
        assert_eq!(doc.import_host(root), Some(use_el));
        assert_eq!(doc.parent(rect), Some(root));
        // The imported root has no parent of its own.
        assert_eq!(doc.parent(root), None);
    }

    #[test]
    fn text_content_concatenates_text_children() {
        let mut doc = Document::new();
        let style = doc.append_element(doc.root(), "style");
        doc.append_text(style, "a { color: red }");
        doc.append_text(style, " b { color: blue }");
        assert_eq!(doc.text_content(style), "a { color: red } b { color: blue }");
    }
}
