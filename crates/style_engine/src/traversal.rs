//! Logical tree traversal: walks that treat imported subtrees as live
//! children of their host element.

use dom::{Document, NodeId};

/// The parent element from the cascading point of view: physical parents,
/// except that an imported-subtree root maps to its host element.
pub fn parent_element(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = doc.parent(node).or_else(|| doc.import_host(node));
    while let Some(n) = current {
        let n = doc.import_host(n).unwrap_or(n);
        if doc.is_element(n) {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

/// The nearest stylable ancestor, through logical parents.
pub fn parent_stylable_element(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = parent_element(doc, node);
    while let Some(el) = current {
        if doc.is_stylable(el) {
            return Some(el);
        }
        current = parent_element(doc, el);
    }
    None
}

/// The children contributed by an imported subtree, if `node` hosts one.
pub fn imported_children(doc: &Document, node: NodeId) -> Vec<NodeId> {
    match doc.imported_root(node) {
        Some(root) => doc.children(root).collect(),
        None => Vec::new(),
    }
}
