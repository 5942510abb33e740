//! Selector matching against the document tree.
//!
//! Matching walks the selector right to left from the candidate element,
//! climbing physical parents for descendant/child combinators and scanning
//! preceding element siblings for the sibling combinators.

use css::selector::{Combinator, ComplexSelector, CompoundSelector, SimpleSelector};
use dom::{Document, NodeId, NodeKind};

/// Attribute configuration selector matching depends on: where class names
/// live.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MatchContext<'a> {
    pub class_ns: Option<&'a str>,
    pub class_local: &'a str,
}

pub(crate) fn selector_matches(
    doc: &Document,
    element: NodeId,
    pseudo: Option<&str>,
    sel: &ComplexSelector,
    mcx: &MatchContext<'_>,
) -> bool {
    match (&sel.pseudo_element, pseudo) {
        (None, None) => {}
        (Some(pe), Some(q)) if pe.eq_ignore_ascii_case(q) => {}
        _ => return false,
    }
    if sel.sequence.is_empty() {
        return false;
    }

    let mut current = element;
    let mut idx = sel.sequence.len() - 1;
    let (last, _) = &sel.sequence[idx];
    if !compound_matches(doc, current, last, mcx) {
        return false;
    }
    while idx > 0 {
        let (compound, combinator) = &sel.sequence[idx - 1];
        match combinator.unwrap_or(Combinator::Descendant) {
            Combinator::Descendant => {
                let mut ancestor = doc.parent(current);
                let mut found = false;
                while let Some(a) = ancestor {
                    if doc.is_element(a) && compound_matches(doc, a, compound, mcx) {
                        current = a;
                        found = true;
                        break;
                    }
                    ancestor = doc.parent(a);
                }
                if !found {
                    return false;
                }
            }
            Combinator::Child => {
                match doc.parent(current) {
                    Some(p) if doc.is_element(p) && compound_matches(doc, p, compound, mcx) => {
                        current = p;
                    }
                    _ => return false,
                }
            }
            Combinator::NextSibling => {
                match previous_element_sibling(doc, current) {
                    Some(prev) if compound_matches(doc, prev, compound, mcx) => {
                        current = prev;
                    }
                    _ => return false,
                }
            }
            Combinator::SubsequentSibling => {
                let mut prev = previous_element_sibling(doc, current);
                let mut found = false;
                while let Some(p) = prev {
                    if compound_matches(doc, p, compound, mcx) {
                        current = p;
                        found = true;
                        break;
                    }
                    prev = previous_element_sibling(doc, p);
                }
                if !found {
                    return false;
                }
            }
        }
        idx -= 1;
    }
    true
}

fn previous_element_sibling(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut prev = doc.prev_sibling(node);
    while let Some(p) = prev {
        if doc.is_element(p) {
            return Some(p);
        }
        prev = doc.prev_sibling(p);
    }
    None
}

fn next_element_sibling(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut next = doc.next_sibling(node);
    while let Some(n) = next {
        if doc.is_element(n) {
            return Some(n);
        }
        next = doc.next_sibling(n);
    }
    None
}

fn compound_matches(
    doc: &Document,
    node: NodeId,
    compound: &CompoundSelector,
    mcx: &MatchContext<'_>,
) -> bool {
    let Some(data) = doc.element(node) else {
        return false;
    };
    for simple in &compound.simples {
        let ok = match simple {
            SimpleSelector::Universal => true,
            SimpleSelector::Type(name) => data.name.eq_ignore_ascii_case(name),
            SimpleSelector::Id(id) => doc.attribute(node, None, "id") == Some(id.as_str()),
            SimpleSelector::Class(class) => doc
                .attribute(node, mcx.class_ns, mcx.class_local)
                .map_or(false, |v| v.split_whitespace().any(|c| c == class)),
            SimpleSelector::Attribute { name, value } => {
                match (doc.attribute(node, None, name), value) {
                    (Some(_), None) => true,
                    (Some(actual), Some(expected)) => actual == expected,
                    (None, _) => false,
                }
            }
            SimpleSelector::FirstChild => previous_element_sibling(doc, node).is_none(),
            SimpleSelector::LastChild => next_element_sibling(doc, node).is_none(),
            SimpleSelector::Root => matches!(
                doc.parent(node).and_then(|p| doc.kind(p)),
                Some(NodeKind::Document)
            ),
        };
        if !ok {
            return false;
        }
    }
    true
}
