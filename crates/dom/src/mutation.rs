//! Mutation events produced by `Document` mutators.
//!
//! Attribute and character-data mutators return the event describing the
//! change they performed; the caller hands it to whoever subscribed (the
//! style engine). Structural events (`NodeInserted`, `NodeRemoved`,
//! `SubtreeModified`) are built by the driver of the mutation, because
//! removal must be observed while the node is still attached.

use crate::{Attr, Document, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrChange {
    Addition,
    Modification,
    Removal,
}

#[derive(Debug, Clone)]
pub enum MutationEvent {
    AttrModified {
        target: NodeId,
        attr_ns: Option<String>,
        attr_local: String,
        change: AttrChange,
        prev_value: Option<String>,
        new_value: Option<String>,
    },
    NodeInserted {
        target: NodeId,
    },
    NodeRemoved {
        target: NodeId,
    },
    SubtreeModified,
    CharacterDataModified {
        target: NodeId,
    },
}

impl Document {
    /// Set or replace an attribute, returning the mutation event.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        ns: Option<&str>,
        local: &str,
        value: &str,
    ) -> MutationEvent {
        let mut prev = None;
        if let Some(data) = self.element_mut(node) {
            if let Some(attr) = data
                .attrs
                .iter_mut()
                .find(|a| a.local == local && a.ns.as_deref() == ns)
            {
                prev = Some(std::mem::replace(&mut attr.value, value.to_string()));
            } else {
                data.attrs.push(Attr {
                    ns: ns.map(str::to_string),
                    local: local.to_string(),
                    value: value.to_string(),
                });
            }
        }
        MutationEvent::AttrModified {
            target: node,
            attr_ns: ns.map(str::to_string),
            attr_local: local.to_string(),
            change: if prev.is_some() {
                AttrChange::Modification
            } else {
                AttrChange::Addition
            },
            prev_value: prev,
            new_value: Some(value.to_string()),
        }
    }

    /// Remove an attribute if present, returning the mutation event.
    pub fn remove_attribute(
        &mut self,
        node: NodeId,
        ns: Option<&str>,
        local: &str,
    ) -> Option<MutationEvent> {
        let prev = self.element_mut(node).and_then(|data| {
            let pos = data
                .attrs
                .iter()
                .position(|a| a.local == local && a.ns.as_deref() == ns)?;
            Some(data.attrs.remove(pos).value)
        })?;
        Some(MutationEvent::AttrModified {
            target: node,
            attr_ns: ns.map(str::to_string),
            attr_local: local.to_string(),
            change: AttrChange::Removal,
            prev_value: Some(prev),
            new_value: None,
        })
    }
}
