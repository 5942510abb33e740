//! Mutation dispatch and targeted invalidation.
//!
//! After any document mutation, every previously built computed style map
//! either stays exactly correct or is cleared so the next query re-resolves
//! it, and a change notification names every property whose computed value
//! may have changed.

use crate::property::ParseContext;
use crate::style_map::{Origin, StyleMap};
use crate::{traversal, CssEngine};
use css::{CssError, DocumentHandler, LexicalUnit};
use dom::{AttrChange, Document, MutationEvent, NodeId};

impl CssEngine {
    // Mutation-driving helpers -------------------------------------------
    //
    // These perform the document change and dispatch the matching events at
    // the right time; callers that mutate the document themselves can feed
    // events through `handle_mutation` instead.

    pub fn set_attribute(
        &mut self,
        doc: &mut Document,
        element: NodeId,
        ns: Option<&str>,
        local: &str,
        value: &str,
    ) -> Result<(), CssError> {
        let event = doc.set_attribute(element, ns, local, value);
        self.handle_mutation(doc, &event)
    }

    pub fn remove_attribute(
        &mut self,
        doc: &mut Document,
        element: NodeId,
        ns: Option<&str>,
        local: &str,
    ) -> Result<(), CssError> {
        match doc.remove_attribute(element, ns, local) {
            Some(event) => self.handle_mutation(doc, &event),
            None => Ok(()),
        }
    }

    pub fn insert_element(
        &mut self,
        doc: &mut Document,
        parent: NodeId,
        name: &str,
        pos: usize,
    ) -> Result<NodeId, CssError> {
        let node = doc.insert_element(parent, name, pos);
        self.handle_mutation(doc, &MutationEvent::NodeInserted { target: node })?;
        Ok(node)
    }

    /// Remove a node. The removal event is dispatched while the node is
    /// still attached, then the node is detached, then the subtree-modified
    /// event runs the deferred invalidation.
    pub fn remove_node(&mut self, doc: &mut Document, node: NodeId) -> Result<(), CssError> {
        self.handle_mutation(doc, &MutationEvent::NodeRemoved { target: node })?;
        doc.detach(node);
        self.handle_mutation(doc, &MutationEvent::SubtreeModified)
    }

    pub fn set_character_data(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        text: &str,
    ) -> Result<(), CssError> {
        let event = doc.set_text(node, text);
        self.handle_mutation(doc, &event)
    }

    // Event dispatch -----------------------------------------------------

    /// React to one document mutation event. Ignored after `dispose`.
    pub fn handle_mutation(
        &mut self,
        doc: &Document,
        event: &MutationEvent,
    ) -> Result<(), CssError> {
        if !self.listening {
            return Ok(());
        }
        match event {
            MutationEvent::AttrModified {
                target,
                attr_ns,
                attr_local,
                change,
                prev_value,
                new_value,
            } => self.attr_modified(
                doc,
                *target,
                attr_ns.as_deref(),
                attr_local,
                *change,
                prev_value.as_deref(),
                new_value.as_deref(),
            ),
            MutationEvent::NodeInserted { target } => {
                self.node_inserted(doc, *target);
                Ok(())
            }
            MutationEvent::NodeRemoved { target } => {
                self.node_removed(doc, *target);
                Ok(())
            }
            MutationEvent::SubtreeModified => {
                self.subtree_modified(doc);
                Ok(())
            }
            MutationEvent::CharacterDataModified { target } => {
                self.character_data_modified(doc, *target);
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn attr_modified(
        &mut self,
        doc: &Document,
        element: NodeId,
        attr_ns: Option<&str>,
        attr_local: &str,
        change: AttrChange,
        prev: Option<&str>,
        new: Option<&str>,
    ) -> Result<(), CssError> {
        if !doc.is_stylable(element) {
            return Ok(());
        }
        if !self.has_computed_map(element) {
            // Nobody ever asked for this element's computed style.
            return Ok(());
        }

        let is_style_attr = self.settings.style_attr_local.as_deref() == Some(attr_local)
            && self.settings.style_attr_ns.as_deref() == attr_ns;
        if is_style_attr {
            return self.inline_style_updated(doc, element, change, prev, new);
        }

        if let Some(hints) = &self.non_css_hints {
            if self.settings.hints_ns.as_deref() == attr_ns {
                let name = attr_local.to_ascii_lowercase();
                if hints.contains(&name) {
                    return self.hint_updated(doc, element, &name, change, new);
                }
            }
        }

        if self.selector_attributes.contains(attr_local) {
            // Selector matching may change; rebuild the whole element.
            log::debug!("selector attribute {attr_local:?} changed, invalidating element");
            self.clear_element_maps(element);
            let all = self.all_properties().to_vec();
            self.fire_properties_changed(element, &all);
            self.propagate_to_children(doc, element, &all);
        }
        Ok(())
    }

    // Inline style -------------------------------------------------------

    fn inline_style_updated(
        &mut self,
        doc: &Document,
        element: NodeId,
        change: AttrChange,
        prev: Option<&str>,
        new: Option<&str>,
    ) -> Result<(), CssError> {
        if self
            .computed_map(element, None)
            .map_or(false, StyleMap::is_fixed_cascaded_style)
        {
            // Imported maps carry another document's cascade; the host
            // attribute does not flow into them.
            return Ok(());
        }

        let mut updated = vec![false; self.number_of_properties()];
        match change {
            AttrChange::Addition | AttrChange::Modification => {
                if let Some(text) = new {
                    if !text.is_empty() {
                        self.write_inline_declarations(element, text, &mut updated)?;
                    }
                }
            }
            AttrChange::Removal => {}
        }

        // Any computed inline-origin slot the new declaration did not touch
        // means declarations were dropped: the cascade must be rebuilt.
        let mut removed = false;
        if prev.map_or(false, |p| !p.is_empty()) {
            if let Some(style) = self.computed_map(element, None) {
                for (i, touched) in updated.iter_mut().enumerate() {
                    if style.is_computed(i)
                        && style.origin(i) == Origin::InlineAuthor
                        && !*touched
                    {
                        removed = true;
                        *touched = true;
                    }
                }
            }
        }

        if removed {
            self.clear_element_maps(element);
            let all = self.all_properties().to_vec();
            self.fire_properties_changed(element, &all);
            self.propagate_to_children(doc, element, &all);
        } else {
            let touched = self.extend_relative_dependents(element, &mut updated);
            if !touched.is_empty() {
                self.fire_properties_changed(element, &touched);
                self.propagate_to_children(doc, element, &touched);
            }
        }
        Ok(())
    }

    /// Parse the new style attribute text into the existing map: important
    /// slots are untouchable from inline, previously computed slots are
    /// recorded as touched, and each written slot has its flags reset.
    fn write_inline_declarations(
        &mut self,
        element: NodeId,
        text: &str,
        updated: &mut [bool],
    ) -> Result<(), CssError> {
        let Some(mut style) = self.take_computed_map(element, None) else {
            return Ok(());
        };
        let result = {
            let mut writer = InlineUpdateWriter {
                engine: self,
                style: &mut style,
                updated,
            };
            self.parser.parse_style_declaration(text, &mut writer)
        };
        self.put_computed_map(element, None, style);
        result.map_err(|e| {
            let subject = self
                .settings
                .style_attr_local
                .clone()
                .unwrap_or_else(|| "style".to_string());
            e.into_syntax(&self.document_uri_string(), &subject, text)
        })
    }

    // Presentational hints -----------------------------------------------

    fn hint_updated(
        &mut self,
        doc: &Document,
        element: NodeId,
        property: &str,
        change: AttrChange,
        new: Option<&str>,
    ) -> Result<(), CssError> {
        let Some(idx) = self.property_index(property) else {
            return Ok(());
        };
        let was_computed = {
            let Some(style) = self.computed_map(element, None) else {
                return Ok(());
            };
            if style.is_fixed_cascaded_style() {
                return Ok(());
            }
            if style.is_important(idx) {
                // An attribute value cannot override an !important one.
                return Ok(());
            }
            if matches!(style.origin(idx), Origin::Author | Origin::InlineAuthor) {
                // The current value has a higher cascade priority.
                return Ok(());
            }
            style.is_computed(idx)
        };

        match change {
            AttrChange::Addition | AttrChange::Modification => {
                let text = new.unwrap_or_default();
                let uri = self.document_uri_string();
                let units = self
                    .parser
                    .parse_property_value(text)
                    .map_err(|e| e.into_syntax(&uri, property, text))?;
                let doc_uri = self.settings.document_uri.clone();
                let pcx = ParseContext {
                    base_uri: doc_uri.as_ref(),
                };
                let value = self.value_managers[idx]
                    .create_value(&units, &pcx)
                    .map_err(|e| e.into_syntax(&uri, property, text))?;
                if let Some(style) = self.computed_map_mut(element, None) {
                    style.clear_flags(idx);
                    style.put_value(idx, std::sync::Arc::new(value));
                    style.put_origin(idx, Origin::NonCss);
                }
            }
            AttrChange::Removal => {
                self.clear_element_maps(element);
                let all = self.all_properties().to_vec();
                self.fire_properties_changed(element, &all);
                self.propagate_to_children(doc, element, &all);
                return Ok(());
            }
        }

        if !was_computed {
            // The previous value was never computed: nobody can observe the
            // change.
            return Ok(());
        }
        let mut updated = vec![false; self.number_of_properties()];
        updated[idx] = true;
        let touched = self.extend_relative_dependents(element, &mut updated);
        self.fire_properties_changed(element, &touched);
        self.propagate_to_children(doc, element, &touched);
        Ok(())
    }

    // Structural events --------------------------------------------------

    fn node_inserted(&mut self, doc: &Document, node: NodeId) {
        if doc.is_style_sheet_carrier(node) {
            log::debug!("stylesheet node inserted, invalidating the document");
            self.style_sheet_nodes = None;
            if let Some(root) = doc.document_element() {
                self.invalidate_tree(doc, root);
            }
            return;
        }
        if doc.is_stylable(node) {
            // Following siblings may now match adjacent-sibling and
            // first-child style selectors differently.
            let mut sibling = doc.next_sibling(node);
            while let Some(s) = sibling {
                self.invalidate_node(doc, s);
                sibling = doc.next_sibling(s);
            }
        }
    }

    fn node_removed(&mut self, doc: &Document, node: NodeId) {
        if doc.is_style_sheet_carrier(node) {
            // The node is still in the tree; defer the invalidation to the
            // subtree-modified event.
            self.style_sheet_removed = true;
        } else if doc.is_stylable(node) {
            self.removed_stylable_sibling = doc.next_sibling(node);
        }
        // The removed subtree's maps are dropped immediately, silently.
        self.dispose_subtree_maps(doc, node);
    }

    fn subtree_modified(&mut self, doc: &Document) {
        if self.style_sheet_removed {
            self.style_sheet_removed = false;
            self.style_sheet_nodes = None;
            if let Some(root) = doc.document_element() {
                self.invalidate_tree(doc, root);
            }
        } else if let Some(start) = self.removed_stylable_sibling.take() {
            let mut sibling = Some(start);
            while let Some(s) = sibling {
                self.invalidate_node(doc, s);
                sibling = doc.next_sibling(s);
            }
        }
    }

    fn character_data_modified(&mut self, doc: &Document, node: NodeId) {
        let in_carrier = doc
            .parent(node)
            .map_or(false, |p| doc.is_style_sheet_carrier(p));
        if in_carrier {
            self.style_sheet_nodes = None;
            if let Some(root) = doc.document_element() {
                self.invalidate_tree(doc, root);
            }
        }
    }

    // Invalidation walks -------------------------------------------------

    /// Clear the computed maps of the node and all logical descendants,
    /// firing a whole-element notification for each cleared element.
    /// Imported subtrees are only propagated into: their maps carry a fixed
    /// cascade that must survive.
    pub(crate) fn invalidate_tree(&mut self, doc: &Document, node: NodeId) {
        if doc.is_stylable(node) && self.has_computed_map(node) {
            self.clear_element_maps(node);
            let all = self.all_properties().to_vec();
            self.fire_properties_changed(node, &all);
        }
        let all = self.all_properties().to_vec();
        for child in traversal::imported_children(doc, node) {
            self.propagate(doc, child, &all);
        }
        let children: Vec<NodeId> = doc.children(node).collect();
        for child in children {
            self.invalidate_tree(doc, child);
        }
    }

    /// Clear the node's own computed map and propagate a whole-element
    /// change into its logical descendants.
    pub(crate) fn invalidate_node(&mut self, doc: &Document, node: NodeId) {
        if doc.is_stylable(node) && self.has_computed_map(node) {
            self.clear_element_maps(node);
            let all = self.all_properties().to_vec();
            self.fire_properties_changed(node, &all);
        }
        let all = self.all_properties().to_vec();
        self.propagate_to_children(doc, node, &all);
    }

    /// Push a set of changed properties down one node: slots that inherited
    /// from the parent are cleared, same-element relative dependents are
    /// added, and the (possibly narrowed) set continues into the logical
    /// children. An empty set stops the walk.
    pub(crate) fn propagate(&mut self, doc: &Document, node: NodeId, props: &[usize]) {
        let mut forward: Option<Vec<usize>> = Some(props.to_vec());
        if doc.is_stylable(node) && self.has_computed_map(node) {
            let mut updated = vec![false; self.number_of_properties()];
            if let Some(style) = self.computed_map_mut(node, None) {
                for &idx in props {
                    if style.is_computed(idx) && style.is_parent_relative(idx) {
                        updated[idx] = true;
                        style.clear_computed_value(idx);
                    }
                }
            }
            let touched = self.extend_relative_dependents(node, &mut updated);
            if touched.is_empty() {
                forward = None;
            } else {
                self.fire_properties_changed(node, &touched);
                forward = Some(touched);
            }
        }
        if let Some(props) = forward {
            self.propagate_to_children(doc, node, &props);
        }
    }

    fn propagate_to_children(&mut self, doc: &Document, node: NodeId, props: &[usize]) {
        for child in traversal::imported_children(doc, node) {
            self.propagate(doc, child, props);
        }
        let children: Vec<NodeId> = doc.children(node).collect();
        for child in children {
            self.propagate(doc, child, props);
        }
    }

    /// Extend the `updated` set with slots whose computed value depends on a
    /// just-changed font-size / line-height / color of the same element,
    /// clearing those slots, and collect every touched index.
    fn extend_relative_dependents(&mut self, element: NodeId, updated: &mut [bool]) -> Vec<usize> {
        let fs = self.font_size_index.map_or(false, |i| updated[i]);
        let lh = self.line_height_index.map_or(false, |i| updated[i]);
        let cl = self.color_index.map_or(false, |i| updated[i]);

        let mut touched = Vec::new();
        let Some(style) = self.computed_map_mut(element, None) else {
            for (i, u) in updated.iter().enumerate() {
                if *u {
                    touched.push(i);
                }
            }
            return touched;
        };
        for i in 0..updated.len() {
            if updated[i] {
                touched.push(i);
                continue;
            }
            if !style.is_computed(i) {
                continue;
            }
            let dependent = (fs && style.is_font_size_relative(i))
                || (lh && style.is_line_height_relative(i))
                || (cl && style.is_color_relative(i));
            if dependent {
                updated[i] = true;
                touched.push(i);
                style.clear_computed_value(i);
            }
        }
        touched
    }

    fn dispose_subtree_maps(&mut self, doc: &Document, node: NodeId) {
        self.computed.remove(&node);
        for child in traversal::imported_children(doc, node) {
            self.dispose_subtree_maps(doc, child);
        }
        let children: Vec<NodeId> = doc.children(node).collect();
        for child in children {
            self.dispose_subtree_maps(doc, child);
        }
    }
}

/// Writes re-parsed inline declarations into an existing style map.
struct InlineUpdateWriter<'e, 'm, 'u> {
    engine: &'e CssEngine,
    style: &'m mut StyleMap,
    updated: &'u mut [bool],
}

impl DocumentHandler for InlineUpdateWriter<'_, '_, '_> {
    fn property(
        &mut self,
        name: &str,
        value: &[LexicalUnit],
        important: bool,
    ) -> Result<(), CssError> {
        let pcx = ParseContext {
            base_uri: self.engine.settings.document_uri.as_ref(),
        };
        let style = &mut *self.style;
        let updated = &mut *self.updated;
        self.engine
            .dispatch_property(name, value, important, &pcx, &mut |idx, v, _imp| {
                if style.is_important(idx) {
                    // An inline value cannot override an !important one.
                    return Ok(());
                }
                if style.is_computed(idx) {
                    updated[idx] = true;
                }
                style.clear_flags(idx);
                style.put_value(idx, v);
                style.put_origin(idx, Origin::InlineAuthor);
                Ok(())
            })
    }
}
