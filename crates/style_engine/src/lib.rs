//! The cascade / computed-value / invalidation engine.
//!
//! The engine owns no document: every query and mutation entry point takes
//! the `dom::Document` it operates on. Per-property behavior plugs in
//! through value managers and shorthand managers; stylesheet loading and
//! security checks plug in through [`CssContext`].
//!
//! Query flow: [`CssEngine::get_computed_style`] builds the element's
//! cascaded style map on first use, then resolves slots lazily. Mutation
//! flow: the engine's mutation helpers (or a caller-driven
//! [`CssEngine::handle_mutation`]) invalidate exactly the computed values
//! that may have changed and notify listeners.

mod cascade;
mod computed;
mod context;
mod events;
mod invalidation;
mod matching;
pub mod property;
mod sheets;
mod style_map;
pub mod traversal;

pub use context::{CssContext, DenyAllContext};
pub use events::{CssEngineEvent, CssEngineListener};
pub use property::{ComputeContext, ParseContext, ShorthandManager, ValueManager};
pub use style_map::{Origin, SlotFlags, StyleMap};

use css::{CssError, CssParser, LexicalUnit, MediaList, StyleSheet, Value};
use dom::{Document, NodeId};
use matching::MatchContext;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use url::Url;

/// Construction-time configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub document_uri: Option<Url>,
    /// Pseudo-element names the engine serves, e.g. `first-line`.
    pub pseudo_element_names: Vec<String>,
    /// Namespace and local name of the inline style attribute. A `None`
    /// local name disables inline styles.
    pub style_attr_ns: Option<String>,
    pub style_attr_local: Option<String>,
    /// Namespace and local name of the class attribute.
    pub class_attr_ns: Option<String>,
    pub class_attr_local: String,
    /// Whether XML attributes named like properties act as presentational
    /// hints, and in which namespace.
    pub presentational_hints: bool,
    pub hints_ns: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            document_uri: None,
            pseudo_element_names: Vec::new(),
            style_attr_ns: None,
            style_attr_local: Some("style".to_string()),
            class_attr_ns: None,
            class_attr_local: "class".to_string(),
            presentational_hints: false,
            hints_ns: None,
        }
    }
}

/// A stylesheet-carrier node together with its parsed sheet.
pub(crate) struct DocumentSheet {
    #[allow(dead_code)]
    pub node: NodeId,
    pub sheet: Arc<StyleSheet>,
}

/// The computed style maps of one element, keyed by pseudo-element.
#[derive(Default)]
struct ElementStyleMaps {
    none: Option<StyleMap>,
    pseudos: Vec<(String, StyleMap)>,
}

impl ElementStyleMaps {
    fn get(&self, pseudo: Option<&str>) -> Option<&StyleMap> {
        match pseudo {
            None => self.none.as_ref(),
            Some(p) => self
                .pseudos
                .iter()
                .find(|(name, _)| name == p)
                .map(|(_, m)| m),
        }
    }

    fn get_mut(&mut self, pseudo: Option<&str>) -> Option<&mut StyleMap> {
        match pseudo {
            None => self.none.as_mut(),
            Some(p) => self
                .pseudos
                .iter_mut()
                .find(|(name, _)| name == p)
                .map(|(_, m)| m),
        }
    }

    fn insert(&mut self, pseudo: Option<&str>, map: StyleMap) {
        match pseudo {
            None => self.none = Some(map),
            Some(p) => {
                if let Some(slot) = self.pseudos.iter_mut().find(|(name, _)| name == p) {
                    slot.1 = map;
                } else {
                    self.pseudos.push((p.to_string(), map));
                }
            }
        }
    }

    fn take(&mut self, pseudo: Option<&str>) -> Option<StyleMap> {
        match pseudo {
            None => self.none.take(),
            Some(p) => {
                let idx = self.pseudos.iter().position(|(name, _)| name == p)?;
                Some(self.pseudos.remove(idx).1)
            }
        }
    }
}

pub struct CssEngine {
    parser: CssParser,
    context: Arc<dyn CssContext>,
    settings: EngineSettings,
    value_managers: Vec<Arc<dyn ValueManager>>,
    shorthand_managers: Vec<Arc<dyn ShorthandManager>>,
    property_indexes: HashMap<String, usize>,
    shorthand_indexes: HashMap<String, usize>,
    font_size_index: Option<usize>,
    line_height_index: Option<usize>,
    color_index: Option<usize>,
    all_properties: Vec<usize>,
    /// Property names recognised as presentational hints, when enabled.
    non_css_hints: Option<HashSet<String>>,
    user_agent_sheet: Option<StyleSheet>,
    user_sheet: Option<StyleSheet>,
    /// The media the engine computes styles for.
    media: MediaList,
    alternate_style_sheet: Option<String>,
    /// Cached stylesheet-carrier nodes with their parsed sheets; rebuilt
    /// lazily after document mutations.
    style_sheet_nodes: Option<Vec<DocumentSheet>>,
    /// Attribute names appearing in selectors of the active sheets.
    selector_attributes: HashSet<String>,
    computed: HashMap<NodeId, ElementStyleMaps>,
    listeners: Vec<Arc<dyn CssEngineListener>>,
    /// Pending state between a node-removed event and the following
    /// subtree-modified event.
    style_sheet_removed: bool,
    removed_stylable_sibling: Option<NodeId>,
    /// Cleared by `dispose`; mutation events are ignored afterwards.
    listening: bool,
}

impl CssEngine {
    pub fn new(
        value_managers: Vec<Arc<dyn ValueManager>>,
        shorthand_managers: Vec<Arc<dyn ShorthandManager>>,
        settings: EngineSettings,
        context: Arc<dyn CssContext>,
    ) -> Self {
        let mut property_indexes = HashMap::new();
        let mut font_size_index = None;
        let mut line_height_index = None;
        let mut color_index = None;
        for (i, vm) in value_managers.iter().enumerate() {
            let name = vm.property_name().to_ascii_lowercase();
            if font_size_index.is_none() && name == "font-size" {
                font_size_index = Some(i);
            }
            if line_height_index.is_none() && name == "line-height" {
                line_height_index = Some(i);
            }
            if color_index.is_none() && name == "color" {
                color_index = Some(i);
            }
            property_indexes.entry(name).or_insert(i);
        }

        let mut shorthand_indexes = HashMap::new();
        for (i, sm) in shorthand_managers.iter().enumerate() {
            shorthand_indexes
                .entry(sm.property_name().to_ascii_lowercase())
                .or_insert(i);
        }

        let non_css_hints = if settings.presentational_hints {
            Some(
                value_managers
                    .iter()
                    .map(|vm| vm.property_name().to_ascii_lowercase())
                    .collect(),
            )
        } else {
            None
        };

        let all_properties = (0..value_managers.len()).collect();

        Self {
            parser: CssParser::new(),
            context,
            settings,
            value_managers,
            shorthand_managers,
            property_indexes,
            shorthand_indexes,
            font_size_index,
            line_height_index,
            color_index,
            all_properties,
            non_css_hints,
            user_agent_sheet: None,
            user_sheet: None,
            media: MediaList::default(),
            alternate_style_sheet: None,
            style_sheet_nodes: None,
            selector_attributes: HashSet::new(),
            computed: HashMap::new(),
            listeners: Vec::new(),
            style_sheet_removed: false,
            removed_stylable_sibling: None,
            listening: true,
        }
    }

    // Registry accessors -------------------------------------------------

    #[inline]
    pub fn number_of_properties(&self) -> usize {
        self.value_managers.len()
    }

    /// The index of a longhand property, if known.
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.property_indexes
            .get(&name.to_ascii_lowercase())
            .copied()
    }

    /// The index of a shorthand property, if known.
    pub fn shorthand_index(&self, name: &str) -> Option<usize> {
        self.shorthand_indexes
            .get(&name.to_ascii_lowercase())
            .copied()
    }

    pub fn property_name(&self, idx: usize) -> &str {
        self.value_managers[idx].property_name()
    }

    #[inline]
    pub fn font_size_index(&self) -> Option<usize> {
        self.font_size_index
    }

    #[inline]
    pub fn line_height_index(&self) -> Option<usize> {
        self.line_height_index
    }

    #[inline]
    pub fn color_index(&self) -> Option<usize> {
        self.color_index
    }

    /// Every property index, in order; the payload of whole-element change
    /// notifications.
    #[inline]
    pub fn all_properties(&self) -> &[usize] {
        &self.all_properties
    }

    pub fn value_managers(&self) -> &[Arc<dyn ValueManager>] {
        &self.value_managers
    }

    // Configuration ------------------------------------------------------

    pub fn set_user_agent_style_sheet(&mut self, sheet: StyleSheet) {
        self.user_agent_sheet = Some(sheet);
    }

    pub fn set_user_style_sheet(&mut self, sheet: StyleSheet) {
        self.user_sheet = Some(sheet);
    }

    /// Set the media the engine computes styles for, e.g. `"screen"`.
    pub fn set_media(&mut self, text: &str) -> Result<(), CssError> {
        self.media = self
            .parser
            .parse_media(text)
            .map_err(|e| e.into_syntax(&self.document_uri_string(), "media", text))?;
        Ok(())
    }

    /// Select the active alternate stylesheet set by title.
    pub fn set_alternate_style_sheet(&mut self, title: Option<&str>) {
        self.alternate_style_sheet = title.map(str::to_string);
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Release every computed style map and stop reacting to mutations.
    pub fn dispose(&mut self) {
        log::info!(
            "disposing CSS engine, dropping {} computed style maps",
            self.computed.len()
        );
        self.computed.clear();
        self.listening = false;
    }

    // Cascaded-map import ------------------------------------------------

    /// Recursively install `src_engine`'s cascaded style maps for the tree
    /// under `src` onto the structurally parallel tree under `dst`. The
    /// installed maps are marked fixed: this engine will not re-run the
    /// cascade over them.
    pub fn import_cascaded_style_maps(
        &mut self,
        src_doc: &Document,
        src_engine: &mut CssEngine,
        src: NodeId,
        dst_doc: &Document,
        dst: NodeId,
    ) -> Result<(), CssError> {
        if src_doc.is_stylable(src) {
            let mut sm = src_engine.get_cascaded_style_map(src_doc, src, None)?;
            sm.set_fixed_cascaded_style(true);
            self.computed.entry(dst).or_default().insert(None, sm);

            let pseudos = self.settings.pseudo_element_names.clone();
            for pe in &pseudos {
                let mut sm = src_engine.get_cascaded_style_map(src_doc, src, Some(pe))?;
                sm.set_fixed_cascaded_style(true);
                self.computed
                    .entry(dst)
                    .or_default()
                    .insert(Some(pe.as_str()), sm);
            }
        }

        let src_children: Vec<NodeId> = src_doc.children(src).collect();
        let dst_children: Vec<NodeId> = dst_doc.children(dst).collect();
        for (s, d) in src_children.into_iter().zip(dst_children) {
            if src_doc.is_element(s) && dst_doc.is_element(d) {
                self.import_cascaded_style_maps(src_doc, src_engine, s, dst_doc, d)?;
            }
        }
        Ok(())
    }

    // Property dispatch --------------------------------------------------

    /// Route one parsed declaration: known longhands go through their value
    /// manager into `sink`; shorthands re-emit longhands through the same
    /// path; anything else is dropped.
    pub(crate) fn dispatch_property(
        &self,
        name: &str,
        units: &[LexicalUnit],
        important: bool,
        pcx: &ParseContext<'_>,
        sink: &mut dyn FnMut(usize, Arc<Value>, bool) -> Result<(), CssError>,
    ) -> Result<(), CssError> {
        if let Some(idx) = self.property_index(name) {
            let value = self.value_managers[idx].create_value(units, pcx)?;
            sink(idx, Arc::new(value), important)
        } else if let Some(sidx) = self.shorthand_index(name) {
            let manager = self.shorthand_managers[sidx].clone();
            manager.set_values(units, important, pcx, &mut |n, u, imp| {
                self.dispatch_property(n, u, imp, pcx, &mut *sink)
            })
        } else {
            log::debug!("ignoring declaration for unknown property {name:?}");
            Ok(())
        }
    }

    // Computed-map storage -----------------------------------------------

    pub(crate) fn computed_map(&self, element: NodeId, pseudo: Option<&str>) -> Option<&StyleMap> {
        self.computed.get(&element).and_then(|m| m.get(pseudo))
    }

    pub(crate) fn computed_map_mut(
        &mut self,
        element: NodeId,
        pseudo: Option<&str>,
    ) -> Option<&mut StyleMap> {
        self.computed.get_mut(&element).and_then(|m| m.get_mut(pseudo))
    }

    pub(crate) fn take_computed_map(
        &mut self,
        element: NodeId,
        pseudo: Option<&str>,
    ) -> Option<StyleMap> {
        self.computed.get_mut(&element).and_then(|m| m.take(pseudo))
    }

    pub(crate) fn put_computed_map(
        &mut self,
        element: NodeId,
        pseudo: Option<&str>,
        map: StyleMap,
    ) {
        self.computed.entry(element).or_default().insert(pseudo, map);
    }

    /// Whether the element has a computed map for the none pseudo; the
    /// invalidator keys its decisions off this.
    pub(crate) fn has_computed_map(&self, element: NodeId) -> bool {
        self.computed
            .get(&element)
            .map_or(false, |m| m.none.is_some())
    }

    /// Drop every computed map of the element. Returns whether the
    /// none-pseudo map existed.
    pub(crate) fn clear_element_maps(&mut self, element: NodeId) -> bool {
        self.computed
            .remove(&element)
            .map_or(false, |m| m.none.is_some())
    }

    pub(crate) fn match_context(&self) -> MatchContext<'_> {
        MatchContext {
            class_ns: self.settings.class_attr_ns.as_deref(),
            class_local: &self.settings.class_attr_local,
        }
    }

    pub(crate) fn document_uri_string(&self) -> String {
        self.settings
            .document_uri
            .as_ref()
            .map_or_else(|| "about:blank".to_string(), Url::to_string)
    }
}
