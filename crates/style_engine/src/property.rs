//! The value-manager seam: per-property parsing and computation plug into
//! the engine through these traits.

pub mod standard;

use crate::style_map::SlotFlags;
use crate::{traversal, CssEngine};
use css::{CssError, LexicalUnit, Value};
use dom::{Document, NodeId};
use std::sync::Arc;
use url::Url;

/// Context threaded through value parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseContext<'a> {
    /// Base URI relative references resolve against (the stylesheet's URI,
    /// or the document URI for attribute values).
    pub base_uri: Option<&'a Url>,
}

/// Per-longhand plug-in: parses cascaded values and produces computed ones.
pub trait ValueManager {
    fn property_name(&self) -> &str;

    /// Whether the property inherits when nothing cascades.
    fn is_inherited_property(&self) -> bool;

    fn default_value(&self) -> Arc<Value>;

    /// Parse a cascaded value from lexical units.
    fn create_value(
        &self,
        units: &[LexicalUnit],
        ctx: &ParseContext<'_>,
    ) -> Result<Value, CssError>;

    /// Produce the computed form of `cascaded`. Reading another property
    /// through the context records the relative-dependence flags used by
    /// targeted invalidation. Returning the cascaded `Arc` unchanged marks
    /// the value as already absolute.
    fn compute_value(
        &self,
        cx: &mut ComputeContext<'_, '_>,
        cascaded: &Arc<Value>,
    ) -> Result<Arc<Value>, CssError>;
}

/// Per-shorthand plug-in: expands a shorthand into longhand triples through
/// the emit callback, which routes back into ordinary property dispatch.
pub trait ShorthandManager {
    fn property_name(&self) -> &str;

    fn set_values(
        &self,
        units: &[LexicalUnit],
        important: bool,
        ctx: &ParseContext<'_>,
        emit: &mut dyn FnMut(&str, &[LexicalUnit], bool) -> Result<(), CssError>,
    ) -> Result<(), CssError>;
}

/// What a value manager sees while computing: same-element and parent
/// computed lookups, with dependence tracking as a side effect.
pub struct ComputeContext<'a, 'd> {
    pub(crate) engine: &'a mut CssEngine,
    pub(crate) doc: &'d Document,
    pub(crate) element: NodeId,
    pub(crate) pseudo: Option<String>,
    pub(crate) property: usize,
    pub(crate) deps: SlotFlags,
}

impl<'a, 'd> ComputeContext<'a, 'd> {
    /// Index of the property being computed.
    #[inline]
    pub fn property_index(&self) -> usize {
        self.property
    }

    #[inline]
    pub fn font_size_index(&self) -> Option<usize> {
        self.engine.font_size_index()
    }

    #[inline]
    pub fn line_height_index(&self) -> Option<usize> {
        self.engine.line_height_index()
    }

    #[inline]
    pub fn color_index(&self) -> Option<usize> {
        self.engine.color_index()
    }

    /// The computed value of another property on the same element. Consulting
    /// font-size, line-height or color records the matching relative flag on
    /// the slot being computed.
    pub fn computed(&mut self, idx: usize) -> Result<Arc<Value>, CssError> {
        if Some(idx) == self.engine.font_size_index() {
            self.deps |= SlotFlags::FONT_SIZE_RELATIVE;
        }
        if Some(idx) == self.engine.line_height_index() {
            self.deps |= SlotFlags::LINE_HEIGHT_RELATIVE;
        }
        if Some(idx) == self.engine.color_index() {
            self.deps |= SlotFlags::COLOR_RELATIVE;
        }
        self.engine
            .get_computed_style(self.doc, self.element, self.pseudo.as_deref(), idx)
    }

    /// The computed value of a property on the nearest stylable ancestor, or
    /// `None` at the top of the tree. Records the parent-relative flag.
    pub fn parent_computed(&mut self, idx: usize) -> Result<Option<Arc<Value>>, CssError> {
        match traversal::parent_stylable_element(self.doc, self.element) {
            Some(parent) => {
                self.deps |= SlotFlags::PARENT_RELATIVE;
                Ok(Some(self.engine.get_computed_style(self.doc, parent, None, idx)?))
            }
            None => Ok(None),
        }
    }
}
