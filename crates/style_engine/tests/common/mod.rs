#![allow(dead_code)]

use css::Value;
use dom::{Document, NodeId, StyleSheetInfo};
use std::sync::{Arc, Mutex};
use style_engine::property::standard::{standard_shorthand_managers, standard_value_managers};
use style_engine::{
    CssEngine, CssEngineEvent, CssEngineListener, DenyAllContext, EngineSettings,
};

pub fn new_engine() -> CssEngine {
    engine_with(EngineSettings::default())
}

pub fn engine_with(settings: EngineSettings) -> CssEngine {
    CssEngine::new(
        standard_value_managers(),
        standard_shorthand_managers(),
        settings,
        Arc::new(DenyAllContext),
    )
}

/// Append a `<style>` stylesheet carrier holding `css` under `parent`.
pub fn add_style_sheet(doc: &mut Document, parent: NodeId, css: &str) -> NodeId {
    let style = doc.append_element(parent, "style");
    if let Some(data) = doc.element_mut(style) {
        data.style_sheet = Some(StyleSheetInfo::default());
    }
    doc.append_text(style, css);
    style
}

pub fn rgba(red: u8, green: u8, blue: u8) -> css::Rgba {
    css::Rgba {
        red,
        green,
        blue,
        alpha: 255,
    }
}

pub fn as_px(value: &Arc<Value>) -> Option<f32> {
    value.resolved().as_px()
}

pub fn as_color(value: &Arc<Value>) -> Option<css::Rgba> {
    value.resolved().as_color()
}

/// Listener recording every change notification for assertions.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<(NodeId, Vec<usize>)>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<(NodeId, Vec<usize>)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl CssEngineListener for Recorder {
    fn properties_changed(&self, event: &CssEngineEvent<'_>) {
        self.events
            .lock()
            .unwrap()
            .push((event.element, event.properties.to_vec()));
    }
}
