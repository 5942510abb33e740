mod common;

use common::*;
use css::{CssError, Rule};
use dom::{Document, StyleSheetInfo};
use std::collections::HashMap;
use std::sync::Arc;
use style_engine::{CssContext, CssEngine, EngineSettings};
use style_engine::property::standard::{standard_shorthand_managers, standard_value_managers};
use url::Url;

/// Serves stylesheets from memory and allows every load.
struct MapContext {
    sheets: HashMap<String, String>,
}

impl MapContext {
    fn new(entries: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            sheets: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }
}

impl CssContext for MapContext {
    fn check_load_external_resource(
        &self,
        _url: &Url,
        _document_url: Option<&Url>,
    ) -> Result<(), CssError> {
        Ok(())
    }

    fn load_style_sheet(&self, url: &Url) -> Result<String, CssError> {
        self.sheets
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| CssError::Resource {
                url: url.to_string(),
                message: "not found".to_string(),
            })
    }
}

fn engine_with_loader(entries: &[(&str, &str)]) -> CssEngine {
    let settings = EngineSettings {
        document_uri: Some(Url::parse("http://example.org/doc.svg").unwrap()),
        ..EngineSettings::default()
    };
    CssEngine::new(
        standard_value_managers(),
        standard_shorthand_managers(),
        settings,
        MapContext::new(entries),
    )
}

#[test]
fn media_rules_apply_only_on_matching_media() {
    let mut engine = new_engine();
    engine.set_media("screen").unwrap();

    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(
        &mut doc,
        svg,
        "@media print { rect { color: red } } @media screen { rect { color: blue } }",
    );
    let rect = doc.append_element(svg, "rect");

    let color = engine.property_index("color").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(0, 0, 255)));
}

#[test]
fn all_media_matches_everything() {
    let mut engine = new_engine();
    engine.set_media("screen").unwrap();

    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "@media all { rect { color: red } }");
    let rect = doc.append_element(svg, "rect");

    let color = engine.property_index("color").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(255, 0, 0)));
}

#[test]
fn sheet_level_media_gates_the_whole_sheet() {
    let mut engine = new_engine();
    engine.set_media("screen").unwrap();

    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    let style = doc.append_element(svg, "style");
    if let Some(data) = doc.element_mut(style) {
        data.style_sheet = Some(StyleSheetInfo {
            media: "print".to_string(),
            ..StyleSheetInfo::default()
        });
    }
    doc.append_text(style, "rect { color: red }");
    let rect = doc.append_element(svg, "rect");

    let color = engine.property_index("color").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(0, 0, 0)), "print sheet is inactive");
}

#[test]
fn alternate_sheets_need_a_matching_title() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    let style = doc.append_element(svg, "style");
    if let Some(data) = doc.element_mut(style) {
        data.style_sheet = Some(StyleSheetInfo {
            title: Some("fancy".to_string()),
            alternate: true,
            media: String::new(),
        });
    }
    doc.append_text(style, "rect { color: red }");
    let rect = doc.append_element(svg, "rect");

    let color = engine.property_index("color").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(0, 0, 0)), "unselected alternate sheet");

    // Select the alternate set and rebuild the element's style.
    let mut engine = new_engine();
    engine.set_alternate_style_sheet(Some("fancy"));
    let v = engine.get_computed_style(&doc, rect, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(255, 0, 0)));
}

#[test]
fn imports_resolve_through_the_loader() {
    let mut engine = engine_with_loader(&[(
        "http://example.org/base.css",
        "rect { color: red }",
    )]);
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(
        &mut doc,
        svg,
        "@import url(\"base.css\"); rect { width: 10px }",
    );
    let rect = doc.append_element(svg, "rect");

    let color = engine.property_index("color").unwrap();
    let width = engine.property_index("width").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(255, 0, 0)));
    let v = engine.get_computed_style(&doc, rect, None, width).unwrap();
    assert_eq!(as_px(&v), Some(10.0));
}

#[test]
fn nested_imports_resolve_relative_to_their_sheet() {
    let engine = engine_with_loader(&[
        (
            "http://example.org/styles/base.css",
            "@import \"palette.css\"; rect { width: 10px }",
        ),
        ("http://example.org/styles/palette.css", "rect { color: red }"),
    ]);
    let sheet = engine
        .parse_style_sheet(
            "@import url(\"styles/base.css\");",
            Some(&Url::parse("http://example.org/doc.svg").unwrap()),
            "",
        )
        .unwrap();
    let Rule::Import(import) = &sheet.rules[0] else {
        panic!("expected an import rule");
    };
    assert_eq!(import.rules.len(), 2, "nested import plus the style rule");
    let Rule::Import(nested) = &import.rules[0] else {
        panic!("expected the nested import first");
    };
    assert_eq!(
        nested.uri.as_ref().map(Url::as_str),
        Some("http://example.org/styles/palette.css")
    );
    assert_eq!(nested.rules.len(), 1);
}

#[test]
fn late_imports_are_inert() {
    let mut engine = engine_with_loader(&[(
        "http://example.org/late.css",
        "rect { color: red }",
    )]);
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(
        &mut doc,
        svg,
        "rect { width: 10px } @import url(\"late.css\");",
    );
    let rect = doc.append_element(svg, "rect");

    let color = engine.property_index("color").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, color).unwrap();
    assert_eq!(
        as_color(&v),
        Some(rgba(0, 0, 0)),
        "imports after other rules are never loaded"
    );
}

#[test]
fn refused_imports_surface_the_security_error() {
    // The default context refuses every external load.
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "@import url(\"http://evil.example/x.css\");");
    let rect = doc.append_element(svg, "rect");

    let color = engine.property_index("color").unwrap();
    let err = engine
        .get_computed_style(&doc, rect, None, color)
        .unwrap_err();
    assert!(matches!(err, CssError::Security { .. }), "got {err:?}");
}

#[test]
fn user_sheets_can_be_loaded_by_uri() {
    let engine = engine_with_loader(&[(
        "http://example.org/user.css",
        "rect { color: red }",
    )]);
    let sheet = engine
        .load_style_sheet(&Url::parse("http://example.org/user.css").unwrap(), "")
        .unwrap();
    assert_eq!(sheet.rules.len(), 1);
    assert!(matches!(sheet.rules[0], Rule::Style(_)));
}

#[test]
fn parse_style_declaration_builds_triples() {
    let engine = new_engine();
    let decl = engine
        .parse_style_declaration("color: red; width: 10px !important")
        .unwrap();
    assert_eq!(decl.len(), 2);
    let entries: Vec<_> = decl.iter().collect();
    assert_eq!(entries[0].index, engine.property_index("color").unwrap());
    assert!(!entries[0].important);
    assert_eq!(entries[1].index, engine.property_index("width").unwrap());
    assert!(entries[1].important);
}

#[test]
fn parse_property_value_rejects_garbage() {
    let engine = new_engine();
    let v = engine.parse_property_value("color", "red").unwrap();
    assert_eq!(v.as_color(), Some(rgba(255, 0, 0)));
    assert!(engine.parse_property_value("color", "12parsecs").is_err());
    assert!(engine.parse_property_value("warp-factor", "9").is_err());
}

#[test]
fn engine_media_syntax_errors_are_reported() {
    let mut engine = new_engine();
    let err = engine.set_media("screen,").unwrap_err();
    assert!(matches!(err, CssError::Syntax { .. }), "got {err:?}");
}
