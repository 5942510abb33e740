mod common;

use common::*;
use dom::Document;
use std::sync::Arc;
use style_engine::{EngineSettings, Origin};

#[test]
fn author_rule_overrides_user_agent_rule() {
    // UA: text { color: red }   author: text { color: green }
    let mut engine = new_engine();
    let ua = engine
        .parse_style_sheet("text { color: red }", None, "")
        .unwrap();
    engine.set_user_agent_style_sheet(ua);

    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "text { color: green }");
    let text = doc.append_element(svg, "text");

    let color = engine.property_index("color").unwrap();
    let v = engine.get_computed_style(&doc, text, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(0, 128, 0)), "author green wins");
}

#[test]
fn important_user_beats_important_author() {
    let mut engine = new_engine();
    let user = engine
        .parse_style_sheet("text { color: blue !important }", None, "")
        .unwrap();
    engine.set_user_style_sheet(user);

    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "text { color: green !important }");
    let text = doc.append_element(svg, "text");

    let color = engine.property_index("color").unwrap();
    let v = engine.get_computed_style(&doc, text, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(0, 0, 255)));
}

#[test]
fn specificity_and_source_order_break_ties() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(
        &mut doc,
        svg,
        "rect { color: red } .cls { color: blue } rect { color: green }",
    );
    let plain = doc.append_element(svg, "rect");
    let classed = doc.append_element(svg, "rect");
    doc.set_attribute(classed, None, "class", "cls");

    let color = engine.property_index("color").unwrap();
    // Same specificity: the later rule wins.
    let v = engine.get_computed_style(&doc, plain, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(0, 128, 0)));
    // The class selector outranks both type rules regardless of order.
    let v = engine
        .get_computed_style(&doc, classed, None, color)
        .unwrap();
    assert_eq!(as_color(&v), Some(rgba(0, 0, 255)));
}

#[test]
fn inline_style_overrides_author_unless_important() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(
        &mut doc,
        svg,
        "rect { color: green } rect { width: 10px !important }",
    );
    let rect = doc.append_element(svg, "rect");
    doc.set_attribute(rect, None, "style", "color: red; width: 20px");

    let color = engine.property_index("color").unwrap();
    let width = engine.property_index("width").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(255, 0, 0)), "inline beats author");
    let v = engine.get_computed_style(&doc, rect, None, width).unwrap();
    assert_eq!(as_px(&v), Some(10.0), "important author beats inline");
}

#[test]
fn cascaded_map_reports_origins() {
    let mut engine = new_engine();
    let ua = engine
        .parse_style_sheet("rect { height: 5px; width: 1px }", None, "")
        .unwrap();
    engine.set_user_agent_style_sheet(ua);

    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "rect { width: 10px }");
    let rect = doc.append_element(svg, "rect");
    doc.set_attribute(rect, None, "style", "color: red");

    let color = engine.property_index("color").unwrap();
    let width = engine.property_index("width").unwrap();
    let height = engine.property_index("height").unwrap();

    let sm = engine.get_cascaded_style_map(&doc, rect, None).unwrap();
    assert_eq!(sm.origin(width), Origin::Author);
    assert_eq!(sm.origin(height), Origin::UserAgent);
    assert_eq!(sm.origin(color), Origin::InlineAuthor);
    assert!(sm.value(engine.property_index("opacity").unwrap()).is_none());
}

#[test]
fn inherited_property_shares_the_parent_value() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "svg { color: red }");
    let g = doc.append_element(svg, "g");
    let text = doc.append_element(g, "text");

    let color = engine.property_index("color").unwrap();
    let parent = engine.get_computed_style(&doc, svg, None, color).unwrap();
    let child = engine.get_computed_style(&doc, text, None, color).unwrap();
    // No cascaded declaration on the descendants: the computed value is the
    // parent's value, shared.
    assert!(Arc::ptr_eq(&parent, &child));
    assert_eq!(as_color(&child), Some(rgba(255, 0, 0)));
}

#[test]
fn non_inherited_property_falls_back_to_its_default() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "svg { width: 100px }");
    let rect = doc.append_element(svg, "rect");

    let width = engine.property_index("width").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, width).unwrap();
    assert_eq!(v.resolved().as_ident(), Some("auto"));
}

#[test]
fn explicit_inherit_pulls_from_the_parent() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "svg { width: 100px } rect { width: inherit }");
    let rect = doc.append_element(svg, "rect");

    let width = engine.property_index("width").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, width).unwrap();
    assert_eq!(as_px(&v), Some(100.0));
}

#[test]
fn repeated_queries_return_the_same_value() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "svg { font-size: 20px; line-height: 1.5 }");

    let lh = engine.property_index("line-height").unwrap();
    let first = engine.get_computed_style(&doc, svg, None, lh).unwrap();
    let second = engine.get_computed_style(&doc, svg, None, lh).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(as_px(&first), Some(30.0));
}

#[test]
fn relative_values_resolve_against_computed_font_size() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(
        &mut doc,
        svg,
        "svg { font-size: 10px } g { font-size: 2em } rect { width: 3em }",
    );
    let g = doc.append_element(svg, "g");
    let rect = doc.append_element(g, "rect");

    let fs = engine.property_index("font-size").unwrap();
    let width = engine.property_index("width").unwrap();
    let v = engine.get_computed_style(&doc, g, None, fs).unwrap();
    assert_eq!(as_px(&v), Some(20.0), "em font-size resolves against parent");
    let v = engine.get_computed_style(&doc, rect, None, width).unwrap();
    assert_eq!(as_px(&v), Some(60.0), "em length resolves against own font-size");
}

#[test]
fn currentcolor_resolves_through_the_color_property() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(
        &mut doc,
        svg,
        "svg { color: red } rect { background-color: currentcolor }",
    );
    let rect = doc.append_element(svg, "rect");

    let bg = engine.property_index("background-color").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, bg).unwrap();
    assert_eq!(as_color(&v), Some(rgba(255, 0, 0)));
}

#[test]
fn margin_shorthand_expands_to_longhands() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "rect { margin: 1px 2px 3px }");
    let rect = doc.append_element(svg, "rect");

    let top = engine.property_index("margin-top").unwrap();
    let right = engine.property_index("margin-right").unwrap();
    let bottom = engine.property_index("margin-bottom").unwrap();
    let left = engine.property_index("margin-left").unwrap();
    let get = |engine: &mut style_engine::CssEngine, idx| {
        as_px(&engine.get_computed_style(&doc, rect, None, idx).unwrap()).unwrap()
    };
    assert_eq!(get(&mut engine, top), 1.0);
    assert_eq!(get(&mut engine, right), 2.0);
    assert_eq!(get(&mut engine, bottom), 3.0);
    assert_eq!(get(&mut engine, left), 2.0);
}

#[test]
fn unknown_properties_are_dropped_silently() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "rect { foo: bar; color: red }");
    let rect = doc.append_element(svg, "rect");

    let color = engine.property_index("color").unwrap();
    let v = engine.get_computed_style(&doc, rect, None, color).unwrap();
    // The bogus declaration is ignored; the valid one still applies.
    assert_eq!(as_color(&v), Some(rgba(255, 0, 0)));
    assert_eq!(engine.property_index("foo"), None);
}

#[test]
fn presentational_hints_sit_below_author_rules() {
    let settings = EngineSettings {
        presentational_hints: true,
        ..EngineSettings::default()
    };
    let mut engine = engine_with(settings);
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(&mut doc, svg, "rect { width: 30px }");
    let rect = doc.append_element(svg, "rect");
    doc.set_attribute(rect, None, "width", "10px");
    doc.set_attribute(rect, None, "height", "20px");

    let width = engine.property_index("width").unwrap();
    let height = engine.property_index("height").unwrap();
    let sm = engine.get_cascaded_style_map(&doc, rect, None).unwrap();
    assert_eq!(sm.origin(height), Origin::NonCss);
    assert_eq!(sm.origin(width), Origin::Author, "author beats the hint");

    let v = engine.get_computed_style(&doc, rect, None, height).unwrap();
    assert_eq!(as_px(&v), Some(20.0));
    let v = engine.get_computed_style(&doc, rect, None, width).unwrap();
    assert_eq!(as_px(&v), Some(30.0));
}

#[test]
fn pseudo_element_rules_apply_only_to_their_pseudo() {
    let mut engine = new_engine();
    let mut doc = Document::new();
    let svg = doc.append_element(doc.root(), "svg");
    add_style_sheet(
        &mut doc,
        svg,
        "text { color: red } text::first-line { color: blue }",
    );
    let text = doc.append_element(svg, "text");

    let color = engine.property_index("color").unwrap();
    let v = engine.get_computed_style(&doc, text, None, color).unwrap();
    assert_eq!(as_color(&v), Some(rgba(255, 0, 0)));
    let v = engine
        .get_computed_style(&doc, text, Some("first-line"), color)
        .unwrap();
    assert_eq!(as_color(&v), Some(rgba(0, 0, 255)));
}
