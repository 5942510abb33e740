//! The cascade assembler: builds a fresh style map for an element by
//! applying the style sources in origin order.

use crate::matching::{selector_matches, MatchContext};
use crate::property::ParseContext;
use crate::style_map::{Origin, StyleMap};
use crate::CssEngine;
use css::selector::Specificity;
use css::{CssError, DocumentHandler, LexicalUnit, MediaList, Rule, StyleRule};
use dom::{Document, NodeId};
use std::sync::Arc;

impl CssEngine {
    /// Build the cascaded style map of an element (or one of its
    /// pseudo-elements): user-agent sheet, user sheet, presentational
    /// hints, document sheets, then the inline style attribute.
    pub fn get_cascaded_style_map(
        &mut self,
        doc: &Document,
        element: NodeId,
        pseudo: Option<&str>,
    ) -> Result<StyleMap, CssError> {
        self.ensure_style_sheet_nodes(doc)?;

        let mut result = StyleMap::new(self.number_of_properties());
        let mcx = self.match_context();

        if let Some(sheet) = &self.user_agent_sheet {
            let mut rules = Vec::new();
            collect_matching_rules(&mut rules, &sheet.rules, &self.media, doc, element, pseudo, &mcx);
            sort_rules(&mut rules, doc, element, pseudo, &mcx);
            for rule in &rules {
                for entry in rule.declaration.iter() {
                    result.put_sorted(entry.index, entry.value.clone(), entry.important, Origin::UserAgent);
                }
            }
        }

        if let Some(sheet) = &self.user_sheet {
            let mut rules = Vec::new();
            collect_matching_rules(&mut rules, &sheet.rules, &self.media, doc, element, pseudo, &mcx);
            sort_rules(&mut rules, doc, element, pseudo, &mcx);
            for rule in &rules {
                for entry in rule.declaration.iter() {
                    result.put_sorted(entry.index, entry.value.clone(), entry.important, Origin::User);
                }
            }
        }

        self.apply_presentational_hints(doc, element, &mut result)?;

        // Document sheets, filtered by the alternate-title predicate and
        // their own media scope, cascade together in one specificity sort.
        let sheets: Vec<Arc<css::StyleSheet>> = self
            .style_sheet_nodes
            .as_ref()
            .map(|nodes| nodes.iter().map(|d| d.sheet.clone()).collect())
            .unwrap_or_default();
        if !sheets.is_empty() {
            let mut rules = Vec::new();
            for sheet in &sheets {
                let selected = !sheet.alternate
                    || sheet.title.is_none()
                    || sheet.title.as_deref() == self.alternate_style_sheet.as_deref();
                if selected && self.media.matches(&sheet.media) {
                    collect_matching_rules(&mut rules, &sheet.rules, &self.media, doc, element, pseudo, &mcx);
                }
            }
            sort_rules(&mut rules, doc, element, pseudo, &mcx);
            for rule in &rules {
                for entry in rule.declaration.iter() {
                    result.put_author_property(entry.index, entry.value.clone(), entry.important, Origin::Author);
                }
            }
        }

        self.apply_inline_style(doc, element, &mut result)?;

        Ok(result)
    }

    /// Install XML attributes recognised as presentational hints at the
    /// non-CSS origin.
    fn apply_presentational_hints(
        &self,
        doc: &Document,
        element: NodeId,
        result: &mut StyleMap,
    ) -> Result<(), CssError> {
        let Some(hints) = &self.non_css_hints else {
            return Ok(());
        };
        let hints_ns = self.settings.hints_ns.as_deref();
        let uri = self.document_uri_string();
        let pcx = ParseContext {
            base_uri: self.settings.document_uri.as_ref(),
        };
        for attr in doc.attributes(element) {
            if attr.ns.as_deref() != hints_ns {
                continue;
            }
            let name = attr.local.to_ascii_lowercase();
            if !hints.contains(&name) {
                continue;
            }
            let Some(idx) = self.property_index(&name) else {
                continue;
            };
            let units = self
                .parser
                .parse_property_value(&attr.value)
                .map_err(|e| e.into_syntax(&uri, &name, &attr.value))?;
            let value = self.value_managers[idx]
                .create_value(&units, &pcx)
                .map_err(|e| e.into_syntax(&uri, &name, &attr.value))?;
            result.put_author_property(idx, Arc::new(value), false, Origin::NonCss);
        }
        Ok(())
    }

    /// Parse the element's style attribute into the map at the
    /// inline-author origin.
    fn apply_inline_style(
        &self,
        doc: &Document,
        element: NodeId,
        result: &mut StyleMap,
    ) -> Result<(), CssError> {
        let Some(local) = self.settings.style_attr_local.as_deref() else {
            return Ok(());
        };
        let ns = self.settings.style_attr_ns.as_deref();
        let Some(text) = doc.attribute(element, ns, local) else {
            return Ok(());
        };
        if text.is_empty() {
            return Ok(());
        }
        let text = text.to_string();
        let mut writer = StyleMapWriter {
            engine: self,
            map: result,
            origin: Origin::InlineAuthor,
        };
        self.parser
            .parse_style_declaration(&text, &mut writer)
            .map_err(|e| e.into_syntax(&self.document_uri_string(), local, &text))
    }
}

/// Writes parsed declarations into a style map under the author rule; used
/// for the inline style attribute during cascade.
struct StyleMapWriter<'e, 'm> {
    engine: &'e CssEngine,
    map: &'m mut StyleMap,
    origin: Origin,
}

impl DocumentHandler for StyleMapWriter<'_, '_> {
    fn property(
        &mut self,
        name: &str,
        value: &[LexicalUnit],
        important: bool,
    ) -> Result<(), CssError> {
        let pcx = ParseContext {
            base_uri: self.engine.settings.document_uri.as_ref(),
        };
        let map = &mut *self.map;
        let origin = self.origin;
        self.engine
            .dispatch_property(name, value, important, &pcx, &mut |idx, v, imp| {
                map.put_author_property(idx, v, imp, origin);
                Ok(())
            })
    }
}

/// Collect the style rules matching the element, descending into media and
/// import rules whose media scope matches the engine media.
fn collect_matching_rules<'a>(
    out: &mut Vec<&'a StyleRule>,
    rules: &'a [Rule],
    media: &MediaList,
    doc: &Document,
    element: NodeId,
    pseudo: Option<&str>,
    mcx: &MatchContext<'_>,
) {
    for rule in rules {
        match rule {
            Rule::Style(sr) => {
                if sr
                    .selectors
                    .0
                    .iter()
                    .any(|s| selector_matches(doc, element, pseudo, s, mcx))
                {
                    out.push(sr);
                }
            }
            Rule::Media(mr) => {
                if media.matches(&mr.media) {
                    collect_matching_rules(out, &mr.rules, media, doc, element, pseudo, mcx);
                }
            }
            Rule::Import(ir) => {
                if media.matches(&ir.media) {
                    collect_matching_rules(out, &ir.rules, media, doc, element, pseudo, mcx);
                }
            }
        }
    }
}

/// Stable ascending sort by the largest specificity among a rule's matching
/// selectors; ties keep source order, so later rules win on equal
/// specificity.
fn sort_rules(
    rules: &mut [&StyleRule],
    doc: &Document,
    element: NodeId,
    pseudo: Option<&str>,
    mcx: &MatchContext<'_>,
) {
    rules.sort_by_key(|rule| {
        rule.selectors
            .0
            .iter()
            .filter(|s| selector_matches(doc, element, pseudo, s, mcx))
            .map(|s| s.specificity)
            .max()
            .unwrap_or(Specificity(0))
    });
}
