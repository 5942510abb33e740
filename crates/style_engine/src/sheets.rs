//! Stylesheet parsing entry points, `@import` resolution and the document
//! stylesheet-node cache.

use crate::property::ParseContext;
use crate::{CssEngine, DocumentSheet};
use css::selector::SelectorList;
use css::{
    CssError, DocumentHandler, ImportRule, LexicalUnit, MediaList, MediaRule, Rule,
    StyleDeclaration, StyleRule, StyleSheet, Value,
};
use dom::{Document, NodeId};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

impl CssEngine {
    /// Parse a stylesheet from text, resolving its leading `@import` rules
    /// through the context hooks.
    pub fn parse_style_sheet(
        &self,
        text: &str,
        uri: Option<&Url>,
        media: &str,
    ) -> Result<StyleSheet, CssError> {
        let media = self
            .parser
            .parse_media(media)
            .map_err(|e| e.into_syntax(&self.document_uri_string(), "media", media))?;
        let mut sheet = StyleSheet {
            media,
            uri: uri.cloned(),
            ..StyleSheet::default()
        };
        self.fill_style_sheet(&mut sheet, text)?;
        self.load_imports(&mut sheet.rules)?;
        Ok(sheet)
    }

    /// Fetch and parse a stylesheet at `url`: the security hook decides
    /// whether the load is allowed, the loader produces the text.
    pub fn load_style_sheet(&self, url: &Url, media: &str) -> Result<StyleSheet, CssError> {
        self.context
            .check_load_external_resource(url, self.settings.document_uri.as_ref())?;
        let text = self.context.load_style_sheet(url)?;
        self.parse_style_sheet(&text, Some(url), media)
    }

    /// Parse the text of a style attribute into a declaration list.
    pub fn parse_style_declaration(&self, text: &str) -> Result<StyleDeclaration, CssError> {
        let mut builder = StyleDeclarationBuilder {
            engine: self,
            declaration: StyleDeclaration::new(),
        };
        self.parser
            .parse_style_declaration(text, &mut builder)
            .map_err(|e| e.into_syntax(&self.document_uri_string(), "style declaration", text))?;
        Ok(builder.declaration)
    }

    /// Parse a single property value by name.
    pub fn parse_property_value(&self, name: &str, text: &str) -> Result<Arc<Value>, CssError> {
        let uri = self.document_uri_string();
        let Some(idx) = self.property_index(name) else {
            return Err(CssError::Syntax {
                uri,
                subject: name.to_string(),
                source_text: text.to_string(),
                message: "unknown property".to_string(),
            });
        };
        let units = self
            .parser
            .parse_property_value(text)
            .map_err(|e| e.into_syntax(&uri, name, text))?;
        let pcx = ParseContext {
            base_uri: self.settings.document_uri.as_ref(),
        };
        let value = self.value_managers[idx]
            .create_value(&units, &pcx)
            .map_err(|e| e.into_syntax(&uri, name, text))?;
        Ok(Arc::new(value))
    }

    fn fill_style_sheet(&self, sheet: &mut StyleSheet, text: &str) -> Result<(), CssError> {
        let mut builder = StyleSheetBuilder {
            engine: self,
            base_uri: sheet.uri.clone(),
            stack: vec![Vec::new()],
            current: None,
        };
        self.parser.parse_style_sheet(text, &mut builder).map_err(|e| {
            let uri = sheet
                .uri
                .as_ref()
                .map_or_else(|| self.document_uri_string(), Url::to_string);
            e.into_syntax(&uri, "stylesheet", text)
        })?;
        sheet.rules = builder.finish();
        Ok(())
    }

    /// Resolve the leading run of `@import` rules; later imports are left
    /// unresolved and therefore inert.
    fn load_imports(&self, rules: &mut Vec<Rule>) -> Result<(), CssError> {
        for rule in rules.iter_mut() {
            let Rule::Import(ir) = rule else {
                break;
            };
            let Some(url) = ir.uri.clone() else {
                continue;
            };
            self.context
                .check_load_external_resource(&url, self.settings.document_uri.as_ref())?;
            let text = self.context.load_style_sheet(&url)?;
            let mut sub = StyleSheet {
                media: ir.media.clone(),
                uri: Some(url),
                ..StyleSheet::default()
            };
            self.fill_style_sheet(&mut sub, &text)?;
            self.load_imports(&mut sub.rules)?;
            ir.rules = sub.rules;
        }
        Ok(())
    }

    // Document sheet cache -----------------------------------------------

    /// Find, parse and cache every stylesheet-carrier node, and rebuild the
    /// set of attribute names the active selectors depend on.
    pub(crate) fn ensure_style_sheet_nodes(&mut self, doc: &Document) -> Result<(), CssError> {
        if self.style_sheet_nodes.is_some() {
            return Ok(());
        }
        let mut carriers = Vec::new();
        collect_carriers(doc, doc.root(), &mut carriers);

        let doc_uri = self.settings.document_uri.clone();
        let mut sheets = Vec::new();
        for node in carriers {
            let Some(info) = doc.element(node).and_then(|e| e.style_sheet.clone()) else {
                continue;
            };
            let text = doc.text_content(node);
            let mut sheet = self.parse_style_sheet(&text, doc_uri.as_ref(), &info.media)?;
            sheet.title = info.title;
            sheet.alternate = info.alternate;
            sheets.push(DocumentSheet {
                node,
                sheet: Arc::new(sheet),
            });
        }

        let mut attrs = HashSet::new();
        for ds in &sheets {
            self.find_selector_attributes(&mut attrs, &ds.sheet.rules);
        }
        log::info!(
            "rebuilt stylesheet-node cache: {} sheets, {} selector attributes",
            sheets.len(),
            attrs.len()
        );
        self.selector_attributes = attrs;
        self.style_sheet_nodes = Some(sheets);
        Ok(())
    }

    fn find_selector_attributes(&self, attrs: &mut HashSet<String>, rules: &[Rule]) {
        for rule in rules {
            match rule {
                Rule::Style(sr) => {
                    for sel in &sr.selectors.0 {
                        sel.add_attribute_names(attrs, &self.settings.class_attr_local);
                    }
                }
                Rule::Media(mr) => {
                    if self.media.matches(&mr.media) {
                        self.find_selector_attributes(attrs, &mr.rules);
                    }
                }
                Rule::Import(ir) => {
                    if self.media.matches(&ir.media) {
                        self.find_selector_attributes(attrs, &ir.rules);
                    }
                }
            }
        }
    }
}

fn collect_carriers(doc: &Document, node: NodeId, out: &mut Vec<NodeId>) {
    if doc.is_style_sheet_carrier(node) {
        out.push(node);
    }
    for child in doc.children(node) {
        collect_carriers(doc, child, out);
    }
}

/// Builds the rule tree of a stylesheet from parser callbacks.
struct StyleSheetBuilder<'e> {
    engine: &'e CssEngine,
    base_uri: Option<Url>,
    /// Rule-list stack; media rules push a level.
    stack: Vec<Vec<Rule>>,
    current: Option<StyleRule>,
}

impl StyleSheetBuilder<'_> {
    fn finish(mut self) -> Vec<Rule> {
        self.stack.drain(..).next().unwrap_or_default()
    }

    fn push_rule(&mut self, rule: Rule) {
        if let Some(top) = self.stack.last_mut() {
            top.push(rule);
        }
    }
}

impl DocumentHandler for StyleSheetBuilder<'_> {
    fn import_style(&mut self, uri: &str, media: &MediaList) {
        let resolved = match &self.base_uri {
            Some(base) => base.join(uri).ok(),
            None => Url::parse(uri).ok(),
        };
        if resolved.is_none() {
            log::warn!("dropping @import with unresolvable URI {uri:?}");
        }
        self.push_rule(Rule::Import(ImportRule {
            media: media.clone(),
            uri: resolved,
            rules: Vec::new(),
        }));
    }

    fn start_media(&mut self, _media: &MediaList) {
        self.stack.push(Vec::new());
    }

    fn end_media(&mut self, media: &MediaList) {
        if self.stack.len() < 2 {
            return;
        }
        let rules = self.stack.pop().unwrap_or_default();
        self.push_rule(Rule::Media(MediaRule {
            media: media.clone(),
            rules,
        }));
    }

    fn start_selector(&mut self, selectors: SelectorList) {
        self.current = Some(StyleRule {
            selectors,
            declaration: StyleDeclaration::new(),
        });
    }

    fn end_selector(&mut self) {
        if let Some(rule) = self.current.take() {
            self.push_rule(Rule::Style(rule));
        }
    }

    fn property(
        &mut self,
        name: &str,
        value: &[LexicalUnit],
        important: bool,
    ) -> Result<(), CssError> {
        let Some(rule) = self.current.as_mut() else {
            return Ok(());
        };
        let pcx = ParseContext {
            base_uri: self.base_uri.as_ref(),
        };
        let decl = &mut rule.declaration;
        self.engine
            .dispatch_property(name, value, important, &pcx, &mut |idx, v, imp| {
                decl.append(v, idx, imp);
                Ok(())
            })
    }
}

/// Builds a standalone `StyleDeclaration` from parser callbacks.
struct StyleDeclarationBuilder<'e> {
    engine: &'e CssEngine,
    declaration: StyleDeclaration,
}

impl DocumentHandler for StyleDeclarationBuilder<'_> {
    fn property(
        &mut self,
        name: &str,
        value: &[LexicalUnit],
        important: bool,
    ) -> Result<(), CssError> {
        let pcx = ParseContext {
            base_uri: self.engine.settings.document_uri.as_ref(),
        };
        let decl = &mut self.declaration;
        self.engine
            .dispatch_property(name, value, important, &pcx, &mut |idx, v, imp| {
                decl.append(v, idx, imp);
                Ok(())
            })
    }
}
