//! SAX-shaped CSS parser built on the `cssparser` tokenizer.
//!
//! The parser walks the source and reports structure through a
//! `DocumentHandler`; it never builds a stylesheet itself. Values are
//! reported as slices of `LexicalUnit`, which is what value managers
//! consume.

use crate::error::CssError;
use crate::selector::SelectorList;
use crate::types::MediaList;
use cssparser::{ParseError, Parser, ParserInput, SourcePosition, Token};

/// One parsed component value.
#[derive(Debug, Clone, PartialEq)]
pub enum LexicalUnit {
    Ident(String),
    StringLit(String),
    Number(f32),
    /// Percentage magnitude, e.g. `50.0` for `50%`.
    Percentage(f32),
    Dimension { value: f32, unit: String },
    /// Hex color digits, without the leading `#`.
    HexColor(String),
    Uri(String),
    Function { name: String, args: Vec<LexicalUnit> },
    Comma,
}

/// Callbacks driven by the parser. The engine implements this three ways:
/// a stylesheet builder, a style-declaration builder and a style-map writer.
pub trait DocumentHandler {
    fn start_document(&mut self) {}
    fn end_document(&mut self) {}
    fn comment(&mut self, _text: &str) {}
    fn import_style(&mut self, _uri: &str, _media: &MediaList) {}
    fn start_media(&mut self, _media: &MediaList) {}
    fn end_media(&mut self, _media: &MediaList) {}
    fn start_selector(&mut self, _selectors: SelectorList) {}
    fn end_selector(&mut self) {}
    fn property(&mut self, name: &str, value: &[LexicalUnit], important: bool)
        -> Result<(), CssError>;
}

#[derive(Debug, Default)]
pub struct CssParser;

impl CssParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a full stylesheet, reporting rules through the handler.
    pub fn parse_style_sheet(
        &self,
        text: &str,
        handler: &mut dyn DocumentHandler,
    ) -> Result<(), CssError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        handler.start_document();
        self.parse_rule_list(&mut parser, handler)?;
        handler.end_document();
        Ok(())
    }

    /// Parse the contents of a style attribute.
    pub fn parse_style_declaration(
        &self,
        text: &str,
        handler: &mut dyn DocumentHandler,
    ) -> Result<(), CssError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        self.parse_declaration_items(&mut parser, handler)
    }

    /// Parse a single property value into lexical units.
    pub fn parse_property_value(&self, text: &str) -> Result<Vec<LexicalUnit>, CssError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let (units, important) = self.parse_value_units(&mut parser)?;
        if important {
            return Err(CssError::parse("'!important' not allowed in a property value"));
        }
        Ok(units)
    }

    /// Parse a media list, e.g. `"screen, print"`. An empty string yields an
    /// empty (match-all) list.
    pub fn parse_media(&self, text: &str) -> Result<MediaList, CssError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let mut items: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        loop {
            let token = match parser.next() {
                Ok(t) => t.clone(),
                Err(_) => break,
            };
            match token {
                Token::Ident(s) => current.push(s.to_string()),
                Token::Comma => {
                    if current.is_empty() {
                        return Err(CssError::parse("empty media query"));
                    }
                    items.push(current.join(" "));
                    current.clear();
                }
                other => {
                    return Err(CssError::parse(format!(
                        "unexpected {other:?} in media list"
                    )))
                }
            }
        }
        if !current.is_empty() {
            items.push(current.join(" "));
        } else if !items.is_empty() {
            return Err(CssError::parse("trailing comma in media list"));
        }
        Ok(MediaList(items))
    }

    fn parse_rule_list<'i, 't>(
        &self,
        parser: &mut Parser<'i, 't>,
        handler: &mut dyn DocumentHandler,
    ) -> Result<(), CssError> {
        loop {
            let start = parser.position();
            let token = match parser.next_including_whitespace_and_comments() {
                Ok(t) => t.clone(),
                Err(_) => break,
            };
            match token {
                Token::WhiteSpace(_) => continue,
                Token::Comment(text) => {
                    handler.comment(text);
                }
                Token::AtKeyword(name) => {
                    let name = name.to_ascii_lowercase();
                    match name.as_str() {
                        "import" => self.parse_import_rule(parser, handler)?,
                        "media" => self.parse_media_rule(parser, handler)?,
                        // @page, @font-face, @charset, ...: recognised, skipped.
                        _ => skip_at_rule(parser),
                    }
                }
                Token::CurlyBracketBlock => {
                    // Block with no prelude: drop it.
                    consume_block(parser);
                }
                first => self.parse_style_rule(parser, handler, start, first)?,
            }
        }
        Ok(())
    }

    fn parse_style_rule<'i, 't>(
        &self,
        parser: &mut Parser<'i, 't>,
        handler: &mut dyn DocumentHandler,
        start: SourcePosition,
        first: Token<'i>,
    ) -> Result<(), CssError> {
        // If the first prelude token opened a block, consume it so the
        // selector slice spans the whole bracketed text.
        match first {
            Token::SquareBracketBlock | Token::ParenthesisBlock | Token::Function(_) => {
                consume_block(parser);
            }
            _ => {}
        }
        let mut prelude_end = parser.position();
        loop {
            let token = match parser.next_including_whitespace() {
                Ok(t) => t.clone(),
                Err(_) => {
                    return Err(CssError::parse("unexpected end of stylesheet in selector"))
                }
            };
            match token {
                Token::CurlyBracketBlock => break,
                Token::SquareBracketBlock | Token::ParenthesisBlock | Token::Function(_) => {
                    consume_block(parser);
                    prelude_end = parser.position();
                }
                _ => {
                    prelude_end = parser.position();
                }
            }
        }
        let selector_text = parser.slice(start..prelude_end).trim().to_string();
        match SelectorList::parse(&selector_text) {
            Ok(selectors) => {
                handler.start_selector(selectors);
                let result = self.parse_declaration_block(parser, handler);
                handler.end_selector();
                result
            }
            Err(err) => {
                log::warn!("dropping rule with unsupported selector {selector_text:?}: {err}");
                consume_block(parser);
                Ok(())
            }
        }
    }

    fn parse_declaration_block<'i, 't>(
        &self,
        parser: &mut Parser<'i, 't>,
        handler: &mut dyn DocumentHandler,
    ) -> Result<(), CssError> {
        let mut out: Result<(), CssError> = Ok(());
        let _ = parser.parse_nested_block(|p| -> Result<(), ParseError<'i, ()>> {
            out = self.parse_declaration_items(p, &mut *handler);
            Ok(())
        });
        out
    }

    fn parse_declaration_items<'i, 't>(
        &self,
        parser: &mut Parser<'i, 't>,
        handler: &mut dyn DocumentHandler,
    ) -> Result<(), CssError> {
        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }
            // Tolerate stray semicolons between declarations.
            if parser.try_parse(|p| p.expect_semicolon()).is_ok() {
                continue;
            }
            let name = match parser.expect_ident() {
                Ok(n) => n.to_string(),
                Err(_) => return Err(CssError::parse("expected property name")),
            };
            if parser.expect_colon().is_err() {
                return Err(CssError::parse(format!("expected ':' after {name:?}")));
            }
            let (units, important) = self.parse_value_units(parser)?;
            handler.property(&name, &units, important)?;
        }
        Ok(())
    }

    /// Collect lexical units until a semicolon or the end of the current
    /// block, splitting off a trailing `!important`.
    fn parse_value_units<'i, 't>(
        &self,
        parser: &mut Parser<'i, 't>,
    ) -> Result<(Vec<LexicalUnit>, bool), CssError> {
        let mut units = Vec::new();
        let mut important = false;
        loop {
            let token = match parser.next() {
                Ok(t) => t.clone(),
                Err(_) => break,
            };
            match token {
                Token::Semicolon => break,
                Token::Delim('!') => match parser.expect_ident() {
                    Ok(id) if id.eq_ignore_ascii_case("important") => important = true,
                    _ => return Err(CssError::parse("expected 'important' after '!'")),
                },
                other => units.push(self.lexical_unit(parser, other)?),
            }
        }
        if units.is_empty() {
            return Err(CssError::parse("empty property value"));
        }
        Ok((units, important))
    }

    fn lexical_unit<'i, 't>(
        &self,
        parser: &mut Parser<'i, 't>,
        token: Token<'i>,
    ) -> Result<LexicalUnit, CssError> {
        let unit = match token {
            Token::Ident(s) => LexicalUnit::Ident(s.to_string()),
            Token::QuotedString(s) => LexicalUnit::StringLit(s.to_string()),
            Token::Number { value, .. } => LexicalUnit::Number(value),
            Token::Percentage { unit_value, .. } => LexicalUnit::Percentage(unit_value * 100.0),
            Token::Dimension { value, unit, .. } => LexicalUnit::Dimension {
                value,
                unit: unit.to_string(),
            },
            Token::Hash(s) | Token::IDHash(s) => LexicalUnit::HexColor(s.to_string()),
            Token::UnquotedUrl(s) => LexicalUnit::Uri(s.to_string()),
            Token::Comma => LexicalUnit::Comma,
            Token::Function(name) => {
                let name = name.to_string();
                let args = self.function_args(parser)?;
                if name.eq_ignore_ascii_case("url") {
                    match args.as_slice() {
                        [LexicalUnit::StringLit(s)] => LexicalUnit::Uri(s.clone()),
                        _ => LexicalUnit::Function { name, args },
                    }
                } else {
                    LexicalUnit::Function { name, args }
                }
            }
            other => {
                return Err(CssError::parse(format!(
                    "unexpected token {other:?} in property value"
                )))
            }
        };
        Ok(unit)
    }

    fn function_args<'i, 't>(
        &self,
        parser: &mut Parser<'i, 't>,
    ) -> Result<Vec<LexicalUnit>, CssError> {
        let mut failure: Option<CssError> = None;
        let args = parser
            .parse_nested_block(|p| -> Result<Vec<LexicalUnit>, ParseError<'i, ()>> {
                let mut units = Vec::new();
                loop {
                    let token = match p.next() {
                        Ok(t) => t.clone(),
                        Err(_) => break,
                    };
                    match self.lexical_unit(p, token) {
                        Ok(u) => units.push(u),
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                Ok(units)
            })
            .unwrap_or_default();
        match failure {
            Some(e) => Err(e),
            None => Ok(args),
        }
    }

    fn parse_import_rule<'i, 't>(
        &self,
        parser: &mut Parser<'i, 't>,
        handler: &mut dyn DocumentHandler,
    ) -> Result<(), CssError> {
        let token = match parser.next() {
            Ok(t) => t.clone(),
            Err(_) => return Err(CssError::parse("@import without a URI")),
        };
        let uri = match token {
            Token::UnquotedUrl(s) => s.to_string(),
            Token::QuotedString(s) => s.to_string(),
            Token::Function(name) if name.eq_ignore_ascii_case("url") => {
                let mut inner: Option<String> = None;
                let _ = parser.parse_nested_block(|p| -> Result<(), ParseError<'i, ()>> {
                    if let Ok(t) = p.next() {
                        match t {
                            Token::QuotedString(s) | Token::Ident(s) => {
                                inner = Some(s.to_string());
                            }
                            Token::UnquotedUrl(s) => inner = Some(s.to_string()),
                            _ => {}
                        }
                    }
                    Ok(())
                });
                match inner {
                    Some(u) => u,
                    None => return Err(CssError::parse("malformed url() in @import")),
                }
            }
            other => {
                return Err(CssError::parse(format!("unexpected {other:?} in @import")))
            }
        };
        let mut media = Vec::new();
        loop {
            let token = match parser.next() {
                Ok(t) => t.clone(),
                Err(_) => break,
            };
            match token {
                Token::Semicolon => break,
                Token::Ident(s) => media.push(s.to_string()),
                Token::Comma => {}
                _ => {}
            }
        }
        handler.import_style(&uri, &MediaList(media));
        Ok(())
    }

    fn parse_media_rule<'i, 't>(
        &self,
        parser: &mut Parser<'i, 't>,
        handler: &mut dyn DocumentHandler,
    ) -> Result<(), CssError> {
        let mut media = Vec::new();
        loop {
            let token = match parser.next() {
                Ok(t) => t.clone(),
                Err(_) => return Err(CssError::parse("unterminated @media rule")),
            };
            match token {
                Token::CurlyBracketBlock => break,
                Token::Ident(s) => media.push(s.to_string()),
                Token::Comma => {}
                // Media-query syntax beyond plain type lists is ignored.
                _ => {}
            }
        }
        let media = MediaList(media);
        handler.start_media(&media);
        let mut out: Result<(), CssError> = Ok(());
        let _ = parser.parse_nested_block(|p| -> Result<(), ParseError<'i, ()>> {
            out = self.parse_rule_list(p, &mut *handler);
            Ok(())
        });
        handler.end_media(&media);
        out
    }
}

fn skip_at_rule<'i, 't>(parser: &mut Parser<'i, 't>) {
    loop {
        let token = match parser.next() {
            Ok(t) => t.clone(),
            Err(_) => return,
        };
        match token {
            Token::Semicolon => return,
            Token::CurlyBracketBlock => {
                consume_block(parser);
                return;
            }
            Token::SquareBracketBlock | Token::ParenthesisBlock | Token::Function(_) => {
                consume_block(parser);
            }
            _ => {}
        }
    }
}

fn consume_block<'i, 't>(parser: &mut Parser<'i, 't>) {
    let _ = parser.parse_nested_block(|p| -> Result<(), ParseError<'i, ()>> {
        while p.next().is_ok() {}
        Ok(())
    });
}
