//! Streaming, error-tolerant CSS parser.
//!
//! The parser transforms CSS source text into a stylesheet object model
//! following the W3C CSS Syntax Level 3 parsing algorithm with
//! browser-grade permissiveness: unknown tokens are skipped, malformed
//! rules are dropped at their recovery boundary, and parsing never
//! fails on user input. Every recoverable problem is published as a
//! typed error code on the listeners registered in the configuration.

use crate::errors::{ErrorChannel, ErrorCode};
use crate::parser_config::ParserConfig;
use crate::selector_constructor::SelectorConstructor;
use crate::stylesheet::{
    Condition, CssMedium, CssProperty, CssRule, CssSelector, CssStylesheet, CssValue, DeclarationBlock,
    DocumentFunction, KeyframeSelector,
};
use crate::tokenizer::{Tokenizer, TokenType, TokenizerMode};
use crate::value_builder::ValueBuilder;
use coral_shared::cancel::CancelToken;
use coral_shared::errors::{Error, Result};
use coral_shared::text_stream::{Location, Stream, TextStream};
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod errors;
pub mod parser;
pub mod parser_config;
pub mod properties;
pub mod selector_constructor;
pub mod stylesheet;
pub mod tokenizer;
pub mod value_builder;

/// The rule parser: pulls tokens on demand, switches the tokenizer mode
/// per syntactic context and drives the selector constructor and value
/// builder. One instance parses one stream and is not shareable.
pub struct CssParser<'stream> {
    /// The tokenizer is responsible for reading the input stream
    pub(crate) tokenizer: Tokenizer<'stream>,
    pub(crate) selector_constructor: SelectorConstructor,
    pub(crate) value_builder: ValueBuilder,
    /// The parser configuration as given
    pub(crate) config: ParserConfig,
    errors: Rc<ErrorChannel>,
}

impl<'stream> CssParser<'stream> {
    /// Create a new parser over the given stream
    pub fn new(stream: &'stream TextStream, config: ParserConfig) -> Self {
        let errors = Rc::new(ErrorChannel::new(config.listeners.clone()));

        Self {
            tokenizer: Tokenizer::new(stream, config.start_location, Rc::clone(&errors)),
            selector_constructor: SelectorConstructor::new(),
            value_builder: ValueBuilder::new(),
            config,
            errors,
        }
    }

    pub(crate) fn report(&self, code: ErrorCode, location: Location) {
        self.errors.report(code, location);
    }

    /// True when nothing but whitespace and comments remains
    fn at_clean_end(&mut self) -> bool {
        self.tokenizer.lookahead_sc(0).is_eof()
    }
}

/// Parses a complete stylesheet from a string. Total on all inputs:
/// malformed constructs are reported and skipped, never fatal.
pub fn parse_stylesheet(data: &str, config: ParserConfig) -> CssStylesheet {
    let stream = TextStream::from_str(data);
    parse_stylesheet_from_stream(&stream, config)
}

/// Parses a complete stylesheet from an already prefetched stream
pub fn parse_stylesheet_from_stream(stream: &TextStream, config: ParserConfig) -> CssStylesheet {
    let mut sheet = CssStylesheet::new(config.source.clone());
    let mut parser = CssParser::new(stream, config);
    parser.parse_stylesheet_internal(&mut sheet);
    sheet
}

/// Owns a source and parses it at most once; the synchronous and
/// asynchronous entry points share one result handle.
pub struct StylesheetParser {
    config: ParserConfig,
    source: RefCell<Option<TextStream>>,
    /// One-shot latch so the parse kernel runs at most once
    started: AtomicBool,
    result: OnceCell<Rc<CssStylesheet>>,
}

impl StylesheetParser {
    #[must_use]
    pub fn new(source: TextStream, config: ParserConfig) -> Self {
        Self {
            config,
            source: RefCell::new(Some(source)),
            started: AtomicBool::new(false),
            result: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_text(data: &str, config: ParserConfig) -> Self {
        Self::new(TextStream::from_str(data), config)
    }

    /// Runs the parse kernel, or returns the handle of the parse that
    /// already ran on this instance.
    pub fn parse(&self) -> Rc<CssStylesheet> {
        if self.started.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            let source = self.source.borrow_mut().take();
            let sheet = match source {
                Some(mut stream) => {
                    if !stream.closed() {
                        stream.close();
                    }
                    parse_stylesheet_from_stream(&stream, self.config.clone())
                }
                None => CssStylesheet::new(self.config.source.clone()),
            };

            let handle = Rc::new(sheet);
            let _ = self.result.set(Rc::clone(&handle));
            return handle;
        }

        self.result
            .get()
            .cloned()
            .unwrap_or_else(|| Rc::new(CssStylesheet::new(self.config.source.clone())))
    }

    /// Awaits the source prefetch, then runs the synchronous kernel.
    /// Cancellation is observed only before the prefetch returns; a
    /// canceled parse produces no rules at all.
    pub async fn parse_async(&self, cancel: CancelToken) -> Result<Rc<CssStylesheet>> {
        if let Some(result) = self.result.get() {
            return Ok(Rc::clone(result));
        }

        let source = self.source.borrow_mut().take();
        if let Some(mut stream) = source {
            let prefetched = stream.prefetch_all(&cancel).await;
            *self.source.borrow_mut() = Some(stream);
            prefetched?;
        }

        Ok(self.parse())
    }
}

/// Parses a single selector; None when the text is empty or invalid
pub fn parse_selector(data: &str) -> Option<CssSelector> {
    let stream = TextStream::from_str(data);
    let mut parser = CssParser::new(&stream, ParserConfig::default());

    parser.tokenizer.set_mode(TokenizerMode::Selector);
    loop {
        let t = parser.tokenizer.consume();
        if t.is_eof() {
            break;
        }
        parser.selector_constructor.apply(&t);
    }

    if !parser.selector_constructor.is_valid() {
        return None;
    }

    parser.selector_constructor.result()
}

/// Parses a single value; None when no value is found or tokens remain
pub fn parse_value(data: &str, config: ParserConfig) -> Option<CssValue> {
    let stream = TextStream::from_str(data);
    let mut parser = CssParser::new(&stream, config);

    let value = parser.read_value(false);
    if !parser.at_clean_end() {
        return None;
    }

    value
}

/// Parses a single rule (style rule or at-rule); None when the rule is
/// malformed or tokens remain after it
pub fn parse_rule(data: &str, config: ParserConfig) -> Option<CssRule> {
    let stream = TextStream::from_str(data);
    let mut sheet = CssStylesheet::new(None);
    let mut parser = CssParser::new(&stream, config);

    parser.consume_whitespace_comments();

    let t = parser.tokenizer.lookahead(0);
    let rule = match t.token_type {
        TokenType::Eof => None,
        TokenType::AtKeyword(_) => parser.parse_at_rule(&mut sheet),
        _ => parser.parse_style_rule(&mut sheet),
    }?;

    if !parser.at_clean_end() {
        return None;
    }

    Some(rule)
}

/// Parses a single declaration; None when it is malformed or tokens
/// remain after it
pub fn parse_declaration(data: &str, config: ParserConfig) -> Option<CssProperty> {
    let stream = TextStream::from_str(data);
    let mut parser = CssParser::new(&stream, config);

    let mut block = DeclarationBlock::new();
    parser.consume_whitespace_comments();
    parser.read_declaration(&mut block);

    if !parser.at_clean_end() {
        return None;
    }

    let result = block.iter().next().cloned();
    result
}

/// Parses a brace-less declaration list, e.g. an HTML style attribute
pub fn parse_declarations(data: &str, config: ParserConfig) -> DeclarationBlock {
    let stream = TextStream::from_str(data);
    let mut parser = CssParser::new(&stream, config);

    parser.parse_declaration_block()
}

/// Parses a media list. Strict: fails with a syntax error when the list
/// is unparseable or tokens remain.
pub fn parse_media_list(data: &str, config: ParserConfig) -> std::result::Result<Vec<CssMedium>, Error> {
    let stream = TextStream::from_str(data);
    let mut parser = CssParser::new(&stream, config);

    let media = parser.read_media_list().map_err(|e| Error::Syntax(e.to_string()))?;

    if !parser.at_clean_end() {
        return Err(Error::Syntax("trailing input after media list".to_string()));
    }

    Ok(media)
}

/// Parses a single medium. Strict: fails with a syntax error when the
/// medium is unparseable, empty, or tokens remain.
pub fn parse_medium(data: &str, config: ParserConfig) -> std::result::Result<CssMedium, Error> {
    let stream = TextStream::from_str(data);
    let mut parser = CssParser::new(&stream, config);

    let medium = parser.read_medium().map_err(|e| Error::Syntax(e.to_string()))?;
    if medium.is_empty() {
        return Err(Error::Syntax("empty medium".to_string()));
    }

    if !parser.at_clean_end() {
        return Err(Error::Syntax("trailing input after medium".to_string()));
    }

    Ok(medium)
}

/// Parses a supports condition; None on failure or leftover tokens
pub fn parse_condition(data: &str, config: ParserConfig) -> Option<Condition> {
    let stream = TextStream::from_str(data);
    let mut parser = CssParser::new(&stream, config);

    let condition = parser.read_condition().ok()?;
    if !parser.at_clean_end() {
        return None;
    }

    Some(condition)
}

/// Parses a document function list; None when no function is found or
/// tokens remain
pub fn parse_document_rules(data: &str, config: ParserConfig) -> Option<Vec<DocumentFunction>> {
    let stream = TextStream::from_str(data);
    let mut parser = CssParser::new(&stream, config);

    let functions = parser.read_document_functions();
    if functions.is_empty() || !parser.at_clean_end() {
        return None;
    }

    Some(functions)
}

/// Parses a keyframe stop list; None on failure or leftover tokens
pub fn parse_keyframe_selector(data: &str, config: ParserConfig) -> Option<KeyframeSelector> {
    let stream = TextStream::from_str(data);
    let mut parser = CssParser::new(&stream, config);

    let selector = parser.read_keyframe_selector().ok()?;
    if !parser.at_clean_end() {
        return None;
    }

    Some(selector)
}

/// Parses a single keyframe rule; None on failure or leftover tokens
pub fn parse_keyframe_rule(data: &str, config: ParserConfig) -> Option<CssRule> {
    let stream = TextStream::from_str(data);
    let mut sheet = CssStylesheet::new(None);
    let mut parser = CssParser::new(&stream, config);

    let rule = parser.parse_keyframe_rule_internal(&mut sheet)?;
    if !parser.at_clean_end() {
        return None;
    }

    Some(rule)
}
