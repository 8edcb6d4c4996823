use crate::errors::ErrorCode;
use crate::stylesheet::{CssRule, CssRuleKind, CssStylesheet, DocumentFunction};
use crate::tokenizer::TokenType;
use crate::CssParser;

impl CssParser<'_> {
    pub(crate) fn parse_document_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_document_rule");

        let functions = self.read_document_functions();
        if functions.is_empty() {
            let t = self.tokenizer.lookahead(0);
            self.report(ErrorCode::InvalidToken, t.location);
            self.tokenizer.skip_unknown_rule();
            return None;
        }

        if !self.expect_block_open() {
            return None;
        }

        let children = self.parse_rule_list(sheet);

        let mut rule = CssRule::new(sheet.allocate_id(), CssRuleKind::Document { functions, children });
        rule.adopt_children();
        Some(rule)
    }

    /// Reads comma-separated document matching functions, stopping at the
    /// first token that is not convertible to one
    pub(crate) fn read_document_functions(&mut self) -> Vec<DocumentFunction> {
        log::trace!("read_document_functions");

        let mut functions = Vec::new();

        loop {
            self.consume_whitespace_comments();

            let t = self.tokenizer.lookahead(0);
            let function = match t.token_type {
                TokenType::Url(ref url) => {
                    let url = url.clone();
                    self.tokenizer.consume();
                    DocumentFunction::Url(url)
                }
                TokenType::Function(ref name) => {
                    let Some(function) = self.read_document_function_call(&name.clone()) else {
                        break;
                    };
                    function
                }
                _ => break,
            };

            functions.push(function);

            self.consume_whitespace_comments();
            let t = self.tokenizer.consume();
            if !t.is_comma() {
                self.tokenizer.reconsume();
                break;
            }
        }

        functions
    }

    /// Reads the argument of `url()`, `url-prefix()`, `domain()` or
    /// `regexp()`; None when the function name is not one of those
    fn read_document_function_call(&mut self, name: &str) -> Option<DocumentFunction> {
        let make: fn(String) -> DocumentFunction = if name.eq_ignore_ascii_case("url") {
            DocumentFunction::Url
        } else if name.eq_ignore_ascii_case("url-prefix") {
            DocumentFunction::UrlPrefix
        } else if name.eq_ignore_ascii_case("domain") {
            DocumentFunction::Domain
        } else if name.eq_ignore_ascii_case("regexp") {
            DocumentFunction::Regexp
        } else {
            return None;
        };

        // the function token itself
        self.tokenizer.consume();
        self.consume_whitespace_comments();

        let t = self.tokenizer.consume();
        let argument = match t.token_type {
            // an empty argument list is allowed, e.g. `url-prefix()`
            TokenType::RParen => return Some(make(String::new())),
            TokenType::QuotedString(value) | TokenType::Url(value) | TokenType::Ident(value) => value,
            _ => {
                self.tokenizer.reconsume();
                self.tokenizer.jump_to_closed_arguments();
                return Some(make(String::new()));
            }
        };

        self.expect_closed_arguments();
        Some(make(argument))
    }
}
