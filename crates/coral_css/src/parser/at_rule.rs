use crate::errors::ErrorCode;
use crate::stylesheet::{CssRule, CssRuleKind, CssStylesheet};
use crate::tokenizer::TokenType;
use crate::CssParser;
use coral_shared::errors::{CssError, CssResult};
use cow_utils::CowUtils;
use lazy_static::lazy_static;

mod charset;
mod document;
mod font_face;
mod import;
mod keyframes;
mod media;
mod namespace;
mod page;
mod supports;

lazy_static! {
    static ref VENDOR_PREFIXES: Vec<&'static str> = vec!["-webkit-", "-moz-", "-ms-", "-o-"];
}

/// `@-webkit-keyframes` and friends dispatch like their unprefixed form
fn strip_vendor_prefix(name: &str) -> &str {
    for prefix in VENDOR_PREFIXES.iter() {
        if let Some(stripped) = name.strip_prefix(prefix) {
            return stripped;
        }
    }

    name
}

impl CssParser<'_> {
    /// Dispatches on the at-keyword. Unknown keywords produce an
    /// `UnknownAt` rule with the prelude preserved and the body skipped.
    pub(crate) fn parse_at_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_at_rule");

        let t = self.tokenizer.consume();
        let TokenType::AtKeyword(keyword) = t.token_type else {
            self.report(ErrorCode::InvalidToken, t.location);
            self.tokenizer.skip_unknown_rule();
            return None;
        };

        self.consume_whitespace_comments();

        let lower = keyword.cow_to_ascii_lowercase();
        let stripped = strip_vendor_prefix(&lower);

        match (&*lower, stripped) {
            ("charset", _) => self.parse_charset_rule(sheet),
            ("import", _) => self.parse_import_rule(sheet),
            ("namespace", _) => self.parse_namespace_rule(sheet),
            ("media", _) => self.parse_media_rule(sheet),
            ("supports", _) => self.parse_supports_rule(sheet),
            ("page", _) => self.parse_page_rule(sheet),
            ("font-face", _) => self.parse_font_face_rule(sheet),
            (_, "document") => self.parse_document_rule(sheet),
            (_, "keyframes") => self.parse_keyframes_rule(sheet),
            _ => self.parse_unknown_at_rule(sheet, &keyword, t.location),
        }
    }

    fn parse_unknown_at_rule(
        &mut self,
        sheet: &mut CssStylesheet,
        name: &str,
        location: coral_shared::text_stream::Location,
    ) -> Option<CssRule> {
        log::trace!("parse_unknown_at_rule: {}", name);

        self.report(ErrorCode::UnknownAtRule, location);

        let prelude = self.consume_raw_prelude();

        let t = self.tokenizer.lookahead(0);
        match t.token_type {
            TokenType::LCurly => self.tokenizer.skip_unknown_rule(),
            TokenType::Semicolon => {
                self.tokenizer.consume();
            }
            _ => {}
        }

        Some(CssRule::new(
            sheet.allocate_id(),
            CssRuleKind::UnknownAt { name: name.to_string(), prelude },
        ))
    }

    /// Consumes the `{` opening a rule body. When the block is missing
    /// the rule is reported and the rest of the construct skipped. A `}`
    /// in the way belongs to the enclosing block and is left unconsumed
    /// for the caller.
    pub(crate) fn expect_block_open(&mut self) -> bool {
        self.consume_whitespace_comments();

        let t = self.tokenizer.lookahead(0);
        if t.token_type == TokenType::LCurly {
            self.tokenizer.consume();
            return true;
        }

        self.report(ErrorCode::InvalidToken, t.location);
        if !matches!(t.token_type, TokenType::RCurly | TokenType::Eof) {
            self.tokenizer.skip_unknown_rule();
        }
        false
    }

    /// Consumes the `)` closing a constraint; recovery skips to the
    /// matching close paren when something else is in the way
    pub(crate) fn expect_closed_arguments(&mut self) {
        self.consume_whitespace_comments();

        if self.consume(TokenType::RParen).is_err() {
            self.tokenizer.reconsume();
            self.tokenizer.jump_to_closed_arguments();
        }
    }

    /// Reads a quoted string, an unquoted `url(...)` token, or a
    /// `url("...")` function call
    pub(crate) fn read_string_or_url(&mut self) -> CssResult<String> {
        let t = self.tokenizer.consume();
        match t.token_type {
            TokenType::QuotedString(value) | TokenType::Url(value) => Ok(value),
            TokenType::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                self.consume_whitespace_comments();

                let inner = self.tokenizer.consume();
                let TokenType::QuotedString(value) = inner.token_type else {
                    self.tokenizer.reconsume();
                    self.tokenizer.jump_to_closed_arguments();
                    return Err(CssError::with_location("Expected string inside url()", inner.location));
                };

                self.expect_closed_arguments();
                Ok(value)
            }
            _ => {
                self.tokenizer.reconsume();
                Err(CssError::with_location("Expected string or url()", t.location))
            }
        }
    }
}
