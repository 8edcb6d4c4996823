use crate::stylesheet::{CssRule, CssRuleKind, CssStylesheet};
use crate::tokenizer::{TokenType, TokenizerMode};
use crate::CssParser;

impl CssParser<'_> {
    /// `@page` takes an optional selector (`:first`, a named page) and a
    /// declaration block
    pub(crate) fn parse_page_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_page_rule");

        self.tokenizer.set_mode(TokenizerMode::Selector);
        self.selector_constructor.reset();

        loop {
            let t = self.tokenizer.lookahead(0);
            match t.token_type {
                TokenType::LCurly | TokenType::RCurly | TokenType::Semicolon | TokenType::Eof => break,
                _ => {
                    let t = self.tokenizer.consume();
                    self.selector_constructor.apply(&t);
                }
            }
        }

        self.tokenizer.set_mode(TokenizerMode::Data);
        let selector = self.selector_constructor.result();

        if !self.expect_block_open() {
            return None;
        }

        let style = self.parse_declaration_block();

        Some(CssRule::new(sheet.allocate_id(), CssRuleKind::Page { selector, style }))
    }
}
