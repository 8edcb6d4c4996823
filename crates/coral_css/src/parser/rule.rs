use crate::errors::ErrorCode;
use crate::stylesheet::{CssRule, CssRuleKind, CssStylesheet, StyleRule};
use crate::tokenizer::{TokenType, TokenizerMode};
use crate::CssParser;

impl CssParser<'_> {
    /// Reads a style rule: a selector up to the block start, then the
    /// declaration block. Rules without a usable selector are dropped;
    /// rules with an invalid-but-nonempty selector follow the
    /// `keep_invalid_selectors` configuration.
    pub(crate) fn parse_style_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_style_rule");

        let start = self.tokenizer.lookahead(0).location;

        self.tokenizer.set_mode(TokenizerMode::Selector);
        self.selector_constructor.reset();

        loop {
            let t = self.tokenizer.lookahead(0);
            match t.token_type {
                TokenType::LCurly | TokenType::RCurly | TokenType::Eof => break,
                _ => {
                    let t = self.tokenizer.consume();
                    self.selector_constructor.apply(&t);
                }
            }
        }

        self.tokenizer.set_mode(TokenizerMode::Data);

        let valid = self.selector_constructor.is_valid();
        let selector = self.selector_constructor.result();

        let t = self.tokenizer.lookahead(0);
        if t.token_type != TokenType::LCurly {
            // `}` or Eof where the block should open; the `}` belongs to
            // the enclosing block and stays unconsumed for the caller
            self.report(ErrorCode::InvalidToken, t.location);
            return None;
        }
        self.tokenizer.consume();

        let Some(selector) = selector else {
            self.report(ErrorCode::InvalidSelector, start);
            self.tokenizer.reconsume();
            self.tokenizer.skip_unknown_rule();
            return None;
        };

        if !valid {
            self.report(ErrorCode::InvalidSelector, start);
            if !self.config.keep_invalid_selectors {
                self.tokenizer.reconsume();
                self.tokenizer.skip_unknown_rule();
                return None;
            }
        }

        let style = self.parse_declaration_block();

        Some(CssRule::new(
            sheet.allocate_id(),
            CssRuleKind::Style(StyleRule { selector, style }),
        ))
    }
}
