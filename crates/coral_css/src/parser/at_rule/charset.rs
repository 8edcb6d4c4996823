use crate::errors::ErrorCode;
use crate::stylesheet::{CssRule, CssRuleKind, CssStylesheet};
use crate::tokenizer::TokenType;
use crate::CssParser;

impl CssParser<'_> {
    pub(crate) fn parse_charset_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_charset_rule");

        let t = self.tokenizer.consume();
        let TokenType::QuotedString(encoding) = t.token_type else {
            self.report(ErrorCode::InvalidToken, t.location);
            self.tokenizer.reconsume();
            self.tokenizer.jump_to_next_semicolon();
            return None;
        };

        self.expect_semicolon();

        Some(CssRule::new(sheet.allocate_id(), CssRuleKind::Charset { encoding }))
    }
}
