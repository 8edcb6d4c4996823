use crate::errors::ErrorCode;
use crate::stylesheet::{CssRule, CssRuleKind, CssStylesheet};
use crate::tokenizer::TokenType;
use crate::CssParser;

impl CssParser<'_> {
    pub(crate) fn parse_namespace_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_namespace_rule");

        // the prefix ident is optional: `@namespace url(...)` declares
        // the default namespace
        let mut prefix = None;
        if let TokenType::Ident(_) = self.tokenizer.lookahead(0).token_type {
            prefix = self.consume_any_ident().ok();
            self.consume_whitespace_comments();
        }

        let url = match self.read_string_or_url() {
            Ok(url) => url,
            Err(e) => {
                let location = e.location.unwrap_or_else(|| self.tokenizer.current_location());
                self.report(ErrorCode::InvalidToken, location);
                self.tokenizer.jump_to_next_semicolon();
                return None;
            }
        };

        self.expect_semicolon();

        Some(CssRule::new(sheet.allocate_id(), CssRuleKind::Namespace { prefix, url }))
    }
}
