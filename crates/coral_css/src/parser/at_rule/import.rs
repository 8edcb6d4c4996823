use crate::errors::ErrorCode;
use crate::stylesheet::{CssRule, CssRuleKind, CssStylesheet};
use crate::tokenizer::TokenType;
use crate::CssParser;

impl CssParser<'_> {
    pub(crate) fn parse_import_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_import_rule");

        let href = match self.read_string_or_url() {
            Ok(href) => href,
            Err(e) => {
                let location = e.location.unwrap_or_else(|| self.tokenizer.current_location());
                self.report(ErrorCode::InvalidToken, location);
                self.tokenizer.jump_to_next_semicolon();
                return None;
            }
        };

        self.consume_whitespace_comments();

        let media = match self.tokenizer.lookahead(0).token_type {
            TokenType::Semicolon | TokenType::Eof => Vec::new(),
            _ => match self.read_media_list() {
                Ok(media) => media,
                // recovery already consumed up to the declaration end
                Err(_) => return None,
            },
        };

        self.expect_semicolon();

        Some(CssRule::new(sheet.allocate_id(), CssRuleKind::Import { href, media }))
    }
}
