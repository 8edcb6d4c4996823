use crate::errors::ErrorCode;
use crate::stylesheet::{CssRule, CssRuleKind, CssStylesheet, KeyframeSelector};
use crate::tokenizer::TokenType;
use crate::CssParser;
use coral_shared::errors::{CssError, CssResult};

impl CssParser<'_> {
    pub(crate) fn parse_keyframes_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_keyframes_rule");

        let name = match self.consume_any_ident() {
            Ok(name) => name,
            Err(e) => {
                let location = e.location.unwrap_or_else(|| self.tokenizer.current_location());
                self.report(ErrorCode::InvalidToken, location);
                self.tokenizer.reconsume();
                self.tokenizer.skip_unknown_rule();
                return None;
            }
        };

        if !self.expect_block_open() {
            return None;
        }

        let mut children = Vec::new();

        loop {
            self.consume_whitespace_comments();

            let t = self.tokenizer.lookahead(0);
            match t.token_type {
                TokenType::Eof => break,
                TokenType::RCurly => {
                    self.tokenizer.consume();
                    break;
                }
                _ => {
                    if let Some(rule) = self.parse_keyframe_rule_internal(sheet) {
                        children.push(rule);
                    }
                }
            }
        }

        let mut rule = CssRule::new(sheet.allocate_id(), CssRuleKind::Keyframes { name, children });
        rule.adopt_children();
        Some(rule)
    }

    /// Reads one keyframe rule: a stop list followed by a declaration
    /// block. A malformed stop list skips to the end of the declaration
    /// and emits no rule.
    pub(crate) fn parse_keyframe_rule_internal(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_keyframe_rule");

        let selector = match self.read_keyframe_selector() {
            Ok(selector) => selector,
            Err(e) => {
                let location = e.location.unwrap_or_else(|| self.tokenizer.current_location());
                self.report(ErrorCode::InvalidToken, location);
                self.tokenizer.jump_to_end_of_declaration();
                return None;
            }
        };

        if !self.expect_block_open() {
            return None;
        }

        let style = self.parse_declaration_block();

        Some(CssRule::new(sheet.allocate_id(), CssRuleKind::Keyframe { selector, style }))
    }

    /// Reads a comma-separated list of keyframe stops. `from` and `to`
    /// map to 0% and 100%; percentages must stay within 0..100.
    pub(crate) fn read_keyframe_selector(&mut self) -> CssResult<KeyframeSelector> {
        log::trace!("read_keyframe_selector");

        let mut stops = Vec::new();

        loop {
            self.consume_whitespace_comments();

            let t = self.tokenizer.consume();
            let stop = match t.token_type {
                TokenType::Percentage(value) if (0.0..=100.0).contains(&value) => value,
                TokenType::Ident(ref s) if s.eq_ignore_ascii_case("from") => 0.0,
                TokenType::Ident(ref s) if s.eq_ignore_ascii_case("to") => 100.0,
                _ => {
                    self.tokenizer.reconsume();
                    return Err(CssError::with_location("Expected keyframe selector", t.location));
                }
            };
            stops.push(stop);

            self.consume_whitespace_comments();
            let t = self.tokenizer.consume();
            if !t.is_comma() {
                self.tokenizer.reconsume();
                break;
            }
        }

        Ok(KeyframeSelector { stops })
    }
}
