use crate::errors::ErrorCode;
use crate::stylesheet::{CssRule, CssStylesheet};
use crate::tokenizer::TokenType;
use crate::CssParser;

impl CssParser<'_> {
    /// Top-level parse loop: every non-Eof token either starts a rule or
    /// is reported and skipped at its recovery boundary.
    pub(crate) fn parse_stylesheet_internal(&mut self, sheet: &mut CssStylesheet) {
        log::trace!("parse_stylesheet");

        loop {
            let t = self.tokenizer.consume();

            match t.token_type {
                TokenType::Eof => break,
                TokenType::Whitespace | TokenType::Comment(_) => {}
                // CDO/CDC only occur around rules in HTML-embedded sheets
                TokenType::Cdo | TokenType::Cdc => {}
                TokenType::AtKeyword(_) => {
                    self.tokenizer.reconsume();
                    if let Some(rule) = self.parse_at_rule(sheet) {
                        sheet.attach(rule);
                    }
                }
                TokenType::LCurly => {
                    self.report(ErrorCode::InvalidBlockStart, t.location);
                    self.tokenizer.reconsume();
                    self.tokenizer.skip_unknown_rule();
                }
                TokenType::RCurly | TokenType::RParen | TokenType::RBracket | TokenType::Semicolon => {
                    // lone garbage, the token itself is the whole problem
                    self.report(ErrorCode::InvalidToken, t.location);
                }
                TokenType::QuotedString(_)
                | TokenType::BadString(_)
                | TokenType::Number(_)
                | TokenType::Integer(_)
                | TokenType::Percentage(_)
                | TokenType::Dimension { .. }
                | TokenType::Url(_)
                | TokenType::BadUrl(_) => {
                    // a literal starts a construct no rule can begin with
                    self.report(ErrorCode::InvalidToken, t.location);
                    self.tokenizer.skip_unknown_rule();
                }
                _ => {
                    self.tokenizer.reconsume();
                    if let Some(rule) = self.parse_style_rule(sheet) {
                        sheet.attach(rule);
                    }
                }
            }
        }
    }

    /// Parses the nested rules of a grouping at-rule body. The opening
    /// `{` is already consumed; the closing `}` is consumed here.
    pub(crate) fn parse_rule_list(&mut self, sheet: &mut CssStylesheet) -> Vec<CssRule> {
        log::trace!("parse_rule_list");

        let mut children = Vec::new();

        loop {
            let t = self.tokenizer.consume();

            match t.token_type {
                TokenType::Eof | TokenType::RCurly => break,
                TokenType::Whitespace | TokenType::Comment(_) | TokenType::Cdo | TokenType::Cdc => {}
                TokenType::Semicolon => {
                    self.report(ErrorCode::InvalidToken, t.location);
                }
                TokenType::AtKeyword(_) => {
                    self.tokenizer.reconsume();
                    if let Some(rule) = self.parse_at_rule(sheet) {
                        children.push(rule);
                    }
                }
                _ => {
                    self.tokenizer.reconsume();
                    if let Some(rule) = self.parse_style_rule(sheet) {
                        children.push(rule);
                    }
                }
            }
        }

        children
    }
}
