use crate::errors::ErrorCode;
use crate::stylesheet::{CssMedium, CssRule, CssRuleKind, CssStylesheet, MediaConstraint};
use crate::tokenizer::TokenType;
use crate::CssParser;
use coral_shared::errors::{CssError, CssResult};

impl CssParser<'_> {
    pub(crate) fn parse_media_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_media_rule");

        let media = match self.read_media_list() {
            Ok(media) => media,
            // recovery already consumed up to the declaration end
            Err(_) => return None,
        };

        if !self.expect_block_open() {
            return None;
        }

        let children = self.parse_rule_list(sheet);

        let mut rule = CssRule::new(sheet.allocate_id(), CssRuleKind::Media { media, children });
        rule.adopt_children();
        Some(rule)
    }

    /// Reads a comma-separated media list up to (not including) `{`, `;`
    /// or Eof. An explicitly empty medium triggers recovery to the end of
    /// the declaration.
    pub(crate) fn read_media_list(&mut self) -> CssResult<Vec<CssMedium>> {
        log::trace!("read_media_list");

        let mut media = Vec::new();

        loop {
            self.consume_whitespace_comments();

            let t = self.tokenizer.lookahead(0);
            if matches!(t.token_type, TokenType::LCurly | TokenType::Semicolon | TokenType::Eof) {
                break;
            }

            let medium = self.read_medium().and_then(|medium| {
                if medium.is_empty() {
                    Err(CssError::with_location("Empty medium", t.location))
                } else {
                    Ok(medium)
                }
            });

            let medium = match medium {
                Ok(medium) => medium,
                Err(e) => {
                    // leave the tokenizer at the end of the declaration no
                    // matter where the medium failed
                    self.report(ErrorCode::InvalidToken, t.location);
                    self.tokenizer.jump_to_end_of_declaration();
                    return Err(e);
                }
            };
            media.push(medium);

            self.consume_whitespace_comments();
            let t = self.tokenizer.consume();
            if !t.is_comma() {
                self.tokenizer.reconsume();
                break;
            }
        }

        Ok(media)
    }

    /// Reads one medium: optional `not`/`only` modifier, optional media
    /// type, `and`-connected parenthesized constraints
    pub(crate) fn read_medium(&mut self) -> CssResult<CssMedium> {
        log::trace!("read_medium");

        let mut medium = CssMedium::default();

        self.consume_whitespace_comments();
        let t = self.tokenizer.lookahead(0);
        if t.is_ident_ci("not") {
            self.tokenizer.consume();
            medium.inverse = true;
            self.consume_whitespace_comments();
        } else if t.is_ident_ci("only") {
            self.tokenizer.consume();
            medium.exclusive = true;
            self.consume_whitespace_comments();
        }

        let t = self.tokenizer.lookahead(0);
        if t.is_ident() && !t.is_ident_ci("and") {
            medium.media_type = Some(self.consume_any_ident()?);
            self.consume_whitespace_comments();
        }

        loop {
            let t = self.tokenizer.lookahead(0);
            match t.token_type {
                TokenType::Ident(ref s) if s.eq_ignore_ascii_case("and") => {
                    self.tokenizer.consume();
                    self.consume_whitespace_comments();
                    medium.constraints.push(self.read_constraint()?);
                }
                // a constraint may open the medium when no type was given
                TokenType::LParen if medium.media_type.is_none() && medium.constraints.is_empty() => {
                    medium.constraints.push(self.read_constraint()?);
                }
                _ => break,
            }

            self.consume_whitespace_comments();
        }

        Ok(medium)
    }

    /// Reads `(feature)`, `(feature: value)` or a range form whose
    /// comparator flows into the value
    fn read_constraint(&mut self) -> CssResult<MediaConstraint> {
        log::trace!("read_constraint");

        self.consume(TokenType::LParen)?;
        self.consume_whitespace_comments();

        let t = self.tokenizer.consume();
        let TokenType::Ident(feature) = t.token_type else {
            self.tokenizer.reconsume();
            self.tokenizer.jump_to_closed_arguments();
            return Err(CssError::with_location("Expected media feature name", t.location));
        };

        self.consume_whitespace_comments();

        let t = self.tokenizer.consume();
        match t.token_type {
            TokenType::RParen => Ok(MediaConstraint { feature, value: None }),
            TokenType::Colon => {
                let value = self.read_value(true);
                self.expect_closed_arguments();
                Ok(MediaConstraint { feature, value })
            }
            _ => {
                // range form, e.g. `(width >= 500px)`
                self.tokenizer.reconsume();
                let value = self.read_value(true);
                self.expect_closed_arguments();
                Ok(MediaConstraint { feature, value })
            }
        }
    }
}
