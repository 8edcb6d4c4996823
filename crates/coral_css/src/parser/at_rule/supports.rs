use crate::errors::ErrorCode;
use crate::stylesheet::{Condition, CssRule, CssRuleKind, CssStylesheet};
use crate::tokenizer::TokenType;
use crate::CssParser;
use coral_shared::errors::{CssError, CssResult};
use cow_utils::CowUtils;
use std::rc::Rc;

impl CssParser<'_> {
    pub(crate) fn parse_supports_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_supports_rule");

        let condition = match self.read_condition() {
            Ok(condition) => condition,
            Err(e) => {
                let location = e.location.unwrap_or_else(|| self.tokenizer.current_location());
                self.report(ErrorCode::InvalidToken, location);
                self.tokenizer.skip_unknown_rule();
                return None;
            }
        };

        if !self.expect_block_open() {
            return None;
        }

        let children = self.parse_rule_list(sheet);

        let mut rule = CssRule::new(sheet.allocate_id(), CssRuleKind::Supports { condition, children });
        rule.adopt_children();
        Some(rule)
    }

    /// Reads one connector level of a supports condition. The first
    /// connector seen fixes the connector for this level; a different
    /// connector terminates the level.
    pub(crate) fn read_condition(&mut self) -> CssResult<Condition> {
        log::trace!("read_condition");

        self.consume_whitespace_comments();
        let first = self.extract_condition()?;

        let mut children = vec![first];
        let mut conjunction: Option<bool> = None;

        loop {
            self.consume_whitespace_comments();

            let t = self.tokenizer.lookahead(0);
            let is_and = t.is_ident_ci("and");
            let is_or = t.is_ident_ci("or");
            if !is_and && !is_or {
                break;
            }

            match conjunction {
                None => conjunction = Some(is_and),
                Some(fixed) if fixed == is_and => {}
                Some(_) => break,
            }

            self.tokenizer.consume();
            self.consume_whitespace_comments();
            children.push(self.extract_condition()?);
        }

        Ok(match conjunction {
            None => children.remove(0),
            Some(true) => Condition::And(children),
            Some(false) => Condition::Or(children),
        })
    }

    /// Reads a single condition term: `not cond`, `(cond)`, or a
    /// parenthesized declaration test
    pub(crate) fn extract_condition(&mut self) -> CssResult<Condition> {
        log::trace!("extract_condition");

        self.consume_whitespace_comments();

        let t = self.tokenizer.consume();
        match t.token_type {
            TokenType::Ident(ref s) if s.eq_ignore_ascii_case("not") => {
                Ok(Condition::Not(Box::new(self.extract_condition()?)))
            }
            TokenType::LParen => {
                self.consume_whitespace_comments();

                let inner = self.tokenizer.lookahead(0);
                if matches!(inner.token_type, TokenType::LParen) || inner.is_ident_ci("not") {
                    let condition = self.read_condition()?;
                    self.expect_closed_arguments();
                    return Ok(Condition::Group(Box::new(condition)));
                }

                if inner.is_ident() {
                    return self.read_declaration_condition();
                }

                self.tokenizer.jump_to_closed_arguments();
                Err(CssError::with_location("Expected supports condition", inner.location))
            }
            _ => {
                self.tokenizer.reconsume();
                Err(CssError::with_location("Expected supports condition", t.location))
            }
        }
    }

    /// Reads the `property: value` test inside parens. It is evaluated
    /// through the property factory like any declaration, but not
    /// inserted into a block.
    fn read_declaration_condition(&mut self) -> CssResult<Condition> {
        let property = self.consume_any_ident()?;
        self.consume_whitespace_comments();

        if self.consume(TokenType::Colon).is_err() {
            self.tokenizer.reconsume();
            let location = self.tokenizer.current_location();
            self.tokenizer.jump_to_closed_arguments();
            return Err(CssError::with_location("Expected colon in supports test", location));
        }

        let value = self.read_value(true);
        self.expect_closed_arguments();

        let Some(value) = value else {
            return Err(CssError::with_location(
                "Expected value in supports test",
                self.tokenizer.current_location(),
            ));
        };

        let factory = Rc::clone(&self.config.property_factory);
        if let Some(mut slot) = factory.create(&property.cow_to_ascii_lowercase()) {
            let _ = slot.try_set_value(&value);
        }

        Ok(Condition::Declaration { property, value })
    }
}
