//! The rule parser: per-token dispatch plus specialized readers for the
//! individual constructs. This module holds the shared consume helpers;
//! the productions live in the submodules.

use crate::tokenizer::{Token, TokenType, TokenizerMode};
use crate::CssParser;
use coral_shared::errors::{CssError, CssResult};

mod at_rule;
mod declaration;
mod rule;
mod stylesheet;

impl CssParser<'_> {
    /// Consumes a specific token
    pub(crate) fn consume(&mut self, token_type: TokenType) -> CssResult<Token> {
        let t = self.tokenizer.consume();
        if t.token_type != token_type {
            return Err(CssError::with_location(
                &format!("Expected {:?}, got {:?}", token_type, t),
                self.tokenizer.current_location(),
            ));
        }

        Ok(t)
    }

    pub(crate) fn consume_any_ident(&mut self) -> CssResult<String> {
        let t = self.tokenizer.consume();
        match t.token_type {
            TokenType::Ident(s) => Ok(s),
            _ => Err(CssError::with_location(
                &format!("Expected ident, got {:?}", t),
                self.tokenizer.current_location(),
            )),
        }
    }

    pub(crate) fn consume_whitespace_comments(&mut self) {
        loop {
            let t = self.tokenizer.consume();
            match t.token_type {
                TokenType::Whitespace | TokenType::Comment(_) => {
                    // just eat it
                }
                _ => {
                    self.tokenizer.reconsume();
                    break;
                }
            }
        }
    }

    /// Consumes the `;` closing a prelude-only at-rule. A missing
    /// terminator is reported and recovery jumps to the next semicolon.
    pub(crate) fn expect_semicolon(&mut self) {
        self.consume_whitespace_comments();

        let t = self.tokenizer.consume();
        match t.token_type {
            TokenType::Semicolon | TokenType::Eof => {}
            _ => {
                self.report(crate::errors::ErrorCode::InvalidToken, t.location);
                self.tokenizer.reconsume();
                self.tokenizer.jump_to_next_semicolon();
            }
        }
    }

    /// Feeds value tokens to the value builder until the builder is ready
    /// at a terminator. Outside arguments the terminators are `;`, `}`
    /// and Eof; inside arguments a closing paren ends the value instead.
    /// The `!important` state stays on the builder for the caller.
    pub(crate) fn read_value(&mut self, in_arguments: bool) -> Option<crate::stylesheet::CssValue> {
        self.tokenizer.set_mode(TokenizerMode::Value);
        self.value_builder.reset();

        loop {
            let t = self.tokenizer.lookahead(0);
            match t.token_type {
                TokenType::Eof => break,
                TokenType::Semicolon | TokenType::RCurly if !in_arguments && self.value_builder.is_ready() => break,
                TokenType::RParen | TokenType::RCurly if in_arguments && self.value_builder.is_ready() => break,
                _ => {
                    let t = self.tokenizer.consume();
                    self.value_builder.apply(&t);
                }
            }
        }

        self.tokenizer.set_mode(TokenizerMode::Data);
        self.value_builder.result()
    }

    /// Captures the raw source text up to the next block start, semicolon
    /// or Eof, without consuming the stop token
    pub(crate) fn consume_raw_prelude(&mut self) -> String {
        let start = self.tokenizer.tell();

        loop {
            let t = self.tokenizer.lookahead(0);
            match t.token_type {
                TokenType::LCurly | TokenType::Semicolon | TokenType::Eof => break,
                _ => {
                    self.tokenizer.consume();
                }
            }
        }

        let end = self.tokenizer.tell();
        self.tokenizer.slice(start, end).trim().to_string()
    }
}
