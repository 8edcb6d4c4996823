use crate::errors::ErrorCode;
use crate::stylesheet::{CssProperty, CssValue, DeclarationBlock};
use crate::tokenizer::TokenType;
use crate::CssParser;
use cow_utils::CowUtils;
use std::rc::Rc;

impl CssParser<'_> {
    /// Fills a declaration block. The opening `{` is already consumed;
    /// the closing `}` is consumed on exit.
    pub(crate) fn parse_declaration_block(&mut self) -> DeclarationBlock {
        log::trace!("parse_declaration_block");

        let mut block = DeclarationBlock::new();

        loop {
            self.consume_whitespace_comments();

            let t = self.tokenizer.lookahead(0);
            match t.token_type {
                TokenType::Eof => break,
                TokenType::RCurly => {
                    self.tokenizer.consume();
                    break;
                }
                TokenType::Semicolon => {
                    self.tokenizer.consume();
                }
                _ => self.read_declaration(&mut block),
            }
        }

        block
    }

    /// Reads one `property: value` declaration into the block. Every
    /// failure mode reports once and recovers at the end of the
    /// declaration, leaving the surrounding block intact.
    pub(crate) fn read_declaration(&mut self, block: &mut DeclarationBlock) {
        log::trace!("read_declaration");

        let t = self.tokenizer.consume();
        let name = match t.token_type {
            TokenType::Ident(ref name) => name.clone(),
            _ => {
                self.report(ErrorCode::IdentExpected, t.location);
                self.tokenizer.reconsume();
                self.tokenizer.jump_to_end_of_declaration();
                return;
            }
        };

        self.consume_whitespace_comments();

        let colon = self.tokenizer.consume();
        if !colon.is_colon() {
            self.report(ErrorCode::ColonMissing, colon.location);
            self.tokenizer.reconsume();
            self.tokenizer.jump_to_end_of_declaration();
            return;
        }

        let name = name.cow_to_ascii_lowercase().into_owned();
        let factory = Rc::clone(&self.config.property_factory);
        let slot = factory.create(&name);

        let value = self.read_value(false);
        let important = self.value_builder.is_important();

        match value {
            None => {
                self.report(ErrorCode::ValueMissing, colon.location);
            }
            Some(value) => match slot {
                Some(mut slot) => {
                    let property = CssProperty { name, value, important };
                    if slot.try_set_value(&property.value) {
                        block.set(property);
                    }
                }
                None => {
                    // unknown properties are preserved with their raw text
                    self.report(ErrorCode::UnknownDeclarationName, t.location);
                    block.set(CssProperty {
                        name,
                        value: CssValue::Raw(value.to_string()),
                        important,
                    });
                }
            },
        }

        self.tokenizer.jump_to_end_of_declaration();
    }
}
