//! Token-driven value builder.
//!
//! The rule parser feeds value tokens one at a time and queries
//! `is_ready` between tokens to decide whether a terminator (`;`, `}`
//! or a closing paren in a media constraint) ends the value or belongs
//! to an open function. The builder structures what it recognizes and
//! preserves everything else textually.

use crate::stylesheet::CssValue;
use crate::tokenizer::{Token, TokenType};

/// Incremental builder for one CSS value
#[derive(Default)]
pub struct ValueBuilder {
    /// Finished top-level value items
    items: Vec<CssValue>,
    /// Open function/group frames; an empty name is a plain paren group
    stack: Vec<(String, Vec<CssValue>)>,
    important: bool,
    /// Seen `!` but not yet the `important` ident
    bang_pending: bool,
}

impl ValueBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new value
    pub fn reset(&mut self) {
        self.items = Vec::new();
        self.stack = Vec::new();
        self.important = false;
        self.bang_pending = false;
    }

    /// True when the builder would accept a value terminator here: no
    /// function arguments are open and no dangling `!` is waiting for
    /// its `important`
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.stack.is_empty() && !self.bang_pending
    }

    /// Whether the value carried a trailing `!important`
    #[must_use]
    pub fn is_important(&self) -> bool {
        self.important
    }

    /// Advances the builder with one token. Never panics.
    pub fn apply(&mut self, token: &Token) {
        log::trace!("value builder <- {:?}", token.token_type);

        if self.bang_pending {
            self.bang_pending = false;
            match &token.token_type {
                TokenType::Ident(value) if value.eq_ignore_ascii_case("important") => {
                    self.important = true;
                    return;
                }
                TokenType::Whitespace | TokenType::Comment(_) => {
                    // `! important` with a gap is accepted
                    self.bang_pending = true;
                    return;
                }
                _ => {
                    // a lone bang is preserved textually
                    self.push(CssValue::Raw("!".to_string()));
                }
            }
        } else if self.important && !matches!(token.token_type, TokenType::Whitespace | TokenType::Comment(_) | TokenType::Eof) {
            // `!important` was not at the tail after all
            self.important = false;
            self.push(CssValue::Raw("!important".to_string()));
        }

        match &token.token_type {
            TokenType::Whitespace | TokenType::Comment(_) | TokenType::Eof => {}
            TokenType::Delim('!') => self.bang_pending = true,
            TokenType::Function(name) => self.stack.push((name.clone(), Vec::new())),
            TokenType::LParen => self.stack.push((String::new(), Vec::new())),
            TokenType::RParen => match self.stack.pop() {
                Some(frame) => self.close_frame(frame),
                // stray close paren, the parser normally guards via is_ready
                None => self.push(CssValue::Raw(")".to_string())),
            },
            TokenType::Ident(value) => self.push(CssValue::Ident(value.clone())),
            TokenType::QuotedString(value) | TokenType::BadString(value) => {
                self.push(CssValue::String(value.clone()));
            }
            TokenType::Integer(value) => self.push(CssValue::Integer(*value)),
            TokenType::Number(value) => self.push(CssValue::Number(*value)),
            TokenType::Percentage(value) => self.push(CssValue::Percentage(*value)),
            TokenType::Dimension { value, unit } => {
                self.push(CssValue::Dimension { value: *value, unit: unit.clone() });
            }
            TokenType::Hash(value) | TokenType::IdHash(value) => self.push(CssValue::Hash(value.clone())),
            TokenType::Url(url) => self.push(CssValue::Url(url.clone())),
            TokenType::BadUrl(url) => self.push(CssValue::Raw(format!("url({url})"))),
            TokenType::Comma => self.push(CssValue::Raw(",".to_string())),
            TokenType::Colon => self.push(CssValue::Raw(":".to_string())),
            TokenType::Semicolon => self.push(CssValue::Raw(";".to_string())),
            TokenType::GreaterThan => self.push(CssValue::Raw(">".to_string())),
            TokenType::GreaterThanEqual => self.push(CssValue::Raw(">=".to_string())),
            TokenType::LessThan => self.push(CssValue::Raw("<".to_string())),
            TokenType::LessThanEqual => self.push(CssValue::Raw("<=".to_string())),
            TokenType::Delim(c) => self.push(CssValue::Raw(c.to_string())),
            other => self.push(CssValue::Raw(Token { token_type: other.clone(), location: token.location }.to_string())),
        }
    }

    /// The value built so far. Open function frames are closed as if the
    /// missing parens were present at EOF. None when no value tokens were
    /// seen at all.
    pub fn result(&mut self) -> Option<CssValue> {
        while let Some(frame) = self.stack.pop() {
            self.close_frame(frame);
        }

        match self.items.len() {
            0 => None,
            1 => Some(self.items[0].clone()),
            _ => Some(CssValue::List(self.items.clone())),
        }
    }

    /// Appends a closed function frame. `url("...")` calls collapse into
    /// a plain url value, matching what the tokenizer produces for the
    /// unquoted form.
    fn close_frame(&mut self, (name, arguments): (String, Vec<CssValue>)) {
        if name.eq_ignore_ascii_case("url") && arguments.len() == 1 {
            if let CssValue::String(url) = &arguments[0] {
                let url = url.clone();
                self.push(CssValue::Url(url));
                return;
            }
        }

        self.push(CssValue::Function { name, arguments });
    }

    fn push(&mut self, value: CssValue) {
        match self.stack.last_mut() {
            Some((_, arguments)) => arguments.push(value),
            None => self.items.push(value),
        }
    }
}
