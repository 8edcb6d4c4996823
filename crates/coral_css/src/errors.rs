//! The error channel: typed error codes published to listeners
//! registered on the parser configuration.

use coral_shared::text_stream::Location;
use std::rc::Rc;

/// Code describing a recoverable problem found while parsing. Every code
/// is published at most once per problem, together with the source
/// position the problem started at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorCode {
    #[error("unknown at-rule")]
    UnknownAtRule,
    #[error("block opened where a rule was expected")]
    InvalidBlockStart,
    #[error("unexpected token")]
    InvalidToken,
    #[error("invalid selector")]
    InvalidSelector,
    #[error("identifier expected")]
    IdentExpected,
    #[error("colon missing in declaration")]
    ColonMissing,
    #[error("unknown declaration name")]
    UnknownDeclarationName,
    #[error("value missing in declaration")]
    ValueMissing,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
}

/// Receiver for parse errors. Listeners are invoked synchronously on the
/// parsing thread and must not call back into the parser.
pub trait ErrorListener {
    fn on_error(&self, code: ErrorCode, location: Location);
}

/// Fire-and-forget publisher shared by the tokenizer and the rule parser.
#[derive(Clone, Default)]
pub struct ErrorChannel {
    listeners: Vec<Rc<dyn ErrorListener>>,
}

impl std::fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorChannel").field("listeners", &self.listeners.len()).finish()
    }
}

impl ErrorChannel {
    #[must_use]
    pub fn new(listeners: Vec<Rc<dyn ErrorListener>>) -> Self {
        Self { listeners }
    }

    pub fn report(&self, code: ErrorCode, location: Location) {
        log::trace!("css error {:?} at {:?}", code, location);

        for listener in &self.listeners {
            listener.on_error(code, location);
        }
    }
}
