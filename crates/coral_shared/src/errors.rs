//! Error types shared between the coral crates

use crate::text_stream::Location;
use std::fmt::{Display, Formatter};

/// Parser error that defines an error (message) on the given position
#[derive(Clone, Debug, PartialEq)]
pub struct CssError {
    /// Error message
    pub message: String,
    /// Location of the error, if available (during parsing mostly)
    pub location: Option<Location>,
}

impl CssError {
    #[must_use]
    pub fn new(message: &str) -> Self {
        CssError {
            message: message.to_string(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(message: &str, location: Location) -> Self {
        CssError {
            message: message.to_string(),
            location: Some(location),
        }
    }
}

impl Display for CssError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{} at {:?}", self.message, location)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

pub type CssResult<T> = core::result::Result<T, CssError>;

/// Serious errors and errors from third-party libraries
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("utf8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("the operation was canceled")]
    Canceled,

    #[error("there was a problem: {0}")]
    Generic(String),
}

/// Result that can be returned which holds either T or an Error
pub type Result<T> = anyhow::Result<T>;
