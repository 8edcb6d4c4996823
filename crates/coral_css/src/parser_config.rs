//! Parser configuration

use crate::errors::ErrorListener;
use crate::properties::{PermissiveFactory, PropertyFactory};
use coral_shared::text_stream::Location;
use std::rc::Rc;

/// ParserConfig holds the configuration for the parser
#[derive(Clone)]
pub struct ParserConfig {
    /// Optional source filename or url
    pub source: Option<String>,
    /// Start position of the given element in the data source
    pub start_location: Location,
    /// Encoding assumed when the stylesheet carries no @charset rule
    pub default_encoding: String,
    /// Keep style rules whose selector parsed with errors but still
    /// yielded a result (browser-compatibility profile). When false such
    /// rules are dropped after `InvalidSelector` is reported.
    pub keep_invalid_selectors: bool,
    /// Listeners receiving every recoverable parse error
    pub listeners: Vec<Rc<dyn ErrorListener>>,
    /// The external style-property registry
    pub property_factory: Rc<dyn PropertyFactory>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            source: None,
            start_location: Location::default(),
            default_encoding: "utf-8".to_string(),
            keep_invalid_selectors: false,
            listeners: Vec::new(),
            property_factory: Rc::new(PermissiveFactory),
        }
    }
}

impl std::fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserConfig")
            .field("source", &self.source)
            .field("start_location", &self.start_location)
            .field("default_encoding", &self.default_encoding)
            .field("keep_invalid_selectors", &self.keep_invalid_selectors)
            .field("listeners", &self.listeners.len())
            .field("property_factory", &self.property_factory)
            .finish()
    }
}
