//! The seam towards the external style-property registry.
//!
//! The parser itself knows nothing about concrete CSS properties; it
//! asks the factory registered on the configuration for a slot per
//! declaration name and offers the parsed value to that slot. Unknown
//! names are preserved as opaque properties so CSS-OM serialization can
//! round-trip them.

use crate::stylesheet::CssValue;

/// Maps a lowercase property name to a typed property slot. `None` means
/// the name is unknown to the registry.
pub trait PropertyFactory: std::fmt::Debug {
    fn create(&self, name: &str) -> Option<Box<dyn PropertySlot>>;
}

/// A single property instance produced by the factory. The slot decides
/// whether a parsed value is acceptable for the property.
pub trait PropertySlot {
    /// Offers the value to the slot. Returns false when the value does not
    /// fit the property's grammar; the declaration is then dropped.
    fn try_set_value(&mut self, value: &CssValue) -> bool;
}

/// Default factory: every name is known and every value fits. This is the
/// stance of a parser without a style system attached; a real registry
/// replaces this on the configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermissiveFactory;

struct PermissiveSlot;

impl PropertySlot for PermissiveSlot {
    fn try_set_value(&mut self, _value: &CssValue) -> bool {
        true
    }
}

impl PropertyFactory for PermissiveFactory {
    fn create(&self, _name: &str) -> Option<Box<dyn PropertySlot>> {
        Some(Box::new(PermissiveSlot))
    }
}
