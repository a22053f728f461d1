//! Storage-layer error types.

use gyre_core::{FieldError, SettingsError};
use thiserror::Error;

/// A dimension list could not be resolved to a concrete shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The descriptor names an axis the grid does not define.
    #[error("field '{field}' uses axis '{axis}', which the grid does not define")]
    UnknownAxis {
        /// The field being resolved.
        field: String,
        /// The unresolved axis tag.
        axis: String,
    },
    /// The element count of the resolved shape overflows `usize`.
    #[error("field '{field}' has shape {shape:?}, whose element count overflows")]
    Overflow {
        /// The field being resolved.
        field: String,
        /// The resolved extents.
        shape: Vec<usize>,
    },
    /// A grid-dimension setting holds a negative value.
    #[error("grid dimension '{setting}' must be non-negative, got {value}")]
    NegativeExtent {
        /// The setting name (`nx`, `ny`, ...).
        setting: &'static str,
        /// The offending value.
        value: i64,
    },
}

/// The variable catalog is malformed or inconsistent with the settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// An enable-predicate uses a form other than `<flag>` or `not <flag>`.
    #[error("field '{field}' has invalid predicate '{expr}': {reason}")]
    InvalidPredicate {
        /// The field carrying the predicate.
        field: String,
        /// The predicate text.
        expr: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Two descriptors share a name.
    #[error("field '{name}' is declared more than once")]
    DuplicateVariable {
        /// The duplicated name.
        name: String,
    },
    /// A predicate refers to a flag the settings registry does not know.
    #[error("field '{field}' is gated on unregistered setting '{flag}'")]
    UnregisteredFlag {
        /// The gated field.
        field: String,
        /// The missing flag.
        flag: String,
    },
    /// A predicate refers to a setting that is not boolean.
    #[error("field '{field}' is gated on '{flag}', which is {kind}, not bool")]
    NonBooleanFlag {
        /// The gated field.
        field: String,
        /// The referenced setting.
        flag: String,
        /// The setting's registered kind.
        kind: &'static str,
    },
}

/// Errors from building a [`crate::State`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArenaError {
    /// Shape resolution failed.
    #[error(transparent)]
    Shape(#[from] ShapeError),
    /// The catalog failed validation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// A setting could not be read.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// A field could not be accessed.
    #[error(transparent)]
    Field(#[from] FieldError),
}
