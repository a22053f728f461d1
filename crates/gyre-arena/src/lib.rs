//! Model state storage for the Gyre ocean model.
//!
//! Owns every field array of a run. A static [`Catalog`] of
//! [`VariableDescriptor`]s is resolved against a [`GridShape`] and the
//! frozen settings; fields whose enable-predicate holds are allocated,
//! zero-initialised, into a [`State`]. The rest are remembered so that
//! any later access fails fast instead of yielding a default.
//!
//! # Time levels
//!
//! ```text
//! State
//! ├── fields: name → FieldData (trailing axis of 3 iff time-dependent)
//! ├── disabled: name → VariableDescriptor
//! └── TimeIndex (one permutation of {0,1,2} for the whole State)
//!     previous ─┐
//!     current  ─┼─ rotate(): previous ← current, current ← next, next ← previous
//!     next     ─┘
//! ```
//!
//! Rotation relabels physical positions; array contents are never copied.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod grid;
pub mod predicate;
pub mod state;
pub mod time_level;

pub use catalog::{Catalog, CatalogEntry, OCEAN_VARIABLES};
pub use descriptor::{ElementType, VariableDescriptor};
pub use error::{ArenaError, CatalogError, ShapeError};
pub use grid::{Dim, GridShape, Shape, HALO};
pub use predicate::Predicate;
pub use state::{FieldData, State};
pub use time_level::{Slot, TimeIndex};
