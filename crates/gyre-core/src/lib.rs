//! Core types and traits for the Gyre ocean model.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the settings registry, the iteration counter, the error taxonomy,
//! the nestable run timers, and the array backend contract used
//! throughout the Gyre workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod id;
pub mod settings;
pub mod timer;

pub use backend::{backend_by_name, Backend, NdarrayBackend, BACKENDS};
pub use error::{BackendError, FieldError, SettingsError, SnapshotError, StageError};
pub use id::Iteration;
pub use settings::{SettingDef, SettingKind, SettingValue, Settings, SettingsBuilder, SETTINGS};
pub use timer::{TimerGuard, TimerKey, Timers};
