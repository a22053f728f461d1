//! Error types for the Gyre ocean model.
//!
//! Organized by subsystem: settings lookup, field access, stage
//! execution, the array backend, and panic snapshots. Orchestration-level
//! errors (configuration, restart, run) live in `gyre-engine` and wrap these.

use thiserror::Error;

/// Errors from the settings registry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    /// The name is not registered. Unknown names are a configuration
    /// error, never a silent default.
    #[error("unknown setting '{name}'")]
    UnknownSetting {
        /// The unregistered name.
        name: String,
    },
    /// The value type does not match the registered kind.
    #[error("setting '{name}' expects {expected}, got {found}")]
    TypeMismatch {
        /// The setting that was accessed.
        name: String,
        /// The registered kind.
        expected: &'static str,
        /// The kind that was supplied or requested.
        found: &'static str,
    },
    /// A setting with this name is already registered.
    #[error("setting '{name}' is already registered")]
    Duplicate {
        /// The duplicated name.
        name: String,
    },
    /// A configuration document could not be parsed.
    #[error("failed to parse settings: {reason}")]
    Parse {
        /// Parser message.
        reason: String,
    },
}

/// Errors from accessing a field in the model state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The field is catalogued but its enable-predicate was false at
    /// allocation time.
    #[error("field '{name}' is not allocated (its enable-predicate was false)")]
    Unallocated {
        /// The field name.
        name: String,
    },
    /// The name is not in the variable catalog at all.
    #[error("field '{name}' is not in the variable catalog")]
    Unknown {
        /// The field name.
        name: String,
    },
    /// A time slot was requested on a field without the time axis.
    #[error("field '{name}' has no time levels")]
    NotTimeDependent {
        /// The field name.
        name: String,
    },
    /// The field stores a different element type than requested.
    #[error("field '{name}' stores {stored}, requested {requested}")]
    ElementTypeMismatch {
        /// The field name.
        name: String,
        /// Element type held by the field.
        stored: &'static str,
        /// Element type the caller asked for.
        requested: &'static str,
    },
    /// Data offered for a field does not match its resolved shape.
    #[error("field '{name}' has shape {expected:?}, got {found:?}")]
    ShapeMismatch {
        /// The field name.
        name: String,
        /// Allocated shape.
        expected: Vec<usize>,
        /// Offered shape.
        found: Vec<usize>,
    },
}

/// Errors raised by a physics stage, setup step, or diagnostics pass.
///
/// The engine never catches these; they propagate after a best-effort
/// panic snapshot.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StageError {
    /// The stage's computation failed.
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A non-finite value was detected in a stage output.
    #[error("non-finite value detected in field '{field}'")]
    NonFinite {
        /// The field containing the value.
        field: String,
        /// Flat index of the first offending element, if known.
        index: Option<usize>,
    },
    /// An iterative solver did not reach its tolerance.
    #[error("solver did not converge after {iterations} iterations (residual {residual:e})")]
    NotConverged {
        /// Iterations performed.
        iterations: u64,
        /// Final residual.
        residual: f64,
    },
    /// Field access failed inside the stage.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// Settings lookup failed inside the stage.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors from the array-computation backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend does not implement the operation. Swallowed at the
    /// flush call site and nowhere else.
    #[error("backend '{backend}' does not support '{operation}'")]
    Unsupported {
        /// Backend name.
        backend: String,
        /// The unsupported operation.
        operation: &'static str,
    },
    /// No backend is registered under the requested name.
    #[error("unknown backend '{name}' (available: {available})")]
    UnknownBackend {
        /// The requested name.
        name: String,
        /// Comma-separated list of registered backends.
        available: String,
    },
    /// The backend operation failed.
    #[error("backend operation failed: {reason}")]
    Failed {
        /// Description of the failure.
        reason: String,
    },
}

/// Failure while writing a panic snapshot. Always suppressed by the
/// engine so that it never masks the original failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("panic snapshot failed: {reason}")]
pub struct SnapshotError {
    /// Description of the failure.
    pub reason: String,
}
