//! Orchestration-level errors.

use std::path::PathBuf;

use gyre_arena::{ArenaError, CatalogError};
use gyre_core::{BackendError, FieldError, SettingsError, StageError};
use gyre_stage::{PipelineError, StageId};
use thiserror::Error;

use crate::setup::SetupStep;

/// The configuration cannot produce a valid run. Detected at setup,
/// never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A setting is unknown or has the wrong type.
    #[error("settings: {0}")]
    Settings(#[from] SettingsError),
    /// The variable catalog is malformed or gated on unusable settings.
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),
    /// The step plan cannot be executed.
    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineError),
    /// The array backend cannot be selected.
    #[error("backend: {0}")]
    Backend(#[from] BackendError),
    /// The turbulent-kinetic-energy closure requires implicit vertical
    /// friction.
    #[error("enable_tke requires enable_implicit_vert_friction")]
    TkeWithoutImplicitFriction,
    /// The tracer time step is not finite and positive.
    #[error("dt_tracer must be finite and positive, got {value}")]
    InvalidTimeStep {
        /// The rejected value.
        value: f64,
    },
    /// The run length is negative, non-finite, or too long to count.
    #[error("run length must be finite and non-negative, got {value}")]
    InvalidRunLength {
        /// The rejected value.
        value: f64,
    },
}

/// Errors from reading or writing restart records.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RestartError {
    /// A record does not fit the allocated field.
    #[error("restart record rejected: {0}")]
    Field(#[from] FieldError),
    /// The store itself failed.
    #[error("restart store failed: {reason}")]
    Store {
        /// Description of the failure.
        reason: String,
    },
}

/// Any failure of setup or of the step loop.
#[derive(Debug, Error)]
pub enum RunError {
    /// Fatal configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Allocation failed.
    #[error("allocation failed: {0}")]
    Arena(#[from] ArenaError),
    /// Field access failed outside a stage.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// Restart read or write failed.
    #[error(transparent)]
    Restart(#[from] RestartError),
    /// The array backend failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    /// A setup collaborator failed.
    #[error("setup step '{step}' failed: {source}")]
    Setup {
        /// The failing step.
        step: SetupStep,
        /// The collaborator's error, unmodified.
        source: StageError,
    },
    /// A physics stage failed.
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        /// The failing stage.
        stage: StageId,
        /// The stage's error, unmodified.
        source: StageError,
    },
    /// The periodic boundary exchange failed.
    #[error("cyclic exchange of '{field}' failed: {source}")]
    Exchange {
        /// The field being exchanged.
        field: String,
        /// The collaborator's error, unmodified.
        source: StageError,
    },
    /// The diagnostics collaborator failed.
    #[error("diagnostics failed: {source}")]
    Diagnostics {
        /// The collaborator's error, unmodified.
        source: StageError,
    },
    /// The profile could not be written.
    #[error("failed to write profile to {}: {reason}", .path.display())]
    Profile {
        /// Destination path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

impl RunError {
    /// The stage error at the root of this failure, if any.
    pub fn stage_error(&self) -> Option<&StageError> {
        match self {
            Self::Setup { source, .. }
            | Self::Stage { source, .. }
            | Self::Exchange { source, .. }
            | Self::Diagnostics { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failure_keeps_source_message() {
        let source = StageError::NotConverged {
            iterations: 1000,
            residual: 1e-3,
        };
        let err = RunError::Stage {
            stage: StageId::Momentum,
            source: source.clone(),
        };
        assert!(err.to_string().starts_with("stage 'momentum' failed: "));
        assert!(err.to_string().ends_with(&source.to_string()));
        assert_eq!(err.stage_error(), Some(&source));
        let std_source = std::error::Error::source(&err).unwrap();
        assert_eq!(std_source.to_string(), source.to_string());
    }

    #[test]
    fn config_error_wraps_pipeline_error() {
        let err: RunError = ConfigError::from(PipelineError::MissingStage {
            stage: StageId::IntegrateTke,
        })
        .into();
        assert_eq!(
            err.to_string(),
            "configuration error: pipeline: stage 'integrate_tke' is required by the step plan but not registered"
        );
        assert!(err.stage_error().is_none());
    }
}
