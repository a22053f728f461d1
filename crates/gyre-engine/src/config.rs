//! Run configuration and setup-time checks.

use std::path::PathBuf;

use gyre_core::{Iteration, Settings};
use tracing::warn;

use crate::error::ConfigError;

/// Default destination of the step profile.
pub const DEFAULT_PROFILE_PATH: &str = "profile.json";

/// Per-run inputs that are not model settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunConfig {
    /// Requested integration length in seconds.
    pub run_length: f64,
    /// Interval between diagnostic snapshots in seconds, forwarded to
    /// the diagnostics collaborator.
    pub snapshot_interval: f64,
    /// Where to write the step profile; `None` disables profiling.
    pub profile: Option<PathBuf>,
}

impl RunConfig {
    /// Take the run length and snapshot interval from the `runlen` and
    /// `snapint` settings. Profiling is off.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            run_length: settings.float("runlen")?,
            snapshot_interval: settings.float("snapint")?,
            profile: None,
        })
    }

    /// Enable profiling to `path`.
    #[must_use]
    pub fn with_profile(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile = Some(path.into());
        self
    }
}

/// `start + floor(run_length / dt_tracer)`.
///
/// A run length that is not a whole number of time steps is truncated,
/// never rounded; the dropped remainder is logged at `warn`.
pub fn end_iteration(
    start: Iteration,
    run_length: f64,
    dt_tracer: f64,
) -> Result<Iteration, ConfigError> {
    if !(dt_tracer.is_finite() && dt_tracer > 0.0) {
        return Err(ConfigError::InvalidTimeStep { value: dt_tracer });
    }
    if !(run_length.is_finite() && run_length >= 0.0) {
        return Err(ConfigError::InvalidRunLength { value: run_length });
    }
    let exact = run_length / dt_tracer;
    let steps = exact.floor();
    if steps != exact {
        warn!(
            run_length,
            dt_tracer,
            steps,
            dropped_s = run_length - steps * dt_tracer,
            "run length is not a whole number of time steps; truncating"
        );
    }
    // `u64::MAX as f64` is exactly 2^64.
    if steps >= u64::MAX as f64 {
        return Err(ConfigError::InvalidRunLength { value: run_length });
    }
    start
        .0
        .checked_add(steps as u64)
        .map(Iteration)
        .ok_or(ConfigError::InvalidRunLength { value: run_length })
}

/// Reject physically inconsistent flag combinations.
pub fn check_flag_consistency(settings: &Settings) -> Result<(), ConfigError> {
    if settings.flag("enable_tke")? && !settings.flag("enable_implicit_vert_friction")? {
        return Err(ConfigError::TkeWithoutImplicitFriction);
    }
    Ok(())
}
