//! Step profiling.
//!
//! With profiling on, the metrics of every step from
//! [`PROFILE_START_ITERATION`] onward are kept, so warm-up steps do not
//! skew the picture. The profile is written as JSON when the run ends,
//! whether it completed or failed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::error::RunError;
use crate::metrics::StepMetrics;

/// First iteration whose step is recorded.
pub const PROFILE_START_ITERATION: u64 = 3;

/// Recorded step metrics plus per-action totals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    /// First recorded iteration.
    pub start_iteration: u64,
    /// Accumulated `(label, microseconds)` over all recorded steps, in
    /// first-seen order.
    pub totals_us: Vec<(String, u64)>,
    /// Every recorded step.
    pub steps: Vec<StepMetrics>,
}

impl Profile {
    /// Record `metrics` if its iteration is past the warm-up.
    pub fn record(&mut self, metrics: &StepMetrics) {
        if metrics.iteration < PROFILE_START_ITERATION {
            return;
        }
        if self.steps.is_empty() {
            self.start_iteration = metrics.iteration;
        }
        for (label, us) in &metrics.stage_us {
            match self.totals_us.iter_mut().find(|(l, _)| l == label) {
                Some((_, total)) => *total += us,
                None => self.totals_us.push((label.clone(), *us)),
            }
        }
        self.steps.push(metrics.clone());
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A [`Profile`] bound to its output path.
#[derive(Debug)]
pub(crate) struct Profiler {
    path: PathBuf,
    profile: Profile,
}

impl Profiler {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            profile: Profile::default(),
        }
    }

    pub(crate) fn record(&mut self, metrics: &StepMetrics) {
        self.profile.record(metrics);
    }

    pub(crate) fn profile(&self) -> &Profile {
        &self.profile
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Write the profile. A run too short to record anything writes
    /// nothing and returns `Ok(false)`.
    pub(crate) fn write(&self) -> Result<bool, RunError> {
        if self.profile.is_empty() {
            return Ok(false);
        }
        let failed = |reason: String| RunError::Profile {
            path: self.path.clone(),
            reason,
        };
        let file = File::create(&self.path).map_err(|e| failed(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.profile)
            .map_err(|e| failed(e.to_string()))?;
        writer.flush().map_err(|e| failed(e.to_string()))?;
        info!(
            path = %self.path.display(),
            steps = self.profile.steps.len(),
            "profile written"
        );
        Ok(true)
    }
}
