//! The diagnostics collaborator.
//!
//! Diagnostics own everything the model writes besides restarts: running
//! averages, energy budgets, overturning, particle tracks, and the
//! emergency snapshot taken when a run fails.

use std::fmt;

use gyre_arena::State;
use gyre_core::{Iteration, Settings, SnapshotError, StageError};

use crate::config::RunConfig;

/// A diagnostic module with its own restart data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticSection {
    /// Running time averages.
    Averages,
    /// Energy budget.
    Energy,
    /// Meridional overturning.
    Overturning,
    /// Lagrangian particles.
    Particles,
}

impl DiagnosticSection {
    /// Every section, in restart-read order.
    pub const ALL: [DiagnosticSection; 4] = [
        Self::Averages,
        Self::Energy,
        Self::Overturning,
        Self::Particles,
    ];

    /// The setting that enables this section.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Averages => "enable_diag_averages",
            Self::Energy => "enable_diag_energy",
            Self::Overturning => "enable_diag_overturning",
            Self::Particles => "enable_diag_particles",
        }
    }

    /// Snake-case name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Averages => "averages",
            Self::Energy => "energy",
            Self::Overturning => "overturning",
            Self::Particles => "particles",
        }
    }
}

impl fmt::Display for DiagnosticSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output side of the model.
///
/// Called from the engine thread only. `diagnose` runs once per step after
/// the flush; `panic_snapshot` at most once per run, after a failure.
pub trait Diagnostics: Send {
    /// Prepare output for a run. Called once at the end of setup, before
    /// any restart read.
    fn init(
        &mut self,
        _state: &State,
        _settings: &Settings,
        _run: &RunConfig,
    ) -> Result<(), StageError> {
        Ok(())
    }

    /// Restore the restart data of one enabled `section`.
    fn read_restart(
        &mut self,
        _section: DiagnosticSection,
        _state: &mut State,
        _iteration: Iteration,
    ) -> Result<(), StageError> {
        Ok(())
    }

    /// Per-step diagnostics on the freshly computed state.
    fn diagnose(
        &mut self,
        state: &State,
        settings: &Settings,
        iteration: Iteration,
    ) -> Result<(), StageError>;

    /// Best-effort dump of `state` after a failed step.
    fn panic_snapshot(&mut self, state: &State, iteration: Iteration) -> Result<(), SnapshotError>;
}

/// Diagnostics that write nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn diagnose(&mut self, _: &State, _: &Settings, _: Iteration) -> Result<(), StageError> {
        Ok(())
    }

    fn panic_snapshot(&mut self, _: &State, _: Iteration) -> Result<(), SnapshotError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gyre_core::SettingKind;

    #[test]
    fn section_flags_are_registered_bools() {
        let settings = Settings::defaults();
        for section in DiagnosticSection::ALL {
            assert_eq!(settings.kind(section.flag()).unwrap(), SettingKind::Bool);
            assert!(!settings.flag(section.flag()).unwrap());
        }
    }

    #[test]
    fn sections_read_in_declared_order() {
        let mut sorted = DiagnosticSection::ALL;
        sorted.sort();
        assert_eq!(sorted, DiagnosticSection::ALL);
        assert_eq!(DiagnosticSection::Overturning.to_string(), "overturning");
    }
}
