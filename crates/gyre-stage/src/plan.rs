//! Step gates, the step plan, and plan validation.
//!
//! [`StepPlan::build`] turns a set of [`StepGates`] into the ordered list
//! of [`Action`]s for one step. [`validate_plan`] runs once at setup and
//! rejects plans that name a stage without an implementation or exchange
//! a field that is not allocated.

use std::fmt;

use gyre_arena::State;
use gyre_core::{FieldError, Settings, SettingsError};
use thiserror::Error;
use tracing::{debug, trace};

use crate::stage::{StageId, StageSet};

// ── Gates ──────────────────────────────────────────────────────────

/// The settings flags that decide which stages run.
///
/// Read once from the frozen settings; a gate cannot change within a
/// step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StepGates {
    /// `enable_cyclic_x`: periodic exchange along x.
    pub cyclic_x: bool,
    /// `enable_hydrostatic`: recompute vertical velocity diagnostically.
    pub hydrostatic: bool,
    /// `enable_tke`.
    pub tke: bool,
    /// `enable_eke`.
    pub eke: bool,
    /// `enable_idemix`.
    pub idemix: bool,
    /// `enable_idemix_m2`.
    pub idemix_m2: bool,
    /// `enable_idemix_niw`.
    pub idemix_niw: bool,
}

impl StepGates {
    /// Read every gate from `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        Ok(Self {
            cyclic_x: settings.flag("enable_cyclic_x")?,
            hydrostatic: settings.flag("enable_hydrostatic")?,
            tke: settings.flag("enable_tke")?,
            eke: settings.flag("enable_eke")?,
            idemix: settings.flag("enable_idemix")?,
            idemix_m2: settings.flag("enable_idemix_m2")?,
            idemix_niw: settings.flag("enable_idemix_niw")?,
        })
    }

    /// Either spectral internal-wave component is on.
    pub fn spectral(&self) -> bool {
        self.idemix_m2 || self.idemix_niw
    }

    /// Any closure that needs velocities on the W grid is on.
    pub fn any_energy_closure(&self) -> bool {
        self.eke || self.tke || self.idemix
    }

    /// Fields whose `next` level is exchanged, in exchange order.
    pub fn exchanged_fields(&self) -> Vec<&'static str> {
        let mut fields = vec!["u", "v"];
        for (on, name) in [
            (self.tke, "tke"),
            (self.eke, "eke"),
            (self.idemix, "e_iw"),
            (self.idemix_m2, "e_m2"),
            (self.idemix_niw, "e_niw"),
        ] {
            if on {
                fields.push(name);
            }
        }
        fields
    }
}

// ── Plan ───────────────────────────────────────────────────────────

/// One unit of work within a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Run a physics stage.
    Stage(StageId),
    /// Apply the periodic boundary to the `next` level of these fields.
    Exchange(Vec<&'static str>),
    /// Ask the array backend to complete deferred work.
    Flush,
    /// Run the diagnostics collaborator.
    Diagnose,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(id) => write!(f, "{id}"),
            Self::Exchange(fields) => write!(f, "cyclic_x({})", fields.join(", ")),
            Self::Flush => f.write_str("flush"),
            Self::Diagnose => f.write_str("diagnostics"),
        }
    }
}

/// The ordered actions of one step.
///
/// Time-level rotation and the iteration increment follow the last
/// action and are owned by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct StepPlan {
    actions: Vec<Action>,
}

impl StepPlan {
    /// Lay out a step for the given gates.
    ///
    /// The diffusivity stages are always present; their implementations
    /// decide what to do when the closure itself is off.
    pub fn build(gates: &StepGates) -> Self {
        use StageId::*;

        let mut actions = Vec::with_capacity(20);
        let mut stage = |id: StageId, on: bool| {
            if on {
                actions.push(Action::Stage(id));
            }
        };
        stage(Forcing, true);
        stage(IdemixParameter, gates.idemix);
        stage(SpectralParameter, gates.spectral());
        stage(EkeDiffusivities, true);
        stage(TkeDiffusivities, true);
        stage(Momentum, true);
        stage(Thermodynamics, true);
        stage(VelocityOnWGrid, gates.any_energy_closure());
        stage(IntegrateEke, gates.eke);
        stage(IntegrateIdemixM2, gates.idemix_m2);
        stage(IntegrateIdemixNiw, gates.idemix_niw);
        stage(IntegrateIdemix, gates.idemix);
        stage(WaveInteraction, gates.spectral());
        stage(IntegrateTke, gates.tke);

        if gates.cyclic_x {
            actions.push(Action::Exchange(gates.exchanged_fields()));
        }
        if gates.hydrostatic {
            actions.push(Action::Stage(VerticalVelocity));
        }
        actions.push(Action::Flush);
        actions.push(Action::Diagnose);
        Self { actions }
    }

    /// Read the gates from `settings` and lay out the step.
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        StepGates::from_settings(settings).map(|g| Self::build(&g))
    }

    /// Actions in execution order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Stages the plan runs, in execution order.
    pub fn stages(&self) -> impl Iterator<Item = StageId> + '_ {
        self.actions.iter().filter_map(|a| match a {
            Action::Stage(id) => Some(*id),
            _ => None,
        })
    }

    /// Whether the plan runs `id`.
    pub fn runs(&self, id: StageId) -> bool {
        self.stages().any(|s| s == id)
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the plan has no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Display for StepPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{action}")?;
        }
        Ok(())
    }
}

// ── Validation ─────────────────────────────────────────────────────

/// Errors from plan validation (setup-time, never per step).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The plan runs a stage that has no implementation.
    #[error("stage '{stage}' is required by the step plan but not registered")]
    MissingStage {
        /// The unregistered stage.
        stage: StageId,
    },
    /// A field in the periodic exchange is missing or has no time levels.
    #[error("cannot exchange field '{field}': {source}")]
    ExchangeFieldUnavailable {
        /// The exchanged field.
        field: String,
        /// Why it cannot be exchanged.
        source: FieldError,
    },
}

/// Check that `stages` implements every stage of `plan` and that every
/// exchanged field is an allocated, time-dependent field of `state`.
pub fn validate_plan(
    plan: &StepPlan,
    stages: &StageSet,
    state: &State,
) -> Result<(), PipelineError> {
    if let Some(stage) = plan.stages().find(|&id| !stages.contains(id)) {
        return Err(PipelineError::MissingStage { stage });
    }
    for action in plan.actions() {
        let Action::Exchange(fields) = action else {
            continue;
        };
        for &field in fields {
            let unavailable = |source| PipelineError::ExchangeFieldUnavailable {
                field: field.to_string(),
                source,
            };
            let descriptor = state.descriptor(field).map_err(unavailable)?;
            if !descriptor.time_dependent {
                return Err(unavailable(FieldError::NotTimeDependent {
                    name: field.to_string(),
                }));
            }
            trace!(field, "exchange field available");
        }
    }
    debug!(
        stages = plan.stages().count(),
        actions = plan.len(),
        "step plan validated"
    );
    Ok(())
}
