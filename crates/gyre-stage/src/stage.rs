//! The [`Stage`] trait, stage identifiers, and the [`StageSet`] registry.

use std::fmt;

use gyre_core::{StageError, TimerKey};
use indexmap::IndexMap;

use crate::context::StageContext;

/// Identifies one physics stage of the step pipeline.
///
/// Variants are listed in pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    /// Surface forcing update.
    Forcing,
    /// Internal-wave parameter update.
    IdemixParameter,
    /// Spectral internal-wave parameter update (M2 or near-inertial).
    SpectralParameter,
    /// Eddy-kinetic-energy diffusivities.
    EkeDiffusivities,
    /// Turbulent-kinetic-energy diffusivities.
    TkeDiffusivities,
    /// Momentum equations.
    Momentum,
    /// Tracer equations.
    Thermodynamics,
    /// Velocity interpolated onto the W grid.
    VelocityOnWGrid,
    /// Eddy-kinetic-energy integration.
    IntegrateEke,
    /// M2 tidal energy integration.
    IntegrateIdemixM2,
    /// Near-inertial wave energy integration.
    IntegrateIdemixNiw,
    /// Internal-wave energy integration.
    IntegrateIdemix,
    /// Coupling between the spectral wave components.
    WaveInteraction,
    /// Turbulent-kinetic-energy integration.
    IntegrateTke,
    /// Diagnostic vertical velocity.
    VerticalVelocity,
}

impl StageId {
    /// Every stage, in pipeline order.
    pub const ALL: [StageId; 15] = [
        Self::Forcing,
        Self::IdemixParameter,
        Self::SpectralParameter,
        Self::EkeDiffusivities,
        Self::TkeDiffusivities,
        Self::Momentum,
        Self::Thermodynamics,
        Self::VelocityOnWGrid,
        Self::IntegrateEke,
        Self::IntegrateIdemixM2,
        Self::IntegrateIdemixNiw,
        Self::IntegrateIdemix,
        Self::WaveInteraction,
        Self::IntegrateTke,
        Self::VerticalVelocity,
    ];

    /// Snake-case name used in logs, metrics and profiles.
    pub fn name(self) -> &'static str {
        match self {
            Self::Forcing => "forcing",
            Self::IdemixParameter => "idemix_parameter",
            Self::SpectralParameter => "spectral_parameter",
            Self::EkeDiffusivities => "eke_diffusivities",
            Self::TkeDiffusivities => "tke_diffusivities",
            Self::Momentum => "momentum",
            Self::Thermodynamics => "thermodynamics",
            Self::VelocityOnWGrid => "velocity_on_wgrid",
            Self::IntegrateEke => "integrate_eke",
            Self::IntegrateIdemixM2 => "integrate_idemix_m2",
            Self::IntegrateIdemixNiw => "integrate_idemix_niw",
            Self::IntegrateIdemix => "integrate_idemix",
            Self::WaveInteraction => "wave_interaction",
            Self::IntegrateTke => "integrate_tke",
            Self::VerticalVelocity => "vertical_velocity",
        }
    }

    /// The timer the stage runs under, if it is timed on its own.
    pub fn timer(self) -> Option<TimerKey> {
        match self {
            Self::Momentum => Some(TimerKey::Momentum),
            Self::Thermodynamics => Some(TimerKey::Temperature),
            Self::IntegrateEke => Some(TimerKey::Eke),
            Self::IntegrateIdemixM2
            | Self::IntegrateIdemixNiw
            | Self::IntegrateIdemix
            | Self::WaveInteraction => Some(TimerKey::Idemix),
            Self::IntegrateTke => Some(TimerKey::Tke),
            _ => None,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One physics stage.
///
/// # Contract
///
/// - Reads the `previous` and `current` time levels and writes `next`
///   (see [`gyre_arena::Slot`]); never rotates time levels itself.
/// - `&self`: stages keep no state of their own; everything persistent
///   lives in [`gyre_arena::State`].
/// - Errors propagate unchanged to the caller of the run; the engine
///   never retries or swallows them.
///
/// # Examples
///
/// ```
/// use gyre_core::StageError;
/// use gyre_stage::{Stage, StageContext};
///
/// struct ZeroWindStress;
///
/// impl Stage for ZeroWindStress {
///     fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
///         ctx.state_mut().float_mut("surface_taux")?.fill(0.0);
///         Ok(())
///     }
/// }
/// ```
pub trait Stage: Send + 'static {
    /// Execute the stage once.
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError>;
}

impl<F> Stage for F
where
    F: Fn(&mut StageContext<'_>) -> Result<(), StageError> + Send + 'static,
{
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        self(ctx)
    }
}

/// Registered stage implementations, keyed by [`StageId`].
#[derive(Default)]
pub struct StageSet {
    stages: IndexMap<StageId, Box<dyn Stage>>,
}

impl StageSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `stage` under `id`, returning the one it replaces.
    pub fn insert(&mut self, id: StageId, stage: impl Stage) -> Option<Box<dyn Stage>> {
        self.stages.insert(id, Box::new(stage))
    }

    /// Builder-style [`StageSet::insert`].
    #[must_use]
    pub fn with(mut self, id: StageId, stage: impl Stage) -> Self {
        self.insert(id, stage);
        self
    }

    /// The implementation registered under `id`.
    pub fn get(&self, id: StageId) -> Option<&dyn Stage> {
        self.stages.get(&id).map(|s| s.as_ref())
    }

    /// Whether `id` has an implementation.
    pub fn contains(&self, id: StageId) -> bool {
        self.stages.contains_key(&id)
    }

    /// Registered identifiers in registration order.
    pub fn ids(&self) -> impl Iterator<Item = StageId> + '_ {
        self.stages.keys().copied()
    }

    /// Number of registered stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether no stage is registered.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.stages.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_declaration_order() {
        let mut sorted = StageId::ALL;
        sorted.sort();
        assert_eq!(sorted, StageId::ALL);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = StageId::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), StageId::ALL.len());
    }

    #[test]
    fn idemix_family_shares_one_timer() {
        for id in [
            StageId::IntegrateIdemixM2,
            StageId::IntegrateIdemixNiw,
            StageId::IntegrateIdemix,
            StageId::WaveInteraction,
        ] {
            assert_eq!(id.timer(), Some(TimerKey::Idemix));
        }
        assert_eq!(StageId::Forcing.timer(), None);
        assert_eq!(StageId::Thermodynamics.timer(), Some(TimerKey::Temperature));
    }

    #[test]
    fn insert_replaces_and_reports_previous() {
        let noop = |_: &mut StageContext<'_>| -> Result<(), StageError> { Ok(()) };
        let mut set = StageSet::new();
        assert!(set.insert(StageId::Forcing, noop).is_none());
        assert!(set.insert(StageId::Forcing, noop).is_some());
        assert_eq!(set.len(), 1);
        assert!(set.contains(StageId::Forcing));
        assert!(!set.contains(StageId::Momentum));
        assert_eq!(format!("{set:?}"), "{Forcing}");
    }
}
