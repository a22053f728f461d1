//! Benchmark profiles for the Gyre ocean model.
//!
//! - [`reference_settings`]: 60 × 40 × 15 grid with TKE and periodic x.
//! - [`stress_settings`]: 200 × 120 × 30 grid with every closure on.
//! - [`BlendStage`]: a cheap but real array workload for one field.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use gyre_arena::Slot;
use gyre_core::{Settings, SettingsBuilder, SettingsError, StageError};
use gyre_engine::{Model, ModelBuilder, RunError};
use gyre_stage::{Stage, StageContext, StageId, StageSet};

fn base(nx: i64, ny: i64, nz: i64) -> Result<SettingsBuilder, SettingsError> {
    let mut builder = SettingsBuilder::new();
    builder
        .set("nx", nx)?
        .set("ny", ny)?
        .set("nz", nz)?
        .set("np", 4_i64)?
        .set("dt_mom", 1800.0)?
        .set("dt_tracer", 1800.0)?
        .set("runlen", 86400.0)?
        .set("enable_implicit_vert_friction", true)?
        .set("enable_cyclic_x", true)?;
    Ok(builder)
}

/// 60 × 40 × 15 grid, TKE closure, periodic in x.
pub fn reference_settings() -> Result<Settings, SettingsError> {
    let mut builder = base(60, 40, 15)?;
    builder.set("enable_tke", true)?;
    Ok(builder.build())
}

/// 200 × 120 × 30 grid with every energy closure on.
pub fn stress_settings() -> Result<Settings, SettingsError> {
    let mut builder = base(200, 120, 30)?;
    for flag in [
        "enable_tke",
        "enable_eke",
        "enable_idemix",
        "enable_idemix_m2",
        "enable_idemix_niw",
    ] {
        builder.set(flag, true)?;
    }
    Ok(builder.build())
}

/// Writes `next = current + weight * (current - previous)` for one field.
pub struct BlendStage {
    /// Field to update.
    pub field: &'static str,
    /// Extrapolation weight.
    pub weight: f64,
}

impl Stage for BlendStage {
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let state = ctx.state_mut();
        let previous = state.slot(self.field, Slot::Previous)?.to_owned();
        let current = state.slot(self.field, Slot::Current)?.to_owned();
        let mut next = state.slot_mut(self.field, Slot::Next)?;
        next.assign(&current);
        next.scaled_add(self.weight, &(&current - &previous));
        Ok(())
    }
}

/// Every stage a no-op except momentum and thermodynamics, which blend
/// `u` and `temp`.
pub fn blend_stages() -> StageSet {
    let noop = |_: &mut StageContext<'_>| -> Result<(), StageError> { Ok(()) };
    StageId::ALL
        .iter()
        .fold(StageSet::new(), |set, &id| set.with(id, noop))
        .with(
            StageId::Momentum,
            BlendStage {
                field: "u",
                weight: 0.5,
            },
        )
        .with(
            StageId::Thermodynamics,
            BlendStage {
                field: "temp",
                weight: 0.5,
            },
        )
}

/// A model over `settings` driven by [`blend_stages`].
pub fn blend_model(settings: Settings) -> Result<Model, RunError> {
    ModelBuilder::new(settings).stages(blend_stages()).build()
}
