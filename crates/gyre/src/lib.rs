//! Gyre: the orchestration core of a finite-difference ocean model.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Gyre sub-crates, plus the command-line surface of the `gyre`
//! binary.
//!
//! # Quick start
//!
//! ```rust
//! use gyre::prelude::*;
//!
//! let mut settings = SettingsBuilder::new();
//! settings
//!     .set("nx", 8_i64)?
//!     .set("ny", 4_i64)?
//!     .set("nz", 2_i64)?
//!     .set("dt_tracer", 3600.0)?
//!     .set("runlen", 4.0 * 3600.0)?;
//!
//! let noop = |_: &mut StageContext<'_>| -> Result<(), StageError> { Ok(()) };
//! let stages = StageId::ALL
//!     .iter()
//!     .fold(StageSet::new(), |set, &id| set.with(id, noop));
//!
//! let mut model = ModelBuilder::new(settings.build()).stages(stages).build()?;
//! model.run()?;
//! assert_eq!(model.iteration(), Iteration(4));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `gyre-core` | Settings, iteration counter, errors, timers, backends |
//! | [`arena`] | `gyre-arena` | Variable catalog, grid shapes, state, time levels |
//! | [`stage`] | `gyre-stage` | Stage trait, step plan, periodic boundary |
//! | [`engine`] | `gyre-engine` | Setup, step loop, restart, diagnostics, profiling |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Settings, iteration counter, error taxonomy, timers and array
/// backends (`gyre-core`).
pub use gyre_core as types;

/// Variable catalog, grid shapes, model state and time levels
/// (`gyre-arena`).
pub use gyre_arena as arena;

/// The [`stage::Stage`] trait, step plan and periodic boundary
/// (`gyre-stage`).
pub use gyre_stage as stage;

/// Setup sequence, step loop, restart and failure handling
/// (`gyre-engine`).
pub use gyre_engine as engine;

pub mod cli;
pub mod dry_run;
pub mod logging;

/// Common imports for typical Gyre usage.
pub mod prelude {
    // Core
    pub use gyre_core::{
        Iteration, Settings, SettingsBuilder, StageError, TimerKey, Timers,
    };

    // State
    pub use gyre_arena::{Catalog, FieldData, GridShape, Slot, State};

    // Stages
    pub use gyre_stage::{Stage, StageContext, StageId, StageSet, StepPlan};

    // Engine
    pub use gyre_engine::{
        Diagnostics, Model, ModelBuilder, RestartStore, RunConfig, RunError, StepMetrics,
    };
}
