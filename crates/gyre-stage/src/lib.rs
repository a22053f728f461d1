//! Physics-stage contract and step plan for the Gyre ocean model.
//!
//! A step is a fixed sequence of [`Action`]s. Which stages appear is
//! decided once from the settings by [`StepGates`]; a disabled stage is
//! left out of the [`StepPlan`], never deferred. The numerics of each
//! stage live behind the [`Stage`] trait and are supplied by the caller
//! in a [`StageSet`]. [`validate_plan`] checks at setup that every
//! planned stage has an implementation and every exchanged field exists.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod context;
pub mod plan;
pub mod stage;

pub use boundary::{CyclicBoundary, CyclicX};
pub use context::StageContext;
pub use plan::{validate_plan, Action, PipelineError, StepGates, StepPlan};
pub use stage::{Stage, StageId, StageSet};
