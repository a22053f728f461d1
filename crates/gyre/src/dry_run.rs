//! Configuration dry run.
//!
//! Runs every setup check that needs no physics collaborator (flag
//! consistency, catalog predicates, allocation, step plan, end iteration)
//! and summarises the result.

use std::fmt;

use gyre_arena::{Catalog, ElementType, GridShape, State};
use gyre_core::{Backend, Iteration, Settings};
use gyre_engine::{check_flag_consistency, end_iteration, ConfigError, RunConfig, RunError};
use gyre_stage::StepPlan;

/// One allocated field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSummary {
    /// Field name.
    pub name: &'static str,
    /// Allocated shape, time levels included.
    pub shape: Vec<usize>,
    /// Element type.
    pub element: ElementType,
    /// Physical units.
    pub units: &'static str,
}

/// What a run with these settings would allocate and execute.
#[derive(Clone, Debug)]
pub struct DryRun {
    /// Simulation identifier.
    pub identifier: String,
    /// Name of the selected backend.
    pub backend: String,
    /// Axis extents.
    pub grid: GridShape,
    /// Allocated fields in catalog order.
    pub fields: Vec<FieldSummary>,
    /// Fields whose enable-predicate is false.
    pub disabled: Vec<&'static str>,
    /// Total field storage in bytes.
    pub memory_bytes: usize,
    /// The step plan.
    pub plan: StepPlan,
    /// Per-run inputs.
    pub run: RunConfig,
    /// Iteration a fresh run would stop at.
    pub end_iteration: Iteration,
}

/// Validate `settings` and summarise the run they describe.
pub fn dry_run(
    settings: &Settings,
    backend: &dyn Backend,
    run: RunConfig,
) -> Result<DryRun, RunError> {
    check_flag_consistency(settings)?;
    let catalog = Catalog::ocean().map_err(ConfigError::from)?;
    catalog
        .check_settings(settings)
        .map_err(ConfigError::from)?;
    let grid = GridShape::from_settings(settings)?;
    let state = State::allocate(&catalog, settings, &grid)?;
    let plan = StepPlan::from_settings(settings).map_err(ConfigError::from)?;
    let dt_tracer = settings.float("dt_tracer").map_err(ConfigError::from)?;
    let end = end_iteration(Iteration(0), run.run_length, dt_tracer)?;

    let fields = state
        .iter()
        .map(|(descriptor, data)| FieldSummary {
            name: descriptor.name,
            shape: data.shape().to_vec(),
            element: descriptor.element,
            units: descriptor.units,
        })
        .collect();

    Ok(DryRun {
        identifier: settings
            .text("identifier")
            .map_err(ConfigError::from)?
            .to_string(),
        backend: backend.name().to_string(),
        grid,
        fields,
        disabled: state.disabled_names().collect(),
        memory_bytes: state.memory_bytes(),
        plan,
        run,
        end_iteration: end,
    })
}

impl fmt::Display for DryRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "simulation: {}", self.identifier)?;
        writeln!(f, "backend:    {}", self.backend)?;
        let axes: Vec<String> = self
            .grid
            .iter()
            .map(|(dim, extent)| format!("{dim}={extent}"))
            .collect();
        writeln!(f, "grid:       {}", axes.join(" "))?;
        writeln!(
            f,
            "run:        {} s, {} steps",
            self.run.run_length, self.end_iteration
        )?;
        if let Some(path) = &self.run.profile {
            writeln!(f, "profile:    {}", path.display())?;
        }

        writeln!(
            f,
            "\nallocated fields ({}, {} bytes):",
            self.fields.len(),
            self.memory_bytes
        )?;
        for field in &self.fields {
            writeln!(
                f,
                "  {:<16} {:<4} {:<20} {}",
                field.name,
                field.element.as_str(),
                format!("{:?}", field.shape),
                field.units
            )?;
        }
        if !self.disabled.is_empty() {
            writeln!(f, "\ndisabled fields: {}", self.disabled.join(", "))?;
        }
        writeln!(f, "\nstep plan:")?;
        writeln!(f, "  {}", self.plan)
    }
}
