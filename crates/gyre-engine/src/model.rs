//! The model: setup, step executor, and run loop.
//!
//! [`ModelBuilder`] collects the collaborators and settings, then
//! [`ModelBuilder::build`] runs the whole setup sequence. [`Model::step`]
//! advances one iteration through the validated [`StepPlan`];
//! [`Model::run`] loops to the end iteration and owns the failure path.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use gyre_arena::{Catalog, GridShape, Slot, State};
use gyre_core::{
    Backend, BackendError, Iteration, NdarrayBackend, Settings, TimerKey, Timers,
};
use gyre_stage::{
    validate_plan, Action, CyclicBoundary, CyclicX, PipelineError, Stage, StageContext, StageId,
    StageSet, StepPlan,
};
use indexmap::IndexMap;
use tracing::{debug, error, info, trace, warn};

use crate::config::{check_flag_consistency, end_iteration, RunConfig};
use crate::diagnostics::{DiagnosticSection, Diagnostics, NullDiagnostics};
use crate::error::{ConfigError, RunError};
use crate::metrics::StepMetrics;
use crate::profile::{Profile, Profiler};
use crate::restart::{read_restart, MemoryRestartStore, RestartStore};
use crate::setup::SetupStep;

// Compile-time assertion: Model is Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Model>();
    }
};

// ── ModelBuilder ───────────────────────────────────────────────────

/// Collaborators and configuration for one [`Model`].
///
/// Everything except the settings has a default: the built-in ocean
/// catalog, a grid derived from the settings, the `ndarray` backend,
/// periodic exchange along x, diagnostics that write nothing, and an
/// empty in-memory restart store. Physics stages have no default; the
/// step plan decides which ones must be registered.
pub struct ModelBuilder {
    settings: Settings,
    catalog: Option<Catalog>,
    grid: Option<GridShape>,
    stages: StageSet,
    setup: IndexMap<SetupStep, Box<dyn Stage>>,
    boundary: Box<dyn CyclicBoundary>,
    backend: Box<dyn Backend>,
    diagnostics: Box<dyn Diagnostics>,
    restart: Box<dyn RestartStore>,
    run: Option<RunConfig>,
    start: Iteration,
}

impl ModelBuilder {
    /// Start from frozen `settings`.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            catalog: None,
            grid: None,
            stages: StageSet::new(),
            setup: IndexMap::new(),
            boundary: Box::new(CyclicX::default()),
            backend: Box::new(NdarrayBackend),
            diagnostics: Box::new(NullDiagnostics),
            restart: Box::new(MemoryRestartStore::new()),
            run: None,
            start: Iteration(0),
        }
    }

    /// Use `catalog` instead of [`Catalog::ocean`].
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Use `grid` instead of [`GridShape::from_settings`].
    pub fn grid(mut self, grid: GridShape) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Replace every registered physics stage.
    pub fn stages(mut self, stages: StageSet) -> Self {
        self.stages = stages;
        self
    }

    /// Register one physics stage.
    pub fn stage(mut self, id: StageId, stage: impl Stage) -> Self {
        self.stages.insert(id, stage);
        self
    }

    /// Register a setup collaborator. Unregistered steps are skipped.
    pub fn setup_step(mut self, step: SetupStep, stage: impl Stage) -> Self {
        self.setup.insert(step, Box::new(stage));
        self
    }

    /// Periodic boundary used by the exchange action.
    pub fn boundary(mut self, boundary: impl CyclicBoundary + 'static) -> Self {
        self.boundary = Box::new(boundary);
        self
    }

    /// Array backend, typically from [`gyre_core::backend_by_name`].
    pub fn backend(mut self, backend: Box<dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    /// Diagnostics collaborator.
    pub fn diagnostics(mut self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    /// Restart store read during setup and written by
    /// [`Model::write_restart`].
    pub fn restart_store(mut self, store: impl RestartStore + 'static) -> Self {
        self.restart = Box::new(store);
        self
    }

    /// Per-run inputs. Defaults to [`RunConfig::from_settings`].
    pub fn run_config(mut self, run: RunConfig) -> Self {
        self.run = Some(run);
        self
    }

    /// Iteration to resume from; restarts are read at this iteration.
    pub fn start_iteration(mut self, start: Iteration) -> Self {
        self.start = start;
        self
    }

    /// Run the setup sequence and return a model ready to step.
    ///
    /// Every check that can reject the configuration runs before any
    /// collaborator is called, and before any restart read. A failure here
    /// propagates as is; no panic snapshot is taken during setup.
    pub fn build(self) -> Result<Model, RunError> {
        let Self {
            settings,
            catalog,
            grid,
            stages,
            setup,
            boundary,
            backend,
            mut diagnostics,
            restart,
            run,
            start,
        } = self;

        let timers = Timers::new();
        let setup_timer = timers.scope(TimerKey::Setup);
        info!(backend = backend.name(), "setting up everything");

        check_flag_consistency(&settings)?;
        let catalog = match catalog {
            Some(catalog) => catalog,
            None => Catalog::ocean().map_err(ConfigError::from)?,
        };
        catalog
            .check_settings(&settings)
            .map_err(ConfigError::from)?;
        let run = match run {
            Some(run) => run,
            None => RunConfig::from_settings(&settings)?,
        };
        let dt_tracer = settings.float("dt_tracer").map_err(ConfigError::from)?;
        let end = end_iteration(start, run.run_length, dt_tracer)?;

        let grid = match grid {
            Some(grid) => grid,
            None => GridShape::from_settings(&settings)?,
        };
        let mut state = State::allocate(&catalog, &settings, &grid)?;

        let plan = StepPlan::from_settings(&settings).map_err(ConfigError::from)?;
        validate_plan(&plan, &stages, &state).map_err(ConfigError::from)?;
        debug!(%plan, "step plan");

        for step in SetupStep::ALL {
            if step == SetupStep::StreamfunctionInit {
                // Initial forcing, once, between initial conditions and the
                // streamfunction.
                let forcing = stages
                    .get(StageId::Forcing)
                    .ok_or(PipelineError::MissingStage {
                        stage: StageId::Forcing,
                    })
                    .map_err(ConfigError::from)?;
                let mut ctx = StageContext::new(&mut state, &settings, &timers, start);
                forcing.run(&mut ctx).map_err(|source| RunError::Stage {
                    stage: StageId::Forcing,
                    source,
                })?;
            }
            if let Some(flag) = step.gate() {
                if !settings.flag(flag).map_err(ConfigError::from)? {
                    debug!(%step, flag, "disabled; skipping");
                    continue;
                }
            }
            let Some(collaborator) = setup.get(&step) else {
                debug!(%step, "no collaborator registered; skipping");
                continue;
            };
            debug!(%step, "running setup step");
            let mut ctx = StageContext::new(&mut state, &settings, &timers, start);
            collaborator
                .run(&mut ctx)
                .map_err(|source| RunError::Setup { step, source })?;
        }
        diagnostics
            .init(&state, &settings, &run)
            .map_err(|source| RunError::Diagnostics { source })?;

        read_restart(restart.as_ref(), &mut state, start)?;
        for section in DiagnosticSection::ALL {
            if !settings.flag(section.flag()).map_err(ConfigError::from)? {
                continue;
            }
            debug!(%section, "reading diagnostic restart");
            diagnostics
                .read_restart(section, &mut state, start)
                .map_err(|source| RunError::Diagnostics { source })?;
        }

        info!("starting integration for {:.2e}s", run.run_length);
        info!("from time step {} to {}", start, end);
        drop(setup_timer);

        let profiler = run.profile.clone().map(Profiler::new);
        Ok(Model {
            settings,
            catalog,
            state,
            plan,
            stages,
            boundary,
            backend,
            diagnostics,
            restart,
            timers,
            run,
            iteration: start,
            end,
            last_metrics: StepMetrics::default(),
            profiler,
        })
    }
}

// ── Model ──────────────────────────────────────────────────────────

/// A fully set-up model.
///
/// `Model` is [`Send`] but not [`Sync`]: the step loop is single-threaded
/// and every stage gets exclusive access to the [`State`] for the
/// duration of its call.
pub struct Model {
    settings: Settings,
    catalog: Catalog,
    state: State,
    plan: StepPlan,
    stages: StageSet,
    boundary: Box<dyn CyclicBoundary>,
    backend: Box<dyn Backend>,
    diagnostics: Box<dyn Diagnostics>,
    restart: Box<dyn RestartStore>,
    timers: Timers,
    run: RunConfig,
    iteration: Iteration,
    end: Iteration,
    last_metrics: StepMetrics,
    profiler: Option<Profiler>,
}

impl Model {
    /// Advance one iteration.
    ///
    /// Runs every action of the plan in order, then rotates the time
    /// levels and increments the iteration counter. On error nothing
    /// after the failing action runs: time levels are not rotated and
    /// the counter stays put.
    pub fn step(&mut self) -> Result<&StepMetrics, RunError> {
        let step_start = Instant::now();
        let iteration = self.iteration;

        let mut stage_us = Vec::with_capacity(self.plan.len());
        let mut main = Some(self.timers.scope(TimerKey::Main));
        for action in self.plan.actions() {
            let action_start = Instant::now();
            match action {
                Action::Stage(id) => {
                    let stage = self
                        .stages
                        .get(*id)
                        .ok_or(PipelineError::MissingStage { stage: *id })
                        .map_err(ConfigError::from)?;
                    let _timer = id.timer().map(|key| self.timers.scope(key));
                    let mut ctx =
                        StageContext::new(&mut self.state, &self.settings, &self.timers, iteration);
                    stage.run(&mut ctx).map_err(|source| RunError::Stage {
                        stage: *id,
                        source,
                    })?;
                }
                Action::Exchange(fields) => {
                    for &field in fields {
                        let slot = self.state.slot_mut(field, Slot::Next)?;
                        self.boundary
                            .apply_cyclic(slot)
                            .map_err(|source| RunError::Exchange {
                                field: field.to_string(),
                                source,
                            })?;
                    }
                }
                Action::Flush => {
                    drop(main.take());
                    match self.backend.flush() {
                        Ok(()) => {}
                        Err(BackendError::Unsupported { .. }) => {
                            trace!(backend = self.backend.name(), "flush not supported; skipped");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Action::Diagnose => {
                    let _timer = self.timers.scope(TimerKey::Diagnostics);
                    self.diagnostics
                        .diagnose(&self.state, &self.settings, iteration)
                        .map_err(|source| RunError::Diagnostics { source })?;
                }
            }
            stage_us.push((
                action_label(action).to_string(),
                action_start.elapsed().as_micros() as u64,
            ));
        }
        drop(main);

        self.state.advance_time();
        self.iteration = iteration.next();

        let total = step_start.elapsed();
        info!("current iteration: {}", self.iteration);
        debug!("time step took {:.2e}s", total.as_secs_f64());
        self.last_metrics = StepMetrics {
            iteration: iteration.0,
            total_us: total.as_micros() as u64,
            stage_us,
            memory_bytes: self.state.memory_bytes(),
        };
        if let Some(profiler) = &mut self.profiler {
            profiler.record(&self.last_metrics);
        }
        Ok(&self.last_metrics)
    }

    /// Step until the end iteration.
    ///
    /// On any failure, a returned error or a panic, the diagnostics
    /// collaborator's panic snapshot is attempted exactly once. Whatever
    /// happens to it, the timing summary is then logged, the profile is
    /// written if profiling is on, and the original failure propagates
    /// unchanged: errors are returned, panics resume unwinding.
    pub fn run(&mut self) -> Result<(), RunError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.integrate()));
        if !matches!(outcome, Ok(Ok(()))) {
            self.take_panic_snapshot();
        }
        self.timers.report();
        let profiled = self.write_profile();

        match outcome {
            Ok(Ok(())) => profiled,
            Ok(Err(e)) => {
                if let Err(profile_error) = profiled {
                    warn!(error = %profile_error, "profile lost after failed run");
                }
                Err(e)
            }
            Err(payload) => {
                if let Err(profile_error) = profiled {
                    warn!(error = %profile_error, "profile lost after failed run");
                }
                panic::resume_unwind(payload)
            }
        }
    }

    fn integrate(&mut self) -> Result<(), RunError> {
        while self.iteration < self.end {
            self.step()?;
        }
        Ok(())
    }

    fn take_panic_snapshot(&mut self) {
        let iteration = self.iteration;
        error!(%iteration, "stopping integration; writing panic snapshot");
        let diagnostics = &mut self.diagnostics;
        let state = &self.state;
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| diagnostics.panic_snapshot(state, iteration)));
        match outcome {
            Ok(Ok(())) => info!(%iteration, "panic snapshot written"),
            Ok(Err(e)) => warn!(error = %e, "panic snapshot failed; suppressed"),
            Err(_) => warn!("panic snapshot panicked; suppressed"),
        }
    }

    fn write_profile(&self) -> Result<(), RunError> {
        match &self.profiler {
            Some(profiler) => profiler.write().map(|_| ()),
            None => Ok(()),
        }
    }

    /// Persist the current state through the restart store.
    pub fn write_restart(&mut self) -> Result<(), RunError> {
        self.restart.write(&self.state, self.iteration)?;
        info!(iteration = %self.iteration, "restart written");
        Ok(())
    }

    /// The model state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Mutable model state, for drivers that set fields between steps.
    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// The frozen settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The catalog the state was allocated from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run timers.
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// The per-run inputs.
    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    /// The iteration the next step computes.
    pub fn iteration(&self) -> Iteration {
        self.iteration
    }

    /// The iteration at which [`Model::run`] stops.
    pub fn end_iteration(&self) -> Iteration {
        self.end
    }

    /// The validated step plan.
    pub fn plan(&self) -> &StepPlan {
        &self.plan
    }

    /// Metrics of the most recent completed step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// The profile recorded so far, if profiling is on.
    pub fn profile(&self) -> Option<&Profile> {
        self.profiler.as_ref().map(Profiler::profile)
    }
}

fn action_label(action: &Action) -> &'static str {
    match action {
        Action::Stage(id) => id.name(),
        Action::Exchange(_) => "cyclic_x",
        Action::Flush => "flush",
        Action::Diagnose => "diagnostics",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gyre_core::{SettingsBuilder, StageError};

    fn noop(_: &mut StageContext<'_>) -> Result<(), StageError> {
        Ok(())
    }

    fn settings(runlen: f64) -> Settings {
        let mut builder = SettingsBuilder::new();
        builder.set("nx", 4_i64).unwrap();
        builder.set("ny", 3_i64).unwrap();
        builder.set("nz", 2_i64).unwrap();
        builder.set("dt_tracer", 2.0).unwrap();
        builder.set("runlen", runlen).unwrap();
        builder.build()
    }

    fn all_stages() -> StageSet {
        StageId::ALL
            .iter()
            .fold(StageSet::new(), |set, &id| set.with(id, noop))
    }

    #[test]
    fn build_computes_end_iteration() {
        let model = ModelBuilder::new(settings(10.0))
            .stages(all_stages())
            .start_iteration(Iteration(7))
            .build()
            .unwrap();
        assert_eq!(model.iteration(), Iteration(7));
        assert_eq!(model.end_iteration(), Iteration(12));
        assert!(!model.timers().is_running(TimerKey::Setup));
    }

    #[test]
    fn missing_stage_is_a_config_error() {
        let err = ModelBuilder::new(settings(10.0)).build().err().unwrap();
        assert!(matches!(
            err,
            RunError::Config(ConfigError::Pipeline(PipelineError::MissingStage {
                stage: StageId::Forcing
            }))
        ));
    }

    #[test]
    fn step_rotates_and_counts() {
        let mut model = ModelBuilder::new(settings(4.0))
            .stages(all_stages())
            .build()
            .unwrap();
        let before = model.state().time_index();
        let metrics = model.step().unwrap().clone();
        assert_eq!(metrics.iteration, 0);
        assert!(metrics.stage("momentum").is_some());
        assert!(metrics.stage("flush").is_some());
        assert_eq!(model.iteration(), Iteration(1));
        assert_eq!(model.state().time_index(), before.rotated());
        assert!(!model.timers().is_running(TimerKey::Main));
    }

    #[test]
    fn run_stops_at_end_iteration() {
        let mut model = ModelBuilder::new(settings(7.0))
            .stages(all_stages())
            .build()
            .unwrap();
        model.run().unwrap();
        assert_eq!(model.iteration(), Iteration(3));
        assert_eq!(model.last_metrics().iteration, 2);
        assert!(model.profile().is_none());
    }

    #[test]
    fn action_labels_match_timer_names() {
        assert_eq!(action_label(&Action::Stage(StageId::Momentum)), "momentum");
        assert_eq!(action_label(&Action::Exchange(vec!["u"])), "cyclic_x");
        assert_eq!(action_label(&Action::Diagnose), "diagnostics");
    }
}
