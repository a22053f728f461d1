//! Test utilities and mock collaborators for Gyre development.
//!
//! Provides stage fixtures (see [`fixtures`]), a [`MockDiagnostics`] that
//! counts its calls and can be told to misbehave, a
//! [`RecordingRestartStore`], log capture (see [`logs`]), and small
//! settings for fast tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod logs;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gyre_arena::State;
use gyre_core::{Iteration, Settings, SettingsBuilder, SnapshotError, StageError};
use gyre_engine::{
    DiagnosticSection, Diagnostics, RestartError, RestartRecord, RestartStore, RunConfig,
};

pub use fixtures::{
    call_log, entries, noop_stage_set, recording_stage_set, CallLog, FailingStage, FillStage,
    NoopStage, PanickingStage, RecordingStage, PANIC_MESSAGE,
};
pub use gyre_engine::MemoryRestartStore as MockRestartStore;
pub use logs::capture_logs;

// ── Settings ───────────────────────────────────────────────────────

/// Builder with a 6 × 4 × 3 grid, a 2 s tracer step, a 10 s run, and
/// implicit vertical friction on.
pub fn test_settings_builder() -> SettingsBuilder {
    let mut builder = SettingsBuilder::new();
    builder.set("nx", 6_i64).unwrap();
    builder.set("ny", 4_i64).unwrap();
    builder.set("nz", 3_i64).unwrap();
    builder.set("np", 2_i64).unwrap();
    builder.set("nisle", 1_i64).unwrap();
    builder.set("dt_mom", 2.0).unwrap();
    builder.set("dt_tracer", 2.0).unwrap();
    builder.set("runlen", 10.0).unwrap();
    builder.set("enable_implicit_vert_friction", true).unwrap();
    builder
}

/// [`test_settings_builder`] with `overrides` applied, frozen.
pub fn test_settings_with(overrides: &[(&str, bool)]) -> Settings {
    let mut builder = test_settings_builder();
    for &(name, value) in overrides {
        builder.set(name, value).unwrap();
    }
    builder.build()
}

/// [`test_settings_builder`], frozen.
pub fn test_settings() -> Settings {
    test_settings_builder().build()
}

// ── MockDiagnostics ────────────────────────────────────────────────

/// What [`MockDiagnostics::panic_snapshot`] does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SnapshotBehavior {
    #[default]
    Succeed,
    Fail,
    Panic,
}

/// Calls observed by a [`MockDiagnostics`], shared with the test.
#[derive(Debug, Default)]
pub struct DiagnosticsCalls {
    init: AtomicUsize,
    diagnose: AtomicUsize,
    snapshots: Mutex<Vec<Iteration>>,
    sections: Mutex<Vec<DiagnosticSection>>,
}

impl DiagnosticsCalls {
    pub fn init(&self) -> usize {
        self.init.load(Ordering::Relaxed)
    }

    pub fn diagnose(&self) -> usize {
        self.diagnose.load(Ordering::Relaxed)
    }

    /// Number of panic snapshots attempted.
    pub fn snapshots(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    /// Iteration counter seen by each snapshot attempt.
    pub fn snapshot_iterations(&self) -> Vec<Iteration> {
        self.snapshots.lock().unwrap().clone()
    }

    /// Restart sections read, in order.
    pub fn sections(&self) -> Vec<DiagnosticSection> {
        self.sections.lock().unwrap().clone()
    }
}

/// Diagnostics that count calls and misbehave on request.
#[derive(Default)]
pub struct MockDiagnostics {
    calls: Arc<DiagnosticsCalls>,
    snapshot: SnapshotBehavior,
    fail_diagnose_at: Option<Iteration>,
    log: Option<CallLog>,
}

impl MockDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the calls made so far.
    pub fn calls(&self) -> Arc<DiagnosticsCalls> {
        Arc::clone(&self.calls)
    }

    pub fn snapshot(mut self, behavior: SnapshotBehavior) -> Self {
        self.snapshot = behavior;
        self
    }

    /// Fail `diagnose` when called for `iteration`.
    pub fn failing_diagnose_at(mut self, iteration: Iteration) -> Self {
        self.fail_diagnose_at = Some(iteration);
        self
    }

    /// Also append `diagnostics` entries to `log`.
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    fn record(&self, entry: String) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(entry);
        }
    }
}

impl Diagnostics for MockDiagnostics {
    fn init(&mut self, _: &State, _: &Settings, _: &RunConfig) -> Result<(), StageError> {
        self.calls.init.fetch_add(1, Ordering::Relaxed);
        self.record("diagnostics_init".to_string());
        Ok(())
    }

    fn read_restart(
        &mut self,
        section: DiagnosticSection,
        _: &mut State,
        _: Iteration,
    ) -> Result<(), StageError> {
        self.calls.sections.lock().unwrap().push(section);
        self.record(format!("restart_{section}"));
        Ok(())
    }

    fn diagnose(&mut self, _: &State, _: &Settings, iteration: Iteration) -> Result<(), StageError> {
        self.calls.diagnose.fetch_add(1, Ordering::Relaxed);
        self.record("diagnostics".to_string());
        if self.fail_diagnose_at == Some(iteration) {
            return Err(StageError::ExecutionFailed {
                reason: format!("diagnostics failed at iteration {iteration}"),
            });
        }
        Ok(())
    }

    fn panic_snapshot(&mut self, _: &State, iteration: Iteration) -> Result<(), SnapshotError> {
        self.calls.snapshots.lock().unwrap().push(iteration);
        match self.snapshot {
            SnapshotBehavior::Succeed => Ok(()),
            SnapshotBehavior::Fail => Err(SnapshotError {
                reason: "disk full".to_string(),
            }),
            SnapshotBehavior::Panic => panic!("snapshot writer panicked"),
        }
    }
}

// ── RecordingRestartStore ──────────────────────────────────────────

/// A [`MockRestartStore`] that also logs every read as `read:<field>`.
#[derive(Clone)]
pub struct RecordingRestartStore {
    pub inner: MockRestartStore,
    log: CallLog,
}

impl RecordingRestartStore {
    pub fn new(inner: MockRestartStore, log: &CallLog) -> Self {
        Self {
            inner,
            log: Arc::clone(log),
        }
    }
}

impl RestartStore for RecordingRestartStore {
    fn read(
        &self,
        field: &str,
        iteration: Iteration,
    ) -> Result<Option<RestartRecord>, RestartError> {
        self.log.lock().unwrap().push(format!("read:{field}"));
        self.inner.read(field, iteration)
    }

    fn write(&mut self, state: &State, iteration: Iteration) -> Result<(), RestartError> {
        self.inner.write(state, iteration)
    }
}
