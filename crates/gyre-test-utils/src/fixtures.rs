//! Reusable stage fixtures.
//!
//! - [`RecordingStage`]: appends its label to a shared [`CallLog`].
//! - [`NoopStage`]: does nothing.
//! - [`FillStage`]: fills one time level of one field with a constant.
//! - [`FailingStage`]: fails deterministically after N calls.
//! - [`PanickingStage`]: panics deterministically after N calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gyre_arena::Slot;
use gyre_core::StageError;
use gyre_stage::{Stage, StageContext, StageId, StageSet};

/// Shared, ordered record of collaborator calls.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A fresh, empty log.
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Snapshot of everything recorded so far.
pub fn entries(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Appends its label to a [`CallLog`] each time it runs.
pub struct RecordingStage {
    pub label: String,
    log: CallLog,
}

impl RecordingStage {
    pub fn new(label: impl Into<String>, log: &CallLog) -> Self {
        Self {
            label: label.into(),
            log: Arc::clone(log),
        }
    }
}

impl Stage for RecordingStage {
    fn run(&self, _ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        self.log.lock().unwrap().push(self.label.clone());
        Ok(())
    }
}

/// A [`RecordingStage`] under every [`StageId`], labelled with its name.
pub fn recording_stage_set(log: &CallLog) -> StageSet {
    StageId::ALL.iter().fold(StageSet::new(), |set, &id| {
        set.with(id, RecordingStage::new(id.name(), log))
    })
}

/// A [`NoopStage`] under every [`StageId`].
pub fn noop_stage_set() -> StageSet {
    StageId::ALL
        .iter()
        .fold(StageSet::new(), |set, &id| set.with(id, NoopStage))
}

/// Does nothing.
pub struct NoopStage;

impl Stage for NoopStage {
    fn run(&self, _ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        Ok(())
    }
}

/// Fills one time level of a time-dependent field with `value`.
pub struct FillStage {
    pub field: &'static str,
    pub slot: Slot,
    pub value: f64,
}

impl FillStage {
    pub fn new(field: &'static str, slot: Slot, value: f64) -> Self {
        Self { field, slot, value }
    }
}

impl Stage for FillStage {
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        ctx.state_mut().slot_mut(self.field, self.slot)?.fill(self.value);
        Ok(())
    }
}

/// Succeeds `succeed_count` times, then fails with `error` on every call.
///
/// The call counter is shared, so it stays readable after the stage is
/// moved into a [`StageSet`].
pub struct FailingStage {
    pub succeed_count: usize,
    pub error: StageError,
    calls: Arc<AtomicUsize>,
}

impl FailingStage {
    /// Fail with [`StageError::ExecutionFailed`] after `succeed_count`
    /// successful calls.
    pub fn new(succeed_count: usize) -> Self {
        Self::with_error(
            succeed_count,
            StageError::ExecutionFailed {
                reason: format!("deliberate failure after {succeed_count} successful calls"),
            },
        )
    }

    pub fn with_error(succeed_count: usize, error: StageError) -> Self {
        Self {
            succeed_count,
            error,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle on the call counter.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Stage for FailingStage {
    fn run(&self, _ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(self.error.clone());
        }
        Ok(())
    }
}

/// Succeeds `succeed_count` times, then panics.
pub struct PanickingStage {
    pub succeed_count: usize,
    calls: AtomicUsize,
}

/// Panic message of [`PanickingStage`].
pub const PANIC_MESSAGE: &str = "deliberate stage panic";

impl PanickingStage {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Stage for PanickingStage {
    fn run(&self, _ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            panic!("{PANIC_MESSAGE}");
        }
        Ok(())
    }
}
