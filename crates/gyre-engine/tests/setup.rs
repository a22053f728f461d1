//! Setup-sequence integration tests: ordering, configuration rejection,
//! restart reads.

use gyre_arena::{FieldData, Slot};
use gyre_core::{FieldError, Iteration, StageError};
use gyre_engine::{
    ConfigError, DiagnosticSection, Model, ModelBuilder, RestartError, RestartRecord, RestartStore,
    RunError, SetupStep,
};
use gyre_stage::{PipelineError, StageContext, StageId, StageSet};
use gyre_test_utils::{
    call_log, capture_logs, entries, noop_stage_set, recording_stage_set, test_settings,
    test_settings_builder, test_settings_with, CallLog, FailingStage, MockDiagnostics,
    MockRestartStore, RecordingRestartStore, RecordingStage,
};
use ndarray::{ArrayD, IxDyn};
use tracing::Level;

fn with_setup_recorders(builder: ModelBuilder, log: &CallLog) -> ModelBuilder {
    SetupStep::ALL.iter().fold(builder, |b, &step| {
        b.setup_step(step, RecordingStage::new(step.name(), log))
    })
}

#[test]
fn setup_collaborators_run_in_order() {
    let log = call_log();
    let builder = ModelBuilder::new(test_settings_with(&[("enable_streamfunction", true)]))
        .stages(recording_stage_set(&log))
        .diagnostics(MockDiagnostics::new().with_log(&log));
    with_setup_recorders(builder, &log).build().unwrap();
    assert_eq!(
        entries(&log),
        [
            "grid",
            "coriolis",
            "topography",
            "initial_conditions",
            "forcing",
            "streamfunction_init",
            "diagnostics_init",
        ]
    );
}

#[test]
fn streamfunction_init_is_gated() {
    let log = call_log();
    let builder = ModelBuilder::new(test_settings()).stages(recording_stage_set(&log));
    with_setup_recorders(builder, &log).build().unwrap();
    let log = entries(&log);
    assert!(!log.iter().any(|e| e == "streamfunction_init"));
    assert_eq!(log.last().map(String::as_str), Some("forcing"));
}

#[test]
fn tke_without_implicit_friction_fails_before_restart_read() {
    let log = call_log();
    let mut builder = test_settings_builder();
    builder.set("enable_tke", true).unwrap();
    builder.set("enable_implicit_vert_friction", false).unwrap();
    let diagnostics = MockDiagnostics::new();
    let calls = diagnostics.calls();

    let err = ModelBuilder::new(builder.build())
        .stages(recording_stage_set(&log))
        .diagnostics(diagnostics)
        .restart_store(RecordingRestartStore::new(MockRestartStore::new(), &log))
        .build()
        .err()
        .unwrap();

    assert!(matches!(
        err,
        RunError::Config(ConfigError::TkeWithoutImplicitFriction)
    ));
    assert!(entries(&log).is_empty(), "no collaborator may run");
    assert_eq!(calls.init(), 0);
}

#[test]
fn missing_stage_fails_before_any_collaborator() {
    let log = call_log();
    let settings = test_settings_with(&[("enable_tke", true)]);
    let err = ModelBuilder::new(settings)
        .stages(
            StageId::ALL
                .iter()
                .filter(|&&id| id != StageId::IntegrateTke)
                .fold(StageSet::new(), |set, &id| {
                    set.with(id, RecordingStage::new(id.name(), &log))
                }),
        )
        .restart_store(RecordingRestartStore::new(MockRestartStore::new(), &log))
        .build()
        .err()
        .unwrap();

    assert!(matches!(
        err,
        RunError::Config(ConfigError::Pipeline(PipelineError::MissingStage {
            stage: StageId::IntegrateTke
        }))
    ));
    assert!(entries(&log).is_empty());
}

#[test]
fn setup_failure_propagates_without_snapshot() {
    let diagnostics = MockDiagnostics::new();
    let calls = diagnostics.calls();
    let err = ModelBuilder::new(test_settings())
        .stages(noop_stage_set())
        .setup_step(SetupStep::Topography, FailingStage::new(0))
        .diagnostics(diagnostics)
        .build()
        .err()
        .unwrap();
    match err {
        RunError::Setup { step, source } => {
            assert_eq!(step, SetupStep::Topography);
            assert!(matches!(source, StageError::ExecutionFailed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.snapshots(), 0);
    assert_eq!(calls.init(), 0);
}

#[test]
fn disabled_field_access_fails_fast() {
    let model = ModelBuilder::new(test_settings())
        .stages(noop_stage_set())
        .build()
        .unwrap();
    assert_eq!(
        model.state().float("tke").unwrap_err(),
        FieldError::Unallocated {
            name: "tke".to_string()
        }
    );
    assert!(model.state().float("temp").is_ok());
}

#[test]
fn diagnostic_sections_read_after_base_restart_in_fixed_order() {
    let log = call_log();
    let settings = test_settings_with(&[
        ("enable_diag_particles", true),
        ("enable_diag_averages", true),
        ("enable_diag_energy", true),
    ]);
    let diagnostics = MockDiagnostics::new().with_log(&log);
    let calls = diagnostics.calls();
    ModelBuilder::new(settings)
        .stages(noop_stage_set())
        .diagnostics(diagnostics)
        .restart_store(RecordingRestartStore::new(MockRestartStore::new(), &log))
        .build()
        .unwrap();

    assert_eq!(
        calls.sections(),
        [
            DiagnosticSection::Averages,
            DiagnosticSection::Energy,
            DiagnosticSection::Particles,
        ]
    );
    let log = entries(&log);
    let last_read = log.iter().rposition(|e| e.starts_with("read:")).unwrap();
    let first_section = log.iter().position(|e| e.starts_with("restart_")).unwrap();
    let init = log.iter().position(|e| e == "diagnostics_init").unwrap();
    assert!(init < last_read);
    assert!(last_read < first_section);
}

/// Writes `iteration + 1` into the next level of `u`, so every time
/// level holds a distinct value.
fn stamp_u(ctx: &mut StageContext<'_>) -> Result<(), StageError> {
    let stamp = (ctx.iteration().0 + 1) as f64;
    ctx.state_mut().slot_mut("u", Slot::Next)?.fill(stamp);
    Ok(())
}

fn level(model: &Model, slot: Slot) -> f64 {
    model.state().slot("u", slot).unwrap()[&[0, 0, 0][..]]
}

#[test]
fn restart_round_trip_resumes_state() {
    let store = MockRestartStore::new();
    let mut first = ModelBuilder::new(test_settings())
        .stages(noop_stage_set().with(StageId::Momentum, stamp_u))
        .restart_store(store.clone())
        .build()
        .unwrap();
    first.run().unwrap();
    first.write_restart().unwrap();
    assert_eq!(store.iterations().unwrap(), vec![Iteration(5)]);
    // Five rotations: the physical layout is not the identity.
    assert!(!first.state().time_index().is_identity());
    assert_eq!(level(&first, Slot::Previous), 4.0);
    assert_eq!(level(&first, Slot::Current), 5.0);

    let second = ModelBuilder::new(test_settings())
        .stages(noop_stage_set())
        .restart_store(store)
        .start_iteration(first.iteration())
        .build()
        .unwrap();
    assert_eq!(second.iteration(), Iteration(5));
    assert_eq!(second.end_iteration(), Iteration(10));
    for slot in Slot::ALL {
        assert_eq!(level(&second, slot), level(&first, slot), "{slot} level");
    }
}

#[test]
fn restart_shape_mismatch_is_rejected() {
    let store = MockRestartStore::new();
    store
        .insert(RestartRecord {
            field: "temp".to_string(),
            iteration: Iteration(0),
            data: FieldData::Float(ArrayD::zeros(IxDyn(&[2, 2]))),
        })
        .unwrap();
    let err = ModelBuilder::new(test_settings())
        .stages(noop_stage_set())
        .restart_store(store)
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RunError::Restart(RestartError::Field(FieldError::ShapeMismatch { .. }))
    ));
}

#[test]
fn restart_store_writes_every_allocated_field() {
    let model = ModelBuilder::new(test_settings())
        .stages(noop_stage_set())
        .build()
        .unwrap();
    let mut store = MockRestartStore::new();
    store.write(model.state(), Iteration(0)).unwrap();
    assert_eq!(store.len().unwrap(), model.state().len());
    assert!(store.read("tke", Iteration(0)).unwrap().is_none());
}

#[test]
fn setup_logs_requested_run_length_and_warns_on_truncation() {
    let mut builder = test_settings_builder();
    builder.set("runlen", 11.0).unwrap();
    let (model, output) = capture_logs(Level::INFO, || {
        ModelBuilder::new(builder.build())
            .stages(noop_stage_set())
            .build()
    });
    assert_eq!(model.unwrap().end_iteration(), Iteration(5));
    assert!(output.contains("starting integration for 1.10e1s"), "log was: {output}");
    assert!(output.contains("truncating"), "log was: {output}");
}
