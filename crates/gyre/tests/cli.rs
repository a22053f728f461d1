//! Command-line parsing and dry-run tests.

use std::path::PathBuf;

use clap::Parser;
use gyre::cli::CliArgs;
use gyre::dry_run::dry_run;
use gyre::engine::{ConfigError, RunConfig, RunError};
use gyre::logging::LogLevel;
use gyre::types::{Iteration, NdarrayBackend};
use gyre_test_utils::{test_settings, test_settings_builder, test_settings_with};

fn temp_settings(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("gyre-{name}-{}.toml", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn defaults() {
    let args = CliArgs::try_parse_from(["gyre", "--settings", "model.toml"]).unwrap();
    assert_eq!(args.settings, PathBuf::from("model.toml"));
    assert_eq!(args.backend, "ndarray");
    assert_eq!(args.loglevel, LogLevel::Info);
    assert!(args.logfile.is_none());
    assert!(!args.profile);
}

#[test]
fn every_option() {
    let args = CliArgs::try_parse_from([
        "gyre", "-s", "acc.toml", "-b", "ndarray", "-v", "debug", "-l", "run.log", "-p",
    ])
    .unwrap();
    assert_eq!(args.loglevel, LogLevel::Debug);
    assert_eq!(args.logfile, Some(PathBuf::from("run.log")));
    assert!(args.profile);
}

#[test]
fn settings_file_is_required() {
    assert!(CliArgs::try_parse_from(["gyre"]).is_err());
}

#[test]
fn unknown_log_level_is_rejected() {
    assert!(CliArgs::try_parse_from(["gyre", "-s", "m.toml", "--loglevel", "chatty"]).is_err());
}

#[test]
fn profile_flag_enables_default_path() {
    let args = CliArgs::try_parse_from(["gyre", "-s", "m.toml", "--profile"]).unwrap();
    let run = args.run_config(&test_settings()).unwrap();
    assert_eq!(run.profile, Some(PathBuf::from("profile.json")));
    assert_eq!(run.run_length, 10.0);
}

#[test]
fn settings_load_from_toml() {
    let path = temp_settings(
        "load",
        "identifier = \"channel\"\nnx = 12\nny = 8\nnz = 4\ndt_tracer = 600.0\nrunlen = 6000\nenable_eke = true\n",
    );
    let args = CliArgs::try_parse_from(["gyre", "-s", path.to_str().unwrap()]).unwrap();
    let settings = args.load_settings().unwrap();
    assert_eq!(settings.text("identifier").unwrap(), "channel");
    assert_eq!(settings.int("nx").unwrap(), 12);
    assert!(settings.flag("enable_eke").unwrap());

    let report = dry_run(&settings, &NdarrayBackend, args.run_config(&settings).unwrap()).unwrap();
    assert_eq!(report.end_iteration, Iteration(10));
    assert!(report.fields.iter().any(|f| f.name == "eke" && f.shape == [16, 12, 4, 3]));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn unknown_setting_in_file_is_an_error() {
    let path = temp_settings("unknown", "enable_warp_drive = true\n");
    let args = CliArgs::try_parse_from(["gyre", "-s", path.to_str().unwrap()]).unwrap();
    let err = args.load_settings().unwrap_err();
    assert!(format!("{err:#}").contains("enable_warp_drive"));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn missing_settings_file_names_the_path() {
    let args = CliArgs::try_parse_from(["gyre", "-s", "/nonexistent/gyre.toml"]).unwrap();
    let err = args.load_settings().unwrap_err();
    assert!(err.to_string().contains("/nonexistent/gyre.toml"));
}

#[test]
fn dry_run_lists_fields_and_plan() {
    let settings = test_settings_with(&[("enable_tke", true), ("enable_cyclic_x", true)]);
    let report = dry_run(
        &settings,
        &NdarrayBackend,
        RunConfig::from_settings(&settings).unwrap(),
    )
    .unwrap();
    assert!(report.fields.iter().any(|f| f.name == "tke"));
    assert!(report.disabled.contains(&"eke"));
    assert_eq!(report.end_iteration, Iteration(5));

    let text = report.to_string();
    assert!(text.contains("backend:    ndarray"));
    assert!(text.contains("integrate_tke"));
    assert!(text.contains("cyclic_x(u, v, tke)"));
    assert!(text.contains("disabled fields:"));
}

#[test]
fn dry_run_rejects_tke_without_implicit_friction() {
    let mut builder = test_settings_builder();
    builder.set("enable_tke", true).unwrap();
    builder.set("enable_implicit_vert_friction", false).unwrap();
    let settings = builder.build();
    let err = dry_run(
        &settings,
        &NdarrayBackend,
        RunConfig::from_settings(&settings).unwrap(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RunError::Config(ConfigError::TkeWithoutImplicitFriction)
    ));
}

#[test]
fn log_levels_map_to_filter_directives() {
    assert_eq!(LogLevel::Trace.as_str(), "trace");
    assert_eq!(LogLevel::default(), LogLevel::Info);
    assert_eq!(LogLevel::Error.as_str(), "error");
}
