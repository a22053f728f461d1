//! Command-line surface of the `gyre` binary.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gyre_core::{Settings, SettingsBuilder};
use gyre_engine::{RunConfig, DEFAULT_PROFILE_PATH};

use crate::logging::LogLevel;

/// Validate an ocean-model configuration and show what a run would do.
#[derive(Debug, Parser)]
#[command(name = "gyre", version, about, long_about = None)]
pub struct CliArgs {
    /// TOML file of setting overrides.
    #[arg(short, long)]
    pub settings: PathBuf,

    /// Array-computation backend.
    #[arg(short, long, default_value = "ndarray")]
    pub backend: String,

    /// Log verbosity. `RUST_LOG` takes precedence when set.
    #[arg(short = 'v', long, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Write logs to this file instead of stderr (truncated).
    #[arg(short, long)]
    pub logfile: Option<PathBuf>,

    /// Record per-step timings to `profile.json`.
    #[arg(short, long)]
    pub profile: bool,
}

impl CliArgs {
    /// Read the settings file and freeze the result.
    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let document = fs::read_to_string(&self.settings)
            .with_context(|| format!("cannot read settings from {}", self.settings.display()))?;
        let mut builder = SettingsBuilder::new();
        builder
            .apply_toml(&document)
            .with_context(|| format!("invalid settings in {}", self.settings.display()))?;
        Ok(builder.build())
    }

    /// Run configuration from `settings`, with profiling as requested.
    pub fn run_config(&self, settings: &Settings) -> anyhow::Result<RunConfig> {
        let run = RunConfig::from_settings(settings)?;
        Ok(if self.profile {
            run.with_profile(DEFAULT_PROFILE_PATH)
        } else {
            run
        })
    }
}
