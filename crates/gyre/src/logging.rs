//! Log subscriber setup for the `gyre` binary.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Verbosity selectable on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Everything, including per-field allocation and swallowed flushes.
    Trace,
    /// Timing summary and per-step durations.
    Debug,
    /// Setup milestones and the current iteration.
    #[default]
    Info,
    /// Truncated run lengths and suppressed snapshot failures.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The filter directive for this level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// `RUST_LOG` if set and valid, else `level`.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber, writing to `logfile` if given and to
/// stderr otherwise.
pub fn init(level: LogLevel, logfile: Option<&Path>) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true);
    let installed = match logfile {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| anyhow!("cannot install log subscriber: {e}"))
}
