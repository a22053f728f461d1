//! Orchestration engine for the Gyre ocean model.
//!
//! [`ModelBuilder::build`] performs the whole setup sequence (flag
//! consistency, allocation, plan validation, setup collaborators,
//! restart reads, end-iteration arithmetic) and yields a [`Model`].
//! [`Model::run`] drives the step loop until the end iteration; any
//! failure inside it, error or panic, triggers exactly one best-effort
//! panic snapshot before it propagates unchanged.
//!
//! ```text
//! build()                          run()
//! ├── check flags                  └── catch_unwind
//! ├── allocate State                   ├── step() × (end - start)
//! ├── validate StepPlan                │   ├── [main] stages, exchange
//! ├── setup collaborators              │   ├── flush
//! ├── read restart + sections          │   ├── [diagnostics]
//! └── end iteration                    │   └── rotate, iteration += 1
//!                                      ├── on failure: panic snapshot
//!                                      ├── timing summary
//!                                      └── profile
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod model;
pub mod profile;
pub mod restart;
pub mod setup;

pub use config::{check_flag_consistency, end_iteration, RunConfig, DEFAULT_PROFILE_PATH};
pub use diagnostics::{DiagnosticSection, Diagnostics, NullDiagnostics};
pub use error::{ConfigError, RestartError, RunError};
pub use metrics::StepMetrics;
pub use model::{Model, ModelBuilder};
pub use profile::{Profile, PROFILE_START_ITERATION};
pub use restart::{read_restart, MemoryRestartStore, RestartRecord, RestartStore};
pub use setup::SetupStep;
