//! Setup collaborators.

use std::fmt;

/// One externally supplied initialisation step, run once during
/// [`ModelBuilder::build`](crate::ModelBuilder::build) after allocation.
///
/// Steps run in declaration order. The forcing stage runs once between
/// [`SetupStep::InitialConditions`] and [`SetupStep::StreamfunctionInit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetupStep {
    /// Grid spacings and metric factors.
    Grid,
    /// Coriolis parameters.
    Coriolis,
    /// Bottom topography and masks.
    Topography,
    /// Initial tracer and velocity fields.
    InitialConditions,
    /// Island boundaries and line integrals of the streamfunction solver.
    /// Runs only with `enable_streamfunction`.
    StreamfunctionInit,
}

impl SetupStep {
    /// Every step, in execution order.
    pub const ALL: [SetupStep; 5] = [
        Self::Grid,
        Self::Coriolis,
        Self::Topography,
        Self::InitialConditions,
        Self::StreamfunctionInit,
    ];

    /// Snake-case name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Coriolis => "coriolis",
            Self::Topography => "topography",
            Self::InitialConditions => "initial_conditions",
            Self::StreamfunctionInit => "streamfunction_init",
        }
    }

    /// The flag gating this step, if any.
    pub fn gate(self) -> Option<&'static str> {
        match self {
            Self::StreamfunctionInit => Some("enable_streamfunction"),
            _ => None,
        }
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
