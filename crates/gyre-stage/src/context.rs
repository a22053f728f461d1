//! Execution context passed to stages.

use gyre_arena::State;
use gyre_core::{Iteration, Settings, Timers};

/// Everything a [`Stage`](crate::Stage) may touch during one call.
///
/// The stage gets unrestricted read/write access to the whole
/// [`State`] for the duration of the call. Settings are frozen.
/// [`Timers`] is exposed so that collaborators can time their own
/// sub-phases (pressure solve, friction, vertical mixing, ...).
pub struct StageContext<'a> {
    state: &'a mut State,
    settings: &'a Settings,
    timers: &'a Timers,
    iteration: Iteration,
}

impl<'a> StageContext<'a> {
    /// Construct a context. Typically called by the engine; tests build
    /// one directly.
    pub fn new(
        state: &'a mut State,
        settings: &'a Settings,
        timers: &'a Timers,
        iteration: Iteration,
    ) -> Self {
        Self {
            state,
            settings,
            timers,
            iteration,
        }
    }

    /// Model state.
    pub fn state(&self) -> &State {
        self.state
    }

    /// Model state, mutably.
    pub fn state_mut(&mut self) -> &mut State {
        self.state
    }

    /// Frozen run settings.
    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// The model's timers.
    pub fn timers(&self) -> &Timers {
        self.timers
    }

    /// Iteration being computed.
    pub fn iteration(&self) -> Iteration {
        self.iteration
    }
}
