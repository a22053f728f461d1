//! Named, nestable run timers.
//!
//! [`Timers`] holds one cumulative accumulator per [`TimerKey`]. Timing
//! is only possible through scoped acquisition: [`Timers::scope`] starts a
//! timer and returns a [`TimerGuard`] that stops it exactly once when
//! dropped, whether the scope ends normally, through `?`, or by
//! unwinding. Timers nest: a child scope opened while its parent runs
//! contributes to both.

use std::cell::Cell;
use std::time::{Duration, Instant};

use tracing::debug;

/// Identifies one of the model's timers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    /// Model setup, allocation and restart reads.
    Setup,
    /// One step of the main loop, excluding flush and diagnostics.
    Main,
    /// Momentum stage.
    Momentum,
    /// Thermodynamics stage.
    Temperature,
    /// Eddy kinetic energy integration.
    Eke,
    /// Internal-wave energy integrations.
    Idemix,
    /// Turbulent kinetic energy integration.
    Tke,
    /// Diagnostics stage.
    Diagnostics,
    /// Pressure solve, inside momentum.
    Pressure,
    /// Friction, inside momentum.
    Friction,
    /// Lateral and isoneutral mixing, inside thermodynamics.
    Isoneutral,
    /// Vertical mixing, inside thermodynamics.
    Vmix,
    /// Equation of state, inside thermodynamics.
    EqOfState,
}

impl TimerKey {
    /// Every timer, in report order.
    pub const ALL: [TimerKey; 13] = [
        Self::Setup,
        Self::Main,
        Self::Momentum,
        Self::Pressure,
        Self::Friction,
        Self::Temperature,
        Self::Isoneutral,
        Self::Vmix,
        Self::EqOfState,
        Self::Eke,
        Self::Idemix,
        Self::Tke,
        Self::Diagnostics,
    ];

    /// Short name used in logs and profiles.
    pub fn name(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Main => "main",
            Self::Momentum => "momentum",
            Self::Temperature => "temperature",
            Self::Eke => "eke",
            Self::Idemix => "idemix",
            Self::Tke => "tke",
            Self::Diagnostics => "diagnostics",
            Self::Pressure => "pressure",
            Self::Friction => "friction",
            Self::Isoneutral => "isoneutral",
            Self::Vmix => "vmix",
            Self::EqOfState => "eq_of_state",
        }
    }

    /// Label and indentation depth in the timing summary.
    fn summary_label(self) -> (&'static str, usize) {
        match self {
            Self::Setup => ("setup time summary", 0),
            Self::Main => ("main loop time summary", 0),
            Self::Momentum => ("momentum", 1),
            Self::Pressure => ("pressure", 2),
            Self::Friction => ("friction", 2),
            Self::Temperature => ("thermodynamics", 1),
            Self::Isoneutral => ("lateral mixing", 2),
            Self::Vmix => ("vertical mixing", 2),
            Self::EqOfState => ("equation of state", 2),
            Self::Eke => ("EKE", 1),
            Self::Idemix => ("IDEMIX", 1),
            Self::Tke => ("TKE", 1),
            Self::Diagnostics => ("diagnostics", 0),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
struct Timer {
    total: Cell<Duration>,
    last: Cell<Duration>,
    started: Cell<Option<Instant>>,
}

/// Cumulative accumulators for every [`TimerKey`].
///
/// Created once per model and never reset; values accumulate over the
/// whole run. Interior mutability lets nested scopes coexist behind a
/// shared reference. The engine is single-threaded, so `Timers` is `Send`
/// but not `Sync`.
#[derive(Debug, Default)]
pub struct Timers {
    timers: [Timer; 13],
}

impl Timers {
    /// Fresh timers, all at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `key` and return a guard that stops it when dropped.
    ///
    /// Opening a scope on a timer that is already running yields an inert
    /// guard; the outer scope keeps ownership of the measurement.
    pub fn scope(&self, key: TimerKey) -> TimerGuard<'_> {
        let timer = &self.timers[key.index()];
        let owns = timer.started.get().is_none();
        if owns {
            timer.started.set(Some(Instant::now()));
        }
        TimerGuard { timer, owns }
    }

    /// Cumulative time of `key`, including a scope still in progress.
    pub fn elapsed(&self, key: TimerKey) -> Duration {
        let timer = &self.timers[key.index()];
        let running = timer
            .started
            .get()
            .map(|start| start.elapsed())
            .unwrap_or_default();
        timer.total.get() + running
    }

    /// Duration of the most recently completed scope of `key`.
    pub fn last(&self, key: TimerKey) -> Duration {
        self.timers[key.index()].last.get()
    }

    /// Whether a scope of `key` is currently open.
    pub fn is_running(&self, key: TimerKey) -> bool {
        self.timers[key.index()].started.get().is_some()
    }

    /// `(key, cumulative time)` for every timer in report order.
    pub fn summary(&self) -> Vec<(TimerKey, Duration)> {
        TimerKey::ALL
            .iter()
            .map(|&key| (key, self.elapsed(key)))
            .collect()
    }

    /// Log the timing summary at `debug` level.
    pub fn report(&self) {
        debug!("Timing summary:");
        for (key, elapsed) in self.summary() {
            let (label, depth) = key.summary_label();
            let indent = 1 + depth * 2;
            debug!(
                "{:indent$}{:<width$} = {:.6}s",
                "",
                label,
                elapsed.as_secs_f64(),
                indent = indent,
                width = 25 - indent,
            );
        }
    }
}

/// Running scope of one timer. Stops the timer on drop.
#[must_use = "the timer stops as soon as the guard is dropped"]
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    owns: bool,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        if !self.owns {
            return;
        }
        if let Some(start) = self.timer.started.take() {
            let span = start.elapsed();
            self.timer.last.set(span);
            self.timer.total.set(self.timer.total.get() + span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread::sleep;

    #[test]
    fn nested_scopes_contribute_to_parent() {
        let timers = Timers::new();
        {
            let _main = timers.scope(TimerKey::Main);
            {
                let _momentum = timers.scope(TimerKey::Momentum);
                sleep(Duration::from_millis(2));
            }
            sleep(Duration::from_millis(1));
        }
        let main = timers.elapsed(TimerKey::Main);
        let momentum = timers.elapsed(TimerKey::Momentum);
        assert!(momentum >= Duration::from_millis(2));
        assert!(main >= momentum);
        assert!(!timers.is_running(TimerKey::Main));
    }

    #[test]
    fn guard_stops_timer_on_unwind() {
        let timers = Timers::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = timers.scope(TimerKey::Tke);
            panic!("stage blew up");
        }));
        assert!(result.is_err());
        assert!(!timers.is_running(TimerKey::Tke));
        assert_eq!(timers.last(TimerKey::Tke), timers.elapsed(TimerKey::Tke));
    }

    #[test]
    fn reentrant_scope_is_inert() {
        let timers = Timers::new();
        let outer = timers.scope(TimerKey::Idemix);
        {
            let _inner = timers.scope(TimerKey::Idemix);
        }
        assert!(timers.is_running(TimerKey::Idemix));
        drop(outer);
        assert!(!timers.is_running(TimerKey::Idemix));
    }

    #[test]
    fn query_mid_scope_includes_running_time() {
        let timers = Timers::new();
        let _main = timers.scope(TimerKey::Main);
        sleep(Duration::from_millis(1));
        assert!(timers.elapsed(TimerKey::Main) >= Duration::from_millis(1));
        assert_eq!(timers.last(TimerKey::Main), Duration::ZERO);
    }

    #[test]
    fn last_tracks_most_recent_scope() {
        let timers = Timers::new();
        {
            let _g = timers.scope(TimerKey::Diagnostics);
            sleep(Duration::from_millis(3));
        }
        {
            let _g = timers.scope(TimerKey::Diagnostics);
        }
        assert!(timers.last(TimerKey::Diagnostics) < Duration::from_millis(3));
        assert!(timers.elapsed(TimerKey::Diagnostics) >= Duration::from_millis(3));
    }

    #[test]
    fn summary_covers_every_timer() {
        let timers = Timers::new();
        let summary = timers.summary();
        assert_eq!(summary.len(), TimerKey::ALL.len());
        assert!(summary.iter().all(|(_, d)| d.is_zero()));
        timers.report();
    }

    proptest! {
        #[test]
        fn elapsed_is_monotonic_across_steps(steps in 1usize..20) {
            let timers = Timers::new();
            let mut prev_main = Duration::ZERO;
            let mut prev_momentum = Duration::ZERO;
            for _ in 0..steps {
                {
                    let _main = timers.scope(TimerKey::Main);
                    let _momentum = timers.scope(TimerKey::Momentum);
                }
                let main = timers.elapsed(TimerKey::Main);
                let momentum = timers.elapsed(TimerKey::Momentum);
                prop_assert!(main >= momentum);
                prop_assert!(main >= prev_main);
                prop_assert!(momentum >= prev_momentum);
                prev_main = main;
                prev_momentum = momentum;
            }
        }
    }
}
