//! Periodic boundary exchange.

use gyre_arena::HALO;
use gyre_core::StageError;
use ndarray::{ArrayViewMutD, Axis, Slice};

/// Wraps a domain edge onto itself, in place, on one time level of one
/// field.
pub trait CyclicBoundary: Send {
    /// Overwrite the halo cells of `slot` from the opposite interior.
    fn apply_cyclic(&self, slot: ArrayViewMutD<'_, f64>) -> Result<(), StageError>;
}

/// Periodic exchange along the first (zonal) axis.
///
/// The `halo` cells at each end are copied from the `halo` interior cells
/// adjacent to the opposite end:
///
/// ```text
///  west halo │ interior ............................ │ east halo
///   [0, h)   │ [h, 2h) ...................[n-2h, n-h) │ [n-h, n)
///      ▲          │                            │          ▲
///      └──────────┼────────────────────────────┘          │
///                 └───────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CyclicX {
    /// Halo width.
    pub halo: usize,
}

impl Default for CyclicX {
    fn default() -> Self {
        Self { halo: HALO }
    }
}

impl CyclicBoundary for CyclicX {
    fn apply_cyclic(&self, mut slot: ArrayViewMutD<'_, f64>) -> Result<(), StageError> {
        let h = self.halo;
        if h == 0 {
            return Ok(());
        }
        if slot.ndim() == 0 || slot.len_of(Axis(0)) < 2 * h {
            return Err(StageError::ExecutionFailed {
                reason: format!(
                    "cyclic exchange with halo {h} needs at least {} zonal cells, got shape {:?}",
                    2 * h,
                    slot.shape()
                ),
            });
        }
        let n = slot.len_of(Axis(0));
        let west_interior = slot.slice_axis(Axis(0), Slice::from(h..2 * h)).to_owned();
        let east_interior = slot
            .slice_axis(Axis(0), Slice::from(n - 2 * h..n - h))
            .to_owned();
        slot.slice_axis_mut(Axis(0), Slice::from(n - h..n))
            .assign(&west_interior);
        slot.slice_axis_mut(Axis(0), Slice::from(0..h))
            .assign(&east_interior);
        Ok(())
    }
}
