//! The three-slot time-level permutation.

use std::fmt;

/// Logical time level of a time-dependent field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Read by time-differencing.
    Previous,
    /// Read by diagnostics and output.
    Current,
    /// Written by the step in progress.
    Next,
}

impl Slot {
    /// All slots, oldest first.
    pub const ALL: [Slot; 3] = [Self::Previous, Self::Current, Self::Next];

    fn index(self) -> usize {
        match self {
            Self::Previous => 0,
            Self::Current => 1,
            Self::Next => 2,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Previous => "previous",
            Self::Current => "current",
            Self::Next => "next",
        })
    }
}

/// Maps each [`Slot`] to a physical position along a field's time axis.
///
/// Always a permutation of `{0, 1, 2}`. Only [`TimeIndex::rotate`]
/// changes it, and one instance is shared by every field of a
/// [`crate::State`], so all time-dependent fields stay phase-aligned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeIndex {
    positions: [usize; 3],
}

impl TimeIndex {
    /// Length of the time axis.
    pub const LEVELS: usize = 3;

    /// `previous → 0`, `current → 1`, `next → 2`.
    pub const fn identity() -> Self {
        Self {
            positions: [0, 1, 2],
        }
    }

    /// Physical position of `slot`.
    pub fn position(&self, slot: Slot) -> usize {
        self.positions[slot.index()]
    }

    /// The slot stored at physical `position`, if in range.
    pub fn slot_at(&self, position: usize) -> Option<Slot> {
        Slot::ALL.into_iter().find(|&s| self.position(s) == position)
    }

    /// Physical positions of previous, current and next, in that order.
    pub fn logical_order(&self) -> [usize; 3] {
        self.positions
    }

    /// For each physical position, the logical index (previous = 0,
    /// current = 1, next = 2) stored there.
    pub fn physical_order(&self) -> [usize; 3] {
        let mut order = [0; 3];
        for (logical, &position) in self.positions.iter().enumerate() {
            order[position] = logical;
        }
        order
    }

    /// Relabel: `previous ← current`, `current ← next`, `next ← previous`.
    pub fn rotate(&mut self) {
        self.positions.rotate_left(1);
    }

    /// The permutation after one rotation.
    #[must_use]
    pub fn rotated(mut self) -> Self {
        self.rotate();
        self
    }

    /// Whether this is the identity permutation.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for TimeIndex {
    fn default() -> Self {
        Self::identity()
    }
}
