//! Static field declarations.

use std::fmt;

use crate::grid::Dim;

/// Element type stored by a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// `f64`.
    Float,
    /// `i32`, used for index fields such as the bottom level.
    Int,
}

impl ElementType {
    /// Lower-case name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float => "f64",
            Self::Int => "i32",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one model field.
///
/// Built with `const` combinators so that the whole catalog can live in a
/// `static` table:
///
/// ```
/// use gyre_arena::{Dim, VariableDescriptor};
///
/// const TKE: VariableDescriptor =
///     VariableDescriptor::new("tke", &[Dim::Xt, Dim::Yt, Dim::Zw], "m^2/s^2", "Turbulent kinetic energy")
///         .time_dependent()
///         .when("enable_tke");
/// assert!(TKE.time_dependent);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariableDescriptor {
    /// Unique field name.
    pub name: &'static str,
    /// Ordered grid axes, excluding the time axis.
    pub dims: &'static [Dim],
    /// Element type.
    pub element: ElementType,
    /// Whether the field carries the trailing axis of three time levels.
    pub time_dependent: bool,
    /// Enable-predicate; `None` means always allocated.
    pub condition: Option<&'static str>,
    /// Physical units.
    pub units: &'static str,
    /// Human-readable description.
    pub long_name: &'static str,
}

impl VariableDescriptor {
    /// An unconditional, time-independent `f64` field.
    pub const fn new(
        name: &'static str,
        dims: &'static [Dim],
        units: &'static str,
        long_name: &'static str,
    ) -> Self {
        Self {
            name,
            dims,
            element: ElementType::Float,
            time_dependent: false,
            condition: None,
            units,
            long_name,
        }
    }

    /// Store `i32` instead of `f64`.
    pub const fn int(mut self) -> Self {
        self.element = ElementType::Int;
        self
    }

    /// Add the trailing axis of three time levels.
    pub const fn time_dependent(mut self) -> Self {
        self.time_dependent = true;
        self
    }

    /// Allocate only when `predicate` holds.
    pub const fn when(mut self, predicate: &'static str) -> Self {
        self.condition = Some(predicate);
        self
    }
}
