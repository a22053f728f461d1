//! Grid axes and shape resolution.

use std::fmt;
use std::str::FromStr;

use gyre_core::Settings;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::{ArenaError, ShapeError};

/// Halo width on each side of the horizontal axes.
pub const HALO: usize = 2;

/// A resolved array shape. Fields have at most four spatial axes plus the
/// time axis, so this never spills to the heap.
pub type Shape = SmallVec<[usize; 5]>;

/// Grid axis tag used in a dimension list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dim {
    /// Zonal, tracer points.
    Xt,
    /// Zonal, velocity points.
    Xu,
    /// Meridional, tracer points.
    Yt,
    /// Meridional, velocity points.
    Yu,
    /// Vertical, tracer levels.
    Zt,
    /// Vertical, interfaces.
    Zw,
    /// Wave-propagation directions.
    Np,
    /// Islands of the streamfunction solver.
    Isle,
}

impl Dim {
    /// Every axis tag.
    pub const ALL: [Dim; 8] = [
        Self::Xt,
        Self::Xu,
        Self::Yt,
        Self::Yu,
        Self::Zt,
        Self::Zw,
        Self::Np,
        Self::Isle,
    ];

    /// The lower-case tag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Xt => "xt",
            Self::Xu => "xu",
            Self::Yt => "yt",
            Self::Yu => "yu",
            Self::Zt => "zt",
            Self::Zw => "zw",
            Self::Np => "np",
            Self::Isle => "isle",
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Dim {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.tag() == s)
            .ok_or_else(|| format!("unknown axis tag '{s}'"))
    }
}

/// Extent of every axis the grid defines.
///
/// Axes are kept in insertion order so [`GridShape::iter`] is
/// deterministic. An axis may be absent, in which case resolving a
/// descriptor that uses it fails with [`ShapeError::UnknownAxis`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridShape {
    axes: IndexMap<Dim, usize>,
}

impl GridShape {
    /// A grid with no axes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Horizontal and vertical axes of an `nx × ny × nz` ocean grid. The
    /// horizontal axes carry [`HALO`] cells on each side.
    pub fn ocean(nx: usize, ny: usize, nz: usize) -> Self {
        Self::new()
            .with_axis(Dim::Xt, nx + 2 * HALO)
            .with_axis(Dim::Xu, nx + 2 * HALO)
            .with_axis(Dim::Yt, ny + 2 * HALO)
            .with_axis(Dim::Yu, ny + 2 * HALO)
            .with_axis(Dim::Zt, nz)
            .with_axis(Dim::Zw, nz)
    }

    /// Add or replace one axis.
    pub fn with_axis(mut self, dim: Dim, extent: usize) -> Self {
        self.axes.insert(dim, extent);
        self
    }

    /// Derive the full axis table from the `nx`, `ny`, `nz`, `np` and
    /// `nisle` settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ArenaError> {
        let extent = |name: &'static str| -> Result<usize, ArenaError> {
            let value = settings.int(name)?;
            usize::try_from(value).map_err(|_| {
                ArenaError::from(ShapeError::NegativeExtent {
                    setting: name,
                    value,
                })
            })
        };
        Ok(Self::ocean(extent("nx")?, extent("ny")?, extent("nz")?)
            .with_axis(Dim::Np, extent("np")?)
            .with_axis(Dim::Isle, extent("nisle")?))
    }

    /// Extent of `dim`, if defined.
    pub fn extent(&self, dim: Dim) -> Option<usize> {
        self.axes.get(&dim).copied()
    }

    /// Defined axes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Dim, usize)> + '_ {
        self.axes.iter().map(|(&d, &n)| (d, n))
    }

    /// Resolve a dimension list, appending the time axis of
    /// `time_levels` entries when given.
    pub fn resolve(
        &self,
        field: &str,
        dims: &[Dim],
        time_levels: Option<usize>,
    ) -> Result<Shape, ShapeError> {
        let mut shape = Shape::new();
        for &dim in dims {
            let extent = self.extent(dim).ok_or_else(|| ShapeError::UnknownAxis {
                field: field.to_string(),
                axis: dim.tag().to_string(),
            })?;
            shape.push(extent);
        }
        if let Some(levels) = time_levels {
            shape.push(levels);
        }
        let fits = shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .is_some();
        if !fits {
            return Err(ShapeError::Overflow {
                field: field.to_string(),
                shape: shape.to_vec(),
            });
        }
        Ok(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gyre_core::SettingsBuilder;

    #[test]
    fn ocean_grid_adds_halo_horizontally_only() {
        let grid = GridShape::ocean(10, 6, 4);
        assert_eq!(grid.extent(Dim::Xt), Some(14));
        assert_eq!(grid.extent(Dim::Yu), Some(10));
        assert_eq!(grid.extent(Dim::Zw), Some(4));
        assert_eq!(grid.extent(Dim::Np), None);
    }

    #[test]
    fn resolve_appends_time_axis() {
        let grid = GridShape::ocean(4, 4, 3);
        let shape = grid
            .resolve("u", &[Dim::Xu, Dim::Yt, Dim::Zt], Some(3))
            .unwrap();
        assert_eq!(shape.as_slice(), &[8, 8, 3, 3]);
    }

    #[test]
    fn unknown_axis_is_rejected() {
        let grid = GridShape::ocean(4, 4, 3);
        let err = grid.resolve("e_m2", &[Dim::Xt, Dim::Np], None).unwrap_err();
        assert_eq!(
            err,
            ShapeError::UnknownAxis {
                field: "e_m2".to_string(),
                axis: "np".to_string(),
            }
        );
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let grid = GridShape::new()
            .with_axis(Dim::Xt, usize::MAX)
            .with_axis(Dim::Yt, 2);
        assert!(matches!(
            grid.resolve("huge", &[Dim::Xt, Dim::Yt], None),
            Err(ShapeError::Overflow { .. })
        ));
    }

    #[test]
    fn from_settings_reads_every_extent() {
        let mut builder = SettingsBuilder::new();
        builder.set("nx", 8_i64).unwrap();
        builder.set("ny", 5_i64).unwrap();
        builder.set("nz", 2_i64).unwrap();
        builder.set("np", 17_i64).unwrap();
        builder.set("nisle", 1_i64).unwrap();
        let grid = GridShape::from_settings(&builder.build()).unwrap();
        assert_eq!(grid.extent(Dim::Xu), Some(12));
        assert_eq!(grid.extent(Dim::Yt), Some(9));
        assert_eq!(grid.extent(Dim::Np), Some(17));
        assert_eq!(grid.extent(Dim::Isle), Some(1));
    }

    #[test]
    fn negative_extent_is_rejected() {
        let mut builder = SettingsBuilder::new();
        builder.set("nz", -1_i64).unwrap();
        let err = GridShape::from_settings(&builder.build()).unwrap_err();
        assert_eq!(
            err,
            ArenaError::Shape(ShapeError::NegativeExtent {
                setting: "nz",
                value: -1,
            })
        );
    }

    #[test]
    fn tags_round_trip_through_from_str() {
        for dim in Dim::ALL {
            assert_eq!(dim.tag().parse::<Dim>().unwrap(), dim);
        }
        assert!("zz".parse::<Dim>().is_err());
    }
}
