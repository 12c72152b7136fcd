//! Exact two-component chart positions.
//!
//! A [`GridCoordinate`] is a coarse `unit` count plus a fine `grid` count in
//! `[0, RADIX)`. Positions are never the result of floating accumulation, so
//! equality is exact and ordering is lexicographic on `(unit, grid)`. The
//! time axis and the lane axis share the same algebra and differ only in the
//! constants carried by their [`Axis`] marker, which also keeps the two from
//! being mixed up at compile time.

use std::{
    cmp::Ordering,
    fmt,
    hash::Hash,
    marker::PhantomData,
    ops::{Add, Neg, Sub},
};

use serde::{Deserialize, Serialize};

use crate::{FumenError, Result};

/// Fine subdivisions per coarse unit unless an axis says otherwise.
pub const DEFAULT_RADIX: i32 = 2857;

/// Compile-time description of a coordinate axis.
pub trait Axis:
    Copy + Eq + Ord + Hash + Default + fmt::Debug + Send + Sync + 'static
{
    /// Human readable axis name used in diagnostics.
    const NAME: &'static str;
    /// Number of fine subdivisions per coarse unit.
    const RADIX: i32 = DEFAULT_RADIX;
    /// Continuous length of one coarse unit in the axis' natural measure.
    const RESOLUTION: f64;
}

/// Musical time. One unit is a whole note, i.e. four quarter-note beats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeAxis;

impl Axis for TimeAxis {
    const NAME: &'static str = "time";
    const RESOLUTION: f64 = 4.0;
}

/// Horizontal lane position. One unit is one lane width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LaneAxis;

impl Axis for LaneAxis {
    const NAME: &'static str = "lane";
    const RESOLUTION: f64 = 1.0;
}

/// Position on the musical-time axis.
pub type TGrid = GridCoordinate<TimeAxis>;
/// Position on the lane axis.
pub type XGrid = GridCoordinate<LaneAxis>;
/// Distance between two [`TGrid`] values.
pub type TGridOffset = GridOffset<TimeAxis>;
/// Distance between two [`XGrid`] values.
pub type XGridOffset = GridOffset<LaneAxis>;

/// Raw wire shape of a coordinate. Deserialization goes through
/// [`GridCoordinate::new`] so out-of-range grids are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridParts {
    pub unit: i64,
    #[serde(default)]
    pub grid: i32,
}

/// Exact position on one axis.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "GridParts", into = "GridParts", bound = "")]
pub struct GridCoordinate<A: Axis> {
    unit: i64,
    grid: i32,
    axis: PhantomData<A>,
}

impl<A: Axis> GridCoordinate<A> {
    /// The absolute origin `(0, 0)`.
    pub const ZERO: Self = Self::from_parts(0, 0);

    const fn from_parts(unit: i64, grid: i32) -> Self {
        Self {
            unit,
            grid,
            axis: PhantomData,
        }
    }

    /// Largest unit magnitude a validated coordinate may carry. The distance
    /// between any two such coordinates still fits in `i64` grids.
    pub const MAX_UNIT: i64 = i64::MAX / (2 * A::RADIX as i64) - 1;

    /// Builds a coordinate from raw components, rejecting a `grid` outside
    /// `[0, RADIX)` and a `unit` beyond [`Self::MAX_UNIT`].
    pub fn new(unit: i64, grid: i32) -> Result<Self> {
        if !(0..A::RADIX).contains(&grid) {
            return Err(FumenError::InvalidCoordinate {
                axis: A::NAME,
                unit,
                grid: i64::from(grid),
                radix: i64::from(A::RADIX),
            });
        }
        Self::from_parts(unit, grid).validated()
    }

    /// Returns the coordinate unchanged if its unit is within range.
    pub fn validated(self) -> Result<Self> {
        if self.unit.unsigned_abs() > Self::MAX_UNIT.unsigned_abs() {
            return Err(FumenError::CoordinateOutOfRange {
                axis: A::NAME,
                unit: self.unit,
                max: Self::MAX_UNIT,
            });
        }
        Ok(self)
    }

    /// Canonicalizes an arbitrary `(unit, grid)` pair by carrying or
    /// borrowing whole units until `grid` lies in `[0, RADIX)`.
    pub fn normalized(unit: i64, grid: i64) -> Self {
        let radix = i64::from(A::RADIX);
        Self::from_parts(
            unit + grid.div_euclid(radix),
            grid.rem_euclid(radix) as i32,
        )
    }

    /// Builds a coordinate from an absolute grid count
    /// (`unit * RADIX + grid`).
    pub fn from_total_grid(total: i64) -> Self {
        Self::normalized(0, total)
    }

    /// Rounds a fractional unit count to the nearest grid. Counts beyond
    /// [`Self::MAX_UNIT`] are rejected.
    pub fn from_units_f64(units: f64) -> Result<Self> {
        if !units.is_finite() {
            return Err(FumenError::InvalidInput("unit count must be finite"));
        }
        if units.abs() > Self::MAX_UNIT as f64 {
            return Err(FumenError::CoordinateOutOfRange {
                axis: A::NAME,
                unit: units as i64,
                max: Self::MAX_UNIT,
            });
        }
        let total = (units * f64::from(A::RADIX)).round();
        Self::from_total_grid(total as i64).validated()
    }

    pub fn unit(&self) -> i64 {
        self.unit
    }

    pub fn grid(&self) -> i32 {
        self.grid
    }

    /// Projects the coordinate to a single comparable scalar.
    pub fn total_grid(&self) -> i64 {
        self.unit * i64::from(A::RADIX) + i64::from(self.grid)
    }

    /// Position expressed as a fractional number of units.
    pub fn as_units_f64(&self) -> f64 {
        self.unit as f64 + f64::from(self.grid) / f64::from(A::RADIX)
    }

    /// Unit first, then grid. Equal only when both components match.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.unit
            .cmp(&other.unit)
            .then_with(|| self.grid.cmp(&other.grid))
    }

    pub fn is_origin(&self) -> bool {
        self.unit == 0 && self.grid == 0
    }
}

impl<A: Axis> Default for GridCoordinate<A> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<A: Axis> PartialOrd for GridCoordinate<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A: Axis> Ord for GridCoordinate<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl<A: Axis> fmt::Debug for GridCoordinate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Grid({}, {})", A::NAME, self.unit, self.grid)
    }
}

impl<A: Axis> fmt::Display for GridCoordinate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.unit, self.grid)
    }
}

impl<A: Axis> TryFrom<GridParts> for GridCoordinate<A> {
    type Error = FumenError;

    fn try_from(parts: GridParts) -> Result<Self> {
        Self::new(parts.unit, parts.grid)
    }
}

impl<A: Axis> From<GridCoordinate<A>> for GridParts {
    fn from(value: GridCoordinate<A>) -> Self {
        Self {
            unit: value.unit,
            grid: value.grid,
        }
    }
}

impl<A: Axis> Sub for GridCoordinate<A> {
    type Output = GridOffset<A>;

    /// Mixed-radix subtraction: whole units are borrowed into the grid delta
    /// until it is non-negative.
    fn sub(self, rhs: Self) -> GridOffset<A> {
        GridOffset::new(
            self.unit - rhs.unit,
            i64::from(self.grid) - i64::from(rhs.grid),
        )
    }
}

impl<A: Axis> Add<GridOffset<A>> for GridCoordinate<A> {
    type Output = Self;

    fn add(self, rhs: GridOffset<A>) -> Self {
        Self::normalized(
            self.unit + rhs.unit,
            i64::from(self.grid) + i64::from(rhs.grid),
        )
    }
}

impl<A: Axis> Sub<GridOffset<A>> for GridCoordinate<A> {
    type Output = Self;

    fn sub(self, rhs: GridOffset<A>) -> Self {
        self + -rhs
    }
}

/// Signed distance between two coordinates of the same axis.
///
/// The grid delta is always canonical: `0 <= grid < RADIX`, with the sign of
/// the distance carried entirely by `unit`: one grid backwards is
/// `(-1, RADIX - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GridOffset<A: Axis> {
    unit: i64,
    grid: i32,
    axis: PhantomData<A>,
}

impl<A: Axis> GridOffset<A> {
    pub const ZERO: Self = Self {
        unit: 0,
        grid: 0,
        axis: PhantomData,
    };

    /// Builds an offset from raw deltas, borrowing from (or carrying into)
    /// `unit` so the grid delta lands in `[0, RADIX)`.
    pub fn new(unit: i64, grid: i64) -> Self {
        let radix = i64::from(A::RADIX);
        Self {
            unit: unit + grid.div_euclid(radix),
            grid: grid.rem_euclid(radix) as i32,
            axis: PhantomData,
        }
    }

    pub fn from_total_grid(total: i64) -> Self {
        Self::new(0, total)
    }

    pub fn unit(&self) -> i64 {
        self.unit
    }

    pub fn grid(&self) -> i32 {
        self.grid
    }

    pub fn total_grid(&self) -> i64 {
        self.unit * i64::from(A::RADIX) + i64::from(self.grid)
    }

    pub fn is_zero(&self) -> bool {
        self.unit == 0 && self.grid == 0
    }
}

impl<A: Axis> Add for GridOffset<A> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.unit + rhs.unit,
            i64::from(self.grid) + i64::from(rhs.grid),
        )
    }
}

impl<A: Axis> Neg for GridOffset<A> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.unit, -i64::from(self.grid))
    }
}
