//! Tempo and meter maps.
//!
//! Both maps are ordered breakpoint sequences over the time axis. Once the
//! owning document has been set up, element 0 is the origin sentinel whose
//! value mirrors the chart metadata; user breakpoints follow it in
//! coordinate order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    grid::{Axis, TGrid, TimeAxis},
    FumenError, Result,
};

/// Payload carried by a breakpoint.
pub trait BreakpointValue: Copy + PartialEq + fmt::Debug {
    /// Name used in diagnostics.
    const MAP_NAME: &'static str;
}

/// Beats per minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tempo(f64);

impl Tempo {
    /// Creates a tempo, rejecting non-positive or non-finite values.
    pub fn new(bpm: f64) -> Result<Self> {
        if bpm.is_finite() && bpm > 0.0 {
            Ok(Self(bpm))
        } else {
            Err(FumenError::InvalidTempo(bpm))
        }
    }

    pub fn bpm(&self) -> f64 {
        self.0
    }

    /// Beats per second.
    pub fn bps(&self) -> f64 {
        self.0 / 60.0
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(120.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0.2} BPM", self.0)
    }
}

impl TryFrom<f64> for Tempo {
    type Error = FumenError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Tempo> for f64 {
    fn from(value: Tempo) -> Self {
        value.0
    }
}

impl BreakpointValue for Tempo {
    const MAP_NAME: &'static str = "tempo";
}

/// Time signature, e.g. 3/4 or 6/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meter {
    /// Beats per measure.
    pub numerator: u32,
    /// Note value that gets one beat.
    pub denominator: u32,
}

impl Meter {
    /// Common time.
    pub const COMMON: Self = Self {
        numerator: 4,
        denominator: 4,
    };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        Self {
            numerator,
            denominator,
        }
        .validated()
    }

    /// Returns the meter unchanged if both parts are non-zero.
    pub fn validated(self) -> Result<Self> {
        if self.numerator == 0 || self.denominator == 0 {
            Err(FumenError::InvalidMeter {
                numerator: self.numerator,
                denominator: self.denominator,
            })
        } else {
            Ok(self)
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::COMMON
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl BreakpointValue for Meter {
    const MAP_NAME: &'static str = "meter";
}

/// A value taking effect at a time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint<V> {
    pub tgrid: TGrid,
    pub value: V,
}

impl<V> Breakpoint<V> {
    pub fn new(tgrid: TGrid, value: V) -> Self {
        Self { tgrid, value }
    }
}

pub type BpmChange = Breakpoint<Tempo>;
pub type MeterChange = Breakpoint<Meter>;
pub type TempoMap = BreakpointMap<Tempo>;
pub type MeterMap = BreakpointMap<Meter>;

/// Ordered breakpoint sequence anchored by an origin sentinel.
///
/// User breakpoints sit at distinct coordinates: inserting at an occupied
/// coordinate replaces the stored value. The sentinel is not a user entry, so
/// one user entry may share the origin with it, kept after it until
/// [`BreakpointMap::set_sentinel`] finds it redundant.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointMap<V> {
    points: Vec<Breakpoint<V>>,
    sentineled: bool,
}

impl<V> Default for BreakpointMap<V> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            sentineled: false,
        }
    }
}

impl<V: BreakpointValue> BreakpointMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All entries, sentinel included.
    pub fn as_slice(&self) -> &[Breakpoint<V>] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Breakpoint<V>> {
        self.points.iter()
    }

    pub fn has_sentinel(&self) -> bool {
        self.sentineled
    }

    pub fn sentinel(&self) -> Option<&Breakpoint<V>> {
        if self.sentineled {
            self.points.first()
        } else {
            None
        }
    }

    /// User entries, i.e. everything after the sentinel.
    pub fn changes(&self) -> &[Breakpoint<V>] {
        &self.points[self.user_start()..]
    }

    pub fn contains(&self, breakpoint: &Breakpoint<V>) -> bool {
        self.points.contains(breakpoint)
    }

    /// Inserts a breakpoint in coordinate order.
    ///
    /// Breakpoints before the origin are rejected: nothing may precede the
    /// sentinel.
    pub fn insert(&mut self, breakpoint: Breakpoint<V>) -> Result<()> {
        if breakpoint.tgrid < TGrid::ZERO {
            return Err(FumenError::InvalidCoordinate {
                axis: TimeAxis::NAME,
                unit: breakpoint.tgrid.unit(),
                grid: i64::from(breakpoint.tgrid.grid()),
                radix: i64::from(TimeAxis::RADIX),
            });
        }

        let start = self.user_start();
        let users = &self.points[start..];
        if let Ok(offset) = users.binary_search_by(|point| point.tgrid.cmp(&breakpoint.tgrid)) {
            self.points[start + offset].value = breakpoint.value;
            return Ok(());
        }

        let index = start + users.partition_point(|point| point.tgrid <= breakpoint.tgrid);
        self.points.insert(index, breakpoint);
        Ok(())
    }

    /// Removes the first user entry equal to `breakpoint`. The sentinel is
    /// never removed.
    pub fn remove(&mut self, breakpoint: &Breakpoint<V>) -> bool {
        let start = self.user_start();
        match self.points[start..]
            .iter()
            .position(|point| point == breakpoint)
        {
            Some(offset) => {
                self.points.remove(start + offset);
                true
            }
            None => {
                if self.sentinel() == Some(breakpoint) {
                    tracing::warn!(map = V::MAP_NAME, "refusing to remove the origin sentinel");
                }
                false
            }
        }
    }

    /// Restores ascending coordinate order. Stable, and the sentinel stays
    /// at index 0.
    pub fn sort(&mut self) {
        let start = self.user_start();
        self.points[start..].sort_by(|a, b| a.tgrid.cmp(&b.tgrid));
    }

    /// Installs (or updates) the origin sentinel, dropping user entries at the
    /// origin that carry the same value.
    pub fn set_sentinel(&mut self, value: V) {
        let start = self.user_start();
        let users = self.points.split_off(start);
        let before = users.len();
        self.points.extend(
            users
                .into_iter()
                .filter(|point| !(point.tgrid.is_origin() && point.value == value)),
        );
        let dropped = before - (self.points.len() - start);
        if dropped > 0 {
            tracing::debug!(map = V::MAP_NAME, dropped, "discarded breakpoints duplicating the sentinel");
        }

        let sentinel = Breakpoint::new(TGrid::ZERO, value);
        if self.sentineled {
            self.points[0] = sentinel;
        } else {
            self.points.insert(0, sentinel);
            self.sentineled = true;
        }
    }

    /// Latest breakpoint at or before `tgrid`, falling back to the first entry
    /// for coordinates before it.
    pub fn segment_at(&self, tgrid: TGrid) -> Option<&Breakpoint<V>> {
        let index = self.points.partition_point(|point| point.tgrid <= tgrid);
        index
            .checked_sub(1)
            .and_then(|index| self.points.get(index))
            .or_else(|| self.points.first())
    }

    pub fn value_at(&self, tgrid: TGrid) -> Option<V> {
        self.segment_at(tgrid).map(|point| point.value)
    }

    /// Each breakpoint paired with the one that ends its segment.
    pub fn segments(
        &self,
    ) -> impl Iterator<Item = (&Breakpoint<V>, Option<&Breakpoint<V>>)> + '_ {
        self.points
            .iter()
            .enumerate()
            .map(move |(index, point)| (point, self.points.get(index + 1)))
    }

    fn user_start(&self) -> usize {
        usize::from(self.sentineled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(unit: i64, grid: i32) -> TGrid {
        TGrid::new(unit, grid).unwrap()
    }

    fn bpm(tgrid: TGrid, value: f64) -> BpmChange {
        Breakpoint::new(tgrid, Tempo::new(value).unwrap())
    }

    fn positions(map: &TempoMap) -> Vec<TGrid> {
        map.iter().map(|point| point.tgrid).collect()
    }

    #[test]
    fn insert_keeps_coordinate_order() {
        let mut map = TempoMap::new();
        map.insert(bpm(t(4, 0), 180.0)).unwrap();
        map.insert(bpm(t(1, 500), 150.0)).unwrap();
        map.insert(bpm(t(8, 0), 90.0)).unwrap();

        assert_eq!(positions(&map), vec![t(1, 500), t(4, 0), t(8, 0)]);
    }

    #[test]
    fn insert_at_occupied_coordinate_replaces_value() {
        let mut map = TempoMap::new();
        map.insert(bpm(t(2, 0), 150.0)).unwrap();
        map.insert(bpm(t(2, 0), 200.0)).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.value_at(t(2, 0)).unwrap().bpm(), 200.0);
    }

    #[test]
    fn repeated_origin_inserts_replace_user_entry() {
        let mut map = TempoMap::new();
        map.set_sentinel(Tempo::new(120.0).unwrap());
        map.insert(bpm(TGrid::ZERO, 150.0)).unwrap();
        map.insert(bpm(TGrid::ZERO, 160.0)).unwrap();
        map.set_sentinel(Tempo::new(120.0).unwrap());

        assert_eq!(map.sentinel().unwrap().value.bpm(), 120.0);
        assert_eq!(map.changes(), &[bpm(TGrid::ZERO, 160.0)]);

        let mut unsentineled = TempoMap::new();
        unsentineled.insert(bpm(TGrid::ZERO, 150.0)).unwrap();
        unsentineled.insert(bpm(TGrid::ZERO, 90.0)).unwrap();
        assert_eq!(unsentineled.as_slice(), &[bpm(TGrid::ZERO, 90.0)]);
    }

    #[test]
    fn rejects_breakpoints_before_origin() {
        let mut map = TempoMap::new();
        assert!(map.insert(bpm(t(-1, 0), 150.0)).is_err());
        assert!(map.is_empty());
    }

    #[test]
    fn sentinel_drops_matching_origin_entry() {
        let mut map = TempoMap::new();
        map.insert(bpm(TGrid::ZERO, 120.0)).unwrap();
        map.insert(bpm(t(4, 0), 180.0)).unwrap();

        map.set_sentinel(Tempo::new(120.0).unwrap());

        assert_eq!(map.len(), 2);
        assert!(map.has_sentinel());
        assert_eq!(map.sentinel().unwrap().value.bpm(), 120.0);
        assert_eq!(map.changes(), &[bpm(t(4, 0), 180.0)]);
    }

    #[test]
    fn sentinel_keeps_differing_origin_entry_after_it() {
        let mut map = TempoMap::new();
        map.insert(bpm(TGrid::ZERO, 150.0)).unwrap();
        map.set_sentinel(Tempo::new(120.0).unwrap());

        assert_eq!(map.len(), 2);
        assert_eq!(map.sentinel().unwrap().value.bpm(), 120.0);
        assert_eq!(map.changes(), &[bpm(TGrid::ZERO, 150.0)]);
        // The later origin entry wins for lookups.
        assert_eq!(map.value_at(t(0, 10)).unwrap().bpm(), 150.0);
    }

    #[test]
    fn set_sentinel_is_idempotent() {
        let mut map = TempoMap::new();
        map.insert(bpm(t(3, 0), 200.0)).unwrap();
        map.set_sentinel(Tempo::new(120.0).unwrap());
        let once = map.clone();
        map.set_sentinel(Tempo::new(120.0).unwrap());
        assert_eq!(map, once);
    }

    #[test]
    fn sentinel_cannot_be_removed() {
        let mut map = TempoMap::new();
        map.set_sentinel(Tempo::new(120.0).unwrap());
        let sentinel = *map.sentinel().unwrap();

        assert!(!map.remove(&sentinel));
        assert_eq!(map.len(), 1);

        map.insert(bpm(TGrid::ZERO, 120.0)).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.remove(&sentinel));
        assert_eq!(map.len(), 1);
        assert!(map.has_sentinel());
    }

    #[test]
    fn segment_at_finds_active_breakpoint() {
        let mut map = TempoMap::new();
        map.set_sentinel(Tempo::new(120.0).unwrap());
        map.insert(bpm(t(4, 0), 180.0)).unwrap();

        assert_eq!(map.value_at(t(0, 0)).unwrap().bpm(), 120.0);
        assert_eq!(map.value_at(t(3, 2856)).unwrap().bpm(), 120.0);
        assert_eq!(map.value_at(t(4, 0)).unwrap().bpm(), 180.0);
        assert_eq!(map.value_at(t(100, 0)).unwrap().bpm(), 180.0);
        assert!(TempoMap::new().segment_at(t(1, 0)).is_none());
    }

    #[test]
    fn sort_leaves_sentinel_first() {
        let mut map = MeterMap::new();
        map.set_sentinel(Meter::COMMON);
        map.insert(Breakpoint::new(t(2, 0), Meter::new(3, 4).unwrap()))
            .unwrap();
        map.sort();
        assert_eq!(map.sentinel().unwrap().value, Meter::COMMON);
        assert_eq!(map.changes().len(), 1);
    }

    #[test]
    fn tempo_and_meter_validate() {
        assert!(Tempo::new(0.0).is_err());
        assert!(Tempo::new(f64::INFINITY).is_err());
        assert!(Meter::new(0, 4).is_err());
        assert!(serde_json::from_str::<Tempo>("-5.0").is_err());
        assert_eq!(Meter::new(6, 8).unwrap().to_string(), "6/8");
        assert_eq!(Tempo::new(150.0).unwrap().to_string(), "150.00 BPM");
    }
}
