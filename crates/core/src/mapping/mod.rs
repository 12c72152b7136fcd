//! Conversion between chart coordinates and continuous positions.
//!
//! The time axis is piecewise linear: every tempo breakpoint starts a segment
//! in which one grid lasts
//!
//! ```text
//! 60 * beats_per_unit / (bpm * RADIX)   seconds
//! ```
//!
//! i.e. one unit is `beats_per_unit` beats at the segment's tempo. The
//! resulting seconds are multiplied by the caller's scale factor (1.0 for
//! seconds, pixels-per-second for a scrolling view). The lane axis is a plain
//! linear projection.

use serde::{Deserialize, Serialize};

use crate::{
    grid::{Axis, LaneAxis, TGrid, TGridOffset, TimeAxis, XGrid},
    timeline::{Tempo, TempoMap},
    FumenError, Result,
};

/// Seconds covered by one time-axis grid at `tempo`.
pub fn seconds_per_grid(tempo: Tempo, beats_per_unit: f64) -> f64 {
    60.0 * beats_per_unit / (tempo.bpm() * f64::from(TimeAxis::RADIX))
}

/// How seconds are scaled onto the continuous output axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    /// Continuous units per second.
    pub scale: f64,
    /// Quarter-note beats per time-axis unit.
    pub beats_per_unit: f64,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self {
            scale: 1.0,
            beats_per_unit: TimeAxis::RESOLUTION,
        }
    }
}

impl TimeScale {
    pub fn new(scale: f64, beats_per_unit: f64) -> Result<Self> {
        Self {
            scale,
            beats_per_unit,
        }
        .validated()
    }

    /// Plain seconds.
    pub fn seconds() -> Self {
        Self::default()
    }

    pub fn validated(self) -> Result<Self> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(FumenError::InvalidInput("time scale must be positive and finite"));
        }
        if !(self.beats_per_unit.is_finite() && self.beats_per_unit > 0.0) {
            return Err(FumenError::InvalidInput("beats per unit must be positive and finite"));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: TGrid,
    start_value: f64,
    per_grid: f64,
    tempo: Tempo,
}

impl Segment {
    fn value_at(&self, tgrid: TGrid) -> f64 {
        self.start_value + (tgrid - self.start).total_grid() as f64 * self.per_grid
    }
}

/// A tempo map with cumulative segment start values precomputed, so both
/// directions binary-search their segment.
///
/// Zero-length segments (several breakpoints on one coordinate) are dropped;
/// the last breakpoint at a coordinate governs what follows it.
#[derive(Debug, Clone)]
pub struct TempoTimeline {
    segments: Vec<Segment>,
    scale: TimeScale,
}

impl TempoTimeline {
    /// Fails when the map has not been sentineled yet.
    pub fn new(tempo_map: &TempoMap, scale: TimeScale) -> Result<Self> {
        if !tempo_map.has_sentinel() {
            return Err(FumenError::MissingSentinel("tempo"));
        }
        let scale = scale.validated()?;

        let mut segments = Vec::with_capacity(tempo_map.len());
        let mut elapsed = 0.0;
        for (point, next) in tempo_map.segments() {
            let length = next.map(|next| (next.tgrid - point.tgrid).total_grid());
            if length == Some(0) {
                continue;
            }
            let per_grid = seconds_per_grid(point.value, scale.beats_per_unit) * scale.scale;
            segments.push(Segment {
                start: point.tgrid,
                start_value: elapsed,
                per_grid,
                tempo: point.value,
            });
            if let Some(length) = length {
                elapsed += length as f64 * per_grid;
            }
        }

        Ok(Self { segments, scale })
    }

    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    /// Continuous position of `tgrid`. Coordinates before the origin
    /// extrapolate the first segment backwards.
    pub fn to_continuous(&self, tgrid: TGrid) -> f64 {
        let index = self
            .segments
            .partition_point(|segment| segment.start <= tgrid)
            .saturating_sub(1);
        self.segments[index].value_at(tgrid)
    }

    /// Inverse of [`TempoTimeline::to_continuous`], rounded to the nearest
    /// grid.
    pub fn to_coordinate(&self, value: f64) -> Result<TGrid> {
        if !value.is_finite() {
            return Err(FumenError::InvalidInput("continuous position must be finite"));
        }
        let index = self
            .segments
            .partition_point(|segment| segment.start_value <= value)
            .saturating_sub(1);
        let segment = &self.segments[index];
        let grids = ((value - segment.start_value) / segment.per_grid).round();
        (segment.start + TGridOffset::from_total_grid(grids as i64)).validated()
    }

    /// Tempo governing playback at `tgrid`.
    pub fn tempo_at(&self, tgrid: TGrid) -> Tempo {
        let index = self
            .segments
            .partition_point(|segment| segment.start <= tgrid)
            .saturating_sub(1);
        self.segments[index].tempo
    }

    /// Continuous length between two coordinates; negative when `to` precedes
    /// `from`.
    pub fn span(&self, from: TGrid, to: TGrid) -> f64 {
        self.to_continuous(to) - self.to_continuous(from)
    }
}

/// Converts `tgrid` to a continuous position using `tempo_map`.
pub fn to_continuous(tgrid: TGrid, tempo_map: &TempoMap, scale: TimeScale) -> Result<f64> {
    Ok(TempoTimeline::new(tempo_map, scale)?.to_continuous(tgrid))
}

/// Converts a continuous position back to a chart coordinate.
pub fn to_coordinate(value: f64, tempo_map: &TempoMap, scale: TimeScale) -> Result<TGrid> {
    TempoTimeline::new(tempo_map, scale)?.to_coordinate(value)
}

/// Linear projection of the lane axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneScale {
    /// Continuous length of one lane unit.
    pub pixels_per_unit: f64,
    /// Continuous position of lane coordinate zero.
    #[serde(default)]
    pub origin: f64,
}

impl Default for LaneScale {
    fn default() -> Self {
        Self {
            pixels_per_unit: 1.0,
            origin: 0.0,
        }
    }
}

impl LaneScale {
    pub fn to_continuous(&self, xgrid: XGrid) -> f64 {
        self.origin + xgrid.as_units_f64() * LaneAxis::RESOLUTION * self.pixels_per_unit
    }

    pub fn to_coordinate(&self, value: f64) -> Result<XGrid> {
        if !(self.pixels_per_unit.is_finite() && self.pixels_per_unit > 0.0) {
            return Err(FumenError::InvalidInput("lane scale must be positive and finite"));
        }
        XGrid::from_units_f64((value - self.origin) / (self.pixels_per_unit * LaneAxis::RESOLUTION))
    }
}
