use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    grid::{Axis, TimeAxis},
    mapping::{LaneScale, TimeScale},
    Result,
};

/// Top-level configuration structure for the editor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub timeline: TimelineConfig,
    pub lanes: LaneConfig,
}

impl EditorConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.time_scale()?;
        tracing::debug!(path = %path.display(), ?config, "loaded editor config");
        Ok(config)
    }

    /// Time conversion in seconds, ignoring the view scale.
    pub fn seconds_scale(&self) -> Result<TimeScale> {
        TimeScale::new(1.0, self.timeline.beats_per_unit)
    }

    /// Time conversion onto the scrolling view.
    pub fn time_scale(&self) -> Result<TimeScale> {
        TimeScale::new(self.timeline.pixels_per_second, self.timeline.beats_per_unit)
    }

    pub fn lane_scale(&self) -> LaneScale {
        LaneScale {
            pixels_per_unit: self.lanes.pixels_per_unit,
            origin: self.lanes.origin,
        }
    }
}

/// Vertical (time) axis of the editor view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub pixels_per_second: f64,
    /// Quarter-note beats per time unit.
    pub beats_per_unit: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            pixels_per_second: 240.0,
            beats_per_unit: TimeAxis::RESOLUTION,
        }
    }
}

/// Horizontal (lane) axis of the editor view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    pub pixels_per_unit: f64,
    pub origin: f64,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            pixels_per_unit: 16.0,
            origin: 0.0,
        }
    }
}
