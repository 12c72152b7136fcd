//! Core library for the fumen (rhythm-game chart) editor.
//!
//! Charts place objects on an exact two-component grid. The [`document`]
//! module owns the objects and the tempo and meter maps, [`mapping`] turns
//! grid positions into seconds or pixels and back, and [`render`] resolves a
//! document into positions a view can draw. [`session`] shares one open
//! document between an editing thread and its readers.

pub mod config;
pub mod document;
pub mod error;
pub mod grid;
pub mod mapping;
pub mod objects;
pub mod render;
pub mod session;
pub mod timeline;

pub use config::{EditorConfig, LaneConfig, TimelineConfig};
pub use document::{Fumen, FumenMetaInfo, LanePolyline};
pub use error::{FumenError, Result};
pub use grid::{GridCoordinate, GridOffset, TGrid, TGridOffset, XGrid, XGridOffset};
pub use mapping::{LaneScale, TempoTimeline, TimeScale};
pub use objects::{ChartObject, DisplayElement, DisplayItem, FumenObject, ObjectKind};
pub use render::{beat_lines, DisplayList, GridLine, PlacedItem};
pub use session::{EditorSession, FumenHandle};
pub use timeline::{BpmChange, Meter, MeterChange, MeterMap, Tempo, TempoMap};
