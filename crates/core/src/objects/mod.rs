use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    grid::{TGrid, XGrid},
    timeline::{BpmChange, MeterChange},
};

/// Closed set of object kinds a chart may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Tap,
    Bell,
    Flick,
    Hold,
    Beam,
    Bullet,
    BulletPalette,
    ClickSe,
    Lane,
    EnemySet,
    BpmChange,
    MeterChange,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tap => "tap",
            Self::Bell => "bell",
            Self::Flick => "flick",
            Self::Hold => "hold",
            Self::Beam => "beam",
            Self::Bullet => "bullet",
            Self::BulletPalette => "bullet_palette",
            Self::ClickSe => "click_se",
            Self::Lane => "lane",
            Self::EnemySet => "enemy_set",
            Self::BpmChange => "bpm_change",
            Self::MeterChange => "meter_change",
        };
        f.write_str(name)
    }
}

/// A point on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Placement {
    pub tgrid: TGrid,
    pub xgrid: XGrid,
}

impl Placement {
    pub fn new(tgrid: TGrid, xgrid: XGrid) -> Self {
        Self { tgrid, xgrid }
    }
}

/// Positioned chart content, as seen by rendering and geometry code.
pub trait ChartObject: fmt::Debug {
    fn kind(&self) -> ObjectKind;

    fn tgrid(&self) -> TGrid;

    fn xgrid(&self) -> Option<XGrid> {
        None
    }

    /// Interior points that are drawn on their own, e.g. curve controls of a
    /// lane segment.
    fn control_points(&self) -> &[Placement] {
        &[]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlickDirection {
    #[default]
    Left,
    Right,
}

/// Position of a node within a connected path (lanes, beams).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRole {
    Start,
    Next,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldRole {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneType {
    Left,
    Center,
    Right,
    WallLeft,
    WallRight,
    Colorful,
}

impl LaneType {
    pub fn is_wall(&self) -> bool {
        matches!(self, Self::WallLeft | Self::WallRight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletSize {
    #[default]
    Normal,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyWave {
    Wave1,
    Wave2,
    Boss,
}

/// Percussive hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tap {
    pub tgrid: TGrid,
    pub xgrid: XGrid,
    #[serde(default)]
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bell {
    pub tgrid: TGrid,
    pub xgrid: XGrid,
    /// Bullet palette the bell borrows its movement from, if any.
    #[serde(default)]
    pub palette: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flick {
    pub tgrid: TGrid,
    pub xgrid: XGrid,
    #[serde(default)]
    pub direction: FlickDirection,
}

/// One end of a held note. Start and end share `hold_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldNode {
    pub hold_id: u32,
    pub role: HoldRole,
    pub tgrid: TGrid,
    pub xgrid: XGrid,
    #[serde(default)]
    pub critical: bool,
}

/// Node of a laser beam path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamNode {
    pub beam_id: u32,
    pub role: PathRole,
    pub tgrid: TGrid,
    pub xgrid: XGrid,
    #[serde(default = "default_beam_width")]
    pub width: u32,
}

fn default_beam_width() -> u32 {
    2
}

/// Projectile fired from a palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub palette: String,
    pub tgrid: TGrid,
    pub xgrid: XGrid,
}

/// Shared projectile parameters. Not positioned in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletPalette {
    pub id: String,
    #[serde(default = "default_bullet_speed")]
    pub speed: f64,
    #[serde(default)]
    pub size: BulletSize,
}

fn default_bullet_speed() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickSe {
    pub tgrid: TGrid,
}

/// Node of a lane-boundary path. A lane is a start node, any number of next
/// nodes and an end node sharing `lane_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneNode {
    pub lane_id: u32,
    pub lane_type: LaneType,
    pub role: PathRole,
    pub tgrid: TGrid,
    pub xgrid: XGrid,
    /// Curve control points between the previous node and this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub curve: Vec<Placement>,
}

impl LaneNode {
    pub fn placement(&self) -> Placement {
        Placement::new(self.tgrid, self.xgrid)
    }
}

/// Timeline event marking an enemy wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySet {
    pub tgrid: TGrid,
    pub wave: EnemyWave,
}

macro_rules! positioned {
    ($ty:ty, $kind:ident) => {
        impl ChartObject for $ty {
            fn kind(&self) -> ObjectKind {
                ObjectKind::$kind
            }

            fn tgrid(&self) -> TGrid {
                self.tgrid
            }

            fn xgrid(&self) -> Option<XGrid> {
                Some(self.xgrid)
            }
        }
    };
}

positioned!(Tap, Tap);
positioned!(Bell, Bell);
positioned!(Flick, Flick);
positioned!(HoldNode, Hold);
positioned!(BeamNode, Beam);
positioned!(Bullet, Bullet);

impl ChartObject for LaneNode {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Lane
    }

    fn tgrid(&self) -> TGrid {
        self.tgrid
    }

    fn xgrid(&self) -> Option<XGrid> {
        Some(self.xgrid)
    }

    fn control_points(&self) -> &[Placement] {
        &self.curve
    }
}

impl ChartObject for ClickSe {
    fn kind(&self) -> ObjectKind {
        ObjectKind::ClickSe
    }

    fn tgrid(&self) -> TGrid {
        self.tgrid
    }
}

impl ChartObject for EnemySet {
    fn kind(&self) -> ObjectKind {
        ObjectKind::EnemySet
    }

    fn tgrid(&self) -> TGrid {
        self.tgrid
    }
}

impl ChartObject for BpmChange {
    fn kind(&self) -> ObjectKind {
        ObjectKind::BpmChange
    }

    fn tgrid(&self) -> TGrid {
        self.tgrid
    }
}

impl ChartObject for MeterChange {
    fn kind(&self) -> ObjectKind {
        ObjectKind::MeterChange
    }

    fn tgrid(&self) -> TGrid {
        self.tgrid
    }
}

/// Any object a chart document can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FumenObject {
    Tap(Tap),
    Bell(Bell),
    Flick(Flick),
    Hold(HoldNode),
    Beam(BeamNode),
    Bullet(Bullet),
    BulletPalette(BulletPalette),
    ClickSe(ClickSe),
    Lane(LaneNode),
    EnemySet(EnemySet),
    BpmChange(BpmChange),
    MeterChange(MeterChange),
}

impl FumenObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Tap(_) => ObjectKind::Tap,
            Self::Bell(_) => ObjectKind::Bell,
            Self::Flick(_) => ObjectKind::Flick,
            Self::Hold(_) => ObjectKind::Hold,
            Self::Beam(_) => ObjectKind::Beam,
            Self::Bullet(_) => ObjectKind::Bullet,
            Self::BulletPalette(_) => ObjectKind::BulletPalette,
            Self::ClickSe(_) => ObjectKind::ClickSe,
            Self::Lane(_) => ObjectKind::Lane,
            Self::EnemySet(_) => ObjectKind::EnemySet,
            Self::BpmChange(_) => ObjectKind::BpmChange,
            Self::MeterChange(_) => ObjectKind::MeterChange,
        }
    }

    /// The positioned view of this object; palettes have none.
    pub fn as_chart_object(&self) -> Option<&dyn ChartObject> {
        match self {
            Self::Tap(o) => Some(o),
            Self::Bell(o) => Some(o),
            Self::Flick(o) => Some(o),
            Self::Hold(o) => Some(o),
            Self::Beam(o) => Some(o),
            Self::Bullet(o) => Some(o),
            Self::BulletPalette(_) => None,
            Self::ClickSe(o) => Some(o),
            Self::Lane(o) => Some(o),
            Self::EnemySet(o) => Some(o),
            Self::BpmChange(o) => Some(o),
            Self::MeterChange(o) => Some(o),
        }
    }
}

macro_rules! into_object {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for FumenObject {
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        }
    };
}

into_object!(Tap, Tap);
into_object!(Bell, Bell);
into_object!(Flick, Flick);
into_object!(HoldNode, Hold);
into_object!(BeamNode, Beam);
into_object!(Bullet, Bullet);
into_object!(BulletPalette, BulletPalette);
into_object!(ClickSe, ClickSe);
into_object!(LaneNode, Lane);
into_object!(EnemySet, EnemySet);
into_object!(BpmChange, BpmChange);
into_object!(MeterChange, MeterChange);

/// Which part of an object a [`DisplayItem`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayElement {
    Body,
    ControlPoint(usize),
}

/// One independently rendered element of a chart object.
#[derive(Debug, Clone, Copy)]
pub struct DisplayItem<'a> {
    pub object: &'a dyn ChartObject,
    pub element: DisplayElement,
}

impl DisplayItem<'_> {
    pub fn kind(&self) -> ObjectKind {
        self.object.kind()
    }

    pub fn tgrid(&self) -> TGrid {
        match self.element {
            DisplayElement::Body => self.object.tgrid(),
            DisplayElement::ControlPoint(index) => self
                .object
                .control_points()
                .get(index)
                .map_or_else(|| self.object.tgrid(), |point| point.tgrid),
        }
    }

    pub fn xgrid(&self) -> Option<XGrid> {
        match self.element {
            DisplayElement::Body => self.object.xgrid(),
            DisplayElement::ControlPoint(index) => self
                .object
                .control_points()
                .get(index)
                .map(|point| point.xgrid),
        }
    }
}

/// Expands an object into its body followed by its control points.
pub fn display_items(object: &dyn ChartObject) -> impl Iterator<Item = DisplayItem<'_>> {
    std::iter::once(DisplayElement::Body)
        .chain((0..object.control_points().len()).map(DisplayElement::ControlPoint))
        .map(move |element| DisplayItem { object, element })
}
