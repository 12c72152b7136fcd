//! The chart document.
//!
//! [`Fumen`] owns one collection per object kind plus the tempo and meter
//! maps. Objects are routed to their collection by an exhaustive match on
//! [`FumenObject`]. Collections are only guaranteed to be ordered after
//! [`Fumen::setup`], which also installs the origin sentinels from the
//! metadata.

mod snapshot;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    grid::TGrid,
    objects::{
        display_items, BeamNode, Bell, Bullet, BulletPalette, ChartObject, ClickSe, DisplayItem,
        EnemySet, Flick, FumenObject, HoldNode, LaneNode, LaneType, Placement, Tap,
    },
    timeline::{Meter, MeterMap, Tempo, TempoMap},
    Result,
};

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FumenMetaInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub creator: String,
    /// Tempo in force at the origin.
    #[serde(default)]
    pub first_bpm: Tempo,
    /// Meter in force at the origin.
    #[serde(default)]
    pub first_meter: Meter,
}

impl FumenMetaInfo {
    pub fn validated(self) -> Result<Self> {
        self.first_meter.validated()?;
        Ok(self)
    }
}

/// One lane's nodes joined into a path, curve control points included.
#[derive(Debug, Clone, PartialEq)]
pub struct LanePolyline {
    pub lane_id: u32,
    pub lane_type: LaneType,
    pub points: Vec<Placement>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fumen {
    meta: FumenMetaInfo,
    tempo_map: TempoMap,
    meter_map: MeterMap,
    bullet_palettes: BTreeMap<String, BulletPalette>,
    taps: Vec<Tap>,
    bells: Vec<Bell>,
    flicks: Vec<Flick>,
    holds: Vec<HoldNode>,
    beams: Vec<BeamNode>,
    bullets: Vec<Bullet>,
    click_ses: Vec<ClickSe>,
    lanes: Vec<LaneNode>,
    enemy_sets: Vec<EnemySet>,
}

impl Fumen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meta(meta: FumenMetaInfo) -> Result<Self> {
        Ok(Self {
            meta: meta.validated()?,
            ..Self::default()
        })
    }

    pub fn meta(&self) -> &FumenMetaInfo {
        &self.meta
    }

    /// Replaces the metadata and pushes the initial tempo and meter onto the
    /// sentinels right away.
    pub fn set_meta_info(&mut self, meta: FumenMetaInfo) -> Result<()> {
        self.meta = meta.validated()?;
        self.apply_first_bpm();
        self.apply_first_meter();
        Ok(())
    }

    pub fn set_first_bpm(&mut self, tempo: Tempo) {
        self.meta.first_bpm = tempo;
        self.apply_first_bpm();
    }

    pub fn set_first_meter(&mut self, meter: Meter) -> Result<()> {
        self.meta.first_meter = meter.validated()?;
        self.apply_first_meter();
        Ok(())
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    pub fn meter_map(&self) -> &MeterMap {
        &self.meter_map
    }

    pub fn taps(&self) -> &[Tap] {
        &self.taps
    }

    pub fn bells(&self) -> &[Bell] {
        &self.bells
    }

    pub fn flicks(&self) -> &[Flick] {
        &self.flicks
    }

    /// Hold starts and ends in one collection.
    pub fn holds(&self) -> &[HoldNode] {
        &self.holds
    }

    pub fn beams(&self) -> &[BeamNode] {
        &self.beams
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn click_ses(&self) -> &[ClickSe] {
        &self.click_ses
    }

    /// Lane start, next and end nodes of every lane.
    pub fn lanes(&self) -> &[LaneNode] {
        &self.lanes
    }

    pub fn enemy_sets(&self) -> &[EnemySet] {
        &self.enemy_sets
    }

    pub fn bullet_palettes(&self) -> impl Iterator<Item = &BulletPalette> + '_ {
        self.bullet_palettes.values()
    }

    pub fn palette_for(&self, bullet: &Bullet) -> Option<&BulletPalette> {
        self.bullet_palettes.get(&bullet.palette)
    }

    /// Stores `object` in the collection for its kind.
    ///
    /// Fails only for breakpoints that can never be valid (before the origin,
    /// or a meter with a zero part).
    pub fn add_object(&mut self, object: impl Into<FumenObject>) -> Result<()> {
        match object.into() {
            FumenObject::Tap(tap) => self.taps.push(tap),
            FumenObject::Bell(bell) => self.bells.push(bell),
            FumenObject::Flick(flick) => self.flicks.push(flick),
            FumenObject::Hold(node) => self.holds.push(node),
            FumenObject::Beam(node) => self.beams.push(node),
            FumenObject::Bullet(bullet) => self.bullets.push(bullet),
            FumenObject::BulletPalette(palette) => {
                self.bullet_palettes.insert(palette.id.clone(), palette);
            }
            FumenObject::ClickSe(click) => self.click_ses.push(click),
            FumenObject::Lane(node) => self.lanes.push(node),
            FumenObject::EnemySet(set) => self.enemy_sets.push(set),
            FumenObject::BpmChange(change) => self.tempo_map.insert(change)?,
            FumenObject::MeterChange(change) => {
                change.value.validated()?;
                self.meter_map.insert(change)?;
            }
        }
        Ok(())
    }

    pub fn add_objects<I>(&mut self, objects: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<FumenObject>,
    {
        for object in objects {
            self.add_object(object)?;
        }
        Ok(())
    }

    /// Removes the first stored object equal to `object`. Returns whether
    /// anything was removed; the tempo and meter sentinels never are.
    pub fn remove_object(&mut self, object: &FumenObject) -> bool {
        let removed = match object {
            FumenObject::Tap(tap) => remove_first(&mut self.taps, tap),
            FumenObject::Bell(bell) => remove_first(&mut self.bells, bell),
            FumenObject::Flick(flick) => remove_first(&mut self.flicks, flick),
            FumenObject::Hold(node) => remove_first(&mut self.holds, node),
            FumenObject::Beam(node) => remove_first(&mut self.beams, node),
            FumenObject::Bullet(bullet) => remove_first(&mut self.bullets, bullet),
            FumenObject::BulletPalette(palette) => {
                let stored = self.bullet_palettes.get(&palette.id) == Some(palette);
                if stored {
                    self.bullet_palettes.remove(&palette.id);
                }
                stored
            }
            FumenObject::ClickSe(click) => remove_first(&mut self.click_ses, click),
            FumenObject::Lane(node) => remove_first(&mut self.lanes, node),
            FumenObject::EnemySet(set) => remove_first(&mut self.enemy_sets, set),
            FumenObject::BpmChange(change) => self.tempo_map.remove(change),
            FumenObject::MeterChange(change) => self.meter_map.remove(change),
        };
        if !removed {
            tracing::debug!(kind = %object.kind(), "remove target not found");
        }
        removed
    }

    pub fn remove_objects<'a, I>(&mut self, objects: I) -> usize
    where
        I: IntoIterator<Item = &'a FumenObject>,
    {
        objects
            .into_iter()
            .filter(|object| self.remove_object(object))
            .count()
    }

    /// Normalizes the document. Idempotent.
    ///
    /// 1. stable-sorts every positioned collection by time coordinate
    /// 2. sorts the tempo map and installs the tempo sentinel from metadata
    /// 3. the same for the meter map
    /// 4. sorts enemy sets
    pub fn setup(&mut self) {
        sort_by_tgrid(&mut self.taps);
        sort_by_tgrid(&mut self.bells);
        sort_by_tgrid(&mut self.flicks);
        sort_by_tgrid(&mut self.holds);
        sort_by_tgrid(&mut self.beams);
        sort_by_tgrid(&mut self.bullets);
        sort_by_tgrid(&mut self.click_ses);
        sort_by_tgrid(&mut self.lanes);

        self.tempo_map.sort();
        self.tempo_map.set_sentinel(self.meta.first_bpm);

        self.meter_map.sort();
        self.meter_map.set_sentinel(self.meta.first_meter);

        sort_by_tgrid(&mut self.enemy_sets);

        tracing::debug!(
            tempo_breakpoints = self.tempo_map.len(),
            meter_breakpoints = self.meter_map.len(),
            "fumen setup complete"
        );
    }

    /// Every renderable element, sentinels excluded, in a fixed order: bells,
    /// flicks, meter changes, tempo changes, click sounds, enemy sets,
    /// bullets, lanes, taps, holds, beams. Recomputed on each call.
    pub fn all_displayable_objects(&self) -> impl Iterator<Item = DisplayItem<'_>> + '_ {
        as_dyn(&self.bells)
            .chain(as_dyn(&self.flicks))
            .chain(as_dyn(self.meter_map.changes()))
            .chain(as_dyn(self.tempo_map.changes()))
            .chain(as_dyn(&self.click_ses))
            .chain(as_dyn(&self.enemy_sets))
            .chain(as_dyn(&self.bullets))
            .chain(as_dyn(&self.lanes))
            .chain(as_dyn(&self.taps))
            .chain(as_dyn(&self.holds))
            .chain(as_dyn(&self.beams))
            .flat_map(|object| display_items(object))
    }

    /// Lanes grouped by id, each as one ordered path from its start node to
    /// its end node with curve control points in between.
    pub fn lane_polylines(&self) -> Vec<LanePolyline> {
        let mut grouped: BTreeMap<u32, Vec<&LaneNode>> = BTreeMap::new();
        for node in &self.lanes {
            grouped.entry(node.lane_id).or_default().push(node);
        }

        grouped
            .into_iter()
            .filter_map(|(lane_id, mut nodes)| {
                nodes.sort_by_key(|node| node.tgrid);
                let lane_type = nodes.first()?.lane_type;
                let points = nodes
                    .iter()
                    .flat_map(|node| {
                        node.curve
                            .iter()
                            .copied()
                            .chain(std::iter::once(node.placement()))
                    })
                    .collect();
                Some(LanePolyline {
                    lane_id,
                    lane_type,
                    points,
                })
            })
            .collect()
    }

    /// Last time coordinate used by any positioned object.
    pub fn max_tgrid(&self) -> Option<TGrid> {
        self.all_displayable_objects().map(|item| item.tgrid()).max()
    }

    /// All stored objects, palettes first and sentinels excluded, in the
    /// shape [`Fumen::add_object`] accepts.
    pub fn to_objects(&self) -> Vec<FumenObject> {
        let mut objects = Vec::new();
        objects.extend(self.bullet_palettes.values().cloned().map(FumenObject::from));
        objects.extend(self.tempo_map.changes().iter().copied().map(FumenObject::from));
        objects.extend(self.meter_map.changes().iter().copied().map(FumenObject::from));
        objects.extend(self.taps.iter().cloned().map(FumenObject::from));
        objects.extend(self.bells.iter().cloned().map(FumenObject::from));
        objects.extend(self.flicks.iter().cloned().map(FumenObject::from));
        objects.extend(self.holds.iter().cloned().map(FumenObject::from));
        objects.extend(self.beams.iter().cloned().map(FumenObject::from));
        objects.extend(self.bullets.iter().cloned().map(FumenObject::from));
        objects.extend(self.click_ses.iter().cloned().map(FumenObject::from));
        objects.extend(self.lanes.iter().cloned().map(FumenObject::from));
        objects.extend(self.enemy_sets.iter().cloned().map(FumenObject::from));
        objects
    }

    fn apply_first_bpm(&mut self) {
        if self.tempo_map.has_sentinel() {
            self.tempo_map.set_sentinel(self.meta.first_bpm);
            tracing::debug!(bpm = %self.meta.first_bpm, "applied metadata first BPM to tempo sentinel");
        }
    }

    fn apply_first_meter(&mut self) {
        if self.meter_map.has_sentinel() {
            self.meter_map.set_sentinel(self.meta.first_meter);
            tracing::debug!(meter = %self.meta.first_meter, "applied metadata first meter to meter sentinel");
        }
    }
}

fn sort_by_tgrid<T: ChartObject>(items: &mut [T]) {
    items.sort_by_key(|item| item.tgrid());
}

fn remove_first<T: PartialEq>(items: &mut Vec<T>, target: &T) -> bool {
    match items.iter().position(|item| item == target) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}

fn as_dyn<'a, T: ChartObject + 'a>(
    items: &'a [T],
) -> impl Iterator<Item = &'a dyn ChartObject> + 'a {
    items.iter().map(|item| item as &dyn ChartObject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::XGrid,
        objects::{DisplayElement, EnemyWave, HoldRole, ObjectKind, PathRole},
        timeline::{Breakpoint, BpmChange},
    };

    fn t(unit: i64, grid: i32) -> TGrid {
        TGrid::new(unit, grid).unwrap()
    }

    fn x(unit: i64) -> XGrid {
        XGrid::new(unit, 0).unwrap()
    }

    fn bpm(tgrid: TGrid, value: f64) -> BpmChange {
        Breakpoint::new(tgrid, Tempo::new(value).unwrap())
    }

    fn meta(first_bpm: f64) -> FumenMetaInfo {
        FumenMetaInfo {
            first_bpm: Tempo::new(first_bpm).unwrap(),
            ..Default::default()
        }
    }

    fn tap(unit: i64) -> Tap {
        Tap {
            tgrid: t(unit, 0),
            xgrid: x(0),
            critical: false,
        }
    }

    fn lane(lane_id: u32, role: PathRole, unit: i64, xunit: i64) -> LaneNode {
        LaneNode {
            lane_id,
            lane_type: LaneType::Left,
            role,
            tgrid: t(unit, 0),
            xgrid: x(xunit),
            curve: Vec::new(),
        }
    }

    #[test]
    fn setup_installs_single_tempo_sentinel() {
        let mut fumen = Fumen::with_meta(meta(120.0)).unwrap();
        fumen.setup();
        assert_eq!(fumen.tempo_map().as_slice(), &[bpm(TGrid::ZERO, 120.0)]);

        fumen.add_object(bpm(TGrid::ZERO, 120.0)).unwrap();
        fumen.setup();
        assert_eq!(fumen.tempo_map().as_slice(), &[bpm(TGrid::ZERO, 120.0)]);
        assert_eq!(fumen.meter_map().sentinel().unwrap().value, Meter::COMMON);
    }

    #[test]
    fn setup_is_idempotent() {
        let mut fumen = Fumen::with_meta(meta(150.0)).unwrap();
        fumen
            .add_objects([
                FumenObject::from(tap(3)),
                tap(1).into(),
                bpm(t(4, 0), 200.0).into(),
                bpm(TGrid::ZERO, 150.0).into(),
                EnemySet {
                    tgrid: t(9, 0),
                    wave: EnemyWave::Boss,
                }
                .into(),
                EnemySet {
                    tgrid: t(2, 0),
                    wave: EnemyWave::Wave1,
                }
                .into(),
            ])
            .unwrap();

        fumen.setup();
        let once = fumen.clone();
        fumen.setup();
        assert_eq!(fumen, once);
        assert_eq!(fumen.taps()[0].tgrid, t(1, 0));
        assert_eq!(fumen.enemy_sets()[0].wave, EnemyWave::Wave1);
        assert_eq!(fumen.tempo_map().len(), 2);
    }

    #[test]
    fn hold_start_and_end_share_a_collection() {
        let mut fumen = Fumen::new();
        fumen
            .add_object(HoldNode {
                hold_id: 1,
                role: HoldRole::End,
                tgrid: t(2, 100),
                xgrid: x(1),
                critical: false,
            })
            .unwrap();
        fumen
            .add_object(HoldNode {
                hold_id: 1,
                role: HoldRole::Start,
                tgrid: t(1, 0),
                xgrid: x(1),
                critical: false,
            })
            .unwrap();
        fumen.setup();

        let roles: Vec<_> = fumen.holds().iter().map(|node| node.role).collect();
        assert_eq!(roles, vec![HoldRole::Start, HoldRole::End]);
    }

    #[test]
    fn displayable_objects_skip_sentinels() {
        let mut fumen = Fumen::with_meta(meta(120.0)).unwrap();
        fumen.add_object(tap(1)).unwrap();
        fumen.add_object(bpm(t(4, 0), 180.0)).unwrap();
        fumen.setup();

        let kinds: Vec<_> = fumen.all_displayable_objects().map(|item| item.kind()).collect();
        assert_eq!(kinds, vec![ObjectKind::BpmChange, ObjectKind::Tap]);
        assert!(fumen
            .all_displayable_objects()
            .all(|item| item.kind() != ObjectKind::MeterChange));
    }

    #[test]
    fn displayable_objects_keep_user_origin_breakpoint() {
        let mut fumen = Fumen::with_meta(meta(120.0)).unwrap();
        fumen.setup();
        fumen.add_object(bpm(TGrid::ZERO, 90.0)).unwrap();
        fumen.add_object(bpm(TGrid::ZERO, 95.0)).unwrap();
        fumen.setup();
        assert_eq!(fumen.tempo_map().changes(), &[bpm(TGrid::ZERO, 95.0)]);

        let origin: Vec<_> = fumen
            .all_displayable_objects()
            .filter(|item| item.tgrid().is_origin())
            .collect();
        assert_eq!(origin.len(), 1);
        assert_eq!(origin[0].kind(), ObjectKind::BpmChange);
    }

    #[test]
    fn displayable_sequence_is_restartable() {
        let mut fumen = Fumen::new();
        fumen.add_object(tap(2)).unwrap();
        let mut curved = lane(1, PathRole::End, 4, 0);
        curved.curve = vec![Placement::new(t(3, 0), x(2))];
        fumen.add_object(curved).unwrap();
        fumen.setup();

        let first: Vec<_> = fumen.all_displayable_objects().map(|item| item.element).collect();
        let second: Vec<_> = fumen.all_displayable_objects().map(|item| item.element).collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![DisplayElement::Body, DisplayElement::ControlPoint(0), DisplayElement::Body]
        );
    }

    #[test]
    fn metadata_changes_reach_sentinels_immediately() {
        let mut fumen = Fumen::with_meta(meta(120.0)).unwrap();
        fumen.setup();

        fumen.set_first_bpm(Tempo::new(200.0).unwrap());
        assert_eq!(fumen.tempo_map().sentinel().unwrap().value.bpm(), 200.0);

        fumen.set_first_meter(Meter::new(3, 4).unwrap()).unwrap();
        assert_eq!(fumen.meter_map().sentinel().unwrap().value, Meter::new(3, 4).unwrap());

        fumen.set_meta_info(meta(90.0)).unwrap();
        assert_eq!(fumen.tempo_map().sentinel().unwrap().value.bpm(), 90.0);
        assert_eq!(fumen.meter_map().sentinel().unwrap().value, Meter::COMMON);
        assert!(fumen.set_first_meter(Meter { numerator: 4, denominator: 0 }).is_err());
    }

    #[test]
    fn removing_objects() {
        let mut fumen = Fumen::with_meta(meta(120.0)).unwrap();
        fumen.add_object(tap(1)).unwrap();
        fumen.add_object(tap(1)).unwrap();
        fumen.setup();

        assert!(fumen.remove_object(&tap(1).into()));
        assert_eq!(fumen.taps().len(), 1);
        assert!(!fumen.remove_object(&tap(5).into()));

        let sentinel = FumenObject::BpmChange(bpm(TGrid::ZERO, 120.0));
        assert!(!fumen.remove_object(&sentinel));
        assert_eq!(fumen.tempo_map().len(), 1);
        assert_eq!(fumen.remove_objects([&FumenObject::from(tap(1))]), 1);
        assert!(fumen.taps().is_empty());
    }

    #[test]
    fn rejects_invalid_breakpoints() {
        let mut fumen = Fumen::new();
        let bad_meter = Breakpoint::new(t(1, 0), Meter { numerator: 0, denominator: 4 });
        assert!(fumen.add_object(bad_meter).is_err());
        assert!(fumen.add_object(bpm(t(-1, 0), 100.0)).is_err());
    }

    #[test]
    fn palettes_are_keyed_by_id() {
        let mut fumen = Fumen::new();
        let palette = |speed| BulletPalette {
            id: "A".to_string(),
            speed,
            size: Default::default(),
        };
        fumen.add_object(palette(1.0)).unwrap();
        fumen.add_object(palette(2.5)).unwrap();
        let bullet = Bullet {
            palette: "A".to_string(),
            tgrid: t(1, 0),
            xgrid: x(0),
        };
        fumen.add_object(bullet.clone()).unwrap();

        assert_eq!(fumen.bullet_palettes().count(), 1);
        assert_eq!(fumen.palette_for(&bullet).unwrap().speed, 2.5);
        assert!(!fumen.remove_object(&palette(1.0).into()));
        assert!(fumen.remove_object(&palette(2.5).into()));
        assert!(fumen.palette_for(&bullet).is_none());
    }

    #[test]
    fn lanes_group_into_polylines() {
        let mut fumen = Fumen::new();
        fumen
            .add_objects([
                lane(2, PathRole::Start, 0, 5),
                lane(1, PathRole::End, 8, -4),
                lane(1, PathRole::Start, 0, -2),
                lane(1, PathRole::Next, 4, -3),
                lane(2, PathRole::End, 2, 5),
            ])
            .unwrap();
        fumen.setup();

        let polylines = fumen.lane_polylines();
        assert_eq!(polylines.len(), 2);
        assert_eq!(polylines[0].lane_id, 1);
        let xs: Vec<_> = polylines[0].points.iter().map(|p| p.xgrid.unit()).collect();
        assert_eq!(xs, vec![-2, -3, -4]);
        assert_eq!(fumen.lanes().len(), 5);
        assert_eq!(fumen.max_tgrid(), Some(t(8, 0)));
    }

    #[test]
    fn to_objects_round_trips_through_add_object() {
        let mut fumen = Fumen::with_meta(meta(120.0)).unwrap();
        fumen.add_object(tap(1)).unwrap();
        fumen.add_object(bpm(t(4, 0), 180.0)).unwrap();
        fumen.add_object(ClickSe { tgrid: t(2, 0) }).unwrap();
        fumen.setup();

        let mut copy = Fumen::with_meta(fumen.meta().clone()).unwrap();
        copy.add_objects(fumen.to_objects()).unwrap();
        copy.setup();
        assert_eq!(copy, fumen);
    }
}
