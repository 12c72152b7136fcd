//! View-side placement of chart content.
//!
//! Nothing here draws; it resolves the document's displayable sequence and
//! the meter map into continuous positions a renderer can consume directly.

use std::collections::BTreeMap;

use crate::{
    document::Fumen,
    grid::{Axis, TGrid, TimeAxis},
    mapping::{LaneScale, TempoTimeline, TimeScale},
    objects::{DisplayElement, ObjectKind},
    timeline::{Meter, MeterMap},
    FumenError, Result,
};

/// A display item resolved to view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedItem {
    pub kind: ObjectKind,
    pub element: DisplayElement,
    pub tgrid: TGrid,
    /// Position along the scrolling axis.
    pub y: f64,
    /// Horizontal position, for objects placed on a lane.
    pub x: Option<f64>,
}

/// Every displayable element of a chart, in document order.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    items: Vec<PlacedItem>,
}

impl DisplayList {
    pub fn build(fumen: &Fumen, time: TimeScale, lanes: LaneScale) -> Result<Self> {
        let timeline = TempoTimeline::new(fumen.tempo_map(), time)?;
        let items: Vec<_> = fumen
            .all_displayable_objects()
            .map(|item| {
                let tgrid = item.tgrid();
                PlacedItem {
                    kind: item.kind(),
                    element: item.element,
                    tgrid,
                    y: timeline.to_continuous(tgrid),
                    x: item.xgrid().map(|xgrid| lanes.to_continuous(xgrid)),
                }
            })
            .collect();

        tracing::trace!(count = items.len(), "display list built");
        Ok(Self { items })
    }

    pub fn items(&self) -> &[PlacedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose scroll position lies in `[from, to]`.
    pub fn visible(&self, from: f64, to: f64) -> impl Iterator<Item = &PlacedItem> + '_ {
        self.items
            .iter()
            .filter(move |item| item.y >= from && item.y <= to)
    }

    pub fn count_by_kind(&self) -> BTreeMap<ObjectKind, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// A beat line of the editor grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLine {
    pub tgrid: TGrid,
    pub meter: Meter,
    /// Zero-based beat within the measure.
    pub beat: u32,
    pub is_measure: bool,
}

/// Beat lines in `[from, to]`.
///
/// One time unit spans `beats_per_unit` quarter notes, so a beat of a
/// `n/d` meter lasts `RADIX * 4 / (d * beats_per_unit)` grids. Positions are
/// rounded to the nearest grid per beat from the start of their meter
/// segment, and beat counting restarts at every meter breakpoint.
pub fn beat_lines(
    meter_map: &MeterMap,
    from: TGrid,
    to: TGrid,
    beats_per_unit: f64,
) -> Result<Vec<GridLine>> {
    if !meter_map.has_sentinel() {
        return Err(FumenError::MissingSentinel("meter"));
    }
    if !(beats_per_unit.is_finite() && beats_per_unit > 0.0) {
        return Err(FumenError::InvalidInput("beats per unit must be positive and finite"));
    }

    let (from, to) = (from.total_grid(), to.total_grid());
    let mut lines = Vec::new();
    for (breakpoint, next) in meter_map.segments() {
        let start = breakpoint.tgrid.total_grid();
        let end = next.map_or(i64::MAX, |next| next.tgrid.total_grid());
        if start >= end || start > to {
            continue;
        }

        let meter = breakpoint.value;
        let beat_grids = f64::from(TimeAxis::RADIX) * 4.0
            / (f64::from(meter.denominator) * beats_per_unit);
        let beat_at = |k: u64| start.saturating_add((k as f64 * beat_grids).round() as i64);

        // first beat index that could reach `from`
        let mut k = ((from - start) as f64 / beat_grids).floor().max(1.0) as u64 - 1;
        loop {
            let position = beat_at(k);
            if position >= end || position > to {
                break;
            }
            if position >= from {
                let beat = (k % u64::from(meter.numerator)) as u32;
                lines.push(GridLine {
                    tgrid: TGrid::from_total_grid(position),
                    meter,
                    beat,
                    is_measure: beat == 0,
                });
            }
            k += 1;
        }
    }
    Ok(lines)
}
