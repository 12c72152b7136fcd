use std::{
    path::Path,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    config::EditorConfig,
    document::Fumen,
    grid::TGrid,
    mapping::TempoTimeline,
    objects::FumenObject,
    render::DisplayList,
    FumenError, Result,
};

/// An open chart shared between the editing thread and any number of
/// readers (renderers, previews, exporters).
///
/// Every edit runs [`Fumen::setup`] before the write lock is released, so
/// readers only ever observe a normalized document.
#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,
    fumen: Arc<RwLock<Fumen>>,
}

impl EditorSession {
    pub fn new(mut fumen: Fumen, config: EditorConfig) -> Self {
        fumen.setup();
        Self {
            config,
            fumen: Arc::new(RwLock::new(fumen)),
        }
    }

    /// Loads a chart file and normalizes it.
    pub fn open(path: impl AsRef<Path>, config: EditorConfig) -> Result<Self> {
        let fumen = Fumen::load(path)?;
        Ok(Self::new(fumen, config))
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Returns a cloneable read-only handle to the shared document.
    pub fn handle(&self) -> FumenHandle {
        FumenHandle {
            shared: self.fumen.clone(),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&Fumen) -> R) -> Result<R> {
        let fumen = self.lock_read()?;
        Ok(f(&*fumen))
    }

    /// Applies an edit, then renormalizes the document.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Fumen) -> Result<R>) -> Result<R> {
        let mut fumen = self.lock_write()?;
        let outcome = f(&mut *fumen);
        fumen.setup();
        outcome
    }

    pub fn add_object(&self, object: impl Into<FumenObject>) -> Result<()> {
        let object = object.into();
        self.edit(|fumen| fumen.add_object(object))
    }

    pub fn remove_object(&self, object: &FumenObject) -> Result<bool> {
        self.edit(|fumen| Ok(fumen.remove_object(object)))
    }

    /// Places the current document for the configured view.
    pub fn display_list(&self) -> Result<DisplayList> {
        let time = self.config.time_scale()?;
        let lanes = self.config.lane_scale();
        let fumen = self.lock_read()?;
        DisplayList::build(&fumen, time, lanes)
    }

    /// Seconds elapsed at `tgrid` under the current tempo map.
    pub fn seconds_at(&self, tgrid: TGrid) -> Result<f64> {
        let scale = self.config.seconds_scale()?;
        let fumen = self.lock_read()?;
        Ok(TempoTimeline::new(fumen.tempo_map(), scale)?.to_continuous(tgrid))
    }

    /// Nearest time coordinate to `seconds` under the current tempo map.
    pub fn tgrid_at(&self, seconds: f64) -> Result<TGrid> {
        let scale = self.config.seconds_scale()?;
        let fumen = self.lock_read()?;
        TempoTimeline::new(fumen.tempo_map(), scale)?.to_coordinate(seconds)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.lock_read()?.save(path)
    }

    fn lock_read(&self) -> Result<RwLockReadGuard<'_, Fumen>> {
        self.fumen
            .read()
            .map_err(|_| FumenError::Poisoned("chart document"))
    }

    fn lock_write(&self) -> Result<RwLockWriteGuard<'_, Fumen>> {
        self.fumen
            .write()
            .map_err(|_| FumenError::Poisoned("chart document"))
    }
}

/// Shared, read-only view over the document owned by an [`EditorSession`].
#[derive(Debug, Clone)]
pub struct FumenHandle {
    shared: Arc<RwLock<Fumen>>,
}

impl FumenHandle {
    pub fn read<R>(&self, f: impl FnOnce(&Fumen) -> R) -> Result<R> {
        let fumen = self
            .shared
            .read()
            .map_err(|_| FumenError::Poisoned("chart document"))?;
        Ok(f(&*fumen))
    }

    /// Snapshot copy of the document as of now.
    pub fn snapshot(&self) -> Result<Fumen> {
        self.read(Fumen::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::FumenMetaInfo,
        grid::XGrid,
        objects::Tap,
        timeline::{Breakpoint, Tempo},
    };

    fn t(unit: i64, grid: i32) -> TGrid {
        TGrid::new(unit, grid).unwrap()
    }

    fn session(first_bpm: f64) -> EditorSession {
        let fumen = Fumen::with_meta(FumenMetaInfo {
            first_bpm: Tempo::new(first_bpm).unwrap(),
            ..Default::default()
        })
        .unwrap();
        EditorSession::new(fumen, EditorConfig::default())
    }

    fn tap(unit: i64) -> Tap {
        Tap {
            tgrid: t(unit, 0),
            xgrid: XGrid::ZERO,
            critical: false,
        }
    }

    #[test]
    fn edits_leave_document_normalized() {
        let session = session(120.0);
        session.add_object(tap(3)).unwrap();
        session.add_object(tap(1)).unwrap();

        let first = session.read(|fumen| fumen.taps()[0].tgrid).unwrap();
        assert_eq!(first, t(1, 0));
        assert!(session.remove_object(&tap(3).into()).unwrap());
        assert!(!session.remove_object(&tap(3).into()).unwrap());
    }

    #[test]
    fn failed_edit_is_reported() {
        let session = session(120.0);
        let result = session.add_object(Breakpoint::new(t(-2, 0), Tempo::default()));
        assert!(result.is_err());
        assert_eq!(session.read(|fumen| fumen.tempo_map().len()).unwrap(), 1);
    }

    #[test]
    fn conversions_follow_tempo_edits() {
        let session = session(120.0);
        assert!((session.seconds_at(t(4, 0)).unwrap() - 8.0).abs() < 1e-9);

        session
            .add_object(Breakpoint::new(t(4, 0), Tempo::new(180.0).unwrap()))
            .unwrap();
        assert!((session.seconds_at(t(5, 0)).unwrap() - (8.0 + 4.0 / 3.0)).abs() < 1e-9);
        assert_eq!(session.tgrid_at(8.0).unwrap(), t(4, 0));
    }

    #[test]
    fn handles_read_from_other_threads() {
        let session = session(150.0);
        session.add_object(tap(2)).unwrap();
        let handle = session.handle();

        let count = std::thread::spawn(move || handle.read(|fumen| fumen.taps().len()))
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(count, 1);

        let copy = session.handle().snapshot().unwrap();
        assert_eq!(copy.meta().first_bpm, Tempo::new(150.0).unwrap());
        assert_eq!(session.display_list().unwrap().len(), 1);
    }
}
