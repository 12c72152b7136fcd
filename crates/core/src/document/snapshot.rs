use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Fumen, FumenMetaInfo};
use crate::{
    objects::{FumenObject, ObjectKind},
    Result,
};

/// On-disk chart layout: metadata plus a flat list of tagged objects.
#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    meta: FumenMetaInfo,
    #[serde(default)]
    objects: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct SnapshotRef<'a> {
    meta: &'a FumenMetaInfo,
    objects: Vec<FumenObject>,
}

impl Fumen {
    /// Reads a chart snapshot. The result is not set up yet.
    ///
    /// Objects whose `kind` is not recognised are logged and skipped. Objects
    /// of a known kind that fail to parse abort the load.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_reader(reader)?;
        let mut fumen = Fumen::with_meta(raw.meta)?;

        let mut skipped = 0usize;
        for (index, value) in raw.objects.into_iter().enumerate() {
            let known = value
                .get("kind")
                .and_then(|kind| ObjectKind::deserialize(kind).ok())
                .is_some();
            if !known {
                let kind = value.get("kind").cloned().unwrap_or(Value::Null);
                tracing::warn!(index, %kind, "no collection accepts chart object, skipping");
                skipped += 1;
                continue;
            }
            let object: FumenObject = serde_json::from_value(value)?;
            fumen.add_object(object)?;
        }

        tracing::debug!(skipped, "chart snapshot read");
        Ok(fumen)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json_reader(json.as_bytes())
    }

    /// Loads a chart file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "loading chart");
        Self::from_json_reader(BufReader::new(File::open(path)?))
    }

    /// Writes metadata and every stored object. Sentinels are implied by the
    /// metadata and are not written.
    pub fn to_json_writer<W: Write>(&self, writer: W) -> Result<()> {
        let snapshot = SnapshotRef {
            meta: &self.meta,
            objects: self.to_objects(),
        };
        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.to_json_writer(&mut buffer)?;
        String::from_utf8(buffer).map_err(|err| err.to_string().into())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_json_writer(&mut writer)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), "chart saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        document::Fumen,
        grid::TGrid,
        objects::ObjectKind,
        timeline::Tempo,
    };

    const CHART: &str = r#"{
        "meta": { "title": "demo", "first_bpm": 150 },
        "objects": [
            { "kind": "tap", "tgrid": { "unit": 2 }, "xgrid": { "unit": 1 } },
            { "kind": "soflan", "tgrid": { "unit": 1 } },
            { "kind": "bpm_change", "tgrid": { "unit": 4 }, "value": 75 },
            { "tgrid": { "unit": 3 } },
            { "kind": "tap", "tgrid": { "unit": 1 }, "xgrid": { "unit": -1 } }
        ]
    }"#;

    #[test]
    fn load_skips_unknown_kinds() {
        let mut fumen = Fumen::from_json_str(CHART).unwrap();
        fumen.setup();

        assert_eq!(fumen.meta().title, "demo");
        assert_eq!(fumen.taps().len(), 2);
        assert_eq!(fumen.taps()[0].tgrid, TGrid::new(1, 0).unwrap());
        assert_eq!(fumen.tempo_map().sentinel().unwrap().value, Tempo::new(150.0).unwrap());
        assert_eq!(fumen.tempo_map().changes().len(), 1);
    }

    #[test]
    fn malformed_known_objects_fail_the_load() {
        let chart = r#"{ "objects": [ { "kind": "tap", "tgrid": { "unit": 0, "grid": 9999 }, "xgrid": { "unit": 0 } } ] }"#;
        assert!(Fumen::from_json_str(chart).is_err());

        let chart = r#"{ "objects": [ { "kind": "bpm_change", "tgrid": { "unit": 1 }, "value": 0 } ] }"#;
        assert!(Fumen::from_json_str(chart).is_err());
    }

    #[test]
    fn oversized_units_fail_the_load() {
        let chart = r#"{ "objects": [
            { "kind": "tap", "tgrid": { "unit": 9000000000000000000 }, "xgrid": { "unit": 0 } }
        ] }"#;
        let err = Fumen::from_json_str(chart).unwrap_err();
        assert!(err.to_string().contains("outside"), "{err}");

        let chart = r#"{ "objects": [
            { "kind": "tap", "tgrid": { "unit": 1 }, "xgrid": { "unit": -9000000000000000000 } }
        ] }"#;
        assert!(Fumen::from_json_str(chart).is_err());
    }

    #[test]
    fn written_snapshot_reloads_identically() {
        let mut fumen = Fumen::from_json_str(CHART).unwrap();
        fumen.setup();

        let json = fumen.to_json_string().unwrap();
        assert!(!json.contains("soflan"));

        let mut reloaded = Fumen::from_json_str(&json).unwrap();
        reloaded.setup();
        assert_eq!(reloaded, fumen);
        assert_eq!(
            reloaded
                .all_displayable_objects()
                .filter(|item| item.kind() == ObjectKind::BpmChange)
                .count(),
            1
        );
    }
}
