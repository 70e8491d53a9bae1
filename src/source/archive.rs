use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use super::{SceneArchive, SceneQuery, SceneRef};
use crate::{
    components::files::FileBackend,
    errors::{NdviError, Result},
    scene::Scene,
};

fn not_archived(scene: &SceneRef) -> NdviError {
    NdviError::Malformed {
        kind: "scene",
        reason: format!("{} ({}) is not in the archive", scene.id, scene.acquired),
    }
}

/// Archive over scenes already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArchive(Vec<Scene>);

impl InMemoryArchive {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self(scenes)
    }
}

impl SceneArchive for InMemoryArchive {
    fn find(&self, query: &SceneQuery) -> Result<Vec<SceneRef>> {
        let mut found = Vec::new();
        for scene in &self.0 {
            if query.admits(scene.acquired(), scene.footprint())? {
                found.push(scene.reference());
            }
        }
        found.sort();
        Ok(found)
    }

    fn load(&self, scene: &SceneRef, bands: &[String]) -> Result<Scene> {
        self.0
            .iter()
            .find(|candidate| candidate.id() == scene.id && candidate.acquired() == scene.acquired)
            .ok_or_else(|| not_archived(scene))?
            .clone()
            .select(bands)
    }
}

/// Band of a manifest entry: a single band file or a band of a multi band file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BandSource {
    Path(PathBuf),
    Indexed { path: PathBuf, index: usize },
}

impl BandSource {
    pub fn path(&self) -> &Path {
        match self {
            BandSource::Path(path) | BandSource::Indexed { path, .. } => path,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            BandSource::Path(_) => 0,
            BandSource::Indexed { index, .. } => *index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub acquired: NaiveDate,
    pub bands: BTreeMap<String, BandSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneManifest {
    pub scenes: Vec<ManifestEntry>,
}

/// Archive of band files listed in a YAML manifest.
///
/// Relative paths resolve against the manifest's directory. Footprints come from the headers of
/// the first requested band, pixels are only read for admitted scenes.
#[derive(Debug, Clone)]
pub struct ManifestArchive {
    manifest: SceneManifest,
    base_dir: PathBuf,
    backend: FileBackend,
}

impl ManifestArchive {
    pub fn new(manifest: SceneManifest, base_dir: impl Into<PathBuf>, backend: FileBackend) -> Self {
        Self {
            manifest,
            base_dir: base_dir.into(),
            backend,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P, backend: FileBackend) -> Result<Self> {
        let manifest: SceneManifest = serde_yaml::from_str(&fs::read_to_string(&path)?)?;
        let base_dir = path
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        info!(
            "scene manifest {} lists {} scenes",
            path.as_ref().display(),
            manifest.scenes.len()
        );
        Ok(Self::new(manifest, base_dir, backend))
    }

    fn resolve(&self, source: &BandSource) -> PathBuf {
        self.base_dir.join(source.path())
    }

    fn band<'a>(&self, entry: &'a ManifestEntry, name: &str) -> Result<&'a BandSource> {
        entry.bands.get(name).ok_or_else(|| NdviError::MissingBand {
            scene: entry.id.clone(),
            band: name.into(),
        })
    }

    fn admits(&self, entry: &ManifestEntry, query: &SceneQuery) -> Result<bool> {
        if !query.filter.matches(entry.acquired) {
            return Ok(false);
        }
        let Some(first) = query.bands.first() else {
            return Err(NdviError::configuration("scene query requests no bands"));
        };
        let footprint = self
            .backend
            .footprint(&self.resolve(self.band(entry, first)?))?;
        query.admits(entry.acquired, &footprint)
    }

    fn read(&self, entry: &ManifestEntry, bands: &[String]) -> Result<Scene> {
        debug!("reading scene {}", entry.id);
        let rasters = bands
            .iter()
            .map(|name| {
                let source = self.band(entry, name)?;
                let raster = self
                    .backend
                    .read_raster(&self.resolve(source), source.index())?;
                Ok((name.clone(), raster))
            })
            .collect::<Result<Vec<_>>>()?;
        Scene::new(entry.id.clone(), entry.acquired, rasters)
    }
}

impl SceneArchive for ManifestArchive {
    fn find(&self, query: &SceneQuery) -> Result<Vec<SceneRef>> {
        let mut found = Vec::new();
        for entry in &self.manifest.scenes {
            if self.admits(entry, query)? {
                found.push(SceneRef::new(entry.id.clone(), entry.acquired));
            }
        }
        info!(
            "{} of {} scenes match the query",
            found.len(),
            self.manifest.scenes.len()
        );
        found.sort();
        Ok(found)
    }

    fn load(&self, scene: &SceneRef, bands: &[String]) -> Result<Scene> {
        let entry = self
            .manifest
            .scenes
            .iter()
            .find(|entry| entry.id == scene.id && entry.acquired == scene.acquired)
            .ok_or_else(|| not_archived(scene))?;
        self.read(entry, bands)
    }
}
