use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;

use crate::error::HelioError;
use crate::frame::Frame;

/// Where one day's artifact lives inside the cache tree, relative to the
/// download root: directory components (mission, probe, instrument) plus the
/// canonical per-day filename. The year directory is interposed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLocation {
    pub components: Vec<String>,
    pub filename: String,
}

/// Archival artifact cache rooted at the configured download directory.
///
/// Paths are a pure function of the cache key; presence implies validity and
/// nothing is ever evicted.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn artifact_path(&self, location: &CacheLocation, day: NaiveDate) -> Utf8PathBuf {
        let mut path = self.root.clone();
        for component in &location.components {
            path.push(component);
        }
        path.push(day.format("%Y").to_string());
        path.push(&location.filename);
        path
    }

    pub fn exists(path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }

    pub fn ensure_parent(path: &Utf8Path) -> Result<(), HelioError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| HelioError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    /// Path of the fast-format sibling of a raw artifact.
    pub fn fast_cache_path(artifact: &Utf8Path) -> Utf8PathBuf {
        artifact.with_extension("json")
    }

    pub fn load_fast_cache(path: &Utf8Path) -> Result<Frame, HelioError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| HelioError::Filesystem(err.to_string()))?;
        serde_json::from_str(&content).map_err(|err| HelioError::Filesystem(err.to_string()))
    }

    pub fn write_fast_cache(path: &Utf8Path, frame: &Frame) -> Result<(), HelioError> {
        let content = serde_json::to_vec(frame)
            .map_err(|err| HelioError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }

    fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), HelioError> {
        Self::ensure_parent(path)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| HelioError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| HelioError::Filesystem(err.to_string()))
    }
}
