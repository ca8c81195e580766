use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::HelioError;

/// Process configuration, resolved once and handed to the session. Nothing
/// in the pipeline reads globals.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the local artifact cache.
    pub download_dir: Utf8PathBuf,
    /// Authentication cookie for the cluster science archive, if registered.
    pub csa_cookie: Option<String>,
    /// Whether decoded frames are mirrored into the JSON fast-format cache.
    pub use_fast_cache: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub download_dir: Option<String>,
    #[serde(default)]
    pub cluster_cookie: Option<String>,
    #[serde(default)]
    pub use_fast_cache: Option<bool>,
}

impl Config {
    pub fn new(download_dir: Utf8PathBuf) -> Self {
        Self {
            download_dir,
            csa_cookie: None,
            use_fast_cache: true,
        }
    }

    pub fn with_cookie(mut self, cookie: &str) -> Self {
        self.csa_cookie = Some(cookie.to_string());
        self
    }

    /// Loads configuration from an optional JSON file, then applies the
    /// `HELIOFETCH_DOWNLOAD_DIR`, `CLUSTERCOOKIE` and
    /// `HELIOFETCH_USE_FAST_CACHE` environment overrides.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, HelioError> {
        let file = match path {
            Some(path) => {
                let content = fs::read_to_string(path.as_std_path())
                    .map_err(|_| HelioError::ConfigRead(path.as_std_path().to_path_buf()))?;
                serde_json::from_str(&content)
                    .map_err(|err| HelioError::ConfigParse(err.to_string()))?
            }
            None => ConfigFile::default(),
        };
        let mut config = Self::resolve(file)?;

        if let Ok(dir) = std::env::var("HELIOFETCH_DOWNLOAD_DIR") {
            if !dir.trim().is_empty() {
                config.download_dir = Utf8PathBuf::from(dir.trim());
            }
        }
        if let Ok(cookie) = std::env::var("CLUSTERCOOKIE") {
            if !cookie.trim().is_empty() {
                config.csa_cookie = Some(cookie.trim().to_string());
            }
        }
        if let Ok(toggle) = std::env::var("HELIOFETCH_USE_FAST_CACHE") {
            config.use_fast_cache = matches!(toggle.trim(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    pub fn resolve(file: ConfigFile) -> Result<Self, HelioError> {
        let download_dir = match file.download_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_download_dir()?,
        };
        Ok(Self {
            download_dir,
            csa_cookie: file.cluster_cookie,
            use_fast_cache: file.use_fast_cache.unwrap_or(true),
        })
    }
}

fn default_download_dir() -> Result<Utf8PathBuf, HelioError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".heliofetch").join("data")).ok()
        })
        .ok_or_else(|| HelioError::Filesystem("unable to resolve download directory".to_string()))
}
