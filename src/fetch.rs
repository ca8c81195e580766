use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use flate2::read::GzDecoder;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tar::Archive;
use tempfile::Builder;
use tracing::debug;

use crate::error::HelioError;
use crate::store::Store;

/// How a remote archive arrives for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The downloaded file is the artifact itself.
    File,
    /// A gzip tarball with a contracted internal layout: one top-level
    /// directory whose name starts with `top_level_prefix`, containing a
    /// `payload_dir` directory, containing exactly one payload file whose
    /// name matches `payload_pattern`.
    GzipTarball {
        top_level_prefix: String,
        payload_dir: String,
        payload_pattern: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    pub url: String,
    pub delivery: Delivery,
}

pub trait RemoteClient: Send + Sync {
    fn download(&self, url: &str, destination: &Path) -> Result<(), HelioError>;
}

impl<T: RemoteClient + ?Sized> RemoteClient for std::sync::Arc<T> {
    fn download(&self, url: &str, destination: &Path) -> Result<(), HelioError> {
        (**self).download(url, destination)
    }
}

#[derive(Clone)]
pub struct HttpRemoteClient {
    client: Client,
}

impl HttpRemoteClient {
    pub fn new() -> Result<Self, HelioError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("heliofetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HelioError::FetchHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| HelioError::FetchHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn send_with_retries(&self, url: &str) -> Result<reqwest::blocking::Response, HelioError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(HelioError::FetchHttp(err.to_string()));
                }
            }
        }
    }
}

impl RemoteClient for HttpRemoteClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), HelioError> {
        let mut response = self.send_with_retries(url)?;
        if !response.status().is_success() {
            return Err(HelioError::FetchStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let mut file =
            File::create(destination).map_err(|err| HelioError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| HelioError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Downloads one day's archive and lands it at the canonical cache path.
///
/// The download and any extraction happen inside a temp directory next to the
/// destination, so only a complete artifact ever appears under the canonical
/// name; repeated fetches overwrite rather than accumulate.
pub fn fetch_artifact(
    client: &dyn RemoteClient,
    descriptor: &RemoteDescriptor,
    artifact: &Utf8Path,
) -> Result<(), HelioError> {
    Store::ensure_parent(artifact)?;
    let parent = artifact
        .parent()
        .ok_or_else(|| HelioError::Filesystem("artifact path has no parent".to_string()))?;
    let work_dir = Builder::new()
        .prefix("heliofetch-dl")
        .tempdir_in(parent.as_std_path())
        .map_err(|err| HelioError::Filesystem(err.to_string()))?;

    debug!(url = %descriptor.url, artifact = %artifact, "downloading");
    match &descriptor.delivery {
        Delivery::File => {
            let download_path = work_dir.path().join("download");
            client.download(&descriptor.url, &download_path)?;
            replace_file(&download_path, artifact.as_std_path())
        }
        Delivery::GzipTarball {
            top_level_prefix,
            payload_dir,
            payload_pattern,
        } => {
            let bundle_path = work_dir.path().join("bundle.tar.gz");
            client.download(&descriptor.url, &bundle_path)?;

            let extract_dir = work_dir.path().join("extracted");
            fs::create_dir_all(&extract_dir)
                .map_err(|err| HelioError::Filesystem(err.to_string()))?;
            let bundle =
                File::open(&bundle_path).map_err(|err| HelioError::Filesystem(err.to_string()))?;
            Archive::new(GzDecoder::new(bundle))
                .unpack(&extract_dir)
                .map_err(|err| HelioError::ArchiveLayout(format!("cannot unpack bundle: {err}")))?;

            let payload =
                locate_payload(&extract_dir, top_level_prefix, payload_dir, payload_pattern)?;
            replace_file(&payload, artifact.as_std_path())
        }
    }
}

fn locate_payload(
    extract_dir: &Path,
    top_level_prefix: &str,
    payload_dir: &str,
    payload_pattern: &str,
) -> Result<PathBuf, HelioError> {
    let top_level = single_entry(extract_dir)?;
    let top_name = entry_name(&top_level)?;
    if !top_level.is_dir() || !top_name.starts_with(top_level_prefix) {
        return Err(HelioError::ArchiveLayout(format!(
            "expected one {top_level_prefix}* directory, found {top_name}"
        )));
    }

    let dataset_dir = top_level.join(payload_dir);
    if !dataset_dir.is_dir() {
        return Err(HelioError::ArchiveLayout(format!(
            "missing {payload_dir} directory under {top_name}"
        )));
    }

    let pattern = Regex::new(payload_pattern)
        .map_err(|err| HelioError::ArchiveLayout(format!("bad payload pattern: {err}")))?;
    let mut matches = Vec::new();
    let entries =
        fs::read_dir(&dataset_dir).map_err(|err| HelioError::Filesystem(err.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|err| HelioError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if path.is_file() && pattern.is_match(&entry_name(&path)?) {
            matches.push(path);
        }
    }
    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(HelioError::ArchiveLayout(format!(
            "no payload matching {payload_pattern} under {payload_dir}"
        ))),
        n => Err(HelioError::ArchiveLayout(format!(
            "{n} payload files matching {payload_pattern} under {payload_dir}, expected one"
        ))),
    }
}

fn single_entry(dir: &Path) -> Result<PathBuf, HelioError> {
    let mut entries = Vec::new();
    let dir_entries = fs::read_dir(dir).map_err(|err| HelioError::Filesystem(err.to_string()))?;
    for entry in dir_entries {
        let entry = entry.map_err(|err| HelioError::Filesystem(err.to_string()))?;
        entries.push(entry.path());
    }
    match entries.len() {
        1 => Ok(entries.remove(0)),
        n => Err(HelioError::ArchiveLayout(format!(
            "expected exactly one extracted entry, found {n}"
        ))),
    }
}

fn entry_name(path: &Path) -> Result<String, HelioError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| HelioError::Filesystem(format!("unreadable file name in {}", path.display())))
}

fn replace_file(source: &Path, destination: &Path) -> Result<(), HelioError> {
    if destination.exists() {
        fs::remove_file(destination).map_err(|err| HelioError::Filesystem(err.to_string()))?;
    }
    fs::rename(source, destination).map_err(|err| HelioError::Filesystem(err.to_string()))
}
