use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::decode::{ArchiveReader, decode};
use crate::error::HelioError;
use crate::fetch::{RemoteClient, fetch_artifact};
use crate::frame::{Frame, merge};
use crate::interval::TimeInterval;
use crate::mission::{DataRequest, Mission};
use crate::store::Store;

/// The per-request pipeline: partitions the interval into days, serves each
/// day from the cache or a fetch+decode, skips failed days, and merges the
/// survivors clipped to the requested interval.
pub struct Session<C: RemoteClient, R: ArchiveReader> {
    config: Config,
    store: Store,
    client: C,
    reader: R,
    locks: KeyLocks,
}

impl<C: RemoteClient, R: ArchiveReader> Session<C, R> {
    pub fn new(config: Config, client: C, reader: R) -> Self {
        let store = Store::new(config.download_dir.clone());
        Self {
            config,
            store,
            client,
            reader,
            locks: KeyLocks::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Loads the merged result for one request over one interval.
    ///
    /// A day whose fetch or decode fails is logged and dropped; the request
    /// only fails outright when the cookie precondition is unmet or every
    /// day failed.
    pub fn load(
        &self,
        mission: &dyn Mission,
        request: &DataRequest,
        interval: TimeInterval,
    ) -> Result<Frame, HelioError> {
        self.check_cookie(mission)?;

        let mut frames = Vec::new();
        for day in interval.days() {
            match self.load_day(mission, request, day) {
                Ok(frame) => frames.push(frame),
                Err(err) => {
                    warn!(
                        mission = mission.name(),
                        product = %request.product_id,
                        %day,
                        error = %err,
                        "skipping day"
                    );
                }
            }
        }
        merge(frames, &interval)
    }

    /// Downloads any missing artifacts for the interval without decoding.
    pub fn prefetch(
        &self,
        mission: &dyn Mission,
        request: &DataRequest,
        interval: TimeInterval,
    ) -> Result<Vec<DayReport>, HelioError> {
        self.check_cookie(mission)?;

        let mut reports = Vec::new();
        for day in interval.days() {
            let outcome = self.prefetch_day(mission, request, day);
            reports.push(match outcome {
                Ok(action) => DayReport {
                    day,
                    action: action.to_string(),
                    error: None,
                },
                Err(err) => {
                    warn!(mission = mission.name(), %day, error = %err, "fetch failed");
                    DayReport {
                        day,
                        action: "failed".to_string(),
                        error: Some(err.to_string()),
                    }
                }
            });
        }
        Ok(reports)
    }

    fn check_cookie(&self, mission: &dyn Mission) -> Result<(), HelioError> {
        if mission.requires_cookie() && self.config.csa_cookie.is_none() {
            return Err(HelioError::CookieNotSet(mission.name().to_string()));
        }
        Ok(())
    }

    fn load_day(
        &self,
        mission: &dyn Mission,
        request: &DataRequest,
        day: NaiveDate,
    ) -> Result<Frame, HelioError> {
        let location = mission.cache_location(request, day)?;
        let artifact = self.store.artifact_path(&location, day);
        let lock = self.locks.acquire(artifact.as_str());
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.config.use_fast_cache {
            let fast = Store::fast_cache_path(&artifact);
            if Store::exists(&fast) {
                match Store::load_fast_cache(&fast) {
                    Ok(frame) => return Ok(frame),
                    Err(err) => {
                        warn!(path = %fast, error = %err, "unreadable fast cache, re-decoding")
                    }
                }
            }
        }

        if !Store::exists(&artifact) {
            let descriptor = mission.remote_descriptor(&self.config, request, day)?;
            fetch_artifact(&self.client, &descriptor, &artifact)?;
        } else {
            debug!(artifact = %artifact, "cache hit");
        }

        let record = self.reader.open(&artifact)?;
        let frame = decode(record.as_ref(), &request.mapping)?;

        if self.config.use_fast_cache {
            let fast = Store::fast_cache_path(&artifact);
            if let Err(err) = Store::write_fast_cache(&fast, &frame) {
                warn!(path = %fast, error = %err, "could not write fast cache");
            }
        }
        Ok(frame)
    }

    fn prefetch_day(
        &self,
        mission: &dyn Mission,
        request: &DataRequest,
        day: NaiveDate,
    ) -> Result<&'static str, HelioError> {
        let location = mission.cache_location(request, day)?;
        let artifact = self.store.artifact_path(&location, day);
        let lock = self.locks.acquire(artifact.as_str());
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if Store::exists(&artifact) {
            return Ok("cached");
        }
        let descriptor = mission.remote_descriptor(&self.config, request, day)?;
        fetch_artifact(&self.client, &descriptor, &artifact)?;
        Ok("fetched")
    }
}

/// Per-day outcome of a prefetch, for the CLI report.
#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub day: NaiveDate,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serializes writers of the same artifact path. Distinct days never contend;
/// two overlapping requests for the same day must not race on a
/// partially-written file.
#[derive(Default)]
struct KeyLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    fn acquire(&self, key: &str) -> Arc<Mutex<()>> {
        let mut map = lock_unpoisoned(&self.inner);
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
