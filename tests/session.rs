use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use heliofetch::config::Config;
use heliofetch::decode::{ArchiveReader, ArchiveRecord};
use heliofetch::error::HelioError;
use heliofetch::fetch::{Delivery, RemoteClient, RemoteDescriptor};
use heliofetch::interval::TimeInterval;
use heliofetch::keymap::KeyMapping;
use heliofetch::mission::{DataRequest, Mission};
use heliofetch::session::Session;
use heliofetch::store::CacheLocation;

/// Single-file-delivery mission with a predictable per-day URL, so tests can
/// fail individual days by date.
struct TestMission {
    needs_cookie: bool,
}

impl TestMission {
    fn new() -> Self {
        Self {
            needs_cookie: false,
        }
    }
}

impl Mission for TestMission {
    fn name(&self) -> &'static str {
        "test"
    }

    fn requires_cookie(&self) -> bool {
        self.needs_cookie
    }

    fn cache_location(
        &self,
        request: &DataRequest,
        day: NaiveDate,
    ) -> Result<CacheLocation, HelioError> {
        Ok(CacheLocation {
            components: vec!["test".to_string(), request.instrument.clone()],
            filename: format!("{}_{}.dat", request.product_id, day.format("%Y%m%d")),
        })
    }

    fn remote_descriptor(
        &self,
        _config: &Config,
        request: &DataRequest,
        day: NaiveDate,
    ) -> Result<RemoteDescriptor, HelioError> {
        Ok(RemoteDescriptor {
            url: format!(
                "https://archive.test/{}/{}.dat",
                request.product_id,
                day.format("%Y%m%d")
            ),
            delivery: Delivery::File,
        })
    }
}

#[derive(Default)]
struct MockRemote {
    downloads: Mutex<usize>,
    fail_dates: Vec<&'static str>,
}

impl MockRemote {
    fn failing(dates: Vec<&'static str>) -> Self {
        Self {
            downloads: Mutex::new(0),
            fail_dates: dates,
        }
    }

    fn download_count(&self) -> usize {
        *self.downloads.lock().unwrap()
    }
}

impl RemoteClient for MockRemote {
    fn download(&self, url: &str, destination: &Path) -> Result<(), HelioError> {
        *self.downloads.lock().unwrap() += 1;
        if self.fail_dates.iter().any(|date| url.contains(date)) {
            return Err(HelioError::FetchHttp("simulated outage".to_string()));
        }
        fs::write(destination, url).map_err(|err| HelioError::Filesystem(err.to_string()))
    }
}

/// Produces one hourly record per artifact, dated from the digits in the
/// canonical filename.
struct MockReader;

struct MockRecord {
    day: NaiveDate,
}

impl ArchiveReader for MockReader {
    fn open(&self, path: &Utf8Path) -> Result<Box<dyn ArchiveRecord>, HelioError> {
        let name = path.file_name().unwrap_or_default();
        let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
        let day = NaiveDate::parse_from_str(&digits, "%Y%m%d").map_err(|err| {
            HelioError::ArchiveOpen {
                path: path.to_string(),
                message: err.to_string(),
            }
        })?;
        Ok(Box::new(MockRecord { day }))
    }
}

impl ArchiveRecord for MockRecord {
    fn has_field(&self, name: &str) -> bool {
        matches!(name, "epoch" | "value" | "vec")
    }

    fn timestamps(&self, _name: &str) -> Result<Vec<NaiveDateTime>, HelioError> {
        let midnight = self.day.and_hms_opt(0, 0, 0).unwrap();
        Ok((0..24).map(|h| midnight + Duration::hours(h)).collect())
    }

    fn scalar(&self, _name: &str) -> Result<Vec<f64>, HelioError> {
        Ok((0..24).map(|h| h as f64).collect())
    }

    fn vector(&self, _name: &str) -> Result<Vec<Vec<f64>>, HelioError> {
        Ok((0..24)
            .map(|h| vec![h as f64, 100.0 + h as f64, 200.0 + h as f64])
            .collect())
    }
}

fn scalar_request() -> DataRequest {
    DataRequest {
        probe: None,
        instrument: "inst".to_string(),
        product_id: "prod".to_string(),
        mapping: KeyMapping::builder()
            .scalar("value", "v")
            .timestamp("epoch")
            .build()
            .unwrap(),
    }
}

fn at(d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn session_in(
    dir: &TempDir,
    client: Arc<MockRemote>,
    use_fast_cache: bool,
) -> Session<Arc<MockRemote>, MockReader> {
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let mut config = Config::new(root);
    config.use_fast_cache = use_fast_cache;
    Session::new(config, client, MockReader)
}

#[test]
fn cached_interval_downloads_nothing_on_reload() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(MockRemote::default());
    let session = session_in(&dir, client.clone(), false);
    let interval = TimeInterval::new(at(1, 0), at(3, 0)).unwrap();

    let first = session
        .load(&TestMission::new(), &scalar_request(), interval)
        .unwrap();
    assert_eq!(first.len(), 48);
    assert_eq!(client.download_count(), 2, "one download per day");

    let second = session
        .load(&TestMission::new(), &scalar_request(), interval)
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(client.download_count(), 2, "reload is served from the cache");
}

#[test]
fn merged_rows_are_sorted_and_clipped() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, Arc::new(MockRemote::default()), false);
    let interval = TimeInterval::new(at(1, 6), at(2, 18)).unwrap();

    let frame = session
        .load(&TestMission::new(), &scalar_request(), interval)
        .unwrap();

    let times: Vec<_> = frame.rows().iter().map(|row| row.time).collect();
    assert!(times.iter().all(|t| interval.contains(*t)));
    assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(frame.len(), 18 + 18);
}

#[test]
fn failed_day_is_skipped_when_another_succeeds() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, Arc::new(MockRemote::failing(vec!["20240102"])), false);
    let interval = TimeInterval::new(at(1, 0), at(3, 0)).unwrap();

    let frame = session
        .load(&TestMission::new(), &scalar_request(), interval)
        .unwrap();

    assert_eq!(frame.len(), 24, "only the first day's rows survive");
    let day2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    assert!(frame.rows().iter().all(|row| row.time.date() != day2));
    assert!(frame.rows().iter().all(|row| interval.contains(row.time)));
}

#[test]
fn all_days_failing_is_no_data() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, Arc::new(MockRemote::failing(vec!["202401"])), false);
    let interval = TimeInterval::new(at(1, 0), at(3, 0)).unwrap();

    let err = session
        .load(&TestMission::new(), &scalar_request(), interval)
        .unwrap_err();
    assert_matches!(err, HelioError::NoData);
}

#[test]
fn vector_mapping_expands_components_row_wise() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, Arc::new(MockRemote::default()), false);
    let interval = TimeInterval::new(at(1, 0), at(2, 0)).unwrap();

    let request = DataRequest {
        probe: None,
        instrument: "inst".to_string(),
        product_id: "vecs".to_string(),
        mapping: KeyMapping::builder()
            .vector("vec", &["x", "y", "z"])
            .timestamp("epoch")
            .build()
            .unwrap(),
    };
    let frame = session.load(&TestMission::new(), &request, interval).unwrap();

    assert_eq!(frame.columns(), ["x", "y", "z"]);
    assert_eq!(frame.rows()[5].values, vec![5.0, 105.0, 205.0]);
}

#[test]
fn missing_cookie_fails_before_any_download() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, Arc::new(MockRemote::default()), false);
    let interval = TimeInterval::new(at(1, 0), at(3, 0)).unwrap();
    let mission = TestMission { needs_cookie: true };

    let err = session.load(&mission, &scalar_request(), interval).unwrap_err();
    assert_matches!(err, HelioError::CookieNotSet(_));

    // Nothing was written to the cache tree.
    assert!(!dir.path().join("test").exists());
}

#[test]
fn fast_cache_is_written_and_survives_artifact_loss() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, Arc::new(MockRemote::default()), true);
    let interval = TimeInterval::new(at(1, 0), at(2, 0)).unwrap();

    let first = session
        .load(&TestMission::new(), &scalar_request(), interval)
        .unwrap();

    let artifact = dir.path().join("test/inst/2024/prod_20240101.dat");
    let fast = dir.path().join("test/inst/2024/prod_20240101.json");
    assert!(artifact.exists());
    assert!(fast.exists());

    // Raw artifact disappears; the fast-format cache alone still serves the
    // request with no new download.
    fs::remove_file(&artifact).unwrap();
    let reload = session_in(&dir, Arc::new(MockRemote::failing(vec!["202401"])), true);
    let second = reload
        .load(&TestMission::new(), &scalar_request(), interval)
        .unwrap();
    assert_eq!(second, first);
}

#[test]
fn prefetch_reports_per_day_outcomes() {
    let dir = TempDir::new().unwrap();
    let session = session_in(&dir, Arc::new(MockRemote::failing(vec!["20240102"])), false);
    let interval = TimeInterval::new(at(1, 0), at(3, 0)).unwrap();

    let reports = session
        .prefetch(&TestMission::new(), &scalar_request(), interval)
        .unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].action, "fetched");
    assert_eq!(reports[1].action, "failed");
    assert!(reports[1].error.is_some());

    let again = session
        .prefetch(&TestMission::new(), &scalar_request(), interval)
        .unwrap();
    assert_eq!(again[0].action, "cached");
}
