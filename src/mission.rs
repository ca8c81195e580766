use chrono::{Duration, NaiveDate, NaiveTime};
use regex::escape;

use crate::config::Config;
use crate::error::HelioError;
use crate::fetch::{Delivery, RemoteDescriptor};
use crate::keymap::KeyMapping;
use crate::store::CacheLocation;

/// One instrument request: probe (where the mission has several spacecraft),
/// instrument, product id and the column key mapping. Built by the mission
/// modules, immutable afterwards.
#[derive(Debug, Clone)]
pub struct DataRequest {
    pub probe: Option<String>,
    pub instrument: String,
    pub product_id: String,
    pub mapping: KeyMapping,
}

/// Mission descriptor: everything the generic pipeline needs to know about
/// one archive, with no per-mission control flow.
pub trait Mission: Send + Sync {
    fn name(&self) -> &'static str;

    fn requires_cookie(&self) -> bool {
        false
    }

    /// Cache directory components and canonical per-day filename.
    fn cache_location(
        &self,
        request: &DataRequest,
        day: NaiveDate,
    ) -> Result<CacheLocation, HelioError>;

    /// Day-scoped remote location and delivery contract.
    fn remote_descriptor(
        &self,
        config: &Config,
        request: &DataRequest,
        day: NaiveDate,
    ) -> Result<RemoteDescriptor, HelioError>;
}

/// Query-style archive: dataset id plus inclusive day bounds in the query
/// string, cookie-authenticated, tarball delivery.
#[derive(Debug, Clone)]
pub struct CsaMission {
    name: &'static str,
    base_url: String,
}

impl CsaMission {
    pub fn cluster() -> Self {
        Self {
            name: "cluster",
            base_url: "https://csa.esac.esa.int/csa/aio/product-action?".to_string(),
        }
    }

    fn dataset_id(&self, request: &DataRequest) -> Result<String, HelioError> {
        let probe = request
            .probe
            .as_deref()
            .ok_or_else(|| HelioError::MissingProbe(self.name.to_string()))?;
        Ok(format!("C{probe}_{}", request.product_id))
    }
}

const CSA_TIME_FMT: &str = "%Y-%m-%dT%H:%M:%SZ";

impl Mission for CsaMission {
    fn name(&self) -> &'static str {
        self.name
    }

    fn requires_cookie(&self) -> bool {
        true
    }

    fn cache_location(
        &self,
        request: &DataRequest,
        day: NaiveDate,
    ) -> Result<CacheLocation, HelioError> {
        let probe = request
            .probe
            .as_deref()
            .ok_or_else(|| HelioError::MissingProbe(self.name.to_string()))?;
        let dataset_id = self.dataset_id(request)?;
        Ok(CacheLocation {
            components: vec![
                self.name.to_string(),
                format!("c{probe}"),
                request.instrument.clone(),
            ],
            filename: format!("{dataset_id}__{}.cdf", day.format("%Y%m%d")),
        })
    }

    fn remote_descriptor(
        &self,
        config: &Config,
        request: &DataRequest,
        day: NaiveDate,
    ) -> Result<RemoteDescriptor, HelioError> {
        let cookie = config
            .csa_cookie
            .as_deref()
            .ok_or_else(|| HelioError::CookieNotSet(self.name.to_string()))?;
        let dataset_id = self.dataset_id(request)?;

        // The archive wants inclusive day bounds; the boundary overlap this
        // introduces is collapsed by the merger.
        let day_start = day.and_time(NaiveTime::MIN);
        let day_end = day_start + Duration::seconds(86_399);

        let mut url = self.base_url.clone();
        url.push_str(&format!("DATASET_ID={dataset_id}"));
        url.push_str("&DELIVERY_FORMAT=CDF");
        url.push_str("&REF_DOC=0");
        url.push_str(&format!("&CSACOOKIE={cookie}"));
        url.push_str("&INCLUDE_EMPTY=0");
        url.push_str(&format!("&START_DATE={}", day_start.format(CSA_TIME_FMT)));
        url.push_str(&format!("&END_DATE={}", day_end.format(CSA_TIME_FMT)));
        url.push_str("&NON_BROWSER");

        Ok(RemoteDescriptor {
            url,
            delivery: Delivery::GzipTarball {
                top_level_prefix: "CSA_Download_".to_string(),
                payload_dir: dataset_id.clone(),
                payload_pattern: format!("^{}__[0-9]{{8}}", escape(&dataset_id)),
            },
        })
    }
}

/// Directory-style archive: one file per day under a year directory, plain
/// download, no auth. The filename template's `{date}` placeholder expands
/// to `YYYYMMDD`.
#[derive(Debug, Clone)]
pub struct SpdfMission {
    name: &'static str,
    base_url: String,
    relative_dir: String,
    filename_template: String,
}

impl SpdfMission {
    pub fn messenger() -> Self {
        Self {
            name: "messenger",
            base_url: "https://spdf.gsfc.nasa.gov/pub/data/messenger".to_string(),
            relative_dir: "rtn".to_string(),
            filename_template: "messenger_mag_rtn_{date}_v01.cdf".to_string(),
        }
    }

    fn filename(&self, day: NaiveDate) -> String {
        self.filename_template
            .replace("{date}", &day.format("%Y%m%d").to_string())
    }
}

impl Mission for SpdfMission {
    fn name(&self) -> &'static str {
        self.name
    }

    fn cache_location(
        &self,
        _request: &DataRequest,
        day: NaiveDate,
    ) -> Result<CacheLocation, HelioError> {
        Ok(CacheLocation {
            components: vec![self.name.to_string(), self.relative_dir.clone()],
            filename: self.filename(day),
        })
    }

    fn remote_descriptor(
        &self,
        _config: &Config,
        _request: &DataRequest,
        day: NaiveDate,
    ) -> Result<RemoteDescriptor, HelioError> {
        Ok(RemoteDescriptor {
            url: format!(
                "{}/{}/{}/{}",
                self.base_url,
                self.relative_dir,
                day.format("%Y"),
                self.filename(day)
            ),
            delivery: Delivery::File,
        })
    }
}
