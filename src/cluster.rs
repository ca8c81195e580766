//! Instrument data from the four Cluster spacecraft, served by the cluster
//! science archive. Downloads require a registered archive cookie, supplied
//! via configuration or the `CLUSTERCOOKIE` environment variable.

use std::fmt;
use std::str::FromStr;

use crate::decode::ArchiveReader;
use crate::error::HelioError;
use crate::fetch::RemoteClient;
use crate::frame::Frame;
use crate::interval::TimeInterval;
use crate::keymap::KeyMapping;
use crate::mission::{CsaMission, DataRequest};
use crate::session::Session;

/// Cluster probe number, one of '1' through '4'.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Probe(String);

impl Probe {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Probe {
    type Err = HelioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !matches!(trimmed, "1" | "2" | "3" | "4") {
            return Err(HelioError::InvalidProbe(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

// Archive field names carry the dataset id as a suffix.
fn field(name: &str, probe: &Probe, product_id: &str) -> String {
    format!("{name}__C{probe}_{product_id}")
}

fn request(
    probe: &Probe,
    instrument: &str,
    product_id: &str,
    mapping: KeyMapping,
) -> DataRequest {
    DataRequest {
        probe: Some(probe.as_str().to_string()),
        instrument: instrument.to_string(),
        product_id: product_id.to_string(),
        mapping,
    }
}

/// Fluxgate magnetometer request: field magnitude and GSE vector.
pub fn fgm_request(probe: &Probe) -> Result<DataRequest, HelioError> {
    let product = "CP_FGM_FULL";
    let mapping = KeyMapping::builder()
        .scalar(&field("B_mag", probe, product), "Bmag")
        .vector(&field("B_vec_xyz_gse", probe, product), &["Bx", "By", "Bz"])
        .timestamp(&field("time_tags", probe, product))
        .build()?;
    Ok(request(probe, "fgm", product, mapping))
}

pub fn fgm<C: RemoteClient, R: ArchiveReader>(
    session: &Session<C, R>,
    probe: &Probe,
    interval: TimeInterval,
) -> Result<Frame, HelioError> {
    session.load(&CsaMission::cluster(), &fgm_request(probe)?, interval)
}

/// Electron moments from the PEACE instrument.
pub fn peace_moments_request(probe: &Probe) -> Result<DataRequest, HelioError> {
    let product = "CP_PEA_MOMENTS";
    let mapping = KeyMapping::builder()
        .scalar(&field("Data_Density", probe, product), "n_e")
        .vector(
            &field("Data_HeatFlux_GSE", probe, product),
            &["qe_x", "qe_y", "qe_z"],
        )
        .scalar(
            &field("Data_Temperature_ComponentParallelToMagField", probe, product),
            "Te_par",
        )
        .scalar(
            &field(
                "Data_Temperature_ComponentPerpendicularToMagField",
                probe,
                product,
            ),
            "Te_perp",
        )
        .vector(
            &field("Data_Velocity_GSE", probe, product),
            &["ve_x", "ve_y", "ve_z"],
        )
        .timestamp(&field("time_tags", probe, product))
        .build()?;
    Ok(request(probe, "peace", product, mapping))
}

pub fn peace_moments<C: RemoteClient, R: ArchiveReader>(
    session: &Session<C, R>,
    probe: &Probe,
    interval: TimeInterval,
) -> Result<Frame, HelioError> {
    session.load(&CsaMission::cluster(), &peace_moments_request(probe)?, interval)
}

// The CIS archive encodes missing vi_x samples as this constant.
const CIS_VIX_FILL: f64 = -1.803_100_937_5e5;

/// Onboard ion moments from the CIS HIA sensor.
pub fn cis_hia_onboard_moms_request(probe: &Probe) -> Result<DataRequest, HelioError> {
    let product = "CP_CIS-HIA_ONBOARD_MOMENTS";
    let mapping = KeyMapping::builder()
        .scalar(&field("density", probe, product), "n_i")
        .scalar(&field("pressure", probe, product), "p_i")
        .scalar(&field("temperature", probe, product), "Ti")
        .scalar(&field("temp_par", probe, product), "Ti_par")
        .scalar(&field("temp_perp", probe, product), "Ti_perp")
        .vector(
            &field("velocity_gse", probe, product),
            &["vi_x", "vi_y", "vi_z"],
        )
        .timestamp(&field("time_tags", probe, product))
        .build()?;
    Ok(request(probe, "cis", product, mapping))
}

pub fn cis_hia_onboard_moms<C: RemoteClient, R: ArchiveReader>(
    session: &Session<C, R>,
    probe: &Probe,
    interval: TimeInterval,
) -> Result<Frame, HelioError> {
    let mut frame = session.load(
        &CsaMission::cluster(),
        &cis_hia_onboard_moms_request(probe)?,
        interval,
    )?;
    frame.replace_fill("vi_x", CIS_VIX_FILL)?;
    Ok(frame)
}
