//! Magnetometer data from the Messenger spacecraft, published per day on the
//! SPDF archive. No authentication required.

use crate::decode::ArchiveReader;
use crate::error::HelioError;
use crate::fetch::RemoteClient;
use crate::frame::Frame;
use crate::interval::TimeInterval;
use crate::keymap::KeyMapping;
use crate::mission::{DataRequest, SpdfMission};
use crate::session::Session;

/// Magnetic field in RTN coordinates, plus the spacecraft ecliptic position.
pub fn mag_rtn_request() -> Result<DataRequest, HelioError> {
    let mapping = KeyMapping::builder()
        .scalar("B_radial", "Br")
        .scalar("B_tangential", "Bt")
        .scalar("B_normal", "Bn")
        .scalar("azimuth_ecliptic", "sc_Az")
        .scalar("latitude_ecliptic", "sc_Lat")
        .scalar("radialDistance", "sc_r")
        .timestamp("Epoch")
        .build()?;
    Ok(DataRequest {
        probe: None,
        instrument: "rtn".to_string(),
        product_id: "mag_rtn".to_string(),
        mapping,
    })
}

pub fn mag_rtn<C: RemoteClient, R: ArchiveReader>(
    session: &Session<C, R>,
    interval: TimeInterval,
) -> Result<Frame, HelioError> {
    session.load(&SpdfMission::messenger(), &mag_rtn_request()?, interval)
}
