use camino::Utf8Path;
use chrono::NaiveDateTime;

use crate::error::HelioError;
use crate::frame::Frame;
use crate::keymap::{ColumnTarget, KeyMapping};

/// Opens raw archive files. The binary layout of the archive format is not
/// this crate's business; implementations wrap whatever reader the deployment
/// has available.
pub trait ArchiveReader: Send + Sync {
    fn open(&self, path: &Utf8Path) -> Result<Box<dyn ArchiveRecord>, HelioError>;
}

/// One opened archive: a set of named fields for a single day.
pub trait ArchiveRecord {
    fn has_field(&self, name: &str) -> bool;
    fn timestamps(&self, name: &str) -> Result<Vec<NaiveDateTime>, HelioError>;
    fn scalar(&self, name: &str) -> Result<Vec<f64>, HelioError>;
    fn vector(&self, name: &str) -> Result<Vec<Vec<f64>>, HelioError>;
}

/// Reader for sessions that only warm the cache and never decode.
pub struct NullReader;

impl ArchiveReader for NullReader {
    fn open(&self, path: &Utf8Path) -> Result<Box<dyn ArchiveRecord>, HelioError> {
        Err(HelioError::ArchiveOpen {
            path: path.to_string(),
            message: "no archive reader configured".to_string(),
        })
    }
}

/// Decodes one archive into a frame following the key mapping.
///
/// The sentinel entry names the timestamp field used as the row index; every
/// other entry copies one archive field into one or more named columns, with
/// vector fields expanding component-wise in the given order. Row order is
/// the archive's native order.
pub fn decode(record: &dyn ArchiveRecord, mapping: &KeyMapping) -> Result<Frame, HelioError> {
    let timestamp_field = mapping.timestamp_field();
    if !record.has_field(timestamp_field) {
        return Err(HelioError::MissingField(timestamp_field.to_string()));
    }
    let times = record.timestamps(timestamp_field)?;

    let mut column_data: Vec<Vec<f64>> = Vec::new();
    for (field, target) in mapping.data_entries() {
        if !record.has_field(field) {
            return Err(HelioError::MissingField(field.to_string()));
        }
        match target {
            ColumnTarget::Scalar(_) => {
                let values = record.scalar(field)?;
                if values.len() != times.len() {
                    return Err(HelioError::FieldLength(field.to_string()));
                }
                column_data.push(values);
            }
            ColumnTarget::Vector(components) => {
                let rows = record.vector(field)?;
                if rows.len() != times.len() {
                    return Err(HelioError::FieldLength(field.to_string()));
                }
                let mut expanded = vec![Vec::with_capacity(rows.len()); components.len()];
                for row in &rows {
                    if row.len() != components.len() {
                        return Err(HelioError::FieldLength(field.to_string()));
                    }
                    for (component, value) in expanded.iter_mut().zip(row) {
                        component.push(*value);
                    }
                }
                column_data.append(&mut expanded);
            }
            ColumnTarget::Timestamp => {}
        }
    }

    let mut frame = Frame::new(mapping.column_names());
    for (index, time) in times.iter().enumerate() {
        let values = column_data.iter().map(|column| column[index]).collect();
        frame.push_row(*time, values)?;
    }
    Ok(frame)
}
