use std::path::PathBuf;

use chrono::NaiveDateTime;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HelioError {
    #[error("invalid time interval: start {start} is after end {end}")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("invalid probe: {0} (must be '1', '2', '3' or '4')")]
    InvalidProbe(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("mission {mission} has no instrument {instrument}")]
    UnknownInstrument { mission: String, instrument: String },

    #[error("key mapping has no timestamp entry")]
    MappingNoTimestamp,

    #[error("key mapping has more than one timestamp entry")]
    MappingDuplicateTimestamp,

    #[error("mission {0} requires a probe")]
    MissingProbe(String),

    #[error("{0} download cookie not set")]
    CookieNotSet(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    #[error("download failed: {0}")]
    FetchHttp(String),

    #[error("remote returned status {status} for {url}")]
    FetchStatus { status: u16, url: String },

    #[error("unexpected archive layout: {0}")]
    ArchiveLayout(String),

    #[error("cannot open archive {path}: {message}")]
    ArchiveOpen { path: String, message: String },

    #[error("field {0} not present in archive")]
    MissingField(String),

    #[error("field {0} length does not match the timestamp field")]
    FieldLength(String),

    #[error("row width {got} does not match {expected} columns")]
    RowWidth { expected: usize, got: usize },

    #[error("frames with mismatched columns cannot be merged")]
    ColumnMismatch,

    #[error("no data available during requested times")]
    NoData,

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
