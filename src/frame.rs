use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::HelioError;
use crate::interval::TimeInterval;

/// Timestamp-indexed tabular frame with named f64 columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub time: NaiveDateTime,
    pub values: Vec<f64>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, time: NaiveDateTime, values: Vec<f64>) -> Result<(), HelioError> {
        if values.len() != self.columns.len() {
            return Err(HelioError::RowWidth {
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        self.rows.push(Row { time, values });
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row.values[index]).collect())
    }

    /// Replaces every occurrence of a sentinel fill value in one column with
    /// NaN. Some archives encode missing samples as a documented constant.
    pub fn replace_fill(&mut self, column: &str, fill: f64) -> Result<(), HelioError> {
        let index = self
            .column_index(column)
            .ok_or_else(|| HelioError::MissingField(column.to_string()))?;
        for row in &mut self.rows {
            if row.values[index] == fill {
                row.values[index] = f64::NAN;
            }
        }
        Ok(())
    }
}

/// Concatenates per-day frames into one time-ordered result.
///
/// Rows are sorted by timestamp (stable, so later frames win on ties),
/// duplicate timestamps collapse to the last occurrence, and the result is
/// clipped to the half-open interval. An empty frame list is the signal that
/// every requested day failed.
pub fn merge(frames: Vec<Frame>, interval: &TimeInterval) -> Result<Frame, HelioError> {
    let mut frames = frames.into_iter();
    let first = frames.next().ok_or(HelioError::NoData)?;
    let columns = first.columns.clone();

    let mut rows = first.rows;
    for frame in frames {
        if frame.columns != columns {
            return Err(HelioError::ColumnMismatch);
        }
        rows.extend(frame.rows);
    }

    rows.sort_by(|a, b| a.time.cmp(&b.time));

    let mut merged: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        if !interval.contains(row.time) {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.time == row.time => *last = row,
            _ => merged.push(row),
        }
    }

    Ok(Frame {
        columns,
        rows: merged,
    })
}
