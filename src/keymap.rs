use crate::error::HelioError;

/// Where a raw archive field lands in the decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTarget {
    Scalar(String),
    Vector(Vec<String>),
    Timestamp,
}

/// Ordered mapping from archive field names to output columns.
///
/// Exactly one entry is the timestamp sentinel; it becomes the row index
/// rather than a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapping {
    entries: Vec<(String, ColumnTarget)>,
    timestamp_field: String,
}

impl KeyMapping {
    pub fn builder() -> KeyMappingBuilder {
        KeyMappingBuilder {
            entries: Vec::new(),
        }
    }

    pub fn timestamp_field(&self) -> &str {
        &self.timestamp_field
    }

    /// Entries other than the timestamp sentinel, in insertion order.
    pub fn data_entries(&self) -> impl Iterator<Item = (&str, &ColumnTarget)> {
        self.entries
            .iter()
            .filter(|(_, target)| *target != ColumnTarget::Timestamp)
            .map(|(field, target)| (field.as_str(), target))
    }

    /// Output column names in insertion order, vector entries expanded.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (_, target) in self.data_entries() {
            match target {
                ColumnTarget::Scalar(name) => names.push(name.clone()),
                ColumnTarget::Vector(components) => names.extend(components.iter().cloned()),
                ColumnTarget::Timestamp => {}
            }
        }
        names
    }
}

#[derive(Debug, Clone)]
pub struct KeyMappingBuilder {
    entries: Vec<(String, ColumnTarget)>,
}

impl KeyMappingBuilder {
    pub fn scalar(mut self, field: &str, column: &str) -> Self {
        self.entries
            .push((field.to_string(), ColumnTarget::Scalar(column.to_string())));
        self
    }

    pub fn vector(mut self, field: &str, components: &[&str]) -> Self {
        let components = components.iter().map(|name| name.to_string()).collect();
        self.entries
            .push((field.to_string(), ColumnTarget::Vector(components)));
        self
    }

    pub fn timestamp(mut self, field: &str) -> Self {
        self.entries
            .push((field.to_string(), ColumnTarget::Timestamp));
        self
    }

    pub fn build(self) -> Result<KeyMapping, HelioError> {
        let mut timestamp_field = None;
        for (field, target) in &self.entries {
            if *target == ColumnTarget::Timestamp {
                if timestamp_field.is_some() {
                    return Err(HelioError::MappingDuplicateTimestamp);
                }
                timestamp_field = Some(field.clone());
            }
        }
        let timestamp_field = timestamp_field.ok_or(HelioError::MappingNoTimestamp)?;
        Ok(KeyMapping {
            entries: self.entries,
            timestamp_field,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn build_requires_timestamp() {
        let err = KeyMapping::builder()
            .scalar("B_mag", "Bmag")
            .build()
            .unwrap_err();
        assert_matches!(err, HelioError::MappingNoTimestamp);
    }

    #[test]
    fn build_rejects_second_timestamp() {
        let err = KeyMapping::builder()
            .timestamp("time_tags")
            .timestamp("Epoch")
            .build()
            .unwrap_err();
        assert_matches!(err, HelioError::MappingDuplicateTimestamp);
    }

    #[test]
    fn column_names_expand_vectors_in_order() {
        let mapping = KeyMapping::builder()
            .scalar("B_mag", "Bmag")
            .vector("B_vec_xyz_gse", &["Bx", "By", "Bz"])
            .timestamp("time_tags")
            .build()
            .unwrap();
        assert_eq!(mapping.timestamp_field(), "time_tags");
        assert_eq!(mapping.column_names(), vec!["Bmag", "Bx", "By", "Bz"]);
    }
}
