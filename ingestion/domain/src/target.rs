use crate::{Granularity, Segment};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_TABLE_NAME_LEN: usize = 63;

/// Validated SQL identifier for a candle table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, TableNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TableNameError::Empty);
        }
        if name.len() > MAX_TABLE_NAME_LEN {
            return Err(TableNameError::TooLong(name));
        }

        let mut chars = name.chars();
        let first_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !first_ok || !rest_ok {
            return Err(TableNameError::InvalidCharacters(name));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TableName {
    type Error = TableNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableNameError {
    #[error("Table name cannot be empty")]
    Empty,
    #[error("Table name too long: {0}")]
    TooLong(String),
    #[error("Table name must be a lowercase identifier: {0}")]
    InvalidCharacters(String),
}

/// Where candles of one segment at one granularity are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionTarget {
    segment: Segment,
    table: TableName,
    granularity: Granularity,
}

impl IngestionTarget {
    pub fn new(segment: Segment, table: TableName, granularity: Granularity) -> Self {
        Self {
            segment,
            table,
            granularity,
        }
    }

    /// The production table layout: `classic_stocks`, `weekend_stocks` and
    /// their `_hourly` counterparts.
    pub fn standard(segment: Segment, granularity: Granularity) -> Self {
        let prefix = match segment {
            Segment::Regular => "classic_stocks",
            Segment::Weekend => "weekend_stocks",
        };
        let name = match granularity {
            Granularity::TenMinutes => prefix.to_string(),
            Granularity::Hour => format!("{}_hourly", prefix),
        };
        Self::new(segment, TableName(name), granularity)
    }

    pub fn standard_set(granularity: Granularity) -> Vec<Self> {
        vec![
            Self::standard(Segment::Regular, granularity),
            Self::standard(Segment::Weekend, granularity),
        ]
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_table_names() {
        assert!(TableName::new("classic_stocks").is_ok());
        assert!(TableName::new("_scratch2").is_ok());
    }

    #[test]
    fn test_rejects_injection() {
        assert!(matches!(
            TableName::new("classic_stocks; DROP TABLE x"),
            Err(TableNameError::InvalidCharacters(_))
        ));
        assert!(matches!(
            TableName::new("1table"),
            Err(TableNameError::InvalidCharacters(_))
        ));
        assert_eq!(TableName::new(""), Err(TableNameError::Empty));
    }

    #[test]
    fn test_standard_targets() {
        let hourly = IngestionTarget::standard_set(Granularity::Hour);
        let tables: Vec<&str> = hourly.iter().map(|t| t.table().as_str()).collect();
        assert_eq!(tables, vec!["classic_stocks_hourly", "weekend_stocks_hourly"]);

        let regular = IngestionTarget::standard(Segment::Regular, Granularity::TenMinutes);
        assert_eq!(regular.table().as_str(), "classic_stocks");
        assert_eq!(regular.segment(), Segment::Regular);
    }

    #[test]
    fn test_standard_names_pass_validation() {
        for granularity in [Granularity::TenMinutes, Granularity::Hour] {
            for target in IngestionTarget::standard_set(granularity) {
                assert!(TableName::new(target.table().as_str()).is_ok());
            }
        }
    }
}
