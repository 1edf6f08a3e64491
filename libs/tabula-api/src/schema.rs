use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared column type, as written in a [`ColumnSelector`].
///
/// The three timestamp flavours differ only in how source values are read:
/// - `Timestamp`: text timestamp (or a `time_format` pattern)
/// - `TimestampEpoch`: epoch milliseconds
/// - `TimestampEpochS`: epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Timestamp,
    TimestampEpoch,
    TimestampEpochS,
}

impl FieldType {
    /// Frame column type produced by this declared type.
    pub fn column_type(self) -> ColumnType {
        match self {
            FieldType::String => ColumnType::String,
            FieldType::Number => ColumnType::Number,
            FieldType::Boolean => ColumnType::Boolean,
            FieldType::Timestamp | FieldType::TimestampEpoch | FieldType::TimestampEpochS => {
                ColumnType::Time
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
            FieldType::TimestampEpoch => "timestamp_epoch",
            FieldType::TimestampEpochS => "timestamp_epoch_s",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(FieldType::String),
            "number" => Ok(FieldType::Number),
            "boolean" => Ok(FieldType::Boolean),
            "timestamp" => Ok(FieldType::Timestamp),
            "timestamp_epoch" => Ok(FieldType::TimestampEpoch),
            "timestamp_epoch_s" => Ok(FieldType::TimestampEpochS),
            other => Err(format!("unknown column type {other:?}")),
        }
    }
}

/// Type of a frame column. Every non-null value of the column belongs to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    String,
    Boolean,
    Time,
}

impl ColumnType {
    /// Declared type used when coercing values into a column of this type.
    pub fn field_type(self) -> FieldType {
        match self {
            ColumnType::Number => FieldType::Number,
            ColumnType::String => FieldType::String,
            ColumnType::Boolean => FieldType::Boolean,
            ColumnType::Time => FieldType::Timestamp,
        }
    }
}

/// Per-column extraction configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSelector {
    /// Source key or dotted path.
    pub selector: String,
    /// Output column name. Empty means "use `selector`".
    #[serde(default)]
    pub alias: String,
    /// Explicit type; `None` means "infer from the data".
    #[serde(default, rename = "type")]
    pub field_type: Option<FieldType>,
    /// Parse pattern for timestamp columns (strftime or reference layout).
    #[serde(default)]
    pub time_format: String,
}

impl ColumnSelector {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = time_format.into();
        self
    }

    /// Display name: alias if set, otherwise selector.
    pub fn display_name(&self) -> &str {
        if self.alias.is_empty() {
            &self.selector
        } else {
            &self.alias
        }
    }
}
