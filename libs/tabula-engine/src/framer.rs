use tabula_api::error::ShapeError;
use tabula_api::frame::{Column, Frame};
use tabula_api::record::Record;
use tabula_api::schema::ColumnSelector;
use tabula_api::value::Value;

use crate::coerce::{coerce, infer_type};

#[derive(Debug, Clone, Default)]
pub struct FramerOptions {
    pub frame_name: String,
    /// Explicit schema. Empty means "every key seen, in first-seen order".
    pub columns: Vec<ColumnSelector>,
    /// Per-column adjustments applied on top of the resolved schema, matched
    /// by source key or output name.
    pub override_columns: Vec<ColumnSelector>,
}

impl FramerOptions {
    pub fn new(frame_name: impl Into<String>) -> Self {
        Self {
            frame_name: frame_name.into(),
            columns: Vec::new(),
            override_columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnSelector>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_override_columns(mut self, overrides: Vec<ColumnSelector>) -> Self {
        self.override_columns = overrides;
        self
    }
}

/// Build a typed frame from flat records.
///
/// Cells that fail to coerce become `Null`; only a duplicate output column
/// name is an error.
pub fn build_frame(records: &[Record], options: &FramerOptions) -> Result<Frame, ShapeError> {
    let schema = if options.columns.is_empty() {
        key_union(records)
    } else {
        options.columns.clone()
    };

    let mut frame = Frame::new(options.frame_name.as_str());
    for column in &schema {
        let selector = &apply_override(column, &options.override_columns);
        let raw: Vec<&Value> = records
            .iter()
            .map(|r| r.get(&selector.selector).unwrap_or(&Value::Null))
            .collect();

        let (column_type, field_type) = match selector.field_type {
            Some(declared) => (declared.column_type(), declared),
            None => {
                let inferred = infer_type(raw.iter().copied());
                (inferred, inferred.field_type())
            }
        };

        let values = raw.into_iter().enumerate().map(|(row, value)| {
            coerce(value, field_type, &selector.time_format).unwrap_or_else(|e| {
                tracing::trace!(column = %selector.display_name(), row, error = %e, "coercion failed, using null");
                Value::Null
            })
        });
        frame
            .columns
            .push(Column::with_values(selector.display_name(), column_type, values));
    }

    if let Some(name) = frame.duplicate_column_name() {
        return Err(ShapeError::not_unique_field_names(name));
    }

    tracing::debug!(
        frame = %frame.name,
        columns = frame.columns.len(),
        rows = frame.row_count(),
        "frame built"
    );
    Ok(frame)
}

// Type, alias and time format of a matching override win; the raw values
// still come from the schema column's source key.
fn apply_override(column: &ColumnSelector, overrides: &[ColumnSelector]) -> ColumnSelector {
    let Some(found) = overrides
        .iter()
        .find(|o| o.selector == column.selector || o.selector == column.display_name())
    else {
        return column.clone();
    };
    let mut merged = column.clone();
    if found.field_type.is_some() {
        merged.field_type = found.field_type;
    }
    if !found.alias.is_empty() {
        merged.alias = found.alias.clone();
    }
    if !found.time_format.is_empty() {
        merged.time_format = found.time_format.clone();
    }
    merged
}

fn key_union(records: &[Record]) -> Vec<ColumnSelector> {
    let mut keys: Vec<&str> = Vec::new();
    for key in records.iter().flat_map(Record::keys) {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys.into_iter().map(ColumnSelector::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_api::error::ErrorKind;
    use tabula_api::schema::{ColumnType, FieldType};

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_first_seen_union_and_padding() {
        let records = vec![
            record(&[("a", Value::from("1"))]),
            record(&[("b", Value::from("x")), ("a", Value::from("2"))]),
        ];
        let frame = build_frame(&records, &FramerOptions::new("t")).unwrap();
        assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.columns[0].column_type, ColumnType::Number);
        assert_eq!(frame.columns[1].values, vec![Value::Null, Value::from("x")]);
    }

    #[test]
    fn test_one_bad_value_makes_column_string() {
        let records: Vec<Record> = ["1", "2", "three"]
            .iter()
            .map(|v| record(&[("n", Value::from(*v))]))
            .collect();
        let frame = build_frame(&records, &FramerOptions::new("t")).unwrap();
        assert_eq!(frame.columns[0].column_type, ColumnType::String);
        assert_eq!(frame.columns[0].values[0], Value::from("1"));
    }

    #[test]
    fn test_explicit_columns_order_alias_and_type() {
        let records = vec![record(&[
            ("age", Value::from("30")),
            ("name", Value::from("foo")),
            ("ts", Value::Number(0.0)),
        ])];
        let columns = vec![
            ColumnSelector::new("name").with_alias("Name"),
            ColumnSelector::new("age").with_type(FieldType::String),
            ColumnSelector::new("ts").with_type(FieldType::TimestampEpoch),
            ColumnSelector::new("missing").with_type(FieldType::Number),
        ];
        let frame = build_frame(&records, &FramerOptions::new("t").with_columns(columns)).unwrap();
        assert_eq!(
            frame.column_names().collect::<Vec<_>>(),
            vec!["Name", "age", "ts", "missing"]
        );
        assert_eq!(frame.columns[1].values[0], Value::from("30"));
        assert_eq!(frame.columns[2].column_type, ColumnType::Time);
        assert!(frame.columns[2].values[0].as_timestamp().is_some());
        assert_eq!(frame.columns[3].values, vec![Value::Null]);
    }

    #[test]
    fn test_coercion_failure_is_null() {
        let records = vec![record(&[("n", Value::from("abc"))]), record(&[("n", Value::from("4"))])];
        let columns = vec![ColumnSelector::new("n").with_type(FieldType::Number)];
        let frame = build_frame(&records, &FramerOptions::new("t").with_columns(columns)).unwrap();
        assert_eq!(frame.columns[0].values, vec![Value::Null, Value::Number(4.0)]);
    }

    #[test]
    fn test_duplicate_alias_is_rejected() {
        let columns = vec![
            ColumnSelector::new("a").with_alias("x"),
            ColumnSelector::new("b").with_alias("x"),
        ];
        let err = build_frame(&[], &FramerOptions::new("t").with_columns(columns)).unwrap_err();
        assert!(err.is(ErrorKind::NotUniqueFieldNames));
    }

    #[test]
    fn test_override_columns() {
        let records = vec![
            record(&[("id", Value::from("7")), ("when", Value::from("2021-03-04"))]),
            record(&[("id", Value::from("8")), ("when", Value::from("2021-03-05"))]),
        ];
        let overrides = vec![
            ColumnSelector::new("id").with_type(FieldType::String),
            ColumnSelector::new("when")
                .with_alias("day")
                .with_type(FieldType::Timestamp)
                .with_time_format("%Y-%m-%d"),
            ColumnSelector::new("absent").with_type(FieldType::Number),
        ];
        let frame = build_frame(&records, &FramerOptions::new("t").with_override_columns(overrides)).unwrap();
        assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["id", "day"]);
        assert_eq!(frame.columns[0].column_type, ColumnType::String);
        assert_eq!(frame.columns[0].values[0], Value::from("7"));
        assert_eq!(frame.columns[1].column_type, ColumnType::Time);
        assert!(frame.columns[1].values[1].as_timestamp().is_some());
    }

    #[test]
    fn test_override_matches_alias_of_explicit_column() {
        let records = vec![record(&[("n", Value::from("1"))])];
        let columns = vec![ColumnSelector::new("n").with_alias("count")];
        let overrides = vec![ColumnSelector::new("count").with_type(FieldType::String)];
        let options = FramerOptions::new("t")
            .with_columns(columns)
            .with_override_columns(overrides);
        let frame = build_frame(&records, &options).unwrap();
        assert_eq!(frame.columns[0].name, "count");
        assert_eq!(frame.columns[0].column_type, ColumnType::String);
    }

    #[test]
    fn test_no_records() {
        let frame = build_frame(&[], &FramerOptions::new("t")).unwrap();
        assert!(frame.columns.is_empty());
        assert_eq!(frame.row_count(), 0);
    }
}
