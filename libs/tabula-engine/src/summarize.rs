use std::collections::HashMap;

use rhai::{Array, Dynamic};
use tabula_api::error::ShapeError;
use tabula_api::frame::{Column, Frame};
use tabula_api::schema::ColumnType;
use tabula_api::value::Value;

use crate::coerce::coerce;
use crate::expr::{Bindings, ExpressionEngine, dynamic_to_value, slugify, value_to_dynamic};

/// Hashable identity of a group-by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    Bool(bool),
    Number(u64),
    String(String),
    Timestamp(i64, u32),
}

impl From<&Value> for GroupKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => GroupKey::Null,
            Value::Bool(b) => GroupKey::Bool(*b),
            // -0.0 and 0.0 are one group
            Value::Number(n) if *n == 0.0 => GroupKey::Number(0),
            Value::Number(n) => GroupKey::Number(n.to_bits()),
            Value::String(s) => GroupKey::String(s.clone()),
            Value::Timestamp(t) => GroupKey::Timestamp(t.timestamp(), t.timestamp_subsec_nanos()),
        }
    }
}

struct Group {
    key: Value,
    rows: Vec<usize>,
}

/// Reduce `frame` with an aggregate expression, optionally per distinct
/// value of the `by` column.
///
/// Inside the expression every column is an array of the group's values.
/// Nulls read as `0` in number and time columns and `false` in boolean ones.
pub fn summarize(frame: &Frame, expression: &str, by: &str, alias: &str) -> Result<Frame, ShapeError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(ShapeError::invalid_aggregate_expression("summarize expression is empty"));
    }
    let by = by.trim();
    let by_column = if by.is_empty() {
        None
    } else {
        Some(
            frame
                .column(by)
                .ok_or_else(|| ShapeError::summarize_by_field_not_found(by))?,
        )
    };

    let engine = ExpressionEngine::shared();
    let compiled = engine.compile_script(expression).map_err(|e| {
        ShapeError::invalid_aggregate_expression(format!("invalid summarize expression. {e}"))
    })?;

    let groups = match by_column {
        Some(column) => group_rows(column),
        None => vec![Group {
            key: Value::Null,
            rows: (0..frame.row_count()).collect(),
        }],
    };

    let mut results = Vec::with_capacity(groups.len());
    for group in &groups {
        let mut bindings = Bindings::new();
        for column in &frame.columns {
            let values: Array = group
                .rows
                .iter()
                .map(|&row| aggregate_input(column, row))
                .collect();
            let values = Dynamic::from_array(values);
            bindings.bind(column.name.as_str(), values.clone());
            bindings.bind(slugify(&column.name), values);
        }
        let result = engine.eval(&compiled, &bindings).map_err(|e| {
            ShapeError::aggregate_evaluation(format!("summarize expression failed. {e}"))
        })?;
        results.push(match dynamic_to_value(result) {
            Value::Number(n) if !n.is_finite() => Value::Null,
            other => other,
        });
    }

    let name = if alias.trim().is_empty() { expression } else { alias.trim() };
    let result_type = results.iter().find_map(result_type).unwrap_or(ColumnType::Number);
    let result_column = Column::with_values(
        name,
        result_type,
        results
            .iter()
            .map(|v| coerce(v, result_type.field_type(), "").unwrap_or(Value::Null)),
    );

    let mut out = Frame::new(frame.name.as_str());
    out.meta = frame.meta.clone();
    if let Some(column) = by_column {
        out.columns.push(Column {
            values: groups.into_iter().map(|g| g.key).collect(),
            ..column.empty_copy()
        });
    }
    out.columns.push(result_column);

    if let Some(name) = out.duplicate_column_name() {
        return Err(ShapeError::not_unique_field_names(name));
    }
    tracing::debug!(frame = %frame.name, by, groups = out.row_count(), "summarize applied");
    Ok(out)
}

// Distinct values in first-seen order.
fn group_rows(column: &Column) -> Vec<Group> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for (row, value) in column.values.iter().enumerate() {
        let slot = *index.entry(GroupKey::from(value)).or_insert_with(|| {
            groups.push(Group {
                key: value.clone(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }
    groups
}

fn aggregate_input(column: &Column, row: usize) -> Dynamic {
    match column.get(row) {
        Some(value) if !value.is_null() => value_to_dynamic(value),
        _ => match column.column_type {
            ColumnType::Number => Dynamic::from_float(0.0),
            ColumnType::Time => Dynamic::from_int(0),
            ColumnType::Boolean => Dynamic::FALSE,
            ColumnType::String => Dynamic::UNIT,
        },
    }
}

fn result_type(value: &Value) -> Option<ColumnType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(ColumnType::Boolean),
        Value::Number(_) => Some(ColumnType::Number),
        Value::String(_) => Some(ColumnType::String),
        Value::Timestamp(_) => Some(ColumnType::Time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_api::error::ErrorKind;

    fn planets() -> Frame {
        Frame::new("planets")
            .with_column(Column::with_values(
                "group",
                ColumnType::String,
                ["A", "B", "A", "B", "A"].map(Value::from),
            ))
            .with_column(Column::with_values(
                "mass",
                ColumnType::Number,
                [Value::Number(1.0), Value::Null, Value::Number(3.0), Value::Number(4.0), Value::Number(5.0)],
            ))
    }

    #[test]
    fn test_null_counts_as_zero() {
        let out = summarize(&planets(), "mean(mass)", "", "summary").unwrap();
        assert_eq!(out.columns.len(), 1);
        assert_eq!(out.columns[0].name, "summary");
        assert_eq!(out.columns[0].values, vec![Value::Number(2.6)]);
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let out = summarize(&planets(), "sum(mass)", "group", "").unwrap();
        assert_eq!(out.column_names().collect::<Vec<_>>(), vec!["group", "sum(mass)"]);
        assert_eq!(out.columns[0].values, vec![Value::from("A"), Value::from("B")]);
        assert_eq!(out.columns[1].values, vec![Value::Number(9.0), Value::Number(4.0)]);
    }

    #[test]
    fn test_builtin_aggregates() {
        let frame = planets();
        let eval = |expr: &str| summarize(&frame, expr, "", "r").unwrap().columns[0].values[0].clone();
        assert_eq!(eval("count(mass)"), Value::Number(5.0));
        assert_eq!(eval("max(mass)"), Value::Number(5.0));
        assert_eq!(eval("min(mass)"), Value::Number(0.0));
        assert_eq!(eval("first(group)"), Value::from("A"));
        assert_eq!(eval("last(mass) - first(mass)"), Value::Number(4.0));
        assert_eq!(eval("avg(mass) > 2.0"), Value::Bool(true));
    }

    #[test]
    fn test_errors() {
        let frame = planets();
        let err = summarize(&frame, " ", "", "").unwrap_err();
        assert!(err.is(ErrorKind::InvalidAggregateExpression));
        let err = summarize(&frame, "sum(mass)", "planet", "").unwrap_err();
        assert!(err.is(ErrorKind::SummarizeByFieldNotFound));
        let err = summarize(&frame, "sum(group)", "", "").unwrap_err();
        assert!(err.is(ErrorKind::AggregateEvaluation));
        let err = summarize(&frame, "sum(", "", "").unwrap_err();
        assert!(err.is(ErrorKind::InvalidAggregateExpression));
    }

    #[test]
    fn test_empty_frame_yields_null_mean() {
        let frame = planets().empty_copy();
        let out = summarize(&frame, "mean(mass)", "", "m").unwrap();
        assert_eq!(out.columns[0].values, vec![Value::Null]);
        let out = summarize(&frame, "mean(mass)", "group", "m").unwrap();
        assert_eq!(out.row_count(), 0);
    }
}
