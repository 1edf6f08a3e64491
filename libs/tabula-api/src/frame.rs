use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::schema::ColumnType;
use crate::value::Value;

/// One named, typed value sequence within a [`Frame`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Per-field label metadata. `None` when the source never carried any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            labels: None,
            values: Vec::new(),
        }
    }

    pub fn with_values(
        name: impl Into<String>,
        column_type: ColumnType,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            labels: None,
            values: values.into_iter().collect(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// Same name, type and labels, no values.
    pub fn empty_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            column_type: self.column_type,
            labels: self.labels.clone(),
            values: Vec::new(),
        }
    }
}

/// Typed columnar output. Columns share one length (the row count).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Frame {
    pub name: String,
    /// Opaque frame-level metadata, carried through transformations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<BTreeMap<String, String>>,
    pub columns: Vec<Column>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: None,
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// First column name that appears more than once, if any.
    pub fn duplicate_column_name(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .find(|name| !seen.insert(*name))
    }

    /// Same name, meta and column schema, zero rows.
    pub fn empty_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            meta: self.meta.clone(),
            columns: self.columns.iter().map(Column::empty_copy).collect(),
        }
    }

    /// Copy of one row's values in column order. Short columns yield `Null`.
    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| c.get(row).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Append one row. Values are matched to columns by position; missing
    /// trailing values are padded with `Null`, extra values are dropped.
    pub fn push_row(&mut self, values: Vec<Value>) {
        let mut values = values.into_iter();
        for column in &mut self.columns {
            column.values.push(values.next().unwrap_or(Value::Null));
        }
    }
}
