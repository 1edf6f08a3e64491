use tabula_api::document::Document;
use tabula_api::record::Record;
use tabula_api::schema::ColumnSelector;

use crate::selector::lookup;

/// Turn a reduced document into flat records, one per row.
///
/// Objects keep their keys; arrays and scalars become positional rows keyed
/// `"1"`, `"2"`, ... Nested values are stored as compact JSON text. With an
/// explicit selector list, only the selected values are kept, keyed by the
/// selector string (exact key first, then dotted path).
pub fn extract_records(doc: &Document, columns: &[ColumnSelector]) -> Vec<Record> {
    let rows: Vec<Document> = match doc {
        Document::Null => Vec::new(),
        Document::Array(items) => items.iter().map(row_document).collect(),
        other => vec![row_document(other)],
    };

    rows.iter()
        .map(|row| {
            if columns.is_empty() {
                flatten(row)
            } else {
                select(row, columns)
            }
        })
        .collect()
}

// Array and scalar rows become positional objects.
fn row_document(item: &Document) -> Document {
    match item {
        Document::Object(_) => item.clone(),
        Document::Array(values) => Document::Object(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| ((i + 1).to_string(), v.clone()))
                .collect(),
        ),
        scalar => Document::Object(vec![("1".to_string(), scalar.clone())]),
    }
}

fn flatten(row: &Document) -> Record {
    match row {
        Document::Object(entries) => entries.iter().map(|(k, v)| (k.clone(), v.to_value())).collect(),
        other => std::iter::once(("1".to_string(), other.to_value())).collect(),
    }
}

fn select(row: &Document, columns: &[ColumnSelector]) -> Record {
    let mut record = Record::new();
    for column in columns {
        let key = column.selector.as_str();
        let found = match row.get(key) {
            Some(value) => Some(value.clone()),
            None => lookup(row, key),
        };
        if let Some(value) = found {
            record.insert(key, value.to_value());
        }
    }
    record
}
