//! CSV text → [`Document`].
//!
//! With headers, every record becomes an object keyed by the header names.
//! Without headers, every record becomes an array of strings, which the
//! record extractor turns into positional columns `1`, `2`, ...
//! Values are always strings; typing happens later in the framer.

mod parser;

use tabula_api::config::CsvOptions;
use tabula_api::document::Document;
use tabula_api::error::ShapeError;

use parser::{parse_comment, parse_delimiter, read_rows};

pub fn parse(text: &str, options: &CsvOptions) -> Result<Document, ShapeError> {
    if text.trim().is_empty() {
        return Err(ShapeError::empty_input("CSV input is empty"));
    }
    let delimiter = parse_delimiter(&options.delimiter)?;
    let comment = parse_comment(&options.comment)?;

    let mut rows = Vec::new();
    for row in read_rows(text, delimiter, comment) {
        match row {
            Ok(row) => rows.push(row),
            Err(e) if options.skip_lines_with_error => {
                tracing::warn!(error = %e, "bad CSV record, skipping");
            }
            Err(e) => return Err(e),
        }
    }
    if rows.is_empty() {
        return Err(ShapeError::empty_input("CSV input has no records"));
    }

    let mut rows = rows.into_iter();
    let header = if options.no_headers {
        None
    } else {
        rows.next().map(|row| header_names(&row.fields))
    };
    let mut width = header.as_ref().map(Vec::len);

    let mut records = Vec::new();
    for row in rows {
        let expected = *width.get_or_insert(row.fields.len());
        if !options.relax_column_count && row.fields.len() != expected {
            let err = ShapeError::invalid_input(format!(
                "record on line {}: wrong number of fields (expected {expected}, got {})",
                row.line,
                row.fields.len()
            ));
            if options.skip_lines_with_error {
                tracing::warn!(error = %err, "bad CSV record, skipping");
                continue;
            }
            return Err(err);
        }
        let mut fields = row.fields;
        fields.truncate(expected);
        records.push(match &header {
            Some(names) => keyed(names, fields),
            None => Document::Array(fields.into_iter().map(Document::String).collect()),
        });
    }

    tracing::debug!(records = records.len(), headers = header.is_some(), "CSV parsed");
    Ok(Document::Array(records))
}

// Blank header cells fall back to their 1-based position.
fn header_names(fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .enumerate()
        .map(|(i, f)| match f.trim() {
            "" => (i + 1).to_string(),
            name => name.to_string(),
        })
        .collect()
}

fn keyed(names: &[String], fields: Vec<String>) -> Document {
    let mut object = Document::Object(Vec::with_capacity(fields.len()));
    for (name, value) in names.iter().zip(fields) {
        object.insert(name.clone(), Document::String(value));
    }
    object
}
