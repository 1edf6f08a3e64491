use tabula_api::document::Document;
use tabula_api::frame::Frame;

use crate::config::Query;
use crate::error::EngineError;
use crate::filter::apply_filter;
use crate::framer::{FramerOptions, build_frame};
use crate::records::extract_records;
use crate::selector;
use crate::summarize::summarize;

/// Run a whole configured conversion over one document.
pub fn run(document: Document, query: &Query) -> Result<Frame, EngineError> {
    let reduced = selector::evaluate(document, &query.root_selector, query.parser)?;
    let records = extract_records(&reduced, &query.columns);
    tracing::debug!(
        frame = %query.frame_name,
        parser = ?query.parser,
        records = records.len(),
        "records extracted"
    );

    let options = FramerOptions::new(query.frame_name.as_str())
        .with_columns(query.columns.clone())
        .with_override_columns(query.override_columns.clone());
    let mut frame = build_frame(&records, &options)?;

    if !query.filter_expression.trim().is_empty() {
        frame = apply_filter(Some(&frame), &query.filter_expression)?;
    }
    if query.summarize.is_enabled() {
        let s = &query.summarize;
        frame = summarize(&frame, &s.expression, &s.by, &s.alias)?;
    }
    Ok(frame)
}
