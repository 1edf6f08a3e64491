use rhai::Dynamic;
use tabula_api::error::ShapeError;
use tabula_api::frame::Frame;

use crate::expr::{Bindings, ExpressionEngine, FrameHandle, slugify, value_to_dynamic};

/// Keep the rows of `frame` for which `expression` is true.
///
/// The input frame is never modified. Any failure rejects the whole call.
pub fn apply_filter(frame: Option<&Frame>, expression: &str) -> Result<Frame, ShapeError> {
    let Some(frame) = frame else {
        return Err(ShapeError::empty_frame());
    };
    let expression = expression.trim();
    if expression.is_empty() {
        return Ok(frame.clone());
    }
    if let Some(name) = frame.duplicate_column_name() {
        return Err(ShapeError::not_unique_field_names(name));
    }
    let rows = frame.row_count();
    if rows == 0 {
        return Ok(frame.clone());
    }

    let engine = ExpressionEngine::shared();
    let compiled = engine.compile_expression(expression).map_err(|e| {
        if e.token_level {
            ShapeError::invalid_filter_expression(&e)
        } else {
            ShapeError::filter_evaluation(format!("filter expression could not be compiled. {e}"))
        }
    })?;

    let handle = Dynamic::from(FrameHandle::new(frame.clone()));
    let mut out = frame.empty_copy();
    for row in 0..rows {
        let mut bindings = Bindings::new();
        bindings.bind("frame", handle.clone());
        bindings.bind("rowIndex", Dynamic::from_int(row as rhai::INT));
        for column in &frame.columns {
            let value = column.get(row).map_or(Dynamic::UNIT, value_to_dynamic);
            bindings.bind(column.name.as_str(), value.clone());
            bindings.bind(slugify(&column.name), value);
        }

        let result = engine.eval(&compiled, &bindings).map_err(|e| {
            ShapeError::filter_evaluation(format!("filter expression failed at row {row}. {e}"))
        })?;
        match result.as_bool() {
            Ok(true) => out.push_row(frame.row(row)),
            Ok(false) => {}
            Err(_) => return Err(ShapeError::non_binary_result(row)),
        }
    }

    tracing::debug!(
        frame = %frame.name,
        rows,
        kept = out.row_count(),
        "filter applied"
    );
    Ok(out)
}

/// Filter each frame independently. The first failure aborts the batch.
pub fn apply_filter_all(frames: &[Frame], expression: &str) -> Result<Vec<Frame>, ShapeError> {
    frames
        .iter()
        .map(|frame| {
            apply_filter(Some(frame), expression)
                .map_err(|e| e.with_context(format_args!("frame {:?}", frame.name)))
        })
        .collect()
}
