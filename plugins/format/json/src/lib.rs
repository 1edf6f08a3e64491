//! JSON text → [`Document`]. Object key order is preserved.

use tabula_api::document::Document;
use tabula_api::error::ShapeError;

pub fn parse(text: &str) -> Result<Document, ShapeError> {
    if text.trim().is_empty() {
        return Err(ShapeError::empty_input("JSON input is empty"));
    }
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(Document::from(value))
}
