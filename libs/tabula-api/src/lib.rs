pub mod config;
pub mod document;
pub mod error;
pub mod frame;
pub mod record;
pub mod schema;
pub mod value;

pub use config::CsvOptions;
pub use document::Document;
pub use error::{ErrorCategory, ErrorKind, ShapeError};
pub use frame::{Column, Frame};
pub use record::Record;
pub use schema::{ColumnSelector, ColumnType, FieldType};
pub use value::Value;
