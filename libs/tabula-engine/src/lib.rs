pub mod coerce;
pub mod config;
pub mod error;
pub mod expr;
pub mod filter;
pub mod framer;
pub mod query;
pub mod records;
pub mod selector;
pub mod summarize;

pub use config::{ConfigParser, JsonParser, Query, SummarizeConfig, TomlParser};
pub use error::EngineError;
pub use filter::{apply_filter, apply_filter_all};
pub use framer::{FramerOptions, build_frame};
pub use query::run;
pub use records::extract_records;
pub use selector::{Dialect, Selector, evaluate};
pub use summarize::summarize;
