use std::path::Path;

use serde::{Deserialize, Serialize};
use tabula_api::config::CsvOptions;
use tabula_api::schema::ColumnSelector;

use crate::error::EngineError;
use crate::selector::Dialect;

/// One configured conversion: document → frame → filter → summarize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Query {
    pub frame_name: String,

    /// Explicit column schema. Empty means "infer every key".
    pub columns: Vec<ColumnSelector>,

    /// Type, alias or time format adjustments applied after inference.
    pub override_columns: Vec<ColumnSelector>,

    pub root_selector: String,

    /// Dialect of `root_selector`.
    pub parser: Dialect,

    pub filter_expression: String,

    pub summarize: SummarizeConfig,

    pub csv: CsvOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummarizeConfig {
    pub expression: String,
    pub by: String,
    pub alias: String,
}

impl SummarizeConfig {
    pub fn is_enabled(&self) -> bool {
        !self.expression.trim().is_empty()
    }
}

/// Config file format, chosen by file extension.
pub trait ConfigParser {
    fn extensions(&self) -> &[&str];

    fn parse(&self, content: &str) -> Result<Query, EngineError>;
}

pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, content: &str) -> Result<Query, EngineError> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }
}

pub struct JsonParser;

impl ConfigParser for JsonParser {
    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn parse(&self, content: &str) -> Result<Query, EngineError> {
        serde_json::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }
}

const PARSERS: &[&dyn ConfigParser] = &[&TomlParser, &JsonParser];

impl Query {
    /// Load a query from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let parser = PARSERS
            .iter()
            .find(|p| p.extensions().contains(&ext.as_str()))
            .ok_or_else(|| {
                EngineError::Config(format!("{}: unsupported config extension {ext:?}", path.display()))
            })?;

        let content = std::fs::read_to_string(path).map_err(|source| EngineError::Read {
            path: path.display().to_string(),
            source,
        })?;
        parser
            .parse(&content)
            .map_err(|e| e.with_context(path.display()))
    }

    pub fn parse_toml(content: &str) -> Result<Self, EngineError> {
        TomlParser.parse(content)
    }

    pub fn parse_json(content: &str) -> Result<Self, EngineError> {
        JsonParser.parse(content)
    }
}
