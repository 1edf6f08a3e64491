use serde::{Deserialize, Serialize};

/// Pass-through knobs for the CSV normalizer.
///
/// They only shape how CSV text becomes a document; the core never reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvOptions {
    /// Single-character field delimiter. Empty means `,`. `\t` is accepted as an escape.
    pub delimiter: String,
    /// Lines starting with this character are skipped. Empty disables comments.
    pub comment: String,
    /// First line is data, columns are named `1`, `2`, ...
    pub no_headers: bool,
    /// Allow records with a different number of fields than the first one.
    pub relax_column_count: bool,
    /// Drop malformed records instead of failing the whole document.
    pub skip_lines_with_error: bool,
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn without_headers(mut self) -> Self {
        self.no_headers = true;
        self
    }

    pub fn relaxed(mut self) -> Self {
        self.relax_column_count = true;
        self
    }

    pub fn skipping_bad_lines(mut self) -> Self {
        self.skip_lines_with_error = true;
        self
    }
}
