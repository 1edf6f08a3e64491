use std::fmt;

/// Broad error category. Lets callers tell user-input mistakes from
/// internal faults without matching every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Empty or structurally invalid source document, or no frame at all.
    Input,
    /// Selector parse / evaluation / not-found.
    Selector,
    /// Duplicate column names, unknown group-by field.
    Schema,
    /// Per-cell type parse failure. Absorbed into `Null`, never surfaced by the builder.
    Coercion,
    /// Filter or aggregate expression failure.
    Expression,
}

/// Error kind. Errors are compared by kind, never by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyInput,
    InvalidInput,
    SelectorParse,
    SelectorNotFound,
    SelectorEval,
    NotUniqueFieldNames,
    SummarizeByFieldNotFound,
    EmptyFrame,
    InvalidFilterExpression,
    NonBinaryResult,
    FilterEvaluation,
    InvalidAggregateExpression,
    AggregateEvaluation,
    Coercion,
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorKind::EmptyInput | ErrorKind::InvalidInput | ErrorKind::EmptyFrame => {
                ErrorCategory::Input
            }
            ErrorKind::SelectorParse | ErrorKind::SelectorNotFound | ErrorKind::SelectorEval => {
                ErrorCategory::Selector
            }
            ErrorKind::NotUniqueFieldNames | ErrorKind::SummarizeByFieldNotFound => {
                ErrorCategory::Schema
            }
            ErrorKind::Coercion => ErrorCategory::Coercion,
            ErrorKind::InvalidFilterExpression
            | ErrorKind::NonBinaryResult
            | ErrorKind::FilterEvaluation
            | ErrorKind::InvalidAggregateExpression
            | ErrorKind::AggregateEvaluation => ErrorCategory::Expression,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::EmptyInput => "empty input",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::SelectorParse => "selector parse",
            ErrorKind::SelectorNotFound => "selector not found",
            ErrorKind::SelectorEval => "selector evaluation",
            ErrorKind::NotUniqueFieldNames => "not unique field names",
            ErrorKind::SummarizeByFieldNotFound => "summarize by field not found",
            ErrorKind::EmptyFrame => "empty frame",
            ErrorKind::InvalidFilterExpression => "invalid filter expression",
            ErrorKind::NonBinaryResult => "non binary result",
            ErrorKind::FilterEvaluation => "filter evaluation",
            ErrorKind::InvalidAggregateExpression => "invalid aggregate expression",
            ErrorKind::AggregateEvaluation => "aggregate evaluation",
            ErrorKind::Coercion => "coercion",
        };
        f.write_str(s)
    }
}

/// Unified error for every shaping operation.
///
/// Carries an [`ErrorKind`] for branching and a human-readable message.
#[derive(Clone, PartialEq, Eq)]
pub struct ShapeError {
    kind: ErrorKind,
    message: String,
}

impl ShapeError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyInput, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, msg)
    }

    pub fn selector_parse(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SelectorParse, msg)
    }

    pub fn selector_not_found(selector: &str) -> Self {
        Self::new(ErrorKind::SelectorNotFound, format!("no value matches selector {selector:?}"))
    }

    pub fn selector_eval(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SelectorEval, msg)
    }

    pub fn not_unique_field_names(name: &str) -> Self {
        Self::new(
            ErrorKind::NotUniqueFieldNames,
            format!("field names are not unique ({name:?} repeats)"),
        )
    }

    pub fn summarize_by_field_not_found(field: &str) -> Self {
        Self::new(
            ErrorKind::SummarizeByFieldNotFound,
            format!("summarize by field {field:?} not found. Not applying summarize"),
        )
    }

    pub fn empty_frame() -> Self {
        Self::new(ErrorKind::EmptyFrame, "no frame supplied")
    }

    pub fn invalid_filter_expression(msg: impl fmt::Display) -> Self {
        Self::new(ErrorKind::InvalidFilterExpression, format!("invalid filter expression. {msg}"))
    }

    pub fn non_binary_result(row: usize) -> Self {
        Self::new(
            ErrorKind::NonBinaryResult,
            format!("filter expression for row {row} didn't produce binary result. Not applying filter"),
        )
    }

    pub fn filter_evaluation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::FilterEvaluation, msg)
    }

    pub fn invalid_aggregate_expression(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidAggregateExpression, msg)
    }

    pub fn aggregate_evaluation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::AggregateEvaluation, msg)
    }

    pub fn coercion(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Coercion, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, preserving the kind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Debug for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ShapeError {}

impl From<serde_json::Error> for ShapeError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_input(e.to_string())
    }
}
