use tabula_api::error::{ErrorKind, ShapeError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Shape` the context goes to the inner `ShapeError`, for `Config`
    /// it is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Shape(e) => EngineError::Shape(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }

    /// Kind of the underlying shaping error, if this is one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EngineError::Shape(e) => Some(e.kind()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_errors_keep_their_kind() {
        let err: EngineError = ShapeError::selector_parse("bad token").into();
        let err = err.with_context("query");
        assert_eq!(err.kind(), Some(ErrorKind::SelectorParse));
        assert_eq!(err.to_string(), "query: bad token");
    }

    #[test]
    fn test_config_context() {
        let err = EngineError::Config("missing field".into()).with_context("q.toml");
        assert_eq!(err.to_string(), "config error: q.toml: missing field");
        assert_eq!(err.kind(), None);
    }
}
