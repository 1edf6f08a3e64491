//! Selector dialects: reduce or reshape a [`Document`] before record extraction.

mod functional;
mod path;
mod pipeline;

use serde::{Deserialize, Serialize};
use tabula_api::document::Document;
use tabula_api::error::{ErrorKind, ShapeError};

pub use functional::FunctionalSelector;
pub use path::{PathSelector, lookup};
pub use pipeline::PipelineSelector;

/// One selector dialect.
pub trait Selector: Send + Sync {
    fn name(&self) -> &'static str;

    fn select(&self, doc: &Document, selector: &str) -> Result<Document, ShapeError>;
}

/// Dialect tag as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(alias = "gjson")]
    Path,
    #[serde(alias = "jsonata")]
    Functional,
    #[serde(alias = "jq")]
    Pipeline,
    #[default]
    Guess,
}

impl Dialect {
    pub fn selector(self) -> &'static dyn Selector {
        match self {
            Dialect::Path => &PathSelector,
            Dialect::Functional => &FunctionalSelector,
            Dialect::Pipeline => &PipelineSelector,
            Dialect::Guess => &GuessSelector,
        }
    }
}

/// Path first; when it finds nothing, retry as a functional expression.
pub struct GuessSelector;

impl Selector for GuessSelector {
    fn name(&self) -> &'static str {
        "guess"
    }

    fn select(&self, doc: &Document, selector: &str) -> Result<Document, ShapeError> {
        match PathSelector.select(doc, selector) {
            Err(e) if e.is(ErrorKind::SelectorNotFound) => {
                tracing::trace!(selector, "path lookup missed, trying functional dialect");
                FunctionalSelector.select(doc, selector)
            }
            other => other,
        }
    }
}

/// Apply `selector` to `doc` in the given dialect. A blank selector returns
/// the document unchanged.
pub fn evaluate(doc: Document, selector: &str, dialect: Dialect) -> Result<Document, ShapeError> {
    if selector.trim().is_empty() {
        return Ok(doc);
    }
    let strategy = dialect.selector();
    check_nesting(selector)
        .and_then(|()| strategy.select(&doc, selector.trim()))
        .map_err(|e| e.with_context(strategy.name()))
}

const MAX_NESTING: usize = 128;
const MAX_SELECTOR_LEN: usize = 8 * 1024;

// Dialect parsers recurse per nesting level; refuse selectors that could
// exhaust the stack.
fn check_nesting(selector: &str) -> Result<(), ShapeError> {
    if selector.len() > MAX_SELECTOR_LEN {
        return Err(ShapeError::selector_parse(format!(
            "selector is longer than {MAX_SELECTOR_LEN} bytes"
        )));
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in selector.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(ShapeError::selector_parse(format!(
                        "selector nests deeper than {MAX_NESTING} levels"
                    )));
                }
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Document {
        Document::from(json!({
            "data": {"items": [{"name": "a", "n": 1}, {"name": "b", "n": 2}]}
        }))
    }

    #[test]
    fn test_blank_selector_is_identity() {
        for dialect in [Dialect::Path, Dialect::Functional, Dialect::Pipeline, Dialect::Guess] {
            assert_eq!(evaluate(doc(), "  ", dialect).unwrap(), doc());
        }
    }

    #[test]
    fn test_dialect_aliases() {
        let d: Dialect = serde_json::from_str(r#""jq""#).unwrap();
        assert_eq!(d, Dialect::Pipeline);
        let d: Dialect = serde_json::from_str(r#""gjson""#).unwrap();
        assert_eq!(d, Dialect::Path);
        let d: Dialect = serde_json::from_str(r#""jsonata""#).unwrap();
        assert_eq!(d, Dialect::Functional);
        assert_eq!(Dialect::default(), Dialect::Guess);
    }

    #[test]
    fn test_guess_falls_back_to_functional() {
        let out = evaluate(doc(), "data.items.len()", Dialect::Guess).unwrap();
        assert_eq!(out, Document::Number(2.0));
        let out = evaluate(doc(), "data.items.1.name", Dialect::Guess).unwrap();
        assert_eq!(out, Document::from("b"));
    }

    #[test]
    fn test_guess_reports_last_error() {
        let err = evaluate(doc(), "missing.key", Dialect::Guess).unwrap_err();
        assert!(err.is(ErrorKind::SelectorEval), "{err:?}");
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let deep = format!("{}.{}", "(".repeat(50_000), ")".repeat(50_000));
        for dialect in [Dialect::Path, Dialect::Functional, Dialect::Pipeline, Dialect::Guess] {
            let err = evaluate(Document::Null, &deep, dialect).unwrap_err();
            assert!(err.is(ErrorKind::SelectorParse), "{dialect:?}: {err:?}");
        }
        let nested = format!("{}.{}", "[".repeat(MAX_NESTING + 1), "]".repeat(MAX_NESTING + 1));
        let err = evaluate(Document::Null, &nested, Dialect::Pipeline).unwrap_err();
        assert!(err.is(ErrorKind::SelectorParse));
        assert!(evaluate(doc(), r#"[.data.items[] | "((("]"#, Dialect::Pipeline).is_ok());
    }

    #[test]
    fn test_dialects_agree_on_simple_path() {
        let expected = Document::from(json!([{"name": "a", "n": 1}, {"name": "b", "n": 2}]));
        assert_eq!(evaluate(doc(), "data.items", Dialect::Path).unwrap(), expected);
        assert_eq!(evaluate(doc(), ".data.items", Dialect::Pipeline).unwrap(), expected);
        assert_eq!(evaluate(doc(), "data.items", Dialect::Functional).unwrap(), expected);
    }
}
