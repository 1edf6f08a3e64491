use std::collections::HashMap;

use tabula_api::document::Document;
use tabula_api::error::ShapeError;

use super::Selector;
use crate::expr::{Bindings, ExpressionEngine, document_to_dynamic, dynamic_to_document};

/// Script dialect. The whole document is bound as `data`; when it is an
/// object its top-level keys are bound as variables too.
///
/// ```text
/// data.items.filter(|x| x.n > 1).map(|x| x.name)
/// items.len()
/// ```
pub struct FunctionalSelector;

impl Selector for FunctionalSelector {
    fn name(&self) -> &'static str {
        "functional"
    }

    fn select(&self, doc: &Document, selector: &str) -> Result<Document, ShapeError> {
        let engine = ExpressionEngine::shared();
        let script = engine
            .compile_script(selector)
            .map_err(|e| ShapeError::selector_parse(e.message))?;

        let mut bindings = Bindings::new();
        bindings.bind("data", document_to_dynamic(doc));
        if let Document::Object(entries) = doc {
            for (key, value) in entries {
                if is_identifier(key) {
                    bindings.bind(key.as_str(), document_to_dynamic(value));
                }
            }
        }

        let result = engine
            .eval(&script, &bindings)
            .map_err(ShapeError::selector_eval)?;

        let mut order = HashMap::new();
        key_order(doc, &mut order);
        Ok(restore_key_order(dynamic_to_document(result), &order))
    }
}

// First-seen position of every object key anywhere in `doc`.
fn key_order(doc: &Document, order: &mut HashMap<String, usize>) {
    match doc {
        Document::Object(entries) => {
            for (key, value) in entries {
                let next = order.len();
                order.entry(key.clone()).or_insert(next);
                key_order(value, order);
            }
        }
        Document::Array(items) => items.iter().for_each(|item| key_order(item, order)),
        _ => {}
    }
}

// Script maps come back sorted by key. Put keys that exist in the source
// back in source order; keys the script invented keep their sorted order
// after them.
fn restore_key_order(doc: Document, order: &HashMap<String, usize>) -> Document {
    match doc {
        Document::Object(entries) => {
            let mut entries: Vec<(String, Document)> = entries
                .into_iter()
                .map(|(k, v)| (k, restore_key_order(v, order)))
                .collect();
            entries.sort_by_key(|(k, _)| order.get(k).copied().unwrap_or(usize::MAX));
            Document::Object(entries)
        }
        Document::Array(items) => Document::Array(
            items
                .into_iter()
                .map(|item| restore_key_order(item, order))
                .collect(),
        ),
        other => other,
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_api::error::ErrorKind;

    fn doc() -> Document {
        Document::from(json!({
            "items": [
                {"name": "a", "n": 1},
                {"name": "b", "n": 2},
                {"name": "c", "n": 3}
            ]
        }))
    }

    #[test]
    fn test_closures_over_items() {
        let out = FunctionalSelector
            .select(&doc(), "items.filter(|x| x.n > 1).map(|x| x.name)")
            .unwrap();
        assert_eq!(out, Document::from(json!(["b", "c"])));
    }

    #[test]
    fn test_data_binding_and_arithmetic() {
        let out = FunctionalSelector.select(&doc(), "data.items[2].n * 10").unwrap();
        assert_eq!(out, Document::Number(30.0));
    }

    #[test]
    fn test_object_result() {
        let out = FunctionalSelector
            .select(&doc(), "#{ total: items.len(), first: items[0].name }")
            .unwrap();
        assert_eq!(out.get("total"), Some(&Document::Number(3.0)));
        assert_eq!(out.get("first"), Some(&Document::from("a")));
    }

    #[test]
    fn test_source_key_order_is_kept() {
        let doc = Document::from(json!({
            "rows": [{"zeta": 1, "alpha": {"y": 1, "x": 2}, "mid": 3}]
        }));
        let out = FunctionalSelector.select(&doc, "rows").unwrap();
        assert_eq!(out.to_string(), r#"[{"zeta":1,"alpha":{"y":1,"x":2},"mid":3}]"#);

        let out = FunctionalSelector
            .select(&doc, "#{ b: 1, zeta: 2, a: 3 }")
            .unwrap();
        assert_eq!(out.to_string(), r#"{"zeta":2,"a":3,"b":1}"#);
    }

    #[test]
    fn test_errors() {
        let err = FunctionalSelector.select(&doc(), "items.filter(").unwrap_err();
        assert!(err.is(ErrorKind::SelectorParse));
        let err = FunctionalSelector.select(&doc(), "unknown_var + 1").unwrap_err();
        assert!(err.is(ErrorKind::SelectorEval));
    }

    #[test]
    fn test_identifier_keys() {
        assert!(is_identifier("items"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a-b"));
    }
}
