//! Filter-pipeline dialect (jq), evaluated by jaq.

use jaq_core::load::{Arena, File, Loader};
use jaq_core::{Compiler, Ctx, RcIter};
use jaq_json::Val;
use tabula_api::document::Document;
use tabula_api::error::ShapeError;

use super::Selector;

pub struct PipelineSelector;

impl Selector for PipelineSelector {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    /// Every output is collected into an array. A lone array output is
    /// returned as is rather than wrapped.
    fn select(&self, doc: &Document, selector: &str) -> Result<Document, ShapeError> {
        let mut outputs = run(doc, selector)?;
        if outputs.len() == 1 && matches!(outputs[0], Document::Array(_)) {
            return Ok(outputs.remove(0));
        }
        Ok(Document::Array(outputs))
    }
}

fn run(doc: &Document, selector: &str) -> Result<Vec<Document>, ShapeError> {
    let program = File {
        code: selector,
        path: (),
    };
    let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = Arena::default();
    let modules = loader.load(&arena, program).map_err(|errs| {
        ShapeError::selector_parse(format!("cannot parse {selector:?} ({} error(s))", errs.len()))
    })?;
    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            ShapeError::selector_parse(format!(
                "cannot compile {selector:?} ({} undefined reference(s))",
                errs.len()
            ))
        })?;

    let inputs = RcIter::new(core::iter::empty());
    let mut outputs = Vec::new();
    for out in filter.run((Ctx::new([], &inputs), Val::from(doc.to_json()))) {
        let value = out.map_err(|e| ShapeError::selector_eval(e.to_string()))?;
        outputs.push(Document::from(serde_json::Value::from(value)));
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_api::error::ErrorKind;

    fn user() -> Document {
        Document::from(json!({
            "name": "foo",
            "age": 30,
            "address": {"country": "Bar", "postcode": "ABC123"}
        }))
    }

    fn users() -> Document {
        Document::from(json!([
            {"name": "foo", "age": 30, "team": "x"},
            {"name": "bar", "age": 14, "team": "y"},
            {"name": "baz", "age": 52, "team": "x"}
        ]))
    }

    fn select(doc: Document, selector: &str) -> serde_json::Value {
        PipelineSelector.select(&doc, selector).unwrap().to_json()
    }

    #[test]
    fn test_identity_is_wrapped() {
        assert_eq!(select(user(), "."), json!([user().to_json()]));
        assert_eq!(select(user(), "[.]"), json!([user().to_json()]));
    }

    #[test]
    fn test_field_access() {
        assert_eq!(select(user(), ".address.postcode"), json!(["ABC123"]));
        assert_eq!(select(user(), ".address | .postcode"), json!(["ABC123"]));
    }

    #[test]
    fn test_iteration_and_construction() {
        assert_eq!(select(users(), ".[] |  .name"), json!(["foo", "bar", "baz"]));
        let expected = json!([
            {"username": "foo", "age_after_30y": 60},
            {"username": "bar", "age_after_30y": 44},
            {"username": "baz", "age_after_30y": 82}
        ]);
        assert_eq!(
            select(users(), r#".[] |  { "username" : .name , "age_after_30y" : .age + 30 }"#),
            expected
        );
        assert_eq!(
            select(users(), r#"[.[] |  { "username" : .name , "age_after_30y" : .age + 30 }]"#),
            expected
        );
    }

    #[test]
    fn test_nested_data_and_conditionals() {
        let nested = Document::from(json!({"data": users().to_json()}));
        assert_eq!(select(nested.clone(), ".data"), users().to_json());
        assert_eq!(select(nested.clone(), ".data[]"), users().to_json());
        assert_eq!(
            select(
                nested,
                r#".data[] | { "name" : .name, "can_vote" : (if .age > 18 then "yes" else "no" end) }"#
            ),
            json!([
                {"name": "foo", "can_vote": "yes"},
                {"name": "bar", "can_vote": "no"},
                {"name": "baz", "can_vote": "yes"}
            ])
        );
    }

    #[test]
    fn test_standard_library() {
        assert_eq!(select(users(), "reduce .[] as $u (0; . + $u.age)"), json!([96]));
        assert_eq!(select(users(), "map(.team) | unique"), json!(["x", "y"]));
        assert_eq!(
            select(users(), "group_by(.team) | map({team: .[0].team, n: length})"),
            json!([{"team": "x", "n": 2}, {"team": "y", "n": 1}])
        );
        assert_eq!(select(users(), r#"map(.name) | join(",")"#), json!(["foo,bar,baz"]));
    }

    #[test]
    fn test_errors() {
        let err = PipelineSelector.select(&user(), ".address |").unwrap_err();
        assert!(err.is(ErrorKind::SelectorParse));
        let err = PipelineSelector.select(&user(), "no_such_function").unwrap_err();
        assert!(err.is(ErrorKind::SelectorParse));
        let err = PipelineSelector.select(&user(), ".name[]").unwrap_err();
        assert!(err.is(ErrorKind::SelectorEval));
    }
}
