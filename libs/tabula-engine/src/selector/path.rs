use tabula_api::document::Document;
use tabula_api::error::ShapeError;

use super::Selector;

/// Dotted-path dialect, resolved by gjson.
///
/// ```text
/// data.items            object keys
/// items.0 / items[0]    array index
/// ["a.b"] / a\.b        keys containing dots
/// ite*s / it?ms         first key matching the pattern
/// items.#               array length
/// items.#.name          `name` of every element
/// items.#(n>1).name     first element matching a query
/// ```
pub struct PathSelector;

impl Selector for PathSelector {
    fn name(&self) -> &'static str {
        "path"
    }

    fn select(&self, doc: &Document, selector: &str) -> Result<Document, ShapeError> {
        let path = to_gjson_path(selector)?;
        resolve(&doc.to_string(), &path).ok_or_else(|| ShapeError::selector_not_found(selector))
    }
}

/// Resolve a dotted path against `doc`. Malformed paths resolve to nothing.
pub fn lookup(doc: &Document, path: &str) -> Option<Document> {
    let path = to_gjson_path(path).ok()?;
    resolve(&doc.to_string(), &path)
}

fn resolve(json: &str, path: &str) -> Option<Document> {
    let found = gjson::get(json, path);
    if !found.exists() {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(found.json())
        .ok()
        .map(Document::from)
}

// Bracket segments (`[0]`, `["a.b"]`) become dotted gjson segments. A
// leading `.` is dropped. Query parentheses are copied untouched.
fn to_gjson_path(path: &str) -> Result<String, ShapeError> {
    let path = path.strip_prefix('.').unwrap_or(path);
    let mut out = String::with_capacity(path.len());
    let mut depth = 0usize;
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '(' => {
                depth += 1;
                out.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                out.push(c);
            }
            '[' if depth == 0 => {
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(ShapeError::selector_parse(format!(
                        "unterminated bracket in path {path:?}"
                    )));
                }
                if !out.is_empty() && !out.ends_with('.') {
                    out.push('.');
                }
                out.push_str(&bracket_key(inner.trim()));
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn bracket_key(inner: &str) -> String {
    let key = ['"', '\'']
        .iter()
        .find_map(|q| inner.strip_prefix(*q).and_then(|rest| rest.strip_suffix(*q)))
        .unwrap_or(inner);
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        if matches!(c, '.' | '*' | '?' | '|' | '#' | '@' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_api::error::ErrorKind;

    fn doc() -> Document {
        Document::from(json!({
            "name": {"first": "Tom", "last": "Anderson"},
            "age": 37,
            "children": ["Sara", "Alex", "Jack"],
            "fav.movie": "Deer Hunter",
            "friends": [
                {"first": "Dale", "last": "Murphy", "age": 44},
                {"first": "Roger", "last": "Craig", "age": 68}
            ]
        }))
    }

    fn select(path: &str) -> Result<Document, ShapeError> {
        PathSelector.select(&doc(), path)
    }

    #[test]
    fn test_keys_and_indexes() {
        assert_eq!(select("name.last").unwrap(), Document::from("Anderson"));
        assert_eq!(select(".age").unwrap(), Document::Number(37.0));
        assert_eq!(select("children.1").unwrap(), Document::from("Alex"));
        assert_eq!(select("children[2]").unwrap(), Document::from("Jack"));
        assert_eq!(select("friends.1.first").unwrap(), Document::from("Roger"));
        assert_eq!(
            select("name").unwrap(),
            Document::from(json!({"first": "Tom", "last": "Anderson"}))
        );
    }

    #[test]
    fn test_count_map_and_query() {
        assert_eq!(select("children.#").unwrap(), Document::Number(3.0));
        assert_eq!(
            select("friends.#.first").unwrap(),
            Document::from(json!(["Dale", "Roger"]))
        );
        assert_eq!(select("friends.#(age>50).first").unwrap(), Document::from("Roger"));
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(select("child*.2").unwrap(), Document::from("Jack"));
        assert_eq!(select("c?ildren.0").unwrap(), Document::from("Sara"));
    }

    #[test]
    fn test_escaped_and_bracketed_keys() {
        assert_eq!(select(r"fav\.movie").unwrap(), Document::from("Deer Hunter"));
        assert_eq!(select(r#"["fav.movie"]"#).unwrap(), Document::from("Deer Hunter"));
        assert_eq!(to_gjson_path(r#"a["b.c"][0]"#).unwrap(), r"a.b\.c.0");
    }

    #[test]
    fn test_not_found_and_parse_error() {
        assert!(select("name.middle").unwrap_err().is(ErrorKind::SelectorNotFound));
        assert!(select("children.9").unwrap_err().is(ErrorKind::SelectorNotFound));
        assert!(select("children[1").unwrap_err().is(ErrorKind::SelectorParse));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(&doc(), "friends.0.age"), Some(Document::Number(44.0)));
        assert_eq!(lookup(&doc(), "nope"), None);
    }
}
