//! Expression evaluation shared by the row filter, the aggregator and the
//! functional selector dialect.
//!
//! The evaluator is stateless: every evaluation receives a fresh set of
//! [`Bindings`] that is copied into a new scope, so one [`ExpressionEngine`]
//! can be reused across rows, calls and threads.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rhai::{AST, Array, Dynamic, Engine, EvalAltResult, FLOAT, INT, ImmutableString, Map, ParseErrorType, Scope};
use tabula_api::document::Document;
use tabula_api::frame::Frame;
use tabula_api::value::Value;

/// Expression compiled once and evaluated many times.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    ast: AST,
}

/// Compile failure. `token_level` is set when the source could not even be
/// tokenized (unknown operator, bad literal, reserved symbol).
#[derive(Debug, Clone)]
pub struct CompileError {
    pub token_level: bool,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Immutable variable bindings for one evaluation.
///
/// Later bindings shadow earlier ones with the same name.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    vars: Vec<(String, Dynamic)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Dynamic) {
        self.vars.push((name.into(), value));
    }

    fn to_scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        for (name, value) in &self.vars {
            scope.push_dynamic(name.as_str(), value.clone());
        }
        scope
    }
}

/// Read-only view of a frame exposed to expressions as `frame`.
#[derive(Debug, Clone)]
pub struct FrameHandle(Arc<Frame>);

impl FrameHandle {
    pub fn new(frame: Frame) -> Self {
        Self(Arc::new(frame))
    }
}

pub struct ExpressionEngine {
    engine: Engine,
}

impl fmt::Debug for ExpressionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionEngine").finish_non_exhaustive()
    }
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEngine {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        register_frame_api(&mut engine);
        register_aggregates(&mut engine);
        Self { engine }
    }

    /// Process-wide engine instance.
    pub fn shared() -> &'static ExpressionEngine {
        static ENGINE: OnceLock<ExpressionEngine> = OnceLock::new();
        ENGINE.get_or_init(ExpressionEngine::new)
    }

    /// Compile a single expression (no statements).
    pub fn compile_expression(&self, source: &str) -> Result<CompiledExpression, CompileError> {
        let ast = self
            .engine
            .compile_expression(normalize_literals(source))
            .map_err(compile_error)?;
        Ok(CompiledExpression { ast })
    }

    /// Compile a script; its value is the value of the last statement.
    pub fn compile_script(&self, source: &str) -> Result<CompiledExpression, CompileError> {
        let ast = self
            .engine
            .compile(normalize_literals(source))
            .map_err(compile_error)?;
        Ok(CompiledExpression { ast })
    }

    pub fn eval(&self, expr: &CompiledExpression, bindings: &Bindings) -> Result<Dynamic, String> {
        let mut scope = bindings.to_scope();
        self.engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &expr.ast)
            .map_err(|e| e.to_string())
    }
}

fn compile_error(err: rhai::ParseError) -> CompileError {
    let token_level = matches!(
        err.err_type(),
        ParseErrorType::BadInput(_) | ParseErrorType::Reserved(_)
    );
    CompileError {
        token_level,
        message: err.to_string(),
    }
}

/// Rewrite the bare keywords `null` and `nil` into the unit literal `()`
/// and single-quoted literals (`'abc'`) into double-quoted strings.
///
/// Double-quoted and back-quoted literals are left untouched.
fn normalize_literals(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in source.chars() {
        match quote {
            Some('\'') => {
                if escaped {
                    escaped = false;
                    if c != '\'' {
                        out.push('\\');
                    }
                    out.push(c);
                } else if c == '\\' {
                    escaped = true;
                } else if c == '\'' {
                    out.push('"');
                    quote = None;
                } else if c == '"' {
                    out.push_str("\\\"");
                } else {
                    out.push(c);
                }
                continue;
            }
            Some(q) => {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            None => {}
        }
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        flush_word(&mut out, &mut word);
        match c {
            '\'' => {
                quote = Some(c);
                out.push('"');
            }
            '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    flush_word(&mut out, &mut word);
    out
}

fn flush_word(out: &mut String, word: &mut String) {
    if word == "null" || word == "nil" {
        out.push_str("()");
    } else {
        out.push_str(word);
    }
    word.clear();
}

/// Expression-safe rendering of a column name: lower-cased, every character
/// outside `[a-z0-9_]` replaced by `_`, prefixed with `_` when it would start
/// with a digit.
pub fn slugify(name: &str) -> String {
    let mut slug: String = name
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if slug.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        slug.insert(0, '_');
    }
    slug
}

// ═══════════════════════════════════════════════════════════════
//  Conversions
// ═══════════════════════════════════════════════════════════════

fn string_dynamic(s: &str) -> Dynamic {
    Dynamic::from(ImmutableString::from(s))
}

/// Cell value → expression value. Timestamps become epoch milliseconds.
pub fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Number(n) => Dynamic::from_float(*n),
        Value::String(s) => string_dynamic(s),
        Value::Timestamp(t) => Dynamic::from_int(t.timestamp_millis()),
    }
}

/// Expression value → cell value. Non-scalar results become their text form.
pub fn dynamic_to_value(value: Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::Number(i as f64);
    }
    if let Ok(f) = value.as_float() {
        return Value::Number(f);
    }
    if let Ok(c) = value.as_char() {
        return Value::String(c.to_string());
    }
    if value.is_string() {
        return value.into_string().map_or(Value::Null, Value::String);
    }
    if value.is_array() || value.is_map() {
        return Value::String(dynamic_to_document(value).to_string());
    }
    Value::String(value.to_string())
}

/// Document → expression value. Integral numbers become integers so that
/// indexing and integer arithmetic behave naturally.
pub fn document_to_dynamic(doc: &Document) -> Dynamic {
    match doc {
        Document::Null => Dynamic::UNIT,
        Document::Bool(b) => Dynamic::from_bool(*b),
        Document::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Dynamic::from_int(*n as INT),
        Document::Number(n) => Dynamic::from_float(*n),
        Document::String(s) => string_dynamic(s),
        Document::Array(items) => Dynamic::from_array(items.iter().map(document_to_dynamic).collect()),
        Document::Object(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                map.insert(k.as_str().into(), document_to_dynamic(v));
            }
            Dynamic::from_map(map)
        }
    }
}

pub fn dynamic_to_document(value: Dynamic) -> Document {
    if value.is_unit() {
        return Document::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Document::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Document::Number(i as f64);
    }
    if let Ok(f) = value.as_float() {
        return Document::Number(f);
    }
    if let Ok(c) = value.as_char() {
        return Document::String(c.to_string());
    }
    if value.is_string() {
        return value.into_string().map_or(Document::Null, Document::String);
    }
    if value.is_array() {
        return value.into_array().map_or(Document::Null, |items| {
            Document::Array(items.into_iter().map(dynamic_to_document).collect())
        });
    }
    if value.is_map() {
        return value.try_cast::<Map>().map_or(Document::Null, |map| {
            Document::Object(
                map.into_iter()
                    .map(|(k, v)| (k.to_string(), dynamic_to_document(v)))
                    .collect(),
            )
        });
    }
    Document::String(value.to_string())
}

// ═══════════════════════════════════════════════════════════════
//  Registered API
// ═══════════════════════════════════════════════════════════════

fn register_frame_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<FrameHandle>("Frame")
        .register_get("name", |frame: &mut FrameHandle| {
            ImmutableString::from(frame.0.name.as_str())
        })
        .register_get("rows", |frame: &mut FrameHandle| frame.0.row_count() as INT)
        .register_get("fields", |frame: &mut FrameHandle| -> Array {
            frame.0.column_names().map(string_dynamic).collect()
        })
        .register_fn(
            "value",
            |frame: &mut FrameHandle, column: ImmutableString, row: INT| -> Dynamic {
                let Ok(row) = usize::try_from(row) else {
                    return Dynamic::UNIT;
                };
                frame
                    .0
                    .column(column.as_str())
                    .and_then(|c| c.get(row))
                    .map_or(Dynamic::UNIT, value_to_dynamic)
            },
        );
}

/// Aggregates over arrays. Unit entries count as zero.
fn register_aggregates(engine: &mut Engine) {
    engine
        .register_fn("sum", |values: Array| -> Result<FLOAT, Box<EvalAltResult>> {
            Ok(numbers(&values)?.iter().sum())
        })
        .register_fn("mean", mean)
        .register_fn("avg", mean)
        .register_fn("count", |values: Array| values.len() as INT)
        .register_fn("min", |values: Array| -> Result<Dynamic, Box<EvalAltResult>> {
            Ok(numbers(&values)?
                .into_iter()
                .reduce(FLOAT::min)
                .map_or(Dynamic::UNIT, Dynamic::from_float))
        })
        .register_fn("max", |values: Array| -> Result<Dynamic, Box<EvalAltResult>> {
            Ok(numbers(&values)?
                .into_iter()
                .reduce(FLOAT::max)
                .map_or(Dynamic::UNIT, Dynamic::from_float))
        })
        .register_fn("first", |values: Array| -> Dynamic {
            values.into_iter().next().unwrap_or(Dynamic::UNIT)
        })
        .register_fn("last", |values: Array| -> Dynamic {
            values.into_iter().last().unwrap_or(Dynamic::UNIT)
        });
}

fn mean(values: Array) -> Result<Dynamic, Box<EvalAltResult>> {
    let numbers = numbers(&values)?;
    if numbers.is_empty() {
        return Ok(Dynamic::UNIT);
    }
    Ok(Dynamic::from_float(numbers.iter().sum::<FLOAT>() / numbers.len() as FLOAT))
}

fn numbers(values: &Array) -> Result<Vec<FLOAT>, Box<EvalAltResult>> {
    values
        .iter()
        .map(|v| {
            if v.is_unit() {
                Ok(0.0)
            } else if let Ok(f) = v.as_float() {
                Ok(f)
            } else if let Ok(i) = v.as_int() {
                Ok(i as FLOAT)
            } else {
                Err(format!("cannot aggregate value of type {}", v.type_name()).into())
            }
        })
        .collect()
}
