//! Script evaluation for `transform` and `filter` nodes.
//!
//! A script is the body of a one-parameter function: `;`-separated statements
//! with `input` bound to the node's input value. Each expression is evaluated
//! by `jexl_eval`; this module adds the statement layer on top:
//!
//! - `let name = <expr>` (also `const`/`var`) binds a variable for later statements
//! - `return <expr>` ends the script with that value
//! - `throw <expr>` / `throw new Error(<expr>)` fails with the evaluated message
//! - a bare expression as the last statement is the script's value
//!
//! A line starting with a statement keyword also begins a new statement, and
//! `//` starts a comment that runs to the end of the line.
//!
//! Expressions cannot perform IO. Bindings are passed as a context object and
//! are never interpolated into the source text.

use serde_json::{json, Map, Value};

/// Errors that can occur while evaluating a script.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScriptError {
    /// The expression language rejected or failed on an expression.
    #[error("{0}")]
    Eval(String),

    /// The script executed a `throw` statement.
    #[error("{0}")]
    Thrown(String),

    #[error("invalid statement '{0}'")]
    InvalidStatement(String),
}

const STATEMENT_KEYWORDS: [&str; 5] = ["let", "const", "var", "return", "throw"];

/// JEXL evaluator with the statement layer and standard transforms.
pub struct ScriptEvaluator {
    evaluator: jexl_eval::Evaluator<'static>,
}

impl ScriptEvaluator {
    /// Create a new evaluator with all standard transforms registered.
    pub fn new() -> Self {
        let evaluator = jexl_eval::Evaluator::new()
            .with_transform("lower", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_lowercase()))
            })
            .with_transform("upper", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_uppercase()))
            })
            .with_transform("trim", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.trim()))
            })
            .with_transform("split", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let delimiter = args.get(1).and_then(|v| v.as_str()).unwrap_or(",");
                if delimiter.is_empty() {
                    anyhow::bail!("split delimiter must not be empty");
                }
                let parts: Vec<&str> = s.split(delimiter).collect();
                Ok(json!(parts))
            })
            .with_transform("not", |args: &[Value]| {
                let val = args.first().cloned().unwrap_or(Value::Null);
                Ok(json!(!is_truthy(&val)))
            })
            .with_transform("contains", |args: &[Value]| {
                let found = match (args.first(), args.get(1)) {
                    (Some(Value::String(subject)), Some(Value::String(search))) => {
                        subject.contains(search.as_str())
                    }
                    (Some(Value::Array(items)), Some(needle)) => items.contains(needle),
                    _ => false,
                };
                Ok(json!(found))
            })
            .with_transform("startsWith", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let prefix = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.starts_with(prefix)))
            })
            .with_transform("endsWith", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let suffix = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.ends_with(suffix)))
            })
            .with_transform("length", |args: &[Value]| {
                let len = match args.first() {
                    Some(Value::String(s)) => s.chars().count(),
                    Some(Value::Array(a)) => a.len(),
                    Some(Value::Object(o)) => o.len(),
                    _ => 0,
                };
                Ok(json!(len as f64))
            })
            .with_transform("keys", |args: &[Value]| {
                let keys: Vec<&String> = match args.first() {
                    Some(Value::Object(o)) => o.keys().collect(),
                    _ => Vec::new(),
                };
                Ok(json!(keys))
            })
            .with_transform("json", |args: &[Value]| {
                let val = args.first().cloned().unwrap_or(Value::Null);
                Ok(json!(val.to_string()))
            });

        Self { evaluator }
    }

    /// Run a script body with the given variable bindings.
    pub fn evaluate(&self, source: &str, bindings: &Map<String, Value>) -> Result<Value, ScriptError> {
        let statements = split_statements(source);
        let mut scope = bindings.clone();

        let last = statements.len().saturating_sub(1);
        for (idx, raw) in statements.iter().enumerate() {
            match parse_statement(raw)? {
                Statement::Return(expr) => return self.eval_optional(expr, &scope),
                Statement::Throw(expr) => {
                    let message = match self.eval_optional(expr, &scope)? {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    return Err(ScriptError::Thrown(message));
                }
                Statement::Let { name, expr } => {
                    let value = self.eval_expression(expr, &scope)?;
                    scope.insert(name.to_string(), value);
                }
                Statement::Expr(expr) => {
                    let value = self.eval_expression(expr, &scope)?;
                    if idx == last {
                        return Ok(value);
                    }
                }
            }
        }

        Ok(Value::Null)
    }

    /// Run a script and coerce its value to a boolean (JavaScript-like truthiness).
    pub fn evaluate_condition(
        &self,
        source: &str,
        bindings: &Map<String, Value>,
    ) -> Result<bool, ScriptError> {
        self.evaluate(source, bindings).map(|v| is_truthy(&v))
    }

    fn eval_optional(&self, expr: &str, scope: &Map<String, Value>) -> Result<Value, ScriptError> {
        if expr.is_empty() {
            Ok(Value::Null)
        } else {
            self.eval_expression(expr, scope)
        }
    }

    fn eval_expression(&self, expr: &str, scope: &Map<String, Value>) -> Result<Value, ScriptError> {
        let context = Value::Object(scope.clone());
        self.evaluator
            .eval_in_context(expr, &context)
            .map(integral_numbers)
            .map_err(|e| ScriptError::Eval(e.to_string()))
    }
}

impl Default for ScriptEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite whole-valued floats as integers, recursively.
///
/// The expression engine computes in f64, so `1 + 1` comes back as `2.0`.
/// Integers serialize as `2`, which is what users expect to see in a trace.
fn integral_numbers(value: Value) -> Value {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() <= LIMIT => {
                Value::from(f as i64)
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(integral_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, integral_numbers(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Coerce a JSON value to boolean using JavaScript-like truthiness.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Statement layer
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Statement<'a> {
    Let { name: &'a str, expr: &'a str },
    Return(&'a str),
    Throw(&'a str),
    Expr(&'a str),
}

/// Split a script body into statement strings.
///
/// Separators are `;` and newlines that are followed by a statement keyword.
/// Quoted strings and `//` comments are respected.
fn split_statements(source: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                current.push(ch);
            }
            '/' if chars.peek() == Some(&'/') => {
                // Comment: skip to end of line, keep the newline.
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ';' => flush_statement(&mut statements, &mut current),
            '\n' => {
                let rest: String = chars.clone().collect();
                if starts_with_keyword(rest.trim_start()) {
                    flush_statement(&mut statements, &mut current);
                } else {
                    current.push(ch);
                }
            }
            _ => current.push(ch),
        }
    }
    flush_statement(&mut statements, &mut current);

    statements
}

fn flush_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

fn starts_with_keyword(s: &str) -> bool {
    STATEMENT_KEYWORDS
        .iter()
        .any(|kw| strip_keyword(s, kw).is_some())
}

/// Strip `keyword` from the front of `s` if it is followed by a word boundary.
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = s.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() || c == '(' || c == '\'' || c == '"' => Some(rest.trim()),
        _ => None,
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn parse_statement(raw: &str) -> Result<Statement<'_>, ScriptError> {
    if let Some(rest) = strip_keyword(raw, "return") {
        return Ok(Statement::Return(rest));
    }

    if let Some(rest) = strip_keyword(raw, "throw") {
        return Ok(Statement::Throw(unwrap_error_constructor(rest)));
    }

    for kw in ["let", "const", "var"] {
        if let Some(rest) = strip_keyword(raw, kw) {
            let (name, expr) = rest
                .split_once('=')
                .ok_or_else(|| ScriptError::InvalidStatement(raw.to_string()))?;
            let name = name.trim();
            let expr = expr.trim();
            if !is_identifier(name) || expr.is_empty() || expr.starts_with('=') {
                return Err(ScriptError::InvalidStatement(raw.to_string()));
            }
            return Ok(Statement::Let { name, expr });
        }
    }

    Ok(Statement::Expr(raw))
}

/// `new Error(<expr>)` -> `<expr>`; anything else is returned unchanged.
fn unwrap_error_constructor(expr: &str) -> &str {
    let Some(rest) = expr.strip_prefix("new ") else {
        return expr;
    };
    let rest = rest.trim_start();
    let Some(open) = rest.find('(') else {
        return expr;
    };
    if !is_identifier(rest[..open].trim()) || !rest.ends_with(')') {
        return expr;
    }
    rest[open + 1..rest.len() - 1].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(input: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("input".to_string(), input);
        map
    }

    fn eval(source: &str, input: Value) -> Result<Value, ScriptError> {
        ScriptEvaluator::new().evaluate(source, &bindings(input))
    }

    // -------------------------------------------------------------------
    // Defaults
    // -------------------------------------------------------------------

    #[test]
    fn test_default_transform_returns_input() {
        let input = json!({ "triggered": true });
        assert_eq!(eval("return input;", input.clone()).unwrap(), input);
    }

    #[test]
    fn test_default_condition_is_true() {
        let evaluator = ScriptEvaluator::new();
        assert!(evaluator.evaluate_condition("true", &bindings(Value::Null)).unwrap());
    }

    // -------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------

    #[test]
    fn test_return_arithmetic() {
        let result = eval("return input.count * 2;", json!({ "count": 21.0 })).unwrap();
        assert_eq!(result.as_f64(), Some(42.0));
    }

    #[test]
    fn test_integral_results_are_integers() {
        assert_eq!(eval("return 1 + 1;", Value::Null).unwrap(), json!(2));
        assert_eq!(eval("return 7 / 2;", Value::Null).unwrap(), json!(3.5));
        assert_eq!(
            eval("return [input.a * 2, {n: 10 / 5}];", json!({ "a": 1.5 })).unwrap(),
            json!([3, { "n": 2 }])
        );
        assert_eq!(eval("return input.items|length;", json!({ "items": [1, 2] })).unwrap(), json!(2));
    }

    #[test]
    fn test_let_bindings_are_visible_later() {
        let source = "let name = input.user.name|upper; return name;";
        let result = eval(source, json!({ "user": { "name": "ada" } })).unwrap();
        assert_eq!(result, json!("ADA"));
    }

    #[test]
    fn test_const_and_newline_separated_statements() {
        let source = "const total = input.items|length\nreturn total > 2";
        let result = eval(source, json!({ "items": ["a", "b", "c"] })).unwrap();
        assert_eq!(result, json!(true));
    }

    #[test]
    fn test_bare_last_expression_is_value() {
        let result = eval("input.title", json!({ "title": "delectus" })).unwrap();
        assert_eq!(result, json!("delectus"));
    }

    #[test]
    fn test_body_without_return_is_null() {
        assert_eq!(eval("let x = 1;", Value::Null).unwrap(), Value::Null);
        assert_eq!(eval("", Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_empty_return_is_null() {
        assert_eq!(eval("return;", json!(1.0)).unwrap(), Value::Null);
    }

    #[test]
    fn test_semicolon_inside_string_literal() {
        let result = eval("return input.msg == 'a;b';", json!({ "msg": "a;b" })).unwrap();
        assert_eq!(result, json!(true));
    }

    #[test]
    fn test_comments_are_ignored() {
        let source = "// pick the title; ignore the rest\nreturn input.title; // done";
        let result = eval(source, json!({ "title": "x" })).unwrap();
        assert_eq!(result, json!("x"));
    }

    #[test]
    fn test_ternary_in_return() {
        let source = "return input.completed ? 'done' : 'pending';";
        assert_eq!(eval(source, json!({ "completed": false })).unwrap(), json!("pending"));
    }

    // -------------------------------------------------------------------
    // Failures
    // -------------------------------------------------------------------

    #[test]
    fn test_throw_new_error() {
        let err = eval("throw new Error('x')", Value::Null).unwrap_err();
        assert_eq!(err, ScriptError::Thrown("x".to_string()));
    }

    #[test]
    fn test_throw_plain_value() {
        let err = eval("throw 'bad input';", Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "bad input");
    }

    #[test]
    fn test_throw_stops_before_return() {
        let err = eval("throw new Error('first'); return 1;", Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "first");
    }

    #[test]
    fn test_syntax_error_is_eval_error() {
        let err = eval("return input.(;", json!({})).unwrap_err();
        assert!(matches!(err, ScriptError::Eval(_)));
    }

    #[test]
    fn test_malformed_let_is_invalid_statement() {
        let err = eval("let 9lives = 1; return 1;", Value::Null).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidStatement(_)));
    }

    // -------------------------------------------------------------------
    // Conditions and truthiness
    // -------------------------------------------------------------------

    #[test]
    fn test_condition_comparison() {
        let evaluator = ScriptEvaluator::new();
        let ctx = bindings(json!({ "value": 12.0 }));
        assert!(evaluator.evaluate_condition("input.value > 10", &ctx).unwrap());
        assert!(!evaluator.evaluate_condition("input.value > 20", &ctx).unwrap());
    }

    #[test]
    fn test_condition_truthiness() {
        let evaluator = ScriptEvaluator::new();
        assert!(!evaluator.evaluate_condition("input", &bindings(Value::Null)).unwrap());
        assert!(!evaluator.evaluate_condition("input", &bindings(json!(""))).unwrap());
        assert!(evaluator.evaluate_condition("input", &bindings(json!("x"))).unwrap());
        assert!(!evaluator.evaluate_condition("input", &bindings(json!(0.0))).unwrap());
    }

    #[test]
    fn test_transforms() {
        let ctx = json!({ "tags": "a,b,c", "name": "  Hi  ", "meta": { "k": 1.0 } });
        assert_eq!(eval("return input.tags|split(',');", ctx.clone()).unwrap(), json!(["a", "b", "c"]));
        assert_eq!(eval("return input.name|trim|lower;", ctx.clone()).unwrap(), json!("hi"));
        assert_eq!(eval("return input.meta|keys;", ctx).unwrap(), json!(["k"]));
    }

    // -------------------------------------------------------------------
    // Statement splitting
    // -------------------------------------------------------------------

    #[test]
    fn test_split_statements_keeps_multiline_expressions() {
        let parts = split_statements("return input.a\n  ? 1\n  : 2");
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_unwrap_error_constructor() {
        assert_eq!(unwrap_error_constructor("new Error('x')"), "'x'");
        assert_eq!(unwrap_error_constructor("new TypeError(input.msg)"), "input.msg");
        assert_eq!(unwrap_error_constructor("'plain'"), "'plain'");
    }

    #[test]
    fn test_keyword_requires_boundary() {
        assert_eq!(
            parse_statement("returned").unwrap(),
            Statement::Expr("returned")
        );
        assert_eq!(parse_statement("return x").unwrap(), Statement::Return("x"));
    }
}
