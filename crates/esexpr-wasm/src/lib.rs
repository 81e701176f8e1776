//! WASM bindings for the esexpr parser.
//!
//! Exposes `parse()`, `check()`, `print()` and `version()` via wasm-bindgen.
//! Trees cross the boundary as plain ESTree objects.

use esexpr_parser::{Expression, SyntaxError};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Parse an expression into an ESTree object.
///
/// Throws a JS error carrying the positioned message if parsing fails.
#[wasm_bindgen]
pub fn parse(source: &str) -> Result<JsValue, JsError> {
    let expr = esexpr_parser::parse(source).map_err(|e| JsError::new(&e.to_string()))?;
    to_js(&expr)
}

/// Validate an expression without building a JS tree.
///
/// Returns `{ ok: true }` or `{ ok: false, message, offset, line, column }`.
#[wasm_bindgen]
pub fn check(source: &str) -> Result<JsValue, JsError> {
    let result = check_source(source);
    let report = js_sys::Object::new();
    set(&report, "ok", result.is_ok())?;

    if let Err(err) = result {
        set(&report, "message", err.message.as_str())?;
        set(&report, "offset", err.offset as u32)?;
        set(&report, "line", err.line as u32)?;
        set(&report, "column", err.column as u32)?;
    }

    Ok(report.into())
}

/// Parse and re-render an expression in canonical form.
#[wasm_bindgen]
pub fn print(source: &str) -> Result<String, JsError> {
    esexpr_codegen::print(source).map_err(|e| JsError::new(&e.to_string()))
}

/// Get the parser version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn check_source(source: &str) -> Result<(), SyntaxError> {
    esexpr_parser::parse(source).map(|_| ())
}

fn to_js(expr: &Expression) -> Result<JsValue, JsError> {
    // Plain objects rather than `Map`s for the flattened node fields.
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    expr.serialize(&serializer)
        .map_err(|e| JsError::new(&format!("Failed to convert tree: {e}")))
}

fn set(target: &js_sys::Object, key: &str, value: impl Into<JsValue>) -> Result<(), JsError> {
    js_sys::Reflect::set(target, &key.into(), &value.into())
        .map(|_| ())
        .map_err(|_| JsError::new(&format!("Failed to set {key} property")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // =========================================================================
    // Native tests (non-WASM): verify the pipeline behind each binding
    // =========================================================================

    #[test]
    fn test_check_accepts_valid_source() {
        assert_eq!(check_source("a?.b(c)"), Ok(()));
    }

    #[test]
    fn test_check_reports_position() {
        let err = check_source("a +\n  )").unwrap_err();
        assert_eq!(err.message, "expected right hand expression");
        assert_eq!((err.line, err.column), (2, 3));
    }

    #[test]
    fn test_print() {
        assert_eq!(print("a?.b  (  1,2 )").ok().as_deref(), Some("a?.b(1, 2)"));
    }

    #[test]
    fn test_version() {
        let v = version();
        assert!(!v.is_empty());
        assert!(v.contains('.'));
    }

    #[test]
    fn test_independent_parses() {
        let first = esexpr_parser::parse("x").unwrap();
        let second = esexpr_parser::parse("[y]").unwrap();
        assert_eq!(first.node_type(), "Identifier");
        assert_eq!(second.node_type(), "ArrayExpression");
        assert_eq!(second.span.end, 3);
    }
}
