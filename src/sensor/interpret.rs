//! Output interpreter: raw captured bytes to template variables.
//!
//! Pure and deterministic: the same stdout bytes always produce the same
//! variable set, and JSON parse failure is never an error, only "no
//! structured data available".

use crate::template::TemplateVars;
use serde_json::Value;

/// Build the template variable set from captured stdout.
///
/// `value` is always present: the lossily decoded, whitespace-trimmed stdout
/// text (`""` for empty output). `value_json` is present only when that text
/// parses as a JSON document.
pub fn interpret(stdout: &[u8]) -> TemplateVars {
    let value = String::from_utf8_lossy(stdout).trim().to_string();

    let mut vars = TemplateVars::new();
    if let Some(parsed) = try_parse_json(&value) {
        vars.insert("value_json", parsed);
    }
    vars.insert("value", Value::String(value));
    vars
}

/// Best-effort JSON parse. Failure is swallowed by contract.
fn try_parse_json(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_trimmed() {
        let vars = interpret(b"  hello world \n");

        assert_eq!(vars.get("value"), Some(&json!("hello world")));
        assert!(!vars.contains("value_json"));
    }

    #[test]
    fn test_empty_output_yields_empty_string() {
        let vars = interpret(b"");

        assert_eq!(vars.get("value"), Some(&json!("")));
        assert!(!vars.contains("value_json"));
    }

    #[test]
    fn test_json_object_parsed() {
        let vars = interpret(b"{\"a\":1}\n");

        assert_eq!(vars.get("value"), Some(&json!("{\"a\":1}")));
        assert_eq!(vars.get("value_json"), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_json_array_parsed() {
        let vars = interpret(b"[1, 2, 3]");
        assert_eq!(vars.get("value_json"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn test_bare_json_scalar_parsed() {
        let vars = interpret(b"42\n");

        assert_eq!(vars.get("value"), Some(&json!("42")));
        assert_eq!(vars.get("value_json"), Some(&json!(42)));
    }

    #[test]
    fn test_invalid_json_is_not_an_error() {
        let vars = interpret(b"not json");

        assert_eq!(vars.get("value"), Some(&json!("not json")));
        assert!(!vars.contains("value_json"));
    }

    #[test]
    fn test_multiline_internal_whitespace_preserved() {
        let vars = interpret(b"line1\n  line2\nline3\n");
        assert_eq!(vars.get("value"), Some(&json!("line1\n  line2\nline3")));
    }

    #[test]
    fn test_invalid_utf8_is_lossy_decoded() {
        let vars = interpret(&[0x68, 0x69, 0xFF]);
        assert_eq!(vars.get("value"), Some(&json!("hi\u{FFFD}")));
    }

    #[test]
    fn test_idempotent_on_identical_bytes() {
        let bytes = b"{\"cpu\": 0.5}";
        assert_eq!(interpret(bytes), interpret(bytes));
    }
}
