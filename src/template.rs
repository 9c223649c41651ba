//! Template engine for variable substitution.
//!
//! This module provides a simple template engine that performs `{variable}`
//! substitution in strings. It is used for:
//!
//! - Value templates (deriving the published sensor value from command output)
//! - Attribute templates (deriving named attributes from command output)
//! - Command templates (rendered against an empty variable set before
//!   execution, so configuration-time expressions only)
//!
//! # Syntax
//!
//! - `{name}` - Substitutes the value of variable `name`
//! - `{name.key.0}` - Traverses into a structured variable: object keys by
//!   name, array elements by numeric index
//! - `{{` - Renders as literal `{`
//! - `}}` - Renders as literal `}`
//!
//! # Rendering of structured values
//!
//! Strings render verbatim, numbers and booleans via their canonical text
//! form, and objects/arrays as compact JSON. JSON `null` renders as `none`,
//! which makes a null pluck fall under the sentinel-suppression policy when
//! value retention is enabled.
//!
//! # Error Handling
//!
//! The engine is fail-safe: undefined variables and missing fields cause an
//! error rather than silent substitution with empty strings. This prevents
//! subtle bugs from typos in variable or field names.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Error type for template rendering failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A variable (or a field inside one) was referenced but not present.
    UndefinedVariable {
        /// The full dotted reference as written in the template.
        name: String,
        /// The position in the template where the reference was found.
        position: usize,
    },
    /// A `{` was found without a matching `}`.
    UnmatchedBrace {
        /// The position of the unmatched `{`.
        position: usize,
    },
    /// An empty variable name was found (e.g., `{}`).
    EmptyVariableName {
        /// The position of the empty variable.
        position: usize,
    },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UndefinedVariable { name, position } => {
                write!(
                    f,
                    "undefined variable '{}' at position {} in template",
                    name, position
                )
            }
            TemplateError::UnmatchedBrace { position } => {
                write!(f, "unmatched '{{' at position {} in template", position)
            }
            TemplateError::EmptyVariableName { position } => {
                write!(
                    f,
                    "empty variable name '{{}}' at position {} in template",
                    position
                )
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Variable set exposed to template evaluation.
///
/// Values are JSON so a single variable can carry either plain text or a
/// parsed document. The mapping is read-only to the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateVars {
    vars: BTreeMap<String, Value>,
}

impl TemplateVars {
    /// An empty variable set (used for command templates).
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Look up a root variable by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Whether a root variable is present.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }
}

/// Render a template string by substituting variables.
///
/// # Arguments
///
/// * `template` - The template string containing `{variable}` placeholders
/// * `variables` - The variable set to resolve references against
///
/// # Returns
///
/// * `Ok(String)` - The rendered string with all references substituted
/// * `Err(TemplateError)` - If a reference is undefined or syntax is invalid
///
/// # Examples
///
/// ```
/// use cmdsense::template::{TemplateVars, render_template};
/// use serde_json::json;
///
/// let mut vars = TemplateVars::new();
/// vars.insert("value", json!("42"));
/// vars.insert("value_json", json!({"temp": {"c": 21.5}}));
///
/// let out = render_template("{value_json.temp.c} C (raw {value})", &vars).unwrap();
/// assert_eq!(out, "21.5 C (raw 42)");
/// ```
pub fn render_template(
    template: &str,
    variables: &TemplateVars,
) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' => {
                // Check for escape sequence {{
                if let Some((_, '{')) = chars.peek() {
                    chars.next(); // consume the second {
                    result.push('{');
                } else {
                    // Parse variable reference
                    let start_pos = pos;
                    let mut reference = String::new();

                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => reference.push(c),
                            None => {
                                return Err(TemplateError::UnmatchedBrace {
                                    position: start_pos,
                                });
                            }
                        }
                    }

                    // Check for empty variable name
                    if reference.trim().is_empty() {
                        return Err(TemplateError::EmptyVariableName {
                            position: start_pos,
                        });
                    }

                    // Trim whitespace from the reference for flexibility
                    let reference = reference.trim();

                    match resolve_reference(reference, variables) {
                        Some(value) => result.push_str(&value_to_text(value)),
                        None => {
                            return Err(TemplateError::UndefinedVariable {
                                name: reference.to_string(),
                                position: start_pos,
                            });
                        }
                    }
                }
            }
            '}' => {
                // Check for escape sequence }}
                if let Some((_, '}')) = chars.peek() {
                    chars.next(); // consume the second }
                    result.push('}');
                } else {
                    // Lone } is just a regular character
                    result.push('}');
                }
            }
            _ => result.push(ch),
        }
    }

    Ok(result)
}

/// Resolve a dotted reference like `value_json.items.0.name`.
///
/// The first segment names a root variable; the remainder traverses objects
/// by key and arrays by numeric index. Returns `None` for a missing root,
/// missing key, out-of-range index, or traversal into a scalar.
fn resolve_reference<'a>(reference: &str, variables: &'a TemplateVars) -> Option<&'a Value> {
    let mut segments = reference.split('.');
    let root = segments.next()?;
    let mut current = variables.get(root)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }

    Some(current)
}

/// Convert a resolved JSON value into its rendered text form.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "none".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Nested structures render as compact JSON
        other => other.to_string(),
    }
}

/// Helper to create a variable set from a list of name-value pairs.
#[cfg(test)]
pub fn vars<I, K>(pairs: I) -> TemplateVars
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    let mut out = TemplateVars::new();
    for (k, v) in pairs {
        out.insert(k, v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_substitution() {
        let vars = vars([("name", json!("Alice")), ("greeting", json!("Hello"))]);
        let result = render_template("{greeting}, {name}!", &vars).unwrap();
        assert_eq!(result, "Hello, Alice!");
    }

    #[test]
    fn test_no_variables() {
        let vars = TemplateVars::new();
        let result = render_template("Just plain text", &vars).unwrap();
        assert_eq!(result, "Just plain text");
    }

    #[test]
    fn test_empty_template() {
        let vars = TemplateVars::new();
        let result = render_template("", &vars).unwrap();
        assert_eq!(result, "");
    }

    #[test]
    fn test_escape_braces() {
        let vars = TemplateVars::new();
        let result = render_template("Use {{var}} for variables", &vars).unwrap();
        assert_eq!(result, "Use {var} for variables");
    }

    #[test]
    fn test_escape_closing_brace() {
        let vars = TemplateVars::new();
        let result = render_template("Example: a }} b", &vars).unwrap();
        assert_eq!(result, "Example: a } b");
    }

    #[test]
    fn test_mixed_escapes_and_variables() {
        let vars = vars([("x", json!("value"))]);
        let result = render_template("{{escaped}} and {x}", &vars).unwrap();
        assert_eq!(result, "{escaped} and value");
    }

    #[test]
    fn test_undefined_variable_error() {
        let vars = TemplateVars::new();
        let result = render_template("Hello {name}", &vars);
        assert!(result.is_err());

        let err = result.unwrap_err();
        match err {
            TemplateError::UndefinedVariable { name, position } => {
                assert_eq!(name, "name");
                assert_eq!(position, 6);
            }
            _ => panic!("unexpected error type: {:?}", err),
        }
    }

    #[test]
    fn test_unmatched_brace_error() {
        let vars = TemplateVars::new();
        let result = render_template("Hello {name", &vars);
        assert!(result.is_err());

        let err = result.unwrap_err();
        match err {
            TemplateError::UnmatchedBrace { position } => {
                assert_eq!(position, 6);
            }
            _ => panic!("unexpected error type: {:?}", err),
        }
    }

    #[test]
    fn test_empty_variable_name_error() {
        let vars = TemplateVars::new();
        let result = render_template("Hello {}", &vars);
        assert!(result.is_err());

        let err = result.unwrap_err();
        match err {
            TemplateError::EmptyVariableName { position } => {
                assert_eq!(position, 6);
            }
            _ => panic!("unexpected error type: {:?}", err),
        }
    }

    #[test]
    fn test_whitespace_in_reference() {
        let vars = vars([("name", json!("Alice"))]);
        // Whitespace around the reference is trimmed
        let result = render_template("Hello { name }!", &vars).unwrap();
        assert_eq!(result, "Hello Alice!");
    }

    #[test]
    fn test_multiple_occurrences() {
        let vars = vars([("x", json!("X"))]);
        let result = render_template("{x}-{x}-{x}", &vars).unwrap();
        assert_eq!(result, "X-X-X");
    }

    #[test]
    fn test_adjacent_variables() {
        let vars = vars([("a", json!("A")), ("b", json!("B"))]);
        let result = render_template("{a}{b}", &vars).unwrap();
        assert_eq!(result, "AB");
    }

    #[test]
    fn test_lone_closing_brace() {
        let vars = TemplateVars::new();
        let result = render_template("a } b", &vars).unwrap();
        assert_eq!(result, "a } b");
    }

    #[test]
    fn test_object_key_traversal() {
        let vars = vars([("value_json", json!({"cpu": {"load": 0.25}}))]);
        let result = render_template("{value_json.cpu.load}", &vars).unwrap();
        assert_eq!(result, "0.25");
    }

    #[test]
    fn test_array_index_traversal() {
        let vars = vars([("value_json", json!(["a", "b", "c"]))]);
        let result = render_template("{value_json.1}", &vars).unwrap();
        assert_eq!(result, "b");
    }

    #[test]
    fn test_mixed_traversal() {
        let vars = vars([(
            "value_json",
            json!({"disks": [{"mount": "/", "pct": 81}]}),
        )]);
        let result =
            render_template("{value_json.disks.0.mount}: {value_json.disks.0.pct}", &vars)
                .unwrap();
        assert_eq!(result, "/: 81");
    }

    #[test]
    fn test_missing_key_is_undefined_variable() {
        let vars = vars([("value_json", json!({"a": 1}))]);
        let result = render_template("{value_json.b}", &vars);

        match result.unwrap_err() {
            TemplateError::UndefinedVariable { name, .. } => {
                assert_eq!(name, "value_json.b");
            }
            other => panic!("unexpected error type: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_index_is_undefined_variable() {
        let vars = vars([("value_json", json!([1, 2]))]);
        let result = render_template("{value_json.5}", &vars);
        assert!(matches!(
            result.unwrap_err(),
            TemplateError::UndefinedVariable { .. }
        ));
    }

    #[test]
    fn test_traversal_into_scalar_is_undefined_variable() {
        let vars = vars([("value", json!("plain text"))]);
        let result = render_template("{value.field}", &vars);
        assert!(matches!(
            result.unwrap_err(),
            TemplateError::UndefinedVariable { .. }
        ));
    }

    #[test]
    fn test_whole_object_renders_as_compact_json() {
        let vars = vars([("value_json", json!({"a": 1}))]);
        let result = render_template("{value_json}", &vars).unwrap();
        assert_eq!(result, "{\"a\":1}");
    }

    #[test]
    fn test_null_renders_as_none() {
        let vars = vars([("value_json", json!({"gone": null}))]);
        let result = render_template("{value_json.gone}", &vars).unwrap();
        assert_eq!(result, "none");
    }

    #[test]
    fn test_bool_and_number_rendering() {
        let vars = vars([("value_json", json!({"ok": true, "n": 42}))]);
        let result = render_template("{value_json.ok}/{value_json.n}", &vars).unwrap();
        assert_eq!(result, "true/42");
    }

    #[test]
    fn test_multiline_values_preserved() {
        let vars = vars([("value", json!("line1\nline2\nline3"))]);
        let result = render_template("Content:\n{value}", &vars).unwrap();
        assert_eq!(result, "Content:\nline1\nline2\nline3");
    }

    #[test]
    fn test_braces_in_value() {
        let vars = vars([("code", json!("if (x > 0) { return x; }"))]);
        let result = render_template("Code: {code}", &vars).unwrap();
        assert_eq!(result, "Code: if (x > 0) { return x; }");
    }

    #[test]
    fn test_unicode_in_template_and_values() {
        let vars = vars([("emoji", json!("🎉")), ("text", json!("日本語"))]);
        let result = render_template("Hello {emoji} {text}!", &vars).unwrap();
        assert_eq!(result, "Hello 🎉 日本語!");
    }

    #[test]
    fn test_error_display() {
        let err = TemplateError::UndefinedVariable {
            name: "foo".to_string(),
            position: 10,
        };
        assert_eq!(
            err.to_string(),
            "undefined variable 'foo' at position 10 in template"
        );

        let err = TemplateError::UnmatchedBrace { position: 5 };
        assert_eq!(err.to_string(), "unmatched '{' at position 5 in template");

        let err = TemplateError::EmptyVariableName { position: 3 };
        assert_eq!(
            err.to_string(),
            "empty variable name '{}' at position 3 in template"
        );
    }

    #[test]
    fn test_empty_value_substitution() {
        let vars = vars([("empty", json!(""))]);
        let result = render_template("before{empty}after", &vars).unwrap();
        assert_eq!(result, "beforeafter");
    }
}
