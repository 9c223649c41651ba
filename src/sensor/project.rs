//! Value and attribute projector.
//!
//! Applies the template engine to the value template and each attribute
//! template. Failures are isolated: a failing value template yields no value
//! (the reconciler decides the fallback), and a failing attribute template
//! nulls only that attribute while the rest still render.

use crate::template::{TemplateVars, render_template};
use std::collections::BTreeMap;
use tracing::error;

/// Result of rendering one tick's templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// The rendered primary value. `None` when the value template failed.
    pub value: Option<String>,

    /// Whether the value came from a value template, as opposed to echoing
    /// the raw output text. Sentinel suppression applies only to templated
    /// values.
    pub value_from_template: bool,

    /// The value-template failure message, when rendering failed.
    pub value_error: Option<String>,

    /// Rendered attributes, in template order. A failed attribute is
    /// present with a null value.
    pub attributes: BTreeMap<String, Option<String>>,

    /// Per-attribute failure messages, keyed by attribute name.
    pub attribute_errors: BTreeMap<String, String>,
}

/// Render the value template and every attribute template against one
/// tick's variables.
///
/// With no value template, the value is the raw trimmed text (`value`)
/// verbatim. Each template is evaluated exactly once: 1 + N renders for N
/// attributes.
pub fn project(
    variables: &TemplateVars,
    value_template: Option<&str>,
    attribute_templates: &BTreeMap<String, String>,
) -> Projection {
    let mut projection = Projection::default();

    match value_template {
        Some(template) => {
            projection.value_from_template = true;
            match render_template(template, variables) {
                Ok(rendered) => projection.value = Some(rendered),
                Err(e) => {
                    error!("value template failed to render: {}", e);
                    projection.value_error = Some(e.to_string());
                }
            }
        }
        None => {
            // Raw trimmed stdout text, verbatim. The interpreter guarantees
            // the variable is always present and always a string.
            let raw = variables
                .get("value")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            projection.value = Some(raw.to_string());
        }
    }

    for (attr_name, attr_template) in attribute_templates {
        match render_template(attr_template, variables) {
            Ok(rendered) => {
                projection.attributes.insert(attr_name.clone(), Some(rendered));
            }
            Err(e) => {
                error!(attribute = %attr_name, "attribute template failed to render: {}", e);
                projection.attributes.insert(attr_name.clone(), None);
                projection
                    .attribute_errors
                    .insert(attr_name.clone(), e.to_string());
            }
        }
    }

    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::interpret::interpret;

    fn templates<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_value_template_echoes_raw_text() {
        let vars = interpret(b"  multi\nline output \n");
        let projection = project(&vars, None, &BTreeMap::new());

        assert_eq!(projection.value.as_deref(), Some("multi\nline output"));
        assert!(!projection.value_from_template);
        assert!(projection.value_error.is_none());
        assert!(projection.attributes.is_empty());
    }

    #[test]
    fn test_value_template_renders_from_json() {
        let vars = interpret(b"{\"temp\": 21.5}");
        let projection = project(&vars, Some("{value_json.temp}"), &BTreeMap::new());

        assert_eq!(projection.value.as_deref(), Some("21.5"));
        assert!(projection.value_from_template);
        assert!(projection.value_error.is_none());
    }

    #[test]
    fn test_value_template_failure_yields_no_value() {
        let vars = interpret(b"not json");
        let projection = project(&vars, Some("{value_json.temp}"), &BTreeMap::new());

        assert!(projection.value.is_none());
        let err = projection.value_error.expect("value error");
        assert!(err.contains("undefined variable"));
    }

    #[test]
    fn test_attribute_failure_is_isolated() {
        let vars = interpret(b"{\"a\": 1}");
        let templates = templates([("good", "{value_json.a}"), ("bad", "{missing_var}")]);
        let projection = project(&vars, None, &templates);

        assert_eq!(
            projection.attributes.get("good"),
            Some(&Some("1".to_string()))
        );
        assert_eq!(projection.attributes.get("bad"), Some(&None));
        assert!(projection.attribute_errors.contains_key("bad"));
        assert!(!projection.attribute_errors.contains_key("good"));
        // The tick itself still produced a value.
        assert_eq!(projection.value.as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_all_attributes_render_independently() {
        let vars = interpret(b"{\"x\": \"one\", \"y\": \"two\"}");
        let templates = templates([("x", "{value_json.x}"), ("y", "{value_json.y}")]);
        let projection = project(&vars, None, &templates);

        assert_eq!(projection.attributes.len(), 2);
        assert_eq!(projection.attributes["x"], Some("one".to_string()));
        assert_eq!(projection.attributes["y"], Some("two".to_string()));
        assert!(projection.attribute_errors.is_empty());
    }

    #[test]
    fn test_value_failure_does_not_stop_attributes() {
        let vars = interpret(b"plain");
        let templates = templates([("echo", "{value}")]);
        let projection = project(&vars, Some("{value_json}"), &templates);

        assert!(projection.value.is_none());
        assert!(projection.value_error.is_some());
        assert_eq!(projection.attributes["echo"], Some("plain".to_string()));
    }

    #[test]
    fn test_empty_output_with_no_template() {
        let vars = interpret(b"");
        let projection = project(&vars, None, &BTreeMap::new());
        assert_eq!(projection.value.as_deref(), Some(""));
    }
}
