//! Pluggable text-templating capability.
//!
//! The core never implements a template language of its own; it hands a body
//! and a variable map to a [`Render`] implementation and writes back whatever
//! comes out. The built-in [`VarSubstituter`] covers the common case of
//! `{{dotted.path}}` placeholders; hosts may plug in a richer engine.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Render failed: {0}")]
    Failed(String),
}

/// Text-templating capability consumed by artifact creation, scaffolding and
/// step-prompt generation.
pub trait Render: Send + Sync {
    fn render(&self, body: &str, vars: &Value) -> Result<String, RenderError>;
}

/// Minimal renderer that substitutes `{{key}}` and `{{dotted.path}}`
/// placeholders from a JSON variable map. Unknown placeholders are left
/// untouched so a downstream engine can still pick them up.
#[derive(Debug, Default, Clone, Copy)]
pub struct VarSubstituter;

impl Render for VarSubstituter {
    fn render(&self, body: &str, vars: &Value) -> Result<String, RenderError> {
        let mut out = String::with_capacity(body.len());
        let mut rest = body;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = after[..end].trim();
                    match lookup(vars, key) {
                        Some(value) => out.push_str(&render_value(value)),
                        None => {
                            out.push_str(&rest[start..start + 2 + end + 2]);
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    // Unterminated placeholder: emit verbatim.
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// Walk a dotted path through nested JSON objects.
fn lookup<'a>(vars: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = vars;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitutes_simple_variables() {
        let vars = json!({"name": "payments", "count": 3});
        let out = VarSubstituter
            .render("service {{name}} has {{count}} docs", &vars)
            .unwrap();
        assert_eq!(out, "service payments has 3 docs");
    }

    #[test]
    fn test_substitutes_dotted_paths() {
        let vars = json!({"task": {"title": "Review API", "id": "t-1"}});
        let out = VarSubstituter
            .render("# {{task.title}} ({{task.id}})", &vars)
            .unwrap();
        assert_eq!(out, "# Review API (t-1)");
    }

    #[test]
    fn test_unknown_placeholders_left_intact() {
        let vars = json!({"x": "1"});
        let out = VarSubstituter.render("X={{x}} Y={{y}}", &vars).unwrap();
        assert_eq!(out, "X=1 Y={{y}}");
    }

    #[test]
    fn test_unterminated_placeholder_emitted_verbatim() {
        let vars = json!({});
        let out = VarSubstituter.render("broken {{tail", &vars).unwrap();
        assert_eq!(out, "broken {{tail");
    }

    #[test]
    fn test_null_renders_empty() {
        let vars = json!({"gone": null});
        let out = VarSubstituter.render("[{{gone}}]", &vars).unwrap();
        assert_eq!(out, "[]");
    }
}
