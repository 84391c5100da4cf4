//! `{{path}}` substitution against the previous step's JSON response.

use serde_json::Value;
use thiserror::Error;

use super::json_path::{PathSegment, parse_path};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("path {path} not found in previous step response")]
    PathNotFound { path: String },
}

/// Replaces every `{{path}}` in `text` with the value found at `path` in `context`.
///
/// Without a context document (or with a JSON `null` one) the text is returned
/// untouched. Placeholders are resolved left to right and substituted values
/// are never re-scanned.
pub fn resolve_template(text: &str, context: Option<&Value>) -> Result<String, TemplateError> {
    let Some(document) = context.filter(|doc| !doc.is_null()) else {
        return Ok(text.to_string());
    };

    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        output.push_str(&rest[..start]);
        let path = after_open[..end].trim();
        let value = lookup(document, path)?;
        output.push_str(&stringify(value));
        rest = &after_open[end + CLOSE.len()..];
    }
    output.push_str(rest);
    Ok(output)
}

/// Finds the value at `path` inside `document`.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Result<&'a Value, TemplateError> {
    let segments = parse_path(path);
    descend(document, &segments, path)
}

fn descend<'a>(
    current: &'a Value,
    segments: &[PathSegment],
    full_path: &str,
) -> Result<&'a Value, TemplateError> {
    let Some((segment, remaining)) = segments.split_first() else {
        return Ok(current);
    };
    let not_found = || TemplateError::PathNotFound {
        path: full_path.to_string(),
    };

    let mut value = current;
    if !segment.key.is_empty() || segment.index.is_none() {
        value = value
            .as_object()
            .ok_or_else(not_found)?
            .get(&segment.key)
            .ok_or_else(not_found)?;
    }
    if let Some(index) = segment.index {
        value = value
            .as_array()
            .ok_or_else(not_found)?
            .get(index)
            .ok_or_else(not_found)?;
    }
    descend(value, remaining, full_path)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
