//! Structural comparison of two JSON documents.
//!
//! Paths are reported as `root['key'][0]`. Lists are compared position by
//! position; surplus positions are reported as added or removed items.

use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub path: String,
    pub old_value: Value,
    pub new_value: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonDiff {
    pub type_changes: Vec<Change>,
    pub values_changed: Vec<Change>,
    pub dictionary_item_added: Vec<String>,
    pub dictionary_item_removed: Vec<String>,
    pub iterable_item_added: Vec<String>,
    pub iterable_item_removed: Vec<String>,
}

impl JsonDiff {
    /// Diffs `observed` against `baseline`, skipping every path in `excluded`
    /// together with everything below it.
    pub fn compute(baseline: &Value, observed: &Value, excluded: &HashSet<String>) -> Self {
        let mut diff = JsonDiff::default();
        diff.walk("root".to_string(), baseline, observed, excluded);
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.type_changes.is_empty()
            && self.values_changed.is_empty()
            && self.dictionary_item_added.is_empty()
            && self.dictionary_item_removed.is_empty()
            && self.iterable_item_added.is_empty()
            && self.iterable_item_removed.is_empty()
    }

    fn walk(&mut self, path: String, old: &Value, new: &Value, excluded: &HashSet<String>) {
        if excluded.contains(&path) {
            return;
        }
        match (old, new) {
            (Value::Object(old_map), Value::Object(new_map)) => {
                for (key, old_child) in old_map {
                    let child_path = format!("{path}['{key}']");
                    match new_map.get(key) {
                        Some(new_child) => self.walk(child_path, old_child, new_child, excluded),
                        None if !excluded.contains(&child_path) => {
                            self.dictionary_item_removed.push(child_path)
                        }
                        None => {}
                    }
                }
                for key in new_map.keys().filter(|k| !old_map.contains_key(*k)) {
                    let child_path = format!("{path}['{key}']");
                    if !excluded.contains(&child_path) {
                        self.dictionary_item_added.push(child_path);
                    }
                }
            }
            (Value::Array(old_items), Value::Array(new_items)) => {
                let common = old_items.len().min(new_items.len());
                for i in 0..common {
                    self.walk(format!("{path}[{i}]"), &old_items[i], &new_items[i], excluded);
                }
                for i in common..new_items.len() {
                    let child_path = format!("{path}[{i}]");
                    if !excluded.contains(&child_path) {
                        self.iterable_item_added.push(child_path);
                    }
                }
                for i in common..old_items.len() {
                    let child_path = format!("{path}[{i}]");
                    if !excluded.contains(&child_path) {
                        self.iterable_item_removed.push(child_path);
                    }
                }
            }
            _ if type_name(old) == type_name(new) => {
                if !scalar_eq(old, new) {
                    self.values_changed.push(Change {
                        path,
                        old_value: old.clone(),
                        new_value: new.clone(),
                    });
                }
            }
            _ => self.type_changes.push(Change {
                path,
                old_value: old.clone(),
                new_value: new.clone(),
            }),
        }
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strings are shown bare, everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn scalar_eq(old: &Value, new: &Value) -> bool {
    match (old, new) {
        (Value::Number(a), Value::Number(b)) if a.is_f64() || b.is_f64() => a.as_f64() == b.as_f64(),
        _ => old == new,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_exclusions() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn identical_documents_have_no_diff() {
        let doc = json!({"a": [1, {"b": null}], "c": "d"});
        assert!(JsonDiff::compute(&doc, &doc, &no_exclusions()).is_empty());
    }

    #[test]
    fn detects_value_and_type_changes() {
        let diff = JsonDiff::compute(
            &json!({"key": "value2", "count": 1}),
            &json!({"key": "value", "count": "1"}),
            &no_exclusions(),
        );
        assert_eq!(diff.values_changed.len(), 1);
        assert_eq!(diff.values_changed[0].path, "root['key']");
        assert_eq!(diff.type_changes.len(), 1);
        assert_eq!(diff.type_changes[0].path, "root['count']");
    }

    #[test]
    fn detects_added_and_removed_keys() {
        let diff = JsonDiff::compute(
            &json!({"kept": 1, "gone": 2}),
            &json!({"kept": 1, "fresh": 3}),
            &no_exclusions(),
        );
        assert_eq!(diff.dictionary_item_added, vec!["root['fresh']"]);
        assert_eq!(diff.dictionary_item_removed, vec!["root['gone']"]);
    }

    #[test]
    fn detects_list_growth_and_shrinkage() {
        let grown = JsonDiff::compute(&json!({"l": [1]}), &json!({"l": [1, 2, 3]}), &no_exclusions());
        assert_eq!(grown.iterable_item_added, vec!["root['l'][1]", "root['l'][2]"]);

        let shrunk = JsonDiff::compute(&json!([1, 2]), &json!([1]), &no_exclusions());
        assert_eq!(shrunk.iterable_item_removed, vec!["root[1]"]);
    }

    #[test]
    fn integer_and_float_with_same_value_are_equal() {
        assert!(JsonDiff::compute(&json!({"n": 1}), &json!({"n": 1.0}), &no_exclusions()).is_empty());
    }

    #[test]
    fn exclusions_cover_the_path_and_its_children() {
        let excluded: HashSet<String> = ["root['meta']".to_string(), "root['id']".to_string()].into();
        let diff = JsonDiff::compute(
            &json!({"id": 1, "meta": {"ts": 1, "host": "a"}}),
            &json!({"meta": {"ts": 2}, "extra": true}),
            &excluded,
        );
        assert!(diff.values_changed.is_empty());
        assert!(diff.dictionary_item_removed.is_empty());
        assert_eq!(diff.dictionary_item_added, vec!["root['extra']"]);
    }
}
