//! Response assertions applied to the root step of a monitor chain.

use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use super::json_diff::{Change, JsonDiff, display_value, type_name};
use super::json_path::to_diff_path;
use crate::db::enums::AssertionType;
use crate::db::models::Monitor;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    #[error("text assertion failed, expected `{expected}` but found `{actual}`")]
    TextMismatch { expected: String, actual: String },
    #[error("failed to decode JSON api response")]
    InvalidResponseJson,
    #[error("failed to decode JSON monitor assertion value")]
    InvalidExpectationJson,
    /// One line per reported diff category.
    #[error("{0}")]
    JsonMismatch(String),
}

/// What to assert and how, borrowed from a monitor definition.
#[derive(Debug, Clone, Copy)]
pub struct Assertion<'a> {
    pub kind: AssertionType,
    pub expected: &'a str,
    pub schema_only: bool,
    pub excluded_keys: &'a [String],
}

impl<'a> Assertion<'a> {
    pub fn for_monitor(monitor: &'a Monitor, excluded_keys: &'a [String]) -> Self {
        Self {
            kind: monitor.assertion_type,
            expected: &monitor.assertion_value,
            schema_only: monitor.is_assertion_json_schema_only,
            excluded_keys,
        }
    }

    pub fn check(&self, actual: &str) -> Result<(), AssertionError> {
        match self.kind {
            AssertionType::Disabled => Ok(()),
            AssertionType::Text => {
                if actual == self.expected {
                    Ok(())
                } else {
                    Err(AssertionError::TextMismatch {
                        expected: self.expected.to_string(),
                        actual: actual.to_string(),
                    })
                }
            }
            AssertionType::Json => self.check_json(actual),
        }
    }

    fn check_json(&self, actual: &str) -> Result<(), AssertionError> {
        let observed: Value =
            serde_json::from_str(actual).map_err(|_| AssertionError::InvalidResponseJson)?;
        let baseline: Value = serde_json::from_str(self.expected)
            .map_err(|_| AssertionError::InvalidExpectationJson)?;

        let excluded: HashSet<String> = self
            .excluded_keys
            .iter()
            .map(|key| to_diff_path(key))
            .collect();
        let diff = JsonDiff::compute(&baseline, &observed, &excluded);

        let report = self.report(&diff);
        if report.is_empty() {
            Ok(())
        } else {
            Err(AssertionError::JsonMismatch(report.join("\n")))
        }
    }

    fn report(&self, diff: &JsonDiff) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.schema_only {
            lines.extend(diff.type_changes.iter().map(type_change_line));
            lines.extend(diff.values_changed.iter().map(value_change_line));
        }
        let key_lists = [
            ("new key detected with keys", &diff.dictionary_item_added),
            ("missing key detected with keys", &diff.dictionary_item_removed),
            ("iterable item added with keys", &diff.iterable_item_added),
            ("iterable item removed with keys", &diff.iterable_item_removed),
        ];
        for (label, paths) in key_lists {
            if !paths.is_empty() {
                lines.push(format!("{label} `{}`", paths.join(", ")));
            }
        }
        lines
    }
}

fn type_change_line(change: &Change) -> String {
    format!(
        "different type on `{}`, expected `{}` (`{}`) but found `{}` (`{}`)",
        change.path,
        display_value(&change.old_value),
        type_name(&change.old_value),
        display_value(&change.new_value),
        type_name(&change.new_value),
    )
}

fn value_change_line(change: &Change) -> String {
    format!(
        "different value on `{}`, expected `{}` but found `{}`",
        change.path,
        display_value(&change.old_value),
        display_value(&change.new_value),
    )
}
