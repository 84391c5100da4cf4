//! Dotted/indexed path grammar shared by response templating and diff exclusions.
//!
//! `data.items[2].id` is three segments: `data`, `items` indexed by 2, and `id`.
//! A segment with an empty key (`[0].id`) indexes the current value directly.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub key: String,
    pub index: Option<usize>,
}

impl PathSegment {
    fn parse(raw: &str) -> Self {
        if let Some(stripped) = raw.strip_suffix(']') {
            if let Some(open) = stripped.rfind('[') {
                if let Ok(index) = stripped[open + 1..].parse::<usize>() {
                    return PathSegment {
                        key: stripped[..open].to_string(),
                        index: Some(index),
                    };
                }
            }
        }
        PathSegment {
            key: raw.to_string(),
            index: None,
        }
    }
}

pub fn parse_path(path: &str) -> Vec<PathSegment> {
    path.split('.').map(PathSegment::parse).collect()
}

/// Renders a path in the diff engine's addressing, e.g. `a.b[0]` -> `root['a']['b'][0]`.
pub fn to_diff_path(path: &str) -> String {
    let mut rendered = String::from("root");
    for segment in parse_path(path.trim()) {
        if !segment.key.is_empty() {
            rendered.push_str("['");
            rendered.push_str(&segment.key);
            rendered.push_str("']");
        }
        if let Some(index) = segment.index {
            rendered.push('[');
            rendered.push_str(&index.to_string());
            rendered.push(']');
        }
    }
    rendered
}
