//! Route directives read from the top of a page file.
//!
//! ```text
//! # @middlewares: logging, auth
//! # @guards: authenticated
//! # @layout: main
//! # @params: id:int
//! # @static: title=Profile, section=users
//! ```
//!
//! Only the leading comment block is scanned. Keys are case-insensitive and
//! the first occurrence of a key wins. Anything that does not parse is
//! ignored and the directive keeps its empty default.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Configuration declared by one page file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDirectives {
    pub middlewares: Vec<String>,
    pub guards: Vec<String>,
    pub layout: Option<String>,
    pub param_types: HashMap<String, String>,
    pub static_params: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Middlewares,
    Guards,
    Layout,
    Params,
    Static,
}

impl Key {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "middleware" | "middlewares" => Some(Key::Middlewares),
            "guard" | "guards" => Some(Key::Guards),
            "layout" => Some(Key::Layout),
            "param" | "params" => Some(Key::Params),
            "static" => Some(Key::Static),
            _ => None,
        }
    }
}

/// Parse the directive block of a page file.
pub fn parse_directives(content: &str) -> RouteDirectives {
    let mut directives = RouteDirectives::default();
    let mut seen: Vec<Key> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(comment) = line.strip_prefix('#') else {
            break;
        };
        let Some((key, value)) = split_directive(comment) else {
            continue;
        };
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        match key {
            Key::Middlewares => directives.middlewares = parse_list(value),
            Key::Guards => directives.guards = parse_list(value),
            Key::Layout => {
                let layout = value.trim();
                directives.layout = (!layout.is_empty()).then(|| layout.to_string());
            }
            Key::Params => directives.param_types = parse_pairs(value, ':').into_iter().collect(),
            Key::Static => {
                directives.static_params = parse_pairs(value, '=')
                    .into_iter()
                    .map(|(k, v)| {
                        let parsed = serde_json::from_str::<Value>(&v)
                            .ok()
                            .filter(|json| !json.is_object() && !json.is_array())
                            .unwrap_or(Value::String(v));
                        (k, parsed)
                    })
                    .collect();
            }
        }
    }

    directives
}

fn split_directive(comment: &str) -> Option<(Key, &str)> {
    let rest = comment.trim_start().strip_prefix('@')?;
    let (key, value) = rest.split_once(':')?;
    match Key::parse(key) {
        Some(key) => Some((key, value)),
        None => {
            tracing::debug!(directive = %key.trim(), "Ignoring unknown route directive");
            None
        }
    }
}

/// Comma-separated names, trimmed, duplicates dropped. A lone `none` is empty.
fn parse_list(value: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    if items.len() == 1 && items[0].eq_ignore_ascii_case("none") {
        items.clear();
    }
    items
}

fn parse_pairs(value: &str, separator: char) -> Vec<(String, String)> {
    value
        .split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once(separator)?;
            let (k, v) = (k.trim(), v.trim());
            if k.is_empty() || v.is_empty() {
                tracing::debug!(entry = %pair.trim(), "Ignoring malformed directive entry");
                return None;
            }
            Some((k.to_string(), v.to_string()))
        })
        .collect()
}
