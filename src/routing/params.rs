//! Typed route parameters.
//!
//! # Responsibilities
//! - Validate raw parameter strings against a closed set of kinds
//! - Hold the per-template parameter type configuration
//! - Extract typed values from a concrete path (`extract_params`)
//! - Coerce values already captured by the HTTP layer (`coerce`)
//!
//! # Design Decisions
//! - Validation failure is non-fatal: the raw string is kept and a warning logged
//! - Unknown type tags pass values through unvalidated
//! - Configuration is written during discovery and read-only afterwards

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::routing::matcher::{Captured, RouteTemplate, Segment};

/// Supported parameter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    Float,
    String,
    Slug,
    Uuid,
}

impl ParamType {
    pub const ALL: [ParamType; 5] = [
        ParamType::Int,
        ParamType::Float,
        ParamType::String,
        ParamType::Slug,
        ParamType::Uuid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::String => "string",
            ParamType::Slug => "slug",
            ParamType::Uuid => "uuid",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamType {
    type Err = ();

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ParamType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(tag.trim()))
            .ok_or(())
    }
}

/// A parameter value after validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
}

/// Pattern checks for each [`ParamType`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamValidator;

impl ParamValidator {
    /// Check `value` against `kind`, converting numeric kinds.
    ///
    /// Returns `None` when the value does not fit the kind.
    pub fn validate(&self, value: &str, kind: ParamType) -> Option<ParamValue> {
        match kind {
            ParamType::Int => {
                if is_digits(value) {
                    value.parse().ok().map(ParamValue::Int)
                } else {
                    None
                }
            }
            ParamType::Float => {
                let (whole, fraction) = value.split_once('.')?;
                if is_digits(whole) && is_digits(fraction) {
                    value.parse().ok().map(ParamValue::Float)
                } else {
                    None
                }
            }
            ParamType::String => {
                let ok = !value.is_empty()
                    && value
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
                ok.then(|| ParamValue::Str(value.to_string()))
            }
            ParamType::Slug => {
                let ok = value.split('-').all(|group| {
                    !group.is_empty()
                        && group.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                });
                ok.then(|| ParamValue::Str(value.to_string()))
            }
            ParamType::Uuid => is_canonical_uuid(value).then(|| ParamValue::Str(value.to_string())),
        }
    }

    /// Validate against a free-form tag. Unknown tags accept anything.
    pub fn validate_tag(&self, value: &str, tag: &str) -> Option<ParamValue> {
        match tag.parse::<ParamType>() {
            Ok(kind) => self.validate(value, kind),
            Err(()) => Some(ParamValue::Str(value.to_string())),
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_canonical_uuid(s: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == GROUPS.len()
        && parts.iter().zip(GROUPS).all(|(part, len)| {
            part.len() == len
                && part
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        })
}

/// Summary of the parameter configuration, served by the operator API.
#[derive(Debug, Clone, Serialize)]
pub struct ParamInfo {
    pub configured_routes: usize,
    pub configurations: BTreeMap<String, BTreeMap<String, String>>,
    pub supported_types: Vec<&'static str>,
}

/// Per-route parameter types plus extraction.
#[derive(Debug, Clone, Default)]
pub struct DynamicParams {
    validator: ParamValidator,
    configs: HashMap<String, HashMap<String, String>>,
}

impl DynamicParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the parameter types declared for `template`.
    pub fn register_route_params(&mut self, template: &str, types: HashMap<String, String>) {
        if types.is_empty() {
            return;
        }
        tracing::debug!(route = %template, params = ?types, "Parameter types registered");
        self.configs.insert(template.to_string(), types);
    }

    /// Configured tag for one parameter, defaulting to `string`.
    pub fn type_of(&self, template: &str, name: &str) -> &str {
        self.configs
            .get(template)
            .and_then(|types| types.get(name))
            .map(String::as_str)
            .unwrap_or(ParamType::String.as_str())
    }

    /// Extract typed values from `actual_path` using `template`.
    ///
    /// A path that does not match the template yields an empty map.
    pub fn extract_params(&self, template: &str, actual_path: &str) -> BTreeMap<String, ParamValue> {
        let Ok(parsed) = RouteTemplate::parse(template) else {
            return BTreeMap::new();
        };
        let Some(captured) = parsed.match_path(actual_path) else {
            return BTreeMap::new();
        };

        captured
            .into_iter()
            .map(|(name, value)| {
                let typed = match value {
                    Captured::Single(raw) => self.typed(template, &name, &raw),
                    Captured::Many(parts) => ParamValue::List(
                        parts.iter().map(|raw| self.typed(template, &name, raw)).collect(),
                    ),
                };
                (name, typed)
            })
            .collect()
    }

    /// Type values the HTTP layer already captured for `template`.
    ///
    /// Catch-all parameters arrive as `a/b/c` and become lists.
    pub fn coerce(
        &self,
        template: &RouteTemplate,
        raw: &HashMap<String, String>,
    ) -> BTreeMap<String, ParamValue> {
        let key = template.as_str();
        template
            .segments()
            .iter()
            .filter_map(|segment| {
                let name = segment.param_name()?;
                let value = raw.get(name)?;
                let typed = if matches!(segment, Segment::CatchAll(_)) {
                    ParamValue::List(
                        value
                            .split('/')
                            .filter(|part| !part.is_empty())
                            .map(|part| self.typed(key, name, part))
                            .collect(),
                    )
                } else {
                    self.typed(key, name, value)
                };
                Some((name.to_string(), typed))
            })
            .collect()
    }

    fn typed(&self, template: &str, name: &str, raw: &str) -> ParamValue {
        let tag = self.type_of(template, name);
        match self.validator.validate_tag(raw, tag) {
            Some(value) => value,
            None => {
                tracing::warn!(
                    route = %template,
                    param = %name,
                    value = %raw,
                    expected = %tag,
                    "Invalid route parameter, keeping raw value"
                );
                ParamValue::Str(raw.to_string())
            }
        }
    }

    pub fn param_info(&self) -> ParamInfo {
        let configurations = self
            .configs
            .iter()
            .map(|(route, types)| {
                let types = types.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                (route.clone(), types)
            })
            .collect();
        ParamInfo {
            configured_routes: self.configs.len(),
            configurations,
            supported_types: ParamType::ALL.iter().map(ParamType::as_str).collect(),
        }
    }
}
