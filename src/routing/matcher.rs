//! Route template tokenization and matching.
//!
//! # Responsibilities
//! - Split a route template (`/user/[id]`) into typed segments
//! - Match a concrete request path against the segments
//! - Compute the specificity score used to order routes
//! - Translate the template into Axum's path syntax
//!
//! # Design Decisions
//! - Tokens occupy whole segments; `post-[id]` is rejected, not half-matched
//! - No regex: matching is a single left-to-right walk over segments
//! - Catch-all captures one or more trailing segments as a list
//! - Optional segments match zero or one segment

use std::fmt;

use thiserror::Error;

/// Score added to templates that contain a catch-all segment.
pub const CATCH_ALL_PENALTY: i64 = 200;
/// Score added to templates that contain dynamic (non catch-all) segments.
pub const DYNAMIC_PENALTY: i64 = 100;
/// Score removed per path separator.
pub const DEPTH_BONUS: i64 = 10;

/// A single `/`-separated piece of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, matched byte for byte.
    Literal(String),
    /// `[name]`: exactly one non-empty segment.
    Dynamic(String),
    /// `[[name]]`: zero or one segment.
    Optional(String),
    /// `[...name]`: one or more trailing segments.
    CatchAll(String),
}

impl Segment {
    /// Parameter name carried by this segment, if any.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Segment::Literal(_) => None,
            Segment::Dynamic(name) | Segment::Optional(name) | Segment::CatchAll(name) => {
                Some(name)
            }
        }
    }
}

/// Errors produced while tokenizing a route template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("empty parameter name in segment `{0}`")]
    EmptyParamName(String),

    #[error("unbalanced brackets in segment `{0}`")]
    Unbalanced(String),

    #[error("segment `{0}` mixes literal text with a parameter")]
    MixedSegment(String),

    #[error("catch-all `{0}` must be the last segment")]
    CatchAllNotLast(String),

    #[error("parameter `{0}` appears more than once")]
    DuplicateParam(String),

    #[error("segment `{0}` contains one of `{{`, `}}` or `*`")]
    ReservedCharacter(String),
}

/// Value captured for one template parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captured {
    Single(String),
    Many(Vec<String>),
}

/// A tokenized route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Tokenize a template such as `/blog/[slug]` or `/docs/[...path]`.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        let pieces: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
        for (index, piece) in pieces.iter().enumerate() {
            let segment = parse_segment(piece)?;

            if let Segment::CatchAll(name) = &segment {
                if index + 1 != pieces.len() {
                    return Err(TemplateError::CatchAllNotLast(name.clone()));
                }
            }
            if let Some(name) = segment.param_name() {
                if seen.iter().any(|n| n == name) {
                    return Err(TemplateError::DuplicateParam(name.to_string()));
                }
                seen.push(name.to_string());
            }
            segments.push(segment);
        }

        let raw = if segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", pieces.join("/"))
        };

        Ok(Self { raw, segments })
    }

    /// The normalized template text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names in left-to-right order.
    pub fn param_names(&self) -> Vec<&str> {
        self.segments.iter().filter_map(Segment::param_name).collect()
    }

    pub fn has_catch_all(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::CatchAll(_)))
    }

    pub fn is_dynamic(&self) -> bool {
        self.segments.iter().any(|s| !matches!(s, Segment::Literal(_)))
    }

    /// Leading literal segments, e.g. `/blog` for `/blog/[slug]/edit`.
    pub fn literal_prefix(&self) -> String {
        let literals: Vec<&str> = self
            .segments
            .iter()
            .map_while(|s| match s {
                Segment::Literal(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        format!("/{}", literals.join("/"))
    }

    /// Number of `/` separators in the normalized template.
    fn separator_count(&self) -> i64 {
        self.segments.len().max(1) as i64
    }

    /// Characters outside bracket tokens, separators included.
    pub fn literal_chars(&self) -> i64 {
        let literal: usize = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.chars().count(),
                _ => 0,
            })
            .sum();
        self.separator_count() + literal as i64
    }

    /// Match priority. Lower scores are registered, and therefore matched, first.
    pub fn specificity(&self) -> i64 {
        let mut score = 0;
        if self.has_catch_all() {
            score += CATCH_ALL_PENALTY;
        } else if self.is_dynamic() {
            score += DYNAMIC_PENALTY;
        }
        score -= self.separator_count() * DEPTH_BONUS;
        score -= self.literal_chars();
        score
    }

    /// Match a concrete path. The whole path must be consumed.
    ///
    /// Returns the captured `(name, value)` pairs in template order, or `None`
    /// when the path does not fit the template.
    pub fn match_path(&self, path: &str) -> Option<Vec<(String, Captured)>> {
        let rest = path.strip_prefix('/').unwrap_or(path);
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };
        let mut captured = Vec::new();
        if match_from(&self.segments, &parts, &mut captured) {
            Some(captured)
        } else {
            None
        }
    }

    /// Axum-syntax paths for this template. Optional segments expand to two variants.
    pub fn axum_paths(&self) -> Vec<String> {
        let mut variants: Vec<Vec<String>> = vec![Vec::new()];
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    variants.iter_mut().for_each(|v| v.push(text.clone()));
                }
                Segment::Dynamic(name) => {
                    variants.iter_mut().for_each(|v| v.push(format!("{{{name}}}")));
                }
                Segment::CatchAll(name) => {
                    variants.iter_mut().for_each(|v| v.push(format!("{{*{name}}}")));
                }
                Segment::Optional(name) => {
                    let mut with = variants.clone();
                    with.iter_mut().for_each(|v| v.push(format!("{{{name}}}")));
                    variants.extend(with);
                }
            }
        }
        variants.into_iter().map(|parts| format!("/{}", parts.join("/"))).collect()
    }

    /// Shape keys with parameter names erased, one per Axum path.
    ///
    /// Two templates sharing a shape would be ambiguous for the HTTP layer.
    pub fn shapes(&self) -> Vec<String> {
        self.axum_paths().iter().map(|p| shape_of(p)).collect()
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Erase parameter names from an Axum-style path.
pub fn shape_of(axum_path: &str) -> String {
    axum_path
        .split('/')
        .map(|part| {
            if part.starts_with("{*") {
                "{*}"
            } else if part.starts_with('{') {
                "{}"
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Characters Axum reads as path syntax.
const AXUM_SYNTAX: [char; 3] = ['{', '}', '*'];

fn parse_segment(piece: &str) -> Result<Segment, TemplateError> {
    if piece.contains(AXUM_SYNTAX) {
        return Err(TemplateError::ReservedCharacter(piece.to_string()));
    }
    let has_open = piece.contains('[');
    let has_close = piece.contains(']');
    if !has_open && !has_close {
        return Ok(Segment::Literal(piece.to_string()));
    }
    if !(piece.starts_with('[') && piece.ends_with(']')) {
        if has_open && has_close {
            return Err(TemplateError::MixedSegment(piece.to_string()));
        }
        return Err(TemplateError::Unbalanced(piece.to_string()));
    }

    let (inner, optional) = match piece.strip_prefix("[[").and_then(|p| p.strip_suffix("]]")) {
        Some(inner) => (inner, true),
        None => (&piece[1..piece.len() - 1], false),
    };
    if inner.contains('[') || inner.contains(']') {
        return Err(TemplateError::Unbalanced(piece.to_string()));
    }

    match inner.strip_prefix("...") {
        Some(name) => {
            if name.is_empty() {
                return Err(TemplateError::EmptyParamName(piece.to_string()));
            }
            Ok(Segment::CatchAll(name.to_string()))
        }
        None if inner.is_empty() => Err(TemplateError::EmptyParamName(piece.to_string())),
        None if optional => Ok(Segment::Optional(inner.to_string())),
        None => Ok(Segment::Dynamic(inner.to_string())),
    }
}

fn match_from(segments: &[Segment], parts: &[&str], captured: &mut Vec<(String, Captured)>) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return parts.is_empty();
    };

    match segment {
        Segment::Literal(text) => match parts.split_first() {
            Some((part, tail)) if *part == text.as_str() => match_from(rest, tail, captured),
            _ => false,
        },
        Segment::Dynamic(name) => match parts.split_first() {
            Some((part, tail)) if !part.is_empty() => {
                captured.push((name.clone(), Captured::Single(part.to_string())));
                if match_from(rest, tail, captured) {
                    true
                } else {
                    captured.pop();
                    false
                }
            }
            _ => false,
        },
        Segment::Optional(name) => {
            if let Some((part, tail)) = parts.split_first() {
                if !part.is_empty() {
                    captured.push((name.clone(), Captured::Single(part.to_string())));
                    if match_from(rest, tail, captured) {
                        return true;
                    }
                    captured.pop();
                }
            }
            match_from(rest, parts, captured)
        }
        Segment::CatchAll(name) => {
            if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
                return false;
            }
            let values = parts.iter().map(|p| p.to_string()).collect();
            captured.push((name.clone(), Captured::Many(values)));
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed_template() {
        let template = RouteTemplate::parse("/blog/[slug]/[[page]]/[...rest]").unwrap();
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal("blog".into()),
                Segment::Dynamic("slug".into()),
                Segment::Optional("page".into()),
                Segment::CatchAll("rest".into()),
            ]
        );
        assert_eq!(template.param_names(), vec!["slug", "page", "rest"]);
    }

    #[test]
    fn test_root_template() {
        let template = RouteTemplate::parse("/").unwrap();
        assert!(template.segments().is_empty());
        assert_eq!(template.as_str(), "/");
        assert_eq!(template.axum_paths(), vec!["/".to_string()]);
        assert!(template.match_path("/").is_some());
        assert!(template.match_path("/x").is_none());
    }

    #[test]
    fn test_rejects_malformed_segments() {
        assert_eq!(
            RouteTemplate::parse("/post-[id]"),
            Err(TemplateError::MixedSegment("post-[id]".into()))
        );
        assert_eq!(
            RouteTemplate::parse("/[id"),
            Err(TemplateError::Unbalanced("[id".into()))
        );
        assert_eq!(
            RouteTemplate::parse("/[]"),
            Err(TemplateError::EmptyParamName("[]".into()))
        );
        assert_eq!(
            RouteTemplate::parse("/[...all]/edit"),
            Err(TemplateError::CatchAllNotLast("all".into()))
        );
        assert_eq!(
            RouteTemplate::parse("/[id]/[id]"),
            Err(TemplateError::DuplicateParam("id".into()))
        );
    }

    #[test]
    fn test_rejects_axum_syntax_in_segments() {
        assert_eq!(
            RouteTemplate::parse("/files/{*rest}"),
            Err(TemplateError::ReservedCharacter("{*rest}".into()))
        );
        assert_eq!(
            RouteTemplate::parse("/user/{id}"),
            Err(TemplateError::ReservedCharacter("{id}".into()))
        );
        assert_eq!(
            RouteTemplate::parse("/glob*"),
            Err(TemplateError::ReservedCharacter("glob*".into()))
        );
        assert_eq!(
            RouteTemplate::parse("/[{id}]"),
            Err(TemplateError::ReservedCharacter("[{id}]".into()))
        );
    }

    #[test]
    fn test_dynamic_match_is_anchored() {
        let template = RouteTemplate::parse("/user/[id]").unwrap();
        let captured = template.match_path("/user/42").unwrap();
        assert_eq!(captured, vec![("id".to_string(), Captured::Single("42".into()))]);

        assert!(template.match_path("/user").is_none());
        assert!(template.match_path("/user/").is_none());
        assert!(template.match_path("/user/42/").is_none());
        assert!(template.match_path("/user/42/extra").is_none());
        assert!(template.match_path("/users/42").is_none());
    }

    #[test]
    fn test_catch_all_captures_segments() {
        let template = RouteTemplate::parse("/docs/[...path]").unwrap();
        let captured = template.match_path("/docs/guide/intro").unwrap();
        assert_eq!(
            captured,
            vec![(
                "path".to_string(),
                Captured::Many(vec!["guide".into(), "intro".into()])
            )]
        );
        assert!(template.match_path("/docs").is_none());
    }

    #[test]
    fn test_optional_segment() {
        let template = RouteTemplate::parse("/archive/[[year]]").unwrap();
        assert!(template.match_path("/archive").unwrap().is_empty());
        assert_eq!(
            template.match_path("/archive/2024").unwrap(),
            vec![("year".to_string(), Captured::Single("2024".into()))]
        );
        assert_eq!(
            template.axum_paths(),
            vec!["/archive".to_string(), "/archive/{year}".to_string()]
        );
    }

    #[test]
    fn test_literal_prefix() {
        let prefix = |t: &str| RouteTemplate::parse(t).unwrap().literal_prefix();
        assert_eq!(prefix("/blog/[slug]/edit"), "/blog");
        assert_eq!(prefix("/a/b/[[page]]"), "/a/b");
        assert_eq!(prefix("/[...rest]"), "/");
        assert_eq!(prefix("/about"), "/about");
    }

    #[test]
    fn test_axum_paths() {
        let template = RouteTemplate::parse("/user/[id]/files/[...path]").unwrap();
        assert_eq!(template.axum_paths(), vec!["/user/{id}/files/{*path}".to_string()]);
        assert_eq!(template.shapes(), vec!["/user/{}/files/{*}".to_string()]);
    }

    #[test]
    fn test_static_scores_below_dynamic() {
        let settings = RouteTemplate::parse("/user/settings").unwrap();
        let by_id = RouteTemplate::parse("/user/[id]").unwrap();
        assert_eq!(settings.specificity(), -34);
        assert_eq!(by_id.specificity(), 74);
        assert!(settings.specificity() < by_id.specificity());
    }

    #[test]
    fn test_shallow_catch_all_sorts_after_deep_static() {
        let catch_all = RouteTemplate::parse("/[...slug]").unwrap();
        let deep = RouteTemplate::parse("/a/b/c").unwrap();
        assert!(deep.specificity() < catch_all.specificity());
    }
}
