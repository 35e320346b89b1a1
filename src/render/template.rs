//! minijinja-backed component renderer.
//!
//! # Component format
//! ```text
//! # @middlewares: logging      ← directive block, stripped
//!
//! Html:
//! <h1>{{ params.id }}</h1>     ← template, HTML auto-escaped
//!
//! Css:
//! h1 { color: red; }           ← emitted as a <style> block
//! ```
//! A file without an `Html:` marker is a template in its entirety.
//!
//! # Design Decisions
//! - Templates are expressions only; components cannot run code
//! - Sources are read on every render so edits show up without a restart
//! - A route layout lives at `<components>/layouts/<name>.<ext>` and gets
//!   the page HTML as `content`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use minijinja::{context, Environment, Value as TemplateValue};
use serde_json::Value;

use crate::render::{RenderError, Renderer};

/// Sections of a component source.
#[derive(Debug, Default, PartialEq)]
struct ComponentSource<'a> {
    html: &'a str,
    css: Option<&'a str>,
}

fn split_sections(source: &str) -> ComponentSource<'_> {
    let body = strip_directives(source);

    let Some(html_start) = find_marker(body, "Html:") else {
        return ComponentSource {
            html: body.trim(),
            css: None,
        };
    };
    let after_html = &body[html_start..];
    match find_marker(after_html, "Css:") {
        Some(css_start) => {
            let marker_len = "Css:".len();
            let html_end = css_start - marker_len;
            ComponentSource {
                html: after_html[..html_end].trim(),
                css: Some(after_html[css_start..].trim()).filter(|css| !css.is_empty()),
            }
        }
        None => ComponentSource {
            html: after_html.trim(),
            css: None,
        },
    }
}

/// Byte offset just past a line consisting of `marker`.
fn find_marker(text: &str, marker: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim() == marker {
            let start = offset + line.find(marker).unwrap_or(0);
            return Some(start + marker.len());
        }
        offset += line.len();
    }
    None
}

/// Drop the leading block of blank and `#` lines.
fn strip_directives(source: &str) -> &str {
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            break;
        }
        offset += line.len();
    }
    &source[offset..]
}

#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    components_dir: PathBuf,
    extension: String,
}

impl TemplateRenderer {
    pub fn new(components_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            components_dir: components_dir.into(),
            extension: extension.into(),
        }
    }

    fn layout_path(&self, layout: &str) -> PathBuf {
        self.components_dir
            .join("layouts")
            .join(format!("{layout}.{}", self.extension))
    }

    async fn read(&self, path: &Path) -> Result<String, RenderError> {
        let display = path.to_string_lossy().into_owned();
        tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => RenderError::NotFound(display.clone()),
            _ => RenderError::Io {
                path: display.clone(),
                source: e,
            },
        })
    }

    fn render_page(&self, path: &str, source: &str, ctx: &Value) -> Result<String, RenderError> {
        let sections = split_sections(source);
        let html = render_template(path, sections.html, TemplateValue::from_serialize(ctx))?;
        Ok(match sections.css {
            Some(css) => format!("<style>\n{css}\n</style>\n{html}"),
            None => html,
        })
    }
}

fn render_template(path: &str, source: &str, ctx: TemplateValue) -> Result<String, RenderError> {
    let template_err = |source| RenderError::Template {
        path: path.to_string(),
        source,
    };

    let mut env = Environment::new();
    // The `.html` suffix switches on HTML auto-escaping.
    env.add_template("component.html", source).map_err(template_err)?;
    env.get_template("component.html")
        .and_then(|tmpl| tmpl.render(ctx))
        .map_err(template_err)
}

#[async_trait]
impl Renderer for TemplateRenderer {
    async fn render(&self, component: &str, context: &Value) -> Result<String, RenderError> {
        let source = self.read(Path::new(component)).await?;
        let page = self.render_page(component, &source, context)?;

        let layout = context
            .get("route")
            .and_then(|route| route.get("layout"))
            .and_then(Value::as_str);
        let Some(layout) = layout else {
            return Ok(page);
        };

        let layout_path = self.layout_path(layout);
        let layout_source = self.read(&layout_path).await?;
        let sections = split_sections(&layout_source);
        let ctx = context! {
            content => TemplateValue::from_safe_string(page),
            ..TemplateValue::from_serialize(context)
        };
        render_template(&layout_path.to_string_lossy(), sections.html, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_sections() {
        let source = "# @guards: a\n\nHtml:\n<p>{{ x }}</p>\n\nCss:\np { margin: 0 }\n";
        let sections = split_sections(source);
        assert_eq!(sections.html, "<p>{{ x }}</p>");
        assert_eq!(sections.css, Some("p { margin: 0 }"));
    }

    #[test]
    fn test_plain_template_without_markers() {
        let sections = split_sections("# @layout: main\n<h1>Hi</h1>\n");
        assert_eq!(sections.html, "<h1>Hi</h1>");
        assert_eq!(sections.css, None);
    }

    #[tokio::test]
    async fn test_render_escapes_values() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page.tg");
        std::fs::write(&page, "Html:\n<p>{{ params.name }}</p>\n").unwrap();

        let renderer = TemplateRenderer::new(dir.path(), "tg");
        let html = renderer
            .render(
                &page.to_string_lossy(),
                &json!({ "params": { "name": "<b>" } }),
            )
            .await
            .unwrap();
        assert_eq!(html, "<p>&lt;b&gt;</p>");
    }

    #[tokio::test]
    async fn test_layout_wraps_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("layouts")).unwrap();
        std::fs::write(
            dir.path().join("layouts/main.tg"),
            "<main title=\"{{ title }}\">{{ content }}</main>",
        )
        .unwrap();
        let page = dir.path().join("page.tg");
        std::fs::write(&page, "<p>hello</p>").unwrap();

        let renderer = TemplateRenderer::new(dir.path(), "tg");
        let html = renderer
            .render(
                &page.to_string_lossy(),
                &json!({ "title": "Home", "route": { "layout": "main" } }),
            )
            .await
            .unwrap();
        assert_eq!(html, "<main title=\"Home\"><p>hello</p></main>");
    }

    #[tokio::test]
    async fn test_missing_component() {
        let renderer = TemplateRenderer::new("components", "tg");
        let err = renderer
            .render("does/not/exist.tg", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_template_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("bad.tg");
        std::fs::write(&page, "{{ unclosed").unwrap();

        let err = TemplateRenderer::new(dir.path(), "tg")
            .render(&page.to_string_lossy(), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Template { .. }));
    }
}
