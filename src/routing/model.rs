//! Route descriptor.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::routing::matcher::{RouteTemplate, TemplateError};

/// One routable page.
///
/// `path` is unique across a registered set; the router rejects duplicates.
#[derive(Debug, Clone, Serialize)]
pub struct RouteModel {
    /// Route template, e.g. `/user/[id]`.
    pub path: String,
    /// Component reference handed to the renderer.
    pub component: String,
    /// Middleware names in declaration order, without duplicates.
    pub middlewares: Vec<String>,
    /// Guard names in declaration order, without duplicates.
    pub guards: Vec<String>,
    /// Values merged into the render context as top-level keys.
    pub static_params: Map<String, Value>,
    pub layout: Option<String>,
    /// Declared parameter types (`name -> tag`).
    pub param_types: HashMap<String, String>,
    #[serde(skip)]
    template: RouteTemplate,
}

impl RouteModel {
    /// Create a route with an empty configuration.
    pub fn new(path: &str, component: impl Into<String>) -> Result<Self, TemplateError> {
        let template = RouteTemplate::parse(path)?;
        Ok(Self {
            path: template.as_str().to_string(),
            component: component.into(),
            middlewares: Vec::new(),
            guards: Vec::new(),
            static_params: Map::new(),
            layout: None,
            param_types: HashMap::new(),
            template,
        })
    }

    pub fn with_middlewares<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middlewares = ordered_set(names);
        self
    }

    pub fn with_guards<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.guards = ordered_set(names);
        self
    }

    pub fn with_layout(mut self, layout: Option<String>) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_static_params(mut self, params: Map<String, Value>) -> Self {
        self.static_params = params;
        self
    }

    pub fn with_param_types(mut self, types: HashMap<String, String>) -> Self {
        self.param_types = types;
        self
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn specificity(&self) -> i64 {
        self.template.specificity()
    }
}

fn ordered_set<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.into();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
