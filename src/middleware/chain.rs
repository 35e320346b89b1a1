//! Priority-ordered middleware registry.
//!
//! # Responsibilities
//! - Keep middleware in ascending priority order (stable for ties)
//! - Run the before phase forwards and the after phase backwards
//! - Absorb errors, panics and deadline overruns per middleware
//! - Enable and disable middleware at runtime
//!
//! # Design Decisions
//! - Registration happens before serving; the chain is read-only afterwards
//!   apart from the enabled flags, which are atomics
//! - The route selects *which* middleware run; the registry decides *when*

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::http::request::RequestInfo;
use crate::middleware::{ContextMap, Middleware, MiddlewareError, ResponseData};
use crate::observability::metrics;
use crate::resilience::timeouts::{isolate, Isolated};

struct Entry {
    middleware: Arc<dyn Middleware>,
    priority: i32,
    enabled: AtomicBool,
}

/// Registry entry as reported by the operator API.
#[derive(Debug, Clone, Serialize)]
pub struct MiddlewareDescriptor {
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MiddlewareInfo {
    pub total: usize,
    pub execution_order: Vec<String>,
    pub middlewares: Vec<MiddlewareDescriptor>,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Before,
    After,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }
}

/// Ordered set of middleware.
#[derive(Default)]
pub struct MiddlewareChain {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `middleware` at `priority` (lower runs earlier).
    ///
    /// Inserted before the first entry with a strictly greater priority, so
    /// equal priorities keep registration order. Registering a name again
    /// replaces the previous entry.
    pub fn register(&mut self, middleware: Arc<dyn Middleware>, priority: i32) {
        let name = middleware.name().to_string();
        if self.entries.contains_key(&name) {
            self.order.retain(|n| n != &name);
            tracing::warn!(middleware = %name, "Replacing registered middleware");
        }

        let position = self
            .order
            .iter()
            .position(|n| self.entries[n].priority > priority)
            .unwrap_or(self.order.len());
        self.order.insert(position, name.clone());
        self.entries.insert(
            name.clone(),
            Entry {
                middleware,
                priority,
                enabled: AtomicBool::new(true),
            },
        );

        tracing::info!(middleware = %name, priority, "Middleware registered");
    }

    /// Register at the middleware's own default priority.
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) {
        let priority = middleware.priority();
        self.register(middleware, priority);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names in execution order.
    pub fn execution_order(&self) -> &[String] {
        &self.order
    }

    /// Returns `false` if no middleware has that name.
    pub fn enable(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Returns `false` if no middleware has that name.
    pub fn disable(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.entries.get(name) {
            Some(entry) => {
                entry.enabled.store(enabled, Ordering::Relaxed);
                tracing::info!(middleware = %name, enabled, "Middleware toggled");
                true
            }
            None => false,
        }
    }

    /// Before phase for the `selected` subset, in ascending priority.
    pub async fn run_before(&self, request: &RequestInfo, selected: &[String]) -> ContextMap {
        let mut context = ContextMap::new();
        for entry in self.selected(selected) {
            let result = isolate(request.deadline, entry.middleware.before_request(request)).await;
            merge(&mut context, entry, Phase::Before, result);
        }
        context
    }

    /// After phase for the `selected` subset, in descending priority.
    pub async fn run_after(
        &self,
        request: &RequestInfo,
        response: &ResponseData,
        selected: &[String],
    ) -> ContextMap {
        let mut context = ContextMap::new();
        let entries: Vec<&Entry> = self.selected(selected).collect();
        for entry in entries.into_iter().rev() {
            let result = isolate(
                request.deadline,
                entry.middleware.after_request(request, response),
            )
            .await;
            merge(&mut context, entry, Phase::After, result);
        }
        context
    }

    fn selected<'a>(&'a self, selected: &'a [String]) -> impl Iterator<Item = &'a Entry> + 'a {
        self.order
            .iter()
            .filter(move |name| selected.iter().any(|s| s == *name))
            .filter_map(|name| self.entries.get(name))
            .filter(|entry| entry.enabled.load(Ordering::Relaxed))
    }

    pub fn middleware_info(&self) -> MiddlewareInfo {
        MiddlewareInfo {
            total: self.entries.len(),
            execution_order: self.order.clone(),
            middlewares: self
                .order
                .iter()
                .filter_map(|name| {
                    let entry = self.entries.get(name)?;
                    Some(MiddlewareDescriptor {
                        name: name.clone(),
                        priority: entry.priority,
                        enabled: entry.enabled.load(Ordering::Relaxed),
                    })
                })
                .collect(),
        }
    }
}

fn merge(
    context: &mut ContextMap,
    entry: &Entry,
    phase: Phase,
    result: Isolated<Result<Option<ContextMap>, MiddlewareError>>,
) {
    let error = match result {
        Isolated::Completed(Ok(Some(fragment))) => {
            context.extend(fragment);
            return;
        }
        Isolated::Completed(Ok(None)) => return,
        Isolated::Completed(Err(e)) => e,
        Isolated::TimedOut => MiddlewareError::DeadlineExceeded,
        Isolated::Panicked(msg) => MiddlewareError::Panicked(msg),
    };

    let name = entry.middleware.name();
    tracing::warn!(middleware = %name, phase = phase.as_str(), error = %error, "Middleware failed, continuing");
    metrics::record_middleware_failure(name, phase.as_str());
}
