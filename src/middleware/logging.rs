//! Request/response logging with per-endpoint timing.
//!
//! # Responsibilities
//! - Log each page request and its completion time
//! - Report requests slower than the configured threshold
//! - Keep a per-route performance summary for the operator API
//!
//! # Design Decisions
//! - Start times are keyed by request id in a `DashMap`, never in a plain
//!   field, since one instance serves every in-flight request
//! - Requests denied by a guard never reach the after phase; their start
//!   times are swept once the map grows past a bound
//! - Endpoint stats are keyed by route template, so `/user/1` and `/user/2`
//!   share the `/user/[id]` entry

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;

use crate::config::LoggingMiddlewareConfig;
use crate::http::request::RequestInfo;
use crate::middleware::{fragment, ContextMap, Middleware, MiddlewareError, ResponseData};

const SWEEP_THRESHOLD: usize = 1024;
const STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct EndpointStats {
    count: u64,
    total_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

impl EndpointStats {
    fn new(elapsed_ms: f64) -> Self {
        Self {
            count: 1,
            total_ms: elapsed_ms,
            min_ms: elapsed_ms,
            max_ms: elapsed_ms,
        }
    }

    fn record(&mut self, elapsed_ms: f64) {
        self.count += 1;
        self.total_ms += elapsed_ms;
        self.min_ms = self.min_ms.min(elapsed_ms);
        self.max_ms = self.max_ms.max(elapsed_ms);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EndpointReport {
    pub requests: u64,
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub total_endpoints: usize,
    pub metrics: BTreeMap<String, EndpointReport>,
}

pub struct LoggingMiddleware {
    priority: i32,
    slow_request: Duration,
    started: DashMap<String, Instant>,
    endpoints: DashMap<String, EndpointStats>,
}

impl LoggingMiddleware {
    pub fn new(config: &LoggingMiddlewareConfig) -> Self {
        Self {
            priority: config.priority,
            slow_request: Duration::from_millis(config.slow_request_ms),
            started: DashMap::new(),
            endpoints: DashMap::new(),
        }
    }

    pub fn performance_report(&self) -> PerformanceReport {
        let metrics = self
            .endpoints
            .iter()
            .map(|entry| {
                let stats = entry.value();
                let report = EndpointReport {
                    requests: stats.count,
                    avg_response_time_ms: round2(stats.total_ms / stats.count as f64),
                    min_response_time_ms: round2(stats.min_ms),
                    max_response_time_ms: round2(stats.max_ms),
                };
                (entry.key().clone(), report)
            })
            .collect::<BTreeMap<_, _>>();

        PerformanceReport {
            total_endpoints: metrics.len(),
            metrics,
        }
    }

    fn sweep_stale(&self) {
        if self.started.len() > SWEEP_THRESHOLD {
            self.started.retain(|_, started| started.elapsed() < STALE_AFTER);
        }
    }

    fn record(&self, route: &str, elapsed_ms: f64) {
        self.endpoints
            .entry(route.to_string())
            .and_modify(|stats| stats.record(elapsed_ms))
            .or_insert_with(|| EndpointStats::new(elapsed_ms));
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn before_request(
        &self,
        request: &RequestInfo,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        self.sweep_stale();
        self.started.insert(request.id.clone(), Instant::now());

        tracing::debug!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path(),
            user_agent = request.header("user-agent").unwrap_or("-"),
            "Page request"
        );

        Ok(fragment(
            "logging",
            json!({
                "request_id": request.id,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
        ))
    }

    async fn after_request(
        &self,
        request: &RequestInfo,
        response: &ResponseData,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        let elapsed = self
            .started
            .remove(&request.id)
            .map(|(_, started)| started.elapsed())
            .unwrap_or_default();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

        tracing::info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path(),
            route = %request.route_or_path(),
            status = response.status.as_u16(),
            bytes = response.html.len(),
            elapsed_ms = round2(elapsed_ms),
            "Page response"
        );
        if elapsed > self.slow_request {
            tracing::warn!(path = %request.path(), elapsed_ms = round2(elapsed_ms), "Slow request");
        }
        self.record(request.route_or_path(), elapsed_ms);

        Ok(fragment(
            "performance",
            json!({ "processing_time_ms": round2(elapsed_ms) }),
        ))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
