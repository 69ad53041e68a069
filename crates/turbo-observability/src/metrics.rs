//! Per-navigation timing metrics.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// How a navigation obtained its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    /// The load routine ran during this navigation.
    Invoked,
    /// The page has no load routine.
    NoRoutine,
    /// Props came from the embedded server payload.
    Hydrated,
    /// The outcome came from a prefetch.
    Prefetched,
}

/// Metrics for a single navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationMetrics {
    /// Navigation id for correlation.
    pub navigation_id: String,
    /// Route path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// How the outcome was obtained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<LoadSource>,
    /// Load routine duration (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_duration_us: Option<u64>,
    /// Outcome kind: "props", "error" or "redirect".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    /// Status code for error and redirect outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Size of the embedded payload in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_bytes: Option<usize>,
    /// Number of redirects followed.
    pub redirects: u32,
    /// Whether the navigation was superseded before dispatch.
    pub superseded: bool,
    /// Total navigation duration (microseconds).
    pub total_duration_us: u64,
}

/// Collector for navigation metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    navigation_id: String,
    route: Option<String>,
    start: Instant,
    source: Option<LoadSource>,
    load_duration: Option<Duration>,
    outcome: Option<String>,
    status_code: Option<u16>,
    payload_bytes: Option<usize>,
    redirects: u32,
    superseded: bool,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new(navigation_id: impl std::fmt::Display) -> Self {
        Self {
            navigation_id: navigation_id.to_string(),
            route: None,
            start: Instant::now(),
            source: None,
            load_duration: None,
            outcome: None,
            status_code: None,
            payload_bytes: None,
            redirects: 0,
            superseded: false,
        }
    }

    /// Set route path.
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// Record how the outcome was obtained and how long loading took.
    pub fn record_load(&mut self, source: LoadSource, duration: Duration) {
        self.source = Some(source);
        self.load_duration = Some(duration);
    }

    /// Record the normalized outcome.
    pub fn record_outcome(&mut self, kind: &str, status_code: Option<u16>) {
        self.outcome = Some(kind.to_string());
        self.status_code = status_code;
    }

    /// Record the embedded payload size.
    pub fn record_payload(&mut self, bytes: usize) {
        self.payload_bytes = Some(bytes);
    }

    /// Record a followed redirect.
    pub fn record_redirect(&mut self) {
        self.redirects += 1;
    }

    /// Record that the navigation was superseded.
    pub fn record_superseded(&mut self) {
        self.superseded = true;
    }

    /// Get total elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Finalize and return the metrics.
    pub fn finalize(self) -> NavigationMetrics {
        NavigationMetrics {
            navigation_id: self.navigation_id,
            route: self.route,
            source: self.source,
            load_duration_us: self.load_duration.map(|d| d.as_micros() as u64),
            outcome: self.outcome,
            status_code: self.status_code,
            payload_bytes: self.payload_bytes,
            redirects: self.redirects,
            superseded: self.superseded,
            total_duration_us: self.start.elapsed().as_micros() as u64,
        }
    }
}

impl NavigationMetrics {
    /// Format as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Format as human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = vec![format!("Navigation: {}", self.navigation_id)];

        if let Some(route) = &self.route {
            lines.push(format!("  Route: {}", route));
        }
        if let Some(load) = self.load_duration_us {
            lines.push(format!("  Load: {}us ({:.2}ms)", load, load as f64 / 1000.0));
        }
        match (&self.outcome, self.status_code) {
            (Some(outcome), Some(status)) => lines.push(format!("  Outcome: {} [{}]", outcome, status)),
            (Some(outcome), None) => lines.push(format!("  Outcome: {}", outcome)),
            _ => {}
        }
        if let Some(bytes) = self.payload_bytes {
            lines.push(format!("  Payload: {} bytes", bytes));
        }
        if self.redirects > 0 {
            lines.push(format!("  Redirects: {}", self.redirects));
        }
        if self.superseded {
            lines.push("  Superseded".to_string());
        }

        lines.join("\n")
    }
}
