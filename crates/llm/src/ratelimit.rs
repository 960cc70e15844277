use std::sync::{Arc, Mutex};

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Last known quota state reported by the model host.
///
/// Limits and remaining counts stay `"Unknown"` until the host sends the
/// corresponding header; reset times stay absent. Fields present in a
/// response overwrite, absent fields keep their previous value, so stale
/// values persist across calls. This is advisory telemetry only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitSnapshot {
    pub limit_requests: String,
    pub remaining_requests: String,
    pub reset_requests: Option<String>,
    pub limit_tokens: String,
    pub remaining_tokens: String,
    pub reset_tokens: Option<String>,
}

impl Default for RateLimitSnapshot {
    fn default() -> Self {
        Self {
            limit_requests: "Unknown".to_string(),
            remaining_requests: "Unknown".to_string(),
            reset_requests: None,
            limit_tokens: "Unknown".to_string(),
            remaining_tokens: "Unknown".to_string(),
            reset_tokens: None,
        }
    }
}

impl RateLimitSnapshot {
    /// Merge `x-ratelimit-*` headers into the snapshot, keeping old values
    /// for headers the response did not carry.
    pub fn merge_headers(&mut self, headers: &HeaderMap) {
        if let Some(v) = header_value(headers, "x-ratelimit-limit-requests") {
            self.limit_requests = v;
        }
        if let Some(v) = header_value(headers, "x-ratelimit-remaining-requests") {
            self.remaining_requests = v;
        }
        if let Some(v) = header_value(headers, "x-ratelimit-reset-requests") {
            self.reset_requests = Some(v);
        }
        if let Some(v) = header_value(headers, "x-ratelimit-limit-tokens") {
            self.limit_tokens = v;
        }
        if let Some(v) = header_value(headers, "x-ratelimit-remaining-tokens") {
            self.remaining_tokens = v;
        }
        if let Some(v) = header_value(headers, "x-ratelimit-reset-tokens") {
            self.reset_tokens = Some(v);
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Explicitly owned home for the snapshot, injectable into [`crate::LlmClient`].
///
/// Updates are best-effort and never fail; concurrent writers interleave
/// last-writer-wins per field, which is acceptable for telemetry.
#[derive(Debug, Clone, Default)]
pub struct RateLimitStore {
    inner: Arc<Mutex<RateLimitSnapshot>>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_headers(&self, headers: &HeaderMap) {
        if let Ok(mut snapshot) = self.inner.lock() {
            snapshot.merge_headers(headers);
        }
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        self.inner
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

/// Wait estimate for a 429, taken from `Retry-After`, falling back to the
/// request-bucket reset header, falling back to zero.
pub(crate) fn retry_wait(headers: &HeaderMap) -> (String, u64) {
    let raw = header_value(headers, "retry-after")
        .or_else(|| header_value(headers, "x-ratelimit-reset-requests"));

    let secs = raw
        .and_then(|s| s.parse::<f64>().ok())
        .map(|f| f.max(0.0) as u64)
        .unwrap_or(0);

    (format_wait(secs), secs)
}

/// Render a duration in seconds the way a person waits for it.
pub fn format_wait(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
