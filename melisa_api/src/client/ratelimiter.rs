//! Per-route rate limit buckets, driven by Discord's `X-RateLimit-*` headers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header::HeaderMap, Method};
use tokio::{
    sync::Mutex,
    time::{sleep_until, Instant},
};
use tracing::{debug, warn};

/// Snapshot of one bucket as reported by the last response that hit it.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitBucket {
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the bucket resets.
    pub reset: f64,
    /// Seconds from `since` until the bucket resets.
    pub reset_after: f64,
    pub since: Instant,
}

impl RateLimitBucket {
    /// Read the bucket headers. `None` when any of them is missing.
    pub fn from_headers(headers: &HeaderMap, since: Instant) -> Option<Self> {
        Some(Self {
            limit: header(headers, "X-RateLimit-Limit")?,
            remaining: header(headers, "X-RateLimit-Remaining")?,
            reset: header(headers, "X-RateLimit-Reset")?,
            reset_after: header(headers, "X-RateLimit-Reset-After")?,
            since,
        })
    }

    /// When the bucket may be used again, or `None` if it has requests left.
    pub fn blocked_until(&self) -> Option<Instant> {
        if self.remaining > 0 {
            return None;
        }
        let release = self.since + Duration::from_secs_f64(self.reset_after.max(0.0));
        (release > Instant::now()).then_some(release)
    }
}

fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

type RouteKey = (String, Method);

#[derive(Debug, Default)]
struct RateLimiterState {
    /// `(route, method)` to bucket id from `X-RateLimit-Bucket`.
    bucket_map: HashMap<RouteKey, String>,
    buckets: HashMap<String, RateLimitBucket>,
    global_until: Option<Instant>,
}

/// Shared by every request of an [`HttpClient`](crate::client::HttpClient).
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    state: Arc<Mutex<RateLimiterState>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the bucket headers of a response. Responses without a
    /// `X-RateLimit-Bucket` header are ignored.
    pub async fn save_response_bucket(&self, route: &str, method: &Method, headers: &HeaderMap) {
        let Some(bucket_id) = header::<String>(headers, "X-RateLimit-Bucket") else {
            return;
        };
        let Some(bucket) = RateLimitBucket::from_headers(headers, Instant::now()) else {
            debug!(route, bucket_id, "incomplete rate limit headers");
            return;
        };

        let mut state = self.state.lock().await;
        state
            .bucket_map
            .insert((route.to_string(), method.clone()), bucket_id.clone());
        state.buckets.insert(bucket_id, bucket);
    }

    /// Block every route until `retry_after` has passed.
    pub async fn set_global(&self, retry_after: Duration) {
        let until = Instant::now() + retry_after;
        warn!(?retry_after, "hit the global rate limit");
        let mut state = self.state.lock().await;
        state.global_until = Some(state.global_until.map_or(until, |u| u.max(until)));
    }

    /// Sleep while the global limit or the route's bucket is exhausted.
    pub async fn wait_until_not_ratelimited(&self, route: &str, method: &Method) {
        let release = {
            let state = self.state.lock().await;
            let global = state.global_until.filter(|u| *u > Instant::now());
            let bucket = state
                .bucket_map
                .get(&(route.to_string(), method.clone()))
                .and_then(|id| state.buckets.get(id))
                .and_then(RateLimitBucket::blocked_until);
            global.max(bucket)
        };

        if let Some(release) = release {
            debug!(
                route,
                %method,
                wait = ?release.saturating_duration_since(Instant::now()),
                "waiting for rate limit bucket"
            );
            sleep_until(release).await;
        }
    }

    pub async fn bucket_for(&self, route: &str, method: &Method) -> Option<RateLimitBucket> {
        let state = self.state.lock().await;
        state
            .bucket_map
            .get(&(route.to_string(), method.clone()))
            .and_then(|id| state.buckets.get(id))
            .cloned()
    }
}
