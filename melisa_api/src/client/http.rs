//! Authenticated HTTP access to the Discord REST API.
//!
//! Every request goes through the [`RateLimiter`] and is retried on 429 and
//! server errors until its ttl runs out.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use reqwest::{
    multipart::{Form, Part},
    Client, ClientBuilder, Method, RequestBuilder,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::client::ratelimiter::RateLimiter;
use crate::error::{handle_api_error, MelisaError};
use crate::types::{
    error_types::{ApiError, RateLimitedBody},
    file::File,
};
use crate::util::build_url;

pub const API_VERSION: u8 = 9;
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v9";
pub const DEFAULT_MAX_TTL: u32 = 5;

fn user_agent() -> String {
    format!(
        "DiscordBot (https://github.com/MelisaDev/melisa, {})",
        env!("CARGO_PKG_VERSION")
    )
}

/// What to send with a request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// `payload_json` plus `files[n]` parts.
    Multipart { payload: Value, files: Vec<File> },
}

impl RequestBody {
    pub fn json<T: Serialize>(body: &T) -> Result<Self, MelisaError> {
        Ok(Self::Json(serde_json::to_value(body)?))
    }
}

/// Low level REST client. Use [`RestApp`](crate::client::RestApp) for typed endpoints.
#[derive(Clone)]
pub struct HttpClient {
    /* ───────────────────────── Public configuration ───────────────────────── */
    pub base_url: String,
    /// Attempts per request, counting the first.
    pub max_ttl: u32,

    /* ───────────────────────── Internal plumbing ──────────────────────────── */
    pub http: Client,
    pub ratelimiter: RateLimiter,
    token: String,
}

impl Debug for HttpClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("max_ttl", &self.max_ttl)
            .field("http", &"reqwest::Client")
            .field("ratelimiter", &self.ratelimiter)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HttpClient {
    pub fn new(token: &str) -> Result<Self, MelisaError> {
        Self::with_base_url(token, DEFAULT_API_BASE)
    }

    /// Point the client at another API root, e.g. a local mock server.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, MelisaError> {
        let http = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .use_rustls_tls()
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_ttl: DEFAULT_MAX_TTL,
            http,
            ratelimiter: RateLimiter::new(),
            token: token.to_string(),
        })
    }

    pub fn with_max_ttl(mut self, max_ttl: u32) -> Self {
        self.max_ttl = max_ttl.max(1);
        self
    }

    /* ─────────────────────────── Runtime helpers ─────────────────────────── */

    /// Build an authenticated `reqwest::RequestBuilder`.
    fn authed_request(
        &self,
        method: Method,
        url: &str,
        body: &RequestBody,
        reason: Option<&str>,
    ) -> Result<RequestBuilder, MelisaError> {
        let mut req = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bot {}", self.token))
            .header("User-Agent", user_agent());

        if let Some(reason) = reason {
            req = req.header("X-Audit-Log-Reason", reason);
        }

        req = match body {
            RequestBody::Empty => req,
            RequestBody::Json(value) => req.json(value),
            RequestBody::Multipart { payload, files } => {
                let mut form = Form::new().text("payload_json", serde_json::to_string(payload)?);
                for (i, file) in files.iter().enumerate() {
                    let part = Part::bytes(file.data.clone()).file_name(file.filename.clone());
                    form = form.part(format!("files[{i}]"), part);
                }
                req.multipart(form)
            }
        };

        Ok(req)
    }

    /// Send a request, retrying until it succeeds or its ttl is spent.
    ///
    /// `route` is the path below the API root, with any query string; the
    /// query is not part of the rate limit key. Returns `None` for empty bodies.
    pub async fn request(
        &self,
        method: Method,
        route: &str,
        body: RequestBody,
        reason: Option<&str>,
    ) -> Result<Option<Value>, MelisaError> {
        let url = build_url(&self.base_url, &[route]);
        let bucket_route = route.split('?').next().unwrap_or(route);
        let mut ttl = self.max_ttl;

        loop {
            if ttl == 0 {
                return Err(MelisaError::Server(format!(
                    "Maximum amount of retries for `{route}`."
                )));
            }

            self.ratelimiter
                .wait_until_not_ratelimited(bucket_route, &method)
                .await;

            trace!(%method, route, "sending request");
            let resp = self
                .authed_request(method.clone(), &url, &body, reason)?
                .send()
                .await?;

            self.ratelimiter
                .save_response_bucket(bucket_route, &method, resp.headers())
                .await;

            let status = resp.status().as_u16();
            let bytes = resp.bytes().await?;

            if (200..300).contains(&status) {
                debug!(%method, route, status, "request succeeded");
                if bytes.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(serde_json::from_slice(&bytes)?));
            }

            if status == 429 {
                let limited = serde_json::from_slice::<RateLimitedBody>(&bytes)
                    .unwrap_or_else(|_| RateLimitedBody {
                        retry_after: 40.0,
                        global: false,
                        message: String::new(),
                    });
                let retry_after = retry_after_duration(limited.retry_after);
                warn!(route, ?retry_after, global = limited.global, "rate limited");
                if limited.global {
                    self.ratelimiter.set_global(retry_after).await;
                }
                sleep(retry_after).await;
                continue;
            }

            if let Some(err) = handle_api_error(status, ApiError::from_body(&bytes)) {
                return Err(err);
            }

            if ttl <= 1 {
                warn!(%method, route, status, "request failed, out of retries");
                return Err(MelisaError::Server(format!(
                    "Maximum amount of retries for `{route}`."
                )));
            }

            let wait = Duration::from_secs(1 + u64::from(self.max_ttl - ttl) * 2);
            warn!(
                %method,
                route,
                status,
                ?wait,
                "request failed, retrying"
            );
            sleep(wait).await;
            ttl -= 1;
        }
    }

    /// Single attempt with no retry; 429 is returned as an error.
    pub async fn send_once(
        &self,
        method: Method,
        route: &str,
        body: RequestBody,
        reason: Option<&str>,
    ) -> Result<Option<Value>, MelisaError> {
        let url = build_url(&self.base_url, &[route]);
        let resp = self.authed_request(method, &url, &body, reason)?.send().await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;

        match status {
            200..=299 if bytes.is_empty() => Ok(None),
            200..=299 => Ok(Some(serde_json::from_slice(&bytes)?)),
            429 => {
                let retry_after = serde_json::from_slice::<RateLimitedBody>(&bytes)
                    .map(|b| b.retry_after)
                    .unwrap_or(40.0);
                Err(MelisaError::RateLimited {
                    route: route.to_string(),
                    retry_after,
                })
            }
            _ => Err(handle_api_error(status, ApiError::from_body(&bytes)).unwrap_or_else(
                || MelisaError::Server(format!("{status}: {}", String::from_utf8_lossy(&bytes))),
            )),
        }
    }

    /* ───────────── Convenience wrappers around HTTP verbs ───────────── */

    pub async fn get(&self, route: &str) -> Result<Option<Value>, MelisaError> {
        self.request(Method::GET, route, RequestBody::Empty, None)
            .await
    }

    pub async fn post(
        &self,
        route: &str,
        body: RequestBody,
        reason: Option<&str>,
    ) -> Result<Option<Value>, MelisaError> {
        self.request(Method::POST, route, body, reason).await
    }

    pub async fn put(
        &self,
        route: &str,
        body: RequestBody,
        reason: Option<&str>,
    ) -> Result<Option<Value>, MelisaError> {
        self.request(Method::PUT, route, body, reason).await
    }

    pub async fn patch(
        &self,
        route: &str,
        body: RequestBody,
        reason: Option<&str>,
    ) -> Result<Option<Value>, MelisaError> {
        self.request(Method::PATCH, route, body, reason).await
    }

    pub async fn delete(&self, route: &str, reason: Option<&str>) -> Result<Option<Value>, MelisaError> {
        self.request(Method::DELETE, route, RequestBody::Empty, reason)
            .await
    }

    /// Send and deserialize the body into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        body: RequestBody,
        reason: Option<&str>,
    ) -> Result<T, MelisaError> {
        let value = self.request(method, route, body, reason).await?;
        parse_json(value)
    }
}

/// Sleep for a 429 `retry_after`. Values a `Duration` cannot hold fall back to 40 s.
fn retry_after_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::from_secs(40))
}

/// Deserialize a response body, treating an empty body as JSON `null`.
pub fn parse_json<T: DeserializeOwned>(value: Option<Value>) -> Result<T, MelisaError> {
    serde_json::from_value(value.unwrap_or(Value::Null)).map_err(MelisaError::Serde)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_token() {
        let client = HttpClient::new("super-secret").unwrap();
        let text = format!("{client:?}");
        assert!(!text.contains("super-secret"));
        assert!(text.contains("https://discord.com/api/v9"));
    }

    #[test]
    fn user_agent_names_library() {
        assert!(user_agent().starts_with("DiscordBot (https://github.com/MelisaDev/melisa, "));
    }

    #[test]
    fn retry_after_is_clamped() {
        assert_eq!(retry_after_duration(0.25), Duration::from_millis(250));
        assert_eq!(retry_after_duration(-3.0), Duration::ZERO);
        assert_eq!(retry_after_duration(1e30), Duration::from_secs(40));
    }
}
