use thiserror::Error;

use crate::types::error_types::ApiError;

/// Error returned by a listener. Anything that implements `std::error::Error`
/// can be propagated out of an [`EventHandler`](crate::EventHandler) with `?`.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A unified error type for this library.
#[derive(Debug, Error)]
pub enum MelisaError {
    /// HTTP request failed (network or protocol issue).
    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Serde (de)serialization error.
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Transport level WebSocket failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /* ─────────────────────────── HTTP statuses ─────────────────────────── */
    #[error("Not modified")]
    NotModified,

    #[error("Bad request: {0}")]
    BadRequest(ApiError),

    #[error("Unauthorized: {0}")]
    Unauthorized(ApiError),

    #[error("Forbidden: {0}")]
    Forbidden(ApiError),

    #[error("Not found: {0}")]
    NotFound(ApiError),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(ApiError),

    /// Only surfaced by single-shot requests; the retrying path sleeps instead.
    #[error("Rate limited on `{route}`, retry after {retry_after}s")]
    RateLimited { route: String, retry_after: f64 },

    #[error("Server error: {0}")]
    Server(String),

    /* ─────────────────────────── Gateway closes ────────────────────────── */
    #[error("Token is not valid")]
    LoginFailure,

    #[error("Invalid shard was sent to the gateway")]
    InvalidShard,

    #[error("Sharding is required for this bot")]
    ShardingRequired,

    #[error("Invalid gateway API version")]
    InvalidApiVersion,

    #[error("Invalid intents were provided")]
    InvalidIntents,

    #[error(
        "Shard {shard_id} requested privileged intents that are not enabled in the developer portal"
    )]
    PrivilegedIntentsRequired { shard_id: u32 },

    #[error("Shard {shard_id} connection closed with code {code}: {reason}")]
    ConnectionClosed {
        shard_id: u32,
        code: u16,
        reason: String,
    },

    /* ─────────────────────────── Local failures ────────────────────────── */
    #[error("Timed out waiting for `{0}`")]
    Timeout(String),

    #[error("Embed error: {0}")]
    EmbedField(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Invalid snowflake: {0}")]
    InvalidSnowflake(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("REST client not attached to this model")]
    ClientNotAttached,

    #[error("Other error: {0}")]
    Other(String),
}

impl MelisaError {
    /// Map a gateway close code to its error, or `None` when the code is
    /// recoverable by reconnecting.
    pub fn from_close_code(shard_id: u32, code: u16) -> Option<Self> {
        match code {
            4004 => Some(Self::LoginFailure),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidApiVersion),
            4013 => Some(Self::InvalidIntents),
            4014 => Some(Self::PrivilegedIntentsRequired { shard_id }),
            _ => None,
        }
    }

    /// Whether this error means the shard must not be restarted.
    pub fn is_fatal_gateway_error(&self) -> bool {
        matches!(
            self,
            Self::LoginFailure
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::PrivilegedIntentsRequired { .. }
        )
    }
}

/// Convert a non-success status and its parsed body into a `MelisaError`.
///
/// Returns `None` for statuses that the HTTP client retries (429 and 5xx).
pub fn handle_api_error(status: u16, err: ApiError) -> Option<MelisaError> {
    match status {
        304 => Some(MelisaError::NotModified),
        400 => Some(MelisaError::BadRequest(err)),
        401 => Some(MelisaError::Unauthorized(err)),
        403 => Some(MelisaError::Forbidden(err)),
        404 => Some(MelisaError::NotFound(err)),
        405 => Some(MelisaError::MethodNotAllowed(err)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_close_codes() {
        assert!(matches!(
            MelisaError::from_close_code(0, 4004),
            Some(MelisaError::LoginFailure)
        ));
        assert!(matches!(
            MelisaError::from_close_code(3, 4014),
            Some(MelisaError::PrivilegedIntentsRequired { shard_id: 3 })
        ));
        assert!(MelisaError::from_close_code(0, 4009).is_none());
        assert!(MelisaError::from_close_code(0, 1000).is_none());
    }

    #[test]
    fn status_mapping() {
        let body = ApiError::from_text("nope");
        assert!(matches!(
            handle_api_error(403, body.clone()),
            Some(MelisaError::Forbidden(_))
        ));
        assert!(handle_api_error(429, body.clone()).is_none());
        assert!(handle_api_error(502, body).is_none());
    }
}
