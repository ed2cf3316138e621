use thiserror::Error;

/// Top-level error type for the `cozytouch-api` crate.
///
/// Every failure the remote API can produce lands in one of these variants.
/// `cozytouch-core` classifies them into auth, throttle and network failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected or session no longer valid.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Throttling ──────────────────────────────────────────────────
    /// The cloud API refused the request because of rate limiting.
    #[error("Rate limited{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success status not covered by a more specific variant.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Credentials rejected or session expired.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// The server asked us to slow down.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs.map_or_else(String::new, |s| format!(" -- retry after {s}s"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let auth = Error::Authentication {
            message: "bad password".into(),
        };
        assert!(auth.is_auth());
        assert!(!auth.is_transient());

        let throttled = Error::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(throttled.is_throttled());
        assert!(throttled.is_transient());
        assert_eq!(throttled.to_string(), "Rate limited -- retry after 30s");

        let server = Error::Api {
            status: 503,
            message: "maintenance".into(),
        };
        assert!(server.is_transient());
        assert!(
            !Error::Api {
                status: 400,
                message: String::new()
            }
            .is_transient()
        );
    }
}
