// Cozytouch HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction, status
// classification and JSON decoding. Session login/logout lives in
// `auth.rs`; this module stays focused on transport mechanics.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{CommandRequest, RawSetup};
use crate::remote::RemoteClient;
use crate::transport::TransportConfig;

/// Label attached to every command execution so it is recognisable in
/// the vendor's history view.
const EXECUTION_LABEL: &str = "cozytouch";

/// Body previews in error messages are capped at this many bytes.
const BODY_PREVIEW_LEN: usize = 200;

/// The cloud reports throttling with HTTP 400 and this text in the body.
const THROTTLE_MARKER: &str = "Too many requests";

/// Everything needed to build a [`CozytouchClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    pub timeout: Duration,
}

/// Vendor error body: `{"errorCode": "...", "error": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct ExecutionRequest<'a> {
    label: &'a str,
    actions: [Action<'a>; 1],
}

#[derive(Serialize)]
struct Action<'a> {
    #[serde(rename = "deviceURL")]
    device_url: &'a str,
    commands: [&'a CommandRequest; 1],
}

/// HTTP implementation of [`RemoteClient`] for the Cozytouch cloud.
///
/// Login stores a session cookie in the client's jar; every later request
/// reuses it. Requests are bounded by the configured timeout.
pub struct CozytouchClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    timeout: Duration,
}

impl CozytouchClient {
    /// Create a client with its own cookie jar and the configured timeout.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let http = TransportConfig::default()
            .with_timeout(config.timeout)
            .with_cookie_jar()
            .build_client()?;
        Ok(Self::with_client(http, config))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        Self {
            http,
            base_url: config.base_url,
            username: config.username,
            password: config.password,
            timeout: config.timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/{path}`, keeping any path prefix already on the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let resp = check_status(resp).await?;

        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(bytes = body.len(), "response body received");

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }

    async fn post_json(&self, url: Url, body: &(impl Serialize + Sync)) -> Result<(), Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        check_status(resp).await?;
        Ok(())
    }

    /// Timeouts get their own variant so callers see the configured bound.
    pub(crate) fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(e)
        }
    }
}

#[async_trait]
impl RemoteClient for CozytouchClient {
    async fn connect(&self) -> Result<(), Error> {
        self.login().await
    }

    async fn fetch_setup(&self) -> Result<RawSetup, Error> {
        let url = self.endpoint("setup")?;
        let setup: RawSetup = self.get_json(url).await?;
        debug!(
            places = setup.places.len(),
            gateways = setup.gateways.len(),
            devices = setup.devices.len(),
            "setup fetched"
        );
        Ok(setup)
    }

    async fn send_command(&self, device_id: &str, command: &CommandRequest) -> Result<(), Error> {
        let url = self.endpoint("exec/apply")?;
        let body = ExecutionRequest {
            label: EXECUTION_LABEL,
            actions: [Action {
                device_url: device_id,
                commands: [command],
            }],
        };
        debug!(device_id, command = %command.name, "sending command");
        self.post_json(url, &body).await
    }
}

// ── Status classification ────────────────────────────────────────────

/// Map a non-success response onto the error taxonomy, passing successful
/// responses through untouched.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after_secs = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.or(b.error_code))
        .unwrap_or_else(|| preview(&body).to_owned());

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited { retry_after_secs },
        _ if message.contains(THROTTLE_MARKER) => Error::RateLimited { retry_after_secs },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication { message },
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(BODY_PREVIEW_LEN);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> CozytouchClient {
        CozytouchClient::with_client(
            reqwest::Client::new(),
            ClientConfig {
                base_url: Url::parse(base).unwrap(),
                username: "user@example.com".into(),
                password: "secret".to_string().into(),
                timeout: Duration::from_secs(10),
            },
        )
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let c = client("https://ha110-1.overkiz.com/enduser-mobile-web/enduserAPI/");
        assert_eq!(
            c.endpoint("setup").unwrap().as_str(),
            "https://ha110-1.overkiz.com/enduser-mobile-web/enduserAPI/setup"
        );
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        let p = preview(&body);
        assert!(p.len() <= BODY_PREVIEW_LEN);
        assert!(body.starts_with(p));
    }
}
