//! Configuration for the Cozytouch tools.
//!
//! Settings are layered: built-in defaults, then the TOML file, then
//! `COZYTOUCH_*` environment variables. The result is validated and
//! translated into `cozytouch_api::ClientConfig` and
//! `cozytouch_core::IntegrationConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use cozytouch_api::ClientConfig;
use cozytouch_core::{ActuatorFilter, CoordinatorConfig, IntegrationConfig};

pub const DEFAULT_BASE_URL: &str = "https://ha110-1.overkiz.com/enduser-mobile-web/enduserAPI";
pub const ENV_PREFIX: &str = "COZYTOUCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured")]
    NoCredentials { what: &'static str },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// Everything read from `config.toml` and the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Account e-mail.
    pub username: Option<String>,

    /// Account password (plaintext; prefer `password_env`).
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    pub password_env: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Cap for the throttle backoff. Unset keeps a fixed poll interval.
    #[serde(default)]
    pub max_backoff_secs: Option<u64>,

    /// Which heaters get an on/off switch: "all", "pass" or "i2g".
    #[serde(default)]
    pub actuator: ActuatorFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            password_env: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            max_backoff_secs: None,
            actuator: ActuatorFilter::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_poll_interval_secs() -> u64 {
    60
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "cozytouch", "cozytouch").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("cozytouch");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load settings from `path` (or the default location) and the
/// environment. A missing file is not an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX));

    Ok(figment.extract()?)
}

// ── Validation and translation ──────────────────────────────────────

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.as_deref().is_none_or(|u| u.trim().is_empty()) {
            return Err(ConfigError::NoCredentials { what: "username" });
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be greater than zero"));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", "must be greater than zero"));
        }
        if self.max_backoff_secs == Some(0) {
            return Err(invalid("max_backoff_secs", "must be greater than zero"));
        }
        self.url()?;
        Ok(())
    }

    fn url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| invalid("base_url", format!("{e}: {}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("base_url", "scheme must be http or https"));
        }
        Ok(url)
    }

    /// Resolve the password: `password_env` first, then the plaintext
    /// value.
    pub fn resolve_password(&self) -> Result<SecretString, ConfigError> {
        self.resolve_password_with(|name| std::env::var(name).ok())
    }

    fn resolve_password_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<SecretString, ConfigError> {
        if let Some(value) = self.password_env.as_deref().and_then(&lookup) {
            return Ok(SecretString::from(value));
        }
        if let Some(ref pw) = self.password {
            return Ok(SecretString::from(pw.clone()));
        }
        Err(ConfigError::NoCredentials { what: "password" })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validated HTTP client settings.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        self.validate()?;
        Ok(ClientConfig {
            base_url: self.url()?,
            username: self.username.clone().unwrap_or_default(),
            password: self.resolve_password()?,
            timeout: self.timeout(),
        })
    }

    /// A refresh is `connect` plus `fetch_setup`, so it may take two
    /// request timeouts.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            refresh_timeout: self.timeout() * 2,
            max_backoff: self.max_backoff_secs.map(Duration::from_secs),
        }
    }

    pub fn integration_config(&self) -> IntegrationConfig {
        IntegrationConfig {
            coordinator: self.coordinator_config(),
            actuator: self.actuator,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn settings() -> Settings {
        Settings {
            username: Some("user@example.com".into()),
            password: Some("hunter2".into()),
            ..Settings::default()
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_settings(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(loaded.base_url, DEFAULT_BASE_URL);
        assert_eq!(loaded.timeout_secs, 10);
        assert_eq!(loaded.poll_interval_secs, 60);
        assert_eq!(loaded.actuator, ActuatorFilter::All);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
username = "user@example.com"
password_env = "COZY_TEST_PASSWORD"
poll_interval_secs = 120
actuator = "pass"
"#
        )
        .unwrap();

        let loaded = load_settings(Some(file.path())).unwrap();
        assert_eq!(loaded.username.as_deref(), Some("user@example.com"));
        assert_eq!(loaded.password_env.as_deref(), Some("COZY_TEST_PASSWORD"));
        assert_eq!(loaded.poll_interval_secs, 120);
        assert_eq!(loaded.timeout_secs, 10);
        assert_eq!(loaded.actuator, ActuatorFilter::Pass);
    }

    #[test]
    fn unknown_actuator_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"actuator = "everything""#).unwrap();
        assert!(matches!(
            load_settings(Some(file.path())),
            Err(ConfigError::Figment(_))
        ));
    }

    #[test]
    fn validation_errors() {
        let no_user = Settings {
            username: None,
            ..settings()
        };
        assert!(matches!(
            no_user.validate(),
            Err(ConfigError::NoCredentials { what: "username" })
        ));

        let zero_poll = Settings {
            poll_interval_secs: 0,
            ..settings()
        };
        assert!(
            matches!(zero_poll.validate(), Err(ConfigError::Validation { field, .. }) if field == "poll_interval_secs")
        );

        let bad_url = Settings {
            base_url: "ftp://example.com".into(),
            ..settings()
        };
        assert!(bad_url.validate().is_err());
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn password_env_wins_over_plaintext() {
        let s = Settings {
            password_env: Some("COZY_PW".into()),
            ..settings()
        };
        let from_env = s
            .resolve_password_with(|name| (name == "COZY_PW").then(|| "from-env".into()))
            .unwrap();
        assert_eq!(from_env.expose_secret(), "from-env");

        let fallback = s.resolve_password_with(|_| None).unwrap();
        assert_eq!(fallback.expose_secret(), "hunter2");

        let none = Settings {
            password: None,
            ..s
        };
        assert!(matches!(
            none.resolve_password_with(|_| None),
            Err(ConfigError::NoCredentials { what: "password" })
        ));
    }

    #[test]
    fn translation_to_runtime_configs() {
        let s = Settings {
            timeout_secs: 5,
            max_backoff_secs: Some(600),
            actuator: ActuatorFilter::I2g,
            ..settings()
        };
        let client = s.client_config().unwrap();
        assert_eq!(client.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(client.timeout, Duration::from_secs(5));

        let integration = s.integration_config();
        assert_eq!(integration.coordinator.refresh_timeout, Duration::from_secs(10));
        assert_eq!(
            integration.coordinator.max_backoff,
            Some(Duration::from_secs(600))
        );
        assert_eq!(integration.actuator, ActuatorFilter::I2g);
    }
}
