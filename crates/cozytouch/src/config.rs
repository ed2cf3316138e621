//! Settings resolution for the CLI: config file and environment, then
//! command-line overrides.

use std::sync::Arc;

use cozytouch_api::{CozytouchClient, RemoteClient};
use cozytouch_config::{Settings, load_settings};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load settings and apply flag overrides.
pub fn resolve_settings(global: &GlobalOpts) -> Result<Settings, CliError> {
    let mut settings = load_settings(global.config.as_deref())?;

    if let Some(ref username) = global.username {
        settings.username = Some(username.clone());
    }
    if let Some(ref password) = global.password {
        settings.password = Some(password.clone());
        settings.password_env = None;
    }
    if let Some(ref base_url) = global.base_url {
        settings.base_url.clone_from(base_url);
    }
    if let Some(timeout) = global.timeout {
        settings.timeout_secs = timeout;
    }

    settings.validate()?;
    Ok(settings)
}

/// Build the HTTP client for `settings`.
pub fn build_client(settings: &Settings) -> Result<Arc<dyn RemoteClient>, CliError> {
    let client = CozytouchClient::new(settings.client_config()?)?;
    tracing::debug!(base_url = %client.base_url(), "client configured");
    Ok(Arc::new(client))
}
