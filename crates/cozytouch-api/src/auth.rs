// Session authentication
//
// Form-encoded login against the cloud endpoint. A successful login sets
// the session cookie in the client's jar; later requests carry it
// automatically.

use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::client::{CozytouchClient, check_status};
use crate::error::Error;

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default = "default_success")]
    success: bool,
}

fn default_success() -> bool {
    true
}

impl CozytouchClient {
    /// Authenticate with the configured username/password.
    ///
    /// `POST {base}/login` with form fields `userId` / `userPassword`.
    /// A 2xx answer whose body says `"success": false` is still a rejected
    /// login.
    pub async fn login(&self) -> Result<(), Error> {
        let url = self.endpoint("login")?;
        debug!("logging in at {}", url);

        let form = [
            ("userId", self.username()),
            ("userPassword", self.password().expose_secret()),
        ];
        let resp = self
            .http()
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let resp = check_status(resp).await?;

        let body = resp.text().await.map_err(Error::Transport)?;
        let accepted = serde_json::from_str::<LoginResponse>(&body).map_or(true, |r| r.success);
        if !accepted {
            return Err(Error::Authentication {
                message: "login rejected by server".into(),
            });
        }

        debug!("login successful");
        Ok(())
    }

    /// End the current session.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.endpoint("logout")?;
        debug!("logging out at {}", url);

        let resp = self
            .http()
            .post(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        check_status(resp).await?;

        debug!("logout complete");
        Ok(())
    }
}
