// ── RemoteClient ──
//
// The seam between the sync layer and the cloud. `CozytouchClient` is the
// HTTP implementation; tests substitute scripted in-memory clients.

use async_trait::async_trait;

use crate::error::Error;
use crate::models::{CommandRequest, RawSetup};

/// Operations the coordinator and device commands need from the cloud.
///
/// Each call is independent: implementations must not retry internally,
/// and must report throttling as [`Error::RateLimited`] so callers can tell
/// it apart from a rejected login.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Establish (or re-establish) an authenticated session.
    async fn connect(&self) -> Result<(), Error>;

    /// Fetch the complete place/gateway/device topology.
    async fn fetch_setup(&self) -> Result<RawSetup, Error>;

    /// Send one command to one device.
    async fn send_command(&self, device_id: &str, command: &CommandRequest) -> Result<(), Error>;
}
