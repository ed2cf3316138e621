// ── Runtime configuration ──
//
// Validated settings consumed by the coordinator and the integration.
// Loading from files and the environment lives in `cozytouch-config`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::model::Widget;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Scheduling parameters for the refresh worker.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Time between automatic refreshes.
    pub poll_interval: Duration,
    /// Bound on one whole refresh (`connect` + `fetch_setup`). A refresh
    /// that exceeds it counts as a network failure.
    pub refresh_timeout: Duration,
    /// When set, consecutive throttled refreshes double the delay up to
    /// this cap. `None` keeps the fixed poll interval.
    pub max_backoff: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            refresh_timeout: DEFAULT_TIMEOUT * 2,
            max_backoff: None,
        }
    }
}

/// Which heaters get an on/off switch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActuatorFilter {
    /// Every heater.
    #[default]
    All,
    /// Pilot-wire interfaces only.
    Pass,
    /// Electrical heaters only.
    I2g,
}

impl ActuatorFilter {
    pub fn admits(self, widget: &Widget) -> bool {
        match self {
            Self::All => true,
            Self::Pass => matches!(widget, Widget::PilotWireInterface),
            Self::I2g => matches!(widget, Widget::Heater),
        }
    }
}

/// Everything `integration::setup` needs besides the client.
#[derive(Debug, Clone, Default)]
pub struct IntegrationConfig {
    pub coordinator: CoordinatorConfig,
    pub actuator: ActuatorFilter,
}
