#![allow(clippy::unwrap_used, dead_code)]
// Scripted in-memory `RemoteClient` shared by the integration tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cozytouch_api::{CommandRequest, Error, RawSetup, RemoteClient};
use serde_json::{Value, json};
use tokio::sync::{Notify, watch};

/// A failure to inject into the next fetch.
#[derive(Debug, Clone)]
pub enum Failure {
    Auth,
    Throttled(Option<u64>),
    Network,
}

impl Failure {
    fn into_error(self) -> Error {
        match self {
            Self::Auth => Error::Authentication {
                message: "Bad credentials".into(),
            },
            Self::Throttled(retry_after_secs) => Error::RateLimited { retry_after_secs },
            Self::Network => Error::Api {
                status: 503,
                message: "Service Unavailable".into(),
            },
        }
    }
}

pub struct ScriptedClient {
    setup: Mutex<RawSetup>,
    failures: Mutex<VecDeque<Failure>>,
    delay: Mutex<Duration>,
    hold_next: AtomicBool,
    held: watch::Sender<bool>,
    release: Notify,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    commands: Mutex<Vec<(String, CommandRequest)>>,
    reject_commands: Mutex<Option<(u16, String)>>,
}

impl ScriptedClient {
    pub fn new(setup: RawSetup) -> Self {
        Self {
            setup: Mutex::new(setup),
            failures: Mutex::default(),
            delay: Mutex::default(),
            hold_next: AtomicBool::new(false),
            held: watch::Sender::new(false),
            release: Notify::new(),
            fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            commands: Mutex::default(),
            reject_commands: Mutex::default(),
        }
    }

    /// What every following successful fetch returns.
    pub fn set_setup(&self, setup: RawSetup) {
        *self.setup.lock().unwrap() = setup;
    }

    pub fn fail_next(&self, failure: Failure) {
        self.failures.lock().unwrap().push_back(failure);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Block the next fetch until [`release`](Self::release).
    pub fn hold_next(&self) {
        self.hold_next.store(true, Ordering::SeqCst);
    }

    /// Wait until the held fetch has started.
    pub async fn entered(&self) {
        self.held.subscribe().wait_for(|held| *held).await.unwrap();
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn reject_commands(&self, status: u16, message: &str) {
        *self.reject_commands.lock().unwrap() = Some((status, message.into()));
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<(String, CommandRequest)> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteClient for ScriptedClient {
    async fn connect(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn fetch_setup(&self) -> Result<RawSetup, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hold_next.swap(false, Ordering::SeqCst) {
            self.held.send_replace(true);
            self.release.notified().await;
            self.held.send_replace(false);
        }
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().unwrap().pop_front();
        let result = match failure {
            Some(f) => Err(f.into_error()),
            None => Ok(self.setup.lock().unwrap().clone()),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn send_command(&self, device_id: &str, command: &CommandRequest) -> Result<(), Error> {
        if let Some((status, message)) = self.reject_commands.lock().unwrap().clone() {
            return Err(Error::Api { status, message });
        }
        self.commands
            .lock()
            .unwrap()
            .push((device_id.to_owned(), command.clone()));
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub const HEATER: &str = "io://0810-4343-9070/1";
pub const SENSOR: &str = "io://0810-4343-9070/1#2";
pub const WATER_HEATER: &str = "io://0810-4343-9070/2";
pub const ZONE: &str = "io://0810-4343-9070/3";
pub const PWI: &str = "io://0810-4343-9070/4";

pub fn raw(value: Value) -> RawSetup {
    serde_json::from_value(value).unwrap()
}

/// One place with a heater (with a temperature sensor), a water heater,
/// a heating/cooling zone and a pilot-wire interface.
pub fn house(heater_mode: &str) -> RawSetup {
    raw(json!({
        "places": [{ "oid": "p-1", "label": "Salon" }],
        "gateways": [{ "gatewayId": "0810-4343-9070", "placeOID": "p-1", "alive": true }],
        "devices": [
            {
                "deviceURL": HEATER,
                "uiWidget": "AtlanticElectricalHeater",
                "label": "Radiateur",
                "placeOID": "p-1",
                "manufacturer": "Atlantic",
                "state": {
                    "core:OperatingModeState": heater_mode,
                    "io:TargetHeatingLevelState": "comfort",
                    "core:ComfortRoomTemperatureState": 21.0,
                    "core:EcoRoomTemperatureState": 17.5,
                    "core:OnOffState": "on"
                },
                "subdevices": [{
                    "deviceURL": SENSOR,
                    "uiWidget": "TemperatureSensor",
                    "label": "Température",
                    "state": { "core:TemperatureState": 19.5 }
                }]
            },
            {
                "deviceURL": WATER_HEATER,
                "uiWidget": "DomesticHotWaterProduction",
                "label": "Chauffe-eau",
                "placeOID": "p-1",
                "state": {
                    "io:DHWModeState": "autoMode",
                    "core:TargetTemperatureState": 55,
                    "io:AwayModeDurationState": 0,
                    "core:BoostModeDurationState": 0,
                    "core:DHWCapacityState": 200
                }
            },
            {
                "deviceURL": ZONE,
                "uiWidget": "AtlanticPassAPCHeatingAndCoolingZone",
                "label": "Zone 1",
                "placeOID": "p-1",
                "state": {
                    "io:PassAPCHeatingModeState": "comfort",
                    "core:HeatingOnOffState": "on",
                    "core:ComfortHeatingTargetTemperatureState": 20.0,
                    "core:EcoHeatingTargetTemperatureState": 18.0,
                    "io:PassAPCCoolingModeState": "stop",
                    "core:CoolingOnOffState": "off"
                }
            },
            {
                "deviceURL": PWI,
                "uiWidget": "AtlanticPilotWireInterface",
                "label": "Fil pilote",
                "placeOID": "p-1",
                "state": { "core:OperatingModeState": "standby" }
            }
        ]
    }))
}
