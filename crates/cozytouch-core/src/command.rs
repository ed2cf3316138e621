// ── Device commands ──
//
// Every write against a device is a `DeviceCommand`. Each one is checked
// against the widget's command table and translated to a vendor
// `CommandRequest` before anything is sent. Local state is never touched:
// the change becomes visible once a refresh reports it.

use std::fmt;
use std::ops::RangeInclusive;

use cozytouch_api::{CommandRequest, RemoteClient};
use tracing::debug;

use crate::error::{CommandError, CommandErrorKind};
use crate::model::{DeviceModel, Widget};

pub const MAX_AWAY_DAYS: u32 = 99;
pub const MAX_BOOST_DAYS: u32 = 7;

const HEATER_MODES: &[&str] = &["standby", "basic", "internal", "auto"];
const HEATING_LEVELS: &[&str] = &[
    "off",
    "frostprotection",
    "eco",
    "comfort",
    "comfort-1",
    "comfort-2",
];
const DHW_MODES: &[&str] = &["manualEcoActive", "manualEcoInactive", "autoMode"];
const APC_DHW_MODES: &[&str] = &[
    "stop",
    "eco",
    "comfort",
    "manu",
    "auto",
    "internalScheduling",
    "externalScheduling",
];
const ZONE_MODES: &[&str] = &[
    "stop",
    "comfort",
    "eco",
    "manu",
    "absence",
    "internalScheduling",
    "externalScheduling",
];
const BOILER_MODES: &[&str] = &["stop", "heating", "cooling", "drying"];

const ROOM_SETPOINT: RangeInclusive<f64> = 5.0..=30.0;
const DHW_SETPOINT: RangeInclusive<f64> = 40.0..=70.0;

/// Heating or cooling side of a dual-mode zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThermalMode {
    Heating,
    Cooling,
}

impl fmt::Display for ThermalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Heating => "heating",
            Self::Cooling => "cooling",
        })
    }
}

/// Which stored setpoint a zone command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setpoint {
    Comfort,
    Eco,
}

/// All write operations a device can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    SetOperatingMode {
        mode: String,
    },
    SetComfortTemperature {
        celsius: f64,
    },
    SetEcoTemperature {
        celsius: f64,
    },
    SetTargetTemperature {
        celsius: f64,
    },
    SetTargetingHeatingLevel {
        level: String,
    },
    TurnOn,
    TurnOff,
    SetHolidays {
        enabled: bool,
    },
    SetAwayMode {
        days: u32,
    },
    SetBoostMode {
        days: u32,
    },
    SetZoneMode {
        thermal: ThermalMode,
        mode: String,
    },
    SetZoneSetpoint {
        thermal: ThermalMode,
        setpoint: Setpoint,
        celsius: f64,
    },
}

impl DeviceCommand {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetOperatingMode { .. } => "set_operating_mode",
            Self::SetComfortTemperature { .. } => "set_comfort_temperature",
            Self::SetEcoTemperature { .. } => "set_eco_temperature",
            Self::SetTargetTemperature { .. } => "set_target_temperature",
            Self::SetTargetingHeatingLevel { .. } => "set_targeting_heating_level",
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::SetHolidays { .. } => "set_holidays",
            Self::SetAwayMode { .. } => "set_away_mode",
            Self::SetBoostMode { .. } => "set_boost_mode",
            Self::SetZoneMode { .. } => "set_zone_mode",
            Self::SetZoneSetpoint { .. } => "set_zone_setpoint",
        }
    }
}

// ── Translation ──────────────────────────────────────────────────────

/// Validate `command` against `widget` and build the vendor request.
pub fn build_request(
    widget: &Widget,
    command: &DeviceCommand,
) -> Result<CommandRequest, CommandErrorKind> {
    use DeviceCommand as C;
    use Widget as W;

    let heater = matches!(widget, W::Heater | W::PilotWireInterface);
    let dhw = matches!(widget, W::WaterHeater | W::ApcWaterHeater);

    match (command, widget) {
        (C::SetOperatingMode { mode }, W::Heater | W::PilotWireInterface) => {
            one_of(mode, HEATER_MODES).map(|m| request("setOperatingMode", m))
        }
        (C::SetOperatingMode { mode }, W::WaterHeater) => {
            one_of(mode, DHW_MODES).map(|m| request("setDHWMode", m))
        }
        (C::SetOperatingMode { mode }, W::ApcWaterHeater) => {
            one_of(mode, APC_DHW_MODES).map(|m| request("setPassAPCDHWMode", m))
        }
        (C::SetOperatingMode { mode }, W::Boiler) => {
            one_of(mode, BOILER_MODES).map(|m| request("setPassAPCOperatingMode", m))
        }

        (C::SetComfortTemperature { celsius }, _) if heater => {
            within(*celsius, &ROOM_SETPOINT).map(|t| request("setComfortTemperature", t))
        }
        (C::SetComfortTemperature { celsius }, W::ApcWaterHeater) => {
            within(*celsius, &DHW_SETPOINT).map(|t| request("setComfortTargetDHWTemperature", t))
        }
        (C::SetEcoTemperature { celsius }, _) if heater => {
            within(*celsius, &ROOM_SETPOINT).map(|t| request("setEcoTemperature", t))
        }
        (C::SetEcoTemperature { celsius }, W::ApcWaterHeater) => {
            within(*celsius, &DHW_SETPOINT).map(|t| request("setEcoTargetDHWTemperature", t))
        }
        (C::SetTargetTemperature { celsius }, W::Heater) => {
            within(*celsius, &ROOM_SETPOINT).map(|t| request("setTargetTemperature", t))
        }
        (C::SetTargetTemperature { celsius }, W::WaterHeater) => {
            within(*celsius, &DHW_SETPOINT).map(|t| request("setTargetTemperature", t))
        }

        (C::SetTargetingHeatingLevel { level }, _) if heater => {
            one_of(level, HEATING_LEVELS).map(|l| request("setHeatingLevel", l))
        }

        (C::TurnOn, _) if heater => Ok(CommandRequest::new("on")),
        (C::TurnOff, _) if heater => Ok(CommandRequest::new("off")),
        (C::TurnOn, _) if dhw => Ok(request("setDHWOnOffState", "on")),
        (C::TurnOff, _) if dhw => Ok(request("setDHWOnOffState", "off")),
        (C::TurnOn, W::ApcHeatingZone) => Ok(request("setHeatingOnOffState", "on")),
        (C::TurnOff, W::ApcHeatingZone) => Ok(request("setHeatingOnOffState", "off")),

        (C::SetHolidays { enabled }, _) if heater => {
            Ok(request("setHolidays", if *enabled { "on" } else { "off" }))
        }
        (C::SetAwayMode { days }, _) if dhw => {
            up_to(*days, MAX_AWAY_DAYS).map(|d| request("setAwayModeDuration", d))
        }
        (C::SetBoostMode { days }, _) if dhw => {
            up_to(*days, MAX_BOOST_DAYS).map(|d| request("setBoostModeDuration", d))
        }

        (C::SetZoneMode { thermal, mode }, W::ApcHeatingZone) => {
            let name = match thermal {
                ThermalMode::Heating => "setPassAPCHeatingMode",
                ThermalMode::Cooling => "setPassAPCCoolingMode",
            };
            one_of(mode, ZONE_MODES).map(|m| request(name, m))
        }
        (
            C::SetZoneSetpoint {
                thermal,
                setpoint,
                celsius,
            },
            W::ApcHeatingZone,
        ) => {
            let name = match (thermal, setpoint) {
                (ThermalMode::Heating, Setpoint::Comfort) => "setComfortHeatingTargetTemperature",
                (ThermalMode::Heating, Setpoint::Eco) => "setEcoHeatingTargetTemperature",
                (ThermalMode::Cooling, Setpoint::Comfort) => "setComfortCoolingTargetTemperature",
                (ThermalMode::Cooling, Setpoint::Eco) => "setEcoCoolingTargetTemperature",
            };
            within(*celsius, &ROOM_SETPOINT).map(|t| request(name, t))
        }

        _ => Err(CommandErrorKind::Unsupported),
    }
}

fn request(name: &str, arg: impl Into<serde_json::Value>) -> CommandRequest {
    CommandRequest::new(name).arg(arg)
}

fn one_of<'a>(value: &'a str, allowed: &[&str]) -> Result<&'a str, CommandErrorKind> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(CommandErrorKind::Validation(format!(
            "'{value}' is not one of {}",
            allowed.join(", ")
        )))
    }
}

fn within(value: f64, range: &RangeInclusive<f64>) -> Result<f64, CommandErrorKind> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(CommandErrorKind::Validation(format!(
            "{value} is outside {}..={}",
            range.start(),
            range.end()
        )))
    }
}

fn up_to(value: u32, max: u32) -> Result<u32, CommandErrorKind> {
    if value <= max {
        Ok(value)
    } else {
        Err(CommandErrorKind::Validation(format!(
            "{value} days exceeds the maximum of {max}"
        )))
    }
}

// ── DeviceModel command surface ──────────────────────────────────────

impl DeviceModel {
    /// Validate and send one command. Does not modify `self`.
    pub async fn execute(
        &self,
        client: &dyn RemoteClient,
        command: DeviceCommand,
    ) -> Result<(), CommandError> {
        let fail = |kind| CommandError {
            device_id: self.id.clone(),
            command: command.name().to_owned(),
            kind,
        };

        let request = build_request(&self.widget, &command).map_err(fail)?;
        debug!(device_id = %self.id, command = %request.name, "executing device command");

        client
            .send_command(&self.id, &request)
            .await
            .map_err(|e| fail(e.into()))
    }

    pub async fn set_operating_mode(
        &self,
        client: &dyn RemoteClient,
        mode: &str,
    ) -> Result<(), CommandError> {
        self.execute(client, DeviceCommand::SetOperatingMode { mode: mode.into() })
            .await
    }

    pub async fn set_comfort_temperature(
        &self,
        client: &dyn RemoteClient,
        celsius: f64,
    ) -> Result<(), CommandError> {
        self.execute(client, DeviceCommand::SetComfortTemperature { celsius }).await
    }

    pub async fn set_eco_temperature(
        &self,
        client: &dyn RemoteClient,
        celsius: f64,
    ) -> Result<(), CommandError> {
        self.execute(client, DeviceCommand::SetEcoTemperature { celsius }).await
    }

    pub async fn set_target_temperature(
        &self,
        client: &dyn RemoteClient,
        celsius: f64,
    ) -> Result<(), CommandError> {
        self.execute(client, DeviceCommand::SetTargetTemperature { celsius }).await
    }

    pub async fn set_targeting_heating_level(
        &self,
        client: &dyn RemoteClient,
        level: &str,
    ) -> Result<(), CommandError> {
        self.execute(
            client,
            DeviceCommand::SetTargetingHeatingLevel {
                level: level.into(),
            },
        )
        .await
    }

    pub async fn turn_on(&self, client: &dyn RemoteClient) -> Result<(), CommandError> {
        self.execute(client, DeviceCommand::TurnOn).await
    }

    pub async fn turn_off(&self, client: &dyn RemoteClient) -> Result<(), CommandError> {
        self.execute(client, DeviceCommand::TurnOff).await
    }

    pub async fn set_holidays(
        &self,
        client: &dyn RemoteClient,
        enabled: bool,
    ) -> Result<(), CommandError> {
        self.execute(client, DeviceCommand::SetHolidays { enabled }).await
    }

    /// Away for `days` days (`0` clears it, at most 99).
    pub async fn set_away_mode(
        &self,
        client: &dyn RemoteClient,
        days: u32,
    ) -> Result<(), CommandError> {
        self.execute(client, DeviceCommand::SetAwayMode { days }).await
    }

    /// Boost for `days` days (`0` clears it, at most 7).
    pub async fn set_boost_mode(
        &self,
        client: &dyn RemoteClient,
        days: u32,
    ) -> Result<(), CommandError> {
        self.execute(client, DeviceCommand::SetBoostMode { days }).await
    }

    pub async fn set_zone_mode(
        &self,
        client: &dyn RemoteClient,
        thermal: ThermalMode,
        mode: &str,
    ) -> Result<(), CommandError> {
        self.execute(
            client,
            DeviceCommand::SetZoneMode {
                thermal,
                mode: mode.into(),
            },
        )
        .await
    }

    pub async fn set_zone_setpoint(
        &self,
        client: &dyn RemoteClient,
        thermal: ThermalMode,
        setpoint: Setpoint,
        celsius: f64,
    ) -> Result<(), CommandError> {
        self.execute(
            client,
            DeviceCommand::SetZoneSetpoint {
                thermal,
                setpoint,
                celsius,
            },
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn heater_operating_mode() {
        let req = build_request(
            &Widget::Heater,
            &DeviceCommand::SetOperatingMode {
                mode: "standby".into(),
            },
        )
        .unwrap();
        assert_eq!(req.name, "setOperatingMode");
        assert_eq!(req.parameters, vec![json!("standby")]);
    }

    #[test]
    fn mode_outside_widget_vocabulary_is_rejected() {
        let err = build_request(
            &Widget::WaterHeater,
            &DeviceCommand::SetOperatingMode {
                mode: "basic".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandErrorKind::Validation(_)));
    }

    #[test]
    fn day_limits() {
        let w = Widget::ApcWaterHeater;
        assert!(build_request(&w, &DeviceCommand::SetAwayMode { days: 99 }).is_ok());
        assert!(build_request(&w, &DeviceCommand::SetAwayMode { days: 100 }).is_err());
        assert!(build_request(&w, &DeviceCommand::SetBoostMode { days: 7 }).is_ok());
        assert!(build_request(&w, &DeviceCommand::SetBoostMode { days: 8 }).is_err());
    }

    #[test]
    fn setpoint_range() {
        let ok = build_request(
            &Widget::Heater,
            &DeviceCommand::SetComfortTemperature { celsius: 21.5 },
        )
        .unwrap();
        assert_eq!(ok.parameters, vec![json!(21.5)]);
        assert!(
            build_request(
                &Widget::Heater,
                &DeviceCommand::SetComfortTemperature { celsius: 45.0 }
            )
            .is_err()
        );
    }

    #[test]
    fn inapplicable_commands_are_unsupported() {
        for widget in [Widget::Temperature, Widget::Unknown("X".into())] {
            assert_eq!(
                build_request(&widget, &DeviceCommand::TurnOn),
                Err(CommandErrorKind::Unsupported)
            );
        }
        assert_eq!(
            build_request(&Widget::Heater, &DeviceCommand::SetBoostMode { days: 1 }),
            Err(CommandErrorKind::Unsupported)
        );
    }

    #[test]
    fn zone_commands_pick_thermal_side() {
        let req = build_request(
            &Widget::ApcHeatingZone,
            &DeviceCommand::SetZoneSetpoint {
                thermal: ThermalMode::Cooling,
                setpoint: Setpoint::Eco,
                celsius: 26.0,
            },
        )
        .unwrap();
        assert_eq!(req.name, "setEcoCoolingTargetTemperature");

        let req = build_request(
            &Widget::ApcHeatingZone,
            &DeviceCommand::SetZoneMode {
                thermal: ThermalMode::Heating,
                mode: "internalScheduling".into(),
            },
        )
        .unwrap();
        assert_eq!(req.name, "setPassAPCHeatingMode");
    }
}
