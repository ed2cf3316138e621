// ── Climate entities ──
//
// Standalone electrical heaters and the heating/cooling sides of APC
// zones. Supported features are fixed at discovery from the device's
// capabilities in the first snapshot.

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::modes::{
    HEATER_HVAC, HEATER_PRESETS, HvacMode, ModeTable, Preset, ZONE_COOLING_HVAC,
    ZONE_HEATING_HVAC, ZONE_PRESETS,
};
use super::{
    Entity, EntityBase, EntityIdentity, IdentityFactory, Platform, arg_f64, arg_parse, put,
    room_temperature,
};
use crate::command::{DeviceCommand, Setpoint, ThermalMode};
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{DeviceModel, StateKey, Widget};

const MIN_TEMP: f64 = 5.0;
const MAX_TEMP: f64 = 30.0;

/// What a thermostat is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateProfile {
    /// Electrical heater with operating mode, heating level and setpoints.
    Heater,
    /// One side of an APC zone.
    Zone(ThermalMode),
}

impl ClimateProfile {
    fn hvac_table(self) -> ModeTable<HvacMode> {
        match self {
            Self::Heater => HEATER_HVAC,
            Self::Zone(ThermalMode::Heating) => ZONE_HEATING_HVAC,
            Self::Zone(ThermalMode::Cooling) => ZONE_COOLING_HVAC,
        }
    }

    fn preset_table(self) -> ModeTable<Preset> {
        match self {
            Self::Heater => HEATER_PRESETS,
            Self::Zone(_) => ZONE_PRESETS,
        }
    }

    fn mode_key(self) -> StateKey {
        match self {
            Self::Heater => StateKey::OperatingMode,
            Self::Zone(ThermalMode::Heating) => StateKey::HeatingMode,
            Self::Zone(ThermalMode::Cooling) => StateKey::CoolingMode,
        }
    }

    fn on_off_key(self) -> Option<StateKey> {
        match self {
            Self::Heater => None,
            Self::Zone(ThermalMode::Heating) => Some(StateKey::HeatingOnOff),
            Self::Zone(ThermalMode::Cooling) => Some(StateKey::CoolingOnOff),
        }
    }

    /// `(comfort, eco)` setpoint keys.
    fn setpoint_keys(self) -> (StateKey, StateKey) {
        match self {
            Self::Heater => (StateKey::ComfortTemperature, StateKey::EcoTemperature),
            Self::Zone(ThermalMode::Heating) => (
                StateKey::ComfortHeatingTargetTemperature,
                StateKey::EcoHeatingTargetTemperature,
            ),
            Self::Zone(ThermalMode::Cooling) => (
                StateKey::ComfortCoolingTargetTemperature,
                StateKey::EcoCoolingTargetTemperature,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Features {
    preset: bool,
    range: bool,
    away: bool,
}

impl Features {
    fn detect(profile: ClimateProfile, device: &DeviceModel) -> Self {
        let (comfort, eco) = profile.setpoint_keys();
        let range = device.is_state_supported(comfort) && device.is_state_supported(eco);
        match profile {
            ClimateProfile::Heater => Self {
                preset: device.is_state_supported(StateKey::TargetingHeatingLevel),
                range,
                away: device.is_state_supported(StateKey::HolidaysMode),
            },
            ClimateProfile::Zone(_) => Self {
                preset: true,
                range,
                away: false,
            },
        }
    }

    fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.preset {
            names.push("preset_mode");
        }
        names.push(if self.range {
            "target_temperature_range"
        } else {
            "target_temperature"
        });
        if self.away {
            names.push("away_mode");
        }
        names
    }
}

pub struct ClimateEntity {
    base: EntityBase,
    profile: ClimateProfile,
    features: Features,
}

impl ClimateEntity {
    /// Thermostats for `device`: one for a heater, one or two for an APC
    /// zone, none for anything else.
    pub(crate) fn for_device(
        coordinator: &Coordinator,
        ids: &mut IdentityFactory<'_>,
        device: &DeviceModel,
    ) -> Vec<Self> {
        let profiles: Vec<(ClimateProfile, Option<&str>)> = match device.widget {
            Widget::Heater => vec![(ClimateProfile::Heater, None)],
            Widget::ApcHeatingZone => {
                let mut sides = vec![(ClimateProfile::Zone(ThermalMode::Heating), Some("heating"))];
                if device.is_state_supported(StateKey::CoolingMode) {
                    sides.push((ClimateProfile::Zone(ThermalMode::Cooling), Some("cooling")));
                }
                sides
            }
            _ => Vec::new(),
        };
        let zone_sides = profiles.len();

        profiles
            .into_iter()
            .map(|(profile, suffix)| {
                let mut name = ids.placed_name(device);
                if let (true, ClimateProfile::Zone(thermal)) = (zone_sides > 1, profile) {
                    name = format!("{name} {thermal}");
                }
                let identity = ids.identity(Platform::Climate, device, suffix, name);
                Self::new(coordinator.clone(), identity, profile, device)
            })
            .collect()
    }

    pub fn new(
        coordinator: Coordinator,
        identity: EntityIdentity,
        profile: ClimateProfile,
        device: &DeviceModel,
    ) -> Self {
        Self {
            base: EntityBase::new(coordinator, identity),
            profile,
            features: Features::detect(profile, device),
        }
    }

    pub fn profile(&self) -> ClimateProfile {
        self.profile
    }

    fn hvac_mode(&self, device: &DeviceModel) -> Option<HvacMode> {
        let switched_off = self
            .profile
            .on_off_key()
            .is_some_and(|key| device.state_bool(key) == Some(false));
        if switched_off {
            return Some(HvacMode::Off);
        }
        self.profile
            .hvac_table()
            .to_host(device.state_str(self.profile.mode_key()))
    }

    fn preset_mode(&self, device: &DeviceModel) -> Option<Preset> {
        let vendor = match self.profile {
            ClimateProfile::Heater => device.targeting_heating_level(),
            ClimateProfile::Zone(_) => device.state_str(self.profile.mode_key()),
        };
        self.profile.preset_table().to_host(vendor)
    }

    fn target_temperature(&self, device: &DeviceModel) -> Option<f64> {
        let (comfort, eco) = self.profile.setpoint_keys();
        match self.profile {
            ClimateProfile::Heater => device
                .target_temperature()
                .or_else(|| device.state_f64(comfort)),
            ClimateProfile::Zone(_) => match self.preset_mode(device) {
                Some(Preset::Eco) => device.state_f64(eco),
                _ => device.state_f64(comfort),
            },
        }
    }

    async fn set_hvac_mode(&self, args: &Value) -> Result<(), CoreError> {
        let mode: HvacMode = arg_parse(args, "hvac_mode", "set_hvac_mode")?;
        let command = match self.profile {
            ClimateProfile::Heater => DeviceCommand::SetOperatingMode {
                mode: self.vendor_hvac(mode)?.to_owned(),
            },
            ClimateProfile::Zone(thermal) => DeviceCommand::SetZoneMode {
                thermal,
                mode: self.vendor_hvac(mode)?.to_owned(),
            },
        };
        self.base.send(command).await
    }

    fn vendor_hvac(&self, mode: HvacMode) -> Result<&'static str, CoreError> {
        self.profile
            .hvac_table()
            .to_vendor(mode)
            .ok_or_else(|| CoreError::InvalidArgument {
                command: "set_hvac_mode".into(),
                message: format!("hvac mode '{mode}' is not available"),
            })
    }

    async fn set_preset_mode(&self, args: &Value) -> Result<(), CoreError> {
        if !self.features.preset {
            return Err(self.base.unsupported("set_preset_mode", "presets"));
        }
        let preset: Preset = arg_parse(args, "preset_mode", "set_preset_mode")?;
        let vendor = self
            .profile
            .preset_table()
            .to_vendor(preset)
            .ok_or_else(|| CoreError::InvalidArgument {
                command: "set_preset_mode".into(),
                message: format!("preset '{preset}' is not available"),
            })?
            .to_owned();
        let command = match self.profile {
            ClimateProfile::Heater => DeviceCommand::SetTargetingHeatingLevel { level: vendor },
            ClimateProfile::Zone(thermal) => DeviceCommand::SetZoneMode {
                thermal,
                mode: vendor,
            },
        };
        self.base.send(command).await
    }

    async fn set_temperature(&self, args: &Value) -> Result<(), CoreError> {
        const CMD: &str = "set_temperature";
        let high = arg_f64(args, "target_temp_high", CMD)?;
        let low = arg_f64(args, "target_temp_low", CMD)?;
        let single = arg_f64(args, "temperature", CMD)?;

        let mut commands = Vec::new();
        if self.features.range && (high.is_some() || low.is_some()) {
            if let Some(celsius) = high {
                commands.push(self.setpoint_command(Setpoint::Comfort, celsius));
            }
            if let Some(celsius) = low {
                commands.push(self.setpoint_command(Setpoint::Eco, celsius));
            }
        } else if let Some(celsius) = single {
            commands.push(match self.profile {
                ClimateProfile::Heater if !self.features.range => {
                    DeviceCommand::SetTargetTemperature { celsius }
                }
                _ => self.setpoint_command(Setpoint::Comfort, celsius),
            });
        }

        if commands.is_empty() {
            return Err(CoreError::InvalidArgument {
                command: CMD.into(),
                message: if self.features.range {
                    "expected 'target_temp_high' and/or 'target_temp_low'".into()
                } else {
                    "expected 'temperature'".into()
                },
            });
        }

        for command in &commands {
            check_range(command)?;
        }
        for command in commands {
            self.base.send(command).await?;
        }
        Ok(())
    }

    fn setpoint_command(&self, setpoint: Setpoint, celsius: f64) -> DeviceCommand {
        match (self.profile, setpoint) {
            (ClimateProfile::Heater, Setpoint::Comfort) => {
                DeviceCommand::SetComfortTemperature { celsius }
            }
            (ClimateProfile::Heater, Setpoint::Eco) => DeviceCommand::SetEcoTemperature { celsius },
            (ClimateProfile::Zone(thermal), setpoint) => DeviceCommand::SetZoneSetpoint {
                thermal,
                setpoint,
                celsius,
            },
        }
    }

    async fn set_away(&self, enabled: bool) -> Result<(), CoreError> {
        let name = if enabled {
            "turn_away_mode_on"
        } else {
            "turn_away_mode_off"
        };
        if !self.features.away {
            return Err(self.base.unsupported(name, "away mode"));
        }
        self.base.send(DeviceCommand::SetHolidays { enabled }).await
    }

    async fn set_power(&self, on: bool) -> Result<(), CoreError> {
        let command = match (self.profile, on) {
            (ClimateProfile::Zone(ThermalMode::Cooling), true) => DeviceCommand::SetZoneMode {
                thermal: ThermalMode::Cooling,
                mode: "manu".into(),
            },
            (ClimateProfile::Zone(ThermalMode::Cooling), false) => DeviceCommand::SetZoneMode {
                thermal: ThermalMode::Cooling,
                mode: "stop".into(),
            },
            (_, true) => DeviceCommand::TurnOn,
            (_, false) => DeviceCommand::TurnOff,
        };
        self.base.send(command).await
    }
}

fn check_range(command: &DeviceCommand) -> Result<(), CoreError> {
    let celsius = match command {
        DeviceCommand::SetComfortTemperature { celsius }
        | DeviceCommand::SetEcoTemperature { celsius }
        | DeviceCommand::SetTargetTemperature { celsius }
        | DeviceCommand::SetZoneSetpoint { celsius, .. } => *celsius,
        _ => return Ok(()),
    };
    if (MIN_TEMP..=MAX_TEMP).contains(&celsius) {
        Ok(())
    } else {
        Err(CoreError::InvalidArgument {
            command: "set_temperature".into(),
            message: format!("{celsius} °C is outside {MIN_TEMP}..={MAX_TEMP}"),
        })
    }
}

#[async_trait]
impl Entity for ClimateEntity {
    fn identity(&self) -> &EntityIdentity {
        self.base.identity()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("temperature_unit".into(), json!("°C"));
        props.insert("min_temp".into(), json!(MIN_TEMP));
        props.insert("max_temp".into(), json!(MAX_TEMP));
        props.insert("supported_features".into(), json!(self.features.names()));
        props.insert(
            "hvac_modes".into(),
            json!(self.profile.hvac_table().host_modes()),
        );
        if self.features.preset {
            props.insert(
                "preset_modes".into(),
                json!(self.profile.preset_table().host_modes()),
            );
        }

        let (Some(snapshot), Some(device)) = (self.base.snapshot(), self.base.device()) else {
            return props;
        };

        put(
            &mut props,
            "hvac_mode",
            self.hvac_mode(&device).map(|m| m.to_string()),
        );
        if self.features.preset {
            put(
                &mut props,
                "preset_mode",
                self.preset_mode(&device).map(|p| p.to_string()),
            );
        }
        put(
            &mut props,
            "current_temperature",
            room_temperature(&snapshot, &device),
        );

        let (comfort, eco) = self.profile.setpoint_keys();
        if self.features.range {
            put(&mut props, "target_temp_high", device.state_f64(comfort));
            put(&mut props, "target_temp_low", device.state_f64(eco));
        }
        put(
            &mut props,
            "target_temperature",
            self.target_temperature(&device),
        );
        if self.features.away {
            put(&mut props, "is_away_mode_on", device.is_away());
        }
        props
    }

    fn commands(&self) -> Vec<&'static str> {
        let mut commands = vec!["set_hvac_mode", "set_temperature", "turn_on", "turn_off"];
        if self.features.preset {
            commands.push("set_preset_mode");
        }
        if self.features.away {
            commands.extend(["turn_away_mode_on", "turn_away_mode_off"]);
        }
        commands
    }

    async fn invoke_command(&self, name: &str, args: &Value) -> Result<(), CoreError> {
        match name {
            "set_hvac_mode" => self.set_hvac_mode(args).await,
            "set_preset_mode" => self.set_preset_mode(args).await,
            "set_temperature" => self.set_temperature(args).await,
            "turn_away_mode_on" => self.set_away(true).await,
            "turn_away_mode_off" => self.set_away(false).await,
            "turn_on" => self.set_power(true).await,
            "turn_off" => self.set_power(false).await,
            _ => Err(self.base.unknown_command(name)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn heater() -> DeviceModel {
        DeviceModel::new("io://h1", Widget::Heater)
            .with_state(StateKey::OperatingMode, "basic")
            .with_state(StateKey::ComfortTemperature, 21.0)
            .with_state(StateKey::EcoTemperature, 17.5)
    }

    #[test]
    fn heater_features_follow_capabilities() {
        let features = Features::detect(ClimateProfile::Heater, &heater());
        assert_eq!(
            features,
            Features {
                preset: false,
                range: true,
                away: false
            }
        );

        let plain = DeviceModel::new("io://h2", Widget::Heater)
            .with_state(StateKey::TargetingHeatingLevel, "eco")
            .with_state(StateKey::HolidaysMode, "off");
        let features = Features::detect(ClimateProfile::Heater, &plain);
        assert!(features.preset && features.away && !features.range);
        assert_eq!(features.names(), vec!["preset_mode", "target_temperature", "away_mode"]);
    }

    #[test]
    fn zone_off_switch_overrides_mode() {
        let zone = DeviceModel::new("io://z1", Widget::ApcHeatingZone)
            .with_state(StateKey::HeatingMode, "comfort")
            .with_state(StateKey::HeatingOnOff, "off");
        let profile = ClimateProfile::Zone(ThermalMode::Heating);
        assert_eq!(profile.on_off_key(), Some(StateKey::HeatingOnOff));
        assert_eq!(zone.state_bool(StateKey::HeatingOnOff), Some(false));
        assert_eq!(
            profile.hvac_table().to_host(zone.state_str(profile.mode_key())),
            Some(HvacMode::Heat)
        );
    }

    #[test]
    fn out_of_range_setpoint_rejected() {
        assert!(check_range(&DeviceCommand::SetComfortTemperature { celsius: 21.0 }).is_ok());
        assert!(matches!(
            check_range(&DeviceCommand::SetEcoTemperature { celsius: 31.0 }),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(check_range(&DeviceCommand::TurnOn).is_ok());
    }
}
