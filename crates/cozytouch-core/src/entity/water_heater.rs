// ── Water heater entities ──

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::modes::{APC_DHW_OPERATIONS, DHW_OPERATIONS, ModeTable, WaterHeaterOperation};
use super::{
    Entity, EntityBase, EntityIdentity, IdentityFactory, Platform, arg_f64, arg_parse, arg_u32,
    put, room_temperature,
};
use crate::command::{DeviceCommand, MAX_AWAY_DAYS, MAX_BOOST_DAYS};
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{DeviceModel, StateKey, Widget};

/// Per-widget constants of a water heater.
#[derive(Debug, Clone, Copy)]
pub struct WaterHeaterProfile {
    pub operations: ModeTable<WaterHeaterOperation>,
    pub min_temp: f64,
    pub max_temp: f64,
    /// Days sent by `turn_boost_mode_on`.
    pub boost_on_days: u32,
    pub high_key: StateKey,
    pub low_key: StateKey,
    /// Whether power readings and heat-pump efficiency are reported.
    pub reports_power: bool,
}

pub const DHW_PROFILE: WaterHeaterProfile = WaterHeaterProfile {
    operations: DHW_OPERATIONS,
    min_temp: 50.0,
    max_temp: 62.0,
    boost_on_days: MAX_BOOST_DAYS,
    high_key: StateKey::MaxTemperatureManualMode,
    low_key: StateKey::MinTemperatureManualMode,
    reports_power: true,
};

pub const APC_DHW_PROFILE: WaterHeaterProfile = WaterHeaterProfile {
    operations: APC_DHW_OPERATIONS,
    min_temp: 40.0,
    max_temp: 45.0,
    boost_on_days: 1,
    high_key: StateKey::ComfortTargetDhwTemperature,
    low_key: StateKey::EcoTargetDhwTemperature,
    reports_power: false,
};

pub struct WaterHeaterEntity {
    base: EntityBase,
    widget: Widget,
    profile: WaterHeaterProfile,
}

impl WaterHeaterEntity {
    pub(crate) fn for_device(
        coordinator: &Coordinator,
        ids: &mut IdentityFactory<'_>,
        device: &DeviceModel,
    ) -> Option<Self> {
        let profile = match device.widget {
            Widget::WaterHeater => DHW_PROFILE,
            Widget::ApcWaterHeater => APC_DHW_PROFILE,
            _ => return None,
        };
        let mut identity = ids.identity(Platform::WaterHeater, device, None, device.name.clone());
        if let Some(capacity) = device.get_state(StateKey::DhwCapacity) {
            identity.model = match capacity {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }
        Some(Self {
            base: EntityBase::new(coordinator.clone(), identity),
            widget: device.widget.clone(),
            profile,
        })
    }

    pub fn profile(&self) -> &WaterHeaterProfile {
        &self.profile
    }

    async fn set_operation_mode(&self, args: &Value) -> Result<(), CoreError> {
        let operation: WaterHeaterOperation =
            arg_parse(args, "operation_mode", "set_operation_mode")?;
        let mode = self
            .profile
            .operations
            .to_vendor(operation)
            .ok_or_else(|| CoreError::InvalidArgument {
                command: "set_operation_mode".into(),
                message: format!("operation '{operation}' is not available"),
            })?;
        self.base
            .send(DeviceCommand::SetOperatingMode {
                mode: mode.to_owned(),
            })
            .await
    }

    async fn set_temperature(&self, args: &Value) -> Result<(), CoreError> {
        const CMD: &str = "set_temperature";
        let celsius = arg_f64(args, "temperature", CMD)?.ok_or_else(|| {
            CoreError::InvalidArgument {
                command: CMD.into(),
                message: "expected 'temperature'".into(),
            }
        })?;
        if !(self.profile.min_temp..=self.profile.max_temp).contains(&celsius) {
            return Err(CoreError::InvalidArgument {
                command: CMD.into(),
                message: format!(
                    "{celsius} °C is outside {}..={}",
                    self.profile.min_temp, self.profile.max_temp
                ),
            });
        }
        let command = match self.widget {
            Widget::ApcWaterHeater => DeviceCommand::SetComfortTemperature { celsius },
            _ => DeviceCommand::SetTargetTemperature { celsius },
        };
        self.base.send(command).await
    }

    async fn set_away_mode(&self, days: u32) -> Result<(), CoreError> {
        if days > MAX_AWAY_DAYS {
            return Err(CoreError::InvalidArgument {
                command: "set_away_mode".into(),
                message: format!("days must be at most {MAX_AWAY_DAYS}"),
            });
        }
        self.base.send(DeviceCommand::SetAwayMode { days }).await
    }

    async fn set_boost_mode(&self, days: u32) -> Result<(), CoreError> {
        if days > MAX_BOOST_DAYS {
            return Err(CoreError::InvalidArgument {
                command: "set_boost_mode".into(),
                message: format!("days must be at most {MAX_BOOST_DAYS}"),
            });
        }
        self.base.send(DeviceCommand::SetBoostMode { days }).await
    }

    fn attributes(&self, device: &DeviceModel, props: &mut Map<String, Value>) {
        if let Some(caps) = device.get_state(StateKey::OperatingModeCapabilities) {
            let demand = caps
                .get("energyDemandStatus")
                .and_then(Value::as_i64)
                .is_some_and(|v| v == 1);
            props.insert("energy_demand".into(), Value::Bool(demand));
        }
        put(
            props,
            "away_mode_duration",
            device.state_i64(StateKey::AwayModeDuration),
        );
        put(props, "boost_mode", device.is_boost());
        put(
            props,
            "boost_mode_duration",
            device.state_i64(StateKey::BoostModeDuration),
        );
        put(
            props,
            "boost_mode_start",
            device.get_state(StateKey::BoostStartDate).cloned(),
        );
        put(
            props,
            "boost_mode_end",
            device.get_state(StateKey::BoostEndDate).cloned(),
        );
        put(
            props,
            "anti_legionellosis",
            device.get_state(StateKey::AntiLegionellosis).cloned(),
        );
        put(
            props,
            "programmation",
            device.get_state(StateKey::ProgrammingSlots).cloned(),
        );
        put(
            props,
            "v40",
            device.state_f64(StateKey::V40WaterVolumeEstimation),
        );

        let booster = device.state_f64(StateKey::ElectricBoosterOperatingTime);
        let heat_pump = device.state_f64(StateKey::HeatPumpOperatingTime);
        put(props, "booster_time", booster);
        put(props, "heatpump_time", heat_pump);
        put(
            props,
            "showers_remaining",
            device.state_i64(StateKey::NumberOfShowerRemaining),
        );

        if self.profile.reports_power {
            put(
                props,
                "power_electrical",
                device
                    .state_f64(StateKey::PowerHeatElectrical)
                    .map(|w| w / 1000.0),
            );
            put(
                props,
                "power_heatpump",
                device.state_f64(StateKey::PowerHeatPump).map(|w| w / 1000.0),
            );
            put(props, "efficiency", efficiency(booster, heat_pump));
        }
    }
}

/// Share of operating time covered by the heat pump, in percent.
fn efficiency(booster: Option<f64>, heat_pump: Option<f64>) -> Option<f64> {
    let (booster, heat_pump) = (booster?, heat_pump?);
    let total = booster + heat_pump;
    (total > 0.0).then(|| (heat_pump / total * 100.0).round())
}

#[async_trait]
impl Entity for WaterHeaterEntity {
    fn identity(&self) -> &EntityIdentity {
        self.base.identity()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("temperature_unit".into(), json!("°C"));
        props.insert("min_temp".into(), json!(self.profile.min_temp));
        props.insert("max_temp".into(), json!(self.profile.max_temp));
        props.insert(
            "operation_list".into(),
            json!(self.profile.operations.host_modes()),
        );

        let (Some(snapshot), Some(device)) = (self.base.snapshot(), self.base.device()) else {
            return props;
        };

        put(
            &mut props,
            "current_operation",
            self.profile
                .operations
                .to_host(device.operating_mode())
                .map(|op| op.to_string()),
        );
        put(
            &mut props,
            "current_temperature",
            room_temperature(&snapshot, &device),
        );
        put(
            &mut props,
            "target_temperature",
            device
                .target_temperature()
                .or_else(|| device.state_f64(self.profile.high_key)),
        );
        put(
            &mut props,
            "target_temperature_high",
            device.state_f64(self.profile.high_key),
        );
        put(
            &mut props,
            "target_temperature_low",
            device.state_f64(self.profile.low_key),
        );
        put(&mut props, "is_on", device.is_on());
        put(&mut props, "is_away_mode_on", device.is_away());
        put(&mut props, "is_boost_mode_on", device.is_boost());
        self.attributes(&device, &mut props);
        props
    }

    fn commands(&self) -> Vec<&'static str> {
        vec![
            "set_operation_mode",
            "set_temperature",
            "set_away_mode",
            "set_boost_mode",
            "turn_away_mode_on",
            "turn_away_mode_off",
            "turn_boost_mode_on",
            "turn_boost_mode_off",
            "turn_on",
            "turn_off",
        ]
    }

    async fn invoke_command(&self, name: &str, args: &Value) -> Result<(), CoreError> {
        match name {
            "set_operation_mode" => self.set_operation_mode(args).await,
            "set_temperature" => self.set_temperature(args).await,
            "set_away_mode" => {
                let days = arg_u32(args, "days", name)?;
                self.set_away_mode(days).await
            }
            "set_boost_mode" => {
                let days = arg_u32(args, "days", name)?;
                self.set_boost_mode(days).await
            }
            "turn_away_mode_on" => self.set_away_mode(MAX_AWAY_DAYS).await,
            "turn_away_mode_off" => self.set_away_mode(0).await,
            "turn_boost_mode_on" => self.set_boost_mode(self.profile.boost_on_days).await,
            "turn_boost_mode_off" => self.set_boost_mode(0).await,
            "turn_on" => self.base.send(DeviceCommand::TurnOn).await,
            "turn_off" => self.base.send(DeviceCommand::TurnOff).await,
            _ => Err(self.base.unknown_command(name)),
        }
    }
}
