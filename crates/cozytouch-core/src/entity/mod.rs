// ── Entity adapters ──
//
// Host-facing projections of devices. An adapter captures identity once,
// from the first snapshot, and resolves everything dynamic through the
// coordinator's current snapshot at read time. Commands go through the
// device model and end with a refresh request.

pub mod binary_sensor;
pub mod climate;
pub mod modes;
pub mod sensor;
pub mod switch;
pub mod water_heater;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::{info, warn};

use crate::command::DeviceCommand;
use crate::config::ActuatorFilter;
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{DeviceModel, Widget};
use crate::tree::SetupTree;

pub use binary_sensor::BinarySensorEntity;
pub use climate::ClimateEntity;
pub use sensor::SensorEntity;
pub use switch::SwitchEntity;
pub use water_heater::WaterHeaterEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    Climate,
    WaterHeater,
    Switch,
    Sensor,
    BinarySensor,
}

/// Static identity, fixed when the adapter is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityIdentity {
    pub platform: Platform,
    /// Unique within its platform.
    pub unique_id: String,
    pub name: String,
    pub device_id: String,
    pub model: String,
    pub manufacturer: Option<String>,
    /// The device this one hangs off: the owning device for sensors,
    /// the place for top-level devices.
    pub via_device: Option<String>,
}

impl EntityIdentity {
    /// `platform.unique_id`, unique across the whole integration.
    pub fn entity_id(&self) -> String {
        format!("{}.{}", self.platform, self.unique_id)
    }
}

/// The per-entity surface a host drives.
#[async_trait]
pub trait Entity: Send + Sync {
    fn identity(&self) -> &EntityIdentity;

    fn platform(&self) -> Platform {
        self.identity().platform
    }

    /// `false` without a snapshot, when the device is missing from it, or
    /// after a failed refresh.
    fn available(&self) -> bool;

    /// Current property values. Properties with no value are omitted.
    fn properties(&self) -> Map<String, Value>;

    /// Command names accepted by [`invoke_command`](Self::invoke_command).
    fn commands(&self) -> Vec<&'static str>;

    async fn invoke_command(&self, name: &str, args: &Value) -> Result<(), CoreError>;

    fn read_property(&self, name: &str) -> Option<Value> {
        self.properties().remove(name)
    }
}

// ── Shared adapter plumbing ──────────────────────────────────────────

/// Identity plus the coordinator handle every adapter embeds.
#[derive(Clone)]
pub struct EntityBase {
    coordinator: Coordinator,
    identity: EntityIdentity,
}

impl EntityBase {
    pub(crate) fn new(coordinator: Coordinator, identity: EntityIdentity) -> Self {
        Self {
            coordinator,
            identity,
        }
    }

    pub fn identity(&self) -> &EntityIdentity {
        &self.identity
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn snapshot(&self) -> Option<Arc<SetupTree>> {
        self.coordinator.data()
    }

    /// This entity's device in the current snapshot.
    pub fn device(&self) -> Option<Arc<DeviceModel>> {
        self.snapshot()?.device(&self.identity.device_id).cloned()
    }

    pub fn available(&self) -> bool {
        self.coordinator.last_error().is_none() && self.device().is_some()
    }

    /// Send a command to this entity's device, then ask for a refresh so
    /// the change shows up. Failures are logged and returned; state stays
    /// as last confirmed.
    pub(crate) async fn send(&self, command: DeviceCommand) -> Result<(), CoreError> {
        let device = self.device().ok_or_else(|| CoreError::DeviceNotFound {
            id: self.identity.device_id.clone(),
        })?;

        match device.execute(self.coordinator.client(), command).await {
            Ok(()) => {
                self.coordinator.request_refresh();
                Ok(())
            }
            Err(e) => {
                warn!(entity = %self.identity.entity_id(), error = %e, "command failed");
                Err(e.into())
            }
        }
    }

    pub(crate) fn unknown_command(&self, command: &str) -> CoreError {
        CoreError::UnknownCommand {
            unique_id: self.identity.entity_id(),
            command: command.to_owned(),
        }
    }

    pub(crate) fn unsupported(&self, command: &str, feature: &str) -> CoreError {
        CoreError::InvalidArgument {
            command: command.to_owned(),
            message: format!("{} does not support {feature}", self.identity.entity_id()),
        }
    }
}

/// Insert `value` under `key` unless it is absent or empty.
pub(crate) fn put(map: &mut Map<String, Value>, key: &str, value: Option<impl Into<Value>>) {
    let Some(value) = value.map(Into::into) else {
        return;
    };
    let empty = match &value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    };
    if !empty {
        map.insert(key.to_owned(), value);
    }
}

/// Room temperature: an attached temperature sensor wins over the
/// device's own reading.
pub(crate) fn room_temperature(tree: &SetupTree, device: &DeviceModel) -> Option<f64> {
    tree.sensors_of(&device.id)
        .filter(|s| s.widget == Widget::Temperature)
        .find_map(|s| s.temperature())
        .or_else(|| device.temperature())
}

// ── Argument parsing ─────────────────────────────────────────────────

pub(crate) fn arg_f64(args: &Value, key: &str, command: &str) -> Result<Option<f64>, CoreError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| CoreError::InvalidArgument {
            command: command.to_owned(),
            message: format!("'{key}' must be a number"),
        }),
        Some(_) => Err(CoreError::InvalidArgument {
            command: command.to_owned(),
            message: format!("'{key}' must be a number"),
        }),
    }
}

pub(crate) fn arg_u32(args: &Value, key: &str, command: &str) -> Result<u32, CoreError> {
    args.get(key)
        .and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| CoreError::InvalidArgument {
            command: command.to_owned(),
            message: format!("'{key}' must be a non-negative integer"),
        })
}

/// Parse a required string argument into a host vocabulary value.
pub(crate) fn arg_parse<T: std::str::FromStr>(
    args: &Value,
    key: &str,
    command: &str,
) -> Result<T, CoreError> {
    let raw = args
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::InvalidArgument {
            command: command.to_owned(),
            message: format!("missing '{key}'"),
        })?;
    raw.parse().map_err(|_| CoreError::InvalidArgument {
        command: command.to_owned(),
        message: format!("unknown {key} '{raw}'"),
    })
}

// ── Discovery ────────────────────────────────────────────────────────

/// Builds identities, numbering repeated names so that same-named
/// devices stay distinguishable. Numbering follows discovery order.
pub(crate) struct IdentityFactory<'a> {
    tree: &'a SetupTree,
    seen: HashMap<(Platform, String), usize>,
}

impl<'a> IdentityFactory<'a> {
    fn new(tree: &'a SetupTree) -> Self {
        Self {
            tree,
            seen: HashMap::new(),
        }
    }

    /// `"{place} {device}"`, or the bare device name when the place is
    /// unknown.
    pub(crate) fn placed_name(&self, device: &DeviceModel) -> String {
        match device
            .place_id
            .as_deref()
            .and_then(|id| self.tree.place_name(id))
        {
            Some(place) => format!("{place} {}", device.name),
            None => device.name.clone(),
        }
    }

    pub(crate) fn identity(
        &mut self,
        platform: Platform,
        device: &DeviceModel,
        unique_suffix: Option<&str>,
        name: String,
    ) -> EntityIdentity {
        let count = self.seen.entry((platform, name.clone())).or_insert(0);
        *count += 1;
        let name = if *count > 1 {
            format!("{name} {count}")
        } else {
            name
        };

        let unique_id = match unique_suffix {
            Some(suffix) => format!("{}#{suffix}", device.id),
            None => device.id.clone(),
        };

        EntityIdentity {
            platform,
            unique_id,
            name,
            device_id: device.id.clone(),
            model: device.widget.to_string(),
            manufacturer: device.manufacturer.clone(),
            via_device: device.parent_id.clone().or_else(|| device.place_id.clone()),
        }
    }
}

/// Materialise adapters for every supported device in `tree`.
///
/// `tree` should be the first snapshot; the actuator filter picks which
/// heaters get an on/off switch.
pub fn discover_entities(
    coordinator: &Coordinator,
    tree: &SetupTree,
    actuator: ActuatorFilter,
) -> Vec<Box<dyn Entity>> {
    let mut ids = IdentityFactory::new(tree);
    let mut entities: Vec<Box<dyn Entity>> = Vec::new();

    for heater in tree.heaters() {
        for entity in ClimateEntity::for_device(coordinator, &mut ids, heater) {
            entities.push(Box::new(entity));
        }
    }

    for water_heater in tree.water_heaters() {
        if let Some(entity) = WaterHeaterEntity::for_device(coordinator, &mut ids, water_heater) {
            entities.push(Box::new(entity));
        }
    }

    for heater in tree.heaters().iter().filter(|h| actuator.admits(&h.widget)) {
        let identity = ids.identity(Platform::Switch, heater, None, heater.name.clone());
        entities.push(Box::new(SwitchEntity::new(coordinator.clone(), identity)));
    }

    for sensor in tree.sensors() {
        match sensor.widget {
            Widget::Temperature | Widget::Electricity => {
                if let Some(entity) = SensorEntity::for_device(coordinator, &mut ids, sensor) {
                    entities.push(Box::new(entity));
                }
            }
            Widget::Occupancy | Widget::Contact => {
                if let Some(entity) = BinarySensorEntity::for_device(coordinator, &mut ids, sensor)
                {
                    entities.push(Box::new(entity));
                }
            }
            _ => {}
        }
    }

    info!(
        count = entities.len(),
        actuator = %actuator,
        "entities discovered"
    );
    entities
}
