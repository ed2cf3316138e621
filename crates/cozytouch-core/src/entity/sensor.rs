// ── Measurement sensors ──

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{Entity, EntityBase, EntityIdentity, IdentityFactory, Platform, put};
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{DeviceModel, Widget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Room temperature in °C.
    Temperature,
    /// Cumulative consumption, reported in Wh and exposed divided by 1000.
    Electricity,
}

impl SensorKind {
    fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Electricity => "kW",
        }
    }

    fn device_class(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Electricity => "energy",
        }
    }

    fn read(self, device: &DeviceModel) -> Option<f64> {
        match self {
            Self::Temperature => device.temperature(),
            Self::Electricity => device.consumption().map(|wh| wh / 1000.0),
        }
    }
}

pub struct SensorEntity {
    base: EntityBase,
    kind: SensorKind,
}

impl SensorEntity {
    pub(crate) fn for_device(
        coordinator: &Coordinator,
        ids: &mut IdentityFactory<'_>,
        device: &DeviceModel,
    ) -> Option<Self> {
        let kind = match device.widget {
            Widget::Temperature => SensorKind::Temperature,
            Widget::Electricity => SensorKind::Electricity,
            _ => return None,
        };
        let name = ids.placed_name(device);
        let identity = ids.identity(Platform::Sensor, device, None, name);
        Some(Self {
            base: EntityBase::new(coordinator.clone(), identity),
            kind,
        })
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }
}

#[async_trait]
impl Entity for SensorEntity {
    fn identity(&self) -> &EntityIdentity {
        self.base.identity()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("device_class".into(), json!(self.kind.device_class()));
        props.insert("unit_of_measurement".into(), json!(self.kind.unit()));
        put(
            &mut props,
            "state",
            self.base.device().and_then(|d| self.kind.read(&d)),
        );
        props
    }

    fn commands(&self) -> Vec<&'static str> {
        Vec::new()
    }

    async fn invoke_command(&self, name: &str, _args: &Value) -> Result<(), CoreError> {
        Err(self.base.unknown_command(name))
    }
}
