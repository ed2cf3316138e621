// ── Binary sensors ──

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{Entity, EntityBase, EntityIdentity, IdentityFactory, Platform, put};
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{DeviceModel, Widget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarySensorKind {
    Occupancy,
    Contact,
}

impl BinarySensorKind {
    fn device_class(self) -> &'static str {
        match self {
            Self::Occupancy => "presence",
            Self::Contact => "opening",
        }
    }

    fn read(self, device: &DeviceModel) -> Option<bool> {
        match self {
            Self::Occupancy => device.is_occupied(),
            Self::Contact => device.is_open(),
        }
    }
}

pub struct BinarySensorEntity {
    base: EntityBase,
    kind: BinarySensorKind,
}

impl BinarySensorEntity {
    pub(crate) fn for_device(
        coordinator: &Coordinator,
        ids: &mut IdentityFactory<'_>,
        device: &DeviceModel,
    ) -> Option<Self> {
        let kind = match device.widget {
            Widget::Occupancy => BinarySensorKind::Occupancy,
            Widget::Contact => BinarySensorKind::Contact,
            _ => return None,
        };
        let name = ids.placed_name(device);
        let identity = ids.identity(Platform::BinarySensor, device, None, name);
        Some(Self {
            base: EntityBase::new(coordinator.clone(), identity),
            kind,
        })
    }

    pub fn kind(&self) -> BinarySensorKind {
        self.kind
    }
}

#[async_trait]
impl Entity for BinarySensorEntity {
    fn identity(&self) -> &EntityIdentity {
        self.base.identity()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("device_class".into(), json!(self.kind.device_class()));
        put(
            &mut props,
            "is_on",
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
