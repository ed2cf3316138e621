// ── Heater on/off switch ──

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{Entity, EntityBase, EntityIdentity, put};
use crate::command::DeviceCommand;
use crate::coordinator::Coordinator;
use crate::error::CoreError;

pub struct SwitchEntity {
    base: EntityBase,
}

impl SwitchEntity {
    pub fn new(coordinator: Coordinator, identity: EntityIdentity) -> Self {
        Self {
            base: EntityBase::new(coordinator, identity),
        }
    }

    fn is_on(&self) -> Option<bool> {
        self.base.device()?.is_on()
    }
}

#[async_trait]
impl Entity for SwitchEntity {
    fn identity(&self) -> &EntityIdentity {
        self.base.identity()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("device_class".into(), json!("heat"));
        put(&mut props, "is_on", self.is_on());
        props
    }

    fn commands(&self) -> Vec<&'static str> {
        vec!["turn_on", "turn_off", "toggle"]
    }

    async fn invoke_command(&self, name: &str, _args: &Value) -> Result<(), CoreError> {
        let command = match name {
            "turn_on" => DeviceCommand::TurnOn,
            "turn_off" => DeviceCommand::TurnOff,
            "toggle" if self.is_on() == Some(true) => DeviceCommand::TurnOff,
            "toggle" => DeviceCommand::TurnOn,
            _ => return Err(self.base.unknown_command(name)),
        };
        self.base.send(command).await
    }
}
