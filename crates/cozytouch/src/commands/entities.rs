//! Entity listing and detail view.

use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use tabled::Tabled;

use cozytouch_config::Settings;
use cozytouch_core::{Entity, Integration, Platform, setup};

use crate::cli::EntitiesArgs;
use crate::config::build_client;
use crate::error::CliError;
use crate::output::{self, Printer};

// ── Views ───────────────────────────────────────────────────────────

/// Serializable point-in-time view of one entity.
#[derive(Debug, Serialize)]
pub struct EntityView {
    pub entity_id: String,
    pub platform: Platform,
    pub name: String,
    pub device_id: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
    pub available: bool,
    pub properties: Map<String, Value>,
    pub commands: Vec<&'static str>,
}

impl EntityView {
    pub fn of(entity: &dyn Entity) -> Self {
        let identity = entity.identity();
        Self {
            entity_id: identity.entity_id(),
            platform: identity.platform,
            name: identity.name.clone(),
            device_id: identity.device_id.clone(),
            model: identity.model.clone(),
            via_device: identity.via_device.clone(),
            available: entity.available(),
            properties: entity.properties(),
            commands: entity.commands(),
        }
    }

    /// The one property that best summarises the entity in a table.
    pub fn headline(&self) -> String {
        let key = match self.platform {
            Platform::Climate => "hvac_mode",
            Platform::WaterHeater => "current_operation",
            Platform::Switch | Platform::BinarySensor => "is_on",
            Platform::Sensor => "state",
        };
        let mut value = self.properties.get(key).map_or_else(|| "-".into(), output::cell);
        if let Some(unit) = self.properties.get("unit_of_measurement").and_then(Value::as_str) {
            value = format!("{value} {unit}");
        }
        value
    }
}

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "State")]
    state: String,
}

pub fn detail(view: &EntityView, out: &Printer) -> String {
    let mut lines = vec![
        format!("Entity:    {}", view.entity_id),
        format!("Name:      {}", view.name),
        format!("Device:    {}", view.device_id),
        format!("Model:     {}", view.model),
        format!("Via:       {}", view.via_device.as_deref().unwrap_or("-")),
        format!("Available: {}", out.availability(view.available)),
    ];
    if !view.properties.is_empty() {
        lines.push(String::new());
        let width = view.properties.keys().map(String::len).max().unwrap_or(0);
        for (key, value) in &view.properties {
            lines.push(format!("  {key:<width$}  {}", output::cell(value)));
        }
    }
    lines.push(String::new());
    lines.push(out.dim(&format!("Commands: {}", view.commands.join(", "))));
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    settings: &Settings,
    args: EntitiesArgs,
    out: &Printer,
) -> Result<(), CliError> {
    let platform = args
        .platform
        .as_deref()
        .map(Platform::from_str)
        .transpose()
        .map_err(|_| CliError::Validation {
            field: "platform".into(),
            reason: "expected one of climate, water_heater, switch, sensor, binary_sensor".into(),
        })?;

    let integration = setup(build_client(settings)?, settings.integration_config()).await?;
    let result = render(&integration, platform, args.entity.as_deref(), out);
    integration.teardown().await;
    result
}

fn render(
    integration: &Integration,
    platform: Option<Platform>,
    entity: Option<&str>,
    out: &Printer,
) -> Result<(), CliError> {
    if let Some(id) = entity {
        let entity = integration.entity(id).ok_or_else(|| CliError::NotFound {
            resource_type: "entity".into(),
            identifier: id.to_owned(),
            list_command: "entities".into(),
        })?;
        let view = EntityView::of(entity);
        out.single(&view, |v| detail(v, out), |v| v.entity_id.clone());
        return Ok(());
    }

    let views: Vec<EntityView> = integration
        .entities()
        .filter(|e| platform.is_none_or(|p| e.platform() == p))
        .map(EntityView::of)
        .collect();

    out.list(
        &views,
        |v| EntityRow {
            entity_id: v.entity_id.clone(),
            name: v.name.clone(),
            available: out.availability(v.available),
            state: v.headline(),
        },
        |v| v.entity_id.clone(),
    );
    Ok(())
}
