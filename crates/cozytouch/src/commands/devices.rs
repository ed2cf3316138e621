//! Device listing from a single refresh.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use cozytouch_config::Settings;
use cozytouch_core::{Coordinator, DeviceModel, SetupTree, WidgetCategory};

use crate::cli::DevicesArgs;
use crate::config::build_client;
use crate::error::CliError;
use crate::output::Printer;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Widget")]
    widget: String,
    #[tabled(rename = "Place")]
    place: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "States")]
    states: usize,
}

impl DeviceRow {
    fn new(tree: &SetupTree, d: &DeviceModel) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
            widget: d.widget.to_string(),
            place: d
                .place_id
                .as_deref()
                .and_then(|p| tree.place_name(p))
                .unwrap_or("-")
                .to_owned(),
            parent: d.parent_id.clone().unwrap_or_else(|| "-".into()),
            states: d.capabilities().count(),
        }
    }
}

#[derive(Clone, Serialize, Tabled)]
struct SkippedRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    settings: &Settings,
    args: DevicesArgs,
    out: &Printer,
) -> Result<(), CliError> {
    let category = args
        .category
        .as_deref()
        .map(WidgetCategory::from_str)
        .transpose()
        .map_err(|_| CliError::Validation {
            field: "category".into(),
            reason: "expected one of heater, water_heater, boiler, sensor, gateway".into(),
        })?;

    let coordinator = Coordinator::new(build_client(settings)?, settings.coordinator_config());
    let refreshed = coordinator.first_refresh().await;
    coordinator.shutdown().await;
    let tree = refreshed?;

    let devices: Vec<Arc<DeviceModel>> = tree
        .devices()
        .filter(|d| category.is_none_or(|c| d.widget.category() == Some(c)))
        .cloned()
        .collect();

    out.list(&devices, |d| DeviceRow::new(&tree, d), |d| d.id.clone());

    if args.diagnostics {
        let skipped: Vec<SkippedRow> = tree
            .diagnostics()
            .iter()
            .map(|e| SkippedRow {
                path: e.path.clone(),
                id: e.id.clone().unwrap_or_else(|| "-".into()),
                reason: e.reason.to_string(),
            })
            .collect();
        if skipped.is_empty() {
            out.note("No nodes were skipped");
        } else {
            out.list(&skipped, SkippedRow::clone, |s| s.path.clone());
        }
    }

    Ok(())
}
