//! Invoke an entity command and show the state reported afterwards.

use serde_json::{Map, Value};

use cozytouch_config::Settings;
use cozytouch_core::{Integration, setup};

use crate::cli::CallArgs;
use crate::config::build_client;
use crate::error::CliError;
use crate::output::Printer;

use super::entities::{EntityView, detail};

pub async fn handle(
    settings: &Settings,
    args: CallArgs,
    out: &Printer,
) -> Result<(), CliError> {
    let params = parse_args(args.args.as_deref())?;

    let integration = setup(build_client(settings)?, settings.integration_config()).await?;
    let result = call(&integration, &args, &params, out).await;
    integration.teardown().await;
    result
}

fn parse_args(raw: Option<&str>) -> Result<Value, CliError> {
    let Some(raw) = raw else {
        return Ok(Value::Object(Map::new()));
    };
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(CliError::Validation {
            field: "args".into(),
            reason: "must be a JSON object".into(),
        });
    }
    Ok(value)
}

async fn call(
    integration: &Integration,
    args: &CallArgs,
    params: &Value,
    out: &Printer,
) -> Result<(), CliError> {
    let entity = integration.entity(&args.entity).ok_or_else(|| CliError::NotFound {
        resource_type: "entity".into(),
        identifier: args.entity.clone(),
        list_command: "entities".into(),
    })?;
    let entity_id = entity.identity().entity_id();

    // Subscribe first so the refresh triggered by the command is not missed
    let mut snapshots = integration.coordinator().subscribe();
    integration.invoke(&entity_id, &args.command, params).await?;

    if !args.no_wait {
        let wait = integration.coordinator().config().refresh_timeout;
        let refreshed = tokio::time::timeout(wait, snapshots.changed()).await;
        if !matches!(refreshed, Ok(Some(_))) {
            tracing::warn!(
                entity_id = %entity_id,
                "no refreshed state yet, showing the last known one"
            );
        }
    }

    let view = EntityView::of(entity);
    out.single(&view, |v| detail(v, out), |v| v.entity_id.clone());
    Ok(())
}
