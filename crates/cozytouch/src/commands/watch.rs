//! Continuous refresh: print every published snapshot until interrupted.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use cozytouch_config::Settings;
use cozytouch_core::{Integration, RefreshState, SetupTree, setup};

use crate::cli::WatchArgs;
use crate::config::build_client;
use crate::error::CliError;
use crate::output::Printer;

use super::entities::EntityView;

#[derive(Serialize)]
struct SnapshotEvent {
    built_at: DateTime<Utc>,
    devices: usize,
    skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    entities: Vec<EntityView>,
}

pub async fn handle(
    mut settings: Settings,
    args: WatchArgs,
    out: &Printer,
) -> Result<(), CliError> {
    if let Some(interval) = args.interval {
        settings.poll_interval_secs = interval;
        settings.validate()?;
    }

    let config = settings.integration_config();
    let interval = config.coordinator.poll_interval;
    let integration = setup(build_client(&settings)?, config).await?;
    out.note(&format!(
        "Watching every {} (Ctrl-C to stop)",
        humantime::format_duration(interval)
    ));

    let result = watch(&integration, args.entities, out).await;
    integration.teardown().await;
    result
}

async fn watch(
    integration: &Integration,
    with_entities: bool,
    out: &Printer,
) -> Result<(), CliError> {
    let coordinator = integration.coordinator();
    let mut snapshots = coordinator.subscribe();
    let mut state = coordinator.watch_state();

    if let Some(tree) = snapshots.current() {
        print_snapshot(integration, tree, with_entities, out);
    }

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => return Ok(()),
            changed = snapshots.changed() => match changed {
                Some(tree) => print_snapshot(integration, &tree, with_entities, out),
                None => return Ok(()),
            },
            res = state.changed() => {
                if res.is_err() {
                    return Ok(());
                }
                if *state.borrow_and_update() != RefreshState::Failed {
                    continue;
                }
                let message = coordinator
                    .last_error()
                    .map_or_else(|| "refresh failed".to_owned(), |e| e.to_string());
                // Automatic refresh has stopped; nothing more will arrive
                if coordinator.requires_reauth() {
                    return Err(CliError::AuthFailed { message });
                }
                out.note(&out.warn(&format!("{}  {message}", clock())));
            }
        }
    }
}

fn print_snapshot(
    integration: &Integration,
    tree: &SetupTree,
    with_entities: bool,
    out: &Printer,
) {
    let entities: Vec<EntityView> = if with_entities {
        integration.entities().map(EntityView::of).collect()
    } else {
        Vec::new()
    };

    if out.is_structured() {
        out.event(&SnapshotEvent {
            built_at: tree.built_at(),
            devices: tree.len(),
            skipped: tree.diagnostics().len(),
            entities,
        });
        return;
    }

    let skipped = match tree.diagnostics().len() {
        0 => String::new(),
        n => format!(", {n} skipped"),
    };
    out.line(&format!("{}  {} devices{skipped}", clock(), tree.len()));
    for view in &entities {
        out.line(&format!(
            "  {:<40} {:<5} {}",
            view.entity_id,
            out.availability(view.available),
            view.headline()
        ));
    }
}

fn clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
