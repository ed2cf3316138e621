// ── Integration lifecycle ──
//
// Ties one client, one coordinator and the discovered entities together
// for the lifetime of a configured account.

use std::collections::HashMap;
use std::sync::Arc;

use cozytouch_api::RemoteClient;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::IntegrationConfig;
use crate::coordinator::Coordinator;
use crate::entity::{Entity, discover_entities};
use crate::error::CoreError;

/// A running integration: coordinator plus entity adapters.
pub struct Integration {
    coordinator: Coordinator,
    entities: Vec<Box<dyn Entity>>,
    by_entity_id: HashMap<String, usize>,
}

/// Perform the first refresh, start periodic refreshes and discover
/// entities from the first snapshot.
///
/// Fails with [`CoreError::AuthFailure`] on bad credentials and
/// [`CoreError::UpdateFailed`] when the cloud cannot be reached; no worker
/// is left running in either case.
pub async fn setup(
    client: Arc<dyn RemoteClient>,
    config: IntegrationConfig,
) -> Result<Integration, CoreError> {
    let coordinator = Coordinator::new(client, config.coordinator);
    let tree = match coordinator.first_refresh().await {
        Ok(tree) => tree,
        Err(e) => {
            warn!(error = %e, "setup failed");
            coordinator.shutdown().await;
            return Err(e);
        }
    };

    coordinator.start().await;
    let entities = discover_entities(&coordinator, &tree, config.actuator);
    let by_entity_id = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.identity().entity_id(), i))
        .collect();

    info!(
        devices = tree.len(),
        entities = entities.len(),
        "integration ready"
    );

    Ok(Integration {
        coordinator,
        entities,
        by_entity_id,
    })
}

impl Integration {
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn entities(&self) -> impl Iterator<Item = &dyn Entity> {
        self.entities.iter().map(AsRef::as_ref)
    }

    /// Look an entity up by `platform.unique_id`, or by bare unique id when
    /// exactly one platform uses it.
    pub fn entity(&self, id: &str) -> Option<&dyn Entity> {
        if let Some(&i) = self.by_entity_id.get(id) {
            return Some(self.entities[i].as_ref());
        }
        let mut matches = self
            .entities
            .iter()
            .filter(|e| e.identity().unique_id == id);
        match (matches.next(), matches.next()) {
            (Some(entity), None) => Some(entity.as_ref()),
            _ => None,
        }
    }

    /// Invoke `command` on the entity identified by `id`.
    pub async fn invoke(&self, id: &str, command: &str, args: &Value) -> Result<(), CoreError> {
        let entity = self.entity(id).ok_or_else(|| CoreError::EntityNotFound {
            unique_id: id.to_owned(),
        })?;
        entity.invoke_command(command, args).await
    }

    /// Stop refreshing and release the entities. An in-flight refresh is
    /// discarded.
    pub async fn teardown(self) {
        self.coordinator.shutdown().await;
        info!(entities = self.entities.len(), "integration unloaded");
    }
}
