// ── Setup tree ──
//
// One immutable snapshot of the account: a flat device index plus derived
// per-category views, built in a single pre-order walk over the payload.
// A refresh always builds a fresh tree; nothing here is ever mutated after
// `build` returns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cozytouch_api::{RawGateway, RawNode, RawSetup};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{MalformedNodeError, MalformedReason};
use crate::model::{DeviceModel, Place, StateKey, Widget, WidgetCategory};

#[derive(Debug, Clone)]
pub struct SetupTree {
    devices: IndexMap<String, Arc<DeviceModel>>,
    places: IndexMap<String, Place>,
    heaters: Vec<Arc<DeviceModel>>,
    water_heaters: Vec<Arc<DeviceModel>>,
    boilers: Vec<Arc<DeviceModel>>,
    sensors: Vec<Arc<DeviceModel>>,
    gateways: Vec<Arc<DeviceModel>>,
    diagnostics: Vec<MalformedNodeError>,
    built_at: DateTime<Utc>,
}

impl SetupTree {
    /// Build a tree from a raw payload.
    ///
    /// Never fails: nodes without an `id` or `widget` are skipped together
    /// with their sub-devices, and recorded in [`diagnostics`](Self::diagnostics).
    /// Places and gateways without an id are skipped the same way.
    pub fn build(raw: RawSetup) -> Self {
        let mut builder = TreeBuilder::default();

        for (i, place) in raw.places.into_iter().enumerate() {
            let Some(id) = place.id else {
                builder.reject(format!("places[{i}]"), None, MalformedReason::MissingId);
                continue;
            };
            let name = place.name.unwrap_or_else(|| id.clone());
            builder.places.insert(id.clone(), Place { id, name });
        }

        for (i, gateway) in raw.gateways.into_iter().enumerate() {
            builder.add_gateway(format!("gateways[{i}]"), gateway);
        }

        for (i, node) in raw.devices.into_iter().enumerate() {
            builder.add_node(format!("devices[{i}]"), node, None, None);
        }

        let tree = builder.finish();
        debug!(
            devices = tree.devices.len(),
            heaters = tree.heaters.len(),
            water_heaters = tree.water_heaters.len(),
            sensors = tree.sensors.len(),
            skipped = tree.diagnostics.len(),
            "setup tree built"
        );
        tree
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn device(&self, id: &str) -> Option<&Arc<DeviceModel>> {
        self.devices.get(id)
    }

    /// Every node in discovery order.
    pub fn devices(&self) -> impl Iterator<Item = &Arc<DeviceModel>> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn heaters(&self) -> &[Arc<DeviceModel>] {
        &self.heaters
    }

    pub fn water_heaters(&self) -> &[Arc<DeviceModel>] {
        &self.water_heaters
    }

    pub fn boilers(&self) -> &[Arc<DeviceModel>] {
        &self.boilers
    }

    pub fn sensors(&self) -> &[Arc<DeviceModel>] {
        &self.sensors
    }

    pub fn gateways(&self) -> &[Arc<DeviceModel>] {
        &self.gateways
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn place_name(&self, place_id: &str) -> Option<&str> {
        self.places.get(place_id).map(|p| p.name.as_str())
    }

    /// Direct children of `parent_id`, in discovery order.
    pub fn children<'a>(
        &'a self,
        parent_id: &'a str,
    ) -> impl Iterator<Item = &'a Arc<DeviceModel>> {
        self.devices
            .values()
            .filter(move |d| d.parent_id.as_deref() == Some(parent_id))
    }

    /// Sensors attached to `parent_id`.
    pub fn sensors_of<'a>(
        &'a self,
        parent_id: &'a str,
    ) -> impl Iterator<Item = &'a Arc<DeviceModel>> {
        self.sensors
            .iter()
            .filter(move |d| d.parent_id.as_deref() == Some(parent_id))
    }

    /// Nodes skipped during construction.
    pub fn diagnostics(&self) -> &[MalformedNodeError] {
        &self.diagnostics
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

// ── Builder ──────────────────────────────────────────────────────────

#[derive(Default)]
struct TreeBuilder {
    devices: IndexMap<String, Arc<DeviceModel>>,
    places: IndexMap<String, Place>,
    heaters: Vec<Arc<DeviceModel>>,
    water_heaters: Vec<Arc<DeviceModel>>,
    boilers: Vec<Arc<DeviceModel>>,
    sensors: Vec<Arc<DeviceModel>>,
    gateways: Vec<Arc<DeviceModel>>,
    diagnostics: Vec<MalformedNodeError>,
}

impl TreeBuilder {
    fn add_gateway(&mut self, path: String, gateway: RawGateway) {
        let Some(id) = gateway.gateway_id else {
            self.reject(path, None, MalformedReason::MissingId);
            return;
        };

        let mut device = DeviceModel::new(id.clone(), Widget::Gateway)
            .with_name(format!("Gateway {id}"))
            .with_place(gateway.place_id);
        if let Some(alive) = gateway.alive {
            let status = if alive { "available" } else { "unavailable" };
            device = device.with_state(StateKey::Status, status);
        }
        if let Some(version) = gateway.connectivity.protocol_version {
            device = device.with_state(StateKey::ProtocolVersion, Value::String(version));
        }

        self.insert(path, device);
    }

    /// Pre-order: the node, then its sub-devices with `parent_id` forced
    /// to this node and the place inherited when the child has none.
    fn add_node(
        &mut self,
        path: String,
        node: RawNode,
        parent_id: Option<&str>,
        parent_place: Option<&str>,
    ) {
        let RawNode {
            id,
            widget,
            name,
            place_id,
            parent_id: raw_parent,
            manufacturer,
            state,
            subdevices,
        } = node;

        let Some(id) = id.filter(|id| !id.is_empty()) else {
            self.reject(path, None, MalformedReason::MissingId);
            return;
        };
        let Some(widget) = widget.filter(|w| !w.is_empty()) else {
            self.reject(path, Some(id), MalformedReason::MissingWidget);
            return;
        };

        let widget = Widget::parse(&widget);
        if !widget.is_known() {
            debug!(device_id = %id, widget = %widget, "unrecognised widget, indexing only");
        }

        let place_id = place_id.or_else(|| parent_place.map(str::to_owned));
        let parent = parent_id.map(str::to_owned).or(raw_parent);
        let device = DeviceModel::new(id.clone(), widget)
            .with_name(name.unwrap_or_else(|| id.clone()))
            .with_manufacturer(manufacturer)
            .with_place(place_id.clone())
            .with_parent(parent)
            .with_raw_state(state);

        if !self.insert(path.clone(), device) {
            return;
        }

        for (i, child) in subdevices.into_iter().enumerate() {
            self.add_node(
                format!("{path}.subdevices[{i}]"),
                child,
                Some(&id),
                place_id.as_deref(),
            );
        }
    }

    /// Index a device and append it to its category view. Returns `false`
    /// if the id was already taken (first occurrence wins).
    fn insert(&mut self, path: String, device: DeviceModel) -> bool {
        let device = Arc::new(device);
        match self.devices.entry(device.id.clone()) {
            Entry::Occupied(_) => {
                self.reject(path, Some(device.id.clone()), MalformedReason::DuplicateId);
                return false;
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&device));
            }
        }

        let view = match device.widget.category() {
            Some(WidgetCategory::Heater) => &mut self.heaters,
            Some(WidgetCategory::WaterHeater) => &mut self.water_heaters,
            Some(WidgetCategory::Boiler) => &mut self.boilers,
            Some(WidgetCategory::Sensor) => &mut self.sensors,
            Some(WidgetCategory::Gateway) => &mut self.gateways,
            None => return true,
        };
        view.push(device);
        true
    }

    fn reject(&mut self, path: String, id: Option<String>, reason: MalformedReason) {
        let err = MalformedNodeError { path, id, reason };
        warn!(error = %err, "malformed setup node");
        self.diagnostics.push(err);
    }

    fn finish(self) -> SetupTree {
        SetupTree {
            devices: self.devices,
            places: self.places,
            heaters: self.heaters,
            water_heaters: self.water_heaters,
            boilers: self.boilers,
            sensors: self.sensors,
            gateways: self.gateways,
            diagnostics: self.diagnostics,
            built_at: Utc::now(),
        }
    }
}
