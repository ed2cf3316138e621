//! State synchronization and command layer for Cozytouch heating devices.
//!
//! - **[`Coordinator`]** owns the refresh cycle. Every successful refresh
//!   builds a new immutable [`SetupTree`] and swaps it in atomically;
//!   readers never see a partially updated tree.
//!
//! - **[`SetupTree`]** is the normalized device hierarchy (places, gateways,
//!   devices and sub-devices) with per-category views.
//!
//! - **[`DeviceModel`]** is one device's capabilities and state, plus the
//!   typed [`DeviceCommand`] surface. Commands never mutate local state:
//!   the next refresh reports the result.
//!
//! - **Entities** ([`entity`]) project devices onto a host vocabulary
//!   (climate, water heater, switch, sensor, binary sensor) and are wired
//!   up by [`integration::setup`].

pub mod command;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod integration;
pub mod model;
pub mod stream;
pub mod tree;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{DeviceCommand, Setpoint, ThermalMode};
pub use config::{ActuatorFilter, CoordinatorConfig, IntegrationConfig};
pub use coordinator::{Coordinator, ListenerId, RefreshState};
pub use entity::{Entity, EntityIdentity, Platform, discover_entities};
pub use error::{CommandError, CommandErrorKind, CoreError, MalformedNodeError, RefreshError};
pub use integration::{Integration, setup};
pub use model::{DeviceModel, Place, StateKey, Widget, WidgetCategory};
pub use stream::SnapshotStream;
pub use tree::SetupTree;
