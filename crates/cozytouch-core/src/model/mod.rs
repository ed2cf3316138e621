// ── Domain model ──
//
// Widget tags, state keys and the per-node `DeviceModel`. Commands that
// act on a device live in `crate::command`.

pub mod device;
pub mod place;
pub mod state;
pub mod widget;

pub use device::DeviceModel;
pub use place::Place;
pub use state::StateKey;
pub use widget::{Widget, WidgetCategory};
