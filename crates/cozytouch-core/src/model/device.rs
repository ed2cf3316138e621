// ── DeviceModel ──
//
// Typed view of one remote node. State is copied verbatim from the payload
// and only reachable through `get_state` and its typed helpers; a new
// `DeviceModel` is built on every refresh, never patched in place.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use super::state::StateKey;
use super::widget::Widget;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceModel {
    pub id: String,
    pub widget: Widget,
    pub name: String,
    pub manufacturer: Option<String>,
    pub place_id: Option<String>,
    pub parent_id: Option<String>,
    #[serde(rename = "state")]
    state: BTreeMap<StateKey, Value>,
}

impl DeviceModel {
    pub fn new(id: impl Into<String>, widget: Widget) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            widget,
            manufacturer: None,
            place_id: None,
            parent_id: None,
            state: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: Option<String>) -> Self {
        self.manufacturer = manufacturer;
        self
    }

    pub fn with_place(mut self, place_id: Option<String>) -> Self {
        self.place_id = place_id;
        self
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_state(mut self, key: StateKey, value: impl Into<Value>) -> Self {
        self.state.insert(key, value.into());
        self
    }

    /// Copy recognised entries from a raw state map, dropping unknown keys.
    pub(crate) fn with_raw_state(mut self, raw: Map<String, Value>) -> Self {
        for (name, value) in raw {
            match StateKey::from_str(&name) {
                Ok(key) => {
                    self.state.insert(key, value);
                }
                Err(_) => trace!(device_id = %self.id, key = %name, "ignoring unknown state key"),
            }
        }
        self
    }

    // ── State access ─────────────────────────────────────────────────

    pub fn get_state(&self, key: StateKey) -> Option<&Value> {
        self.state.get(&key)
    }

    /// Like [`get_state`](Self::get_state) but falls back to `default`.
    pub fn get_state_or<'a>(&'a self, key: StateKey, default: &'a Value) -> &'a Value {
        self.state.get(&key).unwrap_or(default)
    }

    pub fn is_state_supported(&self, key: StateKey) -> bool {
        self.state.contains_key(&key)
    }

    /// State keys this instance actually reported.
    pub fn capabilities(&self) -> impl Iterator<Item = StateKey> + '_ {
        self.state.keys().copied()
    }

    pub fn state_str(&self, key: StateKey) -> Option<&str> {
        self.get_state(key).and_then(Value::as_str)
    }

    /// Numeric state. The cloud sends some numbers as strings (`"21.0"`).
    pub fn state_f64(&self, key: StateKey) -> Option<f64> {
        match self.get_state(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn state_i64(&self, key: StateKey) -> Option<i64> {
        match self.get_state(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(round_to_i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `"on"`/`"off"` strings and JSON booleans.
    pub fn state_bool(&self, key: StateKey) -> Option<bool> {
        match self.get_state(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "on" | "true" | "active" => Some(true),
                "off" | "false" | "inactive" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    // ── Derived properties ───────────────────────────────────────────

    pub fn operating_mode(&self) -> Option<&str> {
        match self.widget {
            Widget::WaterHeater => self.state_str(StateKey::DhwMode),
            Widget::ApcWaterHeater => self.state_str(StateKey::ApcDhwMode),
            _ => self.state_str(StateKey::OperatingMode),
        }
    }

    pub fn temperature(&self) -> Option<f64> {
        self.state_f64(StateKey::Temperature)
    }

    pub fn comfort_temperature(&self) -> Option<f64> {
        self.state_f64(StateKey::ComfortTemperature)
    }

    pub fn eco_temperature(&self) -> Option<f64> {
        self.state_f64(StateKey::EcoTemperature)
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.state_f64(StateKey::TargetTemperature)
    }

    pub fn targeting_heating_level(&self) -> Option<&str> {
        self.state_str(StateKey::TargetingHeatingLevel)
    }

    /// On/off for switches. Falls back to "operating mode is not standby"
    /// for heaters that do not report an explicit on/off state.
    pub fn is_on(&self) -> Option<bool> {
        let explicit = match self.widget {
            Widget::WaterHeater | Widget::ApcWaterHeater => self.state_bool(StateKey::DhwOnOff),
            Widget::ApcHeatingZone => self.state_bool(StateKey::HeatingOnOff),
            _ => self.state_bool(StateKey::OnOff),
        };
        explicit.or_else(|| {
            self.state_str(StateKey::OperatingMode)
                .map(|mode| mode != "standby" && mode != "off")
        })
    }

    pub fn is_away(&self) -> Option<bool> {
        match self.widget {
            Widget::WaterHeater | Widget::ApcWaterHeater => self
                .state_i64(StateKey::AwayModeDuration)
                .map(|days| days > 0),
            _ => self.state_bool(StateKey::HolidaysMode),
        }
    }

    pub fn is_boost(&self) -> Option<bool> {
        self.state_i64(StateKey::BoostModeDuration).map(|days| days > 0)
    }

    pub fn is_occupied(&self) -> Option<bool> {
        self.state_str(StateKey::Occupancy).map(|s| s == "personInside")
    }

    pub fn is_open(&self) -> Option<bool> {
        self.state_str(StateKey::Contact).map(|s| s == "open")
    }

    /// Cumulative electrical consumption as reported (Wh).
    pub fn consumption(&self) -> Option<f64> {
        self.state_f64(StateKey::ElectricEnergyConsumption)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn round_to_i64(v: f64) -> i64 {
    v.round() as i64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn heater() -> DeviceModel {
        DeviceModel::new("H1", Widget::Heater)
            .with_state(StateKey::OperatingMode, "basic")
            .with_state(StateKey::ComfortTemperature, "21.0")
            .with_state(StateKey::EcoTemperature, 18)
    }

    #[test]
    fn numeric_strings_parse() {
        let h = heater();
        assert_eq!(h.comfort_temperature(), Some(21.0));
        assert_eq!(h.eco_temperature(), Some(18.0));
        assert_eq!(h.target_temperature(), None);
    }

    #[test]
    fn get_state_or_default() {
        let h = heater();
        let fallback = json!("n/a");
        assert_eq!(h.get_state_or(StateKey::Temperature, &fallback), &fallback);
        assert_eq!(
            h.get_state_or(StateKey::OperatingMode, &fallback),
            &json!("basic")
        );
    }

    #[test]
    fn capabilities_follow_present_keys() {
        let h = heater();
        assert!(h.is_state_supported(StateKey::ComfortTemperature));
        assert!(!h.is_state_supported(StateKey::TargetingHeatingLevel));
        assert_eq!(h.capabilities().count(), 3);
    }

    #[test]
    fn unknown_raw_keys_are_dropped() {
        let mut raw = Map::new();
        raw.insert("core:TemperatureState".into(), json!(19.5));
        raw.insert("vendor:Mystery".into(), json!("?"));
        let s = DeviceModel::new("S1", Widget::Temperature).with_raw_state(raw);
        assert_eq!(s.capabilities().collect::<Vec<_>>(), vec![StateKey::Temperature]);
        assert_eq!(s.temperature(), Some(19.5));
    }

    #[test]
    fn on_off_falls_back_to_operating_mode() {
        assert_eq!(heater().is_on(), Some(true));
        let off =
            DeviceModel::new("H2", Widget::Heater).with_state(StateKey::OperatingMode, "standby");
        assert_eq!(off.is_on(), Some(false));
        let explicit = off.with_state(StateKey::OnOff, "on");
        assert_eq!(explicit.is_on(), Some(true));
    }

    #[test]
    fn water_heater_durations() {
        let wh = DeviceModel::new("W1", Widget::WaterHeater)
            .with_state(StateKey::AwayModeDuration, "0")
            .with_state(StateKey::BoostModeDuration, 7);
        assert_eq!(wh.is_away(), Some(false));
        assert_eq!(wh.is_boost(), Some(true));
    }
}
