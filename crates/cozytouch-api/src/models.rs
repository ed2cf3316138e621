// ── Raw setup payload ──
//
// Wire shapes returned by `GET /setup`. Everything here deserializes
// leniently: a field of the wrong type reads as absent and a list entry
// that is not an object reads as an empty node, so one malformed entry
// never fails the whole payload. Tree construction decides what to keep.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The full account topology as reported by the cloud in one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSetup {
    #[serde(default, deserialize_with = "lenient::list")]
    pub places: Vec<RawPlace>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub gateways: Vec<RawGateway>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub devices: Vec<RawNode>,
}

/// A room or zone grouping devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlace {
    #[serde(default, alias = "oid", deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, alias = "label", deserialize_with = "lenient::string")]
    pub name: Option<String>,
}

/// A physical bridge between local devices and the cloud.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGateway {
    #[serde(default, deserialize_with = "lenient::string")]
    pub gateway_id: Option<String>,
    #[serde(default, alias = "placeOID", deserialize_with = "lenient::string")]
    pub place_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub alive: Option<bool>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub connectivity: RawConnectivity,
}

/// `connectivity` block of a gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConnectivity {
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub protocol_version: Option<String>,
}

/// One device node, possibly with nested sub-devices (sensors, zones).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    #[serde(default, alias = "deviceURL", deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, alias = "uiWidget", deserialize_with = "lenient::string")]
    pub widget: Option<String>,
    #[serde(default, alias = "label", deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(default, alias = "placeOID", deserialize_with = "lenient::string")]
    pub place_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "lenient::map")]
    pub state: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub subdevices: Vec<RawNode>,
}

mod lenient {
    use super::{Deserialize, DeserializeOwned, Deserializer, Map, Value};

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Value::deserialize(d)?.as_bool())
    }

    pub fn map<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Object(m) => m,
            _ => Map::new(),
        })
    }

    pub fn object<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(serde_json::from_value(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// A single named command with positional parameters.
///
/// Serializes as `{ "name": ..., "parameters": [...] }`, the shape the
/// `exec/apply` endpoint expects inside an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a positional parameter.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.parameters.push(value.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_without_identity_still_parses() {
        let node: RawNode = serde_json::from_value(json!({
            "state": { "core:TemperatureState": 19.5 }
        }))
        .unwrap();
        assert!(node.id.is_none());
        assert!(node.widget.is_none());
        assert_eq!(node.state.len(), 1);
    }

    #[test]
    fn vendor_aliases_accepted() {
        let node: RawNode = serde_json::from_value(json!({
            "deviceURL": "io://1234-5678/1",
            "uiWidget": "AtlanticElectricalHeater",
            "label": "Salon",
            "placeOID": "p-1",
            "unknownField": true
        }))
        .unwrap();
        assert_eq!(node.id.as_deref(), Some("io://1234-5678/1"));
        assert_eq!(node.widget.as_deref(), Some("AtlanticElectricalHeater"));
        assert_eq!(node.place_id.as_deref(), Some("p-1"));
    }

    #[test]
    fn wrongly_typed_identity_reads_as_missing() {
        let node: RawNode = serde_json::from_value(json!({
            "deviceURL": 42,
            "uiWidget": ["AtlanticElectricalHeater"],
            "label": "Salon",
            "state": null,
            "subdevices": null
        }))
        .unwrap();
        assert!(node.id.is_none());
        assert!(node.widget.is_none());
        assert_eq!(node.name.as_deref(), Some("Salon"));
        assert!(node.state.is_empty());
        assert!(node.subdevices.is_empty());
    }

    #[test]
    fn malformed_entries_keep_their_siblings() {
        let setup: RawSetup = serde_json::from_value(json!({
            "places": [{ "label": "Salon" }, { "oid": "p-1", "label": "Cuisine" }],
            "gateways": "nope",
            "devices": [
                7,
                { "deviceURL": 42, "uiWidget": "AtlanticElectricalHeater" },
                { "deviceURL": "io://1", "uiWidget": "AtlanticElectricalHeater", "state": null }
            ]
        }))
        .unwrap();

        assert_eq!(setup.places.len(), 2);
        assert!(setup.places[0].id.is_none());
        assert_eq!(setup.places[1].id.as_deref(), Some("p-1"));
        assert!(setup.gateways.is_empty());
        assert_eq!(setup.devices.len(), 3);
        assert_eq!(setup.devices[0], RawNode::default());
        assert!(setup.devices[1].id.is_none());
        assert_eq!(setup.devices[2].id.as_deref(), Some("io://1"));
        assert!(setup.devices[2].state.is_empty());
    }

    #[test]
    fn gateway_connectivity_is_nested() {
        let gateway: RawGateway = serde_json::from_value(json!({
            "gatewayId": "1234-5678-9012",
            "placeOID": "p-1",
            "alive": true,
            "connectivity": { "status": "OK", "protocolVersion": "2018.4.4-6" }
        }))
        .unwrap();
        assert_eq!(gateway.alive, Some(true));
        assert_eq!(gateway.connectivity.status.as_deref(), Some("OK"));
        assert_eq!(
            gateway.connectivity.protocol_version.as_deref(),
            Some("2018.4.4-6")
        );
    }

    #[test]
    fn command_request_shape() {
        let cmd = CommandRequest::new("setComfortTemperature").arg(21.5);
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({ "name": "setComfortTemperature", "parameters": [21.5] })
        );
    }
}
