// ── Widget tags ──
//
// The vendor reports a free-form `widget` string per node. We recognise a
// fixed set and keep anything else as `Unknown` so that new hardware shows
// up in the device index without breaking tree construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Known device-type tags. Several vendor spellings may map to one variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, IntoStaticStr, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Widget {
    #[strum(
        to_string = "AtlanticElectricalHeater",
        serialize = "AtlanticElectricalHeaterWithAdjustableTemperatureSetpoint",
        serialize = "AtlanticElectricalTowelDryer"
    )]
    Heater,
    #[strum(
        to_string = "AtlanticPilotWireInterface",
        serialize = "PilotWireInterface"
    )]
    PilotWireInterface,
    #[strum(
        to_string = "AtlanticPassAPCHeatingAndCoolingZone",
        serialize = "AtlanticPassAPCZoneControlZone"
    )]
    ApcHeatingZone,
    #[strum(
        to_string = "DomesticHotWaterProduction",
        serialize = "AtlanticDomesticHotWaterProductionV2"
    )]
    WaterHeater,
    #[strum(to_string = "AtlanticPassAPCDHW")]
    ApcWaterHeater,
    #[strum(
        to_string = "AtlanticPassAPCBoiler",
        serialize = "AtlanticPassAPCHeatPump"
    )]
    Boiler,
    #[strum(to_string = "Pod", serialize = "Gateway")]
    Gateway,
    #[strum(to_string = "TemperatureSensor")]
    Temperature,
    #[strum(to_string = "OccupancySensor")]
    Occupancy,
    #[strum(to_string = "ContactSensor")]
    Contact,
    #[strum(
        to_string = "CumulativeElectricPowerConsumptionSensor",
        serialize = "ElectricitySensor"
    )]
    Electricity,
    /// Tag we do not model; the original string is preserved.
    #[strum(default)]
    Unknown(String),
}

/// Which derived view of the setup tree a widget lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WidgetCategory {
    Heater,
    WaterHeater,
    Boiler,
    Sensor,
    Gateway,
}

impl Widget {
    pub fn category(&self) -> Option<WidgetCategory> {
        match self {
            Self::Heater | Self::PilotWireInterface | Self::ApcHeatingZone => {
                Some(WidgetCategory::Heater)
            }
            Self::WaterHeater | Self::ApcWaterHeater => Some(WidgetCategory::WaterHeater),
            Self::Boiler => Some(WidgetCategory::Boiler),
            Self::Temperature | Self::Occupancy | Self::Contact | Self::Electricity => {
                Some(WidgetCategory::Sensor)
            }
            Self::Gateway => Some(WidgetCategory::Gateway),
            Self::Unknown(_) => None,
        }
    }

    /// Vendor spelling: the canonical wire name, or the preserved unknown tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown(raw) => raw,
            known => known.into(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Resolve a vendor tag. Never fails: unrecognised tags become `Unknown`.
    pub fn parse(raw: &str) -> Self {
        // `#[strum(default)]` makes parsing infallible.
        Self::from_str(raw).unwrap_or_else(|_| Self::Unknown(raw.to_owned()))
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Widget {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Widget> for String {
    fn from(widget: Widget) -> Self {
        widget.as_str().to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn vendor_aliases_resolve() {
        assert_eq!(Widget::parse("AtlanticElectricalHeater"), Widget::Heater);
        assert_eq!(Widget::parse("AtlanticElectricalTowelDryer"), Widget::Heater);
        assert_eq!(Widget::parse("AtlanticPassAPCDHW"), Widget::ApcWaterHeater);
        assert_eq!(Widget::parse("Pod"), Widget::Gateway);
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let w = Widget::parse("SomeFutureThing");
        assert_eq!(w, Widget::Unknown("SomeFutureThing".into()));
        assert_eq!(w.as_str(), "SomeFutureThing");
        assert!(w.category().is_none());
        assert!(!w.is_known());
    }

    #[test]
    fn serde_uses_vendor_spelling() {
        let w: Widget = serde_json::from_value(serde_json::json!("Pod")).unwrap();
        assert_eq!(w, Widget::Gateway);
        let unknown: Widget = serde_json::from_value(serde_json::json!("Toaster")).unwrap();
        assert_eq!(serde_json::to_value(&unknown).unwrap(), "Toaster");
        assert_eq!(serde_json::to_value(Widget::Heater).unwrap(), "AtlanticElectricalHeater");
    }

    #[test]
    fn canonical_name_is_first_alias() {
        assert_eq!(Widget::Heater.as_str(), "AtlanticElectricalHeater");
        assert_eq!(Widget::Temperature.to_string(), "TemperatureSensor");
    }
}
