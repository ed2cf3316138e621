// ── State keys ──
//
// Every unit of remote state we understand. Keys outside this set are
// dropped when a device is built from its raw payload, so adapters can
// only ever reach state through a typed key.

use serde::Serialize;
use strum::{EnumIter, EnumString, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    IntoStaticStr,
    EnumIter,
    Serialize,
)]
#[serde(into = "&'static str")]
pub enum StateKey {
    // ── Generic ──────────────────────────────────────────────────────
    #[strum(serialize = "core:StatusState")]
    Status,
    #[strum(serialize = "core:NameState")]
    Name,
    #[strum(serialize = "core:ProtocolVersionState")]
    ProtocolVersion,
    #[strum(serialize = "core:OnOffState")]
    OnOff,

    // ── Heating ──────────────────────────────────────────────────────
    #[strum(serialize = "core:OperatingModeState")]
    OperatingMode,
    #[strum(serialize = "io:TargetHeatingLevelState")]
    TargetingHeatingLevel,
    #[strum(serialize = "core:ComfortRoomTemperatureState")]
    ComfortTemperature,
    #[strum(serialize = "core:EcoRoomTemperatureState")]
    EcoTemperature,
    #[strum(serialize = "core:TargetTemperatureState")]
    TargetTemperature,
    #[strum(serialize = "core:HolidaysModeState")]
    HolidaysMode,

    // ── Heating/cooling zones ────────────────────────────────────────
    #[strum(serialize = "io:PassAPCHeatingModeState")]
    HeatingMode,
    #[strum(serialize = "core:HeatingOnOffState")]
    HeatingOnOff,
    #[strum(serialize = "core:ComfortHeatingTargetTemperatureState")]
    ComfortHeatingTargetTemperature,
    #[strum(serialize = "core:EcoHeatingTargetTemperatureState")]
    EcoHeatingTargetTemperature,
    #[strum(serialize = "io:PassAPCCoolingModeState")]
    CoolingMode,
    #[strum(serialize = "core:CoolingOnOffState")]
    CoolingOnOff,
    #[strum(serialize = "core:ComfortCoolingTargetTemperatureState")]
    ComfortCoolingTargetTemperature,
    #[strum(serialize = "core:EcoCoolingTargetTemperatureState")]
    EcoCoolingTargetTemperature,
    #[strum(serialize = "core:ThermalConfigurationState")]
    ThermalConfiguration,

    // ── Domestic hot water ───────────────────────────────────────────
    #[strum(serialize = "io:DHWModeState")]
    DhwMode,
    #[strum(serialize = "io:PassAPCDHWModeState")]
    ApcDhwMode,
    #[strum(serialize = "core:DHWOnOffState")]
    DhwOnOff,
    #[strum(serialize = "core:DHWCapacityState")]
    DhwCapacity,
    #[strum(serialize = "core:MaximalTemperatureManualModeState")]
    MaxTemperatureManualMode,
    #[strum(serialize = "core:MinimalTemperatureManualModeState")]
    MinTemperatureManualMode,
    #[strum(serialize = "core:ComfortTargetDHWTemperatureState")]
    ComfortTargetDhwTemperature,
    #[strum(serialize = "core:EcoTargetDHWTemperatureState")]
    EcoTargetDhwTemperature,
    #[strum(serialize = "io:OperatingModeCapabilitiesState")]
    OperatingModeCapabilities,
    #[strum(serialize = "io:AwayModeDurationState")]
    AwayModeDuration,
    #[strum(serialize = "core:BoostModeDurationState")]
    BoostModeDuration,
    #[strum(serialize = "core:BoostStartDateState")]
    BoostStartDate,
    #[strum(serialize = "core:BoostEndDateState")]
    BoostEndDate,
    #[strum(serialize = "core:AntiLegionellosisState")]
    AntiLegionellosis,
    #[strum(serialize = "core:ProgrammingSlotsState")]
    ProgrammingSlots,
    #[strum(serialize = "core:V40WaterVolumeEstimationState")]
    V40WaterVolumeEstimation,
    #[strum(serialize = "io:ElectricBoosterOperatingTimeState")]
    ElectricBoosterOperatingTime,
    #[strum(serialize = "io:HeatPumpOperatingTimeState")]
    HeatPumpOperatingTime,
    #[strum(serialize = "core:NumberOfShowerRemainingState")]
    NumberOfShowerRemaining,
    #[strum(serialize = "io:PowerHeatElectricalState")]
    PowerHeatElectrical,
    #[strum(serialize = "io:PowerHeatPumpState")]
    PowerHeatPump,

    // ── Sensors ──────────────────────────────────────────────────────
    #[strum(serialize = "core:TemperatureState")]
    Temperature,
    #[strum(serialize = "core:OccupancyState")]
    Occupancy,
    #[strum(serialize = "core:ContactState")]
    Contact,
    #[strum(serialize = "core:ElectricEnergyConsumptionState")]
    ElectricEnergyConsumption,
}

impl StateKey {
    /// Vendor spelling, e.g. `core:OperatingModeState`.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn parses_vendor_names() {
        assert_eq!(
            StateKey::from_str("core:OperatingModeState").unwrap(),
            StateKey::OperatingMode
        );
        assert!(StateKey::from_str("core:SomethingNew").is_err());
    }

    #[test]
    fn wire_names_are_unique() {
        let names: HashSet<&str> = StateKey::iter().map(StateKey::as_str).collect();
        assert_eq!(names.len(), StateKey::iter().count());
    }

    #[test]
    fn serializes_as_wire_name() {
        assert_eq!(
            serde_json::to_value(StateKey::Temperature).unwrap(),
            serde_json::json!("core:TemperatureState")
        );
    }
}
