// ── Mode-mapping tables ──
//
// Vendor mode strings on one side, the host's standard vocabulary on the
// other. Widget variants differ only by which table they carry.

use serde::Serialize;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Preset {
    Sleep,
    Eco,
    Comfort,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WaterHeaterOperation {
    Eco,
    Manual,
    Auto,
    Comfort,
    Off,
    On,
    External,
}

/// Bidirectional vendor ↔ host lookup.
///
/// Vendor → host uses the first matching entry, or `fallback` for unknown
/// and absent values. Host → vendor also uses the first matching entry, so
/// when several vendor strings share a host mode the first one is what
/// gets sent.
#[derive(Debug, Clone, Copy)]
pub struct ModeTable<H: 'static> {
    entries: &'static [(&'static str, H)],
    fallback: Option<H>,
}

impl<H: Copy + PartialEq> ModeTable<H> {
    pub const fn new(entries: &'static [(&'static str, H)]) -> Self {
        Self {
            entries,
            fallback: None,
        }
    }

    pub const fn with_fallback(self, fallback: H) -> Self {
        Self {
            entries: self.entries,
            fallback: Some(fallback),
        }
    }

    pub fn to_host(&self, vendor: Option<&str>) -> Option<H> {
        vendor
            .and_then(|v| self.entries.iter().find(|(name, _)| *name == v))
            .map(|(_, host)| *host)
            .or(self.fallback)
    }

    pub fn to_vendor(&self, host: H) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, h)| *h == host)
            .map(|(name, _)| *name)
    }

    /// Host modes in table order, without duplicates.
    pub fn host_modes(&self) -> Vec<H> {
        let mut modes = Vec::with_capacity(self.entries.len());
        for (_, host) in self.entries {
            if !modes.contains(host) {
                modes.push(*host);
            }
        }
        modes
    }
}

// ── Tables ───────────────────────────────────────────────────────────

pub const HEATER_HVAC: ModeTable<HvacMode> = ModeTable::new(&[
    ("standby", HvacMode::Off),
    ("basic", HvacMode::Heat),
    ("internal", HvacMode::Auto),
    ("auto", HvacMode::Auto),
])
.with_fallback(HvacMode::Off);

pub const HEATER_PRESETS: ModeTable<Preset> = ModeTable::new(&[
    ("frostprotection", Preset::Sleep),
    ("eco", Preset::Eco),
    ("comfort", Preset::Comfort),
])
.with_fallback(Preset::Sleep);

pub const ZONE_HEATING_HVAC: ModeTable<HvacMode> = ModeTable::new(&[
    ("stop", HvacMode::Off),
    ("manu", HvacMode::Heat),
    ("internalScheduling", HvacMode::Auto),
    ("comfort", HvacMode::Heat),
    ("eco", HvacMode::Heat),
    ("absence", HvacMode::Heat),
    ("externalScheduling", HvacMode::Auto),
])
.with_fallback(HvacMode::Off);

pub const ZONE_COOLING_HVAC: ModeTable<HvacMode> = ModeTable::new(&[
    ("stop", HvacMode::Off),
    ("manu", HvacMode::Cool),
    ("internalScheduling", HvacMode::Auto),
    ("comfort", HvacMode::Cool),
    ("eco", HvacMode::Cool),
    ("absence", HvacMode::Cool),
    ("externalScheduling", HvacMode::Auto),
])
.with_fallback(HvacMode::Off);

pub const ZONE_PRESETS: ModeTable<Preset> = ModeTable::new(&[
    ("comfort", Preset::Comfort),
    ("eco", Preset::Eco),
    ("absence", Preset::Away),
]);

pub const DHW_OPERATIONS: ModeTable<WaterHeaterOperation> = ModeTable::new(&[
    ("manualEcoActive", WaterHeaterOperation::Eco),
    ("manualEcoInactive", WaterHeaterOperation::Manual),
    ("autoMode", WaterHeaterOperation::Auto),
]);

pub const APC_DHW_OPERATIONS: ModeTable<WaterHeaterOperation> = ModeTable::new(&[
    ("eco", WaterHeaterOperation::Eco),
    ("comfort", WaterHeaterOperation::Comfort),
    ("manu", WaterHeaterOperation::Manual),
    ("auto", WaterHeaterOperation::Auto),
    ("stop", WaterHeaterOperation::Off),
    ("internalScheduling", WaterHeaterOperation::On),
    ("externalScheduling", WaterHeaterOperation::External),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heater_hvac_round_trip() {
        assert_eq!(HEATER_HVAC.to_host(Some("basic")), Some(HvacMode::Heat));
        assert_eq!(HEATER_HVAC.to_host(Some("auto")), Some(HvacMode::Auto));
        assert_eq!(HEATER_HVAC.to_vendor(HvacMode::Auto), Some("internal"));
        assert_eq!(HEATER_HVAC.to_vendor(HvacMode::Off), Some("standby"));
        assert_eq!(HEATER_HVAC.to_vendor(HvacMode::Cool), None);
    }

    #[test]
    fn unknown_vendor_value_uses_fallback() {
        assert_eq!(HEATER_HVAC.to_host(Some("external")), Some(HvacMode::Off));
        assert_eq!(HEATER_PRESETS.to_host(None), Some(Preset::Sleep));
        assert_eq!(ZONE_PRESETS.to_host(Some("manu")), None);
    }

    #[test]
    fn host_modes_deduplicated_in_order() {
        assert_eq!(
            HEATER_HVAC.host_modes(),
            vec![HvacMode::Off, HvacMode::Heat, HvacMode::Auto]
        );
        assert_eq!(APC_DHW_OPERATIONS.host_modes().len(), 7);
    }

    #[test]
    fn preset_sleep_sends_frost_protection() {
        assert_eq!(HEATER_PRESETS.to_vendor(Preset::Sleep), Some("frostprotection"));
    }
}
