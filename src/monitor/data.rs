//! Data structures for UPS readings and derived metrics.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Seconds since the Unix epoch, with sub-second precision.
pub type Timestamp = f64;

/// Raw `key: value` variables reported by one status query.
///
/// An empty snapshot stands for a failed poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    vars: HashMap<String, String>,
}

impl VariableSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Look up a variable by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// First present variable among `keys`, in order.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }
}

impl<K, V> FromIterator<(K, V)> for VariableSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (key, value) in iter {
            snapshot.insert(key, value);
        }
        snapshot
    }
}

/// Device identity strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model: String,
    pub firmware: String,
    pub serial: String,
}

impl DeviceInfo {
    /// Whether no identity field was reported at all.
    pub fn is_unknown(&self) -> bool {
        self.manufacturer.is_empty()
            && self.model.is_empty()
            && self.firmware.is_empty()
            && self.serial.is_empty()
    }
}

/// Electrical and environmental readings; each is absent when the
/// variable was missing or unparsable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    /// Battery charge in percent
    pub battery_charge_percent: Option<f64>,
    /// Battery voltage in volts
    pub battery_voltage_volts: Option<f64>,
    /// Estimated runtime in seconds
    pub battery_runtime_seconds: Option<f64>,
    /// Input (mains) voltage in volts
    pub input_voltage_volts: Option<f64>,
    /// Output voltage in volts
    pub output_voltage_volts: Option<f64>,
    /// Load in percent of capacity
    pub load_percent: Option<f64>,
    /// Internal temperature in Celsius
    pub temperature_celsius: Option<f64>,
}

/// Metrics derived from one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// When this snapshot was computed
    pub timestamp: Timestamp,
    /// Whether the last poll reached the device
    pub online: bool,
    pub on_battery: bool,
    pub low_battery: bool,
    pub readings: Readings,
    pub device: DeviceInfo,
    /// Raw status text as reported (`ups.status`)
    pub status: Option<String>,
    pub outage_count: u64,
    pub total_battery_seconds: f64,
    pub last_outage_timestamp: Option<Timestamp>,
    pub last_outage_duration: Option<f64>,
}

impl MetricsSnapshot {
    /// Carry the readings and identity of `previous` into an offline
    /// snapshot, so a failed poll only flips the online flag.
    pub fn merge_offline(mut self, previous: &MetricsSnapshot) -> Self {
        if self.online {
            return self;
        }
        self.low_battery = previous.low_battery;
        self.readings = previous.readings.clone();
        self.device = previous.device.clone();
        self.status = previous.status.clone();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_of_prefers_earlier_keys() {
        let vars: VariableSnapshot = [("ups.mfr", "APC"), ("device.mfr", "American Power")]
            .into_iter()
            .collect();
        assert_eq!(vars.first_of(&["device.mfr", "ups.mfr"]), Some("American Power"));
        assert_eq!(vars.first_of(&["device.model", "ups.model"]), None);
    }

    #[test]
    fn test_merge_offline_keeps_readings() {
        let previous = MetricsSnapshot {
            online: true,
            low_battery: true,
            readings: Readings {
                battery_charge_percent: Some(42.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let offline = MetricsSnapshot {
            online: false,
            outage_count: 3,
            ..Default::default()
        }
        .merge_offline(&previous);

        assert!(!offline.online);
        assert!(offline.low_battery);
        assert_eq!(offline.readings.battery_charge_percent, Some(42.0));
        assert_eq!(offline.outage_count, 3);
    }
}
