//! Power-state transition tracking.
//!
//! [`StateTracker::update`] is a pure function of the previous
//! [`MonitorState`], one [`VariableSnapshot`] and the current time. It
//! detects outage start and recovery, accumulates time spent on battery
//! and derives the [`MetricsSnapshot`] exposed by the exporter.

use crate::monitor::data::{DeviceInfo, MetricsSnapshot, Readings, Timestamp, VariableSnapshot};
use crate::monitor::tokens::StatusTokens;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const STATUS_KEY: &str = "ups.status";

/// Monitor state carried from one poll to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorState {
    pub on_battery: bool,
    /// Start of the open outage; set only while `on_battery` is true.
    pub outage_start: Option<Timestamp>,
    pub last_check: Timestamp,
    /// False until the first successful poll has been processed.
    pub initialized: bool,
    pub outage_count: u64,
    pub total_battery_seconds: f64,
    pub last_outage_timestamp: Option<Timestamp>,
    pub last_outage_duration: Option<f64>,
}

impl MonitorState {
    /// Fresh state for a process started at `started_at`.
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            on_battery: false,
            outage_start: None,
            last_check: started_at,
            initialized: false,
            outage_count: 0,
            total_battery_seconds: 0.0,
            last_outage_timestamp: None,
            last_outage_duration: None,
        }
    }
}

/// Derives monitor state and metrics from status variables.
#[derive(Debug, Clone, Default)]
pub struct StateTracker {
    tokens: StatusTokens,
}

impl StateTracker {
    pub fn new(tokens: StatusTokens) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &StatusTokens {
        &self.tokens
    }

    /// Compute the next state and the metrics for this poll.
    ///
    /// An empty `vars` means the poll failed: the state is returned
    /// unchanged and the snapshot only reports the device offline.
    pub fn update(
        &self,
        prev: &MonitorState,
        vars: &VariableSnapshot,
        now: Timestamp,
    ) -> (MonitorState, MetricsSnapshot) {
        if vars.is_empty() {
            debug!("No variables received, keeping previous power state");
            return (prev.clone(), offline_snapshot(prev, now));
        }

        let readings = parse_readings(vars);

        let status = vars.get(STATUS_KEY).map(str::to_string);
        let status_text = status.as_deref().unwrap_or_default();
        let is_on_battery = self.tokens.is_on_battery(status_text);
        let is_low_battery = self.tokens.is_low_battery(status_text);

        let mut next = prev.clone();

        if is_on_battery && !prev.on_battery {
            next.outage_start = Some(now);
            if prev.initialized {
                next.outage_count += 1;
                warn!(status = status_text, "UPS switched to battery power");
            } else {
                info!(status = status_text, "UPS already on battery at startup");
            }
        } else if !is_on_battery && prev.on_battery {
            if let Some(start) = prev.outage_start {
                let duration = (now - start).max(0.0);
                next.last_outage_timestamp = Some(start);
                next.last_outage_duration = Some(duration);
                next.outage_start = None;
                info!(duration_seconds = duration, "UPS back on line power");
            }
        }

        // Uses the post-transition flag, so the interval that ends in a
        // recovery is not counted.
        if is_on_battery {
            next.total_battery_seconds += (now - prev.last_check).max(0.0);
        }

        next.last_check = now;
        next.initialized = true;
        next.on_battery = is_on_battery;

        let snapshot = MetricsSnapshot {
            timestamp: now,
            online: true,
            on_battery: is_on_battery,
            low_battery: is_low_battery,
            readings,
            device: device_info(vars),
            status,
            outage_count: next.outage_count,
            total_battery_seconds: next.total_battery_seconds,
            last_outage_timestamp: next.last_outage_timestamp,
            last_outage_duration: next.last_outage_duration,
        };

        (next, snapshot)
    }
}

fn offline_snapshot(state: &MonitorState, now: Timestamp) -> MetricsSnapshot {
    MetricsSnapshot {
        timestamp: now,
        online: false,
        on_battery: state.on_battery,
        outage_count: state.outage_count,
        total_battery_seconds: state.total_battery_seconds,
        last_outage_timestamp: state.last_outage_timestamp,
        last_outage_duration: state.last_outage_duration,
        ..Default::default()
    }
}

fn parse_readings(vars: &VariableSnapshot) -> Readings {
    Readings {
        battery_charge_percent: parse_number(vars, "battery.charge"),
        battery_voltage_volts: parse_number(vars, "battery.voltage"),
        battery_runtime_seconds: parse_number(vars, "battery.runtime"),
        input_voltage_volts: parse_number(vars, "input.voltage"),
        output_voltage_volts: parse_number(vars, "output.voltage"),
        load_percent: parse_number(vars, "ups.load"),
        temperature_celsius: parse_number(vars, "ups.temperature"),
    }
}

/// Parse one numeric variable; a bad value is logged and left out.
fn parse_number(vars: &VariableSnapshot, key: &str) -> Option<f64> {
    let raw = vars.get(key)?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        Ok(_) | Err(_) => {
            warn!(variable = key, value = raw, "Ignoring unparsable numeric value");
            None
        }
    }
}

fn device_info(vars: &VariableSnapshot) -> DeviceInfo {
    DeviceInfo {
        manufacturer: identity(vars, &["device.mfr", "ups.mfr"]),
        model: identity(vars, &["device.model", "ups.model"]),
        firmware: identity(vars, &["ups.firmware"]),
        serial: identity(vars, &["device.serial", "ups.serial"]),
    }
}

fn identity(vars: &VariableSnapshot, keys: &[&str]) -> String {
    vars.first_of(keys).unwrap_or_default().to_string()
}
