//! Holds the latest [`MetricsSnapshot`] and renders it for scrapes.
//!
//! The poll loop calls [`MetricsRegistry::store`]; scrape handlers call
//! [`MetricsRegistry::render`]. Both take the same lock, and only for the
//! time it takes to copy values in or out, so a scrape never waits on a
//! poll and never sees a half-applied snapshot.

use crate::error::{Result, UpsError};
use crate::monitor::data::{MetricsSnapshot, Readings};
use prometheus::{Counter, Encoder, Gauge, GaugeVec, IntCounter, Opts, Registry, TextEncoder};
use std::sync::{Arc, Mutex, MutexGuard};

/// Prefix applied to every exported metric name.
pub const METRICS_NAMESPACE: &str = "ups";

const DEVICE_LABELS: [&str; 4] = ["manufacturer", "model", "firmware", "serial"];

struct Collectors {
    online: Gauge,
    on_battery: Gauge,
    low_battery: Gauge,
    battery_charge: GaugeVec,
    battery_voltage: GaugeVec,
    battery_runtime: GaugeVec,
    input_voltage: GaugeVec,
    output_voltage: GaugeVec,
    load: GaugeVec,
    temperature: GaugeVec,
    device_info: GaugeVec,
    last_outage_timestamp: GaugeVec,
    last_outage_duration: GaugeVec,
    outage_count: IntCounter,
    battery_time: Counter,
}

struct Inner {
    collectors: Collectors,
    latest: Option<Arc<MetricsSnapshot>>,
}

/// Registry of UPS metrics, created once per process.
pub struct MetricsRegistry {
    registry: Registry,
    inner: Mutex<Inner>,
}

impl MetricsRegistry {
    /// Create the registry and register every UPS metric.
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some(METRICS_NAMESPACE.to_string()), None)?;

        let collectors = Collectors {
            online: gauge(&registry, "status_online", "1 if the last poll reached the UPS")?,
            on_battery: gauge(&registry, "status_on_battery", "1 if the UPS runs on battery")?,
            low_battery: gauge(
                &registry,
                "status_low_battery",
                "1 if the UPS reports low battery",
            )?,
            battery_charge: optional_gauge(
                &registry,
                "battery_charge_percent",
                "Battery charge in percent",
            )?,
            battery_voltage: optional_gauge(&registry, "battery_voltage_volts", "Battery voltage")?,
            battery_runtime: optional_gauge(
                &registry,
                "battery_runtime_seconds",
                "Estimated runtime on battery",
            )?,
            input_voltage: optional_gauge(&registry, "input_voltage_volts", "Input voltage")?,
            output_voltage: optional_gauge(&registry, "output_voltage_volts", "Output voltage")?,
            load: optional_gauge(&registry, "load_percent", "Load in percent of capacity")?,
            temperature: optional_gauge(&registry, "temperature_celsius", "UPS temperature")?,
            device_info: {
                let vec = GaugeVec::new(
                    Opts::new("device_info", "UPS identity, always 1"),
                    &DEVICE_LABELS,
                )?;
                registry.register(Box::new(vec.clone()))?;
                vec
            },
            last_outage_timestamp: optional_gauge(
                &registry,
                "last_outage_timestamp_seconds",
                "Start of the last completed outage as a Unix timestamp",
            )?,
            last_outage_duration: optional_gauge(
                &registry,
                "last_outage_duration_seconds",
                "Duration of the last completed outage",
            )?,
            outage_count: {
                let counter = IntCounter::new("outage_count_total", "Outages seen since start")?;
                registry.register(Box::new(counter.clone()))?;
                counter
            },
            battery_time: {
                let counter = Counter::new(
                    "total_battery_time_seconds",
                    "Seconds spent on battery since start",
                )?;
                registry.register(Box::new(counter.clone()))?;
                counter
            },
        };

        Ok(Self {
            registry,
            inner: Mutex::new(Inner {
                collectors,
                latest: None,
            }),
        })
    }

    /// Replace the exported values with `snapshot`.
    ///
    /// An offline snapshot keeps the previous readings and identity, so a
    /// failed poll only flips `status_online`.
    pub fn store(&self, snapshot: MetricsSnapshot) {
        let mut inner = self.lock();
        let snapshot = match &inner.latest {
            Some(previous) => snapshot.merge_offline(previous),
            None => snapshot,
        };
        inner.collectors.apply(&snapshot);
        inner.latest = Some(Arc::new(snapshot));
    }

    /// The most recently stored snapshot, if any poll has completed.
    pub fn latest(&self) -> Option<Arc<MetricsSnapshot>> {
        self.lock().latest.clone()
    }

    /// Render the current values in the Prometheus text format.
    pub fn render(&self) -> Result<String> {
        let families = {
            let _inner = self.lock();
            self.registry.gather()
        };

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| UpsError::metrics_error(e.to_string()))
    }

    /// Content type of [`render`](Self::render) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Values are only ever overwritten whole, so a poisoned lock still
        // holds a consistent snapshot.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Collectors {
    fn apply(&self, snapshot: &MetricsSnapshot) {
        self.online.set(flag(snapshot.online));
        self.on_battery.set(flag(snapshot.on_battery));
        self.low_battery.set(flag(snapshot.low_battery));

        let Readings {
            battery_charge_percent,
            battery_voltage_volts,
            battery_runtime_seconds,
            input_voltage_volts,
            output_voltage_volts,
            load_percent,
            temperature_celsius,
        } = &snapshot.readings;
        set_optional(&self.battery_charge, *battery_charge_percent);
        set_optional(&self.battery_voltage, *battery_voltage_volts);
        set_optional(&self.battery_runtime, *battery_runtime_seconds);
        set_optional(&self.input_voltage, *input_voltage_volts);
        set_optional(&self.output_voltage, *output_voltage_volts);
        set_optional(&self.load, *load_percent);
        set_optional(&self.temperature, *temperature_celsius);

        self.device_info.reset();
        let device = &snapshot.device;
        if !device.is_unknown() {
            self.device_info
                .with_label_values(&[
                    device.manufacturer.as_str(),
                    device.model.as_str(),
                    device.firmware.as_str(),
                    device.serial.as_str(),
                ])
                .set(1.0);
        }

        set_optional(&self.last_outage_timestamp, snapshot.last_outage_timestamp);
        set_optional(&self.last_outage_duration, snapshot.last_outage_duration);

        // Counters only move forward; the tracker never lowers its totals.
        let outages = snapshot.outage_count.saturating_sub(self.outage_count.get());
        if outages > 0 {
            self.outage_count.inc_by(outages);
        }
        let battery_time = snapshot.total_battery_seconds - self.battery_time.get();
        if battery_time > 0.0 {
            self.battery_time.inc_by(battery_time);
        }
    }
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge> {
    let gauge = Gauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// A label-less gauge that disappears from the exposition when unset.
fn optional_gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec> {
    let vec = GaugeVec::new(Opts::new(name, help), &[])?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

fn set_optional(vec: &GaugeVec, value: Option<f64>) {
    match value {
        Some(value) => vec.with_label_values(&[]).set(value),
        None => vec.reset(),
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
