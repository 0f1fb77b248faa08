use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_test::assert_ok;
use ups_watch::{
    bind_listener, parse_variables, serve, MetricsRegistry, MonitorState, StateTracker,
    StatusTokens, UpsError, VariableSnapshot, WebConfig,
};

const ONLINE_OUTPUT: &str = "\
battery.charge: 100
battery.charge.low: 10
battery.runtime: 3120
battery.voltage: 27.3
device.mfr: EATON
device.model: Ellipse PRO 1200
device.serial: G355M20012
input.voltage: 229.0
output.voltage: 230.0
ups.firmware: 01.14.0021
ups.load: 17
ups.mfr: EATON
ups.status: OL
ups.temperature: 28.5
";

fn status(text: &str) -> VariableSnapshot {
    [("ups.status", text)].into_iter().collect()
}

/// Full pipeline: raw query output through the tracker into the exposition
#[test]
fn test_upsc_output_to_exposition() {
    let tracker = StateTracker::default();
    let registry = MetricsRegistry::new().expect("Should create registry");

    let vars = parse_variables(ONLINE_OUTPUT);
    let (state, snapshot) = tracker.update(&MonitorState::new(0.0), &vars, 10.0);
    assert!(state.initialized);
    registry.store(snapshot);

    let text = registry.render().expect("Should render metrics");
    assert!(text.contains("ups_status_online 1"));
    assert!(text.contains("ups_status_on_battery 0"));
    assert!(text.contains("ups_status_low_battery 0"));
    assert!(text.contains("ups_battery_charge_percent 100"));
    assert!(text.contains("ups_battery_voltage_volts 27.3"));
    assert!(text.contains("ups_battery_runtime_seconds 3120"));
    assert!(text.contains("ups_input_voltage_volts 229"));
    assert!(text.contains("ups_output_voltage_volts 230"));
    assert!(text.contains("ups_load_percent 17"));
    assert!(text.contains("ups_temperature_celsius 28.5"));
    assert!(text.contains(r#"serial="G355M20012""#));
    assert!(text.contains(r#"model="Ellipse PRO 1200""#));
    assert!(text.contains("ups_outage_count_total 0"));
}

/// Poll at t=0 OL, t=30 OB, t=60 OB, t=70 OL
#[test]
fn test_outage_timeline() {
    let tracker = StateTracker::default();
    let state = MonitorState::new(0.0);

    let (state, snapshot) = tracker.update(&state, &status("OL"), 0.0);
    assert!(snapshot.online);
    assert!(!snapshot.on_battery);
    assert!(state.initialized);
    assert_eq!(state.outage_count, 0);

    let (state, snapshot) = tracker.update(&state, &status("OB"), 30.0);
    assert!(snapshot.on_battery);
    assert_eq!(state.outage_start, Some(30.0));
    assert_eq!(state.outage_count, 1);
    assert_eq!(state.total_battery_seconds, 30.0);

    let (state, _) = tracker.update(&state, &status("OB"), 60.0);
    assert_eq!(state.total_battery_seconds, 60.0);

    let (state, snapshot) = tracker.update(&state, &status("OL"), 70.0);
    assert_eq!(state.last_outage_duration, Some(40.0));
    assert_eq!(state.last_outage_timestamp, Some(30.0));
    assert_eq!(state.outage_start, None);
    assert_eq!(state.total_battery_seconds, 60.0);
    assert_eq!(snapshot.total_battery_seconds, 60.0);
}

/// Verbose status text and custom vocabularies
#[test]
fn test_status_vocabularies() {
    let tracker = StateTracker::new(StatusTokens::default().with_on_battery(["discharging"]));
    let (state, snapshot) = tracker.update(
        &MonitorState::new(0.0),
        &status("On Battery, Low Battery"),
        1.0,
    );
    assert!(state.on_battery);
    assert!(snapshot.low_battery);

    let (state, _) = tracker.update(&state, &status("Online"), 2.0);
    assert!(!state.on_battery);

    let (state, _) = tracker.update(&state, &status("Discharging"), 3.0);
    assert!(state.on_battery);
    assert_eq!(state.outage_count, 1);
}

/// Counters exposed across a monitoring gap stay monotonic
#[test]
fn test_counters_survive_failed_polls() {
    let tracker = StateTracker::default();
    let registry = MetricsRegistry::new().expect("Should create registry");

    let (state, snapshot) = tracker.update(&MonitorState::new(0.0), &status("OL"), 0.0);
    registry.store(snapshot);
    let (state, snapshot) = tracker.update(&state, &status("OB"), 30.0);
    registry.store(snapshot);
    let (state, snapshot) = tracker.update(&state, &VariableSnapshot::new(), 60.0);
    registry.store(snapshot);

    let text = registry.render().expect("Should render metrics");
    assert!(text.contains("ups_status_online 0"));
    assert!(text.contains("ups_status_on_battery 1"));
    assert!(text.contains("ups_outage_count_total 1"));
    assert!(text.contains("ups_total_battery_time_seconds 30"));
    assert_eq!(state.outage_start, Some(30.0));
}

#[test]
fn test_web_config_defaults() {
    let config = WebConfig::default();
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, ups_watch::DEFAULT_WEB_PORT);
    assert_eq!(config.metrics_path, "/metrics");
}

/// Scrape a real listener over TCP
#[tokio::test]
async fn test_scrape_over_tcp() {
    let registry = Arc::new(MetricsRegistry::new().expect("Should create registry"));
    let (_, snapshot) = StateTracker::default().update(&MonitorState::new(0.0), &status("OL"), 1.0);
    registry.store(snapshot);

    let config = WebConfig::new("127.0.0.1", 0);
    let listener = assert_ok!(bind_listener(&config).await);
    let addr = listener.local_addr().expect("Should have local address");

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let server = tokio::spawn(serve(listener, config, registry, stop_rx));

    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("Should connect");
    stream
        .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("Should send request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("Should read response");

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("ups_status_online 1"));

    stop_tx.send(true).expect("Server should be listening");
    assert_ok!(server.await.expect("Server task should not panic"));
}

/// A taken port is a startup error
#[tokio::test]
async fn test_bind_conflict_is_fatal() {
    let first = bind_listener(&WebConfig::new("127.0.0.1", 0))
        .await
        .expect("Should bind");
    let port = first.local_addr().expect("Should have local address").port();

    let err = bind_listener(&WebConfig::new("127.0.0.1", port))
        .await
        .expect_err("Second bind should fail");
    assert!(matches!(err, UpsError::WebServer(_)));
    assert!(!err.is_poll_failure());
}
