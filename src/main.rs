//! UPS Watch - UPS monitoring agent binary
//!
//! Polls a UPS on a fixed interval and serves Prometheus metrics.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};
use ups_watch::{
    bind_listener, serve, unix_now, MetricsRegistry, MetricsSnapshot, MonitorState, PollerConfig,
    Scheduler, StateTracker, StatusPoller, StatusSource, StatusTokens, WebConfig,
    DEFAULT_DEVICE, DEFAULT_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS, DEFAULT_UPS_HOST,
    DEFAULT_WEB_PORT,
};

#[derive(Parser)]
#[command(name = "ups_watch")]
#[command(about = "UPS power-state monitor with a Prometheus endpoint")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls a UPS through upsc, tracks outages and serves Prometheus metrics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Device identifier registered with the UPS daemon
    #[arg(long, env = "UPS_NAME", default_value = DEFAULT_DEVICE)]
    device: String,

    /// Host running the UPS daemon
    #[arg(long, env = "UPS_HOST", default_value = DEFAULT_UPS_HOST)]
    ups_host: String,

    /// Status-query command
    #[arg(long, env = "UPS_COMMAND", default_value = ups_watch::monitor::poller::DEFAULT_COMMAND)]
    query_command: String,

    /// Metrics endpoint bind address
    #[arg(long, default_value = "0.0.0.0")]
    listen: String,

    /// Metrics endpoint port
    #[arg(short, long, env = "EXPORTER_PORT", default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Poll interval in seconds
    #[arg(short, long, env = "POLL_INTERVAL", default_value_t = DEFAULT_INTERVAL_SECS)]
    interval: u64,

    /// Status-query timeout in seconds
    #[arg(long, env = "UPS_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Extra case-insensitive status phrase meaning "on battery"
    #[arg(long = "on-battery-token", value_name = "TOKEN")]
    on_battery_tokens: Vec<String>,

    /// Extra case-insensitive status phrase meaning "low battery"
    #[arg(long = "low-battery-token", value_name = "TOKEN")]
    low_battery_tokens: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging, including raw status output
    #[arg(short, long, env = "UPS_DEBUG")]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll on an interval and serve metrics (default)
    Serve,

    /// Poll once, print the derived snapshot and exit
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Snapshot(args)) => snapshot_command(&cli, args).await,
        Some(Commands::Serve) | None => serve_command(&cli).await,
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// `RUST_LOG` directives on top of the level picked by `--debug`/`--verbose`.
fn log_filter(cli: &Cli) -> EnvFilter {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

fn poller_config(cli: &Cli) -> PollerConfig {
    PollerConfig::new(&cli.device, &cli.ups_host)
        .with_command(&cli.query_command)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_debug(cli.debug)
}

fn status_tokens(cli: &Cli) -> StatusTokens {
    StatusTokens::default()
        .with_on_battery(cli.on_battery_tokens.iter().cloned())
        .with_low_battery(cli.low_battery_tokens.iter().cloned())
}

async fn serve_command(cli: &Cli) -> anyhow::Result<()> {
    if cli.interval == 0 {
        anyhow::bail!("poll interval must be at least one second");
    }

    let poller = StatusPoller::new(poller_config(cli)).context("invalid poller configuration")?;
    let registry = Arc::new(MetricsRegistry::new().context("failed to create metrics registry")?);
    let web_config = WebConfig::new(&cli.listen, cli.port);

    // Bind before polling so a taken port stops the agent immediately
    let listener = bind_listener(&web_config).await?;

    info!("UPS monitor configuration:");
    info!("  - Target: {}", poller.target());
    info!("  - Poll interval: {}s", cli.interval);
    info!("  - Endpoint: {}", web_config.bind_address());

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let scheduler = Scheduler::new(
        poller,
        StateTracker::new(status_tokens(cli)),
        registry.clone(),
        Duration::from_secs(cli.interval),
    );
    let poll_task = tokio::spawn(scheduler.run(stop_rx.clone()));

    let signal_tx = stop_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = signal_tx.send(true);
        }
    });

    let served = serve(listener, web_config, registry, stop_rx).await;
    let _ = stop_tx.send(true);
    poll_task.await.context("poll loop panicked")?;
    served?;

    Ok(())
}

async fn snapshot_command(cli: &Cli, args: &SnapshotArgs) -> anyhow::Result<()> {
    let poller = StatusPoller::new(poller_config(cli)).context("invalid poller configuration")?;
    let tracker = StateTracker::new(status_tokens(cli));

    let vars = poller
        .poll()
        .await
        .with_context(|| format!("failed to query {}", poller.target()))?;
    let now = unix_now();
    let (_, snapshot) = tracker.update(&MonitorState::new(now), &vars, now);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        "pretty" => print_pretty_snapshot(&poller.target(), &snapshot),
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }

    Ok(())
}

fn print_pretty_snapshot(target: &str, snapshot: &MetricsSnapshot) {
    println!("UPS {}", target);
    println!("==========================================");

    let device = &snapshot.device;
    if !device.is_unknown() {
        println!("  Device: {} {}", device.manufacturer, device.model);
        if !device.firmware.is_empty() {
            println!("  Firmware: {}", device.firmware);
        }
        if !device.serial.is_empty() {
            println!("  Serial: {}", device.serial);
        }
    }

    println!("  Status: {}", snapshot.status.as_deref().unwrap_or("unknown"));
    println!(
        "  Power: {}{}",
        if snapshot.on_battery { "on battery" } else { "line" },
        if snapshot.low_battery { " (LOW BATTERY)" } else { "" }
    );

    let readings = &snapshot.readings;
    let rows = [
        ("Battery charge", readings.battery_charge_percent, "%"),
        ("Battery voltage", readings.battery_voltage_volts, " V"),
        ("Runtime", readings.battery_runtime_seconds, " s"),
        ("Input voltage", readings.input_voltage_volts, " V"),
        ("Output voltage", readings.output_voltage_volts, " V"),
        ("Load", readings.load_percent, "%"),
        ("Temperature", readings.temperature_celsius, " °C"),
    ];
    for (label, value, unit) in rows {
        if let Some(value) = value {
            println!("  {}: {:.1}{}", label, value, unit);
        }
    }
}
