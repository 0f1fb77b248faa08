//! Fixed-interval poll loop.

use crate::exporter::MetricsRegistry;
use crate::monitor::data::{MetricsSnapshot, Timestamp, VariableSnapshot};
use crate::monitor::tracker::{MonitorState, StateTracker};
use crate::monitor::traits::StatusSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Current wall-clock time as Unix seconds.
pub fn unix_now() -> Timestamp {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Drives poll, state update and metric storage, one cycle at a time.
///
/// The scheduler is the only owner of [`MonitorState`].
pub struct Scheduler<S> {
    source: S,
    tracker: StateTracker,
    registry: Arc<MetricsRegistry>,
    interval: Duration,
    state: MonitorState,
}

impl<S: StatusSource> Scheduler<S> {
    pub fn new(
        source: S,
        tracker: StateTracker,
        registry: Arc<MetricsRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            tracker,
            registry,
            interval,
            state: MonitorState::new(unix_now()),
        }
    }

    /// Replace the initial state, e.g. to pin the start time in tests.
    pub fn with_state(mut self, state: MonitorState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Run one poll cycle stamped with the current wall-clock time.
    pub async fn run_cycle(&mut self) -> MetricsSnapshot {
        let vars = self.poll_once().await;
        self.apply(vars, unix_now())
    }

    /// Run one poll cycle stamped with `now`.
    pub async fn run_cycle_at(&mut self, now: Timestamp) -> MetricsSnapshot {
        let vars = self.poll_once().await;
        self.apply(vars, now)
    }

    /// Poll until `shutdown` flips to true or its sender is dropped.
    ///
    /// Cycles never overlap: a slow poll delays the next tick instead of
    /// queueing a burst.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            target_ups = %self.source.target(),
            interval_secs = self.interval.as_secs_f64(),
            "Starting UPS poll loop"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = self.run_cycle().await;
                    debug!(
                        online = snapshot.online,
                        on_battery = snapshot.on_battery,
                        outages = snapshot.outage_count,
                        "Poll cycle complete"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Stopping UPS poll loop");
                        break;
                    }
                }
            }
        }
    }

    async fn poll_once(&self) -> VariableSnapshot {
        match self.source.poll().await {
            Ok(vars) => vars,
            Err(err) if err.is_poll_failure() => {
                warn!(target_ups = %self.source.target(), "Poll failed: {}", err);
                VariableSnapshot::new()
            }
            Err(err) => {
                error!(target_ups = %self.source.target(), "Unexpected poll error: {}", err);
                VariableSnapshot::new()
            }
        }
    }

    fn apply(&mut self, vars: VariableSnapshot, now: Timestamp) -> MetricsSnapshot {
        let (state, snapshot) = self.tracker.update(&self.state, &vars, now);
        self.state = state;
        self.registry.store(snapshot.clone());
        snapshot
    }
}
