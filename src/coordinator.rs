//! Polling coordinator.
//!
//! Polls the realtime hub on a fixed interval, refreshes each static
//! schedule source independently once it goes stale, and fans merged
//! snapshots out to entities over a watch channel. Control commands
//! (manual refresh, interval changes) arrive over an mpsc channel and are
//! served between ticks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::BoardConfig;
use crate::fetch::HttpClient;
use crate::hub::{RealtimeHub, RouteStatus, StationStop};
use crate::schedule::GtfsSchedule;

/// One poll's worth of merged realtime and static data.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub station_stops: HashMap<String, StationStop>,
    pub route_statuses: HashMap<String, RouteStatus>,
    pub schedule: Arc<GtfsSchedule>,
    pub feeds_ok: usize,
    pub feeds_failed: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum Command {
    /// Reload static data. `source` limits the refresh to one source (it is
    /// added to the pending set); `clear` drops the cached schedule first.
    RefreshStatic {
        source: Option<String>,
        clear: bool,
    },
    SetStaticInterval {
        source: String,
        interval: Duration,
    },
}

/// Cloneable handle used by control entities to reach a running
/// coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    pub async fn refresh_static(&self, source: Option<String>, clear: bool) -> Result<()> {
        self.tx
            .send(Command::RefreshStatic { source, clear })
            .await
            .context("coordinator is no longer running")
    }

    pub async fn set_static_interval(&self, source: impl Into<String>, hours: u64) -> Result<()> {
        self.tx
            .send(Command::SetStaticInterval {
                source: source.into(),
                interval: Duration::hours(hours.max(1) as i64),
            })
            .await
            .context("coordinator is no longer running")
    }
}

/// Creates the command channel for a coordinator and its handle.
pub fn command_channel() -> (CoordinatorHandle, mpsc::Receiver<Command>) {
    let (tx, rx) = mpsc::channel(8);
    (CoordinatorHandle { tx }, rx)
}

pub struct Coordinator<C> {
    hub: RealtimeHub<C>,
    schedule: Arc<GtfsSchedule>,
    static_sources: Vec<String>,
    static_intervals: HashMap<String, Duration>,
    last_static_update: HashMap<String, DateTime<Utc>>,
    static_update_targets: HashSet<String>,
    realtime_interval: std::time::Duration,
}

impl<C: HttpClient + Send + Sync + 'static> Coordinator<C> {
    pub fn new(hub: RealtimeHub<C>, config: &BoardConfig) -> Self {
        let static_sources = config.gtfs_static_data.clone();
        let static_intervals: HashMap<String, Duration> = static_sources
            .iter()
            .map(|source| (source.clone(), config.static_update_frequency(source)))
            .collect();
        for (source, interval) in &static_intervals {
            info!(source = %source, hours = interval.num_hours(), "Static GTFS update interval");
        }
        debug!(seconds = config.realtime_interval().as_secs(), "Realtime GTFS update interval");
        Self {
            hub,
            schedule: Arc::new(GtfsSchedule::default()),
            // Every source starts pending so the first update loads it.
            static_update_targets: static_sources.iter().cloned().collect(),
            static_sources,
            static_intervals,
            last_static_update: HashMap::new(),
            realtime_interval: config.realtime_interval(),
        }
    }

    pub fn hub_mut(&mut self) -> &mut RealtimeHub<C> {
        &mut self.hub
    }

    pub fn hub(&self) -> &RealtimeHub<C> {
        &self.hub
    }

    pub fn schedule(&self) -> Arc<GtfsSchedule> {
        self.schedule.clone()
    }

    pub fn last_static_update(&self) -> &HashMap<String, DateTime<Utc>> {
        &self.last_static_update
    }

    pub fn static_intervals(&self) -> &HashMap<String, Duration> {
        &self.static_intervals
    }

    pub fn pending_static_targets(&self) -> &HashSet<String> {
        &self.static_update_targets
    }

    pub fn set_static_interval(&mut self, source: impl Into<String>, interval: Duration) {
        let source = source.into();
        info!(source = %source, hours = interval.num_hours(), "Static GTFS update interval changed");
        self.static_intervals.insert(source, interval);
    }

    /// Adds every source whose last successful load is older than its
    /// refresh interval to the pending set.
    fn mark_stale_targets(&mut self, now: DateTime<Utc>) {
        for source in &self.static_sources {
            let stale = match self.last_static_update.get(source) {
                Some(last) => {
                    let interval = self
                        .static_intervals
                        .get(source)
                        .copied()
                        .unwrap_or_else(|| Duration::hours(2));
                    now - *last > interval
                }
                None => true,
            };
            if stale {
                self.static_update_targets.insert(source.clone());
            }
        }
    }

    /// Loads every pending static source and merges the results.
    ///
    /// Sources that fail stay pending and are retried on the next tick; the
    /// previously-loaded schedule keeps serving lookups. The call only
    /// fails when nothing has ever loaded and no pending source succeeded.
    pub async fn update_static(&mut self, clear: bool, now: DateTime<Utc>) -> Result<()> {
        if clear {
            info!("GTFS static data cleared");
            self.schedule = Arc::new(GtfsSchedule::default());
            self.last_static_update.clear();
            self.static_update_targets
                .extend(self.static_sources.iter().cloned());
        }

        let mut targets: Vec<String> = self.static_update_targets.iter().cloned().collect();
        targets.sort();

        let mut succeeded = 0usize;
        for source in targets {
            match GtfsSchedule::load_source(&source).await {
                Ok(part) => {
                    Arc::make_mut(&mut self.schedule).merge(part);
                    self.last_static_update.insert(source.clone(), now);
                    self.static_update_targets.remove(&source);
                    debug!(source = %source, "GTFS static feed updated");
                    succeeded += 1;
                }
                Err(e) => {
                    error!(source = %source, error = %e, "GTFS static feed update failed; will retry");
                }
            }
        }

        if succeeded == 0 && !self.static_update_targets.is_empty() && self.schedule.is_empty() {
            bail!(
                "no GTFS static source could be loaded ({} pending)",
                self.static_update_targets.len()
            );
        }
        Ok(())
    }

    /// One full update: refresh stale static sources, poll the realtime
    /// feeds, and produce a snapshot for entities.
    pub async fn update_data(&mut self, now: DateTime<Utc>) -> Snapshot {
        self.mark_stale_targets(now);
        if !self.static_update_targets.is_empty() {
            if let Err(e) = self.update_static(false, now).await {
                warn!(error = %e, "Static refresh failed; serving previous schedule");
            }
        }

        let data = self.hub.poll(now).await;
        Snapshot {
            station_stops: data.station_stops,
            route_statuses: data.route_statuses,
            schedule: self.schedule.clone(),
            feeds_ok: data.feeds_ok,
            feeds_failed: data.feeds_failed,
            updated_at: now,
        }
    }

    /// Polling loop: ticks on the realtime interval, serves control
    /// commands between ticks, and publishes snapshots until every receiver
    /// is gone or the command channel closes.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        snapshots: watch::Sender<Snapshot>,
    ) {
        let mut ticker = tokio::time::interval(self.realtime_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = self.update_data(Utc::now()).await;
                    if snapshots.send(snapshot).is_err() {
                        debug!("All snapshot receivers dropped; stopping coordinator");
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::RefreshStatic { source, clear }) => {
                        if let Some(source) = source {
                            self.static_update_targets.insert(source);
                        }
                        if let Err(e) = self.update_static(clear, Utc::now()).await {
                            error!(error = %e, "Manual static refresh failed");
                        }
                    }
                    Some(Command::SetStaticInterval { source, interval }) => {
                        self.set_static_interval(source, interval);
                    }
                    None => {
                        debug!("Command channel closed; stopping coordinator");
                        break;
                    }
                },
            }
        }
    }
}
