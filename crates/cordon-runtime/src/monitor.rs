//! Concurrent multi-container monitoring.
//!
//! Fans out periodic stats polls and continuous OOM subscriptions across
//! any number of containers and serializes the results into one ordered
//! NDJSON stream. One task exists per container for OOM watching, one
//! short-lived task per container per polling round, one scheduler, and
//! one writer draining the shared event queue.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cordon_common::constants::EVENT_QUEUE_CAPACITY;
use cordon_common::error::{CordonError, Result, combine_errors};
use cordon_common::types::{ContainerId, ContainerStatus};
use cordon_core::cgroup::StatsSnapshot;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::container::{ContainerHandle, ContainerRegistry};

/// One monitoring observation, produced by a worker and consumed exactly
/// once by the serializing writer.
#[derive(Debug)]
pub enum Event {
    /// A completed stats poll.
    Stats {
        /// Container the snapshot belongs to.
        id: ContainerId,
        /// The collected snapshot.
        snapshot: Box<StatsSnapshot>,
    },
    /// An out-of-memory kill was observed.
    Oom {
        /// Container the kill happened in.
        id: ContainerId,
    },
}

#[derive(Serialize)]
struct WireEvent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a StatsSnapshot>,
}

impl Event {
    fn to_json(&self) -> serde_json::Result<String> {
        let wire = match self {
            Self::Stats { id, snapshot } => WireEvent {
                kind: "stats",
                id: id.as_str(),
                data: Some(snapshot),
            },
            Self::Oom { id } => WireEvent {
                kind: "oom",
                id: id.as_str(),
                data: None,
            },
        };
        serde_json::to_string(&wire)
    }
}

/// Resolves every requested identifier, aggregating all failures.
///
/// Either every identifier resolves and the full handle list is returned,
/// or no list is returned at all; a partial set is never produced.
///
/// # Errors
///
/// Returns the combined resolution failures, one message per unknown
/// identifier, in request order.
pub fn resolve_containers(
    registry: &dyn ContainerRegistry,
    ids: &[String],
) -> Result<Vec<Arc<dyn ContainerHandle>>> {
    let mut containers = Vec::with_capacity(ids.len());
    let mut errs = Vec::new();
    for id in ids {
        match registry.resolve(id) {
            Ok(handle) => containers.push(handle),
            Err(e) => errs.push(e),
        }
    }
    match combine_errors(errs) {
        Some(err) => Err(err),
        None => Ok(containers),
    }
}

/// Verifies that no resolved container has already stopped.
///
/// # Errors
///
/// Returns an error for the first stopped container, or a status-probe
/// failure.
pub fn ensure_not_stopped(containers: &[Arc<dyn ContainerHandle>]) -> Result<()> {
    for container in containers {
        if container.status()? == ContainerStatus::Stopped {
            return Err(CordonError::NotRunning {
                id: container.id().to_string(),
            });
        }
    }
    Ok(())
}

/// Monitoring engine over a resolved set of containers.
pub struct MonitorEngine {
    containers: Vec<Arc<dyn ContainerHandle>>,
}

impl MonitorEngine {
    /// Creates an engine over already-resolved, already-verified handles.
    #[must_use]
    pub fn new(containers: Vec<Arc<dyn ContainerHandle>>) -> Self {
        Self { containers }
    }

    /// One-shot stats mode: polls every container concurrently, emits one
    /// `stats` event per successful poll in completion order, and reports
    /// the combined failures after the writer has flushed.
    ///
    /// # Errors
    ///
    /// Returns the aggregated stats-collection failures; successful
    /// containers are still reported on the output stream first.
    pub async fn collect_once(&self, out: impl Write + Send + 'static) -> Result<()> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let writer = spawn_writer(event_rx, out);

        let mut polls = JoinSet::new();
        for container in &self.containers {
            let container = Arc::clone(container);
            let _ = polls.spawn_blocking(move || (container.id().clone(), container.stats()));
        }

        let mut errs = Vec::new();
        while let Some(joined) = polls.join_next().await {
            match joined {
                Ok((id, Ok(snapshot))) => {
                    if event_tx
                        .send(Event::Stats {
                            id,
                            snapshot: Box::new(snapshot),
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Ok((_, Err(e))) => errs.push(e),
                Err(e) => errs.push(CordonError::Sys {
                    op: "stats task",
                    message: e.to_string(),
                }),
            }
        }

        // Close the queue and let the writer drain what is buffered.
        drop(event_tx);
        await_writer(writer).await;

        combine_errors(errs).map_or(Ok(()), Err)
    }

    /// Continuous mode: periodic stats rounds plus per-container OOM
    /// watchers, running until every watcher has retired — that is, until
    /// every monitored container has gone away.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is zero. Per-round stats failures
    /// and failed OOM subscriptions are logged, not propagated.
    pub async fn watch(&self, interval: Duration, out: impl Write + Send + 'static) -> Result<()> {
        if interval.is_zero() {
            return Err(CordonError::InvalidArgument {
                message: "polling interval must be greater than zero".into(),
            });
        }
        if self.containers.is_empty() {
            return Ok(());
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let writer = spawn_writer(event_rx, out);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let group = Arc::new(WatcherGroup {
            remaining: AtomicUsize::new(self.containers.len()),
            shutdown: shutdown_tx,
        });
        for container in &self.containers {
            let _ = tokio::spawn(oom_watcher(
                Arc::clone(container),
                event_tx.clone(),
                Arc::clone(&group),
            ));
        }

        // The round queue holds exactly one result per container; if the
        // loop below is not draining, polling stalls until space frees.
        let (round_tx, mut round_rx) = mpsc::channel(self.containers.len());
        let scheduler = tokio::spawn(poll_rounds(
            self.containers.clone(),
            interval,
            round_tx,
            shutdown_rx.clone(),
        ));

        let mut shutdown = shutdown_rx;
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                maybe = round_rx.recv() => match maybe {
                    Some((id, snapshot)) => {
                        if event_tx.send(Event::Stats { id, snapshot }).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        drop(event_tx);
        drop(round_rx);
        if let Err(e) = scheduler.await {
            tracing::error!(error = %e, "stats scheduler task failed");
        }
        await_writer(writer).await;
        Ok(())
    }
}

/// Tracks live OOM watchers; the last one to retire fires the shutdown
/// broadcast exactly once.
struct WatcherGroup {
    remaining: AtomicUsize,
    shutdown: watch::Sender<bool>,
}

impl WatcherGroup {
    fn retire(&self) {
        // Only the watcher that takes the count to zero owns the
        // broadcast; everyone else observes and skips. This avoids the
        // double-close hazard of several watchers racing to end the run.
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _ = self.shutdown.send(true);
        }
    }
}

async fn oom_watcher(
    container: Arc<dyn ContainerHandle>,
    events: mpsc::Sender<Event>,
    group: Arc<WatcherGroup>,
) {
    match container.subscribe_oom() {
        Ok(mut notifications) => {
            while notifications.recv().await.is_some() {
                let event = Event::Oom {
                    id: container.id().clone(),
                };
                if events.send(event).await.is_err() {
                    break;
                }
            }
            // Stream closed: the container no longer exists.
            tracing::debug!(id = %container.id(), "oom stream closed, watcher retiring");
        }
        Err(e) => {
            tracing::error!(id = %container.id(), error = %e, "oom subscription failed");
        }
    }
    group.retire();
}

type RoundResult = (ContainerId, Box<StatsSnapshot>);

async fn poll_rounds(
    containers: Vec<Arc<dyn ContainerHandle>>,
    interval: Duration,
    round_tx: mpsc::Sender<RoundResult>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = ticker.tick() => {}
        }

        // One short-lived task per container; the round is joined to
        // completion before the next tick can be observed.
        let mut round = JoinSet::new();
        for container in &containers {
            let container = Arc::clone(container);
            let _ = round.spawn_blocking(move || (container.id().clone(), container.stats()));
        }
        while let Some(joined) = round.join_next().await {
            match joined {
                Ok((id, Ok(snapshot))) => {
                    if round_tx.send((id, Box::new(snapshot))).await.is_err() {
                        return;
                    }
                }
                Ok((id, Err(e))) => {
                    tracing::error!(id = %id, error = %e, "stats collection failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "stats task failed");
                }
            }
        }
    }
}

/// Spawns the single serializing writer draining the event queue.
///
/// An encoding failure for one event is logged and does not stop the
/// writer; the queue is fully drained before the task finishes.
fn spawn_writer(
    mut events: mpsc::Receiver<Event>,
    mut out: impl Write + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event.to_json() {
                Ok(line) => {
                    if let Err(e) = writeln!(out, "{line}") {
                        tracing::error!(error = %e, "failed to write event");
                    }
                }
                Err(e) => tracing::error!(error = %e, "failed to encode event"),
            }
        }
        if let Err(e) = out.flush() {
            tracing::error!(error = %e, "failed to flush event stream");
        }
    })
}

async fn await_writer(writer: JoinHandle<()>) {
    if let Err(e) = writer.await {
        tracing::error!(error = %e, "event writer task failed");
    }
}
