//! Container handles for the monitoring engine.
//!
//! A [`ContainerHandle`] is a reference to a container owned by some other
//! part of the runtime; it is resolved lazily, lives for one command
//! invocation, and exposes only what monitoring needs: status, stats, and
//! an OOM notification stream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cordon_common::constants::STATE_FILE_NAME;
use cordon_common::error::{CordonError, Result};
use cordon_common::types::{ContainerId, ContainerStatus};
use cordon_core::cgroup::StatsSnapshot;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// How often an OOM subscription samples the kernel's memory event counter.
const OOM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Reference to a running (or recently running) container.
///
/// Handles are `Debug` so they can appear in resolution errors and
/// diagnostic logs.
pub trait ContainerHandle: std::fmt::Debug + Send + Sync {
    /// Identifier the handle was resolved from.
    fn id(&self) -> &ContainerId;

    /// Current lifecycle status.
    ///
    /// # Errors
    ///
    /// Returns an error if the container's state cannot be determined.
    fn status(&self) -> Result<ContainerStatus>;

    /// Collects a normalized stats snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the container's resource accounting cannot be
    /// read (typically because the container is gone).
    fn stats(&self) -> Result<StatsSnapshot>;

    /// Subscribes to the container's OOM notifications.
    ///
    /// One message is delivered per OOM kill; the channel closes when the
    /// container no longer exists. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    fn subscribe_oom(&self) -> Result<mpsc::Receiver<()>>;
}

/// Resolves container identifiers to handles for one command invocation.
pub trait ContainerRegistry: Send + Sync {
    /// Looks up a container by identifier.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error for unknown identifiers.
    fn resolve(&self, id: &str) -> Result<Arc<dyn ContainerHandle>>;
}

/// On-disk record written by the runtime when a container starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    /// Container identifier.
    pub id: ContainerId,
    /// PID of the container's init process.
    pub init_pid: i32,
    /// Absolute path of the container's cgroup directory.
    pub cgroup_path: PathBuf,
}

/// Registry backed by a runtime state directory.
///
/// Each container owns `<root>/<id>/state.json`; a missing directory means
/// the identifier is unknown.
#[derive(Debug, Clone)]
pub struct LocalRegistry {
    state_root: PathBuf,
}

impl LocalRegistry {
    /// Creates a registry over the given state root.
    #[must_use]
    pub const fn new(state_root: PathBuf) -> Self {
        Self { state_root }
    }
}

impl ContainerRegistry for LocalRegistry {
    fn resolve(&self, id: &str) -> Result<Arc<dyn ContainerHandle>> {
        let state_path = self.state_root.join(id).join(STATE_FILE_NAME);
        let content = std::fs::read_to_string(&state_path).map_err(|_| CordonError::NotFound {
            kind: "container",
            id: id.to_string(),
        })?;
        let record: StateRecord = serde_json::from_str(&content)?;
        tracing::debug!(id, pid = record.init_pid, "resolved container");
        Ok(Arc::new(LocalContainer { record }))
    }
}

/// Handle over a state record plus the live kernel interfaces behind it.
#[derive(Debug)]
struct LocalContainer {
    record: StateRecord,
}

impl ContainerHandle for LocalContainer {
    fn id(&self) -> &ContainerId {
        &self.record.id
    }

    fn status(&self) -> Result<ContainerStatus> {
        // Signal 0 probes liveness without delivering anything.
        let pid = nix::unistd::Pid::from_raw(self.record.init_pid);
        match nix::sys::signal::kill(pid, None) {
            Ok(()) => Ok(ContainerStatus::Running),
            Err(nix::errno::Errno::ESRCH) => Ok(ContainerStatus::Stopped),
            Err(e) => Err(CordonError::Sys {
                op: "kill",
                message: e.to_string(),
            }),
        }
    }

    fn stats(&self) -> Result<StatsSnapshot> {
        cordon_core::cgroup::v2::read_stats(&self.record.cgroup_path)
    }

    fn subscribe_oom(&self) -> Result<mpsc::Receiver<()>> {
        let baseline = cordon_core::cgroup::v2::read_oom_kill_count(&self.record.cgroup_path)?;
        let (tx, rx) = mpsc::channel(16);
        let cgroup_path = self.record.cgroup_path.clone();
        let id = self.record.id.clone();

        let _ = tokio::spawn(async move {
            let mut seen = baseline;
            let mut ticker = tokio::time::interval(OOM_POLL_INTERVAL);
            loop {
                let _ = ticker.tick().await;
                match cordon_core::cgroup::v2::read_oom_kill_count(&cgroup_path) {
                    Ok(count) => {
                        while seen < count {
                            seen += 1;
                            if tx.send(()).await.is_err() {
                                return;
                            }
                        }
                    }
                    // The cgroup is gone: the container stopped. Dropping
                    // the sender closes the subscription.
                    Err(_) => {
                        tracing::debug!(id = %id, "cgroup removed, closing oom stream");
                        return;
                    }
                }
            }
        });
        Ok(rx)
    }
}
