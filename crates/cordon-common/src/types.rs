//! Domain primitive types used across the Cordon workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a container as observed by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// Container has been created but its init process has not started.
    Created,
    /// Container init process is alive.
    Running,
    /// Container processes are frozen.
    Paused,
    /// Container init process has exited.
    Stopped,
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_id_display_matches_inner() {
        let id = ContainerId::new("web-1");
        assert_eq!(id.to_string(), "web-1");
        assert_eq!(id.as_str(), "web-1");
    }

    #[test]
    fn container_id_serializes_as_plain_string() {
        let id = ContainerId::new("web-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"web-1\"");
    }

    #[test]
    fn status_displays_lowercase() {
        assert_eq!(ContainerStatus::Stopped.to_string(), "stopped");
        assert_eq!(ContainerStatus::Running.to_string(), "running");
    }
}
