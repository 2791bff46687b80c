//! System-wide constants and default paths.

/// Default root directory holding per-container runtime state.
pub const DEFAULT_STATE_ROOT: &str = "/run/cordon";

/// Cgroups v2 unified hierarchy mount point.
pub const CGROUP_V2_PATH: &str = "/sys/fs/cgroup";

/// Per-container state file name inside the state root.
pub const STATE_FILE_NAME: &str = "state.json";

/// Default stats polling interval for `cordon events`, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Capacity of the serialized event queue; sized to absorb bursts from
/// many containers reporting in the same polling round.
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Prefix for the per-container session keyring name.
pub const SESSION_KEYRING_PREFIX: &str = "_ses";
