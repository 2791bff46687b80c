//! Normalized, wire-stable container resource statistics.
//!
//! These types define the `data` payload of a `stats` event. They are kept
//! independent of any particular cgroup version; readers fill in what the
//! kernel exposes and leave the rest absent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Complete resource snapshot for one container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// CPU usage and throttling counters.
    pub cpu: CpuStats,
    /// Memory usage across the main, swap, and kernel categories.
    pub memory: MemoryStats,
    /// Process-count accounting.
    pub pids: PidsStats,
    /// Block I/O accounting.
    pub blkio: BlkioStats,
    /// Per-page-size hugepage usage, keyed by page size (e.g. `"2MB"`).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub hugetlb: HashMap<String, HugetlbStats>,
    /// Cache-QoS (resource director) telemetry, when the platform has it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_qos: Option<CacheQos>,
}

/// CPU usage and throttling for a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    /// Consumed CPU time.
    pub usage: CpuUsage,
    /// Bandwidth-controller throttling counters.
    pub throttling: ThrottlingStats,
}

/// Consumed CPU time, in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuUsage {
    /// Time spent in kernel mode.
    pub kernel: u64,
    /// Time spent in user mode.
    pub user: u64,
    /// Total consumed time.
    pub total: u64,
    /// Per-CPU breakdown, absent on kernels that do not expose it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub percpu: Vec<u64>,
}

/// CPU bandwidth throttling counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrottlingStats {
    /// Enforcement periods elapsed.
    pub periods: u64,
    /// Periods in which the group was throttled.
    pub throttled_periods: u64,
    /// Total throttled time in nanoseconds.
    pub throttled_time: u64,
}

/// Memory accounting across categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Page-cache bytes.
    pub cache: u64,
    /// Main memory usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<MemoryEntry>,
    /// Swap usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<MemoryEntry>,
    /// Kernel memory usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<MemoryEntry>,
    /// Kernel TCP buffer usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_tcp: Option<MemoryEntry>,
    /// Raw counters exactly as the kernel reported them.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub raw: HashMap<String, u64>,
}

/// One memory category's usage/limit pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Configured limit in bytes; `0` means unlimited.
    pub limit: u64,
    /// Current usage in bytes.
    pub usage: u64,
    /// High-water mark in bytes, `0` when the kernel does not track it.
    pub max: u64,
    /// Times the limit was hit.
    pub failcnt: u64,
}

/// Process-count accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidsStats {
    /// Current number of tasks.
    pub current: u64,
    /// Configured limit; `0` means unlimited.
    pub limit: u64,
}

/// Block I/O accounting across the eight recursive categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlkioStats {
    /// Bytes transferred per device and operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_service_bytes_recursive: Vec<BlkioEntry>,
    /// Operations completed per device and operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_serviced_recursive: Vec<BlkioEntry>,
    /// Requests queued per device and operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_queued_recursive: Vec<BlkioEntry>,
    /// Service time per device and operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_service_time_recursive: Vec<BlkioEntry>,
    /// Wait time per device and operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_wait_time_recursive: Vec<BlkioEntry>,
    /// Merged requests per device and operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_merged_recursive: Vec<BlkioEntry>,
    /// Disk time per device.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_time_recursive: Vec<BlkioEntry>,
    /// Sectors transferred per device.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sectors_recursive: Vec<BlkioEntry>,
}

/// One block I/O counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlkioEntry {
    /// Device major number.
    pub major: u64,
    /// Device minor number.
    pub minor: u64,
    /// Operation kind (`Read`, `Write`, ...), empty for per-device totals.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub op: String,
    /// Counter value.
    pub value: u64,
}

/// Hugepage usage for one page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HugetlbStats {
    /// Current usage in bytes.
    pub usage: u64,
    /// High-water mark in bytes, `0` when the kernel does not track it.
    pub max: u64,
    /// Times the limit was hit.
    pub failcnt: u64,
}

/// Cache-allocation telemetry from the platform's resource director.
///
/// Filled in by a resctrl reader on platforms that provide one; the
/// cgroup readers in this crate never populate it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheQos {
    /// Capacity bitmask of the cache.
    pub cbm_mask: String,
    /// Minimum number of bits a schema may set.
    pub min_cbm_bits: u64,
    /// Number of class-of-service IDs available.
    pub num_closids: u64,
    /// Root schema currently in force.
    pub schema_root: String,
    /// Schema applied to this container, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schema: String,
}
