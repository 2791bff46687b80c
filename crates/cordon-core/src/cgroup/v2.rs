//! Stat-file readers for the cgroups v2 unified hierarchy.
//!
//! Every parser takes the file content as a string so it can be exercised
//! without a mounted hierarchy; the top-level reader only does the file
//! plumbing.

use std::collections::HashMap;
use std::path::Path;

use cordon_common::error::{CordonError, Result};

use super::stats::{
    BlkioEntry, BlkioStats, CpuStats, CpuUsage, HugetlbStats, MemoryEntry, MemoryStats, PidsStats,
    StatsSnapshot, ThrottlingStats,
};

const NANOS_PER_MICRO: u64 = 1_000;

/// Reads a full [`StatsSnapshot`] from a container's cgroup directory.
///
/// # Errors
///
/// Returns an error if the cgroup directory does not exist. Individual
/// stat files a kernel does not provide are skipped, leaving their groups
/// absent in the snapshot.
pub fn read_stats(cgroup_path: &Path) -> Result<StatsSnapshot> {
    if !cgroup_path.is_dir() {
        return Err(CordonError::Io {
            path: cgroup_path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    }

    let mut snapshot = StatsSnapshot::default();

    if let Some(content) = read_opt(cgroup_path, "cpu.stat") {
        snapshot.cpu = parse_cpu_stat(&content);
    }
    snapshot.memory = read_memory(cgroup_path);
    snapshot.pids = PidsStats {
        current: read_opt(cgroup_path, "pids.current")
            .map(|c| parse_counter(&c))
            .unwrap_or_default(),
        limit: read_opt(cgroup_path, "pids.max")
            .map(|c| parse_limit(&c))
            .unwrap_or_default(),
    };
    if let Some(content) = read_opt(cgroup_path, "io.stat") {
        snapshot.blkio = parse_io_stat(&content);
    }
    snapshot.hugetlb = read_hugetlb(cgroup_path);

    tracing::trace!(path = %cgroup_path.display(), "read cgroup stats");
    Ok(snapshot)
}

/// Reads the out-of-memory kill counter from `memory.events`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, which callers treat as the
/// cgroup having been removed.
pub fn read_oom_kill_count(cgroup_path: &Path) -> Result<u64> {
    let path = cgroup_path.join("memory.events");
    let content = std::fs::read_to_string(&path).map_err(|e| CordonError::Io {
        path,
        source: e,
    })?;
    let events = parse_flat_keyed(&content);
    Ok(events
        .get("oom_kill")
        .or_else(|| events.get("oom"))
        .copied()
        .unwrap_or_default())
}

fn read_opt(cgroup_path: &Path, file: &str) -> Option<String> {
    std::fs::read_to_string(cgroup_path.join(file)).ok()
}

/// Parses newline-separated `key value` pairs (`cpu.stat`, `memory.stat`,
/// `memory.events`). Malformed lines are dropped.
fn parse_flat_keyed(content: &str) -> HashMap<String, u64> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(' ')?;
            Some((key.to_string(), value.trim().parse().ok()?))
        })
        .collect()
}

/// Parses a single-value counter file.
fn parse_counter(content: &str) -> u64 {
    content.trim().parse().unwrap_or_default()
}

/// Parses a limit file where `max` means unlimited (normalized to `0`).
fn parse_limit(content: &str) -> u64 {
    let trimmed = content.trim();
    if trimmed == "max" {
        0
    } else {
        trimmed.parse().unwrap_or_default()
    }
}

fn parse_cpu_stat(content: &str) -> CpuStats {
    let map = parse_flat_keyed(content);
    let get = |key: &str| map.get(key).copied().unwrap_or_default();
    CpuStats {
        usage: CpuUsage {
            kernel: get("system_usec") * NANOS_PER_MICRO,
            user: get("user_usec") * NANOS_PER_MICRO,
            total: get("usage_usec") * NANOS_PER_MICRO,
            // v2 has no per-CPU breakdown in cpu.stat.
            percpu: Vec::new(),
        },
        throttling: ThrottlingStats {
            periods: get("nr_periods"),
            throttled_periods: get("nr_throttled"),
            throttled_time: get("throttled_usec") * NANOS_PER_MICRO,
        },
    }
}

fn read_memory(cgroup_path: &Path) -> MemoryStats {
    let raw = read_opt(cgroup_path, "memory.stat")
        .map(|c| parse_flat_keyed(&c))
        .unwrap_or_default();
    let events = read_opt(cgroup_path, "memory.events")
        .map(|c| parse_flat_keyed(&c))
        .unwrap_or_default();

    let entry = |current: &str, max: &str, peak: &str, failcnt: u64| -> Option<MemoryEntry> {
        let usage = read_opt(cgroup_path, current).map(|c| parse_counter(&c))?;
        Some(MemoryEntry {
            limit: read_opt(cgroup_path, max)
                .map(|c| parse_limit(&c))
                .unwrap_or_default(),
            usage,
            max: read_opt(cgroup_path, peak)
                .map(|c| parse_counter(&c))
                .unwrap_or_default(),
            failcnt,
        })
    };

    MemoryStats {
        cache: raw.get("file").copied().unwrap_or_default(),
        usage: entry(
            "memory.current",
            "memory.max",
            "memory.peak",
            events.get("max").copied().unwrap_or_default(),
        ),
        swap: entry(
            "memory.swap.current",
            "memory.swap.max",
            "memory.swap.peak",
            0,
        ),
        // v2 does not account kernel or kernel-TCP memory separately.
        kernel: None,
        kernel_tcp: None,
        raw,
    }
}

/// Parses `io.stat`: one line per device, `MAJ:MIN key=value ...`.
fn parse_io_stat(content: &str) -> BlkioStats {
    let mut service_bytes = Vec::new();
    let mut serviced = Vec::new();

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let Some((major, minor)) = fields
            .next()
            .and_then(|dev| dev.split_once(':'))
            .and_then(|(maj, min)| Some((maj.parse().ok()?, min.parse().ok()?)))
        else {
            continue;
        };

        for field in fields {
            let Some((key, value)) = field.split_once('=') else {
                continue;
            };
            let Ok(value) = value.parse() else { continue };
            let (target, op) = match key {
                "rbytes" => (&mut service_bytes, "Read"),
                "wbytes" => (&mut service_bytes, "Write"),
                "rios" => (&mut serviced, "Read"),
                "wios" => (&mut serviced, "Write"),
                _ => continue,
            };
            target.push(BlkioEntry {
                major,
                minor,
                op: op.to_string(),
                value,
            });
        }
    }

    BlkioStats {
        io_service_bytes_recursive: service_bytes,
        io_serviced_recursive: serviced,
        ..BlkioStats::default()
    }
}

fn read_hugetlb(cgroup_path: &Path) -> HashMap<String, HugetlbStats> {
    let Ok(entries) = std::fs::read_dir(cgroup_path) else {
        return HashMap::new();
    };

    let mut stats = HashMap::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(page_size) = name
            .to_str()
            .and_then(|n| n.strip_prefix("hugetlb."))
            .and_then(|n| n.strip_suffix(".current"))
        else {
            continue;
        };

        let usage = read_opt(cgroup_path, &format!("hugetlb.{page_size}.current"))
            .map(|c| parse_counter(&c))
            .unwrap_or_default();
        let max = read_opt(cgroup_path, &format!("hugetlb.{page_size}.peak"))
            .map(|c| parse_counter(&c))
            .unwrap_or_default();
        let failcnt = read_opt(cgroup_path, &format!("hugetlb.{page_size}.events"))
            .map(|c| {
                parse_flat_keyed(&c)
                    .get("max")
                    .copied()
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        let _ = stats.insert(
            page_size.to_string(),
            HugetlbStats {
                usage,
                max,
                failcnt,
            },
        );
    }
    stats
}
