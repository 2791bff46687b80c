//! Cgroups v2 resource statistics.
//!
//! Reads the unified hierarchy's stat files for a container's cgroup and
//! normalizes them into [`stats::StatsSnapshot`], the wire-stable form the
//! monitoring engine emits. Units are normalized (nanoseconds, bytes)
//! regardless of which kernel produced the files; groups the kernel does
//! not expose are left absent rather than zero-filled.

pub mod stats;
pub mod v2;

pub use stats::StatsSnapshot;
