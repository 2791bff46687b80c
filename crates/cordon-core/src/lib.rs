//! # cordon-core
//!
//! Low-level Linux confinement primitives for the Cordon runtime.
//!
//! This crate provides safe abstractions over:
//! - **Session keyring**: private per-container key storage via `keyctl(2)`.
//! - **Console handoff**: receiving a PTY descriptor over a Unix socket and
//!   taking it as the controlling terminal.
//! - **Privileges**: the irrevocable `no_new_privs` process flag.
//! - **Mandatory access control**: AppArmor profile and SELinux label
//!   application through `/proc/self/attr`.
//! - **Seccomp**: the seam through which a pre-compiled syscall filter is
//!   installed.
//! - **Cgroups v2**: normalized resource statistics for running containers.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! proper error handling and `// SAFETY:` documentation.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod console;
pub mod keyring;
pub mod mac;
pub mod privileges;
pub mod seccomp;
