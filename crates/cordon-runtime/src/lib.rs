//! Runtime core for Cordon: confinement bootstrap and live monitoring.
//!
//! Two independent entry points live here. [`bootstrap`] turns a freshly
//! forked or joined process into a confined container process and replaces
//! its image; [`monitor`] fans out stats polling and OOM subscriptions
//! across running containers and serializes the results into one event
//! stream. They share only the [`container`] abstraction.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bootstrap;
pub mod container;
pub mod logs;
pub mod monitor;
