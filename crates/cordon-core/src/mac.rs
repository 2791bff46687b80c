//! Mandatory access control application through `/proc/self/attr`.
//!
//! Both operations are no-ops when the profile or label is empty, so a
//! bootstrap without MAC configuration stays silent here.

use std::path::Path;

use cordon_common::error::{CordonError, Result};

const APPARMOR_EXEC_ATTR: &str = "/proc/self/attr/apparmor/exec";
const APPARMOR_EXEC_ATTR_LEGACY: &str = "/proc/self/attr/exec";
const SELINUX_EXEC_ATTR: &str = "/proc/self/attr/exec";

/// Schedules the named AppArmor profile for the next `exec`.
///
/// Writes `exec <profile>` to the AppArmor exec attribute, preferring the
/// namespaced attribute path on kernels that provide it. An empty profile
/// name is a no-op.
///
/// # Errors
///
/// Returns an error if the attribute file cannot be written.
pub fn apply_apparmor_profile(profile: &str) -> Result<()> {
    if profile.is_empty() {
        return Ok(());
    }
    let attr = if Path::new(APPARMOR_EXEC_ATTR).exists() {
        APPARMOR_EXEC_ATTR
    } else {
        APPARMOR_EXEC_ATTR_LEGACY
    };
    write_attr(attr, &format!("exec {profile}"))?;
    tracing::debug!(profile, "apparmor exec profile applied");
    Ok(())
}

/// Schedules the SELinux process label for the next `exec`.
///
/// An empty label is a no-op.
///
/// # Errors
///
/// Returns an error if the attribute file cannot be written.
pub fn set_process_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Ok(());
    }
    write_attr(SELINUX_EXEC_ATTR, label)?;
    tracing::debug!(label, "selinux process label applied");
    Ok(())
}

fn write_attr(path: &str, value: &str) -> Result<()> {
    std::fs::write(path, value).map_err(|e| CordonError::Io {
        path: path.into(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_is_a_noop() {
        apply_apparmor_profile("").expect("empty profile must not touch procfs");
    }

    #[test]
    fn empty_label_is_a_noop() {
        set_process_label("").expect("empty label must not touch procfs");
    }
}
