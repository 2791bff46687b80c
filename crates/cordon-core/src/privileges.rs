//! Privilege narrowing for bootstrapping container processes.

use cordon_common::error::{CordonError, Result};

/// Sets the irrevocable `no_new_privs` flag on the calling process.
///
/// After this call neither the process nor any of its descendants can gain
/// privileges through a set-uid, set-gid, or file-capability exec. There is
/// no way to clear the flag for the remaining process lifetime.
///
/// # Errors
///
/// Returns an error if `prctl(PR_SET_NO_NEW_PRIVS)` fails.
#[cfg(target_os = "linux")]
pub fn set_no_new_privileges() -> Result<()> {
    nix::sys::prctl::set_no_new_privs().map_err(|e| CordonError::Sys {
        op: "prctl(PR_SET_NO_NEW_PRIVS)",
        message: e.to_string(),
    })?;
    tracing::debug!("no_new_privs set");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — `no_new_privs` requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_no_new_privileges() -> Result<()> {
    Err(CordonError::Sys {
        op: "prctl(PR_SET_NO_NEW_PRIVS)",
        message: "Linux required for no_new_privs".into(),
    })
}
