//! Session keyring isolation via `keyctl(2)`.
//!
//! A bootstrapping container process joins a fresh session keyring so it
//! does not inherit key material from an ancestor's session.

use cordon_common::error::{CordonError, Result};

/// Joins (creating if necessary) a session keyring with the given name.
///
/// Returns the serial number of the joined keyring.
///
/// # Errors
///
/// Returns an error if the `keyctl(KEYCTL_JOIN_SESSION_KEYRING)` syscall
/// fails.
#[cfg(target_os = "linux")]
pub fn join_session_keyring(name: &str) -> Result<i64> {
    let c_name = std::ffi::CString::new(name).map_err(|_| CordonError::Sys {
        op: "keyctl",
        message: format!("keyring name {name:?} contains an interior NUL"),
    })?;

    // SAFETY: KEYCTL_JOIN_SESSION_KEYRING reads the name as a NUL-terminated
    // string; c_name outlives the call.
    let serial = unsafe {
        libc::syscall(
            libc::SYS_keyctl,
            libc::KEYCTL_JOIN_SESSION_KEYRING,
            c_name.as_ptr(),
        )
    };
    if serial < 0 {
        return Err(CordonError::Sys {
            op: "keyctl",
            message: std::io::Error::last_os_error().to_string(),
        });
    }
    tracing::debug!(name, serial, "joined session keyring");
    Ok(serial)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — session keyrings require Linux.
#[cfg(not(target_os = "linux"))]
pub fn join_session_keyring(_name: &str) -> Result<i64> {
    Err(CordonError::Sys {
        op: "keyctl",
        message: "Linux required for session keyring isolation".into(),
    })
}

/// Returns the session keyring name for a container identifier.
#[must_use]
pub fn session_ring_name(container_id: &str) -> String {
    format!(
        "{}.{container_id}",
        cordon_common::constants::SESSION_KEYRING_PREFIX
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_name_is_scoped_to_container() {
        assert_eq!(session_ring_name("web-1"), "_ses.web-1");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn interior_nul_is_rejected() {
        let err = join_session_keyring("bad\0name").expect_err("NUL must be rejected");
        assert!(err.to_string().contains("NUL"));
    }
}
