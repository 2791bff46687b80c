//! Console handoff for bootstrapping container processes.
//!
//! The orchestrating parent allocates a pseudo-terminal and passes the
//! slave descriptor to the child over a Unix socket (`SCM_RIGHTS`). The
//! child wires that descriptor to its standard streams and becomes the
//! controlling process of the terminal.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use cordon_common::error::{CordonError, Result};

/// Receives a terminal file descriptor over the console handoff socket.
///
/// # Errors
///
/// Returns an error if `recvmsg(2)` fails or the message carries no
/// `SCM_RIGHTS` descriptor.
#[cfg(target_os = "linux")]
pub fn receive_console(socket: &impl AsRawFd) -> Result<OwnedFd> {
    use std::io::IoSliceMut;

    use nix::sys::socket::{ControlMessageOwned, MsgFlags, recvmsg};

    let mut data = [0u8; 256];
    let mut iov = [IoSliceMut::new(&mut data)];
    let mut cmsg_buf = nix::cmsg_space!([RawFd; 1]);

    let msg = recvmsg::<()>(
        socket.as_raw_fd(),
        &mut iov,
        Some(&mut cmsg_buf),
        MsgFlags::empty(),
    )
    .map_err(|e| CordonError::Sys {
        op: "recvmsg",
        message: e.to_string(),
    })?;

    let cmsgs = msg.cmsgs().map_err(|e| CordonError::Sys {
        op: "recvmsg",
        message: e.to_string(),
    })?;
    for cmsg in cmsgs {
        if let ControlMessageOwned::ScmRights(fds) = cmsg {
            if let Some(&fd) = fds.first() {
                tracing::debug!(fd, "received console descriptor");
                // SAFETY: the descriptor was delivered to this process via
                // SCM_RIGHTS and is not owned by anything else.
                return Ok(unsafe { OwnedFd::from_raw_fd(fd) });
            }
        }
    }

    Err(CordonError::Sys {
        op: "recvmsg",
        message: "console socket message carried no file descriptor".into(),
    })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — console handoff requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn receive_console(_socket: &impl AsRawFd) -> Result<OwnedFd> {
    Err(CordonError::Sys {
        op: "recvmsg",
        message: "Linux required for console handoff".into(),
    })
}

/// Duplicates the terminal descriptor onto stdin, stdout, and stderr.
///
/// # Errors
///
/// Returns an error if any `dup2(2)` call fails.
pub fn wire_stdio(terminal: &impl AsRawFd) -> Result<()> {
    let fd = terminal.as_raw_fd();
    for target in 0..3 {
        // SAFETY: both descriptors are valid; dup2 does not take ownership.
        if unsafe { libc::dup2(fd, target) } < 0 {
            return Err(CordonError::Sys {
                op: "dup2",
                message: std::io::Error::last_os_error().to_string(),
            });
        }
    }
    Ok(())
}

/// Makes the calling process the controlling process of the terminal on
/// its standard input.
///
/// # Errors
///
/// Returns an error if the `TIOCSCTTY` ioctl fails.
#[cfg(target_os = "linux")]
pub fn set_controlling_terminal() -> Result<()> {
    // SAFETY: TIOCSCTTY on fd 0 takes an integer argument, no pointers.
    if unsafe { libc::ioctl(0, libc::TIOCSCTTY, 0) } < 0 {
        return Err(CordonError::Sys {
            op: "ioctl(TIOCSCTTY)",
            message: std::io::Error::last_os_error().to_string(),
        });
    }
    tracing::debug!("took controlling terminal");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — controlling-terminal setup requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_controlling_terminal() -> Result<()> {
    Err(CordonError::Sys {
        op: "ioctl(TIOCSCTTY)",
        message: "Linux required for controlling-terminal setup".into(),
    })
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use std::os::unix::net::UnixStream;

    use super::*;

    #[test]
    fn empty_socket_message_is_an_error() {
        let (ours, theirs) = UnixStream::pair().expect("socketpair");
        // A plain write carries no control message.
        std::io::Write::write_all(&mut (&theirs), b"x").expect("write");
        let err = receive_console(&ours).expect_err("no descriptor attached");
        assert!(err.to_string().contains("no file descriptor"));
    }

    #[test]
    fn descriptor_round_trips_over_socketpair() {
        use std::io::IoSlice;
        use std::os::fd::AsFd;

        use nix::sys::socket::{ControlMessage, MsgFlags, sendmsg};

        let (ours, theirs) = UnixStream::pair().expect("socketpair");
        let file = tempfile::tempfile().expect("tempfile");
        let fds = [file.as_raw_fd()];
        let cmsg = [ControlMessage::ScmRights(&fds)];
        let iov = [IoSlice::new(b"\0")];
        let _ = sendmsg::<()>(theirs.as_fd().as_raw_fd(), &iov, &cmsg, MsgFlags::empty(), None)
            .expect("sendmsg");

        let received = receive_console(&ours).expect("descriptor present");
        assert!(received.as_raw_fd() >= 0);
    }
}
