//! Security transition sequencing for bootstrapping container processes.
//!
//! Runs exactly once, single-threaded, inside the process that is about to
//! replace its own image with the user's program. Every stage is an
//! irreversible OS-level mutation and the sequence is fail-fast: the first
//! stage error aborts the bootstrap, is reported to the parent over the
//! synchronization pipe, and the process exits. There is no rollback —
//! namespace membership and dropped privilege cannot be undone.

use std::convert::Infallible;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::os::fd::OwnedFd;
use std::path::PathBuf;

use cordon_common::error::{CordonError, Result};
use cordon_common::types::ContainerId;
use cordon_core::seccomp::SyscallFilter;
use serde::Serialize;

/// Flags selecting optional bootstrap stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapFlags {
    /// Set the irrevocable `no_new_privs` flag before exec.
    pub no_new_privileges: bool,
    /// Receive a terminal over the handoff socket and take it as the
    /// controlling terminal.
    pub create_console: bool,
    /// Skip session keyring isolation and stay on the inherited keyring.
    pub disable_new_keyring: bool,
}

/// Immutable description of one process transition.
///
/// Owned exclusively by the single [`bootstrap`] call; never reused.
pub struct BootstrapSpec {
    /// Container this process belongs to.
    pub container_id: ContainerId,
    /// Optional-stage selection.
    pub flags: BootstrapFlags,
    /// Pre-compiled syscall filter, if the container has a seccomp policy.
    pub seccomp: Option<Box<dyn SyscallFilter>>,
    /// AppArmor profile name; empty means no profile.
    pub apparmor_profile: String,
    /// SELinux process label; empty means no label.
    pub process_label: String,
    /// Target program: `argv[0]` is used both as path and as `argv[0]`.
    pub argv: Vec<String>,
    /// Working directory to enter during namespace finalization.
    pub cwd: Option<PathBuf>,
    /// Hostname to publish when establishing a new UTS namespace.
    pub hostname: Option<String>,
    /// Console handoff socket, required when `create_console` is set.
    pub console_socket: Option<OwnedFd>,
    /// Synchronization pipe back to the orchestrating parent.
    pub sync_pipe: SyncPipe,
}

impl fmt::Debug for BootstrapSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapSpec")
            .field("container_id", &self.container_id)
            .field("flags", &self.flags)
            .field("seccomp", &self.seccomp.is_some())
            .field("apparmor_profile", &self.apparmor_profile)
            .field("process_label", &self.process_label)
            .field("argv", &self.argv)
            .field("cwd", &self.cwd)
            .field("hostname", &self.hostname)
            .field("console_socket", &self.console_socket.is_some())
            .finish_non_exhaustive()
    }
}

/// Write end of the private parent/child synchronization channel.
///
/// The bootstrapping child reports a fatal stage error through it as one
/// JSON record and otherwise writes nothing.
#[derive(Debug)]
pub struct SyncPipe {
    writer: File,
}

#[derive(Serialize)]
struct SyncError<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'a str,
}

impl SyncPipe {
    /// Wraps the write end of the synchronization channel.
    #[must_use]
    pub fn new(fd: OwnedFd) -> Self {
        Self {
            writer: File::from(fd),
        }
    }

    /// Reports a fatal bootstrap error to the parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    pub fn report_failure(&mut self, message: &str) -> Result<()> {
        let record = serde_json::to_string(&SyncError {
            kind: "bootstrapError",
            message,
        })?;
        writeln!(self.writer, "{record}").map_err(|e| CordonError::Io {
            path: "sync pipe".into(),
            source: e,
        })
    }
}

/// OS mutations performed by the non-conditional bootstrap stages.
///
/// A seam in the same spirit as the monitoring engine's container
/// abstraction: production code uses [`LinuxInitOps`], tests substitute a
/// recording implementation to verify stage ordering without touching the
/// kernel.
pub trait InitOps {
    /// Joins a private session keyring with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyring syscall fails.
    fn join_session_keyring(&self, name: &str) -> Result<()>;

    /// Receives the terminal over the handoff socket, wires it to the
    /// standard streams, and takes it as the controlling terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the handoff or any terminal operation fails.
    fn setup_console(&self, socket: &OwnedFd) -> Result<()>;

    /// Sets the irrevocable `no_new_privs` process flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the prctl call fails.
    fn set_no_new_privileges(&self) -> Result<()>;

    /// Applies the named AppArmor profile (no-op when empty).
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be applied.
    fn apply_apparmor_profile(&self, profile: &str) -> Result<()>;

    /// Applies the SELinux process label (no-op when empty).
    ///
    /// # Errors
    ///
    /// Returns an error if the label cannot be applied.
    fn set_process_label(&self, label: &str) -> Result<()>;

    /// Replaces the process image with the target program, inheriting the
    /// current environment. Never returns on success.
    ///
    /// # Errors
    ///
    /// Any return is an error: the exec itself failed.
    fn exec(&self, argv: &[String]) -> Result<Infallible>;
}

/// Production [`InitOps`] backed by `cordon-core`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxInitOps;

impl InitOps for LinuxInitOps {
    fn join_session_keyring(&self, name: &str) -> Result<()> {
        let _ = cordon_core::keyring::join_session_keyring(name)?;
        Ok(())
    }

    fn setup_console(&self, socket: &OwnedFd) -> Result<()> {
        let terminal = cordon_core::console::receive_console(socket)?;
        cordon_core::console::wire_stdio(&terminal)?;
        cordon_core::console::set_controlling_terminal()
    }

    fn set_no_new_privileges(&self) -> Result<()> {
        cordon_core::privileges::set_no_new_privileges()
    }

    fn apply_apparmor_profile(&self, profile: &str) -> Result<()> {
        cordon_core::mac::apply_apparmor_profile(profile)
    }

    fn set_process_label(&self, label: &str) -> Result<()> {
        cordon_core::mac::set_process_label(label)
    }

    fn exec(&self, argv: &[String]) -> Result<Infallible> {
        let c_args: Vec<std::ffi::CString> = argv
            .iter()
            .map(|a| std::ffi::CString::new(a.as_str()))
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| CordonError::InvalidArgument {
                message: "argv contains an interior NUL".into(),
            })?;
        match nix::unistd::execv(&c_args[0], &c_args) {
            Ok(never) => match never {},
            Err(e) => Err(CordonError::Sys {
                op: "execv",
                message: e.to_string(),
            }),
        }
    }
}

/// Remaining per-namespace identity setup, polymorphic over whether the
/// process is entering an existing container or establishing a new one.
///
/// Both variants honor the same stage contract: they run after privilege
/// narrowing has begun (stage 5) and before mandatory access control.
pub trait NamespaceFinalizer {
    /// Completes namespace identity for the bootstrapping process.
    ///
    /// # Errors
    ///
    /// Returns an error if any identity operation fails.
    fn finalize(&self, spec: &BootstrapSpec) -> Result<()>;
}

/// Finalizer for a process joining the namespaces of an existing container.
///
/// The namespaces already exist, so only process-local identity remains:
/// entering the configured working directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetnsFinalizer;

impl NamespaceFinalizer for SetnsFinalizer {
    fn finalize(&self, spec: &BootstrapSpec) -> Result<()> {
        if let Some(cwd) = &spec.cwd {
            nix::unistd::chdir(cwd).map_err(|e| CordonError::Sys {
                op: "chdir",
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Finalizer for a process establishing fresh namespaces.
///
/// In addition to process-local identity it publishes the container
/// hostname into the new UTS namespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct NewNamespaceFinalizer;

impl NamespaceFinalizer for NewNamespaceFinalizer {
    fn finalize(&self, spec: &BootstrapSpec) -> Result<()> {
        if let Some(hostname) = &spec.hostname {
            nix::unistd::sethostname(hostname).map_err(|e| CordonError::Sys {
                op: "sethostname",
                message: e.to_string(),
            })?;
        }
        if let Some(cwd) = &spec.cwd {
            nix::unistd::chdir(cwd).map_err(|e| CordonError::Sys {
                op: "chdir",
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Executes the ordered confinement sequence and execs the target program.
///
/// On success this never returns: the process image has been replaced. On
/// failure the stage error is logged with the full spec context at debug
/// severity, reported to the parent over the synchronization pipe, and
/// returned; the caller is expected to exit non-zero.
///
/// # Errors
///
/// Returns the first stage error encountered; no stage after a failing one
/// runs, and no partial work is rolled back.
pub fn bootstrap(
    mut spec: BootstrapSpec,
    ops: &dyn InitOps,
    finalizer: &dyn NamespaceFinalizer,
) -> Result<Infallible> {
    match run_stages(&spec, ops, finalizer) {
        Ok(never) => Ok(never),
        Err(err) => {
            tracing::debug!(spec = ?spec, error = %err, "bootstrap stage failed");
            if let Err(report_err) = spec.sync_pipe.report_failure(&err.to_string()) {
                tracing::debug!(error = %report_err, "failed to report bootstrap error to parent");
            }
            Err(err)
        }
    }
}

fn run_stages(
    spec: &BootstrapSpec,
    ops: &dyn InitOps,
    finalizer: &dyn NamespaceFinalizer,
) -> Result<Infallible> {
    if spec.argv.is_empty() {
        return Err(CordonError::InvalidArgument {
            message: "bootstrap requires a non-empty argv".into(),
        });
    }

    // Stage 1: keyring isolation. Must precede anything that could be
    // influenced by inherited key material.
    if !spec.flags.disable_new_keyring {
        ops.join_session_keyring(&cordon_core::keyring::session_ring_name(
            spec.container_id.as_str(),
        ))?;
    }

    // Stage 2: console setup, before privilege narrowing — a restrictive
    // seccomp filter may block the terminal-control ioctls.
    if spec.flags.create_console {
        let socket = spec
            .console_socket
            .as_ref()
            .ok_or_else(|| CordonError::InvalidArgument {
                message: "console requested but no handoff socket provided".into(),
            })?;
        ops.setup_console(socket)?;
    }

    // Stage 3: no-new-privileges, irrevocable from here on.
    if spec.flags.no_new_privileges {
        ops.set_no_new_privileges()?;
    }

    // Stage 4: without no_new_privs, loading a seccomp filter is itself a
    // privileged operation and must happen before further narrowing.
    if let Some(filter) = &spec.seccomp {
        if !spec.flags.no_new_privileges {
            filter.install()?;
        }
    }

    // Stage 5: namespace finalization.
    finalizer.finalize(spec)?;

    // Stage 6: mandatory access control, profile before label.
    ops.apply_apparmor_profile(&spec.apparmor_profile)?;
    ops.set_process_label(&spec.process_label)?;

    // Stage 7: with no_new_privs the filter loads as close to exec as
    // possible, so as few syscalls as possible run before confinement.
    if let Some(filter) = &spec.seccomp {
        if spec.flags.no_new_privileges {
            filter.install()?;
        }
    }

    tracing::debug!(spec = ?spec, "confinement complete, replacing process image");

    // Stage 8: process-image replacement. Never returns on success.
    ops.exec(&spec.argv)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct RecordingOps {
        calls: CallLog,
        fail_on: Option<&'static str>,
    }

    impl RecordingOps {
        fn record(&self, call: &str) -> Result<()> {
            self.calls.lock().expect("lock").push(call.to_string());
            if self.fail_on == Some(call) {
                return Err(CordonError::Sys {
                    op: "test",
                    message: format!("injected failure in {call}"),
                });
            }
            Ok(())
        }
    }

    impl InitOps for RecordingOps {
        fn join_session_keyring(&self, _name: &str) -> Result<()> {
            self.record("keyring")
        }

        fn setup_console(&self, _socket: &OwnedFd) -> Result<()> {
            self.record("console")
        }

        fn set_no_new_privileges(&self) -> Result<()> {
            self.record("no_new_privs")
        }

        fn apply_apparmor_profile(&self, _profile: &str) -> Result<()> {
            self.record("apparmor")
        }

        fn set_process_label(&self, _label: &str) -> Result<()> {
            self.record("selinux")
        }

        fn exec(&self, _argv: &[String]) -> Result<Infallible> {
            self.record("exec")?;
            // A successful exec never returns; tests always inject failure
            // here so the sequencer has something to hand back.
            Err(CordonError::Sys {
                op: "execv",
                message: "test exec sentinel".into(),
            })
        }
    }

    struct RecordingFilter {
        calls: CallLog,
    }

    impl SyscallFilter for RecordingFilter {
        fn install(&self) -> Result<()> {
            self.calls.lock().expect("lock").push("seccomp".to_string());
            Ok(())
        }
    }

    struct RecordingFinalizer {
        calls: CallLog,
    }

    impl NamespaceFinalizer for RecordingFinalizer {
        fn finalize(&self, _spec: &BootstrapSpec) -> Result<()> {
            self.calls.lock().expect("lock").push("finalize".to_string());
            Ok(())
        }
    }

    fn test_sync_pipe() -> (SyncPipe, File) {
        let (read, write) = nix::unistd::pipe().expect("pipe");
        (SyncPipe::new(write), File::from(read))
    }

    fn spec_with(flags: BootstrapFlags, seccomp: bool, calls: &CallLog) -> (BootstrapSpec, File) {
        let (sync_pipe, parent_end) = test_sync_pipe();
        let spec = BootstrapSpec {
            container_id: ContainerId::new("test-ctr"),
            flags,
            seccomp: seccomp.then(|| {
                Box::new(RecordingFilter {
                    calls: Arc::clone(calls),
                }) as Box<dyn SyscallFilter>
            }),
            apparmor_profile: "restricted".into(),
            process_label: "system_u:system_r:container_t:s0".into(),
            argv: vec!["/bin/true".into()],
            cwd: None,
            hostname: None,
            console_socket: None,
            sync_pipe,
        };
        (spec, parent_end)
    }

    fn run(flags: BootstrapFlags, seccomp: bool, fail_on: Option<&'static str>) -> (Vec<String>, File) {
        let calls: CallLog = Arc::default();
        let ops = RecordingOps {
            calls: Arc::clone(&calls),
            fail_on,
        };
        let finalizer = RecordingFinalizer {
            calls: Arc::clone(&calls),
        };
        let (spec, parent_end) = spec_with(flags, seccomp, &calls);
        let result = bootstrap(spec, &ops, &finalizer);
        assert!(result.is_err(), "bootstrap in tests must end in an error");
        let log = calls.lock().expect("lock").clone();
        (log, parent_end)
    }

    #[test]
    fn seccomp_installs_early_without_no_new_privs() {
        let (calls, _pipe) = run(
            BootstrapFlags {
                no_new_privileges: false,
                create_console: false,
                disable_new_keyring: false,
            },
            true,
            None,
        );
        assert_eq!(
            calls,
            ["keyring", "seccomp", "finalize", "apparmor", "selinux", "exec"]
        );
    }

    #[test]
    fn seccomp_installs_late_with_no_new_privs() {
        let (calls, _pipe) = run(
            BootstrapFlags {
                no_new_privileges: true,
                create_console: false,
                disable_new_keyring: false,
            },
            true,
            None,
        );
        assert_eq!(
            calls,
            [
                "keyring",
                "no_new_privs",
                "finalize",
                "apparmor",
                "selinux",
                "seccomp",
                "exec"
            ]
        );
    }

    #[test]
    fn disabled_keyring_is_skipped() {
        let (calls, _pipe) = run(
            BootstrapFlags {
                no_new_privileges: false,
                create_console: false,
                disable_new_keyring: true,
            },
            false,
            None,
        );
        assert_eq!(calls, ["finalize", "apparmor", "selinux", "exec"]);
    }

    #[test]
    fn stage_failure_short_circuits_before_exec() {
        let (calls, _pipe) = run(
            BootstrapFlags {
                no_new_privileges: true,
                create_console: false,
                disable_new_keyring: false,
            },
            true,
            Some("no_new_privs"),
        );
        assert_eq!(calls, ["keyring", "no_new_privs"]);
        assert!(!calls.contains(&"exec".to_string()));
    }

    #[test]
    fn failure_is_reported_over_sync_pipe() {
        use std::io::Read;

        let (_calls, mut parent_end) = run(
            BootstrapFlags::default(),
            false,
            Some("apparmor"),
        );
        let mut report = String::new();
        let _ = parent_end.read_to_string(&mut report).expect("read report");
        assert!(report.contains("bootstrapError"));
        assert!(report.contains("injected failure in apparmor"));
    }

    #[test]
    fn console_requires_handoff_socket() {
        let calls: CallLog = Arc::default();
        let ops = RecordingOps {
            calls: Arc::clone(&calls),
            fail_on: None,
        };
        let finalizer = RecordingFinalizer {
            calls: Arc::clone(&calls),
        };
        let (mut spec, _pipe) = spec_with(
            BootstrapFlags {
                no_new_privileges: false,
                create_console: true,
                disable_new_keyring: true,
            },
            false,
            &calls,
        );
        spec.console_socket = None;
        let err = bootstrap(spec, &ops, &finalizer).expect_err("missing socket");
        assert!(matches!(err, CordonError::InvalidArgument { .. }));
    }

    #[test]
    fn empty_argv_is_rejected_before_any_stage() {
        let calls: CallLog = Arc::default();
        let ops = RecordingOps {
            calls: Arc::clone(&calls),
            fail_on: None,
        };
        let finalizer = RecordingFinalizer {
            calls: Arc::clone(&calls),
        };
        let (mut spec, _pipe) = spec_with(BootstrapFlags::default(), false, &calls);
        spec.argv.clear();
        let err = bootstrap(spec, &ops, &finalizer).expect_err("empty argv");
        assert!(matches!(err, CordonError::InvalidArgument { .. }));
        assert!(calls.lock().expect("lock").is_empty());
    }
}
