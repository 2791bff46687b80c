//! The seccomp installation seam.
//!
//! Filter compilation (profile JSON to BPF bytecode) happens outside this
//! workspace; a bootstrap receives an already-compiled filter as a handle
//! and only decides *when* to load it relative to the other confinement
//! stages.

use cordon_common::error::Result;

/// A compiled syscall filter ready to be loaded into the kernel.
///
/// Implementations wrap whatever the policy compiler produced; the
/// bootstrap sequencer calls `install` exactly once, either before or
/// after privilege narrowing depending on the `no_new_privs` flag.
pub trait SyscallFilter: Send + Sync {
    /// Loads the filter into the kernel for the calling process.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel rejects the filter.
    fn install(&self) -> Result<()>;
}
