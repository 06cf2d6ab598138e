//! Cross-process run lock
//!
//! Mutating commands take one coarse advisory lock around the whole run.
//! The lock file holds the owning PID. A stale lock (dead owner or empty
//! file) self-heals by deletion; a live owner fails the run fast.
//!
//! The service sits behind a trait so staging logic can be tested without
//! touching the filesystem and the implementation can later move to
//! finer-grained leasing.

use crate::error::{Result, TuneError};
use std::path::PathBuf;

/// Acquire/release interface around the run lock
pub trait LockService {
    /// Take the lock, self-healing a stale one; fails with
    /// [`TuneError::LockHeld`] when a live process owns it
    fn acquire(&self) -> Result<()>;

    /// Drop the lock if we own it
    fn release(&self);

    /// PID currently recorded in the lock, if any
    fn owner(&self) -> Option<i32>;
}

/// File-backed lock holding the owning PID
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_owner(&self) -> Option<i32> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        text.trim().parse().ok()
    }
}

impl LockService for FileLock {
    fn acquire(&self) -> Result<()> {
        if self.path.exists() {
            match self.read_owner() {
                Some(pid) if pid_alive(pid) => return Err(TuneError::LockHeld { pid }),
                Some(pid) => {
                    tracing::info!("removing stale lock held by dead process {}", pid);
                    let _ = std::fs::remove_file(&self.path);
                }
                None => {
                    // Empty or unparsable lock file counts as stale
                    tracing::info!("removing stale lock file {}", self.path.display());
                    let _ = std::fs::remove_file(&self.path);
                }
            }
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TuneError::io(parent, e))?;
        }
        std::fs::write(&self.path, format!("{}\n", std::process::id()))
            .map_err(|e| TuneError::io(&self.path, e))?;
        Ok(())
    }

    fn release(&self) {
        if self.owner() == Some(std::process::id() as i32) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn owner(&self) -> Option<i32> {
        self.read_owner()
    }
}

/// No-op lock for read-only commands and tests
#[derive(Debug, Clone, Default)]
pub struct NullLock;

impl LockService for NullLock {
    fn acquire(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) {}

    fn owner(&self) -> Option<i32> {
        None
    }
}

#[cfg(unix)]
fn pid_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if pid <= 0 {
        return false;
    }
    // Signal 0 probes existence without delivering anything. EPERM means
    // the process exists but belongs to someone else.
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn pid_alive(_pid: i32) -> bool {
    false
}
