//! Single-instance enforcement through an advisory `flock` on a pid file.
//!
//! The lock is non-blocking: a second launch either gets the lock at once or
//! learns that another instance holds it. The OS drops the lock when the
//! holder dies, so a file left behind by a killed process is reclaimed by the
//! next launch.
//!
//! Release unlocks before it unlinks. A contender that opened the file just
//! before the unlink can still lock the orphaned inode, so acquisition checks
//! that the locked descriptor is still the file named by the path and retries
//! on a fresh open when it is not.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use nix::unistd::close;
use tracing::{debug, info, warn};

use super::PROCESS_TARGET;
use super::errors::LockError;

/// Result of an acquisition attempt.
#[derive(Debug)]
#[must_use = "contention must be handled"]
pub enum Acquisition {
    /// The lock is held by the returned handle.
    Acquired(LockHandle),
    /// Another process holds the lock.
    AlreadyRunning(Contention),
}

/// Details about a lock held by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contention {
    /// Lock file path.
    pub path: Utf8PathBuf,
    /// Pid recorded by the holder, when it could be read.
    pub pid: Option<u32>,
}

/// Entry points for the singleton lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingletonLock;

impl SingletonLock {
    /// Tries to take the lock at `path` without blocking.
    ///
    /// On success the file holds the decimal pid of the current process.
    pub fn acquire(path: &Utf8Path) -> Result<Acquisition, LockError> {
        for _ in 0..MAX_ATTEMPTS {
            let lock = match lock_opened(path, open_lock_file(path)?)? {
                Attempt::Locked(lock) => lock,
                Attempt::Busy => {
                    let contention = Contention {
                        path: path.to_path_buf(),
                        pid: read_pid(path),
                    };
                    info!(
                        target: PROCESS_TARGET,
                        file = %path,
                        holder = ?contention.pid,
                        "lock already held"
                    );
                    return Ok(Acquisition::AlreadyRunning(contention));
                }
                Attempt::Stale => {
                    debug!(
                        target: PROCESS_TARGET,
                        file = %path,
                        "lock file was replaced while locking; retrying"
                    );
                    continue;
                }
            };
            let mut handle = LockHandle {
                path: path.to_path_buf(),
                lock: Some(lock),
                held_pid: 0,
                released: false,
            };
            handle.record_pid(std::process::id())?;
            info!(
                target: PROCESS_TARGET,
                file = %path,
                pid = handle.held_pid,
                "acquired singleton lock"
            );
            return Ok(Acquisition::Acquired(handle));
        }
        Err(LockError::Lock {
            path: path.to_path_buf(),
            source: Errno::ESTALE,
        })
    }
}

/// Bound on re-opens when the lock file keeps being replaced underneath us.
const MAX_ATTEMPTS: usize = 8;

enum Attempt {
    Locked(Flock<File>),
    Busy,
    Stale,
}

fn open_lock_file(path: &Utf8Path) -> Result<File, LockError> {
    OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .mode(0o600)
        .open(path)
        .map_err(|source| LockError::Open {
            path: path.to_path_buf(),
            source,
        })
}

fn lock_opened(path: &Utf8Path, file: File) -> Result<Attempt, LockError> {
    let lock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(lock) => lock,
        Err((_, errno)) if errno == Errno::EWOULDBLOCK => return Ok(Attempt::Busy),
        Err((_, source)) => {
            return Err(LockError::Lock {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if names_same_file(path, &lock) {
        Ok(Attempt::Locked(lock))
    } else {
        Ok(Attempt::Stale)
    }
}

/// Whether `file` is still the inode reachable through `path`.
fn names_same_file(path: &Utf8Path, file: &File) -> bool {
    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(named)) => held.dev() == named.dev() && held.ino() == named.ino(),
        _ => false,
    }
}

/// Exclusive ownership of the lock file.
///
/// Dropping an unreleased handle releases it; call [`LockHandle::release`] to
/// observe release failures.
#[derive(Debug)]
pub struct LockHandle {
    path: Utf8PathBuf,
    lock: Option<Flock<File>>,
    held_pid: u32,
    released: bool,
}

impl LockHandle {
    /// Lock file path.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Pid currently recorded in the lock file.
    pub fn held_pid(&self) -> u32 {
        self.held_pid
    }

    /// Raw descriptor while the lock is held.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.lock.as_ref().map(|lock| lock.as_raw_fd())
    }

    /// Replaces the recorded pid, for example after forking into the background.
    pub fn record_pid(&mut self, pid: u32) -> Result<(), LockError> {
        let Some(lock) = self.lock.as_ref() else {
            return Err(LockError::Record {
                path: self.path.clone(),
                source: io::Error::from_raw_os_error(Errno::EBADF as i32),
            });
        };
        let mut file: &File = lock;
        write_pid(&mut file, pid).map_err(|source| LockError::Record {
            path: self.path.clone(),
            source,
        })?;
        self.held_pid = pid;
        Ok(())
    }

    /// Closes the descriptor while leaving the file in place.
    ///
    /// Shutdown paths may close the descriptor early; a later
    /// [`LockHandle::release`] still removes the file.
    pub fn close_descriptor(&mut self) -> Result<(), LockError> {
        let Some(lock) = self.lock.take() else {
            return Ok(());
        };
        match close_lock(lock) {
            Ok(()) | Err(Errno::EBADF) => Ok(()),
            Err(source) => Err(LockError::Release {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Closes the descriptor and removes the lock file.
    ///
    /// A descriptor that is already closed is not an error. The file is
    /// removed regardless of how closing went.
    pub fn release(mut self) -> Result<(), LockError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), LockError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let closed = self.close_descriptor();
        let removed = match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LockError::Remove {
                path: self.path.clone(),
                source,
            }),
        };
        debug!(
            target: PROCESS_TARGET,
            file = %self.path,
            "released singleton lock"
        );
        closed.and(removed)
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Err(error) = self.release_inner() {
            warn!(
                target: PROCESS_TARGET,
                file = %self.path,
                error = %error,
                "failed to release singleton lock"
            );
        }
    }
}

fn close_lock(lock: Flock<File>) -> Result<(), Errno> {
    match lock.unlock() {
        Ok(file) => close(file.into_raw_fd()),
        Err((lock, errno)) => {
            // The descriptor is gone; dropping the wrapper would close it again.
            std::mem::forget(lock);
            Err(errno)
        }
    }
}

fn write_pid(file: &mut &File, pid: u32) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    write!(file, "{pid}")?;
    file.flush()?;
    file.sync_all()?;
    file.seek(SeekFrom::Start(0))?;
    Ok(())
}

fn read_pid(path: &Utf8Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok()
}
