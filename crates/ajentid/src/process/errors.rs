//! Defines the unified error surface for daemon launch and supervision.

use std::io;

use camino::Utf8PathBuf;
use nix::errno::Errno;
use thiserror::Error;

use crate::logs::LogSinkError;

use super::daemonizer::DaemonizeError;

/// Errors raised while holding or releasing the singleton lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock file could not be opened or created.
    #[error("failed to open lock file \"{path}\": {source}")]
    Open {
        /// Lock file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Locking failed for a reason other than contention.
    #[error("failed to lock \"{path}\": {source}")]
    Lock {
        /// Lock file path.
        path: Utf8PathBuf,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Writing the pid into the lock file failed.
    #[error("failed to record pid in \"{path}\": {source}")]
    Record {
        /// Lock file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Closing the lock descriptor failed unexpectedly.
    #[error("failed to release lock descriptor for \"{path}\": {source}")]
    Release {
        /// Lock file path.
        path: Utf8PathBuf,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Removing the lock file failed.
    #[error("failed to remove lock file \"{path}\": {source}")]
    Remove {
        /// Lock file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Another instance holds the singleton lock.
    #[error("another instance is already running: lock file \"{path}\" is held{}", holder_suffix(.pid))]
    AlreadyRunning {
        /// Lock file path.
        path: Utf8PathBuf,
        /// Pid recorded by the current holder, when readable.
        pid: Option<u32>,
    },
    /// Acquiring, recording or releasing the lock failed.
    #[error(transparent)]
    Lock(#[from] LockError),
    /// Preparing or re-initialising the log sink failed.
    #[error("failed to prepare daemon logging: {source}")]
    Logging {
        /// Underlying log sink error.
        #[source]
        source: LogSinkError,
    },
    /// The log file could not be opened for redirection.
    #[error("failed to open log file \"{path}\" for redirection: {source}")]
    LogStream {
        /// Log file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Daemonisation failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[source]
        source: DaemonizeError,
    },
}

impl From<DaemonizeError> for LaunchError {
    fn from(source: DaemonizeError) -> Self {
        Self::Daemonize { source }
    }
}

impl From<LogSinkError> for LaunchError {
    fn from(source: LogSinkError) -> Self {
        Self::Logging { source }
    }
}

fn holder_suffix(pid: &Option<u32>) -> String {
    pid.map(|pid| format!(" by pid {pid}")).unwrap_or_default()
}
