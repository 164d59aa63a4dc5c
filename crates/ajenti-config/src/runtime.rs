//! Runtime artefact paths used by the daemon supervisor.
//!
//! The lock file, log file and crash directory sit at well-known locations so
//! operators and init scripts can find them. Tests substitute a sandbox
//! through [`RuntimePaths::new`].

use camino::{Utf8Path, Utf8PathBuf};

use crate::defaults::{
    DEFAULT_CRASH_DIR, DEFAULT_LOCK_PATH, DEFAULT_LOG_BACKUPS, DEFAULT_LOG_PATH,
    DEFAULT_WORK_DIR,
};

/// Canonical paths for runtime artefacts written by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    lock_path: Utf8PathBuf,
    log_path: Utf8PathBuf,
    crash_dir: Utf8PathBuf,
    work_dir: Utf8PathBuf,
    log_backups: usize,
}

impl RuntimePaths {
    /// Builds a set of runtime paths.
    #[must_use]
    pub fn new(
        lock_path: impl Into<Utf8PathBuf>,
        log_path: impl Into<Utf8PathBuf>,
        crash_dir: impl Into<Utf8PathBuf>,
        work_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            lock_path: lock_path.into(),
            log_path: log_path.into(),
            crash_dir: crash_dir.into(),
            work_dir: work_dir.into(),
            log_backups: DEFAULT_LOG_BACKUPS,
        }
    }

    /// Places every artefact under `root`, keeping the default file names.
    #[must_use]
    pub fn sandboxed(root: &Utf8Path) -> Self {
        Self::new(
            root.join("ajenti.pid"),
            root.join("log").join("ajenti.log"),
            root.join("log"),
            root,
        )
    }

    /// Overrides how many rotated logs are kept.
    #[must_use]
    pub fn with_log_backups(mut self, backups: usize) -> Self {
        self.log_backups = backups;
        self
    }

    /// Path to the lock file guarding singleton startup.
    pub fn lock_path(&self) -> &Utf8Path {
        &self.lock_path
    }

    /// Path to the log file used for redirected output.
    pub fn log_path(&self) -> &Utf8Path {
        &self.log_path
    }

    /// Directory receiving crash reports.
    pub fn crash_dir(&self) -> &Utf8Path {
        &self.crash_dir
    }

    /// Working directory adopted after detaching.
    pub fn work_dir(&self) -> &Utf8Path {
        &self.work_dir
    }

    /// Number of rotated logs kept next to the active log.
    pub fn log_backups(&self) -> usize {
        self.log_backups
    }
}

impl Default for RuntimePaths {
    fn default() -> Self {
        Self::new(
            DEFAULT_LOCK_PATH,
            DEFAULT_LOG_PATH,
            DEFAULT_CRASH_DIR,
            DEFAULT_WORK_DIR,
        )
    }
}
