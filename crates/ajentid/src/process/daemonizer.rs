//! Implements the detachment backend for the `ajentid` process.

use std::ffi::OsStr;
use std::fs::File;

use camino::Utf8Path;
use daemonize_me::Daemon;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Log-file-backed targets for the redirected standard streams.
#[derive(Debug)]
pub struct RedirectStreams {
    /// Target for standard output.
    pub stdout: File,
    /// Target for standard error.
    pub stderr: File,
}

/// Abstraction over daemonisation strategies.
pub trait Daemonizer: Send + Sync {
    /// Detaches the process into the background.
    ///
    /// Returns in the detached process only; the launching process exits.
    fn daemonize(&self, work_dir: &Utf8Path, streams: RedirectStreams)
    -> Result<(), DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// System-level daemonisation failed.
    #[error("{0}")]
    System(#[from] daemonize_me::DaemonError),
}

/// Daemoniser that delegates to `daemonize-me`.
///
/// Forks, starts a new session, points stdout and stderr at the supplied
/// streams, stdin at `/dev/null`, and changes into `work_dir`.
#[derive(Debug, Default)]
pub struct SystemDaemonizer;

impl SystemDaemonizer {
    /// Builds a new system daemoniser.
    pub fn new() -> Self {
        Self
    }
}

impl Daemonizer for SystemDaemonizer {
    fn daemonize(
        &self,
        work_dir: &Utf8Path,
        streams: RedirectStreams,
    ) -> Result<(), DaemonizeError> {
        info!(
            target: PROCESS_TARGET,
            work_dir = %work_dir,
            "daemonising into background"
        );
        let RedirectStreams { stdout, stderr } = streams;
        Daemon::new()
            .work_dir(work_dir.as_std_path())
            .name(OsStr::new(env!("CARGO_PKG_NAME")))
            .stdout(stdout)
            .stderr(stderr)
            .start()?;
        info!(
            target: PROCESS_TARGET,
            pid = std::process::id(),
            "daemon process detached; continuing in child"
        );
        Ok(())
    }
}
