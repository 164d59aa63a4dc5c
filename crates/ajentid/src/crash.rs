//! Crash routing for failures that escape the service entry point.
//!
//! Once detached, stderr is the log file and nobody is watching a console.
//! The crash handler therefore writes a standalone report next to the logs in
//! addition to emitting a structured error event.

use std::any::Any;
use std::error::Error as StdError;

use camino::Utf8PathBuf;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::error;

use ajenti_config::StartupConfig;

use crate::process::files::atomic_write;
use crate::service::BoxError;

const CRASH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::crash");

/// A failure that escaped the entry point.
#[derive(Debug, Error)]
pub enum EntryPointFailure {
    /// The entry point returned an error.
    #[error("service failed: {source}")]
    Error {
        /// Error returned by the service.
        #[source]
        source: BoxError,
    },
    /// The entry point panicked.
    #[error("service panicked: {message}")]
    Panic {
        /// Panic payload rendered as text.
        message: String,
    },
    /// The entry point reported a user interrupt while detached from any terminal.
    #[error("service reported a user interrupt while running detached")]
    DetachedInterrupt,
}

impl EntryPointFailure {
    /// Builds a failure from a caught panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-textual panic payload".to_owned());
        Self::Panic { message }
    }
}

/// Records a fatal failure for post-mortem diagnosis.
#[cfg_attr(test, mockall::automock)]
pub trait CrashHandler: Send + Sync {
    /// Records `failure`. Called at most once per process.
    fn handle(&self, failure: &EntryPointFailure);
}

/// Crash handler writing a report file into the crash directory.
#[derive(Debug, Clone)]
pub struct CrashReporter {
    crash_dir: Utf8PathBuf,
    platform: String,
    config_path: Utf8PathBuf,
}

impl CrashReporter {
    /// Builds a reporter from the startup configuration.
    pub fn new(config: &StartupConfig) -> Self {
        Self {
            crash_dir: config.paths.crash_dir().to_path_buf(),
            platform: config.platform.to_string(),
            config_path: config.config_path.clone(),
        }
    }

    /// Renders the report text for `failure`.
    pub fn render(&self, failure: &EntryPointFailure, now: OffsetDateTime, pid: u32) -> String {
        let timestamp = now
            .format(&Rfc3339)
            .unwrap_or_else(|_| now.unix_timestamp().to_string());
        let mut report = format!(
            "{name} crash report\nversion: {version}\ntime: {timestamp}\npid: {pid}\n\
             platform: {platform}\nconfig: \"{config}\"\n\n{failure}\n",
            name = env!("CARGO_PKG_NAME"),
            version = env!("CARGO_PKG_VERSION"),
            platform = self.platform,
            config = self.config_path,
        );
        let mut source = failure.source();
        while let Some(cause) = source {
            report.push_str(&format!("caused by: {cause}\n"));
            source = cause.source();
        }
        report
    }

    fn report_path(&self, now: OffsetDateTime, pid: u32) -> Utf8PathBuf {
        self.crash_dir
            .join(format!("crash-{}-{pid}.txt", now.unix_timestamp()))
    }
}

impl CrashHandler for CrashReporter {
    fn handle(&self, failure: &EntryPointFailure) {
        let now = OffsetDateTime::now_utc();
        let pid = std::process::id();
        let path = self.report_path(now, pid);
        let report = self.render(failure, now, pid);
        match atomic_write(&path, report.as_bytes()) {
            Ok(()) => error!(
                target: CRASH_TARGET,
                error = %failure,
                report = %path,
                "service crashed; report written"
            ),
            Err(write_error) => error!(
                target: CRASH_TARGET,
                error = %failure,
                report = %path,
                write_error = %write_error,
                details = %report,
                "service crashed; report could not be written"
            ),
        }
    }
}
