//! Log file preparation and rotation around detachment.
//!
//! Two files live in the log directory. The redirect target (`ajenti.log`)
//! receives whatever the detached process writes to stdout and stderr, such
//! as panic messages. Those descriptors are duplicated onto the file at
//! detach time, so it is rotated by renaming while the console is still
//! attached and failures can be reported to the operator.
//!
//! Tracing events move to a daily rolling appender once detached
//! (`ajenti.<date>.log`), which prunes itself to the configured backup count.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::debug;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::process::PROCESS_TARGET;
use crate::process::files::ensure_private_dir;
use crate::telemetry::{TelemetryError, TelemetryHandle};

/// Prepares the log destination used while running in the background.
pub trait LogSink: Send + Sync {
    /// Creates the log directory and rotates previous logs. Runs before detaching.
    fn prepare(&self) -> Result<(), LogSinkError>;

    /// Re-initialises logging inside the detached process.
    fn reinitialise(&self) -> Result<(), LogSinkError>;
}

/// Errors raised while preparing log output.
#[derive(Debug, Error)]
pub enum LogSinkError {
    /// The log directory could not be created.
    #[error("failed to create log directory \"{path}\": {source}")]
    CreateDirectory {
        /// Directory path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Shifting a log file to its backup name failed.
    #[error("failed to rotate \"{from}\" to \"{to}\": {source}")]
    Rotate {
        /// Source path.
        from: Utf8PathBuf,
        /// Destination path.
        to: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The rolling appender for detached events could not be opened.
    #[error("failed to open rolling log in \"{dir}\": {source}")]
    Appender {
        /// Log directory.
        dir: Utf8PathBuf,
        /// Underlying appender error.
        #[source]
        source: InitError,
    },
    /// Rebuilding telemetry output failed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Log sink that keeps numbered backups of the redirect target and routes
/// detached events through a rolling appender.
#[derive(Debug)]
pub struct RotatingLogSink {
    path: Utf8PathBuf,
    backups: usize,
    telemetry: Option<TelemetryHandle>,
}

impl RotatingLogSink {
    /// Builds a sink for `path` keeping `backups` rotated files.
    pub fn new(path: impl Into<Utf8PathBuf>, backups: usize) -> Self {
        Self {
            path: path.into(),
            backups,
            telemetry: None,
        }
    }

    /// Attaches the telemetry handle rebuilt after detaching.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Option<TelemetryHandle>) -> Self {
        self.telemetry = telemetry;
        self
    }

    fn backup_path(&self, index: usize) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.{index}", self.path))
    }

    fn log_dir(&self) -> &Utf8Path {
        self.path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."))
    }

    /// Appender for tracing events, named after the redirect target's stem.
    fn event_appender(&self) -> Result<RollingFileAppender, LogSinkError> {
        let dir = self.log_dir();
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(self.path.file_stem().unwrap_or(env!("CARGO_PKG_NAME")))
            .filename_suffix("log")
            .max_log_files(self.backups + 1)
            .build(dir)
            .map_err(|source| LogSinkError::Appender {
                dir: dir.to_path_buf(),
                source,
            })
    }

    fn rotate(&self) -> Result<(), LogSinkError> {
        if self.backups == 0 || !has_content(&self.path) {
            return Ok(());
        }
        for index in (1..self.backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                rename(&from, &self.backup_path(index + 1))?;
            }
        }
        rename(&self.path, &self.backup_path(1))?;
        debug!(
            target: PROCESS_TARGET,
            file = %self.path,
            backups = self.backups,
            "rotated log file"
        );
        Ok(())
    }
}

impl LogSink for RotatingLogSink {
    fn prepare(&self) -> Result<(), LogSinkError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_str().is_empty()) {
            ensure_private_dir(parent).map_err(|source| LogSinkError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.rotate()
    }

    fn reinitialise(&self) -> Result<(), LogSinkError> {
        let Some(telemetry) = &self.telemetry else {
            return Ok(());
        };
        let appender = self.event_appender()?;
        telemetry.reopen_detached(BoxMakeWriter::new(appender))?;
        debug!(
            target: PROCESS_TARGET,
            dir = %self.log_dir(),
            "telemetry moved to rolling log"
        );
        Ok(())
    }
}

fn has_content(path: &Utf8Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.len() > 0)
}

fn rename(from: &Utf8Path, to: &Utf8Path) -> Result<(), LogSinkError> {
    fs::rename(from, to).map_err(|source| LogSinkError::Rotate {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}
