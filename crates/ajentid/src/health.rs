//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use camino::Utf8Path;

use crate::process::{Contention, RunMode};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked once the supervisor has picked a run mode.
    fn mode_selected(&self, mode: RunMode);

    /// Invoked after the singleton lock was taken.
    fn lock_acquired(&self, path: &Utf8Path, pid: u32);

    /// Invoked when another instance holds the singleton lock.
    fn lock_contended(&self, contention: &Contention);

    /// Invoked right before detaching from the terminal.
    fn detaching(&self, log_path: &Utf8Path);

    /// Invoked inside the detached process.
    fn detached(&self, pid: u32);

    /// Invoked before the entry point runs.
    fn entry_started(&self, mode: RunMode);

    /// Invoked after the entry point returned or unwound.
    fn entry_finished(&self, mode: RunMode, succeeded: bool);

    /// Invoked after the singleton lock was released explicitly.
    fn lock_released(&self, path: &Utf8Path);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn mode_selected(&self, mode: RunMode) {
        (**self).mode_selected(mode);
    }

    fn lock_acquired(&self, path: &Utf8Path, pid: u32) {
        (**self).lock_acquired(path, pid);
    }

    fn lock_contended(&self, contention: &Contention) {
        (**self).lock_contended(contention);
    }

    fn detaching(&self, log_path: &Utf8Path) {
        (**self).detaching(log_path);
    }

    fn detached(&self, pid: u32) {
        (**self).detached(pid);
    }

    fn entry_started(&self, mode: RunMode) {
        (**self).entry_started(mode);
    }

    fn entry_finished(&self, mode: RunMode, succeeded: bool) {
        (**self).entry_finished(mode, succeeded);
    }

    fn lock_released(&self, path: &Utf8Path) {
        (**self).lock_released(path);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn mode_selected(&self, mode: RunMode) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "mode_selected",
            ?mode,
            "run mode selected"
        );
    }

    fn lock_acquired(&self, path: &Utf8Path, pid: u32) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "lock_acquired",
            file = %path,
            pid,
            "singleton lock acquired"
        );
    }

    fn lock_contended(&self, contention: &Contention) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "lock_contended",
            file = %contention.path,
            holder = ?contention.pid,
            "singleton lock held by another instance"
        );
    }

    fn detaching(&self, log_path: &Utf8Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "detaching",
            log = %log_path,
            "detaching from terminal"
        );
    }

    fn detached(&self, pid: u32) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "detached",
            pid,
            "running detached"
        );
    }

    fn entry_started(&self, mode: RunMode) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "entry_started",
            ?mode,
            "starting service"
        );
    }

    fn entry_finished(&self, mode: RunMode, succeeded: bool) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "entry_finished",
            ?mode,
            succeeded,
            "service stopped"
        );
    }

    fn lock_released(&self, path: &Utf8Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "lock_released",
            file = %path,
            "singleton lock released"
        );
    }
}
