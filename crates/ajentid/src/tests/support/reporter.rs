//! Test double for [`HealthReporter`] that records lifecycle events for assertions.

use std::sync::Mutex;

use camino::Utf8Path;

use crate::health::HealthReporter;
use crate::process::{Contention, RunMode};

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    ModeSelected(RunMode),
    LockAcquired,
    LockContended(Option<u32>),
    Detaching,
    Detached,
    EntryStarted(RunMode),
    EntryFinished { mode: RunMode, succeeded: bool },
    LockReleased,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn mode_selected(&self, mode: RunMode) {
        self.record(HealthEvent::ModeSelected(mode));
    }

    fn lock_acquired(&self, _path: &Utf8Path, _pid: u32) {
        self.record(HealthEvent::LockAcquired);
    }

    fn lock_contended(&self, contention: &Contention) {
        self.record(HealthEvent::LockContended(contention.pid));
    }

    fn detaching(&self, _log_path: &Utf8Path) {
        self.record(HealthEvent::Detaching);
    }

    fn detached(&self, _pid: u32) {
        self.record(HealthEvent::Detached);
    }

    fn entry_started(&self, mode: RunMode) {
        self.record(HealthEvent::EntryStarted(mode));
    }

    fn entry_finished(&self, mode: RunMode, succeeded: bool) {
        self.record(HealthEvent::EntryFinished { mode, succeeded });
    }

    fn lock_released(&self, _path: &Utf8Path) {
        self.record(HealthEvent::LockReleased);
    }
}
