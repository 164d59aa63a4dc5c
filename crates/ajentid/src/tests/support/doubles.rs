//! Injected collaborators used by the supervisor tests.

use std::fs;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};

use ajenti_config::{Cli, ConfigError, StartupConfig};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::crash::{CrashHandler, EntryPointFailure};
use crate::logs::{LogSink, LogSinkError};
use crate::process::{DaemonizeError, Daemonizer, RedirectStreams};
use crate::service::{EntryPoint, ServiceContext, ServiceFailure};
use crate::telemetry::TelemetryError;

/// Ordered record of supervisor side effects shared between doubles.
pub type Timeline = Arc<Mutex<Vec<&'static str>>>;

fn mark(timeline: &Timeline, step: &'static str) {
    timeline.lock().expect("timeline mutex poisoned").push(step);
}

/// Daemoniser that records calls instead of forking.
#[derive(Clone, Default)]
pub struct TestDaemonizer {
    calls: Arc<AtomicUsize>,
    timeline: Timeline,
}

impl TestDaemonizer {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            calls: Arc::default(),
            timeline,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Daemonizer for TestDaemonizer {
    fn daemonize(
        &self,
        _work_dir: &Utf8Path,
        streams: RedirectStreams,
    ) -> Result<(), DaemonizeError> {
        drop(streams);
        self.calls.fetch_add(1, Ordering::SeqCst);
        mark(&self.timeline, "daemonize");
        Ok(())
    }
}

/// Step of the log sink contract that a test wants to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFault {
    Prepare,
    Reinitialise,
}

/// Log sink that records preparation and re-initialisation.
///
/// Like the real sink, `prepare` creates the log directory so the supervisor
/// can open the redirected streams.
#[derive(Clone, Default)]
pub struct TestLogSink {
    log_path: Utf8PathBuf,
    fault: Option<LogFault>,
    prepared: Arc<AtomicUsize>,
    reinitialised: Arc<AtomicUsize>,
    timeline: Timeline,
}

impl TestLogSink {
    pub fn new(log_path: &Utf8Path, timeline: Timeline) -> Self {
        Self {
            log_path: log_path.to_path_buf(),
            fault: None,
            prepared: Arc::default(),
            reinitialised: Arc::default(),
            timeline,
        }
    }

    pub fn fail_at(&mut self, fault: LogFault) {
        self.fault = Some(fault);
    }

    pub fn prepared(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    pub fn reinitialised(&self) -> usize {
        self.reinitialised.load(Ordering::SeqCst)
    }
}

impl LogSink for TestLogSink {
    fn prepare(&self) -> Result<(), LogSinkError> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        mark(&self.timeline, "prepare");
        let Some(dir) = self.log_path.parent() else {
            return Ok(());
        };
        if self.fault == Some(LogFault::Prepare) {
            return Err(LogSinkError::CreateDirectory {
                path: dir.to_path_buf(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }
        fs::create_dir_all(dir).map_err(|source| LogSinkError::CreateDirectory {
            path: dir.to_path_buf(),
            source,
        })
    }

    fn reinitialise(&self) -> Result<(), LogSinkError> {
        self.reinitialised.fetch_add(1, Ordering::SeqCst);
        mark(&self.timeline, "reinitialise");
        if self.fault == Some(LogFault::Reinitialise) {
            return Err(LogSinkError::Telemetry(TelemetryError::Reload(
                "output layer dropped".to_owned(),
            )));
        }
        Ok(())
    }
}

/// Crash handler that keeps the rendered failures.
#[derive(Debug, Default)]
pub struct RecordingCrashHandler {
    failures: Mutex<Vec<String>>,
}

impl RecordingCrashHandler {
    pub fn failures(&self) -> Vec<String> {
        self.failures
            .lock()
            .expect("crash handler mutex poisoned")
            .clone()
    }
}

impl CrashHandler for RecordingCrashHandler {
    fn handle(&self, failure: &EntryPointFailure) {
        self.failures
            .lock()
            .expect("crash handler mutex poisoned")
            .push(failure.to_string());
    }
}

/// What a scripted entry point does when called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryBehaviour {
    Succeed,
    Fail,
    Interrupt,
    Panic,
}

/// Entry point that follows a script and records what it saw.
#[derive(Clone)]
pub struct ScriptedEntry {
    behaviour: EntryBehaviour,
    calls: Arc<AtomicUsize>,
    observed_lock: Arc<Mutex<Option<String>>>,
    timeline: Timeline,
}

impl ScriptedEntry {
    pub fn new(behaviour: EntryBehaviour, timeline: Timeline) -> Self {
        Self {
            behaviour,
            calls: Arc::default(),
            observed_lock: Arc::default(),
            timeline,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Lock file contents seen while the entry point ran.
    pub fn observed_lock(&self) -> Option<String> {
        self.observed_lock
            .lock()
            .expect("entry mutex poisoned")
            .clone()
    }
}

impl EntryPoint for ScriptedEntry {
    fn run(&self, context: &ServiceContext<'_>) -> Result<(), ServiceFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        mark(&self.timeline, "entry");
        *self.observed_lock.lock().expect("entry mutex poisoned") =
            fs::read_to_string(context.config.paths.lock_path()).ok();
        match self.behaviour {
            EntryBehaviour::Succeed => Ok(()),
            EntryBehaviour::Fail => Err(ServiceFailure::failed(io::Error::other(
                "service could not bind",
            ))),
            EntryBehaviour::Interrupt => Err(ServiceFailure::Interrupted),
            EntryBehaviour::Panic => panic!("service exploded"),
        }
    }
}

/// Loader that reports a missing config file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self, _cli: &Cli) -> Result<StartupConfig, BootstrapError> {
        Err(BootstrapError::Configuration {
            source: ConfigError::NotFound {
                path: Default::default(),
            },
        })
    }
}
