//! Process supervision test world shared across BDD scenarios.

use std::cell::RefCell;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use rstest::fixture;
use tempfile::TempDir;

use ajenti_config::{RuntimePaths, StartupConfig};

use crate::crash::CrashHandler;
use crate::health::HealthReporter;
use crate::process::launch::{LaunchPlan, ProcessControl, ServiceDeps, run_daemon_with};
use crate::process::{Acquisition, LaunchError, LockHandle, RunMode, SingletonLock, StartupOutcome};

use super::doubles::{
    EntryBehaviour, LogFault, RecordingCrashHandler, ScriptedEntry, TestDaemonizer, TestLogSink,
    Timeline,
};
use super::reporter::{HealthEvent, RecordingHealthReporter};

pub type StepResult = Result<(), String>;

pub struct ProcessWorld {
    _dir: TempDir,
    paths: RuntimePaths,
    timeline: Timeline,
    behaviour: EntryBehaviour,
    pub reporter: Arc<RecordingHealthReporter>,
    pub crash: Arc<RecordingCrashHandler>,
    pub daemonizer: TestDaemonizer,
    pub log: TestLogSink,
    entry: Option<ScriptedEntry>,
    holder: Option<LockHandle>,
    result: Option<Result<StartupOutcome, LaunchError>>,
}

impl ProcessWorld {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let timeline = Timeline::default();
        let paths = RuntimePaths::sandboxed(&root);
        Self {
            _dir: dir,
            daemonizer: TestDaemonizer::new(Arc::clone(&timeline)),
            log: TestLogSink::new(paths.log_path(), Arc::clone(&timeline)),
            paths,
            timeline,
            behaviour: EntryBehaviour::Succeed,
            reporter: Arc::new(RecordingHealthReporter::default()),
            crash: Arc::new(RecordingCrashHandler::default()),
            entry: None,
            holder: None,
            result: None,
        }
    }

    pub fn script(&mut self, behaviour: EntryBehaviour) {
        self.behaviour = behaviour;
    }

    /// Takes the lock from this process and records `pid` as the holder.
    pub fn hold_lock_as(&mut self, pid: u32) -> StepResult {
        let acquisition = SingletonLock::acquire(&self.lock_path()).map_err(|error| error.to_string())?;
        let Acquisition::Acquired(mut handle) = acquisition else {
            return Err("lock unexpectedly contended".to_owned());
        };
        handle.record_pid(pid).map_err(|error| error.to_string())?;
        self.holder = Some(handle);
        Ok(())
    }

    pub fn run(&mut self, mode: RunMode) -> StepResult {
        if self.result.is_some() {
            return Err("daemon already ran".to_owned());
        }
        let config = StartupConfig {
            daemonize: mode == RunMode::Background,
            paths: self.paths.clone(),
            ..StartupConfig::default()
        };
        let entry = ScriptedEntry::new(self.behaviour, Arc::clone(&self.timeline));
        self.entry = Some(entry.clone());
        let plan = LaunchPlan {
            process: ProcessControl {
                daemonizer: self.daemonizer.clone(),
                log: self.log.clone(),
            },
            services: ServiceDeps {
                entry,
                crash: Arc::clone(&self.crash) as Arc<dyn CrashHandler>,
                reporter: Arc::clone(&self.reporter) as Arc<dyn HealthReporter>,
            },
        };
        self.result = Some(run_daemon_with(&config, plan));
        Ok(())
    }

    /// Outcome of a run that launched, failing the calling step otherwise.
    pub fn outcome(&self) -> &StartupOutcome {
        match self.result.as_ref() {
            Some(Ok(outcome)) => outcome,
            Some(Err(error)) => panic!("launch failed: {error}"),
            None => panic!("daemon did not run"),
        }
    }

    /// Error of a run that failed to launch, failing the calling step otherwise.
    pub fn launch_error(&self) -> &LaunchError {
        match self.result.as_ref() {
            Some(Err(error)) => error,
            Some(Ok(outcome)) => panic!("expected a launch error, got {outcome:?}"),
            None => panic!("daemon did not run"),
        }
    }

    pub fn fail_log_at(&mut self, fault: LogFault) {
        self.log.fail_at(fault);
    }

    pub fn entry_calls(&self) -> usize {
        self.entry.as_ref().map_or(0, ScriptedEntry::calls)
    }

    pub fn observed_lock(&self) -> Option<String> {
        self.entry.as_ref().and_then(ScriptedEntry::observed_lock)
    }

    pub fn lock_path(&self) -> Utf8PathBuf {
        self.paths.lock_path().to_path_buf()
    }

    pub fn lock_contents(&self) -> Option<String> {
        fs::read_to_string(self.paths.lock_path()).ok()
    }

    pub fn timeline(&self) -> Vec<&'static str> {
        self.timeline
            .lock()
            .expect("timeline mutex poisoned")
            .clone()
    }

    pub fn events(&self) -> Vec<HealthEvent> {
        self.reporter.events()
    }
}

impl Default for ProcessWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[fixture]
pub fn world() -> RefCell<ProcessWorld> {
    RefCell::new(ProcessWorld::new())
}
