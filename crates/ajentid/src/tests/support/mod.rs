//! Test harness utilities for the supervisor behavioural suite.

mod doubles;
mod process_world;
mod reporter;

pub use doubles::{EntryBehaviour, FailingConfigLoader, LogFault, TestDaemonizer, TestLogSink};
pub use process_world::{ProcessWorld, StepResult, world};
pub use reporter::{HealthEvent, RecordingHealthReporter};
