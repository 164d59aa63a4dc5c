//! Structured telemetry initialisation for the daemon.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, reload};

use ajenti_config::LogFormat;

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

static TELEMETRY: OnceCell<TelemetryHandle> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
///
/// The output layer sits behind a reload handle so it can be pointed at a file
/// writer once the process has detached from the console.
#[derive(Clone)]
pub struct TelemetryHandle {
    output: reload::Handle<OutputLayer, Registry>,
    format: LogFormat,
}

impl std::fmt::Debug for TelemetryHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TelemetryHandle")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl TelemetryHandle {
    /// Log format in use.
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Rebuilds the output layer to write uncoloured events to `writer`.
    pub fn reopen_detached(&self, writer: BoxMakeWriter) -> Result<(), TelemetryError> {
        self.output
            .reload(output_layer(self.format, false, writer))
            .map_err(|error| TelemetryError::Reload(error.to_string()))
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
    /// Failed to swap the output layer.
    #[error("failed to reload telemetry output: {0}")]
    Reload(String),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls return the handle created by the first call without
/// touching the global state again.
pub fn initialise(format: LogFormat, filter: &str) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY
        .get_or_try_init(|| install_subscriber(format, filter))
        .cloned()
}

fn install_subscriber(format: LogFormat, filter: &str) -> Result<TelemetryHandle, TelemetryError> {
    let filter =
        EnvFilter::try_new(filter).map_err(|error| TelemetryError::Filter(error.to_string()))?;
    // Colour only when stderr is an interactive terminal.
    let (output, handle) = reload::Layer::new(output_layer(
        format,
        io::stderr().is_terminal(),
        BoxMakeWriter::new(io::stderr),
    ));
    let subscriber = Registry::default().with(output).with(filter);
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    Ok(TelemetryHandle {
        output: handle,
        format,
    })
}

fn output_layer(format: LogFormat, ansi: bool, writer: BoxMakeWriter) -> OutputLayer {
    let layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(UtcTime::rfc_3339());
    match format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}
