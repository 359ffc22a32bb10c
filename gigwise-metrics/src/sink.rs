//! Telemetry emission seam.
//!
//! The pipeline emits named events through this trait; the library never
//! talks to a network itself. Emission failures are swallowed by the
//! caller — they must never affect measurement bookkeeping.

use serde_json::Value;
use thiserror::Error;

/// Error raised by a telemetry backend.
#[derive(Debug, Error)]
#[error("telemetry emission failed: {0}")]
pub struct TelemetryError(pub String);

/// Named-event telemetry collaborator.
pub trait TelemetrySink {
    /// Emit one named event with a JSON payload.
    ///
    /// # Errors
    /// Returns [`TelemetryError`] when the backend rejects the event; the
    /// pipeline logs and discards such failures.
    fn emit(&mut self, event: &str, payload: &Value) -> Result<(), TelemetryError>;
}

/// Sink that drops every event. Useful when measurement should run without
/// emission.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn emit(&mut self, _event: &str, _payload: &Value) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// In-memory sink recording every event, used by tests.
#[derive(Debug, Default)]
pub struct BufferSink {
    events: Vec<(String, Value)>,
}

impl BufferSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[(String, Value)] {
        &self.events
    }

    /// Count events with the given name.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|(name, _)| name == event).count()
    }
}

impl TelemetrySink for BufferSink {
    fn emit(&mut self, event: &str, payload: &Value) -> Result<(), TelemetryError> {
        self.events.push((event.to_owned(), payload.clone()));
        Ok(())
    }
}
