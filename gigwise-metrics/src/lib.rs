//! Exposure/outcome measurement for Gigwise ranking.
//!
//! Records which items a viewer actually saw, attributes subsequent
//! actions to those exposures within a bounded time window, and keeps
//! per-day session metrics. All state lives in an injected
//! [`SessionStore`](gigwise_core::SessionStore); emission goes through the
//! [`TelemetrySink`] seam and its failures never affect bookkeeping.

#![forbid(unsafe_code)]

pub mod pipeline;
pub mod records;
pub mod sink;

pub use pipeline::{
    EXPOSURE_EVENT, ExposureBatch, MeasureConfig, MeasurementPipeline, OUTCOME_EVENT,
    SESSION_METRICS_EVENT,
};
pub use records::{DayMetrics, Exposure, Outcome, ScoreBucket, day_key};
pub use sink::{BufferSink, NullSink, TelemetryError, TelemetrySink};
