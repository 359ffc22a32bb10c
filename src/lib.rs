//! Facade crate for the Gigwise personalization engine.
//!
//! Re-exports the domain types, taste model operations, ranking pipeline,
//! and measurement pipeline from the member crates, with the file-backed
//! session store behind the `store-fs` feature.

#![forbid(unsafe_code)]

pub use gigwise_core::{
    Candidate, EntityType, FeedbackAction, FeedbackEvent, MemoryStore, Preferences, RankedItem,
    ReasonKind, ScoreEntry, SessionStore, Signals, SourceCategory, TasteModel, keys,
};

#[cfg(feature = "store-fs")]
pub use gigwise_core::JsonFileStore;

pub use gigwise_taste::{ActionDeltas, TasteConfig, apply_update, load_and_decay, save};

pub use gigwise_rank::{
    DiversityConfig, ExplorationConfig, MixOutcome, RankOutcome, RankRequest, Ranker, RankerConfig,
    RankingVersion, ScoreWeights,
};

pub use gigwise_metrics::{
    BufferSink, DayMetrics, Exposure, ExposureBatch, MeasureConfig, MeasurementPipeline, NullSink,
    Outcome, ScoreBucket, TelemetrySink,
};
