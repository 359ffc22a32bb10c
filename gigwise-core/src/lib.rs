//! Core domain types for the Gigwise personalization engine.
//!
//! These models carry the data contracts shared by the taste model, the
//! ranking engine, and the measurement pipeline: candidate items, per-request
//! signals, viewer preferences, the feedback vocabulary, ranked results, and
//! the session store seam that scopes all persisted state to one viewer
//! session.

#![forbid(unsafe_code)]

pub mod candidate;
pub mod feedback;
pub mod ranked;
pub mod signals;
pub mod store;
pub mod taste;

pub use candidate::{Candidate, EntityType, EntityTypeParseError, SourceCategory};
pub use feedback::{FeedbackAction, FeedbackActionParseError, FeedbackEvent};
pub use ranked::{RankedItem, ReasonKind, ScoreEntry};
pub use signals::{Preferences, Signals};
pub use store::{MemoryStore, SessionStore, keys};
pub use taste::{Daypart, TasteModel, normalize_key};

#[cfg(feature = "store-fs")]
pub use store::JsonFileStore;
