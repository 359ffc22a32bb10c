//! Persisted measurement records.
//!
//! Field names serialize in camelCase; they are part of the telemetry
//! contract and must not be renamed.

use chrono::{DateTime, Utc};
use gigwise_core::{EntityType, FeedbackAction, ReasonKind};
use serde::{Deserialize, Serialize};

/// Coarse rank tier an exposure happened at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBucket {
    /// Positions 0–2.
    Top,
    /// Positions 3–9.
    Mid,
    /// Everything below.
    Low,
}

impl ScoreBucket {
    /// Bucket a zero-based list position.
    #[must_use]
    pub const fn from_position(position: usize) -> Self {
        match position {
            0..=2 => Self::Top,
            3..=9 => Self::Mid,
            _ => Self::Low,
        }
    }
}

/// One rendered item the viewer was shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exposure {
    /// Owning session.
    pub session_id: String,
    /// Surface the item rendered on.
    pub source: String,
    /// Ranking version label active at render time.
    pub version: String,
    /// Render time.
    pub timestamp: DateTime<Utc>,
    /// Entity kind of the item.
    pub item_type: EntityType,
    /// `{entity}:{slug}` key of the item.
    pub item_key: String,
    /// Zero-based rendered position.
    pub position: usize,
    /// Coarse rank tier.
    pub score_bucket: ScoreBucket,
    /// Sign of the dominant score term, when known.
    pub top_reason_kind: Option<ReasonKind>,
    /// Whether the exploration mixer spliced the item in.
    pub is_exploration: bool,
    /// Whether the diversity pass moved the item off pure score order.
    pub diversity_adjusted: bool,
}

/// One user action, attributed to an exposure when one qualifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Owning session.
    pub session_id: String,
    /// Action time.
    pub timestamp: DateTime<Utc>,
    /// What the viewer did.
    pub action: FeedbackAction,
    /// Entity kind of the item acted on.
    pub item_type: EntityType,
    /// `{entity}:{slug}` key of the item acted on.
    pub item_key: String,
    /// The exposure that caused this outcome, when attribution succeeded.
    pub attributed_exposure: Option<Exposure>,
}

/// Running counts for one calendar day of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMetrics {
    /// `YYYY-MM-DD` day key.
    pub day: String,
    /// Items shown.
    pub exposures: u64,
    /// Click outcomes.
    pub clicks: u64,
    /// Save outcomes.
    pub saves: u64,
    /// Follow outcomes.
    pub follows: u64,
    /// Exploration items shown.
    pub exploration_exposures: u64,
    /// Clicks attributed to exploration exposures.
    pub exploration_clicks: u64,
}

impl DayMetrics {
    /// Fresh counters for a day key.
    #[must_use]
    pub fn for_day(day: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            ..Self::default()
        }
    }

    /// Clicks per exposure, `0.0` when nothing was shown.
    #[must_use]
    pub fn ctr(&self) -> f64 {
        rate(self.clicks, self.exposures)
    }

    /// Saves per exposure.
    #[must_use]
    pub fn save_rate(&self) -> f64 {
        rate(self.saves, self.exposures)
    }

    /// Follows per exposure.
    #[must_use]
    pub fn follow_rate(&self) -> f64 {
        rate(self.follows, self.exposures)
    }

    /// Clicks per exposure among exploration items only.
    #[must_use]
    pub fn exploration_ctr(&self) -> f64 {
        rate(self.exploration_clicks, self.exploration_exposures)
    }
}

// Session-scale counts sit far below f64's integer precision limit.
#[allow(clippy::cast_precision_loss)]
fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// `YYYY-MM-DD` key for the UTC day containing `at`.
#[must_use]
pub fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}
