//! The persisted taste model: per-session decaying affinity weights.
//!
//! The data type lives here so signal bundles can carry a snapshot without
//! depending on the learning crate; the decay/update/save operations live in
//! `gigwise-taste`.

use std::collections::HashMap;

use chrono::{DateTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Current on-disk schema version for [`TasteModel`].
pub const TASTE_MODEL_VERSION: u32 = 1;

/// Coarse time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Daypart {
    /// 05:00–11:59.
    Morning,
    /// 12:00–16:59.
    Afternoon,
    /// 17:00–21:59.
    Evening,
    /// 22:00–04:59.
    Night,
}

impl Daypart {
    /// Bucket a timestamp by its UTC hour.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        match at.hour() {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// Return the bucket as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    /// All four buckets, in day order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Morning, Self::Afternoon, Self::Evening, Self::Night]
    }
}

/// Three-letter key for a weekday, `mon` through `sun`.
#[must_use]
pub const fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Normalize a slug or tag for use as a weight key.
///
/// Weight maps only ever see trimmed, lowercased keys, so lookups from
/// differently-cased sources agree.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Per-session decaying affinity weights learned from feedback.
///
/// The tag/venue/artist maps are open-ended and capped by the learning
/// crate; the daypart and day-of-week maps hold at most 4 and 7 entries and
/// are never pruned. All keys are normalized via [`normalize_key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasteModel {
    /// Schema version of the persisted blob.
    pub version: u32,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Affinity per tag.
    #[serde(default)]
    pub tag_weights: HashMap<String, f64>,
    /// Affinity per venue slug.
    #[serde(default)]
    pub venue_weights: HashMap<String, f64>,
    /// Affinity per artist slug.
    #[serde(default)]
    pub artist_weights: HashMap<String, f64>,
    /// Affinity per time-of-day bucket.
    #[serde(default)]
    pub daypart_weights: HashMap<String, f64>,
    /// Affinity per day of week (`mon`..`sun`).
    #[serde(default)]
    pub dow_weights: HashMap<String, f64>,
}

impl TasteModel {
    /// A zeroed model stamped at `now`.
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            version: TASTE_MODEL_VERSION,
            updated_at: now,
            tag_weights: HashMap::new(),
            venue_weights: HashMap::new(),
            artist_weights: HashMap::new(),
            daypart_weights: HashMap::new(),
            dow_weights: HashMap::new(),
        }
    }

    /// Whether every weight map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tag_weights.is_empty()
            && self.venue_weights.is_empty()
            && self.artist_weights.is_empty()
            && self.daypart_weights.is_empty()
            && self.dow_weights.is_empty()
    }

    /// Weight for a tag, `0.0` when absent.
    #[must_use]
    pub fn tag_weight(&self, tag: &str) -> f64 {
        self.tag_weights
            .get(&normalize_key(tag))
            .copied()
            .unwrap_or(0.0)
    }

    /// Weight for a venue slug, `0.0` when absent.
    #[must_use]
    pub fn venue_weight(&self, venue: &str) -> f64 {
        self.venue_weights
            .get(&normalize_key(venue))
            .copied()
            .unwrap_or(0.0)
    }

    /// Weight for an artist slug, `0.0` when absent.
    #[must_use]
    pub fn artist_weight(&self, artist: &str) -> f64 {
        self.artist_weights
            .get(&normalize_key(artist))
            .copied()
            .unwrap_or(0.0)
    }

    /// Weight for the daypart containing `at`, `0.0` when absent.
    #[must_use]
    pub fn daypart_weight(&self, at: DateTime<Utc>) -> f64 {
        self.daypart_weights
            .get(Daypart::from_datetime(at).as_str())
            .copied()
            .unwrap_or(0.0)
    }

    /// Weight for the weekday of `at`, `0.0` when absent.
    #[must_use]
    pub fn dow_weight(&self, at: DateTime<Utc>) -> f64 {
        use chrono::Datelike;
        self.dow_weights
            .get(weekday_key(at.weekday()))
            .copied()
            .unwrap_or(0.0)
    }
}

impl Default for TasteModel {
    fn default() -> Self {
        Self::empty(DateTime::<Utc>::UNIX_EPOCH)
    }
}
