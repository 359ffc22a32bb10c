//! Ranked output items with their full score breakdown.

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;

/// One named term contributing to an item's score.
///
/// Reason keys are `'static` by construction, so breakdowns serialize for
/// telemetry but are never read back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreEntry {
    /// Stable reason key, e.g. `followed_venue` or `recency_past`.
    pub key: &'static str,
    /// Signed contribution.
    pub value: f64,
}

impl ScoreEntry {
    /// Construct an entry.
    #[must_use]
    pub const fn new(key: &'static str, value: f64) -> Self {
        Self { key, value }
    }
}

/// Sign of the dominant score term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonKind {
    /// The dominant term boosted the item.
    Positive,
    /// The dominant term suppressed the item.
    Negative,
}

/// A candidate with its score and complete, ordered breakdown.
///
/// `score` is always the exact sum of `breakdown`; `top_reason` is the
/// entry with the largest absolute value. On an absolute-value tie the
/// entry with the higher raw value wins, earliest-added first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    /// The scored candidate.
    pub candidate: Candidate,
    /// Sum of all breakdown values.
    pub score: f64,
    /// Every contributing term, in scoring order.
    pub breakdown: Vec<ScoreEntry>,
    /// Key of the dominant term, `None` for an empty breakdown.
    pub top_reason: Option<&'static str>,
    /// Sign of the dominant term.
    pub top_reason_kind: Option<ReasonKind>,
    /// Set when the diversity pass moved this item away from pure score
    /// order. Survives breakdown stripping so exposures can report it.
    pub diversity_adjusted: bool,
    /// Set when the exploration mixer spliced this item in.
    pub exploration: bool,
}

impl RankedItem {
    /// Build a ranked item from a finished breakdown, deriving the score
    /// and top reason.
    #[must_use]
    pub fn from_breakdown(candidate: Candidate, breakdown: Vec<ScoreEntry>) -> Self {
        let score = breakdown.iter().map(|entry| entry.value).sum();
        let top = breakdown.iter().fold(None::<ScoreEntry>, |best, entry| {
            match best {
                None => Some(*entry),
                Some(current) => {
                    let better = entry.value.abs() > current.value.abs()
                        || (entry.value.abs() == current.value.abs()
                            && entry.value > current.value);
                    if better { Some(*entry) } else { Some(current) }
                }
            }
        });
        let top_reason = top.map(|entry| entry.key);
        let top_reason_kind = top.and_then(|entry| {
            if entry.value > 0.0 {
                Some(ReasonKind::Positive)
            } else if entry.value < 0.0 {
                Some(ReasonKind::Negative)
            } else {
                None
            }
        });
        Self {
            candidate,
            score,
            breakdown,
            top_reason,
            top_reason_kind,
            diversity_adjusted: false,
            exploration: false,
        }
    }

    /// Whether any taste-derived term contributed to the score.
    #[must_use]
    pub fn is_taste_boosted(&self) -> bool {
        self.breakdown
            .iter()
            .any(|entry| entry.key.starts_with("taste_") && entry.value != 0.0)
    }

    /// Whether the item was spliced in by the exploration mixer.
    #[must_use]
    pub fn is_exploration(&self) -> bool {
        self.exploration || self.breakdown.iter().any(|entry| entry.key == "exploration")
    }

    /// Drop the breakdown detail, keeping score and top reason.
    ///
    /// Used outside debug contexts so rendered payloads stay small; never
    /// affects ordering.
    #[must_use]
    pub fn without_breakdown(mut self) -> Self {
        self.breakdown.clear();
        self
    }
}
