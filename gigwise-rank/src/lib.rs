//! Ranking engine for Gigwise candidate items.
//!
//! Scores a candidate list against static signals (follows, saved searches,
//! proximity, recency) plus the viewer's taste model, applies diversity
//! constraints over the head window, and interleaves seeded exploration.
//! The whole pipeline is deterministic given identical inputs and `now`,
//! and never fails: malformed signal data scores as zero contribution.

#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use gigwise_core::{Candidate, Preferences, RankedItem, Signals};

pub mod diversity;
pub mod explore;
pub mod scoring;

pub use diversity::{DiversityConfig, apply_diversity, enforce_venue_cap};
pub use explore::{ExplorationConfig, MixOutcome, mix};
pub use scoring::{ScoreWeights, score_candidate};

/// Which scoring vintage a request runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankingVersion {
    /// Static signals only.
    Baseline,
    /// Static signals plus taste, time, and recency terms.
    #[default]
    TasteAware,
}

/// Per-request ranking inputs.
///
/// Everything the engine reads is supplied here as an immutable snapshot;
/// nothing is re-fetched mid-computation.
#[derive(Debug)]
pub struct RankRequest<'a> {
    /// Resolved viewer signals.
    pub signals: &'a Signals,
    /// Explicit hide/downrank preferences.
    pub preferences: &'a Preferences,
    /// Surface the ranking renders on, e.g. `for_you` or `browse`.
    pub source: &'a str,
    /// Scoring vintage.
    pub version: RankingVersion,
    /// Fraction of batches that receive an exploration splice.
    pub exploration_rate: f64,
    /// Seed for the exploration PRNG.
    pub seed: u64,
    /// The request's notion of now; all recency math keys off this.
    pub now: DateTime<Utc>,
    /// When set, score breakdowns are retained on the output. Never
    /// affects scores or ordering.
    pub debug: bool,
}

/// A ranked, diversity-constrained, exploration-mixed list.
#[derive(Debug, Clone)]
pub struct RankOutcome {
    /// Final ordering.
    pub items: Vec<RankedItem>,
    /// Number of exploration items spliced in.
    pub exploration_count: usize,
    /// The exploration rate the mixer ran with.
    pub exploration_rate: f64,
}

/// Configuration bundle for a [`Ranker`].
#[derive(Debug, Clone, Default)]
pub struct RankerConfig {
    /// Score term weights.
    pub weights: ScoreWeights,
    /// Head-window diversity constraints.
    pub diversity: DiversityConfig,
    /// Exploration mixer knobs.
    pub exploration: ExplorationConfig,
}

/// The ranking pipeline: filter, score, sort, diversify, cap, mix.
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankerConfig,
}

impl Ranker {
    /// Construct a ranker with explicit configuration.
    #[must_use]
    pub const fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    /// Rank `candidates` for one request.
    ///
    /// Hidden items are excluded before scoring. Output is sorted by score
    /// descending with slug-ascending tie-breaks (a total order, so two
    /// identical calls produce identical output), then reordered by the
    /// diversity and exploration passes.
    #[must_use]
    pub fn rank(&self, candidates: Vec<Candidate>, request: &RankRequest<'_>) -> RankOutcome {
        let visible = candidates
            .into_iter()
            .filter(|candidate| !is_hidden(candidate, request.preferences));

        let mut scored: Vec<RankedItem> = visible
            .map(|candidate| {
                scoring::score_candidate(
                    candidate,
                    request.signals,
                    request.preferences,
                    request.source,
                    request.version,
                    &self.config.weights,
                    request.now,
                )
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.candidate.slug.cmp(&b.candidate.slug))
        });

        let sorted_order: Vec<Option<String>> =
            scored.iter().map(|item| item.candidate.key()).collect();

        let mut items = diversity::apply_diversity(scored, &self.config.diversity);
        diversity::enforce_venue_cap(&mut items, &self.config.diversity);

        for (position, item) in items.iter_mut().enumerate() {
            item.diversity_adjusted =
                sorted_order.get(position).map(Option::as_ref) != Some(item.candidate.key().as_ref());
        }

        let mixed = explore::mix(
            items,
            &self.config.exploration,
            request.exploration_rate,
            request.seed,
        );

        let items = if request.debug {
            mixed.items
        } else {
            mixed
                .items
                .into_iter()
                .map(RankedItem::without_breakdown)
                .collect()
        };

        log::debug!(
            "ranked {} items on {} ({} exploration)",
            items.len(),
            request.source,
            mixed.count
        );

        RankOutcome {
            items,
            exploration_count: mixed.count,
            exploration_rate: mixed.rate,
        }
    }
}

fn is_hidden(candidate: &Candidate, preferences: &Preferences) -> bool {
    candidate
        .key()
        .is_some_and(|key| preferences.hidden_items.contains(&key))
}
