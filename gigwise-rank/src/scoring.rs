//! Multi-signal candidate scoring.
//!
//! Builds each candidate's breakdown in a fixed order so top-reason ties
//! resolve deterministically: static signal bonuses first, then taste and
//! recency terms (taste-aware version only), then explicit downranks last
//! so decayed taste weights can never cancel them.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use gigwise_core::{Candidate, Preferences, RankedItem, ScoreEntry, Signals};

use crate::RankingVersion;

/// Score term weights. Defaults reproduce the shipped behavior; tests pin
/// the relative ordering (past items always lose) rather than the numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreWeights {
    /// Bonus when the item's venue is followed.
    pub followed_venue: f64,
    /// Bonus when any of the item's artists is followed.
    pub followed_artist: f64,
    /// Bonus when a saved-search term appears in the item's text.
    pub saved_search_query: f64,
    /// Bonus when saved-search tags intersect the item's tags.
    pub saved_search_tag: f64,
    /// Bonus when a recently viewed term appears in the item's text.
    pub recent_view_match: f64,
    /// Bonus when both the item and the viewer have a location.
    pub nearby: f64,
    /// Flat bonus applied only on the `for_you` surface.
    pub for_you_baseline: f64,
    /// Multiplier over summed matching tag weights.
    pub taste_tag_multiplier: f64,
    /// Symmetric clamp for the `taste_tag` term.
    pub taste_tag_clamp: f64,
    /// Multiplier over the venue weight.
    pub taste_venue_multiplier: f64,
    /// Symmetric clamp for the `taste_venue` term.
    pub taste_venue_clamp: f64,
    /// Multiplier over summed matching artist weights.
    pub taste_artist_multiplier: f64,
    /// Symmetric clamp for the `taste_artist` term.
    pub taste_artist_clamp: f64,
    /// Multiplier over the day-of-week and daypart bucket weights.
    pub time_multiplier: f64,
    /// Symmetric clamp for each time term.
    pub time_clamp: f64,
    /// Penalty for items that already started. Large enough to dominate
    /// any achievable positive sum: past items are suppressed, not merely
    /// deprioritised.
    pub recency_past: f64,
    /// Bonus for future items starting within the soon window.
    pub recency_soon: f64,
    /// Width of the soon window, in hours.
    pub recency_soon_window_hours: i64,
    /// Bonus when it is Thu–Sun and the item starts on a weekend.
    pub recency_weekend: f64,
    /// Penalty for an explicitly downranked venue.
    pub downranked_venue: f64,
    /// Penalty for an explicitly downranked artist.
    pub downranked_artist: f64,
    /// Penalty for an explicitly downranked tag.
    pub downranked_tag: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            followed_venue: 30.0,
            followed_artist: 25.0,
            saved_search_query: 20.0,
            saved_search_tag: 15.0,
            recent_view_match: 10.0,
            nearby: 8.0,
            for_you_baseline: 2.0,
            taste_tag_multiplier: 6.0,
            taste_tag_clamp: 18.0,
            taste_venue_multiplier: 8.0,
            taste_venue_clamp: 16.0,
            taste_artist_multiplier: 7.0,
            taste_artist_clamp: 14.0,
            time_multiplier: 3.0,
            time_clamp: 6.0,
            recency_past: -200.0,
            recency_soon: 12.0,
            recency_soon_window_hours: 72,
            recency_weekend: 6.0,
            downranked_venue: -25.0,
            downranked_artist: -25.0,
            downranked_tag: -15.0,
        }
    }
}

/// Score one candidate against the request signals.
///
/// Missing or empty signal data contributes nothing; this never fails for
/// a syntactically valid candidate.
#[must_use]
pub fn score_candidate(
    candidate: Candidate,
    signals: &Signals,
    preferences: &Preferences,
    source: &str,
    version: RankingVersion,
    weights: &ScoreWeights,
    now: DateTime<Utc>,
) -> RankedItem {
    let mut breakdown = Vec::new();
    let mut push = |key: &'static str, value: f64| {
        if value != 0.0 {
            breakdown.push(ScoreEntry::new(key, value));
        }
    };

    if let Some(venue) = &candidate.venue_slug {
        if signals.followed_venues.contains(venue) {
            push("followed_venue", weights.followed_venue);
        }
    }
    if candidate
        .artist_slugs
        .iter()
        .any(|artist| signals.followed_artists.contains(artist))
    {
        push("followed_artist", weights.followed_artist);
    }

    let text = candidate.search_text();
    if matches_any_term(&text, &signals.saved_search_terms) {
        push("saved_search_query", weights.saved_search_query);
    }
    if candidate
        .tags
        .iter()
        .any(|tag| signals.saved_search_tags.contains(&tag.to_lowercase()))
    {
        push("saved_search_tag", weights.saved_search_tag);
    }
    if matches_any_term(&text, &signals.recent_view_terms) {
        push("recent_view_match", weights.recent_view_match);
    }
    if candidate.has_location && signals.viewer_has_location {
        push("nearby", weights.nearby);
    }
    if source == "for_you" {
        push("for_you_baseline", weights.for_you_baseline);
    }

    if version == RankingVersion::TasteAware {
        let taste = &signals.taste;

        let tag_sum: f64 = candidate.tags.iter().map(|tag| taste.tag_weight(tag)).sum();
        push(
            "taste_tag",
            clamp_symmetric(tag_sum * weights.taste_tag_multiplier, weights.taste_tag_clamp),
        );

        if let Some(venue) = &candidate.venue_slug {
            push(
                "taste_venue",
                clamp_symmetric(
                    taste.venue_weight(venue) * weights.taste_venue_multiplier,
                    weights.taste_venue_clamp,
                ),
            );
        }

        let artist_sum: f64 = candidate
            .artist_slugs
            .iter()
            .map(|artist| taste.artist_weight(artist))
            .sum();
        push(
            "taste_artist",
            clamp_symmetric(
                artist_sum * weights.taste_artist_multiplier,
                weights.taste_artist_clamp,
            ),
        );

        if let Some(start_at) = candidate.start_at {
            push(
                "time_dow",
                clamp_symmetric(
                    taste.dow_weight(start_at) * weights.time_multiplier,
                    weights.time_clamp,
                ),
            );
            push(
                "time_daypart",
                clamp_symmetric(
                    taste.daypart_weight(start_at) * weights.time_multiplier,
                    weights.time_clamp,
                ),
            );

            if start_at < now {
                push("recency_past", weights.recency_past);
            } else {
                if start_at - now <= Duration::hours(weights.recency_soon_window_hours) {
                    push("recency_soon", weights.recency_soon);
                }
                if is_weekend_window(now) && starts_on_weekend(start_at) {
                    push("recency_weekend", weights.recency_weekend);
                }
            }
        }
    }

    if let Some(venue) = &candidate.venue_slug {
        if preferences.downranked_venues.contains(venue) {
            push("downranked_venue", weights.downranked_venue);
        }
    }
    if candidate
        .artist_slugs
        .iter()
        .any(|artist| preferences.downranked_artists.contains(artist))
    {
        push("downranked_artist", weights.downranked_artist);
    }
    if candidate
        .tags
        .iter()
        .any(|tag| preferences.downranked_tags.contains(&tag.to_lowercase()))
    {
        push("downranked_tag", weights.downranked_tag);
    }

    RankedItem::from_breakdown(candidate, breakdown)
}

fn matches_any_term(text: &str, terms: &[String]) -> bool {
    terms.iter().any(|term| {
        let needle = term.trim().to_lowercase();
        !needle.is_empty() && text.contains(&needle)
    })
}

fn clamp_symmetric(value: f64, limit: f64) -> f64 {
    value.clamp(-limit, limit)
}

/// Thu–Sun, when weekend plans are being made.
fn is_weekend_window(now: DateTime<Utc>) -> bool {
    matches!(
        now.weekday(),
        Weekday::Thu | Weekday::Fri | Weekday::Sat | Weekday::Sun
    )
}

fn starts_on_weekend(start_at: DateTime<Utc>) -> bool {
    matches!(start_at.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gigwise_core::{EntityType, TasteModel};
    use rstest::{fixture, rstest};

    // A Tuesday at noon.
    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 3, 12, 0, 0).unwrap()
    }

    fn event(slug: &str) -> Candidate {
        Candidate::new(EntityType::Event, slug, slug)
    }

    #[rstest]
    fn follows_and_nearby_stack(now: DateTime<Utc>) {
        let signals = Signals::default()
            .with_followed_venues(["venue-1"])
            .with_followed_artists(["artist-1"])
            .with_viewer_location();
        let candidate = event("a")
            .with_venue("venue-1")
            .with_artists(["artist-1"])
            .with_location();

        let ranked = score_candidate(
            candidate,
            &signals,
            &Preferences::default(),
            "browse",
            RankingVersion::Baseline,
            &ScoreWeights::default(),
            now,
        );
        assert_eq!(ranked.score, 30.0 + 25.0 + 8.0);
        let keys: Vec<_> = ranked.breakdown.iter().map(|entry| entry.key).collect();
        assert_eq!(keys, vec!["followed_venue", "followed_artist", "nearby"]);
    }

    #[rstest]
    fn saved_search_terms_match_title_and_tags(now: DateTime<Utc>) {
        let signals = Signals::default()
            .with_saved_search_terms(["jazz"])
            .with_saved_search_tags(["late-night"]);
        let candidate = Candidate::new(EntityType::Event, "a", "Jazz Marathon")
            .with_tags(["Late-Night"]);

        let ranked = score_candidate(
            candidate,
            &signals,
            &Preferences::default(),
            "browse",
            RankingVersion::Baseline,
            &ScoreWeights::default(),
            now,
        );
        assert_eq!(ranked.score, 20.0 + 15.0);
    }

    #[rstest]
    fn for_you_baseline_only_on_for_you(now: DateTime<Utc>) {
        let signals = Signals::default();
        let weights = ScoreWeights::default();
        let on = score_candidate(
            event("a"),
            &signals,
            &Preferences::default(),
            "for_you",
            RankingVersion::Baseline,
            &weights,
            now,
        );
        let off = score_candidate(
            event("a"),
            &signals,
            &Preferences::default(),
            "browse",
            RankingVersion::Baseline,
            &weights,
            now,
        );
        assert_eq!(on.score, 2.0);
        assert_eq!(off.score, 0.0);
    }

    #[rstest]
    fn taste_terms_only_in_taste_aware_version(now: DateTime<Utc>) {
        let mut taste = TasteModel::empty(now);
        taste.tag_weights.insert("jazz".into(), 1.2);
        let signals = Signals::default().with_taste(taste);
        let candidate = event("a").with_tags(["jazz"]);

        let baseline = score_candidate(
            candidate.clone(),
            &signals,
            &Preferences::default(),
            "browse",
            RankingVersion::Baseline,
            &ScoreWeights::default(),
            now,
        );
        assert!(baseline.breakdown.iter().all(|e| e.key != "taste_tag"));

        let aware = score_candidate(
            candidate,
            &signals,
            &Preferences::default(),
            "browse",
            RankingVersion::TasteAware,
            &ScoreWeights::default(),
            now,
        );
        let taste_tag = aware
            .breakdown
            .iter()
            .find(|e| e.key == "taste_tag")
            .expect("taste_tag term");
        assert!((taste_tag.value - 1.2 * 6.0).abs() < 1e-9);
    }

    #[rstest]
    fn taste_terms_clamp_symmetrically(now: DateTime<Utc>) {
        let mut taste = TasteModel::empty(now);
        taste.venue_weights.insert("venue-1".into(), 4.0);
        let signals = Signals::default().with_taste(taste);
        let candidate = event("a").with_venue("venue-1");

        let ranked = score_candidate(
            candidate,
            &signals,
            &Preferences::default(),
            "browse",
            RankingVersion::TasteAware,
            &ScoreWeights::default(),
            now,
        );
        let term = ranked
            .breakdown
            .iter()
            .find(|e| e.key == "taste_venue")
            .expect("taste_venue term");
        // 4.0 * 8.0 = 32 clamps to 16.
        assert_eq!(term.value, 16.0);
    }

    #[rstest]
    fn past_items_take_the_penalty(now: DateTime<Utc>) {
        let signals = Signals::default().with_followed_venues(["venue-1"]);
        let candidate = event("a")
            .with_venue("venue-1")
            .with_start_at(now - Duration::hours(2));

        let ranked = score_candidate(
            candidate,
            &signals,
            &Preferences::default(),
            "browse",
            RankingVersion::TasteAware,
            &ScoreWeights::default(),
            now,
        );
        assert_eq!(ranked.top_reason, Some("recency_past"));
        assert!(ranked.score < 0.0);
    }

    #[rstest]
    #[case(48, true)]
    #[case(71, true)]
    #[case(73, false)]
    fn soon_bonus_respects_window(#[case] hours: i64, #[case] expected: bool, now: DateTime<Utc>) {
        let candidate = event("a").with_start_at(now + Duration::hours(hours));
        let ranked = score_candidate(
            candidate,
            &Signals::default(),
            &Preferences::default(),
            "browse",
            RankingVersion::TasteAware,
            &ScoreWeights::default(),
            now,
        );
        assert_eq!(
            ranked.breakdown.iter().any(|e| e.key == "recency_soon"),
            expected
        );
    }

    #[rstest]
    fn weekend_bonus_needs_thu_to_sun_and_weekend_start(now: DateTime<Utc>) {
        // `now` fixture is a Tuesday: no bonus even for a Saturday start.
        let saturday = Utc.with_ymd_and_hms(2025, 6, 7, 20, 0, 0).unwrap();
        let tuesday_view = score_candidate(
            event("a").with_start_at(saturday),
            &Signals::default(),
            &Preferences::default(),
            "browse",
            RankingVersion::TasteAware,
            &ScoreWeights::default(),
            now,
        );
        assert!(tuesday_view
            .breakdown
            .iter()
            .all(|e| e.key != "recency_weekend"));

        let friday = Utc.with_ymd_and_hms(2025, 6, 6, 12, 0, 0).unwrap();
        let friday_view = score_candidate(
            event("a").with_start_at(saturday),
            &Signals::default(),
            &Preferences::default(),
            "browse",
            RankingVersion::TasteAware,
            &ScoreWeights::default(),
            friday,
        );
        assert!(friday_view
            .breakdown
            .iter()
            .any(|e| e.key == "recency_weekend"));
    }

    #[rstest]
    fn downranks_apply_after_taste(now: DateTime<Utc>) {
        let preferences = Preferences::default()
            .with_downranked_venue("venue-1")
            .with_downranked_tag("metal");
        let candidate = event("a").with_venue("venue-1").with_tags(["Metal"]);

        let ranked = score_candidate(
            candidate,
            &Signals::default(),
            &preferences,
            "browse",
            RankingVersion::TasteAware,
            &ScoreWeights::default(),
            now,
        );
        let keys: Vec<_> = ranked.breakdown.iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["downranked_venue", "downranked_tag"]);
        assert_eq!(ranked.score, -40.0);
    }

    #[rstest]
    fn breakdown_sums_to_score(now: DateTime<Utc>) {
        let mut taste = TasteModel::empty(now);
        taste.tag_weights.insert("jazz".into(), 0.9);
        let signals = Signals::default()
            .with_followed_venues(["venue-1"])
            .with_taste(taste);
        let candidate = event("a")
            .with_venue("venue-1")
            .with_tags(["jazz"])
            .with_start_at(now + Duration::hours(12));

        let ranked = score_candidate(
            candidate,
            &signals,
            &Preferences::default(),
            "for_you",
            RankingVersion::TasteAware,
            &ScoreWeights::default(),
            now,
        );
        let sum: f64 = ranked.breakdown.iter().map(|e| e.value).sum();
        assert_eq!(ranked.score, sum);
    }
}
