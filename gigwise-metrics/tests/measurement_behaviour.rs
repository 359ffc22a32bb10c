//! Behaviour of the measurement pipeline against an in-memory store.

use chrono::{DateTime, Duration, TimeZone, Utc};
use gigwise_core::{Candidate, EntityType, FeedbackAction, MemoryStore, RankedItem, ScoreEntry};
use gigwise_metrics::{
    BufferSink, ExposureBatch, MeasureConfig, MeasurementPipeline, SESSION_METRICS_EVENT,
};
use rstest::{fixture, rstest};

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap()
}

fn pipeline(config: MeasureConfig) -> MeasurementPipeline<MemoryStore, BufferSink> {
    MeasurementPipeline::new(MemoryStore::new(), BufferSink::new(), config, "session-1")
}

fn rendered(slugs: &[&str]) -> Vec<RankedItem> {
    slugs
        .iter()
        .map(|slug| {
            let candidate = Candidate::new(EntityType::Event, *slug, *slug);
            RankedItem::from_breakdown(candidate, vec![ScoreEntry::new("nearby", 8.0)])
        })
        .collect()
}

fn batch<'a>(source: &'a str, items: &'a [RankedItem]) -> ExposureBatch<'a> {
    ExposureBatch {
        source,
        page: 0,
        version: "taste_aware",
        items,
    }
}

#[rstest]
fn duplicate_exposures_record_once(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let items = rendered(&["a", "b"]);

    assert_eq!(pipeline.record_exposure_batch(&batch("for_you", &items), now), 2);
    assert_eq!(pipeline.record_exposure_batch(&batch("for_you", &items), now), 0);
    assert_eq!(pipeline.recent_exposures(10).len(), 2);
}

#[rstest]
fn same_item_on_another_source_records_again(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let items = rendered(&["a"]);

    assert_eq!(pipeline.record_exposure_batch(&batch("for_you", &items), now), 1);
    assert_eq!(pipeline.record_exposure_batch(&batch("browse", &items), now), 1);
}

#[rstest]
fn per_view_budget_tops_up_only(now: DateTime<Utc>) {
    let config = MeasureConfig {
        max_exposures_per_view: 3,
        ..MeasureConfig::default()
    };
    let mut pipeline = pipeline(config);

    let first = rendered(&["a", "b"]);
    assert_eq!(pipeline.record_exposure_batch(&batch("for_you", &first), now), 2);

    // Same (source, page): only one slot left, regardless of batch size.
    let second = rendered(&["c", "d", "e"]);
    assert_eq!(pipeline.record_exposure_batch(&batch("for_you", &second), now), 1);

    // A different page has its own budget.
    let other_page = ExposureBatch {
        source: "for_you",
        page: 1,
        version: "taste_aware",
        items: &second,
    };
    assert!(pipeline.record_exposure_batch(&other_page, now) > 0);
}

#[rstest]
fn unkeyed_items_are_skipped(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let items = rendered(&["", "keyed"]);
    assert_eq!(pipeline.record_exposure_batch(&batch("for_you", &items), now), 1);
}

#[rstest]
fn exposure_ring_drops_oldest(now: DateTime<Utc>) {
    let config = MeasureConfig {
        exposure_cap: 5,
        max_exposures_per_view: 100,
        ..MeasureConfig::default()
    };
    let mut pipeline = pipeline(config);
    let slugs: Vec<String> = (0..8).map(|n| format!("item-{n}")).collect();
    let refs: Vec<&str> = slugs.iter().map(String::as_str).collect();
    let items = rendered(&refs);

    pipeline.record_exposure_batch(&batch("for_you", &items), now);
    let recent = pipeline.recent_exposures(100);
    assert_eq!(recent.len(), 5);
    // Newest first: item-7 survives, item-0 was dropped.
    assert_eq!(recent[0].item_key, "event:item-7");
    assert!(recent.iter().all(|e| e.item_key != "event:item-0"));
}

#[rstest]
fn outcome_inside_window_is_attributed(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let items = rendered(&["a"]);
    pipeline.record_exposure_batch(&batch("for_you", &items), now);

    let later = now + Duration::minutes(10);
    let outcome = pipeline.record_outcome(
        FeedbackAction::Click,
        EntityType::Event,
        "event:a",
        None,
        later,
    );
    let exposure = outcome.attributed_exposure.expect("attribution");
    assert_eq!(exposure.item_key, "event:a");
    assert_eq!(exposure.source, "for_you");
}

#[rstest]
fn outcome_outside_window_is_not_attributed(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let items = rendered(&["a"]);
    pipeline.record_exposure_batch(&batch("for_you", &items), now);

    let later = now + Duration::minutes(31);
    let outcome = pipeline.record_outcome(
        FeedbackAction::Click,
        EntityType::Event,
        "event:a",
        None,
        later,
    );
    assert!(outcome.attributed_exposure.is_none());
}

#[rstest]
fn source_hint_must_match(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let items = rendered(&["a"]);
    pipeline.record_exposure_batch(&batch("for_you", &items), now);

    let later = now + Duration::minutes(1);
    let wrong = pipeline.record_outcome(
        FeedbackAction::Click,
        EntityType::Event,
        "event:a",
        Some("browse"),
        later,
    );
    assert!(wrong.attributed_exposure.is_none());

    let right = pipeline.record_outcome(
        FeedbackAction::Click,
        EntityType::Event,
        "event:a",
        Some("for_you"),
        later,
    );
    assert!(right.attributed_exposure.is_some());
}

#[rstest]
fn attribution_picks_most_recent_exposure(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let items = rendered(&["a"]);
    pipeline.record_exposure_batch(&batch("for_you", &items), now);
    pipeline.record_exposure_batch(&batch("browse", &items), now + Duration::minutes(5));

    let outcome = pipeline.record_outcome(
        FeedbackAction::Click,
        EntityType::Event,
        "event:a",
        None,
        now + Duration::minutes(6),
    );
    assert_eq!(
        outcome.attributed_exposure.expect("attribution").source,
        "browse"
    );
}

#[rstest]
fn session_metrics_accumulate_and_derive_rates(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let items = rendered(&["a", "b", "c", "d"]);
    pipeline.record_exposure_batch(&batch("for_you", &items), now);

    let later = now + Duration::minutes(2);
    pipeline.record_outcome(FeedbackAction::Click, EntityType::Event, "event:a", None, later);
    pipeline.record_outcome(FeedbackAction::Save, EntityType::Event, "event:b", None, later);
    // Hides are stored but never counted.
    pipeline.record_outcome(FeedbackAction::Hide, EntityType::Event, "event:c", None, later);

    let metrics = pipeline.session_metrics(later);
    assert_eq!(metrics.exposures, 4);
    assert_eq!(metrics.clicks, 1);
    assert_eq!(metrics.saves, 1);
    assert_eq!(metrics.follows, 0);
    assert!((metrics.ctr() - 0.25).abs() < 1e-12);
    assert_eq!(pipeline.recent_outcomes(10).len(), 3);
}

#[rstest]
fn exploration_outcomes_feed_exploration_ctr(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let mut items = rendered(&["x"]);
    items[0].exploration = true;
    pipeline.record_exposure_batch(&batch("for_you", &items), now);

    pipeline.record_outcome(
        FeedbackAction::Click,
        EntityType::Event,
        "event:x",
        None,
        now + Duration::minutes(1),
    );

    let metrics = pipeline.session_metrics(now);
    assert_eq!(metrics.exploration_exposures, 1);
    assert_eq!(metrics.exploration_clicks, 1);
    assert!((metrics.exploration_ctr() - 1.0).abs() < 1e-12);
}

#[rstest]
fn production_sampling_is_stable_within_a_day(now: DateTime<Utc>) {
    let config = MeasureConfig {
        production: true,
        sample_rate: 0.5,
        ..MeasureConfig::default()
    };
    let pipeline = pipeline(config);
    let decision = pipeline.sampled_in(now);
    for minutes in [1, 60, 600] {
        assert_eq!(pipeline.sampled_in(now + Duration::minutes(minutes)), decision);
    }
}

#[rstest]
fn sampled_out_sessions_record_nothing(now: DateTime<Utc>) {
    // Scan for a session id the deterministic sampler rejects.
    let mut rejected = None;
    for n in 0..64 {
        let config = MeasureConfig {
            production: true,
            sample_rate: 0.01,
            ..MeasureConfig::default()
        };
        let candidate = MeasurementPipeline::new(
            MemoryStore::new(),
            BufferSink::new(),
            config,
            format!("session-{n}"),
        );
        if !candidate.sampled_in(now) {
            rejected = Some(candidate);
            break;
        }
    }
    let mut pipeline = rejected.expect("a rejected session in 64 tries");
    let items = rendered(&["a"]);
    assert_eq!(pipeline.record_exposure_batch(&batch("for_you", &items), now), 0);
    assert!(pipeline.recent_exposures(10).is_empty());

    // Outcomes are gated the same way: nothing stored, counted, or emitted.
    let outcome = pipeline.record_outcome(
        FeedbackAction::Click,
        EntityType::Event,
        "event:a",
        None,
        now + Duration::minutes(1),
    );
    assert!(outcome.attributed_exposure.is_none());
    assert!(pipeline.recent_outcomes(10).is_empty());
    assert_eq!(pipeline.session_metrics(now).clicks, 0);
    assert_eq!(pipeline.sink().events().len(), 0);
}

#[rstest]
fn visibility_hidden_forces_metrics_flush(now: DateTime<Utc>) {
    let mut pipeline = pipeline(MeasureConfig::default());
    let items = rendered(&["a"]);
    pipeline.record_exposure_batch(&batch("for_you", &items), now);

    let before = pipeline.sink().count(SESSION_METRICS_EVENT);
    // Within the min interval an unforced flush is a no-op...
    pipeline.flush(false, now + Duration::seconds(5));
    assert_eq!(pipeline.sink().count(SESSION_METRICS_EVENT), before);
    // ...but page-hide always emits.
    pipeline.on_visibility_hidden(now + Duration::seconds(6));
    assert_eq!(pipeline.sink().count(SESSION_METRICS_EVENT), before + 1);
}
