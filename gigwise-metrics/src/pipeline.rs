//! Exposure/outcome recording, attribution, and session metrics.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use gigwise_core::store::{self, SessionStore, keys};
use gigwise_core::{FeedbackAction, RankedItem};
use serde_json::json;

use crate::records::{DayMetrics, Exposure, Outcome, ScoreBucket, day_key};
use crate::sink::TelemetrySink;

/// Telemetry event names. Part of the external contract.
pub const EXPOSURE_EVENT: &str = "personalization_exposure";
/// Outcome event name.
pub const OUTCOME_EVENT: &str = "personalization_outcome";
/// Session-metrics event name.
pub const SESSION_METRICS_EVENT: &str = "personalization_session_metrics";

/// Measurement tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureConfig {
    /// Maximum exposures recorded per `(session, source, page)` view.
    pub max_exposures_per_view: usize,
    /// Fraction of session-days sampled in under production mode.
    pub sample_rate: f64,
    /// Production-like mode: sampling applies. Off by default so tests and
    /// development always record.
    pub production: bool,
    /// Exposure ring buffer capacity.
    pub exposure_cap: usize,
    /// Outcome ring buffer capacity.
    pub outcome_cap: usize,
    /// Maximum exposure-to-outcome gap for attribution, in minutes.
    pub attribution_window_minutes: i64,
    /// Minimum gap between unforced metric flushes, in seconds.
    pub flush_min_interval_secs: i64,
    /// A flush is forced whenever total exposures cross a multiple of this.
    pub flush_exposure_step: u64,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            max_exposures_per_view: 30,
            sample_rate: 0.25,
            production: false,
            exposure_cap: 500,
            outcome_cap: 300,
            attribution_window_minutes: 30,
            flush_min_interval_secs: 60,
            flush_exposure_step: 25,
        }
    }
}

/// One batch of rendered items to record.
#[derive(Debug)]
pub struct ExposureBatch<'a> {
    /// Surface the items rendered on.
    pub source: &'a str,
    /// Zero-based page index within the view.
    pub page: u32,
    /// Ranking version label active at render time.
    pub version: &'a str,
    /// Items in rendered order.
    pub items: &'a [RankedItem],
}

/// Session-scoped measurement pipeline.
///
/// Owns the exposure/outcome ring buffers and per-day metrics persisted in
/// the injected [`SessionStore`]. Every operation takes an explicit `now`
/// and never fails; telemetry errors are logged and dropped.
#[derive(Debug)]
pub struct MeasurementPipeline<S, T> {
    store: S,
    sink: T,
    config: MeasureConfig,
    session_id: String,
    view_budgets: HashMap<(String, u32), usize>,
    last_flush_at: Option<DateTime<Utc>>,
    last_flush_exposures: u64,
}

impl<S, T> MeasurementPipeline<S, T>
where
    S: SessionStore,
    T: TelemetrySink,
{
    /// Build a pipeline for one session.
    pub fn new(store: S, sink: T, config: MeasureConfig, session_id: impl Into<String>) -> Self {
        Self {
            store,
            sink,
            config,
            session_id: session_id.into(),
            view_budgets: HashMap::new(),
            last_flush_at: None,
            last_flush_exposures: 0,
        }
    }

    /// Whether this session-day records at all.
    ///
    /// Production mode samples deterministically on a stable hash of
    /// `(session, day)`, so the decision holds for the whole day.
    #[must_use]
    pub fn sampled_in(&self, now: DateTime<Utc>) -> bool {
        if !self.config.production {
            return true;
        }
        let digest = fnv1a(&format!("{}:{}", self.session_id, day_key(now)));
        #[allow(clippy::cast_precision_loss)]
        let unit = digest as f64 / u64::MAX as f64;
        unit < self.config.sample_rate
    }

    /// Record one batch of rendered items.
    ///
    /// Honors the per-view budget, deduplicates on
    /// `(session, source, itemKey, day)`, and returns how many exposures
    /// were actually stored.
    pub fn record_exposure_batch(&mut self, batch: &ExposureBatch<'_>, now: DateTime<Utc>) -> usize {
        if !self.sampled_in(now) {
            return 0;
        }

        let budget_key = (batch.source.to_owned(), batch.page);
        let used = self.view_budgets.get(&budget_key).copied().unwrap_or(0);
        let mut remaining = self.config.max_exposures_per_view.saturating_sub(used);
        if remaining == 0 {
            return 0;
        }

        let day = day_key(now);
        let mut exposures: Vec<Exposure> =
            store::read_json(&self.store, keys::EXPOSURES).unwrap_or_default();
        let mut recorded = 0;

        for (position, item) in batch.items.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let Some(item_key) = item.candidate.key() else {
                continue;
            };
            let duplicate = exposures.iter().any(|exposure| {
                exposure.source == batch.source
                    && exposure.item_key == item_key
                    && day_key(exposure.timestamp) == day
            });
            if duplicate {
                continue;
            }

            let exposure = Exposure {
                session_id: self.session_id.clone(),
                source: batch.source.to_owned(),
                version: batch.version.to_owned(),
                timestamp: now,
                item_type: item.candidate.entity,
                item_key,
                position,
                score_bucket: ScoreBucket::from_position(position),
                top_reason_kind: item.top_reason_kind,
                is_exploration: item.is_exploration(),
                diversity_adjusted: item.diversity_adjusted,
            };
            self.emit(EXPOSURE_EVENT, &exposure);
            self.bump_metrics(now, |metrics| {
                metrics.exposures += 1;
                if exposure.is_exploration {
                    metrics.exploration_exposures += 1;
                }
            });
            exposures.push(exposure);
            recorded += 1;
            remaining -= 1;
        }

        trim_ring(&mut exposures, self.config.exposure_cap);
        store::write_json(&mut self.store, keys::EXPOSURES, &exposures);
        self.view_budgets
            .insert(budget_key, used + recorded);
        self.maybe_flush(false, now);
        recorded
    }

    /// Record one user action and attribute it to a recent exposure.
    ///
    /// Attribution scans exposures newest-first for a matching item key
    /// (and matching source when hinted) within the attribution window.
    /// Cross-session attribution is impossible by construction: the store
    /// only ever holds this session's exposures.
    pub fn record_outcome(
        &mut self,
        action: FeedbackAction,
        item_type: gigwise_core::EntityType,
        item_key: &str,
        source_hint: Option<&str>,
        now: DateTime<Utc>,
    ) -> Outcome {
        let attributed_exposure = self.attribute(item_key, source_hint, now);

        let outcome = Outcome {
            session_id: self.session_id.clone(),
            timestamp: now,
            action,
            item_type,
            item_key: item_key.to_owned(),
            attributed_exposure,
        };

        // Sampled-out session-days record nothing, exposures and outcomes
        // alike.
        if !self.sampled_in(now) {
            return outcome;
        }

        let mut outcomes: Vec<Outcome> =
            store::read_json(&self.store, keys::OUTCOMES).unwrap_or_default();
        self.emit(OUTCOME_EVENT, &outcome);

        let exploration = outcome
            .attributed_exposure
            .as_ref()
            .is_some_and(|exposure| exposure.is_exploration);
        self.bump_metrics(now, |metrics| {
            match action {
                FeedbackAction::Click => {
                    metrics.clicks += 1;
                    if exploration {
                        metrics.exploration_clicks += 1;
                    }
                }
                FeedbackAction::Save => metrics.saves += 1,
                FeedbackAction::Follow => metrics.follows += 1,
                FeedbackAction::Hide | FeedbackAction::ShowLess => {}
            };
        });

        outcomes.push(outcome.clone());
        trim_ring(&mut outcomes, self.config.outcome_cap);
        store::write_json(&mut self.store, keys::OUTCOMES, &outcomes);
        outcome
    }

    /// Most recent exposures, newest first.
    #[must_use]
    pub fn recent_exposures(&self, limit: usize) -> Vec<Exposure> {
        let mut exposures: Vec<Exposure> =
            store::read_json(&self.store, keys::EXPOSURES).unwrap_or_default();
        exposures.reverse();
        exposures.truncate(limit);
        exposures
    }

    /// Most recent outcomes, newest first.
    #[must_use]
    pub fn recent_outcomes(&self, limit: usize) -> Vec<Outcome> {
        let mut outcomes: Vec<Outcome> =
            store::read_json(&self.store, keys::OUTCOMES).unwrap_or_default();
        outcomes.reverse();
        outcomes.truncate(limit);
        outcomes
    }

    /// Counters for the day containing `now`.
    #[must_use]
    pub fn session_metrics(&self, now: DateTime<Utc>) -> DayMetrics {
        let day = day_key(now);
        self.load_metrics()
            .into_iter()
            .find(|metrics| metrics.day == day)
            .unwrap_or_else(|| DayMetrics::for_day(day))
    }

    /// Emit the session-metrics event, at most once per configured
    /// interval unless forced.
    pub fn flush(&mut self, force: bool, now: DateTime<Utc>) {
        if !force {
            let due = self.last_flush_at.is_none_or(|last| {
                now - last >= Duration::seconds(self.config.flush_min_interval_secs)
            });
            if !due {
                return;
            }
        }
        let metrics = self.session_metrics(now);
        let payload = json!({
            "sessionId": self.session_id,
            "day": metrics.day,
            "exposures": metrics.exposures,
            "clicks": metrics.clicks,
            "saves": metrics.saves,
            "follows": metrics.follows,
            "explorationExposures": metrics.exploration_exposures,
            "explorationClicks": metrics.exploration_clicks,
            "ctr": metrics.ctr(),
            "saveRate": metrics.save_rate(),
            "followRate": metrics.follow_rate(),
            "explorationCtr": metrics.exploration_ctr(),
        });
        if let Err(error) = self.sink.emit(SESSION_METRICS_EVENT, &payload) {
            log::debug!("dropping {SESSION_METRICS_EVENT}: {error}");
        }
        self.last_flush_at = Some(now);
        self.last_flush_exposures = metrics.exposures;
    }

    /// Page-hide hook: force a flush.
    pub fn on_visibility_hidden(&mut self, now: DateTime<Utc>) {
        self.flush(true, now);
    }

    /// Borrow the telemetry sink, for inspection in tests.
    #[must_use]
    pub fn sink(&self) -> &T {
        &self.sink
    }

    fn attribute(
        &self,
        item_key: &str,
        source_hint: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Exposure> {
        let window = Duration::minutes(self.config.attribution_window_minutes);
        let exposures: Vec<Exposure> =
            store::read_json(&self.store, keys::EXPOSURES).unwrap_or_default();
        exposures
            .into_iter()
            .filter(|exposure| {
                exposure.item_key == item_key
                    && source_hint.is_none_or(|hint| exposure.source == hint)
                    && exposure.timestamp <= now
                    && now - exposure.timestamp <= window
            })
            .max_by_key(|exposure| exposure.timestamp)
    }

    fn load_metrics(&self) -> Vec<DayMetrics> {
        store::read_json(&self.store, keys::METRICS).unwrap_or_default()
    }

    fn bump_metrics(&mut self, now: DateTime<Utc>, update: impl FnOnce(&mut DayMetrics)) {
        let day = day_key(now);
        let mut all = self.load_metrics();
        if let Some(metrics) = all.iter_mut().find(|metrics| metrics.day == day) {
            update(metrics);
        } else {
            let mut metrics = DayMetrics::for_day(day);
            update(&mut metrics);
            all.push(metrics);
        }
        store::write_json(&mut self.store, keys::METRICS, &all);
    }

    fn maybe_flush(&mut self, force: bool, now: DateTime<Utc>) {
        let exposures = self.session_metrics(now).exposures;
        let step = self.config.flush_exposure_step;
        let crossed_step = step > 0
            && exposures / step > self.last_flush_exposures / step;
        self.flush(force || crossed_step, now);
    }

    fn emit<P: serde::Serialize>(&mut self, event: &str, payload: &P) {
        match serde_json::to_value(payload) {
            Ok(value) => {
                if let Err(error) = self.sink.emit(event, &value) {
                    log::debug!("dropping {event}: {error}");
                }
            }
            Err(error) => log::debug!("failed to encode {event}: {error}"),
        }
    }
}

/// Drop oldest entries beyond `cap`. Records are appended in timestamp
/// order, so the front of the vector is the oldest.
fn trim_ring<R>(ring: &mut Vec<R>, cap: usize) {
    if ring.len() > cap {
        let excess = ring.len() - cap;
        ring.drain(..excess);
    }
}

/// FNV-1a over UTF-8 bytes; stable across runs and platforms.
fn fnv1a(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
