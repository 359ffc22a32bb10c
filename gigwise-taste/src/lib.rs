//! Online learning for the per-session taste model.
//!
//! The model is a set of decaying affinity weights (tags, venues, artists,
//! time-of-day, day-of-week) updated from feedback events. Three operations
//! cover its lifecycle:
//!
//! - [`load_and_decay`] reads the persisted snapshot, applies one
//!   multiplicative decay step, and persists the result before returning it.
//!   Decay is deliberately per-load, not per-elapsed-time: calling it twice
//!   decays twice. Corrupt or missing state yields a fresh zero model.
//! - [`apply_update`] is a pure function folding one feedback event into a
//!   model copy, with every weight clamped and open-ended maps re-capped.
//! - [`save`] sanitizes and persists a snapshot.
//!
//! All weight maps use normalized (trimmed, lowercased) keys.

#![forbid(unsafe_code)]

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use gigwise_core::store::{self, SessionStore, keys};
use gigwise_core::taste::{Daypart, weekday_key};
use gigwise_core::{FeedbackAction, FeedbackEvent, TasteModel, normalize_key};

/// Tuning knobs for decay, clamping, and per-action deltas.
///
/// The defaults reproduce the shipped behavior; tests pin the relative
/// ordering (negative actions subtract, follow nudges the followed entity)
/// rather than the exact numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct TasteConfig {
    /// Multiplier applied to every weight on each load.
    pub decay_factor: f64,
    /// Open-map entries whose decayed magnitude falls below this are dropped.
    pub prune_epsilon: f64,
    /// Lower clamp for every weight.
    pub weight_min: f64,
    /// Upper clamp for every weight.
    pub weight_max: f64,
    /// Maximum entries kept per open-ended map, retained by magnitude.
    pub max_entries_per_map: usize,
    /// Signed weight delta per feedback action.
    pub action_deltas: ActionDeltas,
    /// Smaller delta applied to the daypart and day-of-week buckets.
    pub time_deltas: ActionDeltas,
    /// Extra delta added to a followed entity's own weight on `follow`.
    pub follow_entity_nudge: f64,
}

/// One signed delta per feedback action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionDeltas {
    /// Delta for `click`.
    pub click: f64,
    /// Delta for `save`.
    pub save: f64,
    /// Delta for `follow`.
    pub follow: f64,
    /// Delta for `hide`.
    pub hide: f64,
    /// Delta for `show_less`.
    pub show_less: f64,
}

impl ActionDeltas {
    /// Look up the delta for an action.
    #[must_use]
    pub const fn for_action(&self, action: FeedbackAction) -> f64 {
        match action {
            FeedbackAction::Click => self.click,
            FeedbackAction::Save => self.save,
            FeedbackAction::Follow => self.follow,
            FeedbackAction::Hide => self.hide,
            FeedbackAction::ShowLess => self.show_less,
        }
    }
}

impl Default for TasteConfig {
    fn default() -> Self {
        Self {
            decay_factor: 0.985,
            prune_epsilon: 0.01,
            weight_min: -4.0,
            weight_max: 4.0,
            max_entries_per_map: 64,
            action_deltas: ActionDeltas {
                click: 0.3,
                save: 0.6,
                follow: 0.8,
                hide: -0.9,
                show_less: -0.5,
            },
            time_deltas: ActionDeltas {
                click: 0.1,
                save: 0.15,
                follow: 0.0,
                hide: -0.1,
                show_less: -0.05,
            },
            follow_entity_nudge: 0.4,
        }
    }
}

/// Load the persisted model, decay it once, persist, and return it.
///
/// Missing or unparseable state yields [`TasteModel::empty`]; this never
/// fails. The decayed snapshot is written back immediately so a subsequent
/// load observes the already-decayed weights.
pub fn load_and_decay(
    store: &mut dyn SessionStore,
    config: &TasteConfig,
    now: DateTime<Utc>,
) -> TasteModel {
    let mut model: TasteModel =
        store::read_json(store, keys::TASTE).unwrap_or_else(|| TasteModel::empty(now));
    decay_in_place(&mut model, config);
    model.updated_at = now;
    save(store, config, &model);
    model
}

/// Persist a sanitized snapshot of `model`.
pub fn save(store: &mut dyn SessionStore, config: &TasteConfig, model: &TasteModel) {
    let mut snapshot = model.clone();
    sanitize(&mut snapshot, config);
    store::write_json(store, keys::TASTE, &snapshot);
}

/// Fold one feedback event into a new model. Pure: no I/O, `model` is
/// untouched.
///
/// The action's delta lands on every matching tag weight, the venue weight,
/// and every artist weight, each clamped independently. A `follow` also
/// nudges the followed entity's own weight even when it is absent from the
/// event tags. The smaller time delta lands on the daypart and day-of-week
/// buckets of the event timestamp (or `now`).
#[must_use]
pub fn apply_update(
    model: &TasteModel,
    event: &FeedbackEvent,
    config: &TasteConfig,
    now: DateTime<Utc>,
) -> TasteModel {
    let mut updated = model.clone();
    let delta = config.action_deltas.for_action(event.action);

    for tag in &event.tags {
        bump(&mut updated.tag_weights, tag, delta, config);
    }
    if let Some(venue) = &event.venue_slug {
        bump(&mut updated.venue_weights, venue, delta, config);
    }
    for artist in &event.artist_slugs {
        bump(&mut updated.artist_weights, artist, delta, config);
    }

    if event.action == FeedbackAction::Follow {
        if let Some(slug) = &event.slug {
            let map = match event.entity {
                gigwise_core::EntityType::Venue => &mut updated.venue_weights,
                gigwise_core::EntityType::Artist => &mut updated.artist_weights,
                gigwise_core::EntityType::Event => &mut updated.tag_weights,
            };
            bump(map, slug, config.follow_entity_nudge, config);
        }
    }

    let time_delta = config.time_deltas.for_action(event.action);
    if time_delta != 0.0 {
        let at = event.occurred_at.unwrap_or(now);
        bump(
            &mut updated.daypart_weights,
            Daypart::from_datetime(at).as_str(),
            time_delta,
            config,
        );
        bump(
            &mut updated.dow_weights,
            weekday_key(at.weekday()),
            time_delta,
            config,
        );
    }

    sanitize(&mut updated, config);
    updated.updated_at = now;
    updated
}

/// Multiply every weight by the decay factor, pruning open-map entries
/// whose magnitude falls below the epsilon. Time buckets decay but are
/// never dropped, and no weight ever flips sign.
fn decay_in_place(model: &mut TasteModel, config: &TasteConfig) {
    let factor = config.decay_factor;
    for map in [
        &mut model.tag_weights,
        &mut model.venue_weights,
        &mut model.artist_weights,
    ] {
        map.retain(|_, weight| {
            *weight *= factor;
            weight.abs() >= config.prune_epsilon
        });
    }
    for map in [&mut model.daypart_weights, &mut model.dow_weights] {
        for weight in map.values_mut() {
            *weight *= factor;
        }
    }
}

/// Clamp every weight and re-cap the open-ended maps by magnitude.
fn sanitize(model: &mut TasteModel, config: &TasteConfig) {
    for map in [
        &mut model.tag_weights,
        &mut model.venue_weights,
        &mut model.artist_weights,
    ] {
        clamp_all(map, config);
        cap_by_magnitude(map, config.max_entries_per_map);
    }
    clamp_all(&mut model.daypart_weights, config);
    clamp_all(&mut model.dow_weights, config);
}

fn clamp_all(map: &mut HashMap<String, f64>, config: &TasteConfig) {
    for weight in map.values_mut() {
        *weight = weight.clamp(config.weight_min, config.weight_max);
    }
}

/// Keep only the `cap` largest-magnitude entries.
///
/// Magnitude ties break on key order so pruning is deterministic.
fn cap_by_magnitude(map: &mut HashMap<String, f64>, cap: usize) {
    if map.len() <= cap {
        return;
    }
    let mut entries: Vec<(String, f64)> = map.drain().collect();
    entries.sort_by(|(key_a, weight_a), (key_b, weight_b)| {
        weight_b
            .abs()
            .partial_cmp(&weight_a.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| key_a.cmp(key_b))
    });
    entries.truncate(cap);
    map.extend(entries);
}

fn bump(map: &mut HashMap<String, f64>, raw_key: &str, delta: f64, config: &TasteConfig) {
    let key = normalize_key(raw_key);
    if key.is_empty() {
        return;
    }
    let entry = map.entry(key).or_insert(0.0);
    *entry = (*entry + delta).clamp(config.weight_min, config.weight_max);
}
