//! Anti-repetition constraints over the head of a ranked list.
//!
//! The head window (at most the top ten slots) is rebuilt greedily so that
//! no venue appears more than twice, no primary tag runs three in a row,
//! and no recall source exceeds its quota. The venue cap is the softest
//! constraint: it is relaxed first when nothing else fits, and a final
//! enforcement sweep restores it by swapping where an alternative exists.

use std::collections::HashMap;

use gigwise_core::{RankedItem, SourceCategory};

/// Tuning knobs for the head-window constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiversityConfig {
    /// Maximum head window size.
    pub window: usize,
    /// Maximum occurrences of one venue inside the window.
    pub max_per_venue: usize,
    /// Maximum consecutive run of one primary tag.
    pub max_tag_run: usize,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            window: 10,
            max_per_venue: 2,
            max_tag_run: 2,
        }
    }
}

/// Reorder the head window under the diversity constraints.
///
/// Items not selected for the window are appended afterward in their prior
/// relative order. The input is already score-sorted; within the window the
/// greedy pass always prefers the highest-ranked item that satisfies every
/// constraint.
#[must_use]
pub fn apply_diversity(items: Vec<RankedItem>, config: &DiversityConfig) -> Vec<RankedItem> {
    let window = config.window.min(items.len());
    if window < 2 {
        return items;
    }

    let quota = source_quota(&items, window);
    let mut remaining: Vec<Option<RankedItem>> = items.into_iter().map(Some).collect();
    let mut selected: Vec<RankedItem> = Vec::with_capacity(remaining.len());
    let mut venue_counts: HashMap<String, usize> = HashMap::new();
    let mut source_counts: HashMap<SourceCategory, usize> = HashMap::new();

    while selected.len() < window {
        let pick = find_pick(&remaining, &selected, &venue_counts, &source_counts, quota, config);
        let Some(index) = pick else { break };
        let Some(item) = remaining[index].take() else {
            break;
        };
        if let Some(venue) = &item.candidate.venue_slug {
            *venue_counts.entry(venue.clone()).or_insert(0) += 1;
        }
        if let Some(source) = item.candidate.source_category {
            *source_counts.entry(source).or_insert(0) += 1;
        }
        selected.push(item);
    }

    selected.extend(remaining.into_iter().flatten());
    selected
}

/// Choose the next window slot: first item passing every constraint, then
/// first passing everything but the venue cap, then the first remaining.
fn find_pick(
    remaining: &[Option<RankedItem>],
    selected: &[RankedItem],
    venue_counts: &HashMap<String, usize>,
    source_counts: &HashMap<SourceCategory, usize>,
    quota: Option<usize>,
    config: &DiversityConfig,
) -> Option<usize> {
    let mut first_any = None;
    let mut first_without_venue_cap = None;

    for (index, slot) in remaining.iter().enumerate() {
        let Some(item) = slot else { continue };
        if first_any.is_none() {
            first_any = Some(index);
        }
        let tag_ok = tag_run_ok(item, selected, config.max_tag_run);
        let source_ok = source_quota_ok(item, source_counts, quota);
        if !(tag_ok && source_ok) {
            continue;
        }
        if first_without_venue_cap.is_none() {
            first_without_venue_cap = Some(index);
        }
        if venue_ok(item, venue_counts, config.max_per_venue) {
            return Some(index);
        }
    }

    first_without_venue_cap.or(first_any)
}

fn venue_ok(
    item: &RankedItem,
    venue_counts: &HashMap<String, usize>,
    max_per_venue: usize,
) -> bool {
    item.candidate
        .venue_slug
        .as_ref()
        .is_none_or(|venue| venue_counts.get(venue).copied().unwrap_or(0) < max_per_venue)
}

fn tag_run_ok(item: &RankedItem, selected: &[RankedItem], max_tag_run: usize) -> bool {
    let Some(tag) = &item.candidate.primary_tag else {
        return true;
    };
    if selected.len() < max_tag_run {
        return true;
    }
    let run = selected
        .iter()
        .rev()
        .take_while(|prior| prior.candidate.primary_tag.as_ref() == Some(tag))
        .count();
    run < max_tag_run
}

fn source_quota_ok(
    item: &RankedItem,
    source_counts: &HashMap<SourceCategory, usize>,
    quota: Option<usize>,
) -> bool {
    let (Some(source), Some(quota)) = (item.candidate.source_category, quota) else {
        return true;
    };
    source_counts.get(&source).copied().unwrap_or(0) < quota
}

/// `ceil(window / distinct categories present)`, or `None` when no item
/// carries a category.
fn source_quota(items: &[RankedItem], window: usize) -> Option<usize> {
    let mut seen: Vec<SourceCategory> = Vec::new();
    for item in items {
        if let Some(source) = item.candidate.source_category {
            if !seen.contains(&source) {
                seen.push(source);
            }
        }
    }
    if seen.is_empty() {
        return None;
    }
    Some(window.div_ceil(seen.len()))
}

/// Post-diversity safety net: re-scan the head window and swap any item
/// that pushes a venue past the cap with the first later item whose venue
/// still has room. Idempotent on compliant lists.
pub fn enforce_venue_cap(items: &mut [RankedItem], config: &DiversityConfig) {
    let window = config.window.min(items.len());
    let mut index = 0;
    while index < window {
        let venue = items[index].candidate.venue_slug.clone();
        let Some(venue) = venue else {
            index += 1;
            continue;
        };
        let count = head_venue_count(items, window, &venue);
        let over_cap = count > config.max_per_venue
            && occurrence_rank(items, index, &venue) > config.max_per_venue;
        if over_cap {
            if let Some(swap_with) = find_swap_target(items, window, index, config) {
                items.swap(index, swap_with);
                // Re-check the slot with its new occupant.
                continue;
            }
        }
        index += 1;
    }
}

fn head_venue_count(items: &[RankedItem], window: usize, venue: &str) -> usize {
    items
        .iter()
        .take(window)
        .filter(|item| item.candidate.venue_slug.as_deref() == Some(venue))
        .count()
}

/// 1-based position of `index` among head occurrences of its venue.
fn occurrence_rank(items: &[RankedItem], index: usize, venue: &str) -> usize {
    items
        .iter()
        .take(index + 1)
        .filter(|item| item.candidate.venue_slug.as_deref() == Some(venue))
        .count()
}

fn find_swap_target(
    items: &[RankedItem],
    window: usize,
    index: usize,
    config: &DiversityConfig,
) -> Option<usize> {
    ((index + 1)..items.len()).find(|&later| {
        match items[later].candidate.venue_slug.as_deref() {
            None => true,
            Some(venue) => head_venue_count(items, window, venue) < config.max_per_venue,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gigwise_core::{Candidate, EntityType, ScoreEntry};
    use rstest::rstest;

    fn item(slug: &str, venue: Option<&str>, tag: Option<&str>, score: f64) -> RankedItem {
        let mut candidate = Candidate::new(EntityType::Event, slug, slug);
        if let Some(venue) = venue {
            candidate = candidate.with_venue(venue);
        }
        if let Some(tag) = tag {
            candidate = candidate.with_primary_tag(tag);
        }
        RankedItem::from_breakdown(candidate, vec![ScoreEntry::new("followed_venue", score)])
    }

    fn slugs(items: &[RankedItem]) -> Vec<&str> {
        items.iter().map(|i| i.candidate.slug.as_str()).collect()
    }

    #[rstest]
    fn venue_cap_defers_third_occurrence() {
        let items = vec![
            item("a", Some("v1"), None, 50.0),
            item("b", Some("v1"), None, 40.0),
            item("c", Some("v1"), None, 30.0),
            item("d", Some("v2"), None, 20.0),
        ];
        let out = apply_diversity(items, &DiversityConfig::default());
        assert_eq!(slugs(&out), vec!["a", "b", "d", "c"]);
    }

    #[rstest]
    fn tag_runs_break_at_two() {
        let items = vec![
            item("a", Some("v1"), Some("jazz"), 50.0),
            item("b", Some("v2"), Some("jazz"), 40.0),
            item("c", Some("v3"), Some("jazz"), 30.0),
            item("d", Some("v4"), Some("metal"), 20.0),
        ];
        let out = apply_diversity(items, &DiversityConfig::default());
        assert_eq!(slugs(&out), vec!["a", "b", "d", "c"]);
    }

    #[rstest]
    fn venue_cap_relaxes_when_no_alternative() {
        let items = vec![
            item("a", Some("v1"), None, 50.0),
            item("b", Some("v1"), None, 40.0),
            item("c", Some("v1"), None, 30.0),
        ];
        let out = apply_diversity(items, &DiversityConfig::default());
        // Nothing else to pick: the cap fails rather than the ranking call.
        assert_eq!(slugs(&out), vec!["a", "b", "c"]);
    }

    #[rstest]
    fn tail_keeps_prior_relative_order() {
        let mut items: Vec<RankedItem> = (0..15)
            .map(|n| {
                let score = 100.0 - f64::from(n);
                item(&format!("s{n:02}"), Some("shared"), None, score)
            })
            .collect();
        // Give later items distinct venues so the window can fill.
        for (n, entry) in items.iter_mut().enumerate().skip(2) {
            entry.candidate.venue_slug = Some(format!("v{n}"));
        }
        let out = apply_diversity(items, &DiversityConfig::default());
        let tail: Vec<&str> = slugs(&out)[10..].to_vec();
        assert_eq!(tail, vec!["s10", "s11", "s12", "s13", "s14"]);
    }

    #[rstest]
    fn enforce_cap_swaps_offender_with_first_viable() {
        let mut items = vec![
            item("a", Some("v1"), None, 50.0),
            item("b", Some("v1"), None, 40.0),
            item("c", Some("v1"), None, 30.0),
            item("d", Some("v2"), None, 20.0),
        ];
        enforce_venue_cap(&mut items, &DiversityConfig::default());
        assert_eq!(slugs(&items), vec!["a", "b", "d", "c"]);
    }

    #[rstest]
    fn enforce_cap_is_idempotent() {
        let mut items = vec![
            item("a", Some("v1"), None, 50.0),
            item("b", Some("v1"), None, 40.0),
            item("c", Some("v2"), None, 30.0),
            item("d", Some("v2"), None, 20.0),
        ];
        let owned = |items: &[RankedItem]| -> Vec<String> {
            items.iter().map(|i| i.candidate.slug.clone()).collect()
        };
        let before = owned(&items);
        enforce_venue_cap(&mut items, &DiversityConfig::default());
        let once = owned(&items);
        enforce_venue_cap(&mut items, &DiversityConfig::default());
        assert_eq!(owned(&items), once);
        assert_eq!(once, before);
    }

    #[rstest]
    fn source_quota_spreads_categories() {
        let follow = |slug: &str, score: f64| {
            let mut it = item(slug, None, None, score);
            it.candidate.source_category = Some(SourceCategory::Follow);
            it
        };
        let trending = |slug: &str, score: f64| {
            let mut it = item(slug, None, None, score);
            it.candidate.source_category = Some(SourceCategory::Trending);
            it
        };
        // Window of 4 with two categories: quota is 2 each.
        let items = vec![
            follow("a", 50.0),
            follow("b", 45.0),
            follow("c", 40.0),
            trending("d", 35.0),
        ];
        let config = DiversityConfig {
            window: 4,
            ..DiversityConfig::default()
        };
        let out = apply_diversity(items, &config);
        assert_eq!(slugs(&out), vec!["a", "b", "d", "c"]);
    }
}
