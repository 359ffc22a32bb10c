//! Deterministic exploration interleaving.
//!
//! A controlled fraction of non-exploited candidates is spliced into the
//! head of the ranked list so under-exposed content gathers feedback. All
//! randomness is a seeded `ChaCha8Rng` keyed on `(seed, batch index)`: the
//! same inputs always produce the same interleaving.

use std::collections::VecDeque;

use gigwise_core::{RankedItem, ScoreEntry};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Tuning knobs for the mixer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationConfig {
    /// Lists shorter than this are left untouched.
    pub min_items: usize,
    /// Exploration never displaces the top slots.
    pub protected_head: usize,
    /// Exploit items taken between exploration opportunities.
    pub batch_size: usize,
    /// The mixer stops interleaving after this many placed items.
    pub max_placed: usize,
    /// Negligible score added to spliced items so strict ordering stays
    /// stable without changing relative exploit ranking.
    pub score_nudge: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            min_items: 6,
            protected_head: 5,
            batch_size: 4,
            max_placed: 20,
            score_nudge: 0.001,
        }
    }
}

/// Result of one mixing pass.
#[derive(Debug, Clone)]
pub struct MixOutcome {
    /// Final item order.
    pub items: Vec<RankedItem>,
    /// Number of exploration items spliced in.
    pub count: usize,
    /// The rate the mixer ran with.
    pub rate: f64,
}

/// Interleave exploration candidates into a ranked list.
///
/// No-op for short lists or a non-positive rate. The exploration pool is
/// every item beyond the protected head that is either flagged upstream as
/// an exploration candidate or carries no taste-derived score term.
#[must_use]
pub fn mix(items: Vec<RankedItem>, config: &ExplorationConfig, rate: f64, seed: u64) -> MixOutcome {
    if items.len() < config.min_items || rate <= 0.0 {
        return MixOutcome {
            items,
            count: 0,
            rate,
        };
    }

    let mut exploit: VecDeque<(usize, RankedItem)> = items.into_iter().enumerate().collect();
    let mut pool: Vec<usize> = exploit
        .iter()
        .filter(|(ordinal, item)| {
            *ordinal >= config.protected_head
                && (item.candidate.is_exploration_candidate || !item.is_taste_boosted())
        })
        .map(|(ordinal, _)| *ordinal)
        .collect();

    let mut output: Vec<RankedItem> = Vec::with_capacity(exploit.len());
    let mut count = 0;
    let mut batch_index: u64 = 0;

    while !exploit.is_empty() && output.len() < config.max_placed {
        for _ in 0..config.batch_size {
            if output.len() >= config.max_placed {
                break;
            }
            let Some((ordinal, item)) = exploit.pop_front() else {
                break;
            };
            pool.retain(|&pooled| pooled != ordinal);
            output.push(item);
        }

        if pool.is_empty() || exploit.is_empty() || output.len() >= config.max_placed {
            batch_index += 1;
            continue;
        }

        let mut rng = batch_rng(seed, batch_index);
        if rng.gen::<f64>() < rate {
            let pool_index = rng.gen_range(0..pool.len());
            let ordinal = pool.swap_remove(pool_index);
            if let Some(position) = exploit.iter().position(|(o, _)| *o == ordinal) {
                if let Some((_, mut item)) = exploit.remove(position) {
                    item.exploration = true;
                    item.breakdown
                        .push(ScoreEntry::new("exploration", config.score_nudge));
                    item.score += config.score_nudge;
                    output.push(item);
                    count += 1;
                }
            }
        }
        batch_index += 1;
    }

    // Anything past the placement budget keeps its exploit order.
    output.extend(exploit.into_iter().map(|(_, item)| item));

    MixOutcome {
        items: output,
        count,
        rate,
    }
}

/// Small deterministic PRNG for one batch decision.
fn batch_rng(seed: u64, batch_index: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed ^ batch_index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
