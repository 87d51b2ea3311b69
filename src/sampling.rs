//! Deterministic down-sampling of large review sets.
//!
//! Sampling is stratified by source so the OWN/COMPETITOR proportions of the
//! input survive, and seeded so the same input always produces the same
//! sample.

use crate::classify::Source;
use crate::normalize::ReviewSet;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Review count above which the set is sampled before prompting.
pub const DEFAULT_SAMPLE_THRESHOLD: usize = 500;

/// Fixed seed for reproducible sampling.
pub const SAMPLE_SEED: u64 = 42;

/// Reduce the set to at most `threshold` reviews. Returns the (possibly
/// reduced) set and whether sampling occurred; callers surface the flag to
/// the end user. Sets at or below the threshold pass through unchanged.
pub fn sample_reviews(set: ReviewSet, threshold: usize) -> (ReviewSet, bool) {
    let total = set.len();
    if total <= threshold || threshold == 0 {
        return (set, false);
    }

    let own_total = set.count_source(Source::Own);
    // Quota proportional to each side's share of the input
    let own_quota = threshold * own_total / total;
    let competitor_quota = threshold - own_quota;

    let ReviewSet { reviews, file_stats } = set;
    let (own, competitor): (Vec<_>, Vec<_>) =
        reviews.into_iter().partition(|r| r.source == Source::Own);

    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    let mut sampled = take_sample(own, own_quota, &mut rng);
    sampled.extend(take_sample(competitor, competitor_quota, &mut rng));

    tracing::warn!(
        "Sampled {} of {} reviews (threshold {}) for prompt size",
        sampled.len(),
        total,
        threshold
    );

    (
        ReviewSet {
            reviews: sampled,
            file_stats,
        },
        true,
    )
}

/// Pick `amount` elements at random, preserving their original order.
fn take_sample<T>(items: Vec<T>, amount: usize, rng: &mut StdRng) -> Vec<T> {
    let amount = amount.min(items.len());
    if amount == items.len() {
        return items;
    }
    let mut picked: Vec<usize> = index::sample(rng, items.len(), amount).into_vec();
    picked.sort_unstable();
    let mut picked = picked.into_iter().peekable();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if picked.peek() == Some(&i) {
                picked.next();
                Some(item)
            } else {
                None
            }
        })
        .collect()
}
