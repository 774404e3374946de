// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles leptons with a seeded RNG and splits them into a
// training set and a test set. The split point is
// floor(training_split * n), so the test set gets the remainder.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` and split into (train, test).
///
/// # Arguments
/// * `samples`        - All available samples (consumed by this function)
/// * `train_fraction` - Proportion for training, e.g. 0.66
/// * `seed`           - RNG seed; the same seed gives the same split
pub fn split_train_test<T>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    seed:           u64,
) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).floor() as usize;
    let split_at = split_at.min(total);

    // After this: samples = [0..split_at], test = [split_at..total]
    let test = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} test",
        samples.len(),
        test.len(),
    );

    (samples, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_uses_floor() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test)     = split_train_test(items, 0.66, 1);
        assert_eq!(train.len(), 66);
        assert_eq!(test.len(),  34);

        let items: Vec<usize> = (0..10).collect();
        let (train, test)     = split_train_test(items, 0.75, 1);
        assert_eq!(train.len(), 7);
        assert_eq!(test.len(),  3);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, test)     = split_train_test(items, 0.7, 3);
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_test((0..40).collect::<Vec<u32>>(), 0.5, 42);
        let b = split_train_test((0..40).collect::<Vec<u32>>(), 0.5, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, test)     = split_train_test(items, 0.8, 0);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }
}
