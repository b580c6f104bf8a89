use proptest::prelude::*;

use hitterpatch::core::Engine;

/// Builds `count` distinct strings of `depth` symbols drawn from a small
/// alphabet, each capped with its own unique terminator, and returns the
/// sequence of `(common_prefix, extension, sample_count)` triples an
/// `Engine::insert` caller would produce for them.
fn plan(alphabet: u64, depth: usize, strings: Vec<Vec<u64>>) -> Vec<(u32, Vec<u64>, i64)> {
    let mut previous: Vec<u64> = Vec::new();
    let mut plan = Vec::new();
    for (i, body) in strings.into_iter().enumerate() {
        let mut full: Vec<u64> = body.into_iter().map(|s| s % alphabet).collect();
        full.truncate(depth);
        full.push(1_000_000 + i as u64);

        let shared = previous
            .iter()
            .zip(full.iter())
            .take_while(|(a, b)| a == b)
            .count();
        plan.push((shared as u32, full[shared..].to_vec(), 1));
        previous = full;
    }
    plan
}

proptest! {
    /// Invariant 5: for every truly-inserted count `k`, the reported
    /// `(light, total, upper)` tuple brackets the true weight within
    /// `k * error`.
    #[test]
    fn reported_bounds_bracket_true_weight(
        strings in prop::collection::vec(prop::collection::vec(0u64..8, 1..6), 1..40),
        error in 0.05f64..0.5,
    ) {
        let plan = plan(8, 6, strings);
        let mut engine = Engine::<u64>::create(error);
        let k = plan.len() as f64;
        for (common_prefix, extension, count) in &plan {
            engine.insert(*common_prefix, extension, *count).unwrap();
        }

        let report = engine.output(0.0);
        let slack = (k * error).ceil() as i64 + 1;
        for item in &report.items {
            prop_assert!(item.light <= item.total);
            prop_assert!(item.total <= item.upper);
            prop_assert!(item.upper - item.light <= slack);
        }
    }

    /// Invariant 7: re-running `output` with the same frequency and no
    /// intervening inserts is idempotent.
    #[test]
    fn repeated_output_is_idempotent(
        strings in prop::collection::vec(prop::collection::vec(0u64..8, 1..6), 1..20),
        frequency in 0.0f64..1.0,
    ) {
        let plan = plan(8, 6, strings);
        let mut engine = Engine::<u64>::create(0.1);
        for (common_prefix, extension, count) in &plan {
            engine.insert(*common_prefix, extension, *count).unwrap();
        }

        let first = engine.output(frequency);
        let second = engine.output(frequency);
        prop_assert_eq!(first.grand_total, second.grand_total);
        prop_assert_eq!(first.items.len(), second.items.len());
        for (a, b) in first.items.iter().zip(second.items.iter()) {
            prop_assert_eq!(&a.label, &b.label);
            prop_assert_eq!(a.light, b.light);
            prop_assert_eq!(a.total, b.total);
            prop_assert_eq!(a.upper, b.upper);
        }
    }
}
