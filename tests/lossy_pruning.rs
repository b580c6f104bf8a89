use hitterpatch::core::Engine;

/// With `error = 0.25` (`bucket_size = 4`), ten distinct length-2 strings
/// each squash below the bucket threshold at some point, yet the total
/// sample weight must survive intact in `grand_total`.
#[test]
fn squashed_mass_survives_in_grand_total() {
    let mut engine = Engine::<u64>::create(0.25);

    for i in 0..10u64 {
        let a = 100 + i;
        let end = 1000 + i;
        engine.insert(0, &[a, end], 1).unwrap();
    }

    let report = engine.output(0.0);
    assert_eq!(report.grand_total, 10);
    assert!(
        engine.leaf_count() < 10,
        "squashed singletons must not linger as leaves: got {}",
        engine.leaf_count()
    );
}
