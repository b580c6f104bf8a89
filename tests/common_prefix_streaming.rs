use hitterpatch::core::Engine;

const A: u64 = 1;
const B: u64 = 2;
const C: u64 = 3;
const D: u64 = 4;
const E: u64 = 5;
const END1: u64 = 1001;
const END2: u64 = 1002;

/// `insert(common_prefix=3, extension=[E, END2], 5)` after inserting
/// `[A,B,C,D,END1]` must behave as if `[A,B,C,E,END2]` had been inserted.
#[test]
fn common_prefix_insert_matches_the_equivalent_full_string() {
    let mut engine = Engine::<u64>::create(0.01);
    engine.insert(0, &[A, B, C, D, END1], 5).unwrap();
    engine.insert(3, &[E, END2], 5).unwrap();

    let report = engine.output(0.0);
    assert_eq!(report.grand_total, 10);

    assert!(report
        .items
        .iter()
        .any(|h| h.label == vec![A, B, C, D, END1] && h.total == 5));
    assert!(report
        .items
        .iter()
        .any(|h| h.label == vec![A, B, C, E, END2] && h.total == 5));
    assert!(report
        .items
        .iter()
        .any(|h| h.label == vec![A, B, C] && h.total == 10));
}
