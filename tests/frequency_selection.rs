use hitterpatch::core::Engine;

const A: u64 = 1;
const B: u64 = 2;
const C: u64 = 3;
const D: u64 = 4;
const END1: u64 = 1001;
const END2: u64 = 1002;

#[test]
fn high_weight_chain_survives_low_weight_chain_does_not() {
    let mut engine = Engine::<u64>::create(0.01);
    engine.insert(0, &[A, B, END1], 90).unwrap();
    engine.insert(0, &[C, D, END2], 10).unwrap();

    let report = engine.output(0.5);

    assert!(report
        .items
        .iter()
        .any(|h| h.label == vec![A, B, END1] && h.total == 90));
    assert!(!report.items.iter().any(|h| h.label == vec![C, D, END2]));
}
