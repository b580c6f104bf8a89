use hitterpatch::core::Engine;

const B: u64 = 2;
const C: u64 = 3;
const END1: u64 = 1001;
const END2: u64 = 1002;

#[test]
fn shared_suffix_is_reported_alongside_the_full_strings() {
    let mut engine = Engine::<u64>::create(0.01);
    engine.insert(0, &[1, B, END1], 10).unwrap();
    engine.insert(0, &[C, B, END2], 10).unwrap();

    let report = engine.output(0.3);

    assert!(report
        .items
        .iter()
        .any(|h| h.label == vec![1, B, END1] && h.total == 10));
    assert!(report
        .items
        .iter()
        .any(|h| h.label == vec![C, B, END2] && h.total == 10));
    assert!(report
        .items
        .iter()
        .any(|h| h.label == vec![B] && h.total == 20));
}
