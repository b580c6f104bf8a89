use hitterpatch::core::Engine;

const A: u64 = 1;
const B: u64 = 2;
const C: u64 = 3;
const END1: u64 = 1001;

#[test]
fn single_short_string_reports_itself_in_full() {
    let mut engine = Engine::<u64>::create(0.5);
    engine.insert(0, &[A, B, C, END1], 1).unwrap();

    let report = engine.output(0.0);
    assert_eq!(report.grand_total, 1);
    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].label, vec![A, B, C, END1]);
    assert_eq!(report.items[0].total, 1);
}
