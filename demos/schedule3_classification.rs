//! Classify a small trial balance into Schedule III categories and print the
//! assembled envelope.
//!
//! Run with: cargo run --example schedule3_classification

use rulebook_engine::{
    classification_envelope, invariants, BalanceType, LedgerItem, Rulebook, Schedule3Classifier,
};

fn main() {
    // No rulebook on disk here, so the classifier runs on its built-in
    // fallback rules and flags that on the result.
    let rulebook = Rulebook::from_path("complete_ca_rulebook.yaml");
    let classifier = Schedule3Classifier::new(&rulebook);

    let items = vec![
        LedgerItem::new("Unsecured Loan from Director", 400000.0)
            .with_balance_type(BalanceType::Credit),
        LedgerItem::new("Cash in Hand", 18250.0).with_balance_type(BalanceType::Debit),
        LedgerItem::new("Sundry Creditors", 96000.0).with_balance_type(BalanceType::Credit),
        LedgerItem::new("Furniture and Fixtures", 125000.0)
            .with_balance_type(BalanceType::Debit),
        LedgerItem::new("Suspense", 999.0),
    ];

    let result = classifier.classify(&items);

    println!("rulebook used: {}", result.rulebook_used);
    for (category, total) in &result.totals {
        println!("{category}: {} item(s), total {:.2}", total.count, total.total);
    }
    for item in &result.unmatched_items {
        println!("unmatched: {}", item.ledger);
    }

    let envelope = classification_envelope(&items, &result);
    let report = invariants::check(&envelope);
    println!("invariants passed: {}", report.all_passed());
    println!("capsule: {}", envelope.capsule());
}
