//! Reconcile a bank statement against book entries and print the scored
//! matches.
//!
//! Run with: cargo run --example bank_reconciliation

use chrono::NaiveDate;
use rulebook_engine::{
    analyze_unmatched, reconciliation_envelope, MatcherSettings, ReconciliationMatcher,
    TransactionEntry,
};

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn main() {
    let bank = vec![
        TransactionEntry::new(25000.0, date(2024, 1, 3), "NEFT Acme Industries"),
        TransactionEntry::new(-1180.0, date(2024, 1, 5), "Card payment office supplies"),
        TransactionEntry::new(590.0, date(2024, 1, 9), "Bank charges"),
    ];
    let books = vec![
        TransactionEntry::new(25000.0, date(2024, 1, 4), "Acme Industries invoice settlement"),
        TransactionEntry::new(1180.0, date(2024, 1, 5), "Office supplies purchase"),
    ];

    let matcher = ReconciliationMatcher::new(MatcherSettings::default());
    let result = matcher.match_entries(&bank, &books);

    println!("match rate: {:.0}%", result.match_rate * 100.0);
    for m in &result.matched {
        println!(
            "[{:?}] {:.2} '{}' <-> '{}' (score {:.2}, {})",
            m.confidence,
            m.bank_entry.amount,
            m.bank_entry.description,
            m.book_entry.description,
            m.score,
            m.reasons.join(", "),
        );
    }
    for e in &result.unmatched_bank {
        println!("unmatched bank: {:.2} '{}'", e.amount, e.description);
    }
    for e in &result.unmatched_books {
        println!("unmatched books: {:.2} '{}'", e.amount, e.description);
    }

    let analysis = analyze_unmatched(&result);
    println!("reconciliation gap: {:.2}", analysis.reconciliation_gap);

    let envelope = reconciliation_envelope(&bank, &books, &result, matcher.settings());
    println!("capsule: {}", envelope.capsule());
}
