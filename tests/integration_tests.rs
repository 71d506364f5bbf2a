//! Integration tests for rulebook-engine

use chrono::NaiveDate;
use rulebook_engine::{
    analyze_unmatched, classification_envelope, invariants, normalize, reconciliation_envelope,
    BalanceType, Confidence, ItcClassifier, ItcEligibility, LedgerItem, MatcherSettings,
    ReconciliationMatcher, RuleSection, Rulebook, Schedule3Classifier, TdsClassifier,
    TransactionEntry,
};
use serde_json::json;

const RULEBOOK_YAML: &str = r#"
sections:
  schedule_iii_engine:
    unsecured_loan_from_director:
      keywords: ["unsecured loan", "director loan"]
      target: non_current_liabilities/long_term_borrowings
    trade_payables:
      keywords: ["trade payable", "creditor"]
      target: current_liabilities/trade_payables
    trade_receivables:
      keywords: ["receivable", "debtor"]
      target: current_assets/trade_receivables
    cash:
      keywords: [cash]
      target: current_assets/cash_and_cash_equivalents
  tds_sections:
    section_194j:
      keywords: [professional, fees, legal]
      target: "194J"
      rate: 0.10
      threshold: 30000
    section_194c:
      keywords: [contract, work]
      target: "194C"
      rate: 0.02
      threshold: 100000
  gst_itc_engine:
    motor_vehicles:
      keywords: ["motor vehicle", "car"]
      target: blocked
      note: "ITC on motor vehicles blocked under Section 17(5)"
    mixed_use:
      keywords: [mixed, partial]
      target: conditional
      note: "Proportionate ITC allowed"
"#;

#[test]
fn test_full_classification_pipeline() {
    // Raw request, the way it arrives over the wire: mixed types, stray
    // whitespace, nulls.
    let raw = json!({
        "items": [
            {"ledger": "  Unsecured Loan from Director ", "amount": "400000", "balance_type": "credit"},
            {"ledger": "Cash in Hand", "amount": 12500.0, "balance_type": "debit", "notes": null},
        ]
    });

    let normalized = normalize(&raw).unwrap();
    let items: Vec<LedgerItem> =
        serde_json::from_value(normalized["items"].clone()).unwrap();

    let rulebook = Rulebook::from_yaml_str(RULEBOOK_YAML).unwrap();
    let classifier = Schedule3Classifier::new(&rulebook);
    let result = classifier.classify(&items);

    assert!(result.rulebook_used);
    assert_eq!(result.item_count(), 2);
    assert_eq!(
        result.totals["non_current_liabilities/long_term_borrowings"].total,
        400000.0
    );
    assert_eq!(
        result.totals["current_assets/cash_and_cash_equivalents"].count,
        1
    );

    // Assemble, validate, and hash the envelope.
    let envelope = classification_envelope(&items, &result);
    let report = invariants::check(&envelope);
    assert!(report.all_passed());
    assert_eq!(envelope.micro["items"], serde_json::to_value(&items).unwrap());

    let capsule = envelope.capsule();
    assert_eq!(capsule.len(), 64);
    assert_eq!(capsule, classification_envelope(&items, &result).capsule());
}

#[test]
fn test_priority_ordering_across_rulebook_sections() {
    // "Trade Payables" with a credit balance must land in a liability bucket
    // no matter what asset keywords the description also carries.
    let rulebook = Rulebook::from_yaml_str(RULEBOOK_YAML).unwrap();
    let classifier = Schedule3Classifier::new(&rulebook);
    let items = vec![
        LedgerItem::new("Trade Payables", 75000.0).with_balance_type(BalanceType::Credit),
    ];
    let result = classifier.classify(&items);

    assert_eq!(
        result.totals["current_liabilities/trade_payables"].count,
        1
    );
    for path in result.category_paths() {
        assert!(!path.contains("asset"));
    }
}

#[test]
fn test_full_reconciliation_pipeline() {
    let bank = vec![
        TransactionEntry::new(
            1000.0,
            NaiveDate::from_ymd_opt(2024, 1, 1),
            "Payment",
        ),
        TransactionEntry::new(
            -880.0,
            NaiveDate::from_ymd_opt(2024, 1, 4),
            "NEFT Acme Industries invoice 42",
        ),
        TransactionEntry::new(
            55.5,
            NaiveDate::from_ymd_opt(2024, 1, 9),
            "Bank charges",
        ),
    ];
    let books = vec![
        TransactionEntry::new(
            1000.0,
            NaiveDate::from_ymd_opt(2024, 1, 1),
            "Payment",
        ),
        TransactionEntry::new(
            880.0,
            NaiveDate::from_ymd_opt(2024, 1, 5),
            "Acme Industries invoice payment",
        ),
    ];

    let matcher = ReconciliationMatcher::default();
    let result = matcher.match_entries(&bank, &books);

    // Conservation on both sides.
    assert_eq!(result.matched.len() + result.unmatched_bank.len(), bank.len());
    assert_eq!(result.matched.len() + result.unmatched_books.len(), books.len());

    assert_eq!(result.matched.len(), 2);
    assert_eq!(result.matched[0].confidence, Confidence::High);
    assert_eq!(result.unmatched_bank.len(), 1);
    assert_eq!(result.unmatched_bank[0].description, "Bank charges");

    let envelope = reconciliation_envelope(&bank, &books, &result, matcher.settings());
    assert!(invariants::check(&envelope).all_passed());
    assert_eq!(envelope.micro["bank_entries"], serde_json::to_value(&bank).unwrap());
    assert_eq!(
        envelope.r#macro["summary"]["reconciliation_status"],
        json!("pending")
    );

    let analysis = analyze_unmatched(&result);
    assert!(analysis.requires_review);
    assert_eq!(analysis.bank.count, 1);
    assert_eq!(analysis.books.count, 0);
}

#[test]
fn test_tds_scenario_from_rulebook() {
    let rulebook = Rulebook::from_yaml_str(RULEBOOK_YAML).unwrap();
    let classifier = TdsClassifier::new(&rulebook);
    assert!(classifier.rulebook_used());

    let assessment = classifier.classify_section("Professional consulting fees", 125000.0);
    assert_eq!(assessment.section, "194J");
    assert!(assessment.threshold_exceeded);
    assert!((assessment.tds_amount - 12500.0).abs() < 1e-9);
    assert!((assessment.net_amount - 112500.0).abs() < 1e-9);
}

#[test]
fn test_gst_itc_from_rulebook() {
    let rulebook = Rulebook::from_yaml_str(RULEBOOK_YAML).unwrap();
    let classifier = ItcClassifier::new(&rulebook);

    let blocked = classifier.classify("Car purchase for director", 900000.0);
    assert_eq!(blocked.classification, ItcEligibility::Blocked);
    assert!(blocked.reason.contains("17(5)"));

    let allowed = classifier.classify("Office stationery", 2000.0);
    assert_eq!(allowed.classification, ItcEligibility::Allowed);
}

#[test]
fn test_degraded_rulebook_still_produces_valid_results() {
    // A broken rulebook path degrades to the built-in fallback rules; the
    // pipeline still runs end to end and the envelope still validates.
    let rulebook = Rulebook::from_path("/nonexistent/complete_ca_rulebook.yaml");
    let classifier = Schedule3Classifier::new(&rulebook);

    let items = vec![
        LedgerItem::new("Unsecured Loan from Director", 400000.0)
            .with_balance_type(BalanceType::Credit),
    ];
    let result = classifier.classify(&items);
    assert!(!result.rulebook_used);
    assert_eq!(
        result.totals["non_current_liabilities/long_term_borrowings"].total,
        400000.0
    );

    let envelope = classification_envelope(&items, &result);
    assert!(invariants::check(&envelope).all_passed());
}

#[test]
fn test_empty_everything_degenerate_path() {
    let matcher = ReconciliationMatcher::new(MatcherSettings::default());
    let result = matcher.match_entries(&[], &[]);
    assert!(result.no_data);

    let envelope = reconciliation_envelope(&[], &[], &result, matcher.settings());
    assert!(invariants::check(&envelope).all_passed());
    assert_eq!(envelope.r#macro["summary"]["no_data"], json!(true));

    let classifier =
        Schedule3Classifier::from_section(RuleSection::schedule3_fallback(), false);
    let classification = classifier.classify(&[]);
    let envelope = classification_envelope(&[], &classification);
    assert!(invariants::check(&envelope).all_passed());
}

#[test]
fn test_classification_is_idempotent_with_custom_section() {
    let rulebook = Rulebook::from_yaml_str(RULEBOOK_YAML).unwrap();
    let classifier = Schedule3Classifier::new(&rulebook);
    let items = vec![
        LedgerItem::new("Sundry Debtors", 42000.0).with_balance_type(BalanceType::Debit),
        LedgerItem::new("Sundry Creditors", 31000.0).with_balance_type(BalanceType::Credit),
        LedgerItem::new("Unlabeled suspense", 7.0),
    ];
    let first = classifier.classify(&items);
    let second = classifier.classify(&items);
    assert_eq!(first, second);
    assert_eq!(first.item_count(), 3);
    assert_eq!(first.unmatched_items.len(), 1);
}
