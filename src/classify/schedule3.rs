//! Schedule III classification of ledger items into balance sheet categories

use tracing::{debug, warn};

use crate::classify::{fallback_category, ClassificationResult, PriorityMatcher};
use crate::rulebook::{RuleSection, Rulebook};
use crate::types::LedgerItem;

/// Rulebook section consulted for Schedule III mapping rules
pub const SECTION_NAME: &str = "schedule_iii_engine";

/// Classifies trial-balance lines into Schedule III category paths
///
/// Pure function of (items, rule section): classifying the same items twice
/// yields identical assignments.
#[derive(Debug, Clone)]
pub struct Schedule3Classifier {
    matcher: PriorityMatcher,
    rulebook_used: bool,
}

impl Schedule3Classifier {
    /// Build against the shared rulebook. A missing or empty section degrades
    /// to the built-in fallback rules; `rulebook_used` on results records
    /// which path was taken.
    pub fn new(rulebook: &Rulebook) -> Self {
        let section = rulebook.get_section(SECTION_NAME);
        if section.is_empty() {
            warn!(section = SECTION_NAME, "rule section empty, using built-in fallback rules");
            Self::from_section(RuleSection::schedule3_fallback(), false)
        } else {
            Self::from_section(section, true)
        }
    }

    /// Build from an explicit section (fixture sections in tests).
    pub fn from_section(section: RuleSection, rulebook_used: bool) -> Self {
        Self {
            matcher: PriorityMatcher::new(&section),
            rulebook_used,
        }
    }

    /// Assign each item to the best-matching category path, or to the
    /// unmatched bucket. Every input item lands in exactly one place.
    pub fn classify(&self, items: &[LedgerItem]) -> ClassificationResult {
        let mut result = ClassificationResult::new(self.rulebook_used);

        for item in items {
            let search_key = item.ledger.to_lowercase();

            if let Some(rule) = self.matcher.first_match(&search_key) {
                debug!(ledger = %item.ledger, rule = %rule.id, target = %rule.target, "rule matched");
                result.push(&rule.target, item, Some(rule.id.clone()));
                continue;
            }

            match fallback_category(&search_key, item.balance_type) {
                Some(category) => {
                    result
                        .flags
                        .push(format!("item classified via balance-type fallback: {}", item.ledger));
                    result.push(category, item, None);
                }
                None => {
                    result
                        .flags
                        .push(format!("item unmatched (no balance type): {}", item.ledger));
                    result.unmatched_items.push(item.clone());
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BalanceType;

    fn classifier() -> Schedule3Classifier {
        Schedule3Classifier::from_section(RuleSection::schedule3_fallback(), false)
    }

    #[test]
    fn test_unsecured_loan_from_director() {
        let items = vec![
            LedgerItem::new("Unsecured Loan from Director", 400000.0)
                .with_balance_type(BalanceType::Credit),
        ];
        let result = classifier().classify(&items);

        let bucket = &result.classified["non_current_liabilities/long_term_borrowings"];
        assert_eq!(bucket.len(), 1);
        assert_eq!(
            result.totals["non_current_liabilities/long_term_borrowings"].total,
            400000.0
        );
        assert!(result.unmatched_items.is_empty());
    }

    #[test]
    fn test_trade_payables_never_lands_in_assets() {
        // "Trade Payables Stock Adjustment" also contains the asset keyword
        // "stock"; the liability tier must still win.
        let items = vec![
            LedgerItem::new("Trade Payables Stock Adjustment", 5000.0)
                .with_balance_type(BalanceType::Credit),
        ];
        let result = classifier().classify(&items);

        for path in result.category_paths() {
            assert!(
                !path.contains("asset"),
                "trade payables classified into asset bucket {path}"
            );
        }
        assert_eq!(result.item_count(), 1);
    }

    #[test]
    fn test_coverage_invariant() {
        let items = vec![
            LedgerItem::new("Cash in Hand", 1200.0).with_balance_type(BalanceType::Debit),
            LedgerItem::new("Sundry Creditors", 9000.0).with_balance_type(BalanceType::Credit),
            LedgerItem::new("Completely Unknown Ledger", 1.0),
            LedgerItem::new("Misc Suspense", 42.0).with_balance_type(BalanceType::Debit),
        ];
        let result = classifier().classify(&items);
        assert_eq!(result.item_count(), items.len());
        assert_eq!(result.unmatched_items.len(), 1);
    }

    #[test]
    fn test_idempotence() {
        let items = vec![
            LedgerItem::new("Furniture and Fixtures", 80000.0)
                .with_balance_type(BalanceType::Debit),
            LedgerItem::new("Customer Advance", 20000.0).with_balance_type(BalanceType::Credit),
        ];
        let c = classifier();
        assert_eq!(c.classify(&items), c.classify(&items));
    }

    #[test]
    fn test_rulebook_used_flag() {
        let rulebook = Rulebook::empty();
        let result = Schedule3Classifier::new(&rulebook).classify(&[]);
        assert!(!result.rulebook_used);
    }

    #[test]
    fn test_empty_input_is_empty_result() {
        let result = classifier().classify(&[]);
        assert_eq!(result.item_count(), 0);
        assert!(result.classified.is_empty());
    }
}
