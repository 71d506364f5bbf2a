//! Rule-driven classification engines
//!
//! All classifiers share one priority-ordered matching algorithm over
//! rulebook-defined keyword rules: rules are tagged with a tier at
//! construction time and evaluated top-down, first match wins. The tier
//! ordering (equity, then liability, then asset, then generic) exists because
//! plain substring matching misclassifies systematically — an item literally
//! named "Trade Payables" must never fall into an asset bucket through a
//! looser fallback rule.

pub mod gst;
pub mod schedule3;
pub mod tds;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rulebook::{MappingRule, RuleSection};
use crate::types::{BalanceType, LedgerItem};

pub use gst::{ItcAssessment, ItcClassifier, ItcEligibility};
pub use schedule3::Schedule3Classifier;
pub use tds::{TaggedEntry, TdsAssessment, TdsClassifier};

/// Priority tier of a rule. Lower tiers are evaluated first; adding a new
/// tier is a one-line insertion here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleTier {
    Equity,
    Liability,
    Asset,
    Generic,
}

impl RuleTier {
    /// Infer the tier from a rule's target category path.
    pub fn of_target(target: &str) -> Self {
        let t = target.to_lowercase();
        if t.contains("equity") || t.contains("capital") || t.contains("reserve") {
            RuleTier::Equity
        } else if t.contains("liabilit") || t.contains("borrowing") || t.contains("payable") {
            RuleTier::Liability
        } else if t.contains("asset") {
            RuleTier::Asset
        } else {
            RuleTier::Generic
        }
    }
}

/// A rule section reordered into an explicit priority list
///
/// The sort is stable: rules keep their declaration order within a tier, so
/// rulebook authors can rely on earlier rules winning ties.
#[derive(Debug, Clone)]
pub struct PriorityMatcher {
    rules: Vec<(RuleTier, MappingRule)>,
}

impl PriorityMatcher {
    pub fn new(section: &RuleSection) -> Self {
        let mut rules: Vec<(RuleTier, MappingRule)> = section
            .rules
            .iter()
            .map(|r| (RuleTier::of_target(&r.target), r.clone()))
            .collect();
        rules.sort_by_key(|(tier, _)| *tier);
        Self { rules }
    }

    /// First rule whose keywords occur in the search key, respecting tier
    /// order. No scoring, no second pass.
    pub fn first_match(&self, search_key: &str) -> Option<&MappingRule> {
        let key = search_key.to_lowercase();
        self.rules
            .iter()
            .find(|(_, rule)| rule.matches(&key))
            .map(|(_, rule)| rule)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One input item together with the classification attached to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    #[serde(flatten)]
    pub item: LedgerItem,
    /// Id of the rule that fired, absent for fallback classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_matched: Option<String>,
}

/// Count and amount total for one category
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub count: usize,
    pub total: f64,
}

/// Output of a classification run
///
/// Every input item appears in exactly one category or in `unmatched_items`;
/// nothing is dropped, nothing is double-counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Category path to the items assigned there
    pub classified: BTreeMap<String, Vec<ClassifiedItem>>,
    /// Items no rule or fallback could place
    pub unmatched_items: Vec<LedgerItem>,
    /// Per-category count and amount total
    pub totals: BTreeMap<String, CategoryTotal>,
    /// False when the engine ran on built-in fallback rules only
    pub rulebook_used: bool,
    /// Degradation notes accumulated during the run
    pub flags: Vec<String>,
}

impl ClassificationResult {
    fn new(rulebook_used: bool) -> Self {
        Self {
            classified: BTreeMap::new(),
            unmatched_items: Vec::new(),
            totals: BTreeMap::new(),
            rulebook_used,
            flags: Vec::new(),
        }
    }

    fn push(&mut self, category: &str, item: &LedgerItem, rule_matched: Option<String>) {
        self.classified
            .entry(category.to_string())
            .or_default()
            .push(ClassifiedItem {
                item: item.clone(),
                rule_matched,
            });
        let total = self.totals.entry(category.to_string()).or_default();
        total.count += 1;
        total.total += item.amount;
    }

    /// Total items accounted for, across all categories plus unmatched.
    pub fn item_count(&self) -> usize {
        self.classified.values().map(Vec::len).sum::<usize>() + self.unmatched_items.len()
    }

    pub fn category_paths(&self) -> Vec<&str> {
        self.classified.keys().map(String::as_str).collect()
    }
}

/// Secondary keyword set deciding the current / non-current split when the
/// balance-type fallback fires.
const NON_CURRENT_KEYWORDS: &[&str] = &[
    "long term",
    "long-term",
    "loan",
    "debenture",
    "non-current",
    "non current",
];

const NON_CURRENT_ASSET_KEYWORDS: &[&str] = &[
    "ppe",
    "property",
    "plant",
    "equipment",
    "machinery",
    "building",
    "furniture",
    "intangible",
];

/// Deterministic fallback when no rule matched: credit balances become
/// liabilities, debit balances become assets, with the current/non-current
/// split decided by a secondary keyword scan. Items without a balance type
/// stay unclassified.
pub(crate) fn fallback_category(search_key: &str, balance_type: Option<BalanceType>) -> Option<&'static str> {
    let non_current = NON_CURRENT_KEYWORDS.iter().any(|kw| search_key.contains(kw));
    match balance_type? {
        BalanceType::Credit => Some(if non_current {
            "non_current_liabilities/long_term_borrowings"
        } else {
            "current_liabilities/other_current_liabilities"
        }),
        BalanceType::Debit => {
            let non_current_asset = non_current
                || NON_CURRENT_ASSET_KEYWORDS
                    .iter()
                    .any(|kw| search_key.contains(kw));
            Some(if non_current_asset {
                "non_current_assets/other_non_current_assets"
            } else {
                "current_assets/other_current_assets"
            })
        }
    }
}
