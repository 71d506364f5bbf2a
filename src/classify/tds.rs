//! TDS section classification and deduction calculation
//!
//! Maps payment descriptions to TDS sections (194J, 194C, 194I, 194H, 194Q)
//! and applies each section's rate above its threshold.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::rulebook::{MappingRule, RuleSection, Rulebook};
use crate::types::LedgerItem;

/// Rulebook section consulted for TDS rates and thresholds
pub const SECTION_NAME: &str = "tds_sections";

/// Section applied when no keyword rule matches a payment description
const DEFAULT_SECTION: &str = "194C";

/// TDS computation for a single payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdsAssessment {
    /// TDS section code, e.g. "194J"
    pub section: String,
    pub rate: f64,
    pub threshold: f64,
    pub gross_amount: f64,
    /// True when the gross amount crossed the section threshold
    pub threshold_exceeded: bool,
    /// `gross * rate` above the threshold, zero below it
    pub tds_amount: f64,
    /// Always `gross - tds`
    pub net_amount: f64,
    pub description: String,
}

/// A ledger entry with its TDS classification attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedEntry {
    #[serde(flatten)]
    pub item: LedgerItem,
    pub tds_section: String,
    pub tds_rate: f64,
    pub tds_applicable: bool,
    pub tds_amount: f64,
}

/// Classifies payments into TDS sections and computes deductions
#[derive(Debug, Clone)]
pub struct TdsClassifier {
    section: RuleSection,
    rulebook_used: bool,
}

impl TdsClassifier {
    pub fn new(rulebook: &Rulebook) -> Self {
        let section = rulebook.get_section(SECTION_NAME);
        if section.is_empty() {
            warn!(section = SECTION_NAME, "rule section empty, using built-in fallback rules");
            Self::from_section(RuleSection::tds_fallback(), false)
        } else {
            Self::from_section(section, true)
        }
    }

    pub fn from_section(section: RuleSection, rulebook_used: bool) -> Self {
        Self {
            section,
            rulebook_used,
        }
    }

    pub fn rulebook_used(&self) -> bool {
        self.rulebook_used
    }

    /// Detect the TDS section for a payment description and compute the
    /// deduction. Falls back to 194C when no keyword matches, mirroring the
    /// treatment of unclassified contract payments.
    pub fn classify_section(&self, description: &str, amount: f64) -> TdsAssessment {
        let search_key = description.to_lowercase();

        let rule = self
            .section
            .first_match(&search_key)
            .or_else(|| self.default_rule());

        let (section, rate, threshold) = match rule {
            Some(rule) => (
                rule.target.clone(),
                rule.rate.unwrap_or(0.0),
                rule.threshold.unwrap_or(f64::INFINITY),
            ),
            // No rules at all: no deduction can be determined.
            None => (DEFAULT_SECTION.to_string(), 0.0, f64::INFINITY),
        };

        let threshold_exceeded = amount > threshold;
        let tds_amount = if threshold_exceeded { amount * rate } else { 0.0 };

        TdsAssessment {
            section,
            rate,
            threshold,
            gross_amount: amount,
            threshold_exceeded,
            tds_amount,
            net_amount: amount - tds_amount,
            description: description.to_string(),
        }
    }

    /// Tag a batch of ledger entries with their TDS section and deduction.
    pub fn tag_entries(&self, entries: &[LedgerItem]) -> Vec<TaggedEntry> {
        entries
            .iter()
            .map(|item| {
                let assessment = self.classify_section(&item.ledger, item.amount);
                TaggedEntry {
                    item: item.clone(),
                    tds_section: assessment.section,
                    tds_rate: assessment.rate,
                    tds_applicable: assessment.threshold_exceeded,
                    tds_amount: assessment.tds_amount,
                }
            })
            .collect()
    }

    fn default_rule(&self) -> Option<&MappingRule> {
        self.section
            .rules
            .iter()
            .find(|r| r.target == DEFAULT_SECTION)
    }
}
