//! GST input tax credit (ITC) eligibility classification
//!
//! Classifies invoice lines as allowed, blocked, or conditional under the
//! Section 17(5) blocking rules carried in the rulebook.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::rulebook::{MappingRule, RuleSection, Rulebook};

/// Rulebook section consulted for ITC eligibility rules
pub const SECTION_NAME: &str = "gst_itc_engine";

/// ITC eligibility outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItcEligibility {
    Allowed,
    Blocked,
    Conditional,
}

/// Eligibility decision for a single invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItcAssessment {
    pub classification: ItcEligibility,
    /// Rule text explaining a blocked or conditional decision, empty when
    /// allowed
    pub reason: String,
    pub amount: f64,
    pub description: String,
}

/// Classifies invoice descriptions against the ITC blocking rules
///
/// Blocked rules are evaluated before conditional rules so that an invoice
/// mentioning both ("partial use of motor vehicle") is blocked, not merely
/// conditional. Anything no rule touches is allowed.
#[derive(Debug, Clone)]
pub struct ItcClassifier {
    blocked: Vec<MappingRule>,
    conditional: Vec<MappingRule>,
    rulebook_used: bool,
}

impl ItcClassifier {
    pub fn new(rulebook: &Rulebook) -> Self {
        let section = rulebook.get_section(SECTION_NAME);
        if section.is_empty() {
            warn!(section = SECTION_NAME, "rule section empty, using built-in fallback rules");
            Self::from_section(RuleSection::gst_itc_fallback(), false)
        } else {
            Self::from_section(section, true)
        }
    }

    pub fn from_section(section: RuleSection, rulebook_used: bool) -> Self {
        let (blocked, conditional): (Vec<_>, Vec<_>) = section
            .rules
            .into_iter()
            .filter(|r| r.target == "blocked" || r.target == "conditional")
            .partition(|r| r.target == "blocked");
        Self {
            blocked,
            conditional,
            rulebook_used,
        }
    }

    pub fn rulebook_used(&self) -> bool {
        self.rulebook_used
    }

    pub fn classify(&self, description: &str, amount: f64) -> ItcAssessment {
        let search_key = description.to_lowercase();

        let decided = self
            .blocked
            .iter()
            .find(|r| r.matches(&search_key))
            .map(|r| (ItcEligibility::Blocked, r))
            .or_else(|| {
                self.conditional
                    .iter()
                    .find(|r| r.matches(&search_key))
                    .map(|r| (ItcEligibility::Conditional, r))
            });

        match decided {
            Some((classification, rule)) => ItcAssessment {
                classification,
                reason: rule
                    .note
                    .clone()
                    .unwrap_or_else(|| format!("matched rule '{}'", rule.id)),
                amount,
                description: description.to_string(),
            },
            None => ItcAssessment {
                classification: ItcEligibility::Allowed,
                reason: String::new(),
                amount,
                description: description.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ItcClassifier {
        ItcClassifier::from_section(RuleSection::gst_itc_fallback(), false)
    }

    #[test]
    fn test_motor_vehicle_blocked() {
        let a = classifier().classify("Motor vehicle purchase for office", 800000.0);
        assert_eq!(a.classification, ItcEligibility::Blocked);
        assert!(a.reason.contains("17(5)"));
    }

    #[test]
    fn test_mixed_use_conditional() {
        let a = classifier().classify("Mixed use generator fuel", 5000.0);
        assert_eq!(a.classification, ItcEligibility::Conditional);
        assert!(a.reason.to_lowercase().contains("proportionate"));
    }

    #[test]
    fn test_blocked_wins_over_conditional() {
        let a = classifier().classify("Partial personal use of car", 20000.0);
        assert_eq!(a.classification, ItcEligibility::Blocked);
    }

    #[test]
    fn test_ordinary_input_allowed() {
        let a = classifier().classify("Raw steel for fabrication", 100000.0);
        assert_eq!(a.classification, ItcEligibility::Allowed);
        assert!(a.reason.is_empty());
    }

    #[test]
    fn test_empty_section_allows_everything() {
        let classifier = ItcClassifier::from_section(RuleSection::empty(SECTION_NAME), false);
        let a = classifier.classify("club membership", 1000.0);
        assert_eq!(a.classification, ItcEligibility::Allowed);
    }
}
