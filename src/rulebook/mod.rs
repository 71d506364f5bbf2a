//! Rulebook loading and typed rule sections
//!
//! The rulebook is externally supplied YAML configuration mapping category
//! keys to keyword/parameter rules. It is loaded once, validated at the
//! boundary, and treated as read-only for the process lifetime; engines
//! receive it by shared reference and never mutate it.
//!
//! Expected shape:
//!
//! ```yaml
//! sections:
//!   schedule_iii_engine:
//!     unsecured_loan_from_director:
//!       keywords: ["unsecured loan", "director loan"]
//!       target: non_current_liabilities/long_term_borrowings
//!   tds_sections:
//!     section_194j:
//!       keywords: [professional, fees, legal]
//!       target: "194J"
//!       rate: 0.10
//!       threshold: 30000
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use tracing::warn;

/// Errors raised when the rulebook or one of its sections is malformed
///
/// These are always recoverable: callers substitute an empty section and
/// proceed with fallback-only logic rather than propagating further.
#[derive(Debug, thiserror::Error)]
pub enum RulebookError {
    #[error("failed to parse rulebook YAML: {0}")]
    Parse(String),
    #[error("invalid rule section '{name}': {reason}")]
    InvalidSection { name: String, reason: String },
}

/// One keyword rule within a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Category key the rule was registered under
    pub id: String,
    /// Case-insensitive trigger keywords; validated non-empty and lowercased
    /// at load time
    pub keywords: Vec<String>,
    /// Target category path, e.g. `non_current_liabilities/long_term_borrowings`
    pub target: String,
    /// Deduction rate for rate-bearing sections (TDS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    /// Amount threshold below which the rate does not apply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Free-text rule annotation, surfaced as the reason on assessments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MappingRule {
    pub fn new(id: impl Into<String>, keywords: &[&str], target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            target: target.into(),
            rate: None,
            threshold: None,
            note: None,
        }
    }

    pub fn with_rate(mut self, rate: f64, threshold: f64) -> Self {
        self.rate = Some(rate);
        self.threshold = Some(threshold);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether any keyword occurs in the (already lowercased) search key.
    pub fn matches(&self, search_key: &str) -> bool {
        self.keywords.iter().any(|kw| search_key.contains(kw))
    }
}

/// A named, validated set of mapping rules
///
/// Category targets are unique within a section; keyword lists are lowercased
/// and non-empty. An empty section is the safe default when a name is absent
/// or the rulebook failed to load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleSection {
    pub name: String,
    pub rules: Vec<MappingRule>,
}

impl RuleSection {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule whose keywords occur in the search key, in declaration order.
    pub fn first_match(&self, search_key: &str) -> Option<&MappingRule> {
        self.rules.iter().find(|r| r.matches(search_key))
    }

    /// Built-in Schedule III mapping rules used when the rulebook is absent.
    pub fn schedule3_fallback() -> Self {
        Self {
            name: "schedule_iii_engine".to_string(),
            rules: vec![
                MappingRule::new(
                    "unsecured_loan_from_director",
                    &["unsecured loan", "director loan"],
                    "non_current_liabilities/long_term_borrowings",
                ),
                MappingRule::new(
                    "advances_from_customers",
                    &["advance from customer", "customer advance"],
                    "current_liabilities/other_current_liabilities",
                ),
                MappingRule::new(
                    "trade_payables",
                    &["trade payable", "creditor", "sundry creditor"],
                    "current_liabilities/trade_payables",
                ),
                MappingRule::new(
                    "share_capital",
                    &["share capital", "equity capital", "reserve", "surplus"],
                    "equity/share_capital",
                ),
                MappingRule::new(
                    "furniture_and_fixtures",
                    &["furniture", "fixtures"],
                    "non_current_assets/ppe",
                ),
                MappingRule::new(
                    "trade_receivables",
                    &["receivable", "debtor", "sundry debtor"],
                    "current_assets/trade_receivables",
                ),
                MappingRule::new(
                    "inventory",
                    &["inventory", "stock"],
                    "current_assets/inventory",
                ),
                MappingRule::new(
                    "cash_in_hand",
                    &["cash", "bank balance"],
                    "current_assets/cash_and_cash_equivalents",
                ),
            ],
        }
    }

    /// Built-in TDS section rules (rates and annual thresholds).
    pub fn tds_fallback() -> Self {
        Self {
            name: "tds_sections".to_string(),
            rules: vec![
                MappingRule::new(
                    "section_194j",
                    &["professional", "fees", "ca", "legal", "medical", "engineering"],
                    "194J",
                )
                .with_rate(0.10, 30000.0),
                MappingRule::new(
                    "section_194c",
                    &["contract", "contractor", "work", "labour"],
                    "194C",
                )
                .with_rate(0.02, 100000.0),
                MappingRule::new("section_194i", &["rent", "rental", "lease"], "194I")
                    .with_rate(0.10, 240000.0),
                MappingRule::new("section_194h", &["commission", "brokerage"], "194H")
                    .with_rate(0.05, 15000.0),
                MappingRule::new("section_194q", &["purchase", "goods", "material"], "194Q")
                    .with_rate(0.01, 5000000.0),
            ],
        }
    }

    /// Built-in GST ITC eligibility rules under Section 17(5).
    pub fn gst_itc_fallback() -> Self {
        Self {
            name: "gst_itc_engine".to_string(),
            rules: vec![
                MappingRule::new("motor_vehicles", &["motor vehicle", "car"], "blocked")
                    .with_note("ITC on motor vehicles blocked under Section 17(5)"),
                MappingRule::new("food_beverages", &["food", "beverage", "catering"], "blocked")
                    .with_note("ITC on food and beverages blocked under Section 17(5)"),
                MappingRule::new("club_membership", &["club", "membership"], "blocked")
                    .with_note("ITC on club membership always blocked"),
                MappingRule::new("personal_consumption", &["personal"], "blocked")
                    .with_note("ITC on personal consumption blocked"),
                MappingRule::new("mixed_use", &["mixed", "partial"], "conditional")
                    .with_note("Proportionate ITC allowed for mixed business/personal use"),
            ],
        }
    }
}

/// The loaded rulebook: named sections of validated rules
///
/// Constructed once, then shared by reference into every classifier. There is
/// no ambient global; tests substitute fixture sections by building their own
/// instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rulebook {
    sections: BTreeMap<String, RuleSection>,
}

impl Rulebook {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a rulebook from already-validated sections (test fixtures).
    pub fn from_sections(sections: impl IntoIterator<Item = RuleSection>) -> Self {
        Self {
            sections: sections
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
        }
    }

    /// Strict parse of rulebook YAML.
    ///
    /// Markdown code fences around the document are tolerated and stripped,
    /// since exported rulebooks frequently arrive wrapped that way.
    pub fn from_yaml_str(content: &str) -> Result<Self, RulebookError> {
        let cleaned = strip_code_fences(content);
        let doc: YamlValue =
            serde_yaml::from_str(cleaned).map_err(|e| RulebookError::Parse(e.to_string()))?;

        let sections_value = match &doc {
            YamlValue::Mapping(map) => map
                .get("sections")
                .cloned()
                .unwrap_or(YamlValue::Mapping(Default::default())),
            YamlValue::Null => YamlValue::Mapping(Default::default()),
            _ => {
                return Err(RulebookError::Parse(
                    "rulebook document must be a mapping".to_string(),
                ))
            }
        };

        let mut sections = BTreeMap::new();
        if let YamlValue::Mapping(map) = sections_value {
            for (key, value) in map {
                let name = yaml_key_to_string(&key);
                match parse_section(&name, &value) {
                    Ok(section) => {
                        sections.insert(name, section);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(Self { sections })
    }

    /// Tolerant load from disk: a missing file, unreadable content, or a
    /// malformed document degrades to an empty rulebook with a warning, so
    /// engines fall back to their built-in rules instead of failing the
    /// process.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rulebook file not readable, using empty rulebook");
                return Self::empty();
            }
        };
        match Self::from_yaml_str(&content) {
            Ok(rulebook) => rulebook,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rulebook failed to parse, using empty rulebook");
                Self::empty()
            }
        }
    }

    /// Look up a section by name. Absent sections yield an empty section,
    /// never an error — downstream flags (`rulebook_used`) record that the
    /// engine ran on fallback rules.
    pub fn get_section(&self, name: &str) -> RuleSection {
        match self.sections.get(name) {
            Some(section) => section.clone(),
            None => RuleSection::empty(name),
        }
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(|s| s.as_str())
    }
}

/// Coerce any YAML key to a trimmed string. Non-string keys (numbers, bools)
/// are normalized here so classification logic never sees them.
fn yaml_key_to_string(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.trim().to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

fn parse_section(name: &str, value: &YamlValue) -> Result<RuleSection, RulebookError> {
    let map = match value {
        YamlValue::Mapping(map) => map,
        YamlValue::Null => return Ok(RuleSection::empty(name)),
        _ => {
            return Err(RulebookError::InvalidSection {
                name: name.to_string(),
                reason: "section value must be a mapping".to_string(),
            })
        }
    };

    let mut rules = Vec::new();
    let mut seen_targets = BTreeSet::new();

    for (key, rule_value) in map {
        let id = yaml_key_to_string(key);
        let rule = parse_rule(name, &id, rule_value)?;
        if !seen_targets.insert(rule.target.clone()) {
            return Err(RulebookError::InvalidSection {
                name: name.to_string(),
                reason: format!("duplicate category target '{}'", rule.target),
            });
        }
        rules.push(rule);
    }

    Ok(RuleSection {
        name: name.to_string(),
        rules,
    })
}

fn parse_rule(section: &str, id: &str, value: &YamlValue) -> Result<MappingRule, RulebookError> {
    let invalid = |reason: String| RulebookError::InvalidSection {
        name: section.to_string(),
        reason,
    };

    let map = match value {
        YamlValue::Mapping(map) => map,
        _ => return Err(invalid(format!("rule '{id}' must be a mapping"))),
    };

    let get = |field: &str| map.get(field);

    let keywords: Vec<String> = match get("keywords") {
        Some(YamlValue::Sequence(seq)) => seq
            .iter()
            .map(|v| yaml_key_to_string(v).to_lowercase())
            .filter(|k| !k.is_empty())
            .collect(),
        Some(_) => return Err(invalid(format!("rule '{id}' keywords must be a sequence"))),
        None => Vec::new(),
    };
    if keywords.is_empty() {
        return Err(invalid(format!("rule '{id}' has no keywords")));
    }

    let target = match get("target") {
        Some(YamlValue::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(invalid(format!("rule '{id}' has no target category path"))),
    };

    let as_f64 = |field: &str| -> Result<Option<f64>, RulebookError> {
        match get(field) {
            Some(YamlValue::Number(n)) => Ok(n.as_f64()),
            Some(_) => Err(invalid(format!("rule '{id}' field '{field}' must be numeric"))),
            None => Ok(None),
        }
    };

    let note = match get("note") {
        Some(YamlValue::String(s)) => Some(s.trim().to_string()),
        _ => None,
    };

    Ok(MappingRule {
        id: id.to_string(),
        keywords,
        target,
        rate: as_f64("rate")?,
        threshold: as_f64("threshold")?,
        note,
    })
}

/// Strip leading/trailing markdown code fences from exported YAML.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return content;
    }
    let without_open = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return content,
    };
    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
sections:
  schedule_iii_engine:
    unsecured_loan_from_director:
      keywords: ["unsecured loan", "director loan"]
      target: non_current_liabilities/long_term_borrowings
    cash_in_hand:
      keywords: [cash, "cash in hand"]
      target: current_assets/cash_and_cash_equivalents
  tds_sections:
    section_194j:
      keywords: [professional, fees]
      target: "194J"
      rate: 0.10
      threshold: 30000
"#;

    #[test]
    fn test_parse_sample_rulebook() {
        let rulebook = Rulebook::from_yaml_str(SAMPLE).unwrap();
        let section = rulebook.get_section("schedule_iii_engine");
        assert_eq!(section.rules.len(), 2);
        assert_eq!(
            section.rules[0].target,
            "non_current_liabilities/long_term_borrowings"
        );

        let tds = rulebook.get_section("tds_sections");
        assert_eq!(tds.rules[0].rate, Some(0.10));
        assert_eq!(tds.rules[0].threshold, Some(30000.0));
    }

    #[test]
    fn test_missing_section_is_empty_not_error() {
        let rulebook = Rulebook::from_yaml_str(SAMPLE).unwrap();
        let section = rulebook.get_section("no_such_section");
        assert!(section.is_empty());
        assert_eq!(section.name, "no_such_section");
    }

    #[test]
    fn test_code_fences_stripped() {
        let fenced = format!("```yaml\n{SAMPLE}\n```");
        let rulebook = Rulebook::from_yaml_str(&fenced).unwrap();
        assert!(rulebook.has_section("tds_sections"));
    }

    #[test]
    fn test_keywords_lowercased() {
        let yaml = r#"
sections:
  s:
    r:
      keywords: ["Trade Payable", "CREDITOR"]
      target: current_liabilities/trade_payables
"#;
        let rulebook = Rulebook::from_yaml_str(yaml).unwrap();
        let rule = &rulebook.get_section("s").rules[0];
        assert_eq!(rule.keywords, vec!["trade payable", "creditor"]);
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let yaml = r#"
sections:
  s:
    a:
      keywords: [x]
      target: same/path
    b:
      keywords: [y]
      target: same/path
"#;
        let err = Rulebook::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, RulebookError::InvalidSection { .. }));
    }

    #[test]
    fn test_empty_keywords_rejected() {
        let yaml = r#"
sections:
  s:
    a:
      keywords: []
      target: some/path
"#;
        assert!(Rulebook::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_non_mapping_section_rejected() {
        let yaml = "sections:\n  s: [1, 2, 3]\n";
        let err = Rulebook::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, RulebookError::InvalidSection { .. }));
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let rulebook = Rulebook::from_path("/nonexistent/rulebook.yaml");
        assert!(rulebook.get_section("schedule_iii_engine").is_empty());
    }

    #[test]
    fn test_first_match_declaration_order() {
        let section = RuleSection::schedule3_fallback();
        let rule = section.first_match("unsecured loan from director").unwrap();
        assert_eq!(rule.target, "non_current_liabilities/long_term_borrowings");
    }
}
