//! Structural invariant checks on assembled envelopes
//!
//! Four fixed checks run before a result leaves the pipeline. The validator
//! reports, it never fails: a broken invariant is surfaced to the caller as a
//! degraded-but-returned response, never as an error of the whole request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Envelope;

/// One pass/fail check with its human-readable explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantCheck {
    pub passed: bool,
    pub message: String,
}

impl InvariantCheck {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

/// Report over the four structural invariants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantReport {
    /// IC1: the micro tier exists and is non-null
    pub ic1: InvariantCheck,
    /// IC2: micro, meso, and macro all exist and are non-null
    pub ic2: InvariantCheck,
    /// IC3: no mapping key anywhere in the envelope is an empty string
    pub ic3: InvariantCheck,
    /// IC4: every leaf value carries a representable type
    pub ic4: InvariantCheck,
}

impl InvariantReport {
    pub fn all_passed(&self) -> bool {
        self.ic1.passed && self.ic2.passed && self.ic3.passed && self.ic4.passed
    }

    pub fn failures(&self) -> Vec<&InvariantCheck> {
        [&self.ic1, &self.ic2, &self.ic3, &self.ic4]
            .into_iter()
            .filter(|c| !c.passed)
            .collect()
    }
}

/// Run all four invariant checks over an envelope.
pub fn check(envelope: &Envelope) -> InvariantReport {
    let ic1 = if envelope.micro.is_null() {
        InvariantCheck::fail("micro tier is null")
    } else {
        InvariantCheck::pass("micro tier exists")
    };

    let tiers = [
        ("micro", &envelope.micro),
        ("meso", &envelope.meso),
        ("macro", &envelope.r#macro),
    ];
    let null_tiers: Vec<&str> = tiers
        .iter()
        .filter(|(_, v)| v.is_null())
        .map(|(name, _)| *name)
        .collect();
    let ic2 = if null_tiers.is_empty() {
        InvariantCheck::pass("all tiers (micro/meso/macro) exist")
    } else {
        InvariantCheck::fail(format!("null tiers: {}", null_tiers.join(", ")))
    };

    let mut empty_key_paths = Vec::new();
    for (name, value) in &tiers {
        find_empty_keys(value, name, &mut empty_key_paths);
    }
    let ic3 = if empty_key_paths.is_empty() {
        InvariantCheck::pass("no empty mapping keys")
    } else {
        InvariantCheck::fail(format!("empty keys at: {}", empty_key_paths.join(", ")))
    };

    let mut bad_leaf_paths = Vec::new();
    for (name, value) in &tiers {
        find_invalid_leaves(value, name, &mut bad_leaf_paths);
    }
    let ic4 = if bad_leaf_paths.is_empty() {
        InvariantCheck::pass("all leaf value types valid")
    } else {
        InvariantCheck::fail(format!("invalid leaves at: {}", bad_leaf_paths.join(", ")))
    };

    InvariantReport { ic1, ic2, ic3, ic4 }
}

fn find_empty_keys(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key.is_empty() {
                    out.push(format!("{path}/<empty>"));
                }
                find_empty_keys(child, &format!("{path}/{key}"), out);
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                find_empty_keys(item, &format!("{path}[{idx}]"), out);
            }
        }
        _ => {}
    }
}

fn find_invalid_leaves(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                find_invalid_leaves(child, &format!("{path}/{key}"), out);
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                find_invalid_leaves(item, &format!("{path}[{idx}]"), out);
            }
        }
        Value::Number(n) => {
            // serde_json numbers are already finite; an unrepresentable f64
            // shows up as a missing conversion.
            if n.as_f64().map(|f| !f.is_finite()).unwrap_or(false) {
                out.push(path.to_string());
            }
        }
        Value::String(_) | Value::Bool(_) | Value::Null => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_envelope_passes() {
        let env = Envelope::new(
            json!({"items": []}),
            json!({"summary": {"count": 0}}),
            json!({"flags": []}),
        );
        let report = check(&env);
        assert!(report.all_passed());
        assert!(report.failures().is_empty());
    }

    #[test]
    fn test_degenerate_empty_envelope_passes() {
        // Empty containers are the degenerate form, not a violation.
        let env = Envelope::new(json!({}), json!({}), json!({}));
        assert!(check(&env).all_passed());
    }

    #[test]
    fn test_empty_key_detected() {
        let env = Envelope::new(json!({"": 1}), json!({}), json!({}));
        let report = check(&env);
        assert!(!report.ic3.passed);
        assert!(report.ic3.message.contains("micro"));
        // The other checks still pass; the report is per-check.
        assert!(report.ic1.passed);
        assert!(report.ic2.passed);
    }

    #[test]
    fn test_nested_empty_key_detected() {
        let env = Envelope::new(json!({"a": [{"": true}]}), json!({}), json!({}));
        assert!(!check(&env).ic3.passed);
    }

    #[test]
    fn test_null_tier_fails_ic1_and_ic2() {
        // Envelope::new normalizes nulls away, so build the struct directly.
        let env = Envelope {
            micro: Value::Null,
            meso: json!({}),
            r#macro: json!({}),
        };
        let report = check(&env);
        assert!(!report.ic1.passed);
        assert!(!report.ic2.passed);
        assert_eq!(report.failures().len(), 2);
    }
}
