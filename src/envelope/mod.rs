//! The micro/meso/macro result envelope and its audit capsule
//!
//! Every engine's output leaves the pipeline wrapped in a fixed three-tier
//! envelope: micro holds the full detail, meso the intermediate aggregates,
//! macro the headline summary. All three keys are always present and
//! non-null — an engine that produced nothing still yields empty containers,
//! never an omission. A deterministic SHA-256 capsule over the serialized
//! content gives audit traceability.

pub mod invariants;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::classify::ClassificationResult;
use crate::reconcile::{MatcherSettings, ReconciliationResult};
use crate::types::{LedgerItem, TransactionEntry};

/// Version string folded into the capsule hash
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed three-level result wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub micro: Value,
    pub meso: Value,
    pub r#macro: Value,
}

impl Envelope {
    /// Build an envelope, normalizing null tiers to empty objects so the
    /// three-keys-non-null invariant holds by construction.
    pub fn new(micro: Value, meso: Value, r#macro: Value) -> Self {
        let denull = |v: Value| if v.is_null() { json!({}) } else { v };
        Self {
            micro: denull(micro),
            meso: denull(meso),
            r#macro: denull(r#macro),
        }
    }

    /// Fractal expansion of bare data: the data becomes the micro tier
    /// unchanged, with structural placeholders above it.
    pub fn wrap(micro: Value) -> Self {
        let data_keys: Vec<String> = match &micro {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };
        Self::new(
            micro,
            json!({ "data_keys": data_keys }),
            json!({ "summary": {} }),
        )
    }

    /// Deterministic content hash over the canonical serialization of the
    /// envelope. `serde_json` maps are key-sorted, so equal content always
    /// hashes equally regardless of construction order.
    pub fn capsule(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ENGINE_VERSION.as_bytes());
        hasher.update(b"\n");
        hasher.update(serde_json::to_string(self).unwrap_or_default().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

fn value_of<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

/// Assemble the envelope for a classification run. The micro tier carries
/// the raw input items alongside the classification detail.
pub fn classification_envelope(items: &[LedgerItem], result: &ClassificationResult) -> Envelope {
    let total_items = result.item_count();
    let classified_items = total_items - result.unmatched_items.len();

    let classification_summary: Value = result
        .totals
        .iter()
        .map(|(path, t)| (path.clone(), json!({ "count": t.count, "total": t.total })))
        .collect::<serde_json::Map<String, Value>>()
        .into();

    Envelope::new(
        json!({
            "items": value_of(&items),
            "classified": value_of(&result.classified),
            "unmatched_items": value_of(&result.unmatched_items),
        }),
        json!({
            "classification_summary": classification_summary,
            "unmatched_count": result.unmatched_items.len(),
            "rulebook_used": result.rulebook_used,
            "flags": result.flags,
        }),
        json!({
            "summary": {
                "total_items": total_items,
                "classified_items": classified_items,
                "categories_found": result.category_paths(),
            },
            "flags": result.flags,
        }),
    )
}

/// Assemble the envelope for a reconciliation run. The micro tier carries
/// both raw input sides alongside the matching detail.
pub fn reconciliation_envelope(
    bank: &[TransactionEntry],
    books: &[TransactionEntry],
    result: &ReconciliationResult,
    settings: &MatcherSettings,
) -> Envelope {
    let (high, medium, low) = result.confidence_counts();
    let total_bank = result.matched.len() + result.unmatched_bank.len();
    let total_books = result.matched.len() + result.unmatched_books.len();

    Envelope::new(
        json!({
            "bank_entries": value_of(&bank),
            "books_entries": value_of(&books),
            "matched": value_of(&result.matched),
            "unmatched_bank": value_of(&result.unmatched_bank),
            "unmatched_books": value_of(&result.unmatched_books),
        }),
        json!({
            "matching_summary": {
                "match_count": result.matched.len(),
                "unmatched_bank_count": result.unmatched_bank.len(),
                "unmatched_books_count": result.unmatched_books.len(),
                "match_rate": result.match_rate,
            },
            "matching_parameters": value_of(settings),
            "confidence_distribution": { "high": high, "medium": medium, "low": low },
            "flags": result.flags,
        }),
        json!({
            "summary": {
                "total_bank_entries": total_bank,
                "total_books_entries": total_books,
                "matched_count": result.matched.len(),
                "reconciliation_status": if result.is_complete() { "complete" } else { "pending" },
                "match_rate": result.match_rate,
                "no_data": result.no_data,
            },
            "flags": result.flags,
        }),
    )
}
