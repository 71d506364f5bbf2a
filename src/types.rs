//! Core types and data structures shared across the classification and
//! reconciliation engines

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::NormalizationError;
use crate::rulebook::RulebookError;

/// Side of a ledger balance
///
/// Assets and expenses normally carry debit balances; liabilities, equity,
/// and income carry credit balances. The classification fallback relies on
/// this when no rule matches an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceType {
    Debit,
    Credit,
}

/// A single trial-balance / ledger line presented for classification
///
/// Items are read-only inputs: classification attaches results alongside the
/// item, it never rewrites the item itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerItem {
    /// Ledger account name as it appears in the books
    pub ledger: String,
    /// Closing amount for the line
    pub amount: f64,
    /// Debit or credit balance, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_type: Option<BalanceType>,
}

impl LedgerItem {
    pub fn new(ledger: impl Into<String>, amount: f64) -> Self {
        Self {
            ledger: ledger.into(),
            amount,
            balance_type: None,
        }
    }

    pub fn with_balance_type(mut self, balance_type: BalanceType) -> Self {
        self.balance_type = Some(balance_type);
        self
    }
}

/// One entry on either side of a reconciliation (bank statement or books)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl TransactionEntry {
    pub fn new(amount: f64, date: Option<NaiveDate>, description: impl Into<String>) -> Self {
        Self {
            amount,
            date,
            description: description.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Discretized match quality derived from the continuous score
///
/// The matcher never emits `Low` — pairs below the medium cutoff are not
/// matches at all. The variant stays so the confidence distribution keeps
/// all three buckets on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// A scored pairing of one bank entry with one books entry
///
/// Only the reconciliation matcher creates these; they are never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub bank_entry: TransactionEntry,
    pub book_entry: TransactionEntry,
    /// Combined weighted score in [0, 1]
    pub score: f64,
    pub confidence: Confidence,
    /// Which signals contributed to the score, for audit display
    pub reasons: Vec<String>,
    pub amount_diff: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_diff_days: Option<i64>,
}

/// Errors surfaced by the engine core
///
/// Missing or empty input data is never an error at this level; engines
/// degrade to empty results with explicit flags instead. Only structurally
/// malformed input or configuration reaches this enum.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
    #[error(transparent)]
    Rulebook(#[from] RulebookError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
