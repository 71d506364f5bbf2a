//! # Rulebook Engine
//!
//! A rule-driven classification and reconciliation core for accounting
//! transactions: ledger entries, invoices, and bank statements are classified
//! against a configurable YAML rulebook and paired under tolerance-based
//! fuzzy matching.
//!
//! ## Features
//!
//! - **Input normalization**: canonical types, ISO dates, trimmed strings,
//!   null stripping over arbitrarily nested values
//! - **Schedule III classification**: priority-ordered keyword rules with a
//!   deterministic balance-type fallback
//! - **TDS section classification**: rate and threshold application per
//!   section (194J/194C/194I/194H/194Q)
//! - **GST ITC eligibility**: allowed/blocked/conditional under the
//!   Section 17(5) blocking rules
//! - **Bank reconciliation**: greedy scored matching with amount, date, text,
//!   and reference signals plus tolerance windows
//! - **Fractal envelopes**: fixed micro/meso/macro result wrapper with a
//!   deterministic audit capsule and structural invariant checks
//!
//! ## Quick Start
//!
//! ```rust
//! use rulebook_engine::{Rulebook, Schedule3Classifier, LedgerItem, BalanceType};
//!
//! let rulebook = Rulebook::empty(); // falls back to built-in rules
//! let classifier = Schedule3Classifier::new(&rulebook);
//! let items = vec![
//!     LedgerItem::new("Unsecured Loan from Director", 400000.0)
//!         .with_balance_type(BalanceType::Credit),
//! ];
//! let result = classifier.classify(&items);
//! assert_eq!(result.item_count(), 1);
//! ```
//!
//! All engines are pure functions of their inputs plus the read-only
//! rulebook; there is no shared mutable state, so concurrent requests need no
//! coordination.

pub mod classify;
pub mod envelope;
pub mod normalize;
pub mod reconcile;
pub mod rulebook;
pub mod types;

// Re-export commonly used types
pub use classify::{
    CategoryTotal, ClassificationResult, ClassifiedItem, ItcAssessment, ItcClassifier,
    ItcEligibility, PriorityMatcher, RuleTier, Schedule3Classifier, TaggedEntry, TdsAssessment,
    TdsClassifier,
};
pub use envelope::invariants::{self, InvariantCheck, InvariantReport};
pub use envelope::{classification_envelope, reconciliation_envelope, Envelope, ENGINE_VERSION};
pub use normalize::{normalize, parse_date, NormalizationError};
pub use reconcile::{
    analyze_unmatched, MatcherSettings, ReconciliationMatcher, ReconciliationResult, SideAnalysis,
    UnmatchedAnalysis,
};
pub use rulebook::{MappingRule, RuleSection, Rulebook, RulebookError};
pub use types::{
    BalanceType, Confidence, EngineError, EngineResult, LedgerItem, MatchCandidate,
    TransactionEntry,
};
