//! Bank-vs-books reconciliation matcher
//!
//! Pairs entries from a bank statement against book entries using combined
//! textual, date, and amount similarity. Candidates are generated over the
//! full cross-product, scored with a weighted sum, bucketed by confidence,
//! and assigned greedily by descending score. Greedy maximum-score matching
//! is documented behavior here, not optimal bipartite matching: ties break by
//! original list order and later candidates touching a consumed entry are
//! discarded without re-evaluation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Confidence, MatchCandidate, TransactionEntry};

/// Score weights. Amount and date outweigh description because description
/// text is the least reliable signal in bank statements.
const WEIGHT_AMOUNT: f64 = 0.4;
const WEIGHT_DATE: f64 = 0.3;
const WEIGHT_DESCRIPTION: f64 = 0.2;
const WEIGHT_REFERENCE: f64 = 0.1;
const WEIGHT_PARTIAL_DESCRIPTION: f64 = 0.1;

/// Confidence bucket boundaries. Below the medium cutoff a pair is not a
/// match at all.
const HIGH_CUTOFF: f64 = 0.85;
const MEDIUM_CUTOFF: f64 = 0.6;

/// Tolerance windows and feature switches for the matcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSettings {
    /// Minimum description similarity to count as a textual signal
    pub fuzzy_threshold: f64,
    /// Absolute currency tolerance for amount equality
    pub amount_tolerance: f64,
    /// Days of deviation still treated as a full date match
    pub date_tolerance_days: i64,
    /// Recognize a bank debit equal in magnitude to a book credit as a full
    /// amount match
    pub enable_sign_reversal: bool,
    /// Grant partial textual credit when descriptions share two or more
    /// significant words
    pub enable_partial_match: bool,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.6,
            amount_tolerance: 0.01,
            date_tolerance_days: 7,
            enable_sign_reversal: true,
            enable_partial_match: true,
        }
    }
}

/// Outcome of one reconciliation run
///
/// Every input entry appears in exactly one of matched (on its side),
/// `unmatched_bank`, or `unmatched_books`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub matched: Vec<MatchCandidate>,
    pub unmatched_bank: Vec<TransactionEntry>,
    pub unmatched_books: Vec<TransactionEntry>,
    /// Matched fraction of the bank side, 0.0 when the bank side is empty
    pub match_rate: f64,
    /// True when both input lists were empty
    pub no_data: bool,
    /// Degradation notes (empty sides, etc.)
    pub flags: Vec<String>,
}

impl ReconciliationResult {
    /// Count of matches per confidence bucket (high, medium, low).
    pub fn confidence_counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for m in &self.matched {
            match m.confidence {
                Confidence::High => counts.0 += 1,
                Confidence::Medium => counts.1 += 1,
                Confidence::Low => counts.2 += 1,
            }
        }
        counts
    }

    pub fn is_complete(&self) -> bool {
        self.unmatched_bank.is_empty() && self.unmatched_books.is_empty()
    }
}

/// The tolerance-based matcher. Stateless: each call is a pure function of
/// the two entry lists and the settings.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationMatcher {
    settings: MatcherSettings,
}

/// Scored pair prior to assignment, indexed into the input slices
struct ScoredPair {
    bank_idx: usize,
    book_idx: usize,
    score: f64,
    confidence: Confidence,
    reasons: Vec<String>,
    amount_diff: f64,
    date_diff_days: Option<i64>,
}

impl ReconciliationMatcher {
    pub fn new(settings: MatcherSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MatcherSettings {
        &self.settings
    }

    /// Pair bank entries against book entries.
    ///
    /// Never fails on missing data: two empty lists produce an empty result
    /// with `no_data` set; one empty side reports everything on the other
    /// side as unmatched.
    pub fn match_entries(
        &self,
        bank: &[TransactionEntry],
        books: &[TransactionEntry],
    ) -> ReconciliationResult {
        let mut flags = Vec::new();
        if bank.is_empty() {
            flags.push("bank entries empty - nothing to match on the bank side".to_string());
        }
        if books.is_empty() {
            flags.push("book entries empty - nothing to match on the books side".to_string());
        }
        let no_data = bank.is_empty() && books.is_empty();

        // Candidate generation over the cross-product, bank-major so the
        // stable sort below breaks score ties by original list order.
        let mut candidates: Vec<ScoredPair> = Vec::new();
        for (bank_idx, bank_entry) in bank.iter().enumerate() {
            for (book_idx, book_entry) in books.iter().enumerate() {
                if let Some(pair) = self.score_pair(bank_idx, bank_entry, book_idx, book_entry) {
                    candidates.push(pair);
                }
            }
        }
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        // Greedy assignment with index-based consumed sets; the inputs are
        // never touched.
        let mut bank_consumed = vec![false; bank.len()];
        let mut book_consumed = vec![false; books.len()];
        let mut matched = Vec::new();

        for pair in candidates {
            if bank_consumed[pair.bank_idx] || book_consumed[pair.book_idx] {
                continue;
            }
            bank_consumed[pair.bank_idx] = true;
            book_consumed[pair.book_idx] = true;
            debug!(
                score = pair.score,
                bank = pair.bank_idx,
                book = pair.book_idx,
                "accepted match"
            );
            matched.push(MatchCandidate {
                bank_entry: bank[pair.bank_idx].clone(),
                book_entry: books[pair.book_idx].clone(),
                score: pair.score,
                confidence: pair.confidence,
                reasons: pair.reasons,
                amount_diff: pair.amount_diff,
                date_diff_days: pair.date_diff_days,
            });
        }

        let unmatched_bank: Vec<TransactionEntry> = bank
            .iter()
            .zip(&bank_consumed)
            .filter(|(_, consumed)| !**consumed)
            .map(|(e, _)| e.clone())
            .collect();
        let unmatched_books: Vec<TransactionEntry> = books
            .iter()
            .zip(&book_consumed)
            .filter(|(_, consumed)| !**consumed)
            .map(|(e, _)| e.clone())
            .collect();

        let match_rate = if bank.is_empty() {
            0.0
        } else {
            matched.len() as f64 / bank.len() as f64
        };

        ReconciliationResult {
            matched,
            unmatched_bank,
            unmatched_books,
            match_rate,
            no_data,
            flags,
        }
    }

    /// Score one bank/book pair. Returns None when the pair is not a match:
    /// either the amounts disagree beyond tolerance (amount is a hard gate)
    /// or the combined score falls below the medium cutoff.
    fn score_pair(
        &self,
        bank_idx: usize,
        bank_entry: &TransactionEntry,
        book_idx: usize,
        book_entry: &TransactionEntry,
    ) -> Option<ScoredPair> {
        let s = &self.settings;
        let mut score = 0.0;
        let mut reasons = Vec::new();

        // Amount: exact within tolerance, or exact sign reversal.
        let direct_diff = (bank_entry.amount - book_entry.amount).abs();
        let reversed_diff = (bank_entry.amount + book_entry.amount).abs();
        let amount_diff;
        if direct_diff <= s.amount_tolerance {
            amount_diff = direct_diff;
            score += WEIGHT_AMOUNT;
            reasons.push("amount_exact".to_string());
        } else if s.enable_sign_reversal && reversed_diff <= s.amount_tolerance {
            amount_diff = reversed_diff;
            score += WEIGHT_AMOUNT;
            reasons.push("amount_sign_reversed".to_string());
        } else {
            return None;
        }

        // Date: full inside the tolerance window, linear decay to zero at
        // twice the window.
        let date_diff_days = match (bank_entry.date, book_entry.date) {
            (Some(b), Some(k)) => Some((b - k).num_days().abs()),
            _ => None,
        };
        if let Some(diff) = date_diff_days {
            // Decay divisor is clamped so a zero-day tolerance still decays
            // over one day instead of dividing by zero; the numerator uses
            // the configured tolerance unclamped.
            let decay_window = s.date_tolerance_days.max(1) as f64;
            let closeness = if diff <= s.date_tolerance_days {
                1.0
            } else {
                (1.0 - (diff - s.date_tolerance_days) as f64 / decay_window).max(0.0)
            };
            if closeness > 0.0 {
                score += WEIGHT_DATE * closeness;
                if diff == 0 {
                    reasons.push("date_exact".to_string());
                } else {
                    reasons.push(format!("date_within_{diff}_days"));
                }
            }
        }

        // Description: normalized edit-distance ratio above the fuzzy
        // threshold, otherwise a flat partial credit for shared significant
        // words.
        let bank_desc = bank_entry.description.trim().to_lowercase();
        let book_desc = book_entry.description.trim().to_lowercase();
        if !bank_desc.is_empty() && !book_desc.is_empty() {
            let similarity = strsim::normalized_levenshtein(&bank_desc, &book_desc);
            if similarity >= s.fuzzy_threshold {
                score += WEIGHT_DESCRIPTION * similarity;
                reasons.push(format!("description_fuzzy_{similarity:.2}"));
            } else if s.enable_partial_match && partial_word_match(&bank_desc, &book_desc) {
                score += WEIGHT_PARTIAL_DESCRIPTION;
                reasons.push("description_partial".to_string());
            }
        }

        // Reference equality, when both sides carry one.
        if let (Some(bank_ref), Some(book_ref)) = (&bank_entry.reference, &book_entry.reference) {
            if !bank_ref.is_empty() && bank_ref.eq_ignore_ascii_case(book_ref) {
                score += WEIGHT_REFERENCE;
                reasons.push("reference_match".to_string());
            }
        }

        let confidence = if score >= HIGH_CUTOFF {
            Confidence::High
        } else if score >= MEDIUM_CUTOFF {
            Confidence::Medium
        } else {
            debug!(
                score,
                bank = bank_idx,
                book = book_idx,
                "pair below confidence cutoff"
            );
            return None;
        };

        Some(ScoredPair {
            bank_idx,
            book_idx,
            score,
            confidence,
            reasons,
            amount_diff,
            date_diff_days,
        })
    }
}

/// Significant-word overlap: at least two shared words of four or more
/// characters.
fn partial_word_match(a: &str, b: &str) -> bool {
    let words = |s: &str| {
        s.split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 4)
            .map(str::to_string)
            .collect::<std::collections::BTreeSet<_>>()
    };
    let wa = words(a);
    let wb = words(b);
    wa.intersection(&wb).count() >= 2
}

/// Per-side breakdown of unmatched entries
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SideAnalysis {
    pub count: usize,
    pub total_amount: f64,
    pub positive_amount: f64,
    pub negative_amount: f64,
    pub average_amount: f64,
}

impl SideAnalysis {
    fn from_entries(entries: &[TransactionEntry]) -> Self {
        let total_amount: f64 = entries.iter().map(|e| e.amount).sum();
        Self {
            count: entries.len(),
            total_amount,
            positive_amount: entries.iter().map(|e| e.amount).filter(|a| *a > 0.0).sum(),
            negative_amount: entries.iter().map(|e| e.amount).filter(|a| *a < 0.0).sum(),
            average_amount: if entries.is_empty() {
                0.0
            } else {
                total_amount / entries.len() as f64
            },
        }
    }
}

/// Review summary over what reconciliation left unmatched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedAnalysis {
    pub bank: SideAnalysis,
    pub books: SideAnalysis,
    /// Unmatched bank total minus unmatched books total
    pub net_difference: f64,
    pub reconciliation_gap: f64,
    pub requires_review: bool,
    pub recommendations: Vec<String>,
}

/// Analyze the unmatched remainder of a reconciliation run.
pub fn analyze_unmatched(result: &ReconciliationResult) -> UnmatchedAnalysis {
    let bank = SideAnalysis::from_entries(&result.unmatched_bank);
    let books = SideAnalysis::from_entries(&result.unmatched_books);
    let net_difference = bank.total_amount - books.total_amount;

    let mut recommendations = Vec::new();
    if bank.count > 0 {
        recommendations.push(
            "Review unmatched bank entries - may require manual matching or represent new transactions"
                .to_string(),
        );
    }
    if books.count > 0 {
        recommendations.push(
            "Review unmatched book entries - may represent pending transactions or errors"
                .to_string(),
        );
    }
    if net_difference.abs() > 1000.0 {
        recommendations.push(
            "Significant reconciliation gap detected - investigate potential missing entries"
                .to_string(),
        );
    }

    UnmatchedAnalysis {
        bank,
        books,
        net_difference,
        reconciliation_gap: net_difference.abs(),
        requires_review: bank.count > 0 || books.count > 0,
        recommendations,
    }
}
