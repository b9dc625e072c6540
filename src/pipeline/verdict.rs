//! Scan verdict types: severities, flags, and the scored [`ScanResult`].
//!
//! Every detector in the crate reports findings as [`Flag`]s; the pipeline
//! folds them into a single [`ScanResult`] whose score decides whether
//! content may be served. Scoring is additive and order-independent, so a
//! verdict can be recomputed from its flags at any time.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Severity ────────────────────────────────────────────────────────────────

/// How serious a single finding is.
///
/// Ordering follows weight: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Suspicious but routinely benign (hidden HTML comments and similar).
    Low,
    /// Likely manipulation attempt, tolerable in isolation.
    Medium,
    /// Direct injection attempt. A single high finding reaches the default
    /// threshold on its own.
    High,
}

impl Severity {
    /// Numeric contribution of one finding at this severity.
    #[must_use]
    pub fn weight(self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

// ── Flag ────────────────────────────────────────────────────────────────────

/// One finding raised by a detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    /// Identifier of the rule that fired. Several related rules may share
    /// an identifier; the detail string disambiguates.
    pub rule: Cow<'static, str>,
    /// Severity of this finding.
    pub severity: Severity,
    /// Human-readable description of what was matched.
    pub detail: Cow<'static, str>,
    /// 1-based line number for line-scoped rules. Whole-document and
    /// structural findings carry no line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Flag {
    /// Finding anchored to a specific line (1-based).
    #[must_use]
    pub fn on_line(
        rule: impl Into<Cow<'static, str>>,
        severity: Severity,
        detail: impl Into<Cow<'static, str>>,
        line: usize,
    ) -> Self {
        debug_assert!(line >= 1, "line numbers are 1-based");
        Self {
            rule: rule.into(),
            severity,
            detail: detail.into(),
            line: Some(line),
        }
    }

    /// Finding that applies to the document as a whole.
    #[must_use]
    pub fn document(
        rule: impl Into<Cow<'static, str>>,
        severity: Severity,
        detail: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            rule: rule.into(),
            severity,
            detail: detail.into(),
            line: None,
        }
    }
}

// ── ScanResult ──────────────────────────────────────────────────────────────

/// Scored verdict over one document.
///
/// The score is the sum of the flag weights and carries no other inputs, so
/// two documents with the same findings always score the same. `safe` holds
/// exactly when `score < threshold`; a score equal to the threshold is
/// already unsafe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Whether the document stayed under the policy threshold.
    pub safe: bool,
    /// Sum of the weights of all flags.
    pub score: u32,
    /// Every finding, in detector emission order.
    pub flags: Vec<Flag>,
}

impl ScanResult {
    /// Fold flags into a verdict under `threshold`.
    #[must_use]
    pub fn from_flags(flags: Vec<Flag>, threshold: u32) -> Self {
        let score = flags.iter().map(|f| f.severity.weight()).sum();
        Self {
            safe: score < threshold,
            score,
            flags,
        }
    }

    /// Verdict for a document with no findings.
    #[must_use]
    pub fn clean(threshold: u32) -> Self {
        Self::from_flags(Vec::new(), threshold)
    }

    /// Highest severity among the flags, if any fired.
    #[must_use]
    pub fn max_severity(&self) -> Option<Severity> {
        self.flags.iter().map(|f| f.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_weights_and_order() {
        // 1. Weights are 1/2/3.
        assert_eq!(Severity::Low.weight(), 1);
        assert_eq!(Severity::Medium.weight(), 2);
        assert_eq!(Severity::High.weight(), 3);

        // 2. Derived ordering matches weight ordering.
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn severity_serializes_snake_case() {
        let json = serde_json::to_string(&Severity::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
        let back: Severity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(back, Severity::High);
    }

    #[test]
    fn score_is_sum_of_weights() {
        let flags = vec![
            Flag::on_line("a", Severity::Low, "low finding", 1),
            Flag::on_line("b", Severity::Low, "another low", 2),
            Flag::document("c", Severity::Medium, "medium finding"),
        ];
        let result = ScanResult::from_flags(flags, 10);

        // 1 + 1 + 2
        assert_eq!(result.score, 4);
        assert!(result.safe);
        assert_eq!(result.max_severity(), Some(Severity::Medium));
    }

    #[test]
    fn threshold_is_strict() {
        let flags = vec![Flag::document("x", Severity::High, "single high")];

        // 1. Score equal to the threshold is unsafe.
        let at = ScanResult::from_flags(flags.clone(), 3);
        assert_eq!(at.score, 3);
        assert!(!at.safe);

        // 2. One below the threshold is safe.
        let under = ScanResult::from_flags(flags, 4);
        assert!(under.safe);
    }

    #[test]
    fn empty_flags_are_safe_under_positive_threshold() {
        let result = ScanResult::clean(3);
        assert!(result.safe);
        assert_eq!(result.score, 0);
        assert!(result.flags.is_empty());
        assert_eq!(result.max_severity(), None);
    }

    #[test]
    fn zero_threshold_rejects_everything() {
        let result = ScanResult::clean(0);
        assert!(!result.safe);
    }

    #[test]
    fn document_flags_omit_line_in_json() {
        let flag = Flag::document("invalid-format", Severity::High, "not markdown");
        let json = serde_json::to_string(&flag).unwrap();
        assert!(!json.contains("line"));

        let lined = Flag::on_line("rule", Severity::Low, "detail", 7);
        let json = serde_json::to_string(&lined).unwrap();
        assert!(json.contains("\"line\":7"));
    }
}
