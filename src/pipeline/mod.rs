//! The content security pipeline: sanitize, scan, package.
//!
//! ```text
//!            ┌────────────┐    ┌─────────────────────┐
//!  raw ─────►│ sanitizer  ├───►│ validator + scanner ├──► verdict
//!            └────────────┘    └─────────────────────┘      │
//!                                              safe ────────┼──► sandbox wrap
//!                                              unsafe ──────┴──► quarantine
//! ```
//!
//! Each invocation walks the full sequence from scratch; there is no
//! persistent state machine. Quarantined content is not discarded: its
//! score and flags come back to the caller for storage and audit, it is
//! just never wrapped for serving.

pub mod verdict;

use tracing::{debug, trace, warn};

use crate::config::{FailMode, ScanPolicy};
use crate::sandbox;
use crate::scan::sanitize::{self, InvisibleCharReport};
use crate::scan::scanner::{InjectionScanner, ScanError};
use self::verdict::ScanResult;

/// Where a processed document ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The document may be served.
    Sandboxed {
        /// Container-wrapped text, ready for consumers.
        text: String,
    },
    /// The verdict was unsafe under a closed fail mode. Nothing is wrapped;
    /// the report still carries the score and flags.
    Quarantined,
}

impl Disposition {
    /// Wrapped text, when the document was accepted for serving.
    #[must_use]
    pub fn sandboxed_text(&self) -> Option<&str> {
        match self {
            Self::Sandboxed { text } => Some(text),
            Self::Quarantined => None,
        }
    }

    /// Whether the document was quarantined.
    #[must_use]
    pub fn is_quarantined(&self) -> bool {
        matches!(self, Self::Quarantined)
    }
}

/// Everything one pipeline pass produces.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Invisible-character findings from the sanitize stage.
    pub invisible: InvisibleCharReport,
    /// Verdict over the sanitized text.
    pub scan: ScanResult,
    /// The sanitized text the verdict applies to.
    pub sanitized: String,
    /// Serving outcome.
    pub disposition: Disposition,
}

impl PipelineReport {
    /// Whether the scan verdict was safe.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.scan.safe
    }
}

/// The pipeline orchestrator.
///
/// Built once from a policy (rule compilation happens here), then invoked
/// per document. Processing is synchronous and shares no mutable state, so
/// one pipeline serves concurrent callers. A policy change means building
/// a new pipeline; scans already in flight keep the scoring they started
/// with.
#[derive(Debug)]
pub struct ContentPipeline {
    policy: ScanPolicy,
    scanner: InjectionScanner,
}

impl ContentPipeline {
    /// Build a pipeline from an explicit policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] when a custom rule in the policy fails to
    /// compile.
    pub fn new(policy: ScanPolicy) -> Result<Self, ScanError> {
        let scanner = InjectionScanner::new(&policy.rules)?;
        Ok(Self { policy, scanner })
    }

    /// Pipeline over the default policy.
    ///
    /// # Errors
    ///
    /// Propagates [`ScanError`] from construction.
    pub fn with_defaults() -> Result<Self, ScanError> {
        Self::new(ScanPolicy::default())
    }

    /// The policy this pipeline was built with.
    #[must_use]
    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Run one document through sanitize, scan, and packaging.
    ///
    /// `source_label` is the opaque identifier stamped on the serving
    /// container; it never influences classification.
    #[must_use]
    pub fn process(&self, raw: &str, source_label: &str) -> PipelineReport {
        trace!(bytes = raw.len(), source = source_label, "pipeline start");

        let invisible = sanitize::detect(raw);
        let sanitized = sanitize::strip(raw);
        if invisible.found {
            debug!(
                count = invisible.count,
                categories = invisible.categories.len(),
                "stripped invisible characters"
            );
        }

        let scan = self.scanner.scan(&sanitized, self.policy.threshold);
        debug!(
            score = scan.score,
            flags = scan.flags.len(),
            safe = scan.safe,
            "scan complete"
        );

        let disposition = if scan.safe {
            Disposition::Sandboxed {
                text: self.wrap_for_serving(&scan, &sanitized, source_label),
            }
        } else {
            match self.policy.fail_mode {
                FailMode::Closed => {
                    warn!(
                        source = source_label,
                        score = scan.score,
                        "content quarantined"
                    );
                    Disposition::Quarantined
                }
                FailMode::AuditOnly => {
                    warn!(
                        source = source_label,
                        score = scan.score,
                        "serving unsafe content under audit-only fail mode"
                    );
                    Disposition::Sandboxed {
                        text: self.wrap_for_serving(&scan, &sanitized, source_label),
                    }
                }
            }
        };

        PipelineReport {
            invisible,
            scan,
            sanitized: sanitized.into_owned(),
            disposition,
        }
    }

    fn wrap_for_serving(&self, scan: &ScanResult, sanitized: &str, source_label: &str) -> String {
        debug_assert!(
            scan.safe || self.policy.fail_mode == FailMode::AuditOnly,
            "wrapping unsafe content outside the audit-only override"
        );
        sandbox::wrap(sanitized, source_label)
    }
}
