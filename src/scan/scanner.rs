//! The pattern injection scanner.
//!
//! Compiles the rule table once, then scans documents line by line: every
//! line outside a fenced code block is tried against the full line-rule
//! set, the raw document is tried against the document rules, and the
//! structural validator's findings are folded into the same verdict.
//!
//! The scanner is non-semantic. It never asks what a match means, only
//! whether the regex fired; false positives merely raise the score, and
//! extending the table never changes the algorithm.

use regex::{Regex, RegexSet};
use thiserror::Error;

use super::rules::{self, DocumentRule, LineRule, RuleSetConfig};
use super::structure;
use crate::pipeline::verdict::{Flag, ScanResult};

/// Failure to assemble a scanner from a rule set.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A rule's regex source failed to compile.
    #[error("rule '{rule}' has an invalid pattern: {source}")]
    BadPattern {
        /// Identifier of the offending rule.
        rule: String,
        /// Compilation failure from the regex engine.
        source: regex::Error,
    },
}

/// Compiled scanner over the effective rule table.
///
/// Construction is the expensive part; scanning borrows the compiled sets
/// and shares no mutable state, so one scanner serves any number of
/// concurrent scans.
#[derive(Debug)]
pub struct InjectionScanner {
    line_rules: Vec<LineRule>,
    line_set: RegexSet,
    doc_rules: Vec<(Regex, DocumentRule)>,
}

impl InjectionScanner {
    /// Build a scanner from the built-in table adjusted by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::BadPattern`] when a custom rule's regex does
    /// not compile. Built-in rules are covered by tests and compile.
    pub fn new(config: &RuleSetConfig) -> Result<Self, ScanError> {
        let mut line_rules = rules::builtin_line_rules();
        if !config.disabled_rules.is_empty() {
            line_rules.retain(|r| !config.disabled_rules.iter().any(|d| d == r.id.as_ref()));
        }
        line_rules.extend(config.extra_rules.iter().cloned().map(LineRule::from));

        // Compile individually first: a set error carries no rule attribution.
        for rule in &line_rules {
            Regex::new(&rule.pattern).map_err(|source| ScanError::BadPattern {
                rule: rule.id.clone().into_owned(),
                source,
            })?;
        }
        let line_set = RegexSet::new(line_rules.iter().map(|r| r.pattern.as_ref())).map_err(
            |source| ScanError::BadPattern {
                rule: "combined rule set".to_string(),
                source,
            },
        )?;

        let doc_rules = rules::document_rules()
            .into_iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|re| (re, rule.clone()))
                    .map_err(|source| ScanError::BadPattern {
                        rule: rule.id.clone().into_owned(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            line_rules,
            line_set,
            doc_rules,
        })
    }

    /// Scanner over the unmodified built-in table.
    ///
    /// # Errors
    ///
    /// Propagates [`ScanError`] from construction.
    pub fn with_defaults() -> Result<Self, ScanError> {
        Self::new(&RuleSetConfig::default())
    }

    /// Number of line rules in the effective table.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.line_rules.len()
    }

    /// Pattern findings only: line rules against every line outside fenced
    /// code blocks, document rules against the raw text. One flag per rule
    /// per line, in table order within a line.
    #[must_use]
    pub fn pattern_flags(&self, content: &str) -> Vec<Flag> {
        let mut flags = Vec::new();

        let lines: Vec<&str> = content.split('\n').collect();
        let fenced = fence_membership(&lines);

        for (i, line) in lines.iter().enumerate() {
            if fenced[i] {
                continue;
            }
            for idx in self.line_set.matches(line) {
                let rule = &self.line_rules[idx];
                flags.push(Flag::on_line(
                    rule.id.clone(),
                    rule.severity,
                    rule.detail.clone(),
                    i + 1,
                ));
            }
        }

        for (re, rule) in &self.doc_rules {
            if re.is_match(content) {
                flags.push(Flag::document(
                    rule.id.clone(),
                    rule.severity,
                    rule.detail.clone(),
                ));
            }
        }

        flags
    }

    /// Full scan: structural findings, then pattern findings, folded into
    /// a verdict under `threshold`.
    #[must_use]
    pub fn scan(&self, content: &str, threshold: u32) -> ScanResult {
        let mut flags = structure::validate(content);
        flags.extend(self.pattern_flags(content));
        ScanResult::from_flags(flags, threshold)
    }
}

/// Mark which lines sit inside a fenced code block.
///
/// A line whose trimmed form opens with three backticks toggles the fence
/// state and is itself treated as inside. An unmatched opening fence
/// leaves every following line inside.
fn fence_membership(lines: &[&str]) -> Vec<bool> {
    let mut membership = vec![false; lines.len()];
    let mut inside = false;
    for (i, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("```") {
            inside = !inside;
            membership[i] = true;
        } else {
            membership[i] = inside;
        }
    }
    membership
}
