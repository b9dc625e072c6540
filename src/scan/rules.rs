//! The injection rule table: line rules, document rules, and the policy
//! hooks for extending or disabling them.
//!
//! Rules are data, not code. Each one pairs a regex source with a severity
//! and a reporting identifier; the scanner compiles them once and applies
//! them uniformly, so adding a rule never means touching match logic.
//! Built-in rules use borrowed statics, policy-supplied ones own their
//! strings.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::pipeline::verdict::Severity;

// ── Rule shapes ─────────────────────────────────────────────────────────────

/// A rule tried against every line outside fenced code blocks.
#[derive(Debug, Clone)]
pub struct LineRule {
    /// Identifier reported on flags. Rules in the same family share one.
    pub id: Cow<'static, str>,
    /// Severity of a match.
    pub severity: Severity,
    /// Regex source, compiled at scanner construction.
    pub pattern: Cow<'static, str>,
    /// Explanation reported on flags.
    pub detail: Cow<'static, str>,
}

/// A rule matched once against the whole document, fences included.
#[derive(Debug, Clone)]
pub struct DocumentRule {
    /// Identifier reported on flags.
    pub id: Cow<'static, str>,
    /// Severity of a match.
    pub severity: Severity,
    /// Regex source, compiled at scanner construction.
    pub pattern: Cow<'static, str>,
    /// Explanation reported on flags.
    pub detail: Cow<'static, str>,
}

/// A policy-supplied line rule, deserialized from configuration. Becomes a
/// [`LineRule`] appended after the built-in table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRule {
    /// Identifier reported on flags.
    pub id: String,
    /// Severity of a match.
    pub severity: Severity,
    /// Regex source. A pattern that fails to compile rejects the whole
    /// policy at pipeline construction.
    pub pattern: String,
    /// Explanation reported on flags.
    pub detail: String,
}

impl From<CustomRule> for LineRule {
    fn from(custom: CustomRule) -> Self {
        Self {
            id: Cow::Owned(custom.id),
            severity: custom.severity,
            pattern: Cow::Owned(custom.pattern),
            detail: Cow::Owned(custom.detail),
        }
    }
}

/// Policy adjustments to the rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSetConfig {
    /// Custom line rules appended after the built-in table.
    pub extra_rules: Vec<CustomRule>,
    /// Rule ids to drop from the built-in table. An id shared by a family
    /// drops the whole family.
    pub disabled_rules: Vec<String>,
}

// ── Built-in table ──────────────────────────────────────────────────────────

macro_rules! rule {
    ($id:literal, $severity:expr, $pattern:literal, $detail:literal) => {
        LineRule {
            id: Cow::Borrowed($id),
            severity: $severity,
            pattern: Cow::Borrowed($pattern),
            detail: Cow::Borrowed($detail),
        }
    };
}

macro_rules! doc_rule {
    ($id:literal, $severity:expr, $pattern:literal, $detail:literal) => {
        DocumentRule {
            id: Cow::Borrowed($id),
            severity: $severity,
            pattern: Cow::Borrowed($pattern),
            detail: Cow::Borrowed($detail),
        }
    };
}

/// The built-in line rules, in match-reporting order.
#[must_use]
pub fn builtin_line_rules() -> Vec<LineRule> {
    vec![
        // Instruction overrides.
        rule!(
            "injection-pattern",
            Severity::High,
            r"(?i)ignore\s+(all\s+)?previous\s+instructions",
            "Prompt injection: \"ignore previous instructions\""
        ),
        rule!(
            "injection-pattern",
            Severity::High,
            r"(?i)disregard\s+(all\s+)?(previous|prior|above)\s+(instructions|prompts|rules)",
            "Prompt injection: \"disregard previous instructions\""
        ),
        // Role overrides.
        rule!(
            "role-override",
            Severity::Medium,
            r"(?i)you\s+are\s+now\s+",
            "Role override attempt: \"you are now\""
        ),
        rule!(
            "role-override",
            Severity::Medium,
            r"(?i)^\s*act\s+as\s+",
            "Role override attempt: \"act as\""
        ),
        rule!(
            "role-override",
            Severity::Medium,
            r"(?i)pretend\s+you\s+are",
            "Role override attempt: \"pretend you are\""
        ),
        // System-prompt spoofing. The bracketed marker matches
        // case-sensitively; lowercase [system] occurs in ordinary prose.
        rule!(
            "system-prompt-injection",
            Severity::High,
            r"(?i)^\s*system\s*:",
            "System prompt injection: \"system:\" prefix"
        ),
        rule!(
            "system-prompt-injection",
            Severity::High,
            r"(?i)<system>",
            "System prompt injection: <system> tag"
        ),
        rule!(
            "system-prompt-injection",
            Severity::High,
            r"\[SYSTEM\]",
            "System prompt injection: [SYSTEM] marker"
        ),
        // Tags that mimic model tool plumbing.
        rule!(
            "tag-injection",
            Severity::High,
            r"(?i)<instructions>",
            "XML injection: <instructions> tag"
        ),
        rule!(
            "tag-injection",
            Severity::High,
            r"(?i)<tool_use>",
            "XML injection: <tool_use> tag"
        ),
        rule!(
            "tag-injection",
            Severity::High,
            r"(?i)<function_call>",
            "XML injection: <function_call> tag"
        ),
        // Encoded payloads.
        rule!(
            "base64-blob",
            Severity::Medium,
            r"[A-Za-z0-9+/=]{50,}",
            "Large Base64-encoded blob detected"
        ),
        rule!(
            "hex-encoded",
            Severity::Medium,
            r"0x[0-9a-fA-F]{20,}",
            "Large hex-encoded string detected"
        ),
        // Hidden content.
        rule!(
            "hidden-content",
            Severity::Low,
            r"<!--[\s\S]*?-->",
            "HTML comment (potential hidden instructions)"
        ),
    ]
}

/// The built-in whole-document rules.
///
/// Both look for forged conversation turns: a blank line followed by a
/// capitalized turn marker. Case-sensitive, matched against the raw
/// document, so fenced examples count too.
#[must_use]
pub fn document_rules() -> Vec<DocumentRule> {
    vec![
        doc_rule!(
            "conversation-injection",
            Severity::High,
            r"\n\nHuman\s*:",
            "Conversation format injection: \"Human:\" turn marker"
        ),
        doc_rule!(
            "conversation-injection",
            Severity::High,
            r"\n\nAssistant\s*:",
            "Conversation format injection: \"Assistant:\" turn marker"
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn builtin_table_shape() {
        let rules = builtin_line_rules();
        assert_eq!(rules.len(), 14);

        let highs = rules
            .iter()
            .filter(|r| r.severity == Severity::High)
            .count();
        let mediums = rules
            .iter()
            .filter(|r| r.severity == Severity::Medium)
            .count();
        let lows = rules.iter().filter(|r| r.severity == Severity::Low).count();
        assert_eq!((highs, mediums, lows), (8, 5, 1));
    }

    #[test]
    fn every_builtin_pattern_compiles() {
        for rule in builtin_line_rules() {
            assert!(
                Regex::new(&rule.pattern).is_ok(),
                "pattern for '{}' failed to compile",
                rule.id
            );
        }
        for rule in document_rules() {
            assert!(Regex::new(&rule.pattern).is_ok());
        }
    }

    #[test]
    fn bracketed_system_marker_is_case_sensitive() {
        let rules = builtin_line_rules();
        let marker = rules
            .iter()
            .find(|r| r.pattern.contains("SYSTEM"))
            .unwrap();
        let re = Regex::new(&marker.pattern).unwrap();
        assert!(re.is_match("[SYSTEM] do things"));
        assert!(!re.is_match("[system] do things"));
    }

    #[test]
    fn conversation_rules_need_blank_line() {
        let rules = document_rules();
        assert_eq!(rules.len(), 2);
        let human = Regex::new(&rules[0].pattern).unwrap();

        assert!(human.is_match("text\n\nHuman: hello"));
        assert!(human.is_match("text\n\nHuman : hello"));
        // Mid-line and single-newline occurrences are prose, not turns.
        assert!(!human.is_match("the Human: condition"));
        assert!(!human.is_match("text\nHuman: hello"));
        // Lowercase is prose.
        assert!(!human.is_match("text\n\nhuman: hello"));
    }

    #[test]
    fn custom_rule_converts_to_line_rule() {
        let custom = CustomRule {
            id: "internal-marker".to_string(),
            severity: Severity::High,
            pattern: r"(?i)CONFIDENTIAL".to_string(),
            detail: "Internal confidentiality marker".to_string(),
        };
        let rule = LineRule::from(custom);
        assert_eq!(rule.id, "internal-marker");
        assert_eq!(rule.severity, Severity::High);
    }

    #[test]
    fn rule_set_config_deserializes_with_defaults() {
        let config: RuleSetConfig = serde_json::from_str("{}").unwrap();
        assert!(config.extra_rules.is_empty());
        assert!(config.disabled_rules.is_empty());

        let toml_text = r#"
            disabled_rules = ["hidden-content"]

            [[extra_rules]]
            id = "custom"
            severity = "low"
            pattern = "marker"
            detail = "custom marker"
        "#;
        let config: RuleSetConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.disabled_rules, vec!["hidden-content"]);
        assert_eq!(config.extra_rules.len(), 1);
        assert_eq!(config.extra_rules[0].severity, Severity::Low);
    }
}
