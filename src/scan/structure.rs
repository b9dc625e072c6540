//! Structural validation: is this plausibly the Markdown we asked for?
//!
//! Fetched documents are expected to be Markdown. A server returning its
//! HTML error page, a JSON API response, or an XML feed instead of the
//! document is a high-severity finding in its own right, and a document
//! that simply fails to open with an H1 heading is worth a medium flag.
//! All checks look only at the first non-whitespace bytes; nothing here
//! parses the full document.

use crate::pipeline::verdict::{Flag, Severity};

/// Rule id for content in a recognizably wrong format.
pub const RULE_INVALID_FORMAT: &str = "invalid-format";
/// Rule id for content that is not obviously any known format but does not
/// open like Markdown either.
pub const RULE_INVALID_STRUCTURE: &str = "invalid-structure";

/// Check the document opening and return structural flags.
///
/// Empty documents (or all-whitespace ones) pass: emptiness is a fetch
/// problem, not a structure problem. Structural flags carry no line number.
#[must_use]
pub fn validate(content: &str) -> Vec<Flag> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Vec::new();
    }

    if starts_with_ignore_case(trimmed, "<!DOCTYPE") || starts_with_ignore_case(trimmed, "<html") {
        return vec![Flag::document(
            RULE_INVALID_FORMAT,
            Severity::High,
            "Content is HTML, not Markdown",
        )];
    }

    if trimmed.starts_with("{\"") || trimmed.starts_with('[') {
        return vec![Flag::document(
            RULE_INVALID_FORMAT,
            Severity::High,
            "Content is JSON, not Markdown",
        )];
    }

    if trimmed.starts_with("<?xml") {
        return vec![Flag::document(
            RULE_INVALID_FORMAT,
            Severity::High,
            "Content is XML, not Markdown",
        )];
    }

    vec![Flag::document(
        RULE_INVALID_STRUCTURE,
        Severity::Medium,
        "Content should start with # (Markdown H1)",
    )]
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    let bytes = haystack.as_bytes();
    let prefix = prefix.as_bytes();
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_rule(content: &str) -> (String, Severity) {
        let flags = validate(content);
        assert_eq!(flags.len(), 1, "expected exactly one flag for {content:?}");
        (flags[0].rule.to_string(), flags[0].severity)
    }

    #[test]
    fn markdown_heading_passes() {
        assert!(validate("# Title\n\nBody text.").is_empty());
        // Leading whitespace before the heading is fine.
        assert!(validate("\n\n  # Title").is_empty());
        // Any heading level counts.
        assert!(validate("## Subsection first").is_empty());
    }

    #[test]
    fn empty_and_whitespace_pass() {
        assert!(validate("").is_empty());
        assert!(validate("   \n\t\n").is_empty());
    }

    #[test]
    fn html_detected_case_insensitively() {
        for content in [
            "<!DOCTYPE html><html><body>page</body></html>",
            "<!doctype HTML>",
            "<html lang=\"en\">",
            "<HTML>",
        ] {
            let (rule, severity) = single_rule(content);
            assert_eq!(rule, RULE_INVALID_FORMAT);
            assert_eq!(severity, Severity::High);
        }
    }

    #[test]
    fn json_detected() {
        let (rule, severity) = single_rule("{\"error\": \"not found\"}");
        assert_eq!(rule, RULE_INVALID_FORMAT);
        assert_eq!(severity, Severity::High);

        let (rule, _) = single_rule("[{\"id\": 1}]");
        assert_eq!(rule, RULE_INVALID_FORMAT);
    }

    #[test]
    fn xml_prologue_detected() {
        let (rule, severity) = single_rule("<?xml version=\"1.0\"?><feed></feed>");
        assert_eq!(rule, RULE_INVALID_FORMAT);
        assert_eq!(severity, Severity::High);
    }

    #[test]
    fn xml_check_is_case_sensitive() {
        // An uppercase prologue is not the XML opening; it falls through to
        // the structure flag.
        let (rule, severity) = single_rule("<?XML version=\"1.0\"?>");
        assert_eq!(rule, RULE_INVALID_STRUCTURE);
        assert_eq!(severity, Severity::Medium);
    }

    #[test]
    fn non_heading_text_gets_structure_flag() {
        let (rule, severity) = single_rule("Just a paragraph without a heading.");
        assert_eq!(rule, RULE_INVALID_STRUCTURE);
        assert_eq!(severity, Severity::Medium);
    }

    #[test]
    fn structural_flags_carry_no_line() {
        let flags = validate("<html>");
        assert_eq!(flags[0].line, None);

        let flags = validate("plain text");
        assert_eq!(flags[0].line, None);
    }

    #[test]
    fn json_object_requires_quote_after_brace() {
        // A bare brace is not the JSON opening; plain text starting with a
        // brace only earns the structure flag.
        let (rule, _) = single_rule("{ not json");
        assert_eq!(rule, RULE_INVALID_STRUCTURE);
    }
}
