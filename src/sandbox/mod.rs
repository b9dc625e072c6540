//! Packaging of accepted content for serving.
//!
//! Accepted documents are handed to consumers inside a labeled container
//! that marks them as untrusted data rather than instructions. Wrapping is
//! pure packaging and not a security control: the pipeline only reaches it
//! after sanitization and scanning have produced a safe verdict (or the
//! policy explicitly overrides one).

/// Escape a source label for interpolation into an attribute position.
///
/// Ampersand is replaced first; the later substitutions introduce `&`
/// entities that must not be re-escaped.
#[must_use]
pub fn escape_label(label: &str) -> String {
    label
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Wrap `content` in the untrusted-data container labeled with
/// `source_label`.
///
/// The body is emitted byte-for-byte unchanged; only the label is escaped.
#[must_use]
pub fn wrap(content: &str, source_label: &str) -> String {
    format!(
        "<UNTRUSTED_DATA source=\"{}\" type=\"fetched-content\">\n{content}\n</UNTRUSTED_DATA>",
        escape_label(source_label)
    )
}
