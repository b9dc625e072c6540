//! Invisible-character detection and removal.
//!
//! Zero-width characters, bidirectional overrides, and Unicode tag
//! characters can smuggle instructions past human review or split a
//! suspicious phrase so a pattern rule no longer matches. This module
//! classifies those codepoints, reports them per category, and strips them
//! before any pattern matching runs.
//!
//! Ordinary whitespace survives untouched: tab, line feed, and carriage
//! return are never treated as invisible.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

// ── Categories ──────────────────────────────────────────────────────────────

/// The invisible-character families the sanitizer knows about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CharCategory {
    /// Zero-width spaces and joiners (U+200B..U+200D, U+2060, U+FEFF).
    ZeroWidth,
    /// Bidirectional embedding, override, and isolate controls
    /// (U+202A..U+202E, U+2066..U+2069).
    BidiOverride,
    /// C0 controls other than tab, line feed, and carriage return.
    ControlChar,
    /// Unicode tag characters (U+E0001..U+E007F).
    TagChar,
    /// Variation selectors (U+FE00..U+FE0F).
    VariationSelector,
}

impl CharCategory {
    /// All categories, in report order.
    pub const ALL: [Self; 5] = [
        Self::ZeroWidth,
        Self::BidiOverride,
        Self::ControlChar,
        Self::TagChar,
        Self::VariationSelector,
    ];

    /// Whether `c` belongs to this category.
    #[must_use]
    pub fn matches(self, c: char) -> bool {
        match self {
            Self::ZeroWidth => {
                matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}')
            }
            Self::BidiOverride => {
                matches!(c, '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
            }
            Self::ControlChar => {
                matches!(c, '\u{0000}'..='\u{0008}' | '\u{000E}'..='\u{001F}')
            }
            Self::TagChar => matches!(c, '\u{E0001}'..='\u{E007F}'),
            Self::VariationSelector => matches!(c, '\u{FE00}'..='\u{FE0F}'),
        }
    }

    /// Stable kebab-case name, matching the serialized form.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ZeroWidth => "zero-width",
            Self::BidiOverride => "bidi-override",
            Self::ControlChar => "control-char",
            Self::TagChar => "tag-char",
            Self::VariationSelector => "variation-selector",
        }
    }
}

/// Whether `c` falls in any invisible category.
#[must_use]
pub fn is_invisible_char(c: char) -> bool {
    matches!(c,
        '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}'
        | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}'
        | '\u{0000}'..='\u{0008}' | '\u{000E}'..='\u{001F}'
        | '\u{E0001}'..='\u{E007F}'
        | '\u{FE00}'..='\u{FE0F}'
    )
}

// ── Report ──────────────────────────────────────────────────────────────────

/// What [`detect`] found in a document.
///
/// The default value is the negative report: nothing found, zero count, no
/// categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvisibleCharReport {
    /// Whether any invisible character was present.
    pub found: bool,
    /// Total number of invisible characters.
    pub count: usize,
    /// Categories present, in [`CharCategory::ALL`] order, deduplicated.
    pub categories: Vec<CharCategory>,
}

/// Classify every invisible character in `input` without modifying it.
#[must_use]
pub fn detect(input: &str) -> InvisibleCharReport {
    let mut counts = [0usize; 5];
    for c in input.chars() {
        for (slot, category) in counts.iter_mut().zip(CharCategory::ALL) {
            if category.matches(c) {
                *slot += 1;
                break;
            }
        }
    }

    let count = counts.iter().sum();
    let categories = CharCategory::ALL
        .into_iter()
        .zip(counts)
        .filter(|&(_, n)| n > 0)
        .map(|(category, _)| category)
        .collect();

    InvisibleCharReport {
        found: count > 0,
        count,
        categories,
    }
}

/// Remove every invisible character from `input`.
///
/// Returns the input unchanged (and unallocated) when there is nothing to
/// strip, which also makes the operation idempotent: stripping stripped
/// text is a borrow.
#[must_use]
pub fn strip(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_invisible_char) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.chars().filter(|&c| !is_invisible_char(c)).collect())
}
