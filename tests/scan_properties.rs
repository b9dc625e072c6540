#[macro_use]
extern crate proptest;

use std::borrow::Cow;

use proptest::prelude::*;

use gatehouse::pipeline::verdict::{Flag, ScanResult, Severity};
use gatehouse::sandbox;
use gatehouse::scan::sanitize;

// Generators shared by the sanitizer and scoring properties

/// One representative per invisible-character band, plus band edges.
const INVISIBLE_SAMPLES: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{202A}', '\u{202E}',
    '\u{2066}', '\u{2069}', '\u{0000}', '\u{0007}', '\u{000E}', '\u{001F}', '\u{E0001}',
    '\u{E007F}', '\u{FE00}', '\u{FE0F}',
];

/// Text that freely mixes ordinary characters with invisible ones.
fn noisy_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => prop::char::range('a', 'z'),
            1 => Just(' '),
            1 => Just('\n'),
            1 => Just('#'),
            2 => prop::sample::select(INVISIBLE_SAMPLES),
        ],
        0..120,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// Text guaranteed to contain no invisible characters.
fn clean_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            6 => prop::char::range('a', 'z'),
            2 => prop::char::range('A', 'Z'),
            1 => Just(' '),
            1 => Just('\n'),
            1 => Just('\t'),
            1 => Just('\r'),
        ],
        0..120,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn severities() -> impl Strategy<Value = Vec<Severity>> {
    prop::collection::vec(
        prop::sample::select(&[Severity::Low, Severity::Medium, Severity::High][..]),
        0..20,
    )
}

proptest! {
    #[test]
    fn prop_strip_is_idempotent(input in noisy_text()) {
        let once = sanitize::strip(&input).into_owned();
        let twice = sanitize::strip(&once);
        prop_assert_eq!(&once, twice.as_ref());
        // A second pass finds nothing left to do.
        prop_assert!(matches!(twice, Cow::Borrowed(_)));
    }

    #[test]
    fn prop_detect_count_matches_removed_chars(input in noisy_text()) {
        let report = sanitize::detect(&input);
        let stripped = sanitize::strip(&input);
        prop_assert_eq!(
            report.count,
            input.chars().count() - stripped.chars().count()
        );
        prop_assert_eq!(report.found, report.count > 0);
        prop_assert_eq!(report.found, !report.categories.is_empty());
    }

    #[test]
    fn prop_clean_text_is_untouched(input in clean_text()) {
        let report = sanitize::detect(&input);
        prop_assert!(!report.found);
        prop_assert_eq!(report.count, 0);
        prop_assert!(report.categories.is_empty());
        prop_assert!(matches!(sanitize::strip(&input), Cow::Borrowed(_)));
    }

    #[test]
    fn prop_score_is_sum_of_weights(sevs in severities(), threshold in 0u32..10) {
        let flags: Vec<Flag> = sevs
            .iter()
            .enumerate()
            .map(|(i, &severity)| Flag::on_line("prop-rule", severity, "generated", i + 1))
            .collect();

        let expected: u32 = sevs.iter().map(|s| s.weight()).sum();
        let result = ScanResult::from_flags(flags, threshold);

        prop_assert_eq!(result.score, expected);
        prop_assert_eq!(result.safe, result.score < threshold);
        prop_assert_eq!(result.flags.len(), sevs.len());
    }

    #[test]
    fn prop_wrap_preserves_body_and_neutralizes_label(
        body in clean_text(),
        label in "[ -~]{0,40}",
    ) {
        let wrapped = sandbox::wrap(&body, &label);

        let body_block = format!("\n{body}\n");
        prop_assert!(wrapped.contains(&body_block));
        prop_assert!(wrapped.starts_with("<UNTRUSTED_DATA source=\""));
        prop_assert!(wrapped.ends_with("</UNTRUSTED_DATA>"));

        // The escaped label can no longer carry attribute or tag breaks.
        let escaped = sandbox::escape_label(&label);
        prop_assert!(!escaped.contains('"'));
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
    }
}
