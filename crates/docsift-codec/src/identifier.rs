// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identifier sanitization for table and figure names.
//
// The same rule applies whether the name came from a detected table title, an
// edit in the review screen, or the base name of an uploaded data file.

/// Storage backends cap table names at 63 characters.
pub const MAX_IDENTIFIER_CHARS: usize = 63;

/// Make `raw` safe to use as a display name and a storage table name.
///
/// Line breaks are removed, any other whitespace becomes `_`, periods are
/// removed, and the result is truncated to [`MAX_IDENTIFIER_CHARS`]
/// characters.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '.'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .take(MAX_IDENTIFIER_CHARS)
        .collect()
}

/// Identifier for data uploaded from a file: everything before the first
/// `.` of the file name, sanitized.
pub fn identifier_from_filename(file_name: &str) -> String {
    let base = std::path::Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name);
    let stem = base.split('.').next().unwrap_or_default();
    sanitize_identifier(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_and_dots() {
        assert_eq!(sanitize_identifier("My Table Name.With.Dots"), "My_Table_NameWithDots");
    }

    #[test]
    fn newlines_are_dropped() {
        assert_eq!(sanitize_identifier("Table 3\nResults"), "Table_3Results");
        assert_eq!(sanitize_identifier("a\r\nb"), "ab");
    }

    #[test]
    fn other_whitespace_becomes_underscore() {
        assert_eq!(sanitize_identifier("a\tb\u{a0}c"), "a_b_c");
    }

    #[test]
    fn truncates_by_character() {
        let long = "é".repeat(100);
        let id = sanitize_identifier(&long);
        assert_eq!(id.chars().count(), MAX_IDENTIFIER_CHARS);
    }

    /// Sanitized output never violates the identifier invariant.
    #[test]
    fn invariant_holds_for_awkward_inputs() {
        let inputs = [
            "",
            " ",
            "....",
            "\n\n\n",
            "Table 1. Mean (SD) values\nby group, 2019–2021 (n = 1,204), with a long caption",
            "\t tabbed \u{2003} em-space",
            "x".repeat(200).as_str(),
        ]
        .map(str::to_string);

        for input in inputs {
            let id = sanitize_identifier(&input);
            assert!(id.chars().count() <= MAX_IDENTIFIER_CHARS, "{id:?}");
            assert!(!id.contains('.'), "{id:?}");
            assert!(!id.contains('\n'), "{id:?}");
            assert!(!id.chars().any(char::is_whitespace), "{id:?}");
        }
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let once = sanitize_identifier("Fig. 2 Growth rates\n(annual)");
        assert_eq!(sanitize_identifier(&once), once);
    }

    #[test]
    fn filename_stem() {
        assert_eq!(identifier_from_filename("sales 2024.final.csv"), "sales_2024");
        assert_eq!(identifier_from_filename("/tmp/uploads/gdp.xlsx"), "gdp");
        assert_eq!(identifier_from_filename(".hidden"), "");
    }
}
