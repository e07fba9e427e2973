// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR text normalization and chunking.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

/// A word, a hyphen, a line break, and the rest of the word.
static WRAPPED_HYPHENATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)-\n(\w+)").expect("hyphenation pattern is valid"));

/// Bracketed numeric reference markers such as `[12]`.
static REFERENCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("reference marker pattern is valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Clean raw OCR output before it is tagged, stored, or indexed.
///
/// Steps, in order:
///
/// 1. `exam-\nple` becomes `example`;
/// 2. a newline with no newline on either side becomes a space;
/// 3. `[n]` reference markers are deleted (repeatedly, so `[1[2]]` goes too);
/// 4. every whitespace run becomes one space and the ends are trimmed.
///
/// Step 4 also folds the `\n\n` paragraph breaks that step 2 left alone, so
/// the output is a single line. Applying the function to its own output
/// returns it unchanged.
#[instrument(skip_all, fields(input_len = text.len()))]
pub fn normalize_text(text: &str) -> String {
    let dehyphenated = WRAPPED_HYPHENATION.replace_all(text, "${1}${2}");
    let joined = join_wrapped_lines(&dehyphenated);
    let unreferenced = strip_reference_markers(joined);
    let collapsed = WHITESPACE_RUN.replace_all(&unreferenced, " ");
    let result = collapsed.trim().to_string();
    debug!(output_len = result.len(), "Text normalized");
    result
}

/// Replace every lone `\n` with a space; runs of two or more stay.
fn join_wrapped_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut previous = None;
    while let Some(c) = chars.next() {
        let lone_newline =
            c == '\n' && previous != Some('\n') && chars.peek() != Some(&'\n');
        out.push(if lone_newline { ' ' } else { c });
        previous = Some(c);
    }
    out
}

fn strip_reference_markers(mut text: String) -> String {
    while REFERENCE_MARKER.is_match(&text) {
        text = REFERENCE_MARKER.replace_all(&text, "").into_owned();
    }
    text
}

/// Split `text` into consecutive pieces of at most `chunk_chars` characters.
///
/// Empty text yields no chunks. A `chunk_chars` of zero is treated as one.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let size = chunk_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|chunk| chunk.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_hyphenated_words() {
        assert_eq!(normalize_text("infor-\nmation retrieval"), "information retrieval");
    }

    #[test]
    fn hyphen_without_line_break_is_kept() {
        assert_eq!(normalize_text("state-of-the-art"), "state-of-the-art");
    }

    #[test]
    fn single_newlines_become_spaces() {
        assert_eq!(
            normalize_text("The quick brown\nfox jumps\nover the dog."),
            "The quick brown fox jumps over the dog."
        );
    }

    #[test]
    fn whitespace_is_collapsed_and_trimmed() {
        assert_eq!(normalize_text("  lots \t of\u{a0}  space  "), "lots of space");
    }

    #[test]
    fn reference_markers_are_removed() {
        assert_eq!(
            normalize_text("Prior work [12] showed this [3]."),
            "Prior work showed this ."
        );
        assert_eq!(normalize_text("nested [1[2]] marker"), "nested marker");
        assert_eq!(normalize_text("keep [a1] and [ 4 ]"), "keep [a1] and [ 4 ]");
    }

    /// Step 2 leaves paragraph breaks alone, but the whitespace collapse then
    /// folds them; the result has no line breaks at all.
    #[test]
    fn paragraph_breaks_do_not_survive() {
        assert_eq!(normalize_text("First para.\n\nSecond para."), "First para. Second para.");
        assert_eq!(normalize_text("a\n\n\nb"), "a b");
    }

    /// At the lone-newline boundary only the isolated break is rewritten.
    #[test]
    fn lone_newline_boundary() {
        assert_eq!(join_wrapped_lines("a\nb"), "a b");
        assert_eq!(join_wrapped_lines("a\n\nb"), "a\n\nb");
        assert_eq!(join_wrapped_lines("a\n\nb\nc"), "a\n\nb c");
        assert_eq!(join_wrapped_lines("\na"), " a");
        assert_eq!(join_wrapped_lines("a\n"), "a ");
    }

    /// A hyphen before a paragraph break is not a wrapped word.
    #[test]
    fn hyphen_before_blank_line_is_kept() {
        assert_eq!(normalize_text("pre-\n\nfix"), "pre- fix");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "infor-\nmation [1] and\nmore [2][3]\n\nnext-\npara  ",
            "[1[2]] a [ [3] ]",
            "x [1] y",
            "word-\nword-\nword",
            "",
            "   \n\n  ",
        ];
        for sample in samples {
            let once = normalize_text(sample);
            assert_eq!(normalize_text(&once), once, "input: {sample:?}");
        }
    }

    #[test]
    fn chunks_by_character_count() {
        let chunks = chunk_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
        assert!(chunk_text("", 10).is_empty());
        assert_eq!(chunk_text("αβγ", 2), vec!["αβ", "γ"]);
        assert_eq!(chunk_text("ab", 0), vec!["a", "b"]);
    }
}
