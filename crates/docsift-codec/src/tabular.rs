// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Aligned-text table format — the editable serialization of table and figure
// datasets.
//
// A dataset is rendered as a whitespace-aligned block: one header line, one
// line per row. Every header and cell carries two trailing spaces before it is
// padded, so two or more consecutive whitespace characters always separate
// cells while a single space can live inside a value.
//
// Known limits of the format (kept for compatibility with text already edited
// in this layout):
//
// - a value containing two or more consecutive spaces splits into several
//   cells on decode;
// - an empty value renders as blanks only and disappears on decode;
// - leading and trailing whitespace of a value is lost;
// - a text value spelled exactly `None` decodes as null.
//
// All of these surface as a mismatch or a changed value, never as silent
// coercion of row shape.

use std::sync::LazyLock;

use docsift_core::error::{DocsiftError, Result};
use docsift_core::types::{Cell, Column, ColumnKind, Dataset};
use regex::Regex;
use tracing::{debug, instrument, warn};

/// Token standing in for a null cell.
pub const NULL_SENTINEL: &str = "None";

/// Appended to every header and cell before alignment.
const CELL_PADDING: &str = "  ";

/// Separates cells: any run of two or more whitespace characters.
static CELL_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("cell delimiter pattern is valid"));

// -- Encode -------------------------------------------------------------------

/// Render `dataset` as an aligned-text block.
///
/// Nulls become [`NULL_SENTINEL`], values of [`ColumnKind::Float`] columns are
/// rounded to two decimals, and each column is right-aligned to its widest
/// entry. Columns are joined with a single space and rows with `\n`. A row
/// shorter than the header is filled with nulls; extra cells are dropped.
#[instrument(skip_all, fields(columns = dataset.column_count(), rows = dataset.row_count()))]
pub fn encode(dataset: &Dataset) -> String {
    if dataset.columns.is_empty() {
        return String::new();
    }

    let header: Vec<String> = dataset
        .columns
        .iter()
        .map(|column| format!("{}{CELL_PADDING}", column.name))
        .collect();

    let body: Vec<Vec<String>> = dataset
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            if row.len() > dataset.columns.len() {
                warn!(
                    row_index,
                    cells = row.len(),
                    columns = dataset.columns.len(),
                    "Row has more cells than columns, extra cells not rendered"
                );
            }
            dataset
                .columns
                .iter()
                .enumerate()
                .map(|(col_index, column)| {
                    let cell = row.get(col_index).and_then(|c| c.as_deref());
                    format!("{}{CELL_PADDING}", render_cell(cell, column))
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            body.iter()
                .map(|row| row[col].chars().count())
                .chain(std::iter::once(header[col].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(body.len() + 1);
    lines.push(align_line(&header, &widths));
    for row in &body {
        lines.push(align_line(row, &widths));
    }

    debug!(lines = lines.len(), "Dataset encoded");
    lines.join("\n")
}

fn align_line(entries: &[String], widths: &[usize]) -> String {
    entries
        .iter()
        .zip(widths)
        .map(|(entry, &width)| format!("{entry:>width$}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stringify one cell according to its column's kind.
fn render_cell(cell: Option<&str>, column: &Column) -> String {
    let Some(value) = cell else {
        return NULL_SENTINEL.to_string();
    };
    match column.kind {
        ColumnKind::Float => match value.trim().parse::<f64>() {
            Ok(number) if number.is_nan() => NULL_SENTINEL.to_string(),
            Ok(number) => float_repr(round_to_cents(number)),
            Err(_) => value.to_string(),
        },
        ColumnKind::Text | ColumnKind::Integer => value.to_string(),
    }
}

/// Round the exact binary value to two decimals.
fn round_to_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Shortest representation that still reads as a float (`3` → `3.0`).
fn float_repr(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let repr = value.to_string();
    if repr.contains(['.', 'e', 'E']) {
        repr
    } else {
        format!("{repr}.0")
    }
}

// -- Decode -------------------------------------------------------------------

/// Parse an aligned-text block back into a dataset.
///
/// The first non-blank line is the header and every later line is a row.
/// Lines are trimmed and split on runs of two or more whitespace characters.
/// Blank lines before the header and after the last row are ignored, so a
/// trailing newline left by an editor is harmless; a blank line between rows
/// is a row with no cells. All decoded columns are [`ColumnKind::Text`].
///
/// A header name occurring more than once is suffixed with `_<position>` on
/// every occurrence, the first included: `["Name", "Name"]` decodes to
/// `["Name_0", "Name_1"]`. Existing stored tables use these names.
///
/// # Errors
///
/// Returns [`DocsiftError::CodecMismatch`] for the first row whose cell count
/// differs from the header's. `line_number` is 1-based within `text`.
#[instrument(skip_all, fields(text_len = text.len()))]
pub fn decode(text: &str) -> Result<Dataset> {
    let numbered: Vec<(usize, &str)> = text
        .split('\n')
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .collect();
    let end = numbered
        .iter()
        .rposition(|(_, line)| !is_blank(line))
        .map_or(0, |last| last + 1);
    let mut lines = numbered[..end]
        .iter()
        .copied()
        .skip_while(|(_, line)| is_blank(line));

    let Some((_, header_line)) = lines.next() else {
        debug!("Empty text decoded to empty dataset");
        return Ok(Dataset::default());
    };

    let headers = disambiguate_headers(tokenize(header_line));
    let expected = headers.len();

    let mut rows = Vec::new();
    for (line_number, line) in lines {
        let tokens = if is_blank(line) { Vec::new() } else { tokenize(line) };
        if tokens.len() != expected {
            warn!(line_number, expected, found = tokens.len(), "Row does not match header");
            return Err(DocsiftError::CodecMismatch {
                line_number,
                line: line.trim_end_matches('\r').to_string(),
                expected,
                found: tokens.len(),
            });
        }
        rows.push(tokens.into_iter().map(decode_cell).collect::<Vec<Cell>>());
    }

    debug!(columns = expected, rows = rows.len(), "Aligned text decoded");
    Ok(Dataset::from_text_columns(headers, rows))
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn tokenize(line: &str) -> Vec<String> {
    CELL_DELIMITER
        .split(line.trim())
        .map(str::to_string)
        .collect()
}

fn decode_cell(token: String) -> Cell {
    if token == NULL_SENTINEL { None } else { Some(token) }
}

fn disambiguate_headers(headers: Vec<String>) -> Vec<String> {
    headers
        .iter()
        .enumerate()
        .map(|(position, header)| {
            let occurrences = headers.iter().filter(|other| *other == header).count();
            if occurrences > 1 {
                format!("{header}_{position}")
            } else {
                header.clone()
            }
        })
        .collect()
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn split_cells(line: &str) -> Vec<String> {
        tokenize(line)
    }

    fn sample_table() -> Dataset {
        Dataset::new(
            vec![
                Column::text("Country"),
                Column::integer("Year"),
                Column::float("GDP per capita"),
            ],
            vec![
                vec![Some("New Zealand".into()), Some("2021".into()), Some("48801.689".into())],
                vec![Some("Chad".into()), Some("2021".into()), None],
                vec![Some("Iceland".into()), None, Some("68727.6".into())],
            ],
        )
    }

    /// The worked example: a float is rounded and a null becomes the sentinel.
    #[test]
    fn encodes_rounded_float_and_null() {
        let dataset = Dataset::new(
            vec![Column::float("A"), Column::text("B")],
            vec![vec![Some("1.236".into()), None]],
        );

        let text = encode(&dataset);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(split_cells(lines[0]), vec!["A", "B"]);
        assert_eq!(split_cells(lines[1]), vec!["1.24", "None"]);

        let decoded = decode(&text).unwrap();
        assert_eq!(decoded.column_names(), vec!["A", "B"]);
        assert_eq!(decoded.rows, vec![vec![Some("1.24".to_string()), None]]);
    }

    /// Every header and cell ends with the two-space marker and columns are
    /// padded to a common width.
    #[test]
    fn entries_are_padded_and_aligned() {
        let dataset = Dataset::from_text_columns(
            ["id", "label"],
            vec![vec![Some("1".into()), Some("first row".into())]],
        );
        let text = encode(&dataset);
        assert_eq!(text, "id       label  \n 1   first row  ");

        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert_eq!(widths[0], widths[1]);
    }

    #[test]
    fn float_rendering_matches_legacy_output() {
        let column = Column::float("x");
        assert_eq!(render_cell(Some("3"), &column), "3.0");
        assert_eq!(render_cell(Some("2.5"), &column), "2.5");
        assert_eq!(render_cell(Some("-0.004"), &column), "-0.0");
        assert_eq!(render_cell(Some("1.005"), &column), "1.0");
        assert_eq!(render_cell(Some("NaN"), &column), "None");
        assert_eq!(render_cell(Some("n/a"), &column), "n/a");
    }

    #[test]
    fn values_with_single_spaces_survive() {
        let text = encode(&sample_table());
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded.column_names(), vec!["Country", "Year", "GDP per capita"]);
        assert_eq!(decoded.rows[0][0].as_deref(), Some("New Zealand"));
        assert_eq!(decoded.rows[0][2].as_deref(), Some("48801.69"));
        assert_eq!(decoded.rows[1][2], None);
        assert_eq!(decoded.rows[2][1], None);
    }

    /// Encoding is stable after one round trip through the editor format.
    #[test]
    fn encode_is_stable_after_round_trip() {
        let first = encode(&sample_table());
        let second = encode(&decode(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_headers_are_all_suffixed() {
        let decoded = decode("Name  Name\nAda  Grace").unwrap();
        assert_eq!(decoded.column_names(), vec!["Name_0", "Name_1"]);
    }

    #[test]
    fn duplicate_suffix_uses_position_in_full_header() {
        let decoded = decode("Year  Value  Note  Value\n2020  1  x  2").unwrap();
        assert_eq!(decoded.column_names(), vec!["Year", "Value_1", "Note", "Value_3"]);
    }

    #[test]
    fn row_with_too_many_cells_is_reported() {
        let err = decode("A  B\n1  2\n3  4  5").unwrap_err();
        match err {
            DocsiftError::CodecMismatch {
                line_number,
                line,
                expected,
                found,
            } => {
                assert_eq!(line_number, 3);
                assert_eq!(line, "3  4  5");
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn row_with_too_few_cells_is_reported() {
        let err = decode("A  B  C\n1 2  3").unwrap_err();
        assert!(matches!(
            err,
            DocsiftError::CodecMismatch { line_number: 2, expected: 3, found: 2, .. }
        ));
    }

    /// A value holding a double space splits; this is the format's documented
    /// weakness and must be reported rather than repaired.
    #[test]
    fn embedded_double_space_is_a_mismatch() {
        let dataset = Dataset::from_text_columns(
            ["A", "B"],
            vec![vec![Some("two  spaces".into()), Some("x".into())]],
        );
        assert!(decode(&encode(&dataset)).is_err());
    }

    #[test]
    fn surrounding_blank_lines_are_ignored() {
        let decoded = decode("\nA  B\n1  2\n\n  \n").unwrap();
        assert_eq!(decoded.column_count(), 2);
        assert_eq!(decoded.row_count(), 1);
    }

    /// A blank line between rows is reported, not skipped.
    #[test]
    fn interior_blank_line_is_a_mismatch() {
        match decode("A  B\n1  2\n\n3  4") {
            Err(DocsiftError::CodecMismatch { line_number, line, expected, found }) => {
                assert_eq!(line_number, 3);
                assert_eq!(line, "");
                assert_eq!(expected, 2);
                assert_eq!(found, 0);
            }
            other => panic!("expected a mismatch, got {other:?}"),
        }
        assert!(decode("A\n\n1").is_err());
    }

    #[test]
    fn tabs_count_as_whitespace_runs() {
        let decoded = decode("A\t\tB\r\n1 \t2\r\n").unwrap();
        assert_eq!(decoded.column_names(), vec!["A", "B"]);
        assert_eq!(decoded.rows[0], vec![Some("1".to_string()), Some("2".to_string())]);
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(encode(&Dataset::default()), "");
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  \n \n").unwrap().is_empty());

        let header_only = Dataset::from_text_columns(["A", "B"], vec![]);
        let decoded = decode(&encode(&header_only)).unwrap();
        assert_eq!(decoded.column_names(), vec!["A", "B"]);
        assert_eq!(decoded.row_count(), 0);
    }

    #[test]
    fn short_rows_are_filled_with_nulls_on_encode() {
        let dataset = Dataset::from_text_columns(["A", "B"], vec![vec![Some("1".into())]]);
        let decoded = decode(&encode(&dataset)).unwrap();
        assert_eq!(decoded.rows, vec![vec![Some("1".to_string()), None]]);
    }

    #[test]
    fn wide_unicode_values_align_by_character() {
        let dataset = Dataset::from_text_columns(
            ["Städte", "Ω"],
            vec![vec![Some("Zürich".into()), Some("π".into())]],
        );
        let text = encode(&dataset);
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert_eq!(widths[0], widths[1]);
        assert_eq!(decode(&text).unwrap().rows[0][0].as_deref(), Some("Zürich"));
    }
}
