// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table-structure extraction bridge.
//
// Recovering rows and columns from a table crop (ruling detection, cell
// merging, OCR of each cell) is done by an external extractor. This module
// only calls it and turns what comes back into editable aligned text.

use std::path::{Path, PathBuf};
use std::process::Command;

use docsift_codec::{encode, sanitize_identifier};
use docsift_core::error::{DocsiftError, Result};
use docsift_core::{Cell, Dataset, ExtractionFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Name used when the extractor finds a table without a title.
pub const UNTITLED_TABLE: &str = "Table";

/// One table recovered from a crop. The first row holds the column headers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedGrid {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl ExtractedGrid {
    /// Promote the first row to column names. A missing header cell is named
    /// `None`, as it would be rendered.
    pub fn into_dataset(self) -> Dataset {
        let mut rows = self.rows.into_iter();
        let Some(header) = rows.next() else {
            return Dataset::default();
        };
        let names = header
            .into_iter()
            .map(|cell| cell.unwrap_or_else(|| docsift_codec::NULL_SENTINEL.to_string()));
        Dataset::from_text_columns(names, rows.collect())
    }
}

/// Recovers table structure from a cropped table image.
pub trait TableStructureExtractor {
    /// Tables found in `crop`, best match first. Empty when there is none.
    fn extract(&self, crop: &Path, flags: &ExtractionFlags) -> Result<Vec<ExtractedGrid>>;
}

/// Editable state of one table crop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub crop_path: PathBuf,
    /// Sanitized identifier; empty when no table was found.
    pub name: String,
    /// Aligned-text rendering; empty when no table was found.
    pub text: String,
    /// Why extraction failed, if it did.
    pub failure: Option<String>,
}

/// Extract every crop in order.
///
/// A crop without a table gets an empty name and text. A crop whose
/// extraction fails gets the same plus the failure; the remaining crops are
/// still extracted.
#[instrument(skip_all, fields(crops = crops.len()))]
pub fn extract_tables(
    extractor: &dyn TableStructureExtractor,
    crops: &[PathBuf],
    flags: &ExtractionFlags,
) -> Vec<TableEntry> {
    let entries: Vec<TableEntry> = crops
        .iter()
        .map(|crop| match extractor.extract(crop, flags) {
            Ok(grids) => table_entry(crop, grids),
            Err(err) => {
                warn!(crop = %crop.display(), error = %err, "Table extraction failed");
                TableEntry {
                    crop_path: crop.clone(),
                    name: String::new(),
                    text: String::new(),
                    failure: Some(err.to_string()),
                }
            }
        })
        .collect();
    info!(
        found = entries.iter().filter(|e| !e.text.is_empty()).count(),
        "Tables extracted"
    );
    entries
}

fn table_entry(crop: &Path, grids: Vec<ExtractedGrid>) -> TableEntry {
    let Some(grid) = grids.into_iter().next() else {
        debug!(crop = %crop.display(), "No table found in crop");
        return TableEntry {
            crop_path: crop.to_path_buf(),
            name: String::new(),
            text: String::new(),
            failure: None,
        };
    };
    let name = match grid.title.as_deref() {
        Some(title) => sanitize_identifier(title),
        None => UNTITLED_TABLE.to_string(),
    };
    TableEntry {
        crop_path: crop.to_path_buf(),
        name,
        text: encode(&grid.into_dataset()),
        failure: None,
    }
}

/// Extractor backed by an external command.
///
/// Called as `<program> [args...] --image <crop>` plus `--implicit-rows`,
/// `--implicit-columns`, and `--borderless` for each flag that is set. It must
/// print a JSON array of `{"title": string|null, "rows": [[string|null]]}`.
#[derive(Debug, Clone)]
pub struct CommandTableExtractor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTableExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl TableStructureExtractor for CommandTableExtractor {
    #[instrument(skip_all, fields(crop = %crop.display()))]
    fn extract(&self, crop: &Path, flags: &ExtractionFlags) -> Result<Vec<ExtractedGrid>> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg("--image").arg(crop);
        if flags.implicit_rows {
            command.arg("--implicit-rows");
        }
        if flags.implicit_columns {
            command.arg("--implicit-columns");
        }
        if flags.borderless_tables {
            command.arg("--borderless");
        }

        let output = command.output().map_err(|err| {
            DocsiftError::TableExtraction(format!(
                "failed to invoke {}: {err}",
                self.program.display()
            ))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocsiftError::TableExtraction(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        serde_json::from_slice(&output.stdout).map_err(|err| {
            DocsiftError::TableExtraction(format!("malformed extractor output: {err}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use docsift_codec::decode;

    struct Canned(HashMap<PathBuf, Result<Vec<ExtractedGrid>>>);

    impl TableStructureExtractor for Canned {
        fn extract(&self, crop: &Path, _flags: &ExtractionFlags) -> Result<Vec<ExtractedGrid>> {
            match self.0.get(crop) {
                Some(Ok(grids)) => Ok(grids.clone()),
                Some(Err(err)) => Err(DocsiftError::TableExtraction(err.to_string())),
                None => Ok(Vec::new()),
            }
        }
    }

    fn cell(value: &str) -> Cell {
        Some(value.to_string())
    }

    #[test]
    fn first_row_becomes_header() {
        let grid = ExtractedGrid {
            title: Some("Table 2. Results\nby region".into()),
            rows: vec![
                vec![cell("Region"), cell("Share")],
                vec![cell("North East"), None],
            ],
        };
        let entry = table_entry(Path::new("t.png"), vec![grid]);
        assert_eq!(entry.name, "Table_2_Resultsby_region");

        let dataset = decode(&entry.text).expect("decode");
        assert_eq!(dataset.column_names(), vec!["Region", "Share"]);
        assert_eq!(dataset.rows, vec![vec![cell("North East"), None]]);
    }

    #[test]
    fn untitled_and_missing_tables() {
        let extractor = Canned(HashMap::from([
            (
                PathBuf::from("a.png"),
                Ok(vec![ExtractedGrid {
                    title: None,
                    rows: vec![vec![cell("x")], vec![cell("1")]],
                }]),
            ),
            (PathBuf::from("b.png"), Ok(Vec::new())),
            (
                PathBuf::from("c.png"),
                Err(DocsiftError::TableExtraction("tesseract missing".into())),
            ),
        ]));
        let crops = [PathBuf::from("a.png"), PathBuf::from("b.png"), PathBuf::from("c.png")];
        let entries = extract_tables(&extractor, &crops, &ExtractionFlags::default());

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, UNTITLED_TABLE);
        assert!(!entries[0].text.is_empty());
        assert_eq!((entries[1].name.as_str(), entries[1].text.as_str()), ("", ""));
        assert!(entries[1].failure.is_none());
        assert!(entries[2].failure.as_deref().is_some_and(|f| f.contains("tesseract missing")));
        assert_eq!(entries[2].crop_path, PathBuf::from("c.png"));
    }

    #[test]
    fn empty_grid_renders_as_empty_text() {
        let entry = table_entry(
            Path::new("t.png"),
            vec![ExtractedGrid {
                title: Some("Empty".into()),
                rows: Vec::new(),
            }],
        );
        assert_eq!(entry.name, "Empty");
        assert_eq!(entry.text, "");
    }

    #[test]
    fn parses_extractor_json() {
        let json = r#"[{"title": null, "rows": [["a", "b"], ["1", null]]}, {"rows": []}]"#;
        let grids: Vec<ExtractedGrid> = serde_json::from_str(json).expect("parse");
        assert_eq!(grids.len(), 2);
        assert_eq!(grids[0].rows[1], vec![cell("1"), None]);
        assert!(grids[1].title.is_none());
    }

    #[test]
    fn missing_program_is_extraction_error() {
        let extractor = CommandTableExtractor::new("/nonexistent/table-extractor");
        let err = extractor
            .extract(Path::new("crop.png"), &ExtractionFlags::default())
            .err()
            .expect("should fail");
        assert!(matches!(err, DocsiftError::TableExtraction(_)));
    }
}
