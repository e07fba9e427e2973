// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data files — CSV and XLSX uploads in, CSV exports out.
//
// An uploaded data file becomes a `Dataset` named after the file's base name.
// Empty cells are nulls and column kinds are inferred from the values, so
// float columns get rounded when the dataset is rendered as aligned text.

use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use docsift_codec::identifier_from_filename;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::{Cell, Column, ColumnKind, Dataset};
use tracing::{debug, info, instrument};

/// Extensions accepted by [`load_data_file`].
pub const DATA_FILE_EXTENSIONS: [&str; 2] = ["csv", "xlsx"];

/// A loaded data file and the identifier derived from its name.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    pub name: String,
    pub dataset: Dataset,
}

/// Load a CSV or XLSX file. The first row holds the column names; only the
/// first worksheet of a workbook is read.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_data_file(path: &Path) -> Result<DataFile> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DocsiftError::DataFile(format!("{} is not a file", path.display())))?;
    let name = identifier_from_filename(&file_name);
    if name.is_empty() {
        return Err(DocsiftError::DataFile(format!("{file_name:?} does not yield a usable name")));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let (header, rows) = match extension.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" => read_xlsx(path)?,
        _ => {
            return Err(DocsiftError::DataFile(format!(
                "{file_name}: expected one of {}",
                DATA_FILE_EXTENSIONS.join(", ")
            )));
        }
    };

    let dataset = infer_kinds(header, rows);
    info!(%name, columns = dataset.column_count(), rows = dataset.row_count(), "Data file loaded");
    Ok(DataFile { name, dataset })
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| unreadable(path, e))?;
    let header = reader
        .headers()
        .map_err(|e| unreadable(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| unreadable(path, e))?;
        rows.push(record.iter().map(non_empty).collect());
    }
    Ok((header, rows))
}

fn read_xlsx(path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(path, e))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DocsiftError::DataFile(format!("{} has no worksheets", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| unreadable(path, e))?;

    let mut rows = range.rows();
    let header = match rows.next() {
        Some(first) => first
            .iter()
            .enumerate()
            .map(|(index, value)| {
                spreadsheet_cell(value).unwrap_or_else(|| format!("Unnamed: {index}"))
            })
            .collect(),
        None => Vec::new(),
    };
    let body = rows.map(|row| row.iter().map(spreadsheet_cell).collect()).collect();
    debug!(%sheet, "Worksheet read");
    Ok((header, body))
}

fn unreadable(path: &Path, err: impl std::fmt::Display) -> DocsiftError {
    DocsiftError::DataFile(format!("{}: {err}", path.display()))
}

fn spreadsheet_cell(value: &Data) -> Cell {
    match value {
        Data::Empty => None,
        Data::String(text) => non_empty(text),
        Data::Int(number) => Some(number.to_string()),
        Data::Float(number) if number.is_nan() => None,
        Data::Float(number) => Some(number.to_string()),
        Data::Bool(flag) => Some(if *flag { "True" } else { "False" }.to_string()),
        other => Some(other.to_string()),
    }
}

fn non_empty(value: &str) -> Cell {
    (!value.is_empty()).then(|| value.to_string())
}

/// Type each column from its non-null values. An integer column with nulls
/// is a float column.
fn infer_kinds(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Dataset {
    let columns = header
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let values = rows.iter().map(|row| row.get(index).and_then(|c| c.as_deref()));
            Column {
                name,
                kind: column_kind(values),
            }
        })
        .collect();
    Dataset::new(columns, rows)
}

fn column_kind<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ColumnKind {
    let mut seen = false;
    let mut has_null = false;
    let mut integral = true;
    for value in values {
        let Some(value) = value else {
            has_null = true;
            continue;
        };
        let value = value.trim();
        seen = true;
        if value.parse::<i64>().is_ok() {
            continue;
        }
        if value.parse::<f64>().is_err() {
            return ColumnKind::Text;
        }
        integral = false;
    }
    match (seen, integral, has_null) {
        (false, _, _) => ColumnKind::Text,
        (true, true, false) => ColumnKind::Integer,
        _ => ColumnKind::Float,
    }
}

/// Write `dataset` to `<dir>/<name>.csv` with a header row. Nulls are
/// written as empty fields.
#[instrument(skip_all, fields(dir = %dir.display(), name = %name))]
pub fn export_csv(dir: &Path, name: &str, dataset: &Dataset) -> Result<PathBuf> {
    if name.is_empty() {
        return Err(DocsiftError::Config("an export needs a name".to_string()));
    }
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{name}.csv"));
    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| DocsiftError::Storage(format!("{}: {e}", path.display())))?;
    let write_err = |e: csv::Error| DocsiftError::Storage(format!("{}: {e}", path.display()));

    writer.write_record(dataset.column_names()).map_err(write_err)?;
    let width = dataset.column_count();
    for row in &dataset.rows {
        let fields = (0..width).map(|index| row.get(index).and_then(|c| c.as_deref()));
        let fields = fields.map(|field| field.unwrap_or(""));
        writer.write_record(fields).map_err(write_err)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = dataset.row_count(), "Dataset exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(v: &str) -> Cell {
        Some(v.to_string())
    }

    #[test]
    fn csv_columns_are_typed_and_named_after_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("growth rates.2023.csv");
        std::fs::write(&path, "year,rate,note,count\n2022,1.236,,4\n2023,,\"late, revised\",5\n")
            .expect("write");

        let loaded = load_data_file(&path).expect("load");
        assert_eq!(loaded.name, "growth_rates");
        let kinds: Vec<ColumnKind> = loaded.dataset.columns.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ColumnKind::Integer, ColumnKind::Float, ColumnKind::Text, ColumnKind::Integer]
        );
        assert_eq!(
            loaded.dataset.rows,
            vec![
                vec![cell("2022"), cell("1.236"), None, cell("4")],
                vec![cell("2023"), None, cell("late, revised"), cell("5")],
            ]
        );
    }

    #[test]
    fn integers_with_gaps_are_floats() {
        let values = [Some("1"), None, Some("3")];
        assert_eq!(column_kind(values.into_iter()), ColumnKind::Float);
        assert_eq!(column_kind([None, None].into_iter()), ColumnKind::Text);
        assert_eq!(column_kind([Some("1"), Some("x")].into_iter()), ColumnKind::Text);
    }

    #[test]
    fn loaded_floats_render_rounded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rates.csv");
        std::fs::write(&path, "rate\n1.236\n2\n").expect("write");
        let loaded = load_data_file(&path).expect("load");
        assert_eq!(docsift_codec::encode(&loaded.dataset), "rate  \n1.24  \n 2.0  ");
    }

    #[test]
    fn ragged_csv_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "a,b\n1,2,3\n").expect("write");
        assert!(matches!(load_data_file(&path), Err(DocsiftError::DataFile(_))));
    }

    #[test]
    fn other_formats_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ods = dir.path().join("sheet.ods");
        std::fs::write(&ods, b"whatever").expect("write");
        assert!(matches!(load_data_file(&ods), Err(DocsiftError::DataFile(_))));

        let broken = dir.path().join("sheet.xlsx");
        std::fs::write(&broken, b"not a zip archive").expect("write");
        assert!(matches!(load_data_file(&broken), Err(DocsiftError::DataFile(_))));
    }

    #[test]
    fn export_writes_nulls_as_empty_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dataset = Dataset::new(
            vec![Column::text("item"), Column::float("price")],
            vec![vec![cell("ink, blue"), None], vec![cell("paper")]],
        );
        let path = export_csv(&dir.path().join("res"), "supplies", &dataset).expect("export");
        assert_eq!(path, dir.path().join("res").join("supplies.csv"));
        let written = std::fs::read_to_string(&path).expect("read");
        assert_eq!(written, "item,price\n\"ink, blue\",\npaper,\n");

        assert!(export_csv(dir.path(), "", &dataset).is_err());
    }
}
