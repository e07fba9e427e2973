// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Review context — the editable state of one processed document.
//
// Created when a document has been processed and dropped by `reset`, which
// also clears the artifact directories. Tables and figures are edited as
// aligned text; nothing is decoded until it is persisted or explicitly
// decoded, and a decode error is handed back to the editor unchanged.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use docsift_codec::{
    chunk_text, decode, encode, identifier_from_filename, normalize_text, sanitize_identifier,
};
use docsift_core::error::{DocsiftError, Result};
use docsift_core::integrity::hash_bytes;
use docsift_core::traits::{DatasetSink, TextChunkSink};
use docsift_core::{Dataset, DocumentId, ExtractionFlags, RegionClass};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::artifacts::{ArtifactLayout, remove_artifact};
use crate::data::{export_csv, load_data_file};
use crate::extract::{TableStructureExtractor, extract_tables};
use crate::pipeline::DocumentResult;
use crate::scan::{TextRecognizer, recognize_pages};

/// One table or figure under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionEntry {
    pub crop_path: PathBuf,
    /// Sanitized identifier, also the storage table name.
    pub name: String,
    /// Aligned-text rendering of the data, as last edited.
    pub text: String,
}

impl RegionEntry {
    fn for_crop(crop_path: &Path) -> Self {
        Self {
            crop_path: crop_path.to_path_buf(),
            name: String::new(),
            text: String::new(),
        }
    }
}

pub struct DocumentContext {
    id: DocumentId,
    source: PathBuf,
    fingerprint: String,
    started_at: DateTime<Utc>,
    layout: ArtifactLayout,
    result: DocumentResult,
    text: String,
    tables: Vec<RegionEntry>,
    figures: Vec<RegionEntry>,
}

impl DocumentContext {
    /// Start reviewing `result`, produced from the upload at `source`.
    #[instrument(skip_all, fields(source = %source.display()))]
    pub fn new(source: &Path, layout: ArtifactLayout, result: DocumentResult) -> Result<Self> {
        let fingerprint = hash_bytes(&std::fs::read(source)?);
        let tables = result
            .table_crop_paths
            .iter()
            .map(|p| RegionEntry::for_crop(p))
            .collect();
        let figures = result
            .figure_crop_paths
            .iter()
            .map(|p| RegionEntry::for_crop(p))
            .collect();
        info!(%fingerprint, "Review context created");
        Ok(Self {
            id: result.document_id,
            source: source.to_path_buf(),
            fingerprint,
            started_at: Utc::now(),
            layout,
            result,
            text: String::new(),
            tables,
            figures,
        })
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// SHA-256 of the uploaded bytes.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn result(&self) -> &DocumentResult {
        &self.result
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the document text with the editor's version.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn entries(&self, class: RegionClass) -> &[RegionEntry] {
        match class {
            RegionClass::Table => &self.tables,
            RegionClass::Figure => &self.figures,
            RegionClass::Text => &[],
        }
    }

    fn entries_mut(&mut self, class: RegionClass) -> Result<&mut Vec<RegionEntry>> {
        match class {
            RegionClass::Table => Ok(&mut self.tables),
            RegionClass::Figure => Ok(&mut self.figures),
            RegionClass::Text => Err(DocsiftError::UnknownRegion(
                "text regions are edited as the document text".to_string(),
            )),
        }
    }

    fn entry_mut(&mut self, class: RegionClass, index: usize) -> Result<&mut RegionEntry> {
        self.entries_mut(class)?
            .get_mut(index)
            .ok_or_else(|| DocsiftError::UnknownRegion(format!("{class} {index}")))
    }

    fn entry(&self, class: RegionClass, index: usize) -> Result<&RegionEntry> {
        self.entries(class)
            .get(index)
            .ok_or_else(|| DocsiftError::UnknownRegion(format!("{class} {index}")))
    }

    /// OCR the text canvases and keep the normalized result.
    #[instrument(skip_all)]
    pub fn recognize_text(&mut self, recognizer: &dyn TextRecognizer) -> Result<&str> {
        let raw = recognize_pages(recognizer, &self.result.text_canvas_paths)?;
        self.text = normalize_text(&raw);
        Ok(&self.text)
    }

    /// Run table-structure extraction over every table crop.
    ///
    /// Crops whose extraction failed keep an empty entry; the failures are
    /// returned so they can be shown next to the crop.
    pub fn extract_tables(
        &mut self,
        extractor: &dyn TableStructureExtractor,
        flags: &ExtractionFlags,
    ) -> Vec<(PathBuf, String)> {
        let crops: Vec<PathBuf> = self.tables.iter().map(|t| t.crop_path.clone()).collect();
        let mut failures = Vec::new();
        for (entry, extracted) in self
            .tables
            .iter_mut()
            .zip(extract_tables(extractor, &crops, flags))
        {
            entry.name = extracted.name;
            entry.text = extracted.text;
            if let Some(failure) = extracted.failure {
                failures.push((extracted.crop_path, failure));
            }
        }
        failures
    }

    /// Rename an entry. Returns the sanitized identifier actually stored.
    pub fn set_name(&mut self, class: RegionClass, index: usize, raw: &str) -> Result<&str> {
        let entry = self.entry_mut(class, index)?;
        entry.name = sanitize_identifier(raw);
        Ok(&entry.name)
    }

    /// Store the editor's aligned text without decoding it.
    pub fn set_data_text(
        &mut self,
        class: RegionClass,
        index: usize,
        text: impl Into<String>,
    ) -> Result<()> {
        self.entry_mut(class, index)?.text = text.into();
        Ok(())
    }

    /// Decode an entry's aligned text. `None` when it has no data.
    pub fn decode(&self, class: RegionClass, index: usize) -> Result<Option<Dataset>> {
        let entry = self.entry(class, index)?;
        if entry.text.is_empty() {
            return Ok(None);
        }
        decode(&entry.text).map(Some)
    }

    /// Attach data to a figure and name the figure after the data file.
    ///
    /// The crop is renamed to `<identifier>.png` in the figures directory.
    /// A crop already holding that name belongs to another figure and is
    /// never overwritten.
    #[instrument(skip(self, dataset))]
    pub fn attach_figure_data(
        &mut self,
        index: usize,
        data_file_name: &str,
        dataset: &Dataset,
    ) -> Result<&RegionEntry> {
        let name = identifier_from_filename(data_file_name);
        if name.is_empty() {
            return Err(DocsiftError::Config(format!(
                "{data_file_name:?} does not yield a usable figure name"
            )));
        }
        let target = self.layout.region_dir(RegionClass::Figure).join(format!("{name}.png"));
        let entry = self.entry_mut(RegionClass::Figure, index)?;
        if target != entry.crop_path && target.exists() {
            return Err(DocsiftError::DuplicateName(format!("{name}.png")));
        }
        std::fs::rename(&entry.crop_path, &target)?;
        entry.crop_path = target;
        entry.name = name;
        entry.text = encode(dataset);
        Ok(entry)
    }

    /// Load a CSV or XLSX file and attach it to a figure.
    pub fn attach_figure_file(&mut self, index: usize, path: &Path) -> Result<&RegionEntry> {
        let loaded = load_data_file(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.attach_figure_data(index, &file_name, &loaded.dataset)
    }

    /// Decode an entry and write it to `<data dir>/<name>.csv`.
    ///
    /// `None` when the entry has no data.
    pub fn export_csv(&self, class: RegionClass, index: usize) -> Result<Option<PathBuf>> {
        let Some(dataset) = self.decode(class, index)? else {
            return Ok(None);
        };
        let name = &self.entry(class, index)?.name;
        if name.is_empty() {
            return Err(DocsiftError::Config(format!(
                "{class} {index} needs a name before it can be exported"
            )));
        }
        export_csv(&self.layout.data_dir(), name, &dataset).map(Some)
    }

    /// Drop an entry, delete its crop and any CSV exported under its name.
    #[instrument(skip(self))]
    pub fn delete(&mut self, class: RegionClass, index: usize) -> Result<RegionEntry> {
        let data_dir = self.layout.data_dir();
        let entries = self.entries_mut(class)?;
        if index >= entries.len() {
            return Err(DocsiftError::UnknownRegion(format!("{class} {index}")));
        }
        let entry = entries.remove(index);
        if !remove_artifact(&entry.crop_path)? {
            warn!(path = %entry.crop_path.display(), "Crop was already gone");
        }
        if !entry.name.is_empty() {
            remove_artifact(&data_dir.join(format!("{}.csv", entry.name)))?;
        }
        Ok(entry)
    }

    /// Decode an entry and hand it to `sink` under its name.
    ///
    /// Returns `false` without touching the sink when the entry has no data.
    pub fn persist(
        &self,
        class: RegionClass,
        index: usize,
        sink: &dyn DatasetSink,
    ) -> Result<bool> {
        let Some(dataset) = self.decode(class, index)? else {
            return Ok(false);
        };
        let name = &self.entry(class, index)?.name;
        if name.is_empty() {
            return Err(DocsiftError::Config(format!(
                "{class} {index} needs a name before it can be saved"
            )));
        }
        sink.persist_dataset(name, &dataset)?;
        info!(%class, index, name = %name, rows = dataset.row_count(), "Dataset persisted");
        Ok(true)
    }

    /// Persist the document text in chunks of at most `chunk_chars`
    /// characters, under the upload's file name. Returns the chunk count.
    pub fn persist_text(&self, sink: &dyn TextChunkSink, chunk_chars: usize) -> Result<usize> {
        let chunks = chunk_text(&self.text, chunk_chars);
        if chunks.is_empty() {
            return Ok(0);
        }
        let name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.to_string());
        sink.persist_text_chunks(&name, &chunks)?;
        Ok(chunks.len())
    }

    /// Text, then every table, then every figure, each followed by a blank
    /// line.
    pub fn combined_text(&self) -> String {
        let mut all = format!("{}\n\n", self.text);
        for entry in self.tables.iter().chain(&self.figures) {
            all.push_str(&entry.text);
            all.push_str("\n\n");
        }
        all
    }

    /// End the review and clear every artifact directory.
    #[instrument(skip_all, fields(document = %self.id))]
    pub fn reset(self) -> Result<()> {
        self.layout.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use docsift_core::{Cell, Column};

    #[derive(Default)]
    struct Recorder {
        datasets: RefCell<Vec<(String, Dataset)>>,
        chunks: RefCell<Vec<(String, Vec<String>)>>,
    }

    impl DatasetSink for Recorder {
        fn persist_dataset(&self, name: &str, dataset: &Dataset) -> Result<()> {
            self.datasets.borrow_mut().push((name.to_string(), dataset.clone()));
            Ok(())
        }
    }

    impl TextChunkSink for Recorder {
        fn persist_text_chunks(&self, name: &str, chunks: &[String]) -> Result<()> {
            self.chunks.borrow_mut().push((name.to_string(), chunks.to_vec()));
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        layout: ArtifactLayout,
        context: DocumentContext,
    }

    /// A context with two tables and one figure crop on disk.
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ArtifactLayout::new(dir.path().join("upload"));
        layout.ensure().expect("ensure");

        let source = layout.uploads_dir().join("report.pdf");
        std::fs::write(&source, b"%PDF-1.5 fake").expect("write");

        let mut result = DocumentResult::default();
        for index in [0, 2] {
            let path = layout.crop_path(1, RegionClass::Table, index);
            std::fs::write(&path, b"png").expect("write");
            result.table_crop_paths.push(path);
        }
        let figure = layout.crop_path(1, RegionClass::Figure, 1);
        std::fs::write(&figure, b"png").expect("write");
        result.figure_crop_paths.push(figure);

        let context = DocumentContext::new(&source, layout.clone(), result).expect("context");
        Fixture {
            _dir: dir,
            layout,
            context,
        }
    }

    fn cell(v: &str) -> Cell {
        Some(v.to_string())
    }

    #[test]
    fn entries_start_empty_per_crop() {
        let fx = fixture();
        assert_eq!(fx.context.entries(RegionClass::Table).len(), 2);
        assert_eq!(fx.context.entries(RegionClass::Figure).len(), 1);
        assert!(fx.context.entries(RegionClass::Text).is_empty());
        assert_eq!(fx.context.fingerprint(), hash_bytes(b"%PDF-1.5 fake"));
        assert!(fx.context.decode(RegionClass::Table, 0).expect("decode").is_none());
    }

    #[test]
    fn names_are_sanitized() {
        let mut fx = fixture();
        let name = fx
            .context
            .set_name(RegionClass::Table, 1, "Table 4. Costs\nper unit")
            .expect("rename")
            .to_string();
        assert_eq!(name, "Table_4_Costsper_unit");
        assert_eq!(fx.context.entries(RegionClass::Table)[1].name, name);
    }

    #[test]
    fn edited_text_is_decoded_and_persisted() {
        let mut fx = fixture();
        fx.context.set_name(RegionClass::Table, 0, "costs").expect("rename");
        fx.context
            .set_data_text(RegionClass::Table, 0, "item  cost\nink pad  None\npaper  4.50")
            .expect("edit");

        let sink = Recorder::default();
        assert!(fx.context.persist(RegionClass::Table, 0, &sink).expect("persist"));
        let saved = sink.datasets.borrow();
        assert_eq!(saved[0].0, "costs");
        assert_eq!(
            saved[0].1.rows,
            vec![vec![cell("ink pad"), None], vec![cell("paper"), cell("4.50")]]
        );
    }

    #[test]
    fn empty_entry_is_not_persisted() {
        let fx = fixture();
        let sink = Recorder::default();
        assert!(!fx.context.persist(RegionClass::Table, 1, &sink).expect("persist"));
        assert!(sink.datasets.borrow().is_empty());
    }

    /// Malformed edits go back to the editor; nothing reaches the sink.
    #[test]
    fn mismatched_edit_is_surfaced() {
        let mut fx = fixture();
        fx.context.set_name(RegionClass::Table, 0, "t").expect("rename");
        fx.context
            .set_data_text(RegionClass::Table, 0, "a  b\n1  2  3")
            .expect("edit");
        let sink = Recorder::default();
        let err = fx.context.persist(RegionClass::Table, 0, &sink).err().expect("should fail");
        assert!(matches!(err, DocsiftError::CodecMismatch { line_number: 2, .. }));
        assert!(sink.datasets.borrow().is_empty());
    }

    #[test]
    fn unnamed_entry_cannot_be_saved() {
        let mut fx = fixture();
        fx.context.set_data_text(RegionClass::Table, 0, "a\n1").expect("edit");
        let sink = Recorder::default();
        assert!(fx.context.persist(RegionClass::Table, 0, &sink).is_err());
    }

    #[test]
    fn delete_removes_entry_and_crop() {
        let mut fx = fixture();
        let crop = fx.context.entries(RegionClass::Table)[0].crop_path.clone();
        let removed = fx.context.delete(RegionClass::Table, 0).expect("delete");
        assert_eq!(removed.crop_path, crop);
        assert!(!crop.exists());
        assert_eq!(fx.context.entries(RegionClass::Table).len(), 1);
        assert!(matches!(
            fx.context.delete(RegionClass::Table, 5),
            Err(DocsiftError::UnknownRegion(_))
        ));
    }

    #[test]
    fn attaching_figure_data_renames_the_crop() {
        let mut fx = fixture();
        let old = fx.context.entries(RegionClass::Figure)[0].crop_path.clone();
        let dataset = Dataset::new(
            vec![Column::text("year"), Column::float("growth")],
            vec![vec![cell("2023"), cell("1.236")]],
        );
        let entry = fx
            .context
            .attach_figure_data(0, "growth rates.2023.csv", &dataset)
            .expect("attach")
            .clone();
        assert_eq!(entry.name, "growth_rates");
        assert_eq!(
            entry.crop_path,
            fx.layout.region_dir(RegionClass::Figure).join("growth_rates.png")
        );
        assert!(entry.crop_path.is_file());
        assert!(!old.exists());

        let decoded = fx.context.decode(RegionClass::Figure, 0).expect("decode").expect("data");
        assert_eq!(decoded.rows, vec![vec![cell("2023"), cell("1.24")]]);
    }

    /// Two figures whose data files share a stem cannot both take the name.
    #[test]
    fn attaching_a_taken_name_keeps_both_crops() {
        let mut fx = fixture();
        let second = fx.layout.crop_path(2, RegionClass::Figure, 0);
        std::fs::write(&second, b"second png").expect("write");
        let mut result = fx.context.result().clone();
        result.figure_crop_paths.push(second.clone());
        let source = fx.context.source().to_path_buf();
        let mut context =
            DocumentContext::new(&source, fx.layout.clone(), result).expect("context");

        let dataset = Dataset::new(vec![Column::text("x")], vec![vec![cell("1")]]);
        let first = context
            .attach_figure_data(0, "sales.csv", &dataset)
            .expect("attach")
            .crop_path
            .clone();
        let err = context
            .attach_figure_data(1, "sales.xlsx", &dataset)
            .err()
            .expect("should fail");

        assert!(matches!(err, DocsiftError::DuplicateName(ref n) if n == "sales.png"));
        assert_eq!(std::fs::read(&first).expect("read"), b"png");
        assert!(second.is_file());
        assert_eq!(context.entries(RegionClass::Figure)[1].crop_path, second);
        assert!(context.entries(RegionClass::Figure)[1].name.is_empty());

        // Re-attaching to the figure that already owns the name is fine.
        context.attach_figure_data(0, "sales.csv", &dataset).expect("reattach");
    }

    #[test]
    fn figure_file_is_loaded_and_attached() {
        let mut fx = fixture();
        let data = fx.layout.uploads_dir().join("Unit costs.v2.csv");
        std::fs::write(&data, "item,cost\nink,1.236\npaper,\n").expect("write");

        let entry = fx.context.attach_figure_file(0, &data).expect("attach").clone();
        assert_eq!(entry.name, "Unit_costs");
        assert_eq!(entry.text, " item   cost  \n  ink   1.24  \npaper   None  ");
    }

    #[test]
    fn export_and_delete_manage_the_csv() {
        let mut fx = fixture();
        assert_eq!(fx.context.export_csv(RegionClass::Table, 0).expect("export"), None);

        fx.context.set_data_text(RegionClass::Table, 0, "a  b\n1  None").expect("edit");
        assert!(fx.context.export_csv(RegionClass::Table, 0).is_err());

        fx.context.set_name(RegionClass::Table, 0, "totals").expect("rename");
        let path = fx
            .context
            .export_csv(RegionClass::Table, 0)
            .expect("export")
            .expect("written");
        assert_eq!(path, fx.layout.data_dir().join("totals.csv"));
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "a,b\n1,\n");

        fx.context.delete(RegionClass::Table, 0).expect("delete");
        assert!(!path.exists());
    }

    #[test]
    fn text_is_chunked_under_the_upload_name() {
        let mut fx = fixture();
        fx.context.set_text("abcdefghij");
        let sink = Recorder::default();
        assert_eq!(fx.context.persist_text(&sink, 4).expect("persist"), 3);
        let saved = sink.chunks.borrow();
        assert_eq!(saved[0].0, "report.pdf");
        assert_eq!(saved[0].1, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn combined_text_layout() {
        let mut fx = fixture();
        fx.context.set_text("body");
        fx.context.set_data_text(RegionClass::Table, 0, "t0").expect("edit");
        fx.context.set_data_text(RegionClass::Figure, 0, "f0").expect("edit");
        assert_eq!(fx.context.combined_text(), "body\n\nt0\n\n\n\nf0\n\n");
    }

    #[test]
    fn text_class_has_no_entries() {
        let mut fx = fixture();
        assert!(matches!(
            fx.context.set_name(RegionClass::Text, 0, "x"),
            Err(DocsiftError::UnknownRegion(_))
        ));
    }

    #[test]
    fn reset_clears_artifacts() {
        let fx = fixture();
        let crop = fx.context.entries(RegionClass::Table)[0].crop_path.clone();
        fx.context.reset().expect("reset");
        assert!(!crop.exists());
        assert!(fx.layout.region_dir(RegionClass::Table).is_dir());
    }
}
