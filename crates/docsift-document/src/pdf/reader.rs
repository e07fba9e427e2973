// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — opens an uploaded PDF with `lopdf` to check that it parses and
// to learn how many pages the rasterizer should produce.

use std::path::Path;

use docsift_core::error::{DocsiftError, Result};
use lopdf::Document;
use tracing::{debug, info, instrument};

/// A parsed PDF document.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Open a PDF from the filesystem.
    ///
    /// A file that does not parse is an input error: the document is rejected
    /// before any page is processed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            DocsiftError::UnreadableInput(format!(
                "failed to open {}: {}",
                path_ref.display(),
                err
            ))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{Object, dictionary};

    /// Serialize a PDF with `pages` empty A4 pages.
    pub(crate) fn blank_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("serialize test PDF");
        out
    }

    fn write_pdf(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).expect("write");
        path
    }

    #[test]
    fn counts_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_pdf(dir.path(), "paper.pdf", &blank_pdf(3));
        let reader = PdfReader::open(&path).expect("open");
        assert_eq!(reader.page_count(), 3);
    }

    #[test]
    fn garbage_is_unreadable_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_pdf(dir.path(), "notes.pdf", b"definitely not a pdf");
        let err = PdfReader::open(&path).err().expect("should fail");
        assert!(matches!(err, DocsiftError::UnreadableInput(_)));
    }
}
