// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-document — from an uploaded document to reviewable region artifacts.
//
// Rasterizes PDFs and images into pages, detects text/table/figure regions on
// each page with a pooled layout model, composites every page into an
// annotated overlay, a text-only canvas, and table/figure crops, and keeps the
// per-document review state (table extraction, OCR, edits, data files,
// persistence).

pub mod artifacts;
pub mod composite;
pub mod data;
pub mod detect;
pub mod extract;
pub mod image;
pub mod pdf;
pub mod pipeline;
pub mod raster;
pub mod review;
pub mod scan;

pub use artifacts::{ArtifactLayout, remove_artifact};
pub use composite::{ComposedPage, PageArtifacts, compose, write_artifacts};
pub use data::{DATA_FILE_EXTENSIONS, DataFile, export_csv, load_data_file};
pub use detect::{CommandLayoutModel, LayoutModel, ModelPool, RawDetection, RegionDetector};
pub use extract::{
    CommandTableExtractor, ExtractedGrid, TableEntry, TableStructureExtractor, extract_tables,
};
pub use crate::image::processor::ImageProcessor;
pub use pdf::reader::PdfReader;
pub use pipeline::{CancelToken, DocumentProcessor, DocumentResult, PageFailure, PageSummary};
pub use raster::{ImageRasterizer, Page, PdftoppmRasterizer, Rasterizer, rasterize_input};
pub use review::{DocumentContext, RegionEntry};
pub use scan::tesseract::TesseractRecognizer;
pub use scan::{TextRecognizer, recognize_pages};

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrEngine;
