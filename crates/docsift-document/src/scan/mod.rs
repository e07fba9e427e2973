// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition over the reconstructed text canvases.
//
// Two backends: the system `tesseract` binary, and the pure-Rust `ocrs`
// engine behind the `ocr` feature.

#[cfg(feature = "ocr")]
pub mod ocr;
pub mod tesseract;

use std::path::{Path, PathBuf};

use docsift_core::error::Result;
use tracing::{info, instrument};

/// Recognizes the text in a page image.
pub trait TextRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<String>;
}

/// Recognize each image in order and concatenate the results.
///
/// The output is raw OCR text; run it through the normalizer before storing
/// it.
#[instrument(skip_all, fields(pages = images.len()))]
pub fn recognize_pages(recognizer: &dyn TextRecognizer, images: &[PathBuf]) -> Result<String> {
    let mut text = String::new();
    for image in images {
        text.push_str(&recognizer.recognize(image)?);
    }
    info!(chars = text.chars().count(), "Pages recognized");
    Ok(text)
}
