// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract OCR via the command line.

use std::path::Path;
use std::process::Command;

use docsift_core::error::{DocsiftError, Result};
use tracing::{debug, instrument};

use super::TextRecognizer;

/// Runs `tesseract <image> stdout -l <language>`.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    language: String,
}

impl TesseractRecognizer {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl TextRecognizer for TesseractRecognizer {
    #[instrument(skip(self), fields(language = %self.language))]
    fn recognize(&self, image_path: &Path) -> Result<String> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => DocsiftError::OcrError(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ),
                _ => DocsiftError::Io(err),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocsiftError::OcrError(format!(
                "tesseract failed on {}: {}",
                image_path.display(),
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.len(), "Tesseract finished");
        Ok(text)
    }
}
