// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocsiftError, Result};

/// Flags forwarded verbatim to the external table-structure extractor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFlags {
    /// Let the extractor infer row separators that are not drawn.
    pub implicit_rows: bool,
    /// Let the extractor infer column separators that are not drawn.
    pub implicit_columns: bool,
    /// Look for tables without any ruling lines.
    pub borderless_tables: bool,
}

/// Persistent pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Detections scoring below this are dropped (default 0.35).
    pub confidence_threshold: f32,
    /// IoU passed to the detector's own non-max suppression (default 0.7).
    pub iou_threshold: f32,
    /// Table-structure extraction flags.
    pub extraction: ExtractionFlags,
    /// Root directory for every artifact written while processing a document.
    pub artifact_root: PathBuf,
    /// Resolution used when rasterizing PDF pages.
    pub raster_dpi: u32,
    /// Number of detection model instances (and so concurrent inferences).
    pub detection_workers: usize,
    /// Maximum characters per persisted text chunk.
    pub text_chunk_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.35,
            iou_threshold: 0.7,
            extraction: ExtractionFlags::default(),
            artifact_root: PathBuf::from("upload"),
            raster_dpi: 200,
            detection_workers: 1,
            text_chunk_chars: 10_000,
        }
    }
}

impl PipelineConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(DocsiftError::Config(format!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(DocsiftError::Config(format!(
                "IoU threshold must be within [0, 1], got {}",
                self.iou_threshold
            )));
        }
        if self.detection_workers == 0 {
            return Err(DocsiftError::Config(
                "at least one detection worker is required".to_string(),
            ));
        }
        if self.raster_dpi == 0 {
            return Err(DocsiftError::Config("raster DPI must be positive".to_string()));
        }
        if self.text_chunk_chars == 0 {
            return Err(DocsiftError::Config(
                "text chunk size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a config file written by [`PipelineConfig::save`]. Missing fields
    /// fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Persist the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
