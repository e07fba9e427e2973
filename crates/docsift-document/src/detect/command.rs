// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout model backed by an external detection command.
//
// The command is called once per page as
//
//     <program> [args...] --image <png> --conf <threshold> --iou <threshold>
//
// and must print a JSON array on stdout:
//
//     [{"class_name": "table", "bbox": [x1, y1, x2, y2], "confidence": 0.91}, ...]

use std::path::{Path, PathBuf};
use std::process::Command;

use docsift_core::error::{DocsiftError, Result};
use docsift_core::{BoundingBox, DetectionParams};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::RawDetection;
use super::model::LayoutModel;
use crate::image::processor::ImageProcessor;
use crate::raster::Page;

#[derive(Debug, Deserialize)]
struct CommandDetection {
    class_name: String,
    bbox: [f32; 4],
    confidence: f32,
}

impl From<CommandDetection> for RawDetection {
    fn from(det: CommandDetection) -> Self {
        let [x1, y1, x2, y2] = det.bbox;
        Self {
            label: det.class_name,
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence: det.confidence,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandLayoutModel {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLayoutModel {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the per-page flags (e.g. a script path).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn run(
        &self,
        image_path: &Path,
        page: usize,
        params: &DetectionParams,
    ) -> Result<Vec<RawDetection>> {
        let detection_error = |reason: String| DocsiftError::Detection { page, reason };

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--image")
            .arg(image_path)
            .arg("--conf")
            .arg(params.confidence_threshold.to_string())
            .arg("--iou")
            .arg(params.iou_threshold.to_string())
            .output()
            .map_err(|err| {
                detection_error(format!(
                    "failed to invoke {}: {err}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(detection_error(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        parse_detections(&output.stdout).map_err(|err| detection_error(err.to_string()))
    }
}

impl LayoutModel for CommandLayoutModel {
    #[instrument(skip_all, fields(page = page.number, program = %self.program.display()))]
    fn infer(&mut self, page: &Page, params: &DetectionParams) -> Result<Vec<RawDetection>> {
        let detections = match &page.image_path {
            Some(path) => self.run(path, page.number, params)?,
            None => {
                // The command needs a file; hand it a temporary PNG.
                let scratch = tempfile::Builder::new()
                    .prefix("docsift-page-")
                    .suffix(".png")
                    .tempfile()?;
                ImageProcessor::from_dynamic(page.image.clone()).save(scratch.path())?;
                self.run(scratch.path(), page.number, params)?
            }
        };
        debug!(count = detections.len(), "Detection command finished");
        Ok(detections)
    }
}

fn parse_detections(stdout: &[u8]) -> Result<Vec<RawDetection>> {
    let parsed: Vec<CommandDetection> = serde_json::from_slice(stdout)?;
    Ok(parsed.into_iter().map(RawDetection::from).collect())
}
