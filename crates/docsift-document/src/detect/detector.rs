// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region detector — runs the layout model on one page and turns its raw boxes
// into validated, indexed `Detection`s.

use std::sync::Arc;

use docsift_core::error::{DocsiftError, Result};
use docsift_core::{Detection, DetectionParams, RegionClass};
use tracing::{debug, info, instrument, warn};

use super::RawDetection;
use super::model::ModelPool;
use crate::raster::Page;

/// Detects text, table, and figure regions on a page.
pub struct RegionDetector {
    pool: Arc<ModelPool>,
    params: DetectionParams,
}

impl RegionDetector {
    pub fn new(pool: Arc<ModelPool>, params: DetectionParams) -> Self {
        Self { pool, params }
    }

    pub fn params(&self) -> DetectionParams {
        self.params
    }

    pub fn pool(&self) -> &Arc<ModelPool> {
        &self.pool
    }

    /// Detect the regions of `page`.
    ///
    /// Any failure of the model is reported as a detection error for this
    /// page (or an inference timeout); nothing is retried.
    #[instrument(skip_all, fields(page = page.number))]
    pub async fn detect(&self, page: Arc<Page>) -> Result<Vec<Detection>> {
        let number = page.number;
        let (width, height) = (page.width(), page.height());
        let raw = self
            .pool
            .infer(page, self.params)
            .await
            .map_err(|err| match err {
                DocsiftError::Detection { .. } | DocsiftError::InferenceTimeout(_) => err,
                other => DocsiftError::Detection {
                    page: number,
                    reason: other.to_string(),
                },
            })?;
        let detections = filter_detections(number, width, height, raw, &self.params);
        info!(count = detections.len(), "Regions detected");
        Ok(detections)
    }
}

/// Keep the model's boxes that are usable, in the model's own order.
///
/// Scores below the confidence threshold are dropped first. Each remaining
/// box is numbered by its position in that thresholded output, from zero.
/// Unknown class labels and boxes with no area left after clipping to the
/// page are dropped afterwards and leave gaps in the numbering, so artifact
/// names do not shift when a box is discarded.
pub fn filter_detections(
    page: usize,
    width: u32,
    height: u32,
    raw: Vec<RawDetection>,
    params: &DetectionParams,
) -> Vec<Detection> {
    let reported = raw.len();
    let mut kept = Vec::with_capacity(reported);
    let confident = raw
        .into_iter()
        .filter(|det| !det.confidence.is_nan() && det.confidence >= params.confidence_threshold);
    for (index, det) in confident.enumerate() {
        let Some(class) = RegionClass::from_label(&det.label) else {
            warn!(page, label = %det.label, "Unknown region class; skipped");
            continue;
        };
        if det.bbox.to_pixel_rect(width, height).is_none() {
            warn!(page, bbox = ?det.bbox, "Degenerate bounding box; skipped");
            continue;
        }
        kept.push(Detection {
            index,
            class,
            bbox: det.bbox,
            confidence: det.confidence,
        });
    }
    debug!(page, reported, kept = kept.len(), "Detections filtered");
    kept
}
