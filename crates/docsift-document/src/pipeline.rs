// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document pipeline — rasterize, detect, and composite every page.
//
// Pages are independent. Each page runs as its own task; a gate sized to the
// model pool keeps at most that many pages in flight, so a page only starts
// once a model instance could serve it and cancellation takes effect before
// the next page starts. Results are reassembled in page order, then detection
// order within a page, whatever order the tasks finish in.
//
// A page that fails is recorded in `DocumentResult::failures` and the rest of
// the document carries on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use docsift_core::error::{DocsiftError, Result};
use docsift_core::{DetectionParams, DocumentId, PipelineConfig};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use crate::artifacts::ArtifactLayout;
use crate::composite::{PageArtifacts, compose, write_artifacts};
use crate::detect::{ModelPool, RegionDetector};
use crate::raster::{Page, rasterize_input};

/// Cooperative cancellation shared between the caller and the pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop before any page that has not started yet.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A page that made it through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub number: usize,
    pub width: u32,
    pub height: u32,
    pub detections: usize,
}

/// A page that did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub page: usize,
    pub reason: String,
}

/// Aggregate result for one document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentResult {
    pub document_id: DocumentId,
    pub pages: Vec<PageSummary>,
    pub annotated_image_paths: Vec<PathBuf>,
    pub text_canvas_paths: Vec<PathBuf>,
    pub table_crop_paths: Vec<PathBuf>,
    pub figure_crop_paths: Vec<PathBuf>,
    pub failures: Vec<PageFailure>,
    /// Set when the run stopped early; the lists above hold the pages that
    /// completed before that.
    pub cancelled: bool,
}

impl DocumentResult {
    fn push_page(&mut self, summary: PageSummary, artifacts: PageArtifacts) {
        self.pages.push(summary);
        self.annotated_image_paths.push(artifacts.annotated_path);
        self.text_canvas_paths.push(artifacts.canvas_path);
        self.table_crop_paths.extend(artifacts.table_paths);
        self.figure_crop_paths.extend(artifacts.figure_paths);
    }
}

enum PageOutcome {
    Completed(PageSummary, PageArtifacts),
    Failed(PageFailure),
    Skipped,
}

/// Runs the whole pipeline for one document at a time.
pub struct DocumentProcessor {
    detector: Arc<RegionDetector>,
    layout: ArtifactLayout,
    dpi: u32,
}

impl DocumentProcessor {
    pub fn new(pool: Arc<ModelPool>, config: &PipelineConfig) -> Self {
        Self {
            detector: Arc::new(RegionDetector::new(pool, DetectionParams::from(config))),
            layout: ArtifactLayout::new(&config.artifact_root),
            dpi: config.raster_dpi,
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Rasterize `input` and process every page.
    ///
    /// Unsupported or unreadable input is rejected here, before any page is
    /// processed.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn process_file(&self, input: &Path, cancel: &CancelToken) -> Result<DocumentResult> {
        self.layout.ensure()?;
        let input = input.to_path_buf();
        let pages_dir = self.layout.pages_dir();
        let dpi = self.dpi;
        let pages = tokio::task::spawn_blocking(move || rasterize_input(&input, &pages_dir, dpi))
            .await
            .map_err(|err| DocsiftError::Io(std::io::Error::other(err)))??;
        self.process_pages(pages, cancel).await
    }

    /// Detect and composite already-rasterized pages.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub async fn process_pages(
        &self,
        pages: Vec<Page>,
        cancel: &CancelToken,
    ) -> Result<DocumentResult> {
        self.layout.ensure()?;
        let gate = Arc::new(Semaphore::new(self.detector.pool().size()));

        let mut handles = Vec::with_capacity(pages.len());
        for page in pages {
            let number = page.number;
            let task = tokio::spawn(process_page(
                Arc::clone(&self.detector),
                self.layout.clone(),
                page,
                Arc::clone(&gate),
                cancel.clone(),
            ));
            handles.push((number, task));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (number, task) in handles {
            let outcome = task.await.unwrap_or_else(|err| {
                PageOutcome::Failed(PageFailure {
                    page: number,
                    reason: format!("page task aborted: {err}"),
                })
            });
            outcomes.push((number, outcome));
        }
        outcomes.sort_by_key(|(number, _)| *number);

        let mut result = DocumentResult::default();
        for (_, outcome) in outcomes {
            match outcome {
                PageOutcome::Completed(summary, artifacts) => result.push_page(summary, artifacts),
                PageOutcome::Failed(failure) => result.failures.push(failure),
                PageOutcome::Skipped => result.cancelled = true,
            }
        }

        info!(
            completed = result.pages.len(),
            failed = result.failures.len(),
            tables = result.table_crop_paths.len(),
            figures = result.figure_crop_paths.len(),
            cancelled = result.cancelled,
            "Document processed"
        );
        Ok(result)
    }
}

async fn process_page(
    detector: Arc<RegionDetector>,
    layout: ArtifactLayout,
    page: Page,
    gate: Arc<Semaphore>,
    cancel: CancelToken,
) -> PageOutcome {
    let number = page.number;
    let Ok(_permit) = gate.acquire_owned().await else {
        return PageOutcome::Skipped;
    };
    if cancel.is_cancelled() {
        return PageOutcome::Skipped;
    }

    let page = Arc::new(page);
    let detections = match detector.detect(Arc::clone(&page)).await {
        Ok(detections) => detections,
        Err(err) => {
            warn!(page = number, error = %err, "Page failed detection");
            return PageOutcome::Failed(PageFailure {
                page: number,
                reason: err.to_string(),
            });
        }
    };

    let summary = PageSummary {
        number,
        width: page.width(),
        height: page.height(),
        detections: detections.len(),
    };
    let written = tokio::task::spawn_blocking(move || {
        write_artifacts(&layout, compose(&page, &detections))
    })
    .await;

    match written {
        Ok(Ok(artifacts)) => PageOutcome::Completed(summary, artifacts),
        Ok(Err(err)) => {
            warn!(page = number, error = %err, "Page artifacts could not be written");
            PageOutcome::Failed(PageFailure {
                page: number,
                reason: err.to_string(),
            })
        }
        Err(err) => PageOutcome::Failed(PageFailure {
            page: number,
            reason: format!("compositing task aborted: {err}"),
        }),
    }
}
