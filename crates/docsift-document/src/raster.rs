// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterization — turn an uploaded document into one image per page.
//
// PDFs are rendered by poppler's `pdftoppm`; PNG and JPEG uploads are a single
// page as-is. Anything else is rejected before the pipeline starts.

use std::path::{Path, PathBuf};
use std::process::Command;

use docsift_core::DocumentKind;
use docsift_core::error::{DocsiftError, Result};
use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::pdf::reader::PdfReader;

/// One rasterized page. Immutable once produced.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub image: DynamicImage,
    /// File the image was loaded from, if it lives on disk.
    pub image_path: Option<PathBuf>,
}

impl Page {
    pub fn new(number: usize, image: DynamicImage) -> Self {
        Self {
            number,
            image,
            image_path: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Converts an input document into ordered page images.
pub trait Rasterizer {
    fn rasterize(&self, input: &Path) -> Result<Vec<Page>>;
}

/// Renders PDF pages to PNG with the `pdftoppm` binary (poppler-utils).
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    pages_dir: PathBuf,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(pages_dir: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            dpi,
        }
    }

    /// Delete `page-*.png` left over from an earlier render.
    fn clear_previous_render(&self) -> Result<()> {
        for (_, path) in rendered_pages(&self.pages_dir)? {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}

impl Rasterizer for PdftoppmRasterizer {
    #[instrument(skip_all, fields(input = %input.display(), dpi = self.dpi))]
    fn rasterize(&self, input: &Path) -> Result<Vec<Page>> {
        let expected = PdfReader::open(input)?.page_count();
        if expected == 0 {
            return Err(DocsiftError::UnreadableInput(format!(
                "{} has no pages",
                input.display()
            )));
        }

        std::fs::create_dir_all(&self.pages_dir)?;
        self.clear_previous_render()?;

        info!(expected, "Rendering PDF pages");
        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(input)
            .arg(self.pages_dir.join("page"))
            .output()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => DocsiftError::PdfError(
                    "pdftoppm not found (install poppler-utils)".to_string(),
                ),
                _ => DocsiftError::Io(err),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocsiftError::PdfError(format!(
                "pdftoppm failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let rendered = rendered_pages(&self.pages_dir)?;
        if rendered.len() != expected {
            warn!(
                expected,
                rendered = rendered.len(),
                "pdftoppm produced an unexpected number of pages"
            );
        }

        rendered
            .into_iter()
            .map(|(number, path)| {
                let image = ImageProcessor::open(&path)?.into_dynamic();
                Ok(Page {
                    number,
                    image,
                    image_path: Some(path),
                })
            })
            .collect()
    }
}

/// `page-<n>.png` files in `dir`, ordered by page number.
///
/// pdftoppm zero-pads the number to the width of the last page number, so
/// the digits are parsed rather than sorted as text.
fn rendered_pages(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let number = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix("page-"))
            .and_then(|rest| rest.strip_suffix(".png"))
            .and_then(|digits| digits.parse::<usize>().ok());
        if let Some(number) = number {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    debug!(count = pages.len(), dir = %dir.display(), "Rendered pages found");
    Ok(pages)
}

/// A PNG or JPEG upload: the file itself is the only page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRasterizer;

impl Rasterizer for ImageRasterizer {
    #[instrument(skip_all, fields(input = %input.display()))]
    fn rasterize(&self, input: &Path) -> Result<Vec<Page>> {
        let image = ImageProcessor::open(input)
            .map_err(|err| DocsiftError::UnreadableInput(err.to_string()))?
            .into_dynamic();
        Ok(vec![Page {
            number: 1,
            image,
            image_path: Some(input.to_path_buf()),
        }])
    }
}

/// Rasterize `input`, choosing the backend from its extension.
///
/// Unknown extensions are rejected with `UnsupportedDocument` and missing
/// files with `UnreadableInput`, before anything is written.
pub fn rasterize_input(input: &Path, pages_dir: &Path, dpi: u32) -> Result<Vec<Page>> {
    let kind = DocumentKind::from_path(input).ok_or_else(|| {
        DocsiftError::UnsupportedDocument(
            input
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("no extension")
                .to_string(),
        )
    })?;
    if !input.is_file() {
        return Err(DocsiftError::UnreadableInput(format!(
            "{} does not exist",
            input.display()
        )));
    }

    let pages = if kind.is_raster() {
        ImageRasterizer.rasterize(input)?
    } else {
        PdftoppmRasterizer::new(pages_dir, dpi).rasterize(input)?
    };
    info!(pages = pages.len(), kind = kind.mime_type(), "Document rasterized");
    Ok(pages)
}
