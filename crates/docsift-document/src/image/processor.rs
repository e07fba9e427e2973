// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — load, crop, and save page images. Operates on in-memory
// images using the `image` crate.

use std::path::Path;

use docsift_core::PixelRect;
use docsift_core::error::{DocsiftError, Result};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info, instrument};

/// A single in-memory image.
///
/// Crops are returned as new processors, so calls chain:
///
/// ```ignore
/// ImageProcessor::open("page-1.png")?
///     .crop(rect)
///     .save("page_1_table_0.png")?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            DocsiftError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        debug!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Cut out `rect`. The rectangle is clamped to the image bounds, so a
    /// rectangle computed for this image is copied pixel for pixel.
    #[instrument(
        skip(self),
        fields(x = rect.x, y = rect.y, width = rect.width, height = rect.height)
    )]
    pub fn crop(&self, rect: PixelRect) -> Self {
        let img_w = self.image.width();
        let img_h = self.image.height();

        let safe_x = rect.x.min(img_w.saturating_sub(1));
        let safe_y = rect.y.min(img_h.saturating_sub(1));
        let safe_w = rect.width.min(img_w - safe_x);
        let safe_h = rect.height.min(img_h - safe_y);

        debug!(safe_x, safe_y, safe_w, safe_h, "Cropping image");
        Self {
            image: self.image.crop_imm(safe_x, safe_y, safe_w, safe_h),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Write the image as PNG, whatever the extension of `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.image
            .save_with_format(path.as_ref(), ImageFormat::Png)
            .map_err(|err| {
                DocsiftError::ImageError(format!(
                    "failed to save image to {}: {}",
                    path.as_ref().display(),
                    err
                ))
            })?;
        info!(path = %path.as_ref().display(), "Image written");
        Ok(())
    }
}
