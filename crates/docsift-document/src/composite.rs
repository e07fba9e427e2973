// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region compositor — turns one page's detections into artifacts.
//
// For every page three kinds of output are produced:
//
// - an annotated copy of the page with each detection outlined in its class
//   colour (review only);
// - a white canvas the size of the page into which the pixels of every text
//   region are copied at their original position, later regions overwriting
//   earlier ones where they overlap;
// - a standalone crop for every table and figure, in detection order.

use std::path::PathBuf;

use docsift_core::error::Result;
use docsift_core::{Detection, PixelRect, RegionClass};
use image::{DynamicImage, Rgb, RgbImage, imageops};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::artifacts::ArtifactLayout;
use crate::image::processor::ImageProcessor;
use crate::raster::Page;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Outline thickness on the annotated overlay, in pixels.
const OUTLINE_PX: u32 = 3;
/// Height of the coloured class tab drawn above each box.
const TAB_HEIGHT_PX: u32 = 12;
const TAB_WIDTH_PX: u32 = 48;

/// Class labels use a 3x5 bitmap font drawn at twice its size.
const GLYPH_WIDTH: u32 = 3;
const GLYPH_SCALE: u32 = 2;

/// Rows of a 3x5 glyph, most significant of the low three bits on the left.
/// Only the letters of the class names are defined.
fn glyph(letter: char) -> [u8; 5] {
    match letter {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        _ => [0; 5],
    }
}

fn class_colour(class: RegionClass) -> Rgb<u8> {
    match class {
        RegionClass::Text => Rgb([31, 119, 180]),
        RegionClass::Table => Rgb([44, 160, 44]),
        RegionClass::Figure => Rgb([214, 39, 40]),
    }
}

/// A table or figure cut out of its page.
#[derive(Debug, Clone)]
pub struct RegionCrop {
    pub detection: Detection,
    pub image: DynamicImage,
}

/// Everything the compositor derives from one page, still in memory.
#[derive(Debug, Clone)]
pub struct ComposedPage {
    pub page: usize,
    pub annotated: RgbImage,
    pub canvas: RgbImage,
    pub tables: Vec<RegionCrop>,
    pub figures: Vec<RegionCrop>,
}

/// Paths of the artifacts written for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageArtifacts {
    pub page: usize,
    pub annotated_path: PathBuf,
    pub canvas_path: PathBuf,
    pub table_paths: Vec<PathBuf>,
    pub figure_paths: Vec<PathBuf>,
}

/// Compose `detections` (in the order given) over `page`.
///
/// Detections whose box does not overlap the page are skipped; the detector
/// has already dropped those, so for its output the number of crops always
/// equals the number of table and figure detections.
#[instrument(skip_all, fields(page = page.number, detections = detections.len()))]
pub fn compose(page: &Page, detections: &[Detection]) -> ComposedPage {
    let (width, height) = (page.width(), page.height());
    let source = ImageProcessor::from_dynamic(page.image.clone());
    let mut annotated = source.as_dynamic().to_rgb8();
    let mut canvas = RgbImage::from_pixel(width, height, WHITE);
    let mut tables = Vec::new();
    let mut figures = Vec::new();

    for detection in detections {
        let Some(rect) = detection.bbox.to_pixel_rect(width, height) else {
            continue;
        };
        annotate(&mut annotated, rect, detection.class);

        match detection.class {
            RegionClass::Text => {
                let block = source.crop(rect).into_dynamic().to_rgb8();
                imageops::replace(&mut canvas, &block, i64::from(rect.x), i64::from(rect.y));
            }
            RegionClass::Table | RegionClass::Figure => {
                let crop = RegionCrop {
                    detection: detection.clone(),
                    image: source.crop(rect).into_dynamic(),
                };
                if detection.class == RegionClass::Table {
                    tables.push(crop);
                } else {
                    figures.push(crop);
                }
            }
        }
    }

    debug!(tables = tables.len(), figures = figures.len(), "Page composed");
    ComposedPage {
        page: page.number,
        annotated,
        canvas,
        tables,
        figures,
    }
}

/// Outline `rect` and put a labelled class tab on its top edge.
fn annotate(image: &mut RgbImage, rect: PixelRect, class: RegionClass) {
    let colour = class_colour(class);
    for inset in 0..OUTLINE_PX {
        let (w, h) = (
            rect.width.saturating_sub(2 * inset),
            rect.height.saturating_sub(2 * inset),
        );
        if w == 0 || h == 0 {
            break;
        }
        let outline = Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(image, outline, colour);
    }

    let tab_y = rect.y.saturating_sub(TAB_HEIGHT_PX);
    let tab = Rect::at(rect.x as i32, tab_y as i32)
        .of_size(TAB_WIDTH_PX.min(rect.width), TAB_HEIGHT_PX.min(rect.height + rect.y - tab_y));
    draw_filled_rect_mut(image, tab, colour);
    draw_label(image, tab, &class.as_str().to_uppercase());
}

/// Write `label` in white inside `tab`. Glyphs that do not fit are cut off.
fn draw_label(image: &mut RgbImage, tab: Rect, label: &str) {
    let scale = GLYPH_SCALE as i32;
    let advance = (GLYPH_WIDTH as i32 + 1) * scale;
    let top = tab.top() + scale / 2;
    for (position, letter) in label.chars().enumerate() {
        let left = tab.left() + scale + position as i32 * advance;
        for (row, bits) in glyph(letter).into_iter().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if bits & (0b100 >> column) == 0 {
                    continue;
                }
                let x = left + column as i32 * scale;
                let y = top + row as i32 * scale;
                if x + scale - 1 > tab.right() || y + scale - 1 > tab.bottom() {
                    continue;
                }
                let block = Rect::at(x, y).of_size(GLYPH_SCALE, GLYPH_SCALE);
                draw_filled_rect_mut(image, block, WHITE);
            }
        }
    }
}

/// Write a composed page to its artifact paths.
#[instrument(skip_all, fields(page = composed.page))]
pub fn write_artifacts(layout: &ArtifactLayout, composed: ComposedPage) -> Result<PageArtifacts> {
    let page = composed.page;

    let annotated_path = layout.annotated_path(page);
    ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(composed.annotated))
        .save(&annotated_path)?;

    let canvas_path = layout.canvas_path(page);
    ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(composed.canvas)).save(&canvas_path)?;

    let write_crops = |crops: Vec<RegionCrop>| -> Result<Vec<PathBuf>> {
        crops
            .into_iter()
            .map(|crop| {
                let path = layout.crop_path(page, crop.detection.class, crop.detection.index);
                ImageProcessor::from_dynamic(crop.image).save(&path)?;
                Ok(path)
            })
            .collect()
    };
    let table_paths = write_crops(composed.tables)?;
    let figure_paths = write_crops(composed.figures)?;

    Ok(PageArtifacts {
        page,
        annotated_path,
        canvas_path,
        table_paths,
        figure_paths,
    })
}
