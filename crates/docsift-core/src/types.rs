// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for docsift.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one processed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Infer document type from the extension of `path`.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// What a detected region contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionClass {
    Text,
    Table,
    Figure,
}

impl RegionClass {
    /// Label used by the detector and in artifact file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Table => "table",
            Self::Figure => "figure",
        }
    }

    /// Parse a detector label. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "table" => Some(Self::Table),
            "figure" => Some(Self::Figure),
            _ => None,
        }
    }
}

impl std::fmt::Display for RegionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned box in page pixel coordinates, `(x1, y1)` top-left and
/// `(x2, y2)` bottom-right (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Integer pixel rectangle inside a `page_width` x `page_height` page.
    ///
    /// Coordinates are truncated towards zero and clipped to the page. Returns
    /// `None` when nothing of the box is left.
    pub fn to_pixel_rect(&self, page_width: u32, page_height: u32) -> Option<PixelRect> {
        let clip = |v: f32, max: u32| -> u32 {
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v as u32).min(max)
            }
        };
        let x1 = clip(self.x1, page_width);
        let y1 = clip(self.y1, page_height);
        let x2 = clip(self.x2, page_width);
        let y2 = clip(self.y2, page_height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(PixelRect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

/// A clipped, non-empty pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One classified region reported by the detector for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Position in the detector's output for this page.
    pub index: usize,
    pub class: RegionClass,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Thresholds handed to a detection capability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.35,
            iou_threshold: 0.7,
        }
    }
}

impl From<&crate::config::PipelineConfig> for DetectionParams {
    fn from(config: &crate::config::PipelineConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        }
    }
}

/// How the values of a column were typed when the dataset was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    #[default]
    Text,
    Integer,
    Float,
}

/// A named dataset column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Text,
        }
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Float,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Integer,
        }
    }
}

/// A cell is a string or an explicit null.
pub type Cell = Option<String>;

/// Rows and columns of an extracted table or of the data behind a figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    /// Build a dataset whose columns are all [`ColumnKind::Text`].
    pub fn from_text_columns<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Cell>>,
    ) -> Self {
        Self {
            columns: names.into_iter().map(Column::text).collect(),
            rows,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_kind_from_extension() {
        assert_eq!(DocumentKind::from_extension("PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension("jpeg"), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_extension("docx"), None);
        assert_eq!(
            DocumentKind::from_path(std::path::Path::new("/tmp/scan.Png")),
            Some(DocumentKind::Png)
        );
    }

    #[test]
    fn region_labels_round_trip() {
        for class in [RegionClass::Text, RegionClass::Table, RegionClass::Figure] {
            assert_eq!(RegionClass::from_label(class.as_str()), Some(class));
        }
        assert_eq!(RegionClass::from_label("Table "), Some(RegionClass::Table));
        assert_eq!(RegionClass::from_label("caption"), None);
    }

    #[test]
    fn pixel_rect_truncates_and_clips() {
        let bbox = BoundingBox::new(10.7, 10.2, 50.9, 30.0);
        assert_eq!(
            bbox.to_pixel_rect(100, 100),
            Some(PixelRect { x: 10, y: 10, width: 40, height: 20 })
        );

        let overhanging = BoundingBox::new(-5.0, 90.0, 120.0, 140.0);
        assert_eq!(
            overhanging.to_pixel_rect(100, 100),
            Some(PixelRect { x: 0, y: 90, width: 100, height: 10 })
        );
    }

    #[test]
    fn degenerate_boxes_have_no_pixels() {
        assert!(BoundingBox::new(10.0, 10.0, 10.0, 30.0).to_pixel_rect(100, 100).is_none());
        assert!(BoundingBox::new(200.0, 0.0, 300.0, 10.0).to_pixel_rect(100, 100).is_none());
        assert!(BoundingBox::new(30.0, 30.0, 10.0, 10.0).to_pixel_rect(100, 100).is_none());
    }

    #[test]
    fn region_class_serializes_lowercase() {
        let json = serde_json::to_string(&RegionClass::Figure).unwrap();
        assert_eq!(json, "\"figure\"");
    }
}
