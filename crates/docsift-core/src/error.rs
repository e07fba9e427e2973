// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docsift.

use thiserror::Error;

/// Top-level error type for all docsift operations.
#[derive(Debug, Error)]
pub enum DocsiftError {
    // -- Input errors (rejected before the pipeline starts) --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("unreadable input: {0}")]
    UnreadableInput(String),

    #[error("data file could not be loaded: {0}")]
    DataFile(String),

    #[error("name already in use: {0}")]
    DuplicateName(String),

    // -- Detection --
    #[error("region detection failed on page {page}: {reason}")]
    Detection { page: usize, reason: String },

    #[error("inference timed out: {0}")]
    InferenceTimeout(String),

    // -- Codec --
    #[error("line {line_number} has {found} cells but the header has {expected}: {line:?}")]
    CodecMismatch {
        line_number: usize,
        line: String,
        expected: usize,
        found: usize,
    },

    // -- Document processing --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("table extraction failed: {0}")]
    TableExtraction(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no such region: {0}")]
    UnknownRegion(String),

    // -- Storage / persistence --
    #[error("storage error: {0}")]
    Storage(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification used to decide how far an error propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The document is rejected before any page is processed.
    Input,
    /// Fatal for one page only.
    Detection,
    /// Malformed edited text, surfaced to the editor.
    Codec,
    /// A collaborator (storage, OCR, inference, extractor) failed.
    External,
    /// Local I/O, configuration, or encoding trouble.
    Internal,
}

impl DocsiftError {
    /// Which part of the taxonomy this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedDocument(_)
            | Self::UnreadableInput(_)
            | Self::DataFile(_)
            | Self::DuplicateName(_) => ErrorClass::Input,
            Self::Detection { .. } => ErrorClass::Detection,
            Self::CodecMismatch { .. } => ErrorClass::Codec,
            Self::InferenceTimeout(_)
            | Self::Storage(_)
            | Self::OcrError(_)
            | Self::TableExtraction(_) => ErrorClass::External,
            Self::PdfError(_)
            | Self::ImageError(_)
            | Self::Config(_)
            | Self::UnknownRegion(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorClass::Internal,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocsiftError>;
