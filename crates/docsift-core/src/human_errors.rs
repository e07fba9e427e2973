// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editor-facing error messages.
//
// Every technical error is mapped to a plain sentence plus what the person
// editing the extraction should do next. Nothing here schedules a retry; the
// core never retries on its own.

use crate::error::DocsiftError;

/// Severity of an error from the editor's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The editor has to change something (fix a line, pick another file).
    ActionRequired,
    /// An external service misbehaved; trying again later may help.
    ServiceProblem,
    /// Cannot be fixed from the editor.
    Permanent,
}

/// A readable error with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What to try next.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `DocsiftError` into a `HumanError`.
pub fn humanize_error(err: &DocsiftError) -> HumanError {
    match err {
        DocsiftError::UnsupportedDocument(detail) => HumanError {
            message: "This type of file can't be processed.".into(),
            suggestion: format!("Upload a PDF, PNG, or JPEG instead. (File type: {detail})"),
            severity: Severity::ActionRequired,
        },

        DocsiftError::UnreadableInput(detail) => HumanError {
            message: "The file could not be read.".into(),
            suggestion: format!("The file may be damaged. Try exporting it again. ({detail})"),
            severity: Severity::ActionRequired,
        },

        DocsiftError::Detection { page, reason } => HumanError {
            message: format!("Regions on page {page} could not be detected."),
            suggestion: format!(
                "The other pages were still processed. Check the detection model setup. ({reason})"
            ),
            severity: Severity::Permanent,
        },

        DocsiftError::InferenceTimeout(detail) => HumanError {
            message: "The detection model took too long to answer.".into(),
            suggestion: format!("Try processing the document again later. ({detail})"),
            severity: Severity::ServiceProblem,
        },

        DocsiftError::CodecMismatch {
            line_number,
            expected,
            found,
            ..
        } => HumanError {
            message: format!(
                "Line {line_number} has {found} values but the header has {expected}."
            ),
            suggestion: "Separate values with at least two spaces, keep single spaces inside \
                         a value, and write None for an empty cell."
                .into(),
            severity: Severity::ActionRequired,
        },

        DocsiftError::Storage(detail) => HumanError {
            message: "The data could not be saved.".into(),
            suggestion: format!(
                "Check that the database is reachable, then save again. ({detail})"
            ),
            severity: Severity::ServiceProblem,
        },

        DocsiftError::OcrError(detail) => HumanError {
            message: "Text recognition failed.".into(),
            suggestion: format!("Check that the OCR tools are installed. ({detail})"),
            severity: Severity::ServiceProblem,
        },

        DocsiftError::TableExtraction(detail) => HumanError {
            message: "The table structure could not be read.".into(),
            suggestion: format!(
                "Check the table extractor setup, or type the table in by hand. ({detail})"
            ),
            severity: Severity::ServiceProblem,
        },

        DocsiftError::DataFile(detail) => HumanError {
            message: "The data file could not be loaded.".into(),
            suggestion: format!("Upload a CSV or XLSX file with a header row. ({detail})"),
            severity: Severity::ActionRequired,
        },

        DocsiftError::DuplicateName(detail) => HumanError {
            message: "Another table or figure already uses that name.".into(),
            suggestion: format!("Pick a different name. ({detail})"),
            severity: Severity::ActionRequired,
        },

        DocsiftError::Config(detail) => HumanError {
            message: "The settings are not valid.".into(),
            suggestion: detail.clone(),
            severity: Severity::ActionRequired,
        },

        DocsiftError::UnknownRegion(detail) => HumanError {
            message: "That table or figure is no longer part of this document.".into(),
            suggestion: format!("Reload the list and pick it again. ({detail})"),
            severity: Severity::ActionRequired,
        },

        DocsiftError::PdfError(detail) | DocsiftError::ImageError(detail) => HumanError {
            message: "The page images could not be produced.".into(),
            suggestion: format!("Try a different copy of the document. ({detail})"),
            severity: Severity::Permanent,
        },

        DocsiftError::Io(io_err) => HumanError {
            message: "A file could not be read or written.".into(),
            suggestion: format!(
                "Check the output directory's permissions and free space. ({io_err})"
            ),
            severity: Severity::Permanent,
        },

        DocsiftError::Serialization(err) => HumanError {
            message: "Internal data could not be encoded.".into(),
            suggestion: format!("{err}"),
            severity: Severity::Permanent,
        },
    }
}
