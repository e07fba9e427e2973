// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistence seams. Implementations live outside the core (see
// `docsift-store`); the pipeline only ever talks to these traits.

use crate::error::Result;
use crate::types::Dataset;

/// Stores a decoded table or figure dataset under an identifier.
///
/// Implementations must not retry on failure; they report
/// `DocsiftError::Storage` and let the caller decide.
pub trait DatasetSink {
    /// Append `dataset` to the table named `name`, creating it if needed.
    fn persist_dataset(&self, name: &str, dataset: &Dataset) -> Result<()>;
}

/// Stores the normalized text of a document as ordered chunks.
pub trait TextChunkSink {
    /// Record `chunks` (in order) for the document called `name`.
    fn persist_text_chunks(&self, name: &str, chunks: &[String]) -> Result<()>;
}
