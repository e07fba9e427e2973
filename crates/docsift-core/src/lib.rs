// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift — Core types, configuration, and error definitions shared across all
// crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod integrity;
pub mod traits;
pub mod types;

pub use config::{ExtractionFlags, PipelineConfig};
pub use error::{DocsiftError, ErrorClass};
pub use types::*;
