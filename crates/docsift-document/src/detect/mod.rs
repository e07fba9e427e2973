// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region detection.
//
// A layout model is an injected capability with an explicit lifecycle: it is
// initialized once into a `ModelPool`, invoked many times through the pool
// (never more concurrently than the pool has instances), and released when the
// pool is released.

pub mod command;
pub mod detector;
pub mod model;

use docsift_core::BoundingBox;
use serde::{Deserialize, Serialize};

pub use command::CommandLayoutModel;
pub use detector::RegionDetector;
pub use model::{LayoutModel, ModelPool};

/// A box as reported by a layout model, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Class name as the model spells it.
    pub label: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
}
