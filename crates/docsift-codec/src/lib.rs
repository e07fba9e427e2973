// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-codec — text-side transforms.
//
// Provides the aligned-text table format used to edit extracted tables and
// figure data, the identifier sanitizer shared by tables and figures, and the
// normalizer applied to raw OCR output before it is stored.

pub mod identifier;
pub mod normalize;
pub mod tabular;

pub use identifier::{MAX_IDENTIFIER_CHARS, identifier_from_filename, sanitize_identifier};
pub use normalize::{chunk_text, normalize_text};
pub use tabular::{NULL_SENTINEL, decode, encode};
