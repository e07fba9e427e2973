// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-store — SQLite persistence for reviewed tables, figure data, and
// document text.

pub mod sqlite;

pub use sqlite::SqliteStore;
