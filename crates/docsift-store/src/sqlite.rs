// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SQLite-backed dataset and text store.
//
// Every reviewed table or figure dataset becomes a SQL table of its own, named
// by its identifier, with one TEXT column per dataset column. Saving the same
// identifier again appends rows. Document text is kept as ordered chunks
// under a `texts` row.

use chrono::Utc;
use rusqlite::{Connection, params, params_from_iter};
use tracing::{debug, info, instrument, warn};

use docsift_core::error::{DocsiftError, Result};
use docsift_core::traits::{DatasetSink, TextChunkSink};
use docsift_core::{Cell, Dataset};

/// SQLite schema for document text.
const CREATE_TEXT_TABLES_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS texts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS text_chunks (
        texts_id INTEGER NOT NULL REFERENCES texts(id) ON DELETE CASCADE,
        chunk_order INTEGER NOT NULL,
        content TEXT NOT NULL,
        PRIMARY KEY (texts_id, chunk_order)
    );
"#;

/// Table names used by the store itself.
const RESERVED_TABLES: [&str; 2] = ["texts", "text_chunks"];

fn storage(context: &str) -> impl Fn(rusqlite::Error) -> DocsiftError + '_ {
    move |e| DocsiftError::Storage(format!("{context}: {e}"))
}

/// Double-quote an identifier for use in SQL.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Dataset and text store backed by a SQLite database.
///
/// All methods are synchronous because `rusqlite` does not support async
/// natively. In an async context, wrap calls in `tokio::task::spawn_blocking`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(storage("open"))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(storage("WAL pragma"))?;
        let store = Self::init(conn)?;
        info!("dataset store opened");
        Ok(store)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage("open in-memory"))?;
        let store = Self::init(conn)?;
        debug!("in-memory dataset store opened");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(storage("foreign_keys pragma"))?;
        conn.execute_batch(CREATE_TEXT_TABLES_SQL)
            .map_err(storage("create text tables"))?;
        Ok(Self { conn })
    }

    fn check_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(DocsiftError::Storage("dataset name is empty".to_string()));
        }
        if RESERVED_TABLES.contains(&name) || name.starts_with("sqlite_") {
            return Err(DocsiftError::Storage(format!(
                "{name:?} is reserved by the store"
            )));
        }
        Ok(())
    }

    /// Append `dataset` to the table `name`, creating it on first use.
    ///
    /// Null cells are stored as SQL NULL. Rows shorter than the header are
    /// completed with NULLs.
    #[instrument(skip(self, dataset), fields(rows = dataset.row_count()))]
    pub fn append_dataset(&self, name: &str, dataset: &Dataset) -> Result<()> {
        Self::check_name(name)?;
        if dataset.columns.is_empty() {
            return Err(DocsiftError::Storage(format!("dataset {name:?} has no columns")));
        }

        let table = quote_identifier(name);
        let columns: Vec<String> = dataset
            .columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect();
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {table} ({})",
            columns
                .iter()
                .map(|c| format!("{c} TEXT"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let insert = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(storage("begin transaction"))?;
        tx.execute(&create, []).map_err(storage("create table"))?;
        {
            let mut stmt = tx.prepare(&insert).map_err(storage("prepare insert"))?;
            let width = columns.len();
            for (row_number, row) in dataset.rows.iter().enumerate() {
                if row.len() > width {
                    warn!(row_number, cells = row.len(), width, "Extra cells not stored");
                }
                let values = (0..width).map(|i| row.get(i).and_then(Cell::as_deref));
                stmt.execute(params_from_iter(values))
                    .map_err(storage("insert row"))?;
            }
        }
        tx.commit().map_err(storage("commit"))?;

        info!(name, "dataset appended");
        Ok(())
    }

    /// Read the whole table `name` back. Every column is text.
    #[instrument(skip(self))]
    pub fn read_dataset(&self, name: &str) -> Result<Dataset> {
        Self::check_name(name)?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_identifier(name)))
            .map_err(storage("prepare read_dataset"))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = names.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Option<String>>(i))
                    .collect::<rusqlite::Result<Vec<Cell>>>()
            })
            .map_err(storage("query read_dataset"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(storage("collect rows"))?;

        debug!(rows = rows.len(), "dataset read");
        Ok(Dataset::from_text_columns(names, rows))
    }

    /// Drop the table `name` if it exists.
    #[instrument(skip(self))]
    pub fn drop_dataset(&self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        self.conn
            .execute(&format!("DROP TABLE IF EXISTS {}", quote_identifier(name)), [])
            .map_err(storage("drop table"))?;
        info!(name, "dataset dropped");
        Ok(())
    }

    /// Names of all stored datasets, sorted.
    pub fn dataset_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .map_err(storage("prepare dataset_names"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage("query dataset_names"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(storage("collect rows"))?;
        Ok(names
            .into_iter()
            .filter(|n| !RESERVED_TABLES.contains(&n.as_str()))
            .collect())
    }

    /// Record `chunks` for the document `name` under a new `texts` row.
    /// Returns the row id.
    #[instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    pub fn insert_text_chunks(&self, name: &str, chunks: &[String]) -> Result<i64> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(storage("begin transaction"))?;
        tx.execute(
            "INSERT INTO texts (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )
        .map_err(storage("insert text"))?;
        let texts_id = tx.last_insert_rowid();
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO text_chunks (texts_id, chunk_order, content) \
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(storage("prepare chunk insert"))?;
            for (order, chunk) in chunks.iter().enumerate() {
                stmt.execute(params![texts_id, order as i64, chunk])
                    .map_err(storage("insert chunk"))?;
            }
        }
        tx.commit().map_err(storage("commit"))?;
        info!(name, texts_id, "text chunks stored");
        Ok(texts_id)
    }

    /// Chunks of the most recent text stored under `name`, in order.
    pub fn latest_text_chunks(&self, name: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT content FROM text_chunks
                 WHERE texts_id = (SELECT MAX(id) FROM texts WHERE name = ?1)
                 ORDER BY chunk_order",
            )
            .map_err(storage("prepare latest_text_chunks"))?;
        stmt.query_map(params![name], |row| row.get::<_, String>(0))
            .map_err(storage("query latest_text_chunks"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(storage("collect rows"))
    }
}

impl DatasetSink for SqliteStore {
    fn persist_dataset(&self, name: &str, dataset: &Dataset) -> Result<()> {
        self.append_dataset(name, dataset)
    }
}

impl TextChunkSink for SqliteStore {
    fn persist_text_chunks(&self, name: &str, chunks: &[String]) -> Result<()> {
        self.insert_text_chunks(name, chunks).map(|_| ())
    }
}
