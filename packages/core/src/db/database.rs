//! Database Connection Management
//!
//! This module provides the libsql connection, schema initialization and the
//! raw SQL for every node store operation.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Foreign keys**: `parent_id` must reference an existing node
//! - **Soft removal**: Rows are never deleted by normal operations, only
//!   flagged with `is_removed`
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** The 5-second busy
//! timeout lets concurrent writers wait instead of failing with `SQLITE_BUSY`,
//! and foreign key enforcement is a per-connection setting in SQLite.
//!
//! ```no_run
//! # use treestage_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/treestage.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use crate::models::{FieldUpdate, NodeField};
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound on ids per `IN (...)` clause
const MAX_IN_CLAUSE_IDS: usize = 500;

/// Columns selected for every node query, in `row_to_node` order
pub(crate) const NODE_COLUMNS: &str = "id, parent_id, name, is_removed";

/// Database service for managing libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database connection (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

/// Parameters for node insertion
pub struct DbInsertNodeParams<'a> {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: &'a str,
    pub is_removed: bool,
}

/// Result of a field-level batch write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every update matched a row; the batch was committed
    Applied { rows: u64 },
    /// An update addressed a node that does not exist; the batch was rolled back
    MissingNode { id: i64 },
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::directory(parent.to_path_buf(), e))?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::open(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::schema(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::schema(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Idempotent: safe to call on an existing database.
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY,
                parent_id INTEGER REFERENCES nodes(id),
                name TEXT NOT NULL,
                is_removed INTEGER NOT NULL DEFAULT 0
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::schema(format!("Failed to create nodes table: {}", e))
        })?;

        // Cascade paging scans children by parent
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id, id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::schema(format!("Failed to create parent index: {}", e))
        })?;

        // Flush schema to disk for fresh files so a second handle sees the table
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Get a synchronous connection handle.
    ///
    /// Prefer `connect_with_timeout()` in async code.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::Libsql)
    }

    /// Get an async connection with busy timeout and foreign keys configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    //
    // NODE STORE OPERATIONS
    // Raw SQL wrapped by the `NodeStore` implementation in turso_store.rs.
    //

    /// Fetch a single node row by id
    pub async fn db_get_node(&self, id: i64) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS),
                [id],
            )
            .await
            .map_err(|e| DatabaseError::query(format!("Failed to get node: {}", e)))?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::query(format!("Failed to read node row: {}", e)))
    }

    /// All rows without a parent, removed ones included
    pub async fn db_get_roots(&self) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.query(
            &format!(
                "SELECT {} FROM nodes WHERE parent_id IS NULL ORDER BY id ASC",
                NODE_COLUMNS
            ),
            (),
        )
        .await
        .map_err(|e| DatabaseError::query(format!("Failed to get roots: {}", e)))
    }

    /// One page of the direct children of `parent_id`, ordered by id so that
    /// offset paging is stable while pages are being written.
    pub async fn db_get_children_page(
        &self,
        parent_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.query(
            &format!(
                "SELECT {} FROM nodes WHERE parent_id = ? ORDER BY id ASC LIMIT ? OFFSET ?",
                NODE_COLUMNS
            ),
            (parent_id, clamp_to_i64(limit), clamp_to_i64(offset)),
        )
        .await
        .map_err(|e| DatabaseError::query(format!("Failed to get children: {}", e)))
    }

    /// Number of direct children of `parent_id`
    pub async fn db_count_children(&self, parent_id: i64) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query("SELECT COUNT(*) FROM nodes WHERE parent_id = ?", [parent_id])
            .await
            .map_err(|e| {
                DatabaseError::query(format!("Failed to count children: {}", e))
            })?;

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        Ok(count.max(0) as u64)
    }

    /// Batch insert nodes in a single transaction
    ///
    /// Nodes must be ordered parents-first; the foreign key on `parent_id` is
    /// checked per statement. Any failure rolls the whole batch back.
    pub async fn db_batch_insert_nodes(
        &self,
        nodes: &[DbInsertNodeParams<'_>],
    ) -> Result<(), DatabaseError> {
        if nodes.is_empty() {
            return Ok(());
        }

        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN TRANSACTION", ())
            .await
            .map_err(|e| DatabaseError::transaction("begin", e))?;

        for params in nodes {
            let result = conn
                .execute(
                    "INSERT INTO nodes (id, parent_id, name, is_removed) VALUES (?, ?, ?, ?)",
                    (
                        params.id,
                        params.parent_id,
                        params.name,
                        params.is_removed as i64,
                    ),
                )
                .await;

            if let Err(e) = result {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(DatabaseError::node_write(params.id, e));
            }
        }

        commit(&conn).await
    }

    /// Apply column-precise updates in a single transaction
    ///
    /// Each update writes exactly one column. If any update matches no row the
    /// whole batch is rolled back and the missing id is reported.
    pub async fn db_batch_set_fields(
        &self,
        updates: &[FieldUpdate],
    ) -> Result<WriteOutcome, DatabaseError> {
        if updates.is_empty() {
            return Ok(WriteOutcome::Applied { rows: 0 });
        }

        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN TRANSACTION", ())
            .await
            .map_err(|e| DatabaseError::transaction("begin", e))?;

        let mut rows_written = 0;
        for update in updates {
            let result = match &update.field {
                NodeField::Name(name) => {
                    conn.execute(
                        "UPDATE nodes SET name = ? WHERE id = ?",
                        (name.as_str(), update.id),
                    )
                    .await
                }
                NodeField::Removed(removed) => {
                    conn.execute(
                        "UPDATE nodes SET is_removed = ? WHERE id = ?",
                        (*removed as i64, update.id),
                    )
                    .await
                }
            };

            match result {
                Ok(0) => {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Ok(WriteOutcome::MissingNode { id: update.id });
                }
                Ok(rows) => rows_written += rows,
                Err(e) => {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Err(DatabaseError::node_write(update.id, e));
                }
            }
        }

        commit(&conn).await?;

        Ok(WriteOutcome::Applied { rows: rows_written })
    }

    /// Return the subset of `ids` that exist and are flagged removed
    pub async fn db_filter_removed(&self, ids: &[i64]) -> Result<Vec<i64>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.connect_with_timeout().await?;
        let mut removed = Vec::new();

        for chunk in ids.chunks(MAX_IN_CLAUSE_IDS) {
            // Integer literals only, so inlining cannot inject SQL
            let id_list = chunk
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(", ");

            let mut rows = conn
                .query(
                    &format!(
                        "SELECT id FROM nodes WHERE is_removed = 1 AND id IN ({}) ORDER BY id ASC",
                        id_list
                    ),
                    (),
                )
                .await
                .map_err(|e| {
                    DatabaseError::query(format!("Failed to filter removed ids: {}", e))
                })?;

            while let Some(row) = rows.next().await? {
                removed.push(row.get::<i64>(0)?);
            }
        }

        Ok(removed)
    }

    /// Replace the whole table with `nodes` in one transaction
    pub async fn db_replace_all(
        &self,
        nodes: &[DbInsertNodeParams<'_>],
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN TRANSACTION", ())
            .await
            .map_err(|e| DatabaseError::transaction("begin", e))?;

        if let Err(e) = conn.execute("DELETE FROM nodes", ()).await {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::query(format!("Failed to clear nodes: {}", e)));
        }

        for params in nodes {
            let result = conn
                .execute(
                    "INSERT INTO nodes (id, parent_id, name, is_removed) VALUES (?, ?, ?, ?)",
                    (
                        params.id,
                        params.parent_id,
                        params.name,
                        params.is_removed as i64,
                    ),
                )
                .await;

            if let Err(e) = result {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(DatabaseError::node_write(params.id, e));
            }
        }

        commit(&conn).await
    }

    /// Total number of rows, removed ones included
    pub async fn db_count_nodes(&self) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query("SELECT COUNT(*) FROM nodes", ())
            .await
            .map_err(|e| DatabaseError::query(format!("Failed to count nodes: {}", e)))?;

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        Ok(count.max(0) as u64)
    }
}

async fn commit(conn: &libsql::Connection) -> Result<(), DatabaseError> {
    if let Err(e) = conn.execute("COMMIT", ()).await {
        let _rollback = conn.execute("ROLLBACK", ()).await;
        return Err(DatabaseError::transaction("commit", e));
    }
    Ok(())
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
