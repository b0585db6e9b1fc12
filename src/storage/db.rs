use std::sync::{Arc, Mutex, MutexGuard};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use super::IdentityStore;
use crate::core::AppResult;
use crate::dialog::Identity;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and makes sure the
/// schema exists.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Example
///
/// ```no_run
/// use stackbot::storage::create_pool;
///
/// let pool = create_pool("store.db")?;
/// # Ok::<(), stackbot::core::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    let conn = pool.get()?;
    migrate_schema(&conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> AppResult<DbConnection> {
    Ok(pool.get()?)
}

/// Creates missing tables. Safe to run on every start.
fn migrate_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='user_info'",
        [],
        |row| Ok(row.get::<_, i32>(0)? > 0),
    )?;

    if !table_exists {
        log::info!("Creating table user_info");
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_info (
            id INTEGER PRIMARY KEY,
            chat_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );",
    )
}

/// Identity store backed by the `user_info` table.
///
/// `store_identity` only buffers; `commit` writes the buffer in a single
/// transaction. Loads see buffered identities before they are committed; a
/// failed commit discards its batch.
pub struct SqliteIdentityStore {
    pool: Arc<DbPool>,
    pending: Mutex<Vec<Identity>>,
}

impl SqliteIdentityStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            pool,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Number of identities waiting for `commit`
    pub fn pending_len(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Identity>> {
        // The buffer is a plain Vec; a panic mid-push cannot leave it inconsistent.
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Identity buffer lock was poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    fn write_batch(&self, batch: &[Identity]) -> AppResult<()> {
        let mut conn = get_connection(&self.pool)?;
        let tx = conn.transaction()?;
        for identity in batch {
            tx.execute(
                "INSERT INTO user_info (id, chat_id, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET chat_id = excluded.chat_id, name = excluded.name",
                params![identity.id, identity.chat_id, identity.name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl IdentityStore for SqliteIdentityStore {
    fn load_identity(&self, id: i64) -> AppResult<Option<Identity>> {
        if let Some(identity) = self.pending().iter().find(|i| i.id == id) {
            return Ok(Some(identity.clone()));
        }

        let conn = get_connection(&self.pool)?;
        let identity = conn
            .query_row(
                "SELECT id, chat_id, name FROM user_info WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Identity {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;

        match identity {
            Some(_) => log::debug!("UserInfo.id({}) found.", id),
            None => log::debug!("UserInfo.id({}) not found.", id),
        }
        Ok(identity)
    }

    fn store_identity(&self, identity: &Identity) -> AppResult<()> {
        let mut pending = self.pending();
        pending.retain(|i| i.id != identity.id);
        pending.push(identity.clone());
        Ok(())
    }

    fn commit(&self) -> AppResult<()> {
        let batch: Vec<Identity> = self.pending().clone();
        if batch.is_empty() {
            return Ok(());
        }

        let result = self.write_batch(&batch);

        // The batch leaves the buffer either way, so a failed identity is
        // never served by `load_identity` and the next contact creates it again.
        // Identities buffered meanwhile stay pending.
        self.pending().retain(|i| !batch.contains(i));
        match &result {
            Ok(()) => log::debug!("Committed {} identity record(s)", batch.len()),
            Err(e) => log::warn!("Failed to commit {} identity record(s): {}", batch.len(), e),
        }
        result
    }
}
