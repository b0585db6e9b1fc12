//! Persistence of user identities

pub mod db;

use crate::core::AppResult;
use crate::dialog::Identity;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool, SqliteIdentityStore};

/// Durable store of identity records, consulted on a user's first contact.
///
/// Writes made with `store_identity` are only guaranteed durable after
/// `commit` returns.
pub trait IdentityStore: Send + Sync {
    fn load_identity(&self, id: i64) -> AppResult<Option<Identity>>;

    fn store_identity(&self, identity: &Identity) -> AppResult<()>;

    fn commit(&self) -> AppResult<()>;
}
