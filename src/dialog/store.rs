//! Session cache with lazy fallback to the identity store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::session::{Identity, Session};
use crate::core::AppResult;
use crate::storage::IdentityStore;

/// Shared handle to one user's session.
///
/// The mutex serializes events of the same user; different users never
/// contend on it.
pub type SessionHandle = Arc<Mutex<Session>>;

/// In-memory cache of sessions keyed by user id.
///
/// Exactly one [`Session`] exists per user id for the lifetime of the store,
/// so mutations are visible to every later lookup.
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, SessionHandle>>,
    identities: Arc<dyn IdentityStore>,
}

impl SessionStore {
    pub fn new(identities: Arc<dyn IdentityStore>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            identities,
        }
    }

    /// Returns the cached session of `id`, loading or creating its identity on first contact.
    ///
    /// `display_name` and `chat_id` are only used when the user is unknown to
    /// the identity store. On a persistence error nothing is cached.
    pub async fn get_or_create(&self, id: i64, display_name: &str, chat_id: i64) -> AppResult<SessionHandle> {
        if let Some(session) = self.sessions.lock().await.get(&id) {
            log::debug!("UserInfo({}, {}, {}) found in cache.", id, chat_id, display_name);
            return Ok(Arc::clone(session));
        }
        log::debug!("UserInfo({}, {}, {}) not found in cache.", id, chat_id, display_name);

        // Resolved without the map lock so first contacts of other users
        // do not queue behind the identity store.
        let identity = self.resolve_identity(id, display_name, chat_id)?;

        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(identity))));
        Ok(Arc::clone(session))
    }

    fn resolve_identity(&self, id: i64, display_name: &str, chat_id: i64) -> AppResult<Identity> {
        if let Some(identity) = self.identities.load_identity(id)? {
            return Ok(identity);
        }

        log::debug!("Create UserInfo({}, {}, {}) in db.", id, chat_id, display_name);
        let identity = Identity::new(id, chat_id, display_name);
        self.identities.store_identity(&identity)?;
        self.identities.commit()?;
        Ok(identity)
    }

    /// Cached session of `id`, without touching the identity store
    pub async fn get(&self, id: i64) -> Option<SessionHandle> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Number of cached sessions
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
