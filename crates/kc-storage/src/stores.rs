//! Bundle of every entity store.

use std::sync::Arc;

use crate::{
    AuthSessionStore, ClientStore, EventStore, LoginFailureStore, RealmStore, RoleStore,
    SingleUseObjectStore, UserSessionStore, UserStore,
};

/// One store per entity type, shared by every request.
#[derive(Clone)]
pub struct EntityStores {
    /// Realm store.
    pub realms: Arc<dyn RealmStore>,
    /// User store.
    pub users: Arc<dyn UserStore>,
    /// Client store.
    pub clients: Arc<dyn ClientStore>,
    /// Role store.
    pub roles: Arc<dyn RoleStore>,
    /// User session store.
    pub user_sessions: Arc<dyn UserSessionStore>,
    /// Authentication session store.
    pub auth_sessions: Arc<dyn AuthSessionStore>,
    /// Login failure store.
    pub login_failures: Arc<dyn LoginFailureStore>,
    /// Single-use object store.
    pub single_use_objects: Arc<dyn SingleUseObjectStore>,
    /// Event store.
    pub events: Arc<dyn EventStore>,
}

impl std::fmt::Debug for EntityStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStores").finish_non_exhaustive()
    }
}
