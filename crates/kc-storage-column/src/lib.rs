//! # kc-storage-column
//!
//! Entity stores backed by a distributed column store.
//!
//! Primary rows are partitioned by realm id and clustered by entity id.
//! Secondary lookups go through denormalized index tables holding only the
//! id of the primary row; they are written and deleted together with it.
//!
//! The driver is reached through the [`ColumnStore`] boundary trait.
//! [`InMemoryKeyspace`] implements it in process for tests and embedding.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kc_core::Clock;
//! use kc_storage_column::{column_entity_stores, InMemoryKeyspace};
//!
//! let keyspace = Arc::new(InMemoryKeyspace::new(Clock::new()));
//! let stores = column_entity_stores(keyspace);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth_session;
pub mod boundary;
pub mod client;
pub mod codec;
pub mod config;
pub mod event;
pub mod index;
pub mod login_failure;
pub mod memory;
pub mod realm;
pub mod role;
pub mod schema;
pub mod session;
pub mod single_use;
pub mod table;
pub mod user;

use std::sync::Arc;

use kc_storage::EntityStores;

pub use auth_session::ColumnAuthSessionStore;
pub use boundary::{ColumnStore, Row};
pub use client::ColumnClientStore;
pub use config::ConnectionConfig;
pub use event::ColumnEventStore;
pub use login_failure::ColumnLoginFailureStore;
pub use memory::InMemoryKeyspace;
pub use realm::ColumnRealmStore;
pub use role::ColumnRoleStore;
pub use session::ColumnUserSessionStore;
pub use single_use::ColumnSingleUseObjectStore;
pub use user::ColumnUserStore;

/// Builds every entity store over one column store connection.
#[must_use]
pub fn column_entity_stores(store: Arc<dyn ColumnStore>) -> EntityStores {
    EntityStores {
        realms: Arc::new(ColumnRealmStore::new(Arc::clone(&store))),
        users: Arc::new(ColumnUserStore::new(Arc::clone(&store))),
        clients: Arc::new(ColumnClientStore::new(Arc::clone(&store))),
        roles: Arc::new(ColumnRoleStore::new(Arc::clone(&store))),
        user_sessions: Arc::new(ColumnUserSessionStore::new(Arc::clone(&store))),
        auth_sessions: Arc::new(ColumnAuthSessionStore::new(Arc::clone(&store))),
        login_failures: Arc::new(ColumnLoginFailureStore::new(Arc::clone(&store))),
        single_use_objects: Arc::new(ColumnSingleUseObjectStore::new(Arc::clone(&store))),
        events: Arc::new(ColumnEventStore::new(store)),
    }
}
