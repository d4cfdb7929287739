//! # kc-storage
//!
//! Entity store traits for the column-store provider.
//!
//! Each trait is pure I/O against one entity type: no caching and no
//! business rules. Writes that move index rows take the previous copy of
//! the entity so stale rows can be removed.
//!
//! ## Store Traits
//!
//! - [`RealmStore`] - realms and the realm name index
//! - [`UserStore`] - users and their secondary indexes
//! - [`ClientStore`] - clients and the `client_id` index
//! - [`RoleStore`] - realm and client roles
//! - [`UserSessionStore`] - online and offline user sessions
//! - [`AuthSessionStore`] - root authentication sessions
//! - [`LoginFailureStore`] - brute-force protection records
//! - [`SingleUseObjectStore`] - single-use objects
//! - [`EventStore`] - login events

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth_session;
pub mod client;
pub mod error;
pub mod event;
pub mod login_failure;
pub mod realm;
pub mod role;
pub mod session;
pub mod single_use;
pub mod stores;
pub mod user;

pub use auth_session::AuthSessionStore;
pub use client::{ClientSearchCriteria, ClientStore};
pub use error::{StorageError, StorageResult};
pub use event::{EventQuery, EventStore};
pub use login_failure::LoginFailureStore;
pub use realm::RealmStore;
pub use role::{RoleScope, RoleSearchCriteria, RoleStore};
pub use session::UserSessionStore;
pub use single_use::SingleUseObjectStore;
pub use stores::EntityStores;
pub use user::{UserSearchCriteria, UserStore};
