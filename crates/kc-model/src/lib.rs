//! # kc-model
//!
//! Domain models for the identity store (realms, users, clients, roles,
//! sessions, login failures, single-use objects and events).
//!
//! Models are plain serde structs. Request-scoped mutation happens through
//! the adapters in `kc-provider` and `kc-session`, never on these directly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth_session;
pub mod client;
pub mod event;
pub mod login_failure;
pub mod realm;
pub mod role;
pub mod session;
pub mod single_use;
pub mod user;

pub use auth_session::{AuthenticationSession, ExecutionStatus, RootAuthenticationSession};
pub use client::{Client, Protocol};
pub use event::{Event, EventBuilder, EventType};
pub use login_failure::LoginFailure;
pub use realm::Realm;
pub use role::Role;
pub use session::{
    AuthenticatedClientSession, ExpirationOverrides, PersistenceState, SessionState, UserSession,
};
pub use single_use::SingleUseObject;
pub use user::User;
