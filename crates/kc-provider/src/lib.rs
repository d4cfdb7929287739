//! # kc-provider
//!
//! Request-scoped providers for the non-session entities.
//!
//! Every provider borrows the request's [`KeycloakSession`](kc_spi::KeycloakSession).
//! Lookups return adapters registered in the request, so two lookups of
//! the same entity hand back the same instance. Creations are written
//! immediately and undone on rollback; every other change is written when
//! the request commits.
//!
//! ## Providers
//!
//! - [`RealmProvider`] / [`RealmAdapter`]
//! - [`UserProvider`] / [`UserAdapter`]
//! - [`ClientProvider`] / [`ClientAdapter`]
//! - [`RoleProvider`] / [`RoleAdapter`]
//! - [`LoginFailureProvider`] / [`LoginFailureAdapter`]
//! - [`SingleUseObjectProvider`]
//! - [`EventStoreProvider`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cascade;
pub mod client;
pub mod event;
pub mod login_failure;
pub mod realm;
pub mod role;
pub mod single_use;
pub mod user;

#[cfg(test)]
mod test_support;

pub use client::{ClientAdapter, ClientProvider};
pub use event::EventStoreProvider;
pub use login_failure::{LoginFailureAdapter, LoginFailureProvider};
pub use realm::{RealmAdapter, RealmProvider};
pub use role::{RoleAdapter, RoleProvider};
pub use single_use::SingleUseObjectProvider;
pub use user::{UserAdapter, UserProvider};
