//! # kc-session
//!
//! User, client and authentication sessions on top of the column store.
//!
//! ## Design
//!
//! - [`expiration`] - pure expiry arithmetic from realm, client and
//!   per-session overrides
//! - [`UserSessionAdapter`] / [`ClientSessionAdapter`] - a user session row
//!   with its client sessions embedded; expiry is recomputed on every change
//! - [`UserSessionProvider`] - online and offline sessions, twin links,
//!   lazy expiry and removal hooks
//! - [`RootAuthSessionAdapter`] / [`AuthSessionAdapter`] - per-browser root
//!   with capped per-tab children
//! - [`AuthenticationSessionProvider`] - root lifecycle and removal hooks
//!
//! Nothing sweeps expired sessions: lookups delete what they find expired
//! and the store TTL drops the rest.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth_session;
pub mod client_session;
pub mod error;
pub mod expiration;
pub mod provider;
pub mod user_session;

#[cfg(test)]
mod test_support;

pub use auth_session::{AuthSessionAdapter, AuthenticationSessionProvider, RootAuthSessionAdapter};
pub use client_session::ClientSessionAdapter;
pub use error::{SessionError, SessionResult};
pub use expiration::{ClientExpiration, Expiration, Override, RealmExpiration};
pub use provider::UserSessionProvider;
pub use user_session::{SessionOptions, UserSessionAdapter};
