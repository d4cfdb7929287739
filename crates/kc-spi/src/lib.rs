//! # kc-spi
//!
//! Request-scoped unit of work for the column-store provider.
//!
//! ## Design
//!
//! - [`KeycloakSession`] - one per request; owns the composite repository,
//!   the adapter registry and the compensation log
//! - [`EntityCell`] - the state every adapter wraps: the working copy, the
//!   last persisted copy and the `Loaded → Dirty → Flushed | Discarded` state
//! - [`Identifiable`], [`Dirtyable`], [`Flushable`] - capabilities adapters
//!   implement so the session can flush them without knowing their type
//! - [`AdapterRegistry`] - at most one adapter per entity kind and id
//! - [`Compensation`] - undo actions run on rollback
//! - [`ProviderFactory`] - factory lifecycle (`init`, `create`, `close`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod provider;
pub mod registry;
pub mod session;
pub mod transaction;

pub use adapter::{AdapterState, Dirtyable, EntityCell, Flushable, Identifiable, PendingWrite};
pub use provider::{FactoryConfig, MapConfig, Provider, ProviderFactory, ProviderMetadata, SpiError};
pub use registry::{AdapterKey, AdapterRegistry, kinds};
pub use session::KeycloakSession;
pub use transaction::{Compensation, Transaction, UndoCreate};
