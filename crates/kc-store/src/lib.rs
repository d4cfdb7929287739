//! # kc-store
//!
//! Entry point of the column-store provider.
//!
//! [`ColumnStoreProviderFactory`] is created once per process over a
//! [`ColumnStore`](kc_storage_column::ColumnStore) connection and hands out
//! one [`StoreSession`] per request. [`StoreSettings`] gathers the provider
//! options and connection parameters from the environment.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use kc_core::Clock;
//! use kc_spi::ProviderFactory;
//! use kc_storage_column::InMemoryKeyspace;
//! use kc_store::{ColumnStoreProviderFactory, StoreSettings};
//!
//! let settings = StoreSettings::from_env();
//! let clock = Clock::new();
//! let mut factory = ColumnStoreProviderFactory::new(Arc::new(InMemoryKeyspace::new(clock.clone())), clock)
//!     .with_settings(settings.clone());
//! factory.init(&settings.factory_config()).await?;
//!
//! let request = factory.create()?;
//! let realm = request.realms().create_realm(None, "acme").await?;
//! request.commit().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod factory;
pub mod session;
pub mod settings;

pub use factory::{ColumnStoreProviderFactory, PROVIDER_ID};
pub use session::StoreSession;
pub use settings::StoreSettings;
