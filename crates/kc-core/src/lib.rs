//! # kc-core
//!
//! Core configuration and time utilities shared by the column-store provider crates.
//!
//! - [`Config`] - provider options resolved once at factory initialization
//! - [`Clock`] - the time source used for session timestamps and TTLs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod time;

pub use config::Config;
pub use time::Clock;
