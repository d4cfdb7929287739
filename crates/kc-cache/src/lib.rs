//! # kc-cache
//!
//! Request-local (L1) cache used by the composite repository.
//!
//! Every repository method carries a [`CacheTag`]: reads are answered from
//! the cache when possible, writes clear the whole partition of their tag
//! after the store call succeeds.
//!
//! ## Example
//!
//! ```ignore
//! use kc_cache::{CacheTag, RequestCache, caches};
//!
//! const GET_USER: CacheTag = CacheTag::read(caches::USERS, "get_user_by_id");
//!
//! let cache = RequestCache::new();
//! let user = cache
//!     .intercept_read(GET_USER, &(realm_id, id), store.get_by_id(realm_id, id))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod intercept;
pub mod tag;

pub use cache::{CacheKey, CacheStats, RequestCache};
pub use tag::{CacheTag, TagKind, caches};
