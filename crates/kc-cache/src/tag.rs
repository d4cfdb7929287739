//! Cache tags attached to repository operations.
//!
//! A tag names the cache partition an operation touches and whether it
//! populates it (read) or clears it (write).

/// Names of the cache partitions, one per entity type.
pub mod caches {
    /// Users.
    pub const USERS: &str = "users";
    /// Clients.
    pub const CLIENTS: &str = "clients";
    /// Roles.
    pub const ROLES: &str = "roles";
    /// Realms.
    pub const REALMS: &str = "realms";
    /// User sessions, online and offline.
    pub const USER_SESSIONS: &str = "user-sessions";
    /// Root authentication sessions.
    pub const AUTH_SESSIONS: &str = "auth-sessions";
    /// Login failures.
    pub const LOGIN_FAILURES: &str = "login-failures";
    /// Single-use objects.
    pub const SINGLE_USE_OBJECTS: &str = "single-use-objects";
    /// Events.
    pub const EVENTS: &str = "events";
}

/// Whether a tagged operation reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// Result is cached.
    Read,
    /// Partition is cleared on success.
    Write,
}

/// Cache partition and operation identity of a repository method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTag {
    /// Cache partition name.
    pub cache: &'static str,
    /// Operation identity, part of the cache key.
    pub operation: &'static str,
    /// Read or write.
    pub kind: TagKind,
}

impl CacheTag {
    /// Tag for a read operation.
    #[must_use]
    pub const fn read(cache: &'static str, operation: &'static str) -> Self {
        Self {
            cache,
            operation,
            kind: TagKind::Read,
        }
    }

    /// Tag for a write operation.
    #[must_use]
    pub const fn write(cache: &'static str, operation: &'static str) -> Self {
        Self {
            cache,
            operation,
            kind: TagKind::Write,
        }
    }

    /// Checks if this tags a read.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(self.kind, TagKind::Read)
    }
}
