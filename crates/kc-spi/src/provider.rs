//! Provider factory traits.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider factories.
#[derive(Debug, Error)]
pub enum SpiError {
    /// Provider initialization failed.
    #[error("provider initialization failed: {0}")]
    InitializationFailed(String),

    /// Provider creation failed.
    #[error("provider creation failed: {0}")]
    CreationFailed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Base trait for request-scoped providers.
pub trait Provider: Send + Sync + Debug {
    /// Called when the request ends. Must not fail.
    fn close(&self) {}
}

/// Metadata about a provider.
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    /// Unique identifier for this provider.
    pub id: &'static str,

    /// Human-readable name.
    pub name: &'static str,

    /// Description of what this provider does.
    pub description: &'static str,
}

/// Factory for request-scoped providers.
///
/// ## Lifecycle
///
/// 1. `init()` - called once at startup with configuration
/// 2. `create()` - called for each request
/// 3. `close()` - called at shutdown
#[async_trait]
pub trait ProviderFactory: Send + Sync + Debug {
    /// Provider handed out per request.
    type Provider: Provider;

    /// Returns the unique identifier for this factory.
    fn id(&self) -> &'static str;

    /// Returns metadata about providers created by this factory.
    fn metadata(&self) -> ProviderMetadata;

    /// Initializes the factory with configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if initialization fails.
    async fn init(&mut self, config: &dyn FactoryConfig) -> Result<(), SpiError>;

    /// Creates the provider for one request.
    ///
    /// ## Errors
    ///
    /// Returns an error if the factory was not initialized or is closed.
    fn create(&self) -> Result<Self::Provider, SpiError>;

    /// Shuts the factory down. Cleanup errors are logged, never returned.
    async fn close(&self);
}

/// Configuration interface for factory initialization.
pub trait FactoryConfig: Send + Sync {
    /// Gets a string configuration value.
    fn get(&self, key: &str) -> Option<&str>;

    /// Gets an integer configuration value.
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Gets a boolean configuration value.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

/// Key/value factory configuration.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl FactoryConfig for MapConfig {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_fall_back_to_default() {
        let config = MapConfig::new()
            .with("limit", " 12 ")
            .with("enabled", "true")
            .with("broken", "twelve");

        assert_eq!(config.get_int("limit", 300), 12);
        assert_eq!(config.get_int("broken", 300), 300);
        assert_eq!(config.get_int("missing", 300), 300);
        assert!(config.get_bool("enabled", false));
        assert!(!config.get_bool("missing", false));
    }
}
