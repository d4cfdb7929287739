//! User domain model.
//!
//! Users belong to a realm and carry attributes, required actions and
//! role mappings. Secondary lookups (username, email, federation link,
//! service account) are served by index tables kept in step with these fields.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A Keycloak user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this user belongs to.
    pub realm_id: Uuid,
    /// Unique username within the realm (stored lower-cased).
    pub username: String,
    /// Whether the user account is enabled.
    pub enabled: bool,

    // === Profile ===
    /// User's first name.
    pub first_name: Option<String>,
    /// User's last name.
    pub last_name: Option<String>,
    /// User's email address (stored lower-cased).
    pub email: Option<String>,
    /// Whether the email has been verified.
    pub email_verified: bool,

    // === Timestamps ===
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,

    // === Security ===
    /// Token not-before timestamp (invalidate tokens issued before this).
    pub not_before: i64,

    // === Federation ===
    /// Link to external user federation provider.
    pub federation_link: Option<String>,
    /// Link to service account client (if this is a service account).
    pub service_account_client_link: Option<Uuid>,

    // === Required Actions ===
    /// Pending required actions (e.g., `UPDATE_PASSWORD`, `VERIFY_EMAIL`).
    pub required_actions: Vec<String>,

    // === Role Mappings ===
    /// Ids of roles granted directly to the user.
    pub role_mappings: Vec<Uuid>,

    // === Custom Attributes ===
    /// Custom user attributes.
    pub attributes: HashMap<String, Vec<String>>,
}

impl User {
    /// Creates a new user with the given username.
    #[must_use]
    pub fn new(realm_id: Uuid, username: impl Into<String>) -> Self {
        Self::with_id(Uuid::now_v7(), realm_id, username)
    }

    /// Creates a new user with a caller-supplied id.
    #[must_use]
    pub fn with_id(id: Uuid, realm_id: Uuid, username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            realm_id,
            username: username.into(),
            enabled: true,
            first_name: None,
            last_name: None,
            email: None,
            email_verified: false,
            created_at: now,
            updated_at: now,
            not_before: 0,
            federation_link: None,
            service_account_client_link: None,
            required_actions: Vec::new(),
            role_mappings: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Sets the user's email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the user's first name.
    #[must_use]
    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    /// Sets the user's last name.
    #[must_use]
    pub fn with_last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    /// Gets the user's full name.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }

    /// Checks if this is a service account.
    #[must_use]
    pub const fn is_service_account(&self) -> bool {
        self.service_account_client_link.is_some()
    }

    /// Checks if the user has a specific required action.
    #[must_use]
    pub fn has_required_action(&self, action: &str) -> bool {
        self.required_actions.iter().any(|a| a == action)
    }

    /// Gets the first value of an attribute.
    #[must_use]
    pub fn get_first_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Checks whether the user has an attribute with exactly this value.
    #[must_use]
    pub fn has_attribute_value(&self, name: &str, value: &str) -> bool {
        self.attributes
            .get(name)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }
}

/// Common required action constants.
pub mod required_actions {
    /// User must update their password.
    pub const UPDATE_PASSWORD: &str = "UPDATE_PASSWORD";
    /// User must verify their email.
    pub const VERIFY_EMAIL: &str = "VERIFY_EMAIL";
    /// User must update their profile.
    pub const UPDATE_PROFILE: &str = "UPDATE_PROFILE";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_defaults() {
        let realm_id = Uuid::now_v7();
        let user = User::new(realm_id, "testuser");

        assert_eq!(user.username, "testuser");
        assert_eq!(user.realm_id, realm_id);
        assert!(user.enabled);
        assert!(user.role_mappings.is_empty());
        assert!(!user.is_service_account());
    }

    #[test]
    fn full_name_handles_partial() {
        let realm_id = Uuid::now_v7();

        let both = User::new(realm_id, "u1")
            .with_first_name("John")
            .with_last_name("Doe");
        assert_eq!(both.full_name(), Some("John Doe".to_string()));

        let last = User::new(realm_id, "u2").with_last_name("Doe");
        assert_eq!(last.full_name(), Some("Doe".to_string()));

        assert_eq!(User::new(realm_id, "u3").full_name(), None);
    }

    #[test]
    fn attribute_lookup() {
        let mut user = User::new(Uuid::now_v7(), "testuser");
        user.attributes.insert(
            "groups".to_string(),
            vec!["admin".to_string(), "dev".to_string()],
        );

        assert_eq!(user.get_first_attribute("groups"), Some("admin"));
        assert!(user.has_attribute_value("groups", "dev"));
        assert!(!user.has_attribute_value("groups", "ops"));
        assert!(!user.has_attribute_value("missing", "dev"));
    }
}
