//! # Access Control
//!
//! Users, roles, permission codes, and the pure permission check.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  User ──role_id──► Role ──role_permissions──► {Permission.code}         │
//! │                      │                                                  │
//! │                      └─ name == "Admin" ──► {"all"}                     │
//! │                                                                         │
//! │  No role            ──► {}                                              │
//! │                                                                         │
//! │  The resolved list is embedded in the session token at login and      │
//! │  read back on every request; it is not re-derived per request.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::{
    require_text, validate_optional_text, validate_password, validate_username,
    ValidationResult, MAX_NAME_LEN, MAX_TEXT_LEN,
};

/// Role name whose effective permission set is always the wildcard.
pub const ADMIN_ROLE_NAME: &str = "Admin";

/// Wildcard permission code granting every check.
pub const ALL_PERMISSIONS: &str = "all";

// =============================================================================
// Permission Set
// =============================================================================

/// A resolved permission set: either the wildcard or explicit codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    All,
    Codes(BTreeSet<String>),
}

impl PermissionSet {
    /// The empty set (a user without a role).
    pub fn none() -> Self {
        PermissionSet::Codes(BTreeSet::new())
    }

    /// Resolves a role's effective permissions.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::access::PermissionSet;
    ///
    /// let admin = PermissionSet::for_role(Some("Admin"), Vec::<String>::new());
    /// assert!(admin.allows("system.restore"));
    ///
    /// let clerk = PermissionSet::for_role(Some("Clerk"), vec!["products.view".to_string()]);
    /// assert!(clerk.allows("products.view"));
    /// assert!(!clerk.allows("products.delete"));
    ///
    /// assert!(!PermissionSet::for_role(None, Vec::<String>::new()).allows("products.view"));
    /// ```
    pub fn for_role<I>(role_name: Option<&str>, codes: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        match role_name {
            Some(ADMIN_ROLE_NAME) => PermissionSet::All,
            Some(_) => PermissionSet::Codes(codes.into_iter().collect()),
            None => PermissionSet::none(),
        }
    }

    /// Rebuilds a set from the list embedded in a token.
    pub fn from_claims(codes: &[String]) -> Self {
        if codes.iter().any(|c| c == ALL_PERMISSIONS) {
            PermissionSet::All
        } else {
            PermissionSet::Codes(codes.iter().cloned().collect())
        }
    }

    /// The list embedded in a token and returned to the client.
    pub fn to_claims(&self) -> Vec<String> {
        match self {
            PermissionSet::All => vec![ALL_PERMISSIONS.to_string()],
            PermissionSet::Codes(codes) => codes.iter().cloned().collect(),
        }
    }

    pub fn allows(&self, code: &str) -> bool {
        match self {
            PermissionSet::All => true,
            PermissionSet::Codes(codes) => codes.contains(code) || codes.contains(ALL_PERMISSIONS),
        }
    }
}

/// Fails with [`CoreError::Forbidden`] unless `permissions` grants `code`.
pub fn authorize(permissions: &PermissionSet, code: &str) -> CoreResult<()> {
    if permissions.allows(code) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(code.to_string()))
    }
}

// =============================================================================
// Read Models
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Permission {
    pub id: String,
    pub code: String,
    pub description: Option<String>,
    /// Grouping tag for the client only.
    pub module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Codes in the join table (the Admin wildcard is not expanded here).
    pub permissions: Vec<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A user as exposed by the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub role_id: Option<String>,
    pub role_name: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity returned by login and `/auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub role_id: Option<String>,
    pub permissions: Vec<String>,
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleInput {
    pub fn validate(&self) -> ValidationResult<()> {
        require_text("name", &self.name, MAX_NAME_LEN)?;
        validate_optional_text("description", self.description.as_deref(), MAX_TEXT_LEN)?;
        if self.permissions.iter().any(|c| c.trim().is_empty()) {
            return Err(ValidationError::InvalidFormat {
                field: "permissions".to_string(),
                reason: "permission codes must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// Permission codes without duplicates, in sorted order.
    pub fn unique_permissions(&self) -> Vec<String> {
        self.permissions
            .iter()
            .map(|c| c.trim().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
    pub role_id: Option<String>,
}

impl NewUserInput {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        validate_optional_text("fullName", self.full_name.as_deref(), MAX_NAME_LEN)
    }
}

/// Partial user update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateInput {
    pub full_name: Option<String>,
    pub role_id: Option<String>,
    pub password: Option<String>,
}

impl UserUpdateInput {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_optional_text("fullName", self.full_name.as_deref(), MAX_NAME_LEN)?;
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            validate_password(password)?;
        }
        Ok(())
    }
}

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
