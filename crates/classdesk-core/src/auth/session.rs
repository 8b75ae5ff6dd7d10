use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::claims::TokenClaims;

/// The logged-in user as persisted and published to views.
///
/// Field names on the wire match the record written by the web front end
/// (`username`, `role`, `token`, `roles`, `permissions`) so either client
/// can restore the other's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    #[serde(rename = "username")]
    pub display_name: String,
    #[serde(rename = "role")]
    pub primary_role: String,
    pub token: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl Session {
    /// Build a session from a freshly issued token and its decoded claims.
    pub fn from_claims(display_name: &str, token: String, claims: &TokenClaims) -> Self {
        Self {
            display_name: display_name.to_string(),
            primary_role: claims.primary_role(),
            token,
            roles: claims.roles.iter().cloned().collect(),
            permissions: claims.permissions.iter().cloned().collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}
