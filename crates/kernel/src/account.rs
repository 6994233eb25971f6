//! The backend service account provisioned at container startup.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::secret::Secret;
use crate::settings::AccountSettings;

/// Roles the bootstrap is able to grant. Only `readWrite` exists; there is
/// no way to request anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    ReadWrite,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::ReadWrite => "readWrite",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{ role, db }` entry as stored in the server's user document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

/// A user as reported back by the server's credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user: String,
    pub db: String,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
}

/// Application user scoped to the target database with a fixed role.
///
/// The password is kept as plaintext (wrapped in [`Secret`]) because the
/// server computes the stored digest itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub database: String,
    pub username: String,
    pub password: Secret,
    role: Role,
}

impl ServiceAccount {
    pub fn new(
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<Secret>,
    ) -> Self {
        Self {
            database: database.into(),
            username: username.into(),
            password: password.into(),
            role: Role::ReadWrite,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Role list sent with `createUser`; always scoped to the target database.
    pub fn grants(&self) -> Vec<RoleGrant> {
        vec![RoleGrant {
            role: self.role.as_str().to_string(),
            db: self.database.clone(),
        }]
    }

    /// True when the username or password is empty. Such an account is
    /// still forwarded to the server, which decides what to do with it.
    pub fn has_blank_credentials(&self) -> bool {
        self.username.is_empty() || self.password.is_empty()
    }
}

impl From<&AccountSettings> for ServiceAccount {
    fn from(settings: &AccountSettings) -> Self {
        Self::new(
            settings.database.clone(),
            settings.username.clone(),
            settings.password.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_single_read_write_on_target_database() {
        let account = ServiceAccount::new("AR", "backend", "s3cret");
        assert_eq!(
            account.grants(),
            vec![RoleGrant {
                role: "readWrite".to_string(),
                db: "AR".to_string(),
            }]
        );
        assert_eq!(account.role(), Role::ReadWrite);
    }

    #[test]
    fn blank_credentials_are_detected_not_rejected() {
        assert!(ServiceAccount::new("AR", "", "").has_blank_credentials());
        assert!(ServiceAccount::new("AR", "backend", "").has_blank_credentials());
        assert!(!ServiceAccount::new("AR", "backend", "pw").has_blank_credentials());
    }

    #[test]
    fn debug_output_redacts_password() {
        let account = ServiceAccount::new("AR", "backend", "s3cret");
        let rendered = format!("{account:?}");
        assert!(rendered.contains("backend"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn user_record_tolerates_extra_fields() {
        let record: UserRecord = serde_json::from_value(serde_json::json!({
            "_id": "AR.backend",
            "user": "backend",
            "db": "AR",
            "roles": [{ "role": "readWrite", "db": "AR" }],
            "mechanisms": ["SCRAM-SHA-1", "SCRAM-SHA-256"]
        }))
        .unwrap();
        assert_eq!(record.user, "backend");
        assert_eq!(record.roles.len(), 1);
    }
}
