//! The user-store seam the bootstrap is written against.

use async_trait::async_trait;
use entrypoint_kernel::{ServiceAccount, UserRecord};

use crate::error::DbError;

/// A database's user-credential store.
///
/// Implemented by [`crate::TargetDatabase`] against a live server. The
/// bootstrap only depends on this trait.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Name of the database this directory is scoped to.
    fn name(&self) -> &str;

    /// Create `account` with its fixed role. Fails with
    /// [`DbError::DuplicateUser`] when the user already exists.
    async fn create_user(&self, account: &ServiceAccount) -> Result<(), DbError>;

    /// Look up a user by exact name. `None` when it does not exist.
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, DbError>;
}
