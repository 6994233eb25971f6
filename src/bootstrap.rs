//! Provisioning of the backend service account.
//!
//! The bootstrap is three calls in a row: authenticate as the administrator,
//! select the target database on the same connection, create the user.
//! Nothing is retried and nothing is caught; a second run against the same
//! server fails because the user already exists.

use anyhow::Context;
use entrypoint_db::{AdminSession, DbError, UserDirectory};
use entrypoint_kernel::{Role, ServiceAccount, Settings, UserRecord};

/// What a successful bootstrap created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub username: String,
    pub database: String,
    pub role: Role,
}

/// Outcome of reading the account back from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub record: UserRecord,
    pub differences: Vec<String>,
}

impl VerificationReport {
    pub fn matches(&self) -> bool {
        self.differences.is_empty()
    }
}

/// Connect, select the target database, and create the service account.
pub async fn run(settings: &Settings) -> anyhow::Result<ProvisionReport> {
    let account = settings.service_account();

    let session = AdminSession::connect(&settings.connection, &settings.admin)
        .await
        .context("failed to connect to MongoDB as administrator")?;
    let target = session.sibling(&account.database);

    provision(&target, &account)
        .await
        .with_context(|| format!("failed to create user on database '{}'", account.database))
}

/// Issue the create-user request for `account` against `directory`.
pub async fn provision<D>(
    directory: &D,
    account: &ServiceAccount,
) -> Result<ProvisionReport, DbError>
where
    D: UserDirectory + ?Sized,
{
    if directory.name() != account.database {
        return Err(DbError::ScopeMismatch {
            directory: directory.name().to_string(),
            database: account.database.clone(),
        });
    }

    if account.has_blank_credentials() {
        tracing::warn!(
            database = %account.database,
            username_empty = account.username.is_empty(),
            password_empty = account.password.is_empty(),
            "service account has blank credentials; forwarding to server as-is"
        );
    }

    tracing::info!(
        user = %account.username,
        database = %account.database,
        role = %account.role(),
        "creating service account"
    );

    directory.create_user(account).await?;

    Ok(ProvisionReport {
        username: account.username.clone(),
        database: account.database.clone(),
        role: account.role(),
    })
}

/// Read `account` back from `directory` and compare it field by field.
///
/// Comparison is exact: no trimming and no case folding.
pub async fn verify<D>(
    directory: &D,
    account: &ServiceAccount,
) -> Result<VerificationReport, DbError>
where
    D: UserDirectory + ?Sized,
{
    let record = directory
        .find_user(&account.username)
        .await?
        .ok_or_else(|| DbError::UserNotFound {
            username: account.username.clone(),
            database: directory.name().to_string(),
        })?;

    let mut differences = Vec::new();
    if record.user != account.username {
        differences.push(format!(
            "user: expected {:?}, found {:?}",
            account.username, record.user
        ));
    }
    if record.db != account.database {
        differences.push(format!(
            "db: expected {:?}, found {:?}",
            account.database, record.db
        ));
    }
    let expected_roles = account.grants();
    if record.roles != expected_roles {
        differences.push(format!(
            "roles: expected {:?}, found {:?}",
            expected_roles, record.roles
        ));
    }

    Ok(VerificationReport {
        record,
        differences,
    })
}
