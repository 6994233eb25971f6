//! MongoDB connection management.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use entrypoint_kernel::settings::{AdminCredentials, ConnectionSettings};
use entrypoint_kernel::{ServiceAccount, UserRecord};
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Database};
use serde::Deserialize;
use tracing::{debug, info};

use crate::commands::{create_user_command, users_info_command};
use crate::directory::UserDirectory;
use crate::error::DbError;

/// An authenticated connection to the server's administrative database.
#[derive(Clone)]
pub struct AdminSession {
    client: Client,
    admin: Database,
}

impl AdminSession {
    /// Connect and authenticate as the administrator.
    ///
    /// The driver connects lazily, so a `ping` is issued against the
    /// authentication database to surface unreachable hosts and rejected
    /// credentials here rather than at the first real command.
    pub async fn connect(
        connection: &ConnectionSettings,
        admin: &AdminCredentials,
    ) -> Result<Self, DbError> {
        let (options, target) = client_options(connection, admin).await?;

        info!(
            address = %target,
            auth_source = %connection.auth_source,
            admin_user = %login_user(&options),
            "Connecting to MongoDB"
        );

        let client = Client::with_options(options)?;
        let session = Self {
            admin: client.database(&connection.auth_source),
            client,
        };
        session.ping().await?;

        info!("Authenticated against MongoDB");

        Ok(session)
    }

    /// Returns a reference to the underlying driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Round-trip a `ping` through the administrative database.
    pub async fn ping(&self) -> Result<Duration, DbError> {
        let started = Instant::now();
        self.admin.run_command(doc! { "ping": 1 }).await?;
        let elapsed = started.elapsed();
        debug!(elapsed_ms = elapsed.as_millis() as u64, "ping");
        Ok(elapsed)
    }

    /// Re-point this session at another database on the same server.
    ///
    /// No `use` command is sent and no new connection is opened; the
    /// returned handle shares the authenticated client.
    pub fn sibling(&self, name: &str) -> TargetDatabase {
        TargetDatabase {
            db: self.client.database(name),
        }
    }
}

/// Driver options for `connection`, plus a loggable description of the
/// target. Credentials embedded in `connection.uri` win over `admin`.
async fn client_options(
    connection: &ConnectionSettings,
    admin: &AdminCredentials,
) -> Result<(ClientOptions, String), DbError> {
    // A configured URI may embed credentials, so it is never logged.
    let (uri, target) = match connection.uri.as_ref() {
        Some(uri) => (uri.expose().to_string(), "<connection uri>".to_string()),
        None => (
            format!("mongodb://{}/", connection.address()),
            connection.address(),
        ),
    };

    let mut options = ClientOptions::parse(uri.as_str()).await?;
    options.app_name = Some(connection.app_name.clone());
    if let Some(timeout) = connection.server_selection_timeout() {
        options.server_selection_timeout = Some(timeout);
    }
    if options.credential.is_none() {
        options.credential = Some(
            Credential::builder()
                .username(admin.username.clone())
                .password(admin.password.expose().to_string())
                .source(connection.auth_source.clone())
                .build(),
        );
    }

    Ok((options, target))
}

/// User name the client will authenticate as, taken from the parsed options
/// so that credentials embedded in a connection URI are reported correctly.
fn login_user(options: &ClientOptions) -> &str {
    options
        .credential
        .as_ref()
        .and_then(|credential| credential.username.as_deref())
        .unwrap_or("<none>")
}

/// A database on the same server as an [`AdminSession`].
#[derive(Clone)]
pub struct TargetDatabase {
    db: Database,
}

#[derive(Deserialize)]
struct UsersInfoReply {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[async_trait]
impl UserDirectory for TargetDatabase {
    fn name(&self) -> &str {
        self.db.name()
    }

    async fn create_user(&self, account: &ServiceAccount) -> Result<(), DbError> {
        self.db
            .run_command(create_user_command(account))
            .await
            .map_err(|err| DbError::from_create_user(err, &account.username, self.db.name()))?;
        Ok(())
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, DbError> {
        let reply = self
            .db
            .run_command(users_info_command(self.db.name(), username))
            .await?;
        let reply: UsersInfoReply = mongodb::bson::from_document(reply)?;
        Ok(reply.users.into_iter().find(|user| user.user == username))
    }
}
