use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::account::ServiceAccount;
use crate::secret::Secret;

const DEFAULT_ENV: &str = "local";
pub const ENV_VAR_NAME: &str = "ENTRYPOINT_ENV";
pub const CONFIG_DIR_ENV: &str = "ENTRYPOINT_CONFIG_DIR";
const ENV_PREFIX: &str = "ENTRYPOINT";

/// Variables set by the database container itself. They take precedence over
/// every other layer so the bootstrap behaves the same whether or not any
/// config file is present.
const CONTAINER_ENV_KEYS: &[(&str, &str)] = &[
    ("MONGO_INITDB_ROOT_USERNAME", "admin.username"),
    ("MONGO_INITDB_ROOT_PASSWORD", "admin.password"),
    ("MONGO_DATABASE_NAME", "account.database"),
    ("DB_BACKEND_USER", "account.username"),
    ("DB_BACKEND_PASSWORD", "account.password"),
];

/// Deployment environment the bootstrap is running in.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(name: &str) -> anyhow::Result<Self> {
        match name {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
///
/// With no files and no environment the defaults describe the hard-coded
/// bootstrap: `admin`/`pass` on `localhost:27017`, target database `AR`,
/// and an empty service-account username and password.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub admin: AdminCredentials,
    #[serde(default)]
    pub account: AccountSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// prefixed variables, and finally the container variables.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Self::environment_vars())
    }

    /// Process environment after applying `.env`, as consumed by
    /// [`Settings::load_from`].
    pub fn environment_vars() -> HashMap<String, String> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();
        std::env::vars().collect()
    }

    /// Same as [`Settings::load`] but reads variables from `vars` instead of
    /// the process environment.
    pub fn load_from(vars: HashMap<String, String>) -> anyhow::Result<Self> {
        let environment_name = vars
            .get(ENV_VAR_NAME)
            .cloned()
            .unwrap_or_else(|| DEFAULT_ENV.to_string());
        let environment = Environment::parse(&environment_name)?;

        let config_dir = match vars.get(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()
                .map(|cwd| cwd.join("config"))
                .context("unable to resolve current directory")?,
        };

        tracing::debug!(
            environment = environment.as_str(),
            config_dir = %config_dir.display(),
            "loading settings"
        );

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment.as_str()));

        let prefixed: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(prefixed)),
            );

        for (var, key) in CONTAINER_ENV_KEYS {
            builder = builder
                .set_override_option(*key, vars.get(*var).cloned())
                .with_context(|| format!("failed to apply {var}"))?;
        }

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = environment;

        Ok(settings)
    }

    pub fn service_account(&self) -> ServiceAccount {
        ServiceAccount::from(&self.account)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSettings {
    #[serde(default = "ConnectionSettings::default_host")]
    pub host: String,
    #[serde(default = "ConnectionSettings::default_port")]
    pub port: u16,
    /// Full connection string; replaces `host`/`port` when present. It may
    /// carry credentials, so it is held as a [`Secret`].
    #[serde(default)]
    pub uri: Option<Secret>,
    #[serde(default = "ConnectionSettings::default_auth_source")]
    pub auth_source: String,
    #[serde(default = "ConnectionSettings::default_app_name")]
    pub app_name: String,
    /// Driver default (30s) applies when unset.
    #[serde(default)]
    pub server_selection_timeout_ms: Option<u64>,
}

impl ConnectionSettings {
    fn default_host() -> String {
        "localhost".to_string()
    }

    fn default_port() -> u16 {
        27017
    }

    fn default_auth_source() -> String {
        "admin".to_string()
    }

    fn default_app_name() -> String {
        "mongo-entrypoint".to_string()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_selection_timeout(&self) -> Option<Duration> {
        self.server_selection_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            uri: None,
            auth_source: Self::default_auth_source(),
            app_name: Self::default_app_name(),
            server_selection_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    #[serde(default = "AdminCredentials::default_username")]
    pub username: String,
    #[serde(default = "AdminCredentials::default_password")]
    pub password: Secret,
}

impl AdminCredentials {
    fn default_username() -> String {
        "admin".to_string()
    }

    fn default_password() -> Secret {
        Secret::from("pass")
    }
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: Self::default_username(),
            password: Self::default_password(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountSettings {
    #[serde(default = "AccountSettings::default_database")]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Secret,
}

impl AccountSettings {
    fn default_database() -> String {
        "AR".to_string()
    }
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            database: Self::default_database(),
            username: String::new(),
            password: Secret::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetrySettings {
    #[serde(default = "TelemetrySettings::default_level")]
    pub level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl TelemetrySettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn isolated(dir: &tempfile::TempDir, pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map = vars(pairs);
        map.insert(
            CONFIG_DIR_ENV.to_string(),
            dir.path().display().to_string(),
        );
        map
    }

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn defaults_match_hard_coded_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(isolated(&dir, &[])).unwrap();

        assert_eq!(settings.connection.address(), "localhost:27017");
        assert_eq!(settings.connection.auth_source, "admin");
        assert_eq!(settings.admin.username, "admin");
        assert_eq!(settings.admin.password.expose(), "pass");
        assert_eq!(settings.account.database, "AR");
        assert_eq!(settings.account.username, "");
        assert!(settings.account.password.is_empty());
    }

    #[test]
    fn container_variables_configure_account() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(isolated(
            &dir,
            &[
                ("MONGO_INITDB_ROOT_USERNAME", "root"),
                ("MONGO_INITDB_ROOT_PASSWORD", "rootpw"),
                ("MONGO_DATABASE_NAME", "Arena"),
                ("DB_BACKEND_USER", "Backend"),
                ("DB_BACKEND_PASSWORD", "backendpw"),
            ],
        ))
        .unwrap();

        assert_eq!(settings.admin.username, "root");
        assert_eq!(settings.admin.password.expose(), "rootpw");

        let account = settings.service_account();
        assert_eq!(account.database, "Arena");
        assert_eq!(account.username, "Backend");
        assert_eq!(account.password.expose(), "backendpw");
    }

    #[test]
    fn files_and_prefixed_variables_layer_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.toml"),
            "[connection]\nhost = \"mongo\"\nport = 27018\n\n[account]\ndatabase = \"base_db\"\nusername = \"from_base\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("staging.toml"),
            "[account]\nusername = \"from_staging\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(isolated(
            &dir,
            &[
                (ENV_VAR_NAME, "staging"),
                ("ENTRYPOINT_CONNECTION__PORT", "27019"),
                ("ENTRYPOINT_CONNECTION__SERVER_SELECTION_TIMEOUT_MS", "250"),
            ],
        ))
        .unwrap();

        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.connection.host, "mongo");
        assert_eq!(settings.connection.port, 27019);
        assert_eq!(
            settings.connection.server_selection_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(settings.account.database, "base_db");
        assert_eq!(settings.account.username, "from_staging");
    }

    #[test]
    fn container_variables_win_over_prefixed_ones() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(isolated(
            &dir,
            &[
                ("ENTRYPOINT_ACCOUNT__USERNAME", "prefixed"),
                ("DB_BACKEND_USER", "container"),
            ],
        ))
        .unwrap();
        assert_eq!(settings.account.username, "container");
    }

    #[test]
    fn empty_container_variables_are_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(isolated(
            &dir,
            &[
                ("ENTRYPOINT_ACCOUNT__USERNAME", "prefixed"),
                ("DB_BACKEND_USER", ""),
            ],
        ))
        .unwrap();
        assert_eq!(settings.account.username, "");
    }

    #[test]
    fn unsupported_environment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from(isolated(&dir, &[(ENV_VAR_NAME, "qa")])).unwrap_err();
        assert!(err.to_string().contains("unsupported environment 'qa'"));
    }

    #[test]
    fn serialized_settings_hide_passwords() {
        let mut settings = Settings::default();
        settings.account.password = Secret::from("backendpw");
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("backendpw"));
        assert!(!json.contains("\"pass\""));
    }

    #[test]
    fn connection_uri_is_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(isolated(
            &dir,
            &[(
                "ENTRYPOINT_CONNECTION__URI",
                "mongodb://root:TopSecretPw@db:27017/",
            )],
        ))
        .unwrap();

        assert_eq!(
            settings.connection.uri.as_ref().map(Secret::expose),
            Some("mongodb://root:TopSecretPw@db:27017/")
        );
        let json = serde_json::to_string_pretty(&settings).unwrap();
        assert!(!json.contains("TopSecretPw"), "uri leaked: {json}");
        assert!(!format!("{settings:?}").contains("TopSecretPw"));
    }
}
