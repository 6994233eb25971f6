use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use entrypoint_db::AdminSession;
use entrypoint_kernel::settings::{self, Settings};

#[derive(Debug, Parser)]
#[command(
    name = "entrypoint-cli",
    version,
    about = "Provision and inspect the backend MongoDB service account"
)]
struct Cli {
    /// Deployment environment: local, staging or production.
    #[arg(long, global = true)]
    env: Option<String>,

    /// Directory holding `base.toml` and `<env>.toml`.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the service account (default).
    Run,
    /// Read the service account back and compare it with the configuration.
    Verify,
    /// Authenticate as administrator and ping the server.
    Ping,
    /// Print the effective configuration with secrets redacted.
    Config,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut vars = Settings::environment_vars();
        if let Some(env) = &self.env {
            vars.insert(settings::ENV_VAR_NAME.to_string(), env.clone());
        }
        if let Some(dir) = &self.config_dir {
            vars.insert(
                settings::CONFIG_DIR_ENV.to_string(),
                dir.display().to_string(),
            );
        }
        Settings::load_from(vars).with_context(|| "failed to load bootstrap settings")
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;
    entrypoint_telemetry::init(&settings.telemetry)?;

    tracing::debug!(env = ?settings.environment, "entrypoint-cli starting");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let report = mongo_entrypoint::run(&settings).await?;
            println!(
                "created user \"{}\" with role {} on database \"{}\"",
                report.username, report.role, report.database
            );
        }
        Command::Verify => {
            let account = settings.service_account();
            let session = AdminSession::connect(&settings.connection, &settings.admin)
                .await
                .context("failed to connect to MongoDB as administrator")?;
            let target = session.sibling(&account.database);
            let report = mongo_entrypoint::verify(&target, &account)
                .await
                .with_context(|| format!("failed to read back user on '{}'", account.database))?;

            println!("{}", serde_json::to_string_pretty(&report.record)?);
            if !report.matches() {
                bail!(
                    "stored user does not match configuration: {}",
                    report.differences.join("; ")
                );
            }
        }
        Command::Ping => {
            let session = AdminSession::connect(&settings.connection, &settings.admin)
                .await
                .context("failed to connect to MongoDB as administrator")?;
            let elapsed = session.ping().await?;
            println!("ok ({} ms)", elapsed.as_millis());
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::parse_from(["entrypoint-cli"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from(["entrypoint-cli", "config", "--env", "staging"]);
        assert_eq!(cli.env.as_deref(), Some("staging"));
        assert!(matches!(cli.command, Some(Command::Config)));
    }
}
