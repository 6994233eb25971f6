use anyhow::Context;
use entrypoint_kernel::settings::Settings;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bootstrap settings")?;
    entrypoint_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        database = %settings.account.database,
        "mongo-entrypoint bootstrap starting"
    );

    let report = mongo_entrypoint::run(&settings).await?;

    tracing::info!(
        user = %report.username,
        database = %report.database,
        role = %report.role,
        "mongo-entrypoint bootstrap complete"
    );
    Ok(())
}
