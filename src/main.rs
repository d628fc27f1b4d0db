use tracing_subscriber::EnvFilter;

use taskgate::api;
use taskgate::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskgate=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        environment = %config.environment,
        stage = %config.api_stage,
        dlq = config.dlq_enabled(),
        "Starting taskgate"
    );

    api::serve(config).await
}
