use std::sync::Arc;

use anyhow::Context;

use penboard_api::app::{build_app, services::AppServices};
use penboard_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    penboard_observability::init(config.log_format);
    config.warn_on_fallbacks();

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialize storage")?;
    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
