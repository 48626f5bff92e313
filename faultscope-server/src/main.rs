use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use faultscope::DiagnosisService;
use faultscope_server::{router, AppState, ServerArgs};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = ServerArgs::parse();
    let config = args.diagnosis_config().context("invalid diagnosis configuration")?;
    let client = args.model_client().context("cannot create model client")?;
    let service =
        DiagnosisService::new(config, client).context("cannot build diagnosis service")?;
    tracing::info!(
        models = ?service.models(),
        test_mode = args.test_mode,
        "diagnosis service ready"
    );

    let shutdown = CancellationToken::new();
    let app = router(AppState::new(Arc::new(service)).with_shutdown(shutdown.clone()));

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "cannot listen for shutdown signal");
            }
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    Ok(())
}
