use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkdeck::{
    config::ClientConfig,
    session::{FileBackend, SessionStore},
    shell::Shell,
    HttpGateway,
};

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent; env vars may already be set)
    dotenvy::dotenv().ok();

    // Logs go to stderr so they never interleave with the shell's output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkdeck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!("Backend API: {}", config.api_base_url);
    tracing::info!("Public link base: {}", config.copy_base_url);

    let gateway = HttpGateway::new(&config).context("failed to set up HTTP client")?;
    let backend = FileBackend::new(&config.session_file);
    tracing::info!("Session file: {}", backend.path().display());
    let sessions = SessionStore::new(backend);

    let mut shell = Shell::new(&config, Arc::new(gateway), sessions, std::io::stdout());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    shell.run(stdin).await?;

    Ok(())
}
