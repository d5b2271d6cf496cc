use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use question_bank::config::{resolve_data_dir, Config};
use question_bank::db::DB_FILE_NAME;
use question_bank::{open_state, router, seed_if_empty};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let config = Config::parse();

    let data_dir = resolve_data_dir(&config)?;
    tracing::info!(
        data_dir = %data_dir.display(),
        database = %data_dir.join(DB_FILE_NAME).display(),
        "starting question bank"
    );
    let state = open_state(&data_dir, config.max_upload_bytes()).await?;
    if config.seed && seed_if_empty(&state).await? {
        tracing::info!("empty catalog seeded");
    }

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(bind = %config.bind, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
