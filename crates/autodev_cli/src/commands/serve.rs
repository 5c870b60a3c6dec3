//! Serve command - the REST API.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use autodev_core::Settings;
use clap::Args;
use tokio::net::TcpListener;
use tracing::info;

use crate::server;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,
}

pub async fn execute(args: ServeArgs, settings: &Settings) -> Result<()> {
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("Listening on {}", args.bind);
    println!("🌐 autodev API listening on http://{}", args.bind);

    axum::serve(listener, server::router(settings.clone()))
        .await
        .context("Server error")?;
    Ok(())
}
