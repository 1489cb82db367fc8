mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use libcsi::{CsiServer, EphemeralBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, LogFormat};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    info!(
        version = %args.driver_version,
        node_id = %args.node_name,
        nsm_socket_dir = ?args.nsm_socket_dir,
        csi_socket_path = %args.csi_socket_path.display(),
        "starting"
    );

    let backend = EphemeralBackend::with_system_mounter(args.driver_config())
        .context("failed to create driver")?;
    let server = CsiServer::bind(&args.csi_socket_path, Arc::new(backend))
        .context("failed to start CSI server")?;

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "unable to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("failed to serve")?;

    info!("done");
    Ok(())
}
