use std::io::Write;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use airsnap::shutdown::shutdown_signal;
use airsnap::{router, AppConfig, AppState, ConfiguredRunner};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Regenerates the public 24-hour air-quality history file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Runs the pipeline once and prints the run report.
    Regenerate,
    /// Fetches and normalizes, printing the snapshot instead of uploading it.
    Preview,
    /// Serves the event trigger over HTTP.
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;
    let runner = ConfiguredRunner::new(config);

    match cli.command {
        Commands::Regenerate => {
            let report = runner.pipeline().await?.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Preview => {
            let (snapshot, skipped) = runner.pipeline().await?.preview().await?;
            for record in &skipped {
                warn!(record_id = %record.id, reason = %record.reason, "would skip record");
            }
            let body = snapshot.to_json().context("failed to serialize snapshot")?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            writeln!(stdout)?;
        }
        Commands::Serve { port } => serve(runner, port).await?,
    }

    Ok(())
}

async fn serve(runner: ConfiguredRunner, port: u16) -> Result<()> {
    let app = router(AppState::new(Arc::new(runner)));
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
