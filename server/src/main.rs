use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use supportdesk_backend_api::{build_router, AppState};
use supportdesk_backend_runtime::{seed, shutdown_signal, telemetry, BackendServices};
use supportdesk_config::{load as load_config, AppConfig};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "supportdesk-backend", about = "Customer support chat backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Create the sample admin, customer and FAQs.
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing()?;

    let config = load_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Seed => seed_database(config).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!(environment = %config.http.environment, "starting Supportdesk backend");

    let services = BackendServices::initialise(&config).await?;
    let address = format!("{}:{}", config.http.address, config.http.port);
    let state = AppState::new(services.db_pool.clone(), config, services.orchestrator.clone());
    let app = build_router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("http server error")?;

    services.db_pool.close().await;
    info!("backend shut down");
    Ok(())
}

async fn seed_database(config: AppConfig) -> anyhow::Result<()> {
    let services = BackendServices::initialise(&config).await?;
    let report = seed::seed_database(&services.db_pool)
        .await
        .context("database seeding failed")?;

    info!(
        admin_created = report.admin_created,
        user_created = report.user_created,
        faqs_created = report.faqs_created,
        "database seeding completed"
    );
    services.db_pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["supportdesk-backend"]).expect("parse");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["supportdesk-backend", "seed"]).expect("parse");
        assert!(matches!(cli.command, Some(Command::Seed)));
    }
}
