//! Vượt Vũ Môn - Unified CLI
//!
//! Serves the quiz API, applies migrations, or creates admin accounts.

#![warn(missing_docs)]

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vuot_vu_mon::{
    AccountService, AppState, QuizRepository, ServerConfig, SystemClock, TokenIssuer, router,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vuot_vu_mon=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config = config.with_host(host);
            }
            if let Some(port) = port {
                config = config.with_port(port);
            }
            run_server(config).await
        }
        Command::Migrate => {
            let repository = QuizRepository::new(config.database_url().clone())?;
            let applied = repository.run_migrations()?;
            info!(applied, "✅ Database up to date");
            Ok(())
        }
        Command::CreateAdmin {
            email,
            password,
            full_name,
        } => {
            config.validate()?;
            let repository = open_database(&config)?;
            let accounts = AccountService::new(
                repository,
                TokenIssuer::new(config.jwt_secret(), *config.token_ttl_days()),
            );
            let admin = accounts.ensure_admin(&email, &password, &full_name)?;
            info!(user_id = admin.id(), email = %email, "✅ Admin ready");
            Ok(())
        }
    }
}

/// Layers file, environment and global flags.
#[instrument(skip(cli))]
fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    let mut config = config.with_env()?;
    if let Some(url) = &cli.database_url {
        config = config.with_database_url(url.clone());
    }
    Ok(config)
}

/// Opens the database and brings the schema up to date.
#[instrument(skip(config), fields(database_url = %config.database_url()))]
fn open_database(config: &ServerConfig) -> Result<QuizRepository> {
    let repository = QuizRepository::new(config.database_url().clone())?;
    let applied = repository.run_migrations()?;
    info!(applied, "Migrations checked");
    Ok(repository)
}

/// Run the HTTP API server
#[instrument(skip(config))]
async fn run_server(config: ServerConfig) -> Result<()> {
    config.validate()?;

    let repository = open_database(&config)?;
    let tokens = TokenIssuer::new(config.jwt_secret(), *config.token_ttl_days());

    if let Some(admin) = config.bootstrap_admin() {
        let accounts = AccountService::new(repository.clone(), tokens.clone());
        accounts.ensure_admin(admin.email(), admin.password(), admin.full_name())?;
    } else {
        warn!("No bootstrap admin configured");
    }

    let state = AppState::new(
        repository,
        tokens,
        Arc::new(SystemClock),
        *config.expose_errors(),
    );
    let app = router(state, config.client_origin())?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!(address = %addr, "🚀 Vượt Vũ Môn API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
