mod backend;
mod client;
mod config;
mod db;
mod error;
mod folders;
mod queue;
mod validate;
mod worker;

use std::process::ExitCode;

use backend::{AppState, kv_config::KvOptExt, router::create_router};
use config::{Command, ServerConfig};
use db::init_database;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use worker::Worker;

async fn serve(config: ServerConfig) -> color_eyre::Result<()> {
    let db = init_database(&config.db_config).await?;
    let token = CancellationToken::new();
    shutdown_on_ctrl_c(token.clone());

    let worker = if config.no_worker {
        tracing::info!("Download worker disabled");
        None
    } else {
        let worker = Worker::new(db.clone(), &config.worker_config, token.clone())?;
        Some(tokio::spawn(worker.run()))
    };

    let app = create_router(AppState::new(db, config.static_dir));
    let listener = tokio::net::TcpListener::bind(&config.host).await?;
    tracing::info!("Listening on: {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(token.clone().cancelled_owned())
        .await?;

    if let Some(worker) = worker {
        worker.await?;
    }
    Ok(())
}

fn shutdown_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutting down"),
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    color_eyre::install()?;

    let cli = config::cli();
    match cli.command {
        Command::Serve(server_config) => serve(server_config).await?,
        Command::Worker {
            db_config,
            worker_config,
        } => {
            let db = init_database(&db_config).await?;
            let token = CancellationToken::new();
            shutdown_on_ctrl_c(token.clone());
            Worker::new(db, &worker_config, token)?.run().await;
        }
        Command::Folders { db_config, base } => {
            let db = init_database(&db_config).await?;
            let base = match base {
                Some(base) => base,
                None => backend::kv_config::DownloaderSettings::load(&db)
                    .await?
                    .download_path
                    .into(),
            };
            let categories = queue::QueueStore::new(db).categories().await?;
            let created = folders::create_category_folders(&base, &categories).await?;
            println!("{} folder(s) under {}", created.len(), base.display());
        }
        Command::Client(command) => return client::commands::run(command, &cli.client).await,
    }
    Ok(ExitCode::SUCCESS)
}
