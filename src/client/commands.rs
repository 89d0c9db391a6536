//! `xhsq` client subcommands

use std::process::ExitCode;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::import::{ImportError, import_file};
use super::{ApiClient, ClientError, render};
use crate::backend::kv_config::SettingsPatch;
use crate::config::{ClientCommand, ClientConfig, ConfigCommand};

const WATCH_INTERVAL: Duration = Duration::from_secs(10);

/// Run a client subcommand. Failures are printed as a single line and turned
/// into a non-zero exit code.
pub async fn run(command: ClientCommand, config: &ClientConfig) -> color_eyre::Result<ExitCode> {
    let client = ApiClient::new(config.api_url.clone())?;
    tracing::debug!("Using API at {}", client.base());
    match dispatch(&client, command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn dispatch(client: &ApiClient, command: ClientCommand) -> Result<(), ImportError> {
    match command {
        ClientCommand::Add { url, category } => {
            let response = client.add(&url, category.as_deref()).await?;
            match response.id {
                Some(id) if response.success => println!("{} (id {id})", response.message),
                _ => println!("{}", response.message),
            }
        }
        ClientCommand::Queue { all } => {
            let snapshot = client.queue().await?;
            if all {
                print!("{}", render::full_table(&snapshot));
            } else {
                print!("{}", render::pending_list(&snapshot));
            }
        }
        ClientCommand::Watch { all } => watch(client, all).await?,
        ClientCommand::Delete { id } => {
            println!("{}", client.delete_item(&id).await?.message);
        }
        ClientCommand::Clear { yes } => {
            if !yes && !confirm("Delete every pending item?").await? {
                println!("Aborted");
                return Ok(());
            }
            println!("{}", client.clear_pending().await?.message);
        }
        ClientCommand::Categories => {
            print!("{}", render::categories(&client.categories().await?));
        }
        ClientCommand::Config(ConfigCommand::Show) => {
            print!("{}", render::settings(&client.config().await?));
        }
        ClientCommand::Config(ConfigCommand::Set {
            download_path,
            delay_seconds,
        }) => {
            let patch = SettingsPatch {
                download_path,
                delay_seconds,
            };
            if patch.is_empty() {
                println!("Nothing to change");
                return Ok(());
            }
            println!("{}", client.update_config(&patch).await?.message);
            print!("{}", render::settings(&client.config().await?));
        }
        ClientCommand::Import { file, category } => {
            let report = import_file(client, &file, category.as_deref()).await?;
            if report.template_created {
                println!(
                    "Created {}. Add links to it and run again",
                    file.display()
                );
            } else {
                println!(
                    "Queued {}/{} link(s), {} already queued, {} rejected",
                    report.added,
                    report.total(),
                    report.duplicates,
                    report.failed.len()
                );
                if let Some(failed) = report.failed_file {
                    println!("Rejected links saved to {}", failed.display());
                }
                if let Some(done) = report.done_file {
                    println!("Renamed to {}", done.display());
                }
            }
        }
    }
    Ok(())
}

/// Print the queue every 10 seconds until Ctrl-C. A failed poll is reported
/// and the next one is attempted anyway.
async fn watch(client: &ApiClient, all: bool) -> Result<(), ClientError> {
    let mut interval = tokio::time::interval(WATCH_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = interval.tick() => {}
        }

        let stamp = chrono::Local::now().format("%H:%M:%S");
        match client.queue().await {
            Ok(snapshot) => {
                println!("--- {stamp} ---");
                if all {
                    print!("{}", render::full_table(&snapshot));
                } else {
                    print!("{}", render::pending_list(&snapshot));
                }
            }
            Err(e) => eprintln!("--- {stamp} --- error: {e}"),
        }
    }
}

async fn confirm(question: &str) -> std::io::Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{question} [y/N] ").as_bytes())
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
