use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod accessibility;
mod action;
mod adapter;
mod api;
mod automation;
mod config;
mod error;
mod intent;
mod job;
mod models;
mod screenshot;
mod server;
mod ui_adapter;

#[cfg(test)]
mod testing;

use crate::action::Command;
use crate::adapter::Capabilities;
use crate::automation::Automation;
use crate::server::RemoteControlServer;
use crate::ui_adapter::HeadlessDesktop;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the remote control API
    Serve {
        /// Listener prefix, e.g. http://localhost:8080/
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Run capability commands one at a time
        #[arg(long)]
        serialized: bool,
    },
    /// Execute one free-text command locally and print the result
    Run {
        command: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Serve { prefix, config, serialized } => {
            let cfg = config::load(config.as_deref())?;
            let prefix = prefix.unwrap_or(cfg.prefix);
            let serialized = serialized || cfg.serialize_commands;

            let desktop = Arc::new(HeadlessDesktop::new(&cfg.desktop));
            let caps = Capabilities::from_desktop(desktop);
            let voice = caps.listener.clone();
            let server = RemoteControlServer::new(caps, serialized);

            if !server.start(&prefix).await {
                bail!("could not start the remote control server on {}", prefix);
            }
            println!("AION remote control listening on {}", prefix);

            tokio::signal::ctrl_c().await?;
            log::info!("interrupt received, shutting down");
            server.shutdown().await;
            server.log_statistics();
            voice.stop_listening()?;
        }
        Commands::Run { command, config } => {
            let cfg = config::load(config.as_deref())?;
            let desktop = Arc::new(HeadlessDesktop::new(&cfg.desktop));
            let automation = Automation::new(Capabilities::from_desktop(desktop));
            let envelope = automation
                .execute(Command::Execute { command })
                .await
                .map_err(|e| anyhow::anyhow!(e.message()))?;
            println!("{}", envelope.message);
        }
    }
    Ok(())
}
