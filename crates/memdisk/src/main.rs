//! MemDisk server - HTTP API over the memory disk query pipeline

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use memdisk::QueryPipeline;
use memdisk::config::{Config, load_env_file};
use memdisk::error::Result;
use memdisk::server::MemdiskServer;

/// MemDisk - answer prompts with the memory disks that matter
#[derive(Parser)]
#[command(name = "memdisk")]
#[command(about = "Routes prompts through relevant memory disks to a local or hosted LLM")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server (default command)
    #[command(name = "serve")]
    Serve {
        /// Address to listen on, overriding the config
        #[arg(long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    load_env_file();
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None => serve(cli.config, None).await,
        Some(Command::Serve { listen }) => serve(cli.config, listen).await,
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,memdisk=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config_path: Option<PathBuf>, listen: Option<String>) -> Result<()> {
    tracing::info!("Starting MemDisk");

    let mut config = Config::load(config_path.as_deref())?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    if let Some(addr) = listen {
        config.server.listen_addr = addr;
    }
    tracing::debug!("Config loaded: {:?}", config);

    let pipeline = Arc::new(QueryPipeline::from_config(&config)?);
    let server = MemdiskServer::new(config.server.clone(), pipeline);
    server.serve().await
}
