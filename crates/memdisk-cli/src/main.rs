use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memdisk::config::{Config, load_env_file};
use memdisk::disk::DiskStore;
use memdisk_cli::commands::{ConfigCommand, DiskCommand, QueryCommand};
use memdisk_cli::error::CliResult;
use memdisk_cli::output::OutputFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "memdisk-cli")]
#[command(about = "MemDisk CLI - manage memory disks and run queries")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'd', global = true, help = "Path to disk directory")]
    pub disk_dir: Option<PathBuf>,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Disk management commands")]
    Disk(DiskCommand),

    #[clap(about = "Answer a prompt using the relevant disks")]
    Query(QueryCommand),

    #[clap(about = "Configuration commands")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    load_env_file();
    init_logging();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    if let Some(dir) = &cli.disk_dir {
        config.storage.disk_dir = dir.clone();
    }

    match &cli.command {
        Command::Disk(cmd) => {
            let store = DiskStore::new(&config.storage.disk_dir);
            cmd.execute(&store, format).await
        }
        Command::Query(cmd) => cmd.execute(&config, format).await,
        Command::Config(cmd) => cmd.execute(&config, cli.config.as_deref(), format),
    }
}

/// Logs go to stderr and stay quiet unless RUST_LOG asks for more
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
