use std::path::PathBuf;

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use memdisk::disk::{DiskContent, DiskStore};

use crate::error::CliResult;
use crate::output::{OutputFormat, format_bytes, format_timestamp, truncate_string};

#[derive(Parser)]
pub struct DiskCommand {
    #[clap(subcommand)]
    pub command: DiskSubcommand,
}

#[derive(Subcommand)]
pub enum DiskSubcommand {
    #[clap(about = "List disks with size and digest")]
    List,

    #[clap(about = "Show a disk's content")]
    Show(ShowArgs),

    #[clap(about = "Write a disk from a JSON or text file")]
    Put(PutArgs),
}

#[derive(Parser)]
pub struct ShowArgs {
    #[clap(help = "Disk name, e.g. travel.dsk")]
    pub name: String,

    #[clap(long, short, help = "Passphrase for an encrypted disk")]
    pub key: Option<String>,
}

#[derive(Parser)]
pub struct PutArgs {
    #[clap(help = "Disk name, e.g. travel.dsk")]
    pub name: String,

    #[clap(long, short, help = "File to read; JSON is stored as-is, anything else as text")]
    pub file: PathBuf,

    #[clap(long, short, help = "Encrypt the disk with this passphrase")]
    pub key: Option<String>,
}

impl DiskCommand {
    pub async fn execute(&self, store: &DiskStore, format: OutputFormat) -> CliResult<()> {
        match &self.command {
            DiskSubcommand::List => Self::list(store, format).await,
            DiskSubcommand::Show(args) => Self::show(store, args, format).await,
            DiskSubcommand::Put(args) => Self::put(store, args, format).await,
        }
    }

    async fn list(store: &DiskStore, format: OutputFormat) -> CliResult<()> {
        let disks = store.list_detailed().await?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&disks)?);
            }
            OutputFormat::Table => {
                if disks.is_empty() {
                    println!("No disks found in {}", store.dir().display());
                    return Ok(());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Name", "Size", "SHA-256", "Modified"]);

                for disk in &disks {
                    table.add_row([
                        disk.name.clone(),
                        format_bytes(disk.size_bytes),
                        truncate_string(&disk.sha256, 15),
                        disk.modified
                            .as_ref()
                            .map(format_timestamp)
                            .unwrap_or_else(|| "-".to_string()),
                    ]);
                }

                println!("{table}");
                println!("\nTotal: {} disks", disks.len());
            }
        }

        Ok(())
    }

    async fn show(store: &DiskStore, args: &ShowArgs, format: OutputFormat) -> CliResult<()> {
        let content = store.load(&args.name, args.key.as_deref()).await?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&content)?);
            }
            OutputFormat::Table => {
                println!("Disk: {}", args.name);
                println!("==============================\n");
                match &content {
                    DiskContent::String(text) => println!("{text}"),
                    other => println!("{}", serde_json::to_string_pretty(other)?),
                }
            }
        }

        Ok(())
    }

    async fn put(store: &DiskStore, args: &PutArgs, format: OutputFormat) -> CliResult<()> {
        let raw = tokio::fs::read_to_string(&args.file)
            .await
            .map_err(|e| format!("Failed to read {}: {e}", args.file.display()))?;
        let content = parse_disk_file(&raw);
        let encrypted = args.key.as_deref().is_some_and(|k| !k.is_empty());

        store.save(&args.name, &content, args.key.as_deref()).await?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "name": args.name,
                    "encrypted": encrypted,
                    "dir": store.dir().display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mode = if encrypted { "encrypted" } else { "plaintext" };
                println!("Wrote {} ({mode}) to {}", args.name, store.dir().display());
            }
        }

        Ok(())
    }
}

/// JSON files keep their structure; anything else becomes a text disk
pub fn parse_disk_file(raw: &str) -> DiskContent {
    serde_json::from_str(raw).unwrap_or_else(|_| DiskContent::String(raw.trim().to_string()))
}
