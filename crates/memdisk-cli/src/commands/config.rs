use std::path::Path;

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use memdisk::config::Config;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ConfigCommand {
    #[clap(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    #[clap(about = "Show the effective configuration (file plus environment overrides)")]
    Show,
}

impl ConfigCommand {
    pub fn execute(
        &self,
        config: &Config,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> CliResult<()> {
        match &self.command {
            ConfigSubcommand::Show => Self::show(config, config_path, format),
        }
    }

    fn show(config: &Config, config_path: Option<&Path>, format: OutputFormat) -> CliResult<()> {
        let key_status = if credential_present(&config.backend.hosted.api_key_env) {
            "set"
        } else {
            "not set"
        };

        match format {
            OutputFormat::Json => {
                let mut output = serde_json::to_value(config)?;
                output["backend"]["hosted"]["api_key_status"] = key_status.into();
                output["backend"]["active_model"] = config.backend.initial_model().into();
                output["routing"]["effective_model"] = config.routing_model().into();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                match config_path {
                    Some(path) => println!("Configuration from: {}", path.display()),
                    None => println!("Configuration: (default search paths)"),
                }
                println!("==============================\n");

                print_section(
                    "Storage",
                    &[("disk_dir", config.storage.disk_dir.display().to_string())],
                );
                print_section(
                    "Context",
                    &[("char_budget", config.context.char_budget.to_string())],
                );

                let local = &config.backend.local;
                let hosted = &config.backend.hosted;
                print_section(
                    "Backend",
                    &[
                        ("mode", config.backend.mode.to_string()),
                        ("active_model", config.backend.initial_model()),
                        ("local.endpoint", local.endpoint.clone()),
                        ("local.model", local.model.clone()),
                        ("local.max_tokens", local.max_tokens.to_string()),
                        ("local.temperature", local.temperature.to_string()),
                        ("hosted.api_url", hosted.api_url.clone()),
                        (
                            "hosted.api_key_env",
                            format!("{} ({key_status})", hosted.api_key_env),
                        ),
                        ("hosted.model", hosted.model.clone()),
                        ("hosted.max_tokens", hosted.max_tokens.to_string()),
                        ("hosted.temperature", hosted.temperature.to_string()),
                    ],
                );
                print_section(
                    "Routing",
                    &[
                        ("model", config.routing_model()),
                        ("max_tokens", config.routing.max_tokens.to_string()),
                        ("temperature", config.routing.temperature.to_string()),
                    ],
                );
                print_section(
                    "Server",
                    &[("listen_addr", config.server.listen_addr.clone())],
                );
            }
        }

        Ok(())
    }
}

fn print_section(title: &str, rows: &[(&str, String)]) {
    println!("[{title}]");
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["Setting", "Value"]);
    for (setting, value) in rows {
        table.add_row([*setting, value.as_str()]);
    }
    println!("{table}\n");
}

fn credential_present(var: &str) -> bool {
    std::env::var(var).is_ok_and(|v| !v.trim().is_empty())
}
