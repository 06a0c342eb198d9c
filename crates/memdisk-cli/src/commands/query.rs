use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use memdisk::config::Config;
use memdisk::context::InlineDisk;
use memdisk::pipeline::{QueryPipeline, QueryRequest};
use serde_json::Value;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct QueryCommand {
    #[clap(help = "Prompt to answer")]
    pub prompt: String,

    #[clap(
        long = "disk",
        help = "Candidate disk (repeatable); defaults to every disk in the store"
    )]
    pub disks: Vec<String>,

    #[clap(
        long = "inline",
        short,
        value_name = "NAME=TEXT",
        help = "Ephemeral text disk for this query only (repeatable)"
    )]
    pub inline: Vec<String>,

    #[clap(long, short, help = "Passphrase for encrypted disks")]
    pub key: Option<String>,

    #[clap(long, short, help = "Model id to use instead of the configured default")]
    pub model: Option<String>,

    #[clap(long, help = "Send every candidate disk without asking the classifier")]
    pub no_route: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let pipeline = QueryPipeline::from_config(config)?;
        if let Some(model) = &self.model {
            pipeline.set_active_model(model)?;
        }

        let disks = if self.disks.is_empty() {
            pipeline.list_disks().await?
        } else {
            self.disks.clone()
        };

        let inline_disks = self
            .inline
            .iter()
            .map(|spec| parse_inline(spec))
            .collect::<CliResult<Vec<_>>>()?;

        let mut request = QueryRequest::new(&self.prompt)
            .with_disks(disks)
            .with_inline_disks(inline_disks);
        if let Some(key) = &self.key {
            request = request.with_key(key);
        }
        request.skip_routing = self.no_route;

        let response = pipeline.handle_query(request).await?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            OutputFormat::Table => {
                println!("{}\n", response.output);

                let routing = &response.routing;
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Routing", "Value"]);

                table.add_row(["Model", &pipeline.active_model()]);
                table.add_row(["Relevant disks", &join_or_dash(routing.relevant_disk_names())]);
                table.add_row(["Inline disks", &join_or_dash(routing.inline_disk_names())]);
                table.add_row(["Analysis", routing.analysis()]);

                println!("{table}");
            }
        }

        Ok(())
    }
}

/// Parse `NAME=TEXT` into an inline text disk
pub fn parse_inline(spec: &str) -> CliResult<InlineDisk> {
    let (name, text) = spec
        .split_once('=')
        .ok_or_else(|| format!("Inline disk must be NAME=TEXT, got '{spec}'"))?;
    if name.trim().is_empty() {
        return Err(format!("Inline disk name is empty in '{spec}'").into());
    }
    Ok(InlineDisk::new(name.trim(), Value::String(text.to_string())))
}

fn join_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_inline() {
        let disk = parse_inline("scratch=hello = world").unwrap();
        assert_eq!(disk.name, "scratch");
        assert_eq!(disk.content, Some(json!("hello = world")));

        assert!(parse_inline("no-separator").is_err());
        assert!(parse_inline(" =text").is_err());
    }
}
