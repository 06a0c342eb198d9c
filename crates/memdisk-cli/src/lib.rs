pub mod commands;
pub mod error;
pub mod output;

pub use commands::{ConfigCommand, DiskCommand, QueryCommand};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, format_bytes, format_timestamp, truncate_string};
