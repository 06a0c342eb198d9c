pub mod config;
pub mod disk;
pub mod query;

pub use config::ConfigCommand;
pub use disk::DiskCommand;
pub use query::QueryCommand;
