pub mod config;
pub mod links;
pub mod network;
pub mod storage;
pub mod tasks;

pub use config::ConfigCommand;
pub use links::LinksCommand;
pub use network::NetworkCommand;
pub use storage::StorageCommand;
pub use tasks::TasksCommand;

use anyhow::Result;
use serde::Serialize;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
