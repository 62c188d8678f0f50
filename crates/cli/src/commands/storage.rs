use super::print_json;
use crate::context::AppContext;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use serde::Serialize;
use storage::CapacityReport;
use uuid::Uuid;

#[derive(Debug, Args)]
pub struct StorageCommand {
    #[command(subcommand)]
    command: StorageSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum StorageSubcommand {
    /// Backend, location, usage and stored keys
    Info {
        #[arg(long)]
        json: bool,
    },
    /// Delete everything in the storage area
    Clear {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Serialize)]
struct StorageInfo {
    backend: &'static str,
    kind: String,
    path: Option<String>,
    capacity: CapacityReport,
    keys: Vec<String>,
}

impl StorageCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        match self.command {
            StorageSubcommand::Info { json } => info(ctx, json),
            StorageSubcommand::Clear { yes } => clear(ctx, yes),
        }
    }
}

fn info(ctx: &AppContext, json: bool) -> Result<()> {
    let info = StorageInfo {
        backend: ctx.area.backend_name(),
        kind: ctx.area.kind().to_string(),
        path: ctx.database_path.as_ref().map(|p| p.display().to_string()),
        capacity: ctx.area.estimate().context("Failed to estimate storage usage")?,
        keys: ctx.area.keys().context("Failed to list storage keys")?,
    };

    if json {
        return print_json(&info);
    }

    println!("{} Storage", "ℹ".blue());
    println!("  backend: {} ({})", info.backend, info.kind);
    if let Some(path) = &info.path {
        println!("  path: {}", path);
    }
    println!(
        "  used: {} / {} bytes ({:.2}%)",
        info.capacity.used_bytes, info.capacity.quota_bytes, info.capacity.usage_percent
    );
    println!("  available: {} bytes", info.capacity.available_bytes);
    println!("  keys: {}", info.keys.join(", "));
    Ok(())
}

fn clear(ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to clear storage without --yes");
    }
    ctx.area.clear(Uuid::new_v4()).context("Failed to clear storage")?;
    println!("{} Storage cleared", "✓".green());
    Ok(())
}
