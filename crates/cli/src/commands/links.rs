use super::print_json;
use crate::context::AppContext;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::*;
use common::EventBus;
use links::{LinkDraft, LinkService, LinkUpdate};

#[derive(Debug, Args)]
pub struct LinksCommand {
    #[command(subcommand)]
    command: LinksSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum LinksSubcommand {
    /// Show all quick links
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add a quick link
    Add {
        name: String,
        url: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Change name, url or icon of a link
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a link
    Rm { id: String },
    /// Replace all links with the default set
    Reset,
}

impl LinksCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let svc = LinkService::with_options(ctx.area.clone(), ctx.schema_version(), EventBus::default());
        handle(&svc, self.command).await
    }
}

async fn handle(svc: &LinkService, cmd: LinksSubcommand) -> Result<()> {
    match cmd {
        LinksSubcommand::List { json } => {
            let links = svc.links();
            if json {
                return print_json(&links);
            }
            println!("{} {}", "★".yellow(), format!("Quick links: {}", links.len()).bold());
            for link in &links {
                println!("- {} {} {}", link.id.dimmed(), link.name.bold(), link.url.cyan());
            }
        }
        LinksSubcommand::Add {
            name,
            url,
            icon,
            json,
        } => {
            let mut draft = LinkDraft::new(name, url);
            if let Some(icon) = icon {
                draft = draft.with_icon(icon);
            }
            let link = svc.add_link(draft).await?;
            if json {
                print_json(&link)?;
            } else {
                println!("{} Added link {} ({})", "✓".green(), link.name.bold(), link.id);
            }
        }
        LinksSubcommand::Edit {
            id,
            name,
            url,
            icon,
        } => {
            if name.is_none() && url.is_none() && icon.is_none() {
                bail!("nothing to change, pass --name, --url or --icon");
            }
            let link = svc.update_link(&id, LinkUpdate { name, url, icon }).await?;
            println!("{} Link {} updated", "✓".green(), link.id);
        }
        LinksSubcommand::Rm { id } => {
            if !svc.remove_link(&id).await? {
                bail!("link not found: {}", id);
            }
            println!("{} Link {} removed", "✓".green(), id);
        }
        LinksSubcommand::Reset => {
            let links = svc.reset_to_defaults().await?;
            println!("{} Restored {} default links", "✓".green(), links.len());
        }
    }
    Ok(())
}
