use super::print_json;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::*;
use infrastructure::config::{ConfigError, ConfigLoader, ConfigSource, ConfigValidator, DeskConfig};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show the resolved configuration
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Write an example configuration file
    Init {
        #[arg(short, long, default_value = ".deskpadrc.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Check the resolved configuration
    #[command(alias = "check")]
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, config: &DeskConfig, source: &ConfigSource) -> Result<()> {
        match &self.command {
            ConfigSubcommand::Show { json } => show(config, source, *json),
            ConfigSubcommand::Init { output, force } => init(output, *force).await,
            ConfigSubcommand::Validate => validate(config, source),
        }
    }
}

fn describe_source(source: &ConfigSource) -> String {
    match source {
        ConfigSource::File(path) => path.display().to_string(),
        ConfigSource::Default => "built-in defaults".to_string(),
    }
}

fn show(config: &DeskConfig, source: &ConfigSource, json: bool) -> Result<()> {
    if json {
        return print_json(config);
    }
    println!("# source: {}", describe_source(source));
    println!("# data dir: {}", config.data_dir().display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite",
            output.display()
        );
    }

    let content = ConfigLoader::generate_example_config();
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(output, content).await?;
    info!("Configuration file generated at: {}", output.display());

    println!("{} Configuration written to {}", "✓".green(), output.display());
    Ok(())
}

fn validate(config: &DeskConfig, source: &ConfigSource) -> Result<()> {
    match ConfigValidator::new().validate(config) {
        Ok(()) => {
            println!(
                "{} Configuration is valid ({})",
                "✓".green(),
                describe_source(source)
            );
            Ok(())
        }
        Err(ConfigError::Invalid(errors)) => {
            println!("{} Configuration is invalid:", "✗".red());
            for message in errors.messages() {
                println!("  - {}", message);
            }
            bail!("{} problem(s) found", errors.len())
        }
        Err(e) => Err(e.into()),
    }
}
