// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use capyswarm_core::domain::agent::SHARED_SESSION;
use capyswarm_core::domain::swarm_config::{SwarmManifest, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a sample manifest with the default roster
    Generate {
        /// Output path (default: ./capyswarm.yaml)
        #[arg(short, long, default_value = "./capyswarm.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = SwarmManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./capyswarm.yaml");
        println!("  4. ~/.capyswarm/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Swarm:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let llm = &config.spec.llm;
    println!("{}", "LLM Backend:".bold());
    println!("  Provider: {}", llm.provider);
    println!("  Endpoint: {}", llm.endpoint);
    println!("  Default model: {}", llm.default_model);
    println!("  Max steps: {}", llm.max_steps);
    println!();

    let sessions = &config.spec.sessions;
    println!("{}", "Sessions:".bold());
    println!("  Provider: {}", sessions.provider);
    println!("  Endpoint: {}", sessions.endpoint);
    println!("  Kind: {}", sessions.kind.as_str());
    println!("  Timeout: {}h", sessions.timeout_hours);
    println!();

    println!("{}", "Agents:".bold());
    for agent in &config.spec.agents {
        let role = if agent.orchestrator { "orchestrator" } else { "worker" };
        let name = match agent.color {
            Some([r, g, b]) => agent.name.truecolor(r, g, b).bold(),
            None => agent.name.bold(),
        };
        println!("  {} ({})", name, role);
        if let Some(description) = &agent.description {
            println!("    {}", description.dimmed());
        }
        if agent.session.as_str() != SHARED_SESSION {
            println!("    Session: {}", agent.session);
        }
        if let Some(model) = &agent.model {
            println!("    Model: {}", model);
        }
        if let Some(capabilities) = &agent.capabilities {
            let tools: Vec<&str> = capabilities.iter().map(|c| c.tool_name()).collect();
            println!("    Tools: {}", tools.join(", "));
        }
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config =
        SwarmManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    let sample = SwarmManifest::default().to_yaml_string()?;

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
