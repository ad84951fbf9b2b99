// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `capyswarm run`: plan, execute every priority tier and print the report.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use capyswarm_core::domain::llm::Message;
use capyswarm_core::domain::swarm_config::{SessionConfig, SwarmManifest};
use capyswarm_core::infrastructure::llm::backend_from_config;
use capyswarm_core::infrastructure::session::provider_from_config;
use capyswarm_swarm::{RunOptions, SessionOptions, Swarm, SwarmOptions};

#[derive(Args)]
pub struct RunArgs {
    /// Task for the swarm
    #[arg(value_name = "PROMPT")]
    pub prompt: String,

    /// Open each new session's live view in the browser while planning
    #[arg(short, long)]
    pub interactive: bool,

    /// JSON file with prior conversation turns for the orchestrator
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,
}

pub async fn execute(args: RunArgs, config_override: Option<PathBuf>) -> Result<()> {
    let manifest =
        SwarmManifest::load_or_default(config_override).context("Failed to load configuration")?;
    manifest
        .validate()
        .context("Configuration validation failed")?;

    let history = args.history.as_deref().map(load_history).transpose()?;

    let backend = backend_from_config(&manifest.spec.llm)?;
    let provider = provider_from_config(&manifest.spec.sessions)?;
    let options = SwarmOptions::default().with_sessions(session_options(&manifest.spec.sessions));
    let swarm = Swarm::new(manifest.build_agents(), backend, provider, options)
        .context("Failed to assemble swarm")?;

    info!(swarm = %manifest.metadata.name, agents = swarm.roster().len(), "Starting swarm run");
    println!("{}", format!("Running swarm '{}'...", manifest.metadata.name).bold());
    println!();

    let run = swarm.run_with(
        &args.prompt,
        history,
        RunOptions {
            interactive: args.interactive,
        },
    );
    let report = tokio::select! {
        report = run => Some(report),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down sessions");
            None
        }
    };

    swarm.shutdown().await;

    match report {
        Some(report) => {
            println!();
            println!("{}", "Final report:".bold());
            println!("{}", report);
            Ok(())
        }
        None => {
            eprintln!("{}", "Run interrupted".yellow());
            std::process::exit(130);
        }
    }
}

fn session_options(config: &SessionConfig) -> SessionOptions {
    SessionOptions {
        kind: config.kind,
        timeout_hours: config.timeout_hours,
        viewer_delay: Duration::from_secs(config.viewer_delay_secs),
    }
}

fn load_history(path: &Path) -> Result<Vec<Message>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid history file {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capyswarm_core::domain::llm::Role;
    use capyswarm_core::domain::session::SessionKind;
    use std::io::Write;

    #[test]
    fn test_session_options_from_manifest() {
        let config: SessionConfig = serde_yaml::from_str(
            "kind: browser\ntimeout_hours: 2.5\nviewer_delay_secs: 3\n",
        )
        .unwrap();
        let options = session_options(&config);
        assert_eq!(options.kind, SessionKind::Browser);
        assert_eq!(options.timeout_hours, 2.5);
        assert_eq!(options.viewer_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_load_history() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"role": "user", "content": [{{"type": "text", "text": "Find flights"}}]}},
                {{"role": "assistant", "content": [{{"type": "text", "text": "Which dates?"}}]}}
            ]"#
        )
        .unwrap();

        let history = load_history(file.path()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].text(), "Which dates?");
    }

    #[test]
    fn test_load_history_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_history(file.path()).is_err());
    }
}
