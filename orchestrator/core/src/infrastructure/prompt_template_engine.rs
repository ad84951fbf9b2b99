// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Role Prompt Engine
//!
//! Renders the system prompt each agent receives when a swarm is assembled,
//! using Handlebars over the swarm roster.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn the roster into role-specific system prompts
//! - **Integration:** Swarm construction → `Agent::install_system_prompt`
//!
//! # Supported Placeholders
//!
//! - `{{agent_name}}` - Name of the agent being prompted (workers only)
//! - `{{peers}}` - Other workers, each with `name` and optional `description`
//! - `{{today}}` - Current date

use crate::domain::agent::AgentRole;
use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

const ORCHESTRATOR_TEMPLATE: &str = "orchestrator";
const WORKER_TEMPLATE: &str = "worker";

// ============================================================================
// Template Context
// ============================================================================

/// One roster entry as seen by the prompt templates
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip)]
    pub role: AgentRole,
}

#[derive(Serialize)]
struct RoleContext<'a> {
    agent_name: &'a str,
    peers: Vec<&'a RosterEntry>,
    today: String,
}

// ============================================================================
// Template Engine
// ============================================================================

pub struct RolePromptEngine {
    handlebars: Handlebars<'static>,
}

impl RolePromptEngine {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(
                ORCHESTRATOR_TEMPLATE,
                include_str!("../../templates/orchestrator.hbs"),
            )
            .context("Invalid orchestrator prompt template")?;
        handlebars
            .register_template_string(WORKER_TEMPLATE, include_str!("../../templates/worker.hbs"))
            .context("Invalid worker prompt template")?;
        Ok(Self { handlebars })
    }

    /// Renders the system prompt for `agent`.
    ///
    /// The orchestrator sees every worker; a worker sees every other worker
    /// and never the orchestrator.
    pub fn system_prompt(&self, agent: &RosterEntry, roster: &[RosterEntry]) -> Result<String> {
        let peers = roster
            .iter()
            .filter(|peer| peer.role == AgentRole::Worker && peer.name != agent.name)
            .collect();
        let context = RoleContext {
            agent_name: &agent.name,
            peers,
            today: chrono::Utc::now().format("%A, %B %-d, %Y").to_string(),
        };
        let template = match agent.role {
            AgentRole::Orchestrator => ORCHESTRATOR_TEMPLATE,
            AgentRole::Worker => WORKER_TEMPLATE,
        };
        self.handlebars
            .render(template, &context)
            .with_context(|| format!("Failed to render system prompt for {}", agent.name))
    }
}

// ============================================================================
// Tests
// ============================================================================
