// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Roster
//!
//! - [`Roster`]: the validated, immutable set of agents in one swarm.
//! - [`SharedAgent`]: an agent record shared between the scheduler, the
//!   runner and the orchestrator bridge.
//! - [`AgentSnapshot`]: what the orchestrator sees when it inspects an agent.
//!
//! # Invariants
//!
//! - Exactly one orchestrator.
//! - Agent names are non-empty and unique; the name is the routing key.
//! - Locks on a [`SharedAgent`] are never held across an `.await`.

use capyswarm_core::domain::agent::Agent;
use capyswarm_core::domain::llm::{ContentPart, Message, Role, Step};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub type SharedAgent = Arc<Mutex<Agent>>;

/// Roster configuration errors. Fatal at swarm construction.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    #[error("Swarm requires exactly one orchestrator agent")]
    NoOrchestrator,

    #[error("Cannot have multiple orchestrator agents (found {0})")]
    MultipleOrchestrators(usize),

    #[error("Duplicate agent name: {0}")]
    DuplicateAgentName(String),

    #[error("Agent name cannot be empty")]
    EmptyAgentName,

    #[error("Failed to build system prompts: {0}")]
    Prompt(String),
}

pub struct Roster {
    agents: Vec<SharedAgent>,
    by_name: HashMap<String, SharedAgent>,
    orchestrator: SharedAgent,
    orchestrator_name: String,
}

impl Roster {
    pub fn new(agents: Vec<Agent>) -> Result<Self, SwarmError> {
        let orchestrators = agents.iter().filter(|a| a.is_orchestrator()).count();
        match orchestrators {
            0 => return Err(SwarmError::NoOrchestrator),
            1 => {}
            n => return Err(SwarmError::MultipleOrchestrators(n)),
        }

        let mut by_name = HashMap::with_capacity(agents.len());
        let mut shared = Vec::with_capacity(agents.len());
        let mut orchestrator = None;

        for agent in agents {
            let name = agent.name().to_string();
            if name.trim().is_empty() {
                return Err(SwarmError::EmptyAgentName);
            }
            if by_name.contains_key(&name) {
                return Err(SwarmError::DuplicateAgentName(name));
            }
            let is_orchestrator = agent.is_orchestrator();
            let record = Arc::new(Mutex::new(agent));
            if is_orchestrator {
                orchestrator = Some((record.clone(), name.clone()));
            }
            by_name.insert(name, record.clone());
            shared.push(record);
        }

        let (orchestrator, orchestrator_name) = orchestrator.ok_or(SwarmError::NoOrchestrator)?;
        Ok(Self {
            agents: shared,
            by_name,
            orchestrator,
            orchestrator_name,
        })
    }

    pub fn get(&self, name: &str) -> Option<SharedAgent> {
        self.by_name.get(name).cloned()
    }

    pub fn orchestrator(&self) -> &SharedAgent {
        &self.orchestrator
    }

    pub fn orchestrator_name(&self) -> &str {
        &self.orchestrator_name
    }

    pub fn is_orchestrator(&self, name: &str) -> bool {
        self.orchestrator_name == name
    }

    /// Agents in roster order.
    pub fn agents(&self) -> &[SharedAgent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Point-in-time view of the named agent.
    pub fn snapshot(&self, name: &str) -> Option<AgentSnapshot> {
        let agent = self.by_name.get(name)?;
        let agent = agent.lock();
        Some(AgentSnapshot::of(&agent))
    }
}

/// One history turn as exposed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub role: Role,
    /// Plain text for text-only turns, the raw content parts otherwise.
    pub content: Value,
}

impl From<&Message> for SnapshotMessage {
    fn from(message: &Message) -> Self {
        let text_only = message
            .content
            .iter()
            .all(|part| matches!(part, ContentPart::Text { .. }));
        let content = if text_only {
            Value::String(message.text())
        } else {
            serde_json::to_value(&message.content).unwrap_or(Value::Null)
        };
        Self {
            role: message.role,
            content,
        }
    }
}

/// Result of `inspect_agent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_name: String,
    pub current_prompt: Option<String>,
    pub messages: Vec<SnapshotMessage>,
    pub steps: Vec<Step>,
}

impl AgentSnapshot {
    pub fn of(agent: &Agent) -> Self {
        Self {
            agent_name: agent.name().to_string(),
            current_prompt: agent.current_instruction().map(str::to_string),
            messages: agent.history().iter().map(SnapshotMessage::from).collect(),
            steps: agent.step_log().to_vec(),
        }
    }
}
