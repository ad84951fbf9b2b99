// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Record
//!
//! Mutable descriptor of one swarm participant.
//!
//! - [`Agent`]: identity, session key, conversation history, current
//!   instruction and step log.
//! - [`SessionKey`]: logical key into the session registry. The agent never
//!   holds the session handle itself.
//! - [`StepObserver`]: per-step side channel (console rendering by default).
//!
//! # Invariants
//!
//! - `history` and `step_log` are append-only.
//! - `role` and `system_prompt` are fixed once the swarm is constructed.
//! - `name` is the only identifier; there is no separate id space.

use crate::domain::capability::CapabilityKind;
use crate::domain::llm::{Message, Step};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Raw value of the shared session key.
pub const SHARED_SESSION: &str = "shared";

/// Model used when an agent does not pick one.
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Logical key into the session registry.
///
/// `Shared` is used by every agent that does not request an exclusive
/// session. `Instance` names an already running remote session by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionKey {
    #[default]
    Shared,
    Instance(String),
}

impl SessionKey {
    pub fn is_shared(&self) -> bool {
        matches!(self, SessionKey::Shared)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SessionKey::Shared => SHARED_SESSION,
            SessionKey::Instance(id) => id,
        }
    }
}

impl From<&str> for SessionKey {
    fn from(raw: &str) -> Self {
        if raw == SHARED_SESSION || raw.is_empty() {
            SessionKey::Shared
        } else {
            SessionKey::Instance(raw.to_string())
        }
    }
}

impl From<String> for SessionKey {
    fn from(raw: String) -> Self {
        SessionKey::from(raw.as_str())
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.as_str().to_string()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Orchestrator,
    Worker,
}

/// 24-bit terminal color used when rendering an agent's steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl AgentColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Random color with every channel in `100..=255` so it stays readable
    /// on dark terminals.
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self {
            r: rng.random_range(100..=255),
            g: rng.random_range(100..=255),
            b: rng.random_range(100..=255),
        }
    }
}

impl From<[u8; 3]> for AgentColor {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

/// Receives every execution step the backend emits for an agent.
///
/// Must not influence control flow; the runner records the step into the
/// agent's step log independently of the observer.
pub trait StepObserver: Send + Sync {
    fn on_step(&self, agent_name: &str, color: AgentColor, step: &Step);
}

/// One participant in a swarm.
pub struct Agent {
    name: String,
    role: AgentRole,
    /// Short description of the agent's specialty, shown to its peers.
    pub description: Option<String>,
    pub session_key: SessionKey,
    pub model: String,
    pub color: AgentColor,
    /// Sandbox capability override. `None` selects the default set.
    capabilities: Option<Vec<CapabilityKind>>,
    system_prompt: String,
    current_instruction: Option<String>,
    instruction_pending: bool,
    history: Vec<Message>,
    step_log: Vec<Step>,
    response_schema: Option<serde_json::Value>,
    observer: Option<Arc<dyn StepObserver>>,
}

impl Agent {
    fn with_role(name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            name: name.into(),
            role,
            description: None,
            session_key: SessionKey::Shared,
            model: DEFAULT_MODEL.to_string(),
            color: AgentColor::random(),
            capabilities: None,
            system_prompt: String::new(),
            current_instruction: None,
            instruction_pending: false,
            history: Vec::new(),
            step_log: Vec::new(),
            response_schema: None,
            observer: None,
        }
    }

    pub fn worker(name: impl Into<String>) -> Self {
        Self::with_role(name, AgentRole::Worker)
    }

    pub fn orchestrator(name: impl Into<String>) -> Self {
        Self::with_role(name, AgentRole::Orchestrator)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_session(mut self, key: impl Into<SessionKey>) -> Self {
        self.session_key = key.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_color(mut self, color: AgentColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<CapabilityKind>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn is_orchestrator(&self) -> bool {
        self.role == AgentRole::Orchestrator
    }

    pub fn capabilities(&self) -> Option<&[CapabilityKind]> {
        self.capabilities.as_deref()
    }

    pub fn observer(&self) -> Option<Arc<dyn StepObserver>> {
        self.observer.clone()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Installs the generated system prompt. Only the first call has an
    /// effect.
    pub fn install_system_prompt(&mut self, prompt: String) {
        if self.system_prompt.is_empty() {
            self.system_prompt = prompt;
        }
    }

    pub fn current_instruction(&self) -> Option<&str> {
        self.current_instruction.as_deref()
    }

    /// Overwrites the current instruction. It is delivered to the backend on
    /// the agent's next invocation.
    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.current_instruction = Some(instruction.into());
        self.instruction_pending = true;
    }

    /// The instruction if it has not been delivered to the backend yet.
    pub fn pending_instruction(&self) -> Option<&str> {
        if self.instruction_pending {
            self.current_instruction.as_deref()
        } else {
            None
        }
    }

    pub fn mark_instruction_delivered(&mut self) {
        self.instruction_pending = false;
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn push_message(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Folds an invocation's conversation delta into the history: adopted as
    /// is when the history is empty, appended otherwise.
    pub fn fold_history(&mut self, delta: Vec<Message>) {
        if self.history.is_empty() {
            self.history = delta;
        } else {
            self.history.extend(delta);
        }
    }

    pub fn step_log(&self) -> &[Step] {
        &self.step_log
    }

    pub fn record_step(&mut self, step: Step) {
        self.step_log.push(step);
    }

    pub fn response_schema(&self) -> Option<&serde_json::Value> {
        self.response_schema.as_ref()
    }

    pub fn set_response_schema(&mut self, schema: Option<serde_json::Value>) {
        self.response_schema = schema;
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("session_key", &self.session_key)
            .field("model", &self.model)
            .field("current_instruction", &self.current_instruction)
            .field("history_len", &self.history.len())
            .field("steps", &self.step_log.len())
            .finish_non_exhaustive()
    }
}
