// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capabilities
//!
//! The closed set of tools an agent can be equipped with, and the
//! [`ToolExecutor`] seam through which the backend invokes them.
//!
//! | Kind | Tool name | Available to |
//! |------|-----------|--------------|
//! | `ShellControl` | `bash` | any agent |
//! | `PointerKeyboardControl` | `computer` | any agent |
//! | `FileEdit` | `str_replace_editor` | any agent |
//! | `Inspect` | `inspect_agent` | orchestrator only |
//! | `Communicate` | `communicate` | workers only |

use crate::domain::agent::AgentRole;
use crate::domain::session::SessionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    ShellControl,
    PointerKeyboardControl,
    FileEdit,
    Inspect,
    Communicate,
}

impl CapabilityKind {
    /// Sandbox-control set used when an agent declares no override.
    pub const DEFAULT_SANDBOX: [CapabilityKind; 3] = [
        CapabilityKind::ShellControl,
        CapabilityKind::PointerKeyboardControl,
        CapabilityKind::FileEdit,
    ];

    pub fn tool_name(&self) -> &'static str {
        match self {
            CapabilityKind::ShellControl => "bash",
            CapabilityKind::PointerKeyboardControl => "computer",
            CapabilityKind::FileEdit => "str_replace_editor",
            CapabilityKind::Inspect => "inspect_agent",
            CapabilityKind::Communicate => "communicate",
        }
    }

    /// True for the bridge capabilities that are granted by role.
    pub fn is_role_capability(&self) -> bool {
        matches!(self, CapabilityKind::Inspect | CapabilityKind::Communicate)
    }

    pub fn for_role(role: AgentRole) -> Self {
        match role {
            AgentRole::Orchestrator => CapabilityKind::Inspect,
            AgentRole::Worker => CapabilityKind::Communicate,
        }
    }
}

/// Tool description handed to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Errors surfaced to the model as failed tool results.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Agent {0} not found")]
    AgentNotFound(String),

    #[error("Failed to get response from orchestrator")]
    NoResponse,

    #[error("Orchestrator channel unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The set of tools bound for one agent invocation.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    async fn invoke(&self, name: &str, args: Value) -> Result<Value, CapabilityError>;
}
