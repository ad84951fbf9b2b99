// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Capability assembly and dispatch
//!
//! [`assemble`] picks the capability kinds for an agent from its role and
//! optional override list. [`CapabilitySet`] binds those kinds to the agent's
//! session and to the orchestrator bridge and serves them to the backend as a
//! [`ToolExecutor`].

use crate::application::bridge::{BridgeError, BridgeHandle};
use capyswarm_core::domain::agent::AgentRole;
use capyswarm_core::domain::capability::{
    CapabilityError, CapabilityKind, ToolDefinition, ToolExecutor,
};
use capyswarm_core::domain::session::{BashCommand, ComputerCommand, EditCommand, SessionHandle};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Capability kinds for one invocation.
///
/// The override list is used as given, minus any role capability it names;
/// without one the default sandbox set applies. The role capability is always
/// appended last.
pub fn assemble(role: AgentRole, overrides: Option<&[CapabilityKind]>) -> Vec<CapabilityKind> {
    let mut kinds: Vec<CapabilityKind> = match overrides {
        Some(list) => list
            .iter()
            .copied()
            .filter(|kind| !kind.is_role_capability())
            .collect(),
        None => CapabilityKind::DEFAULT_SANDBOX.to_vec(),
    };
    kinds.push(CapabilityKind::for_role(role));
    kinds
}

#[derive(Deserialize)]
struct InspectArgs {
    agent_name: String,
}

#[derive(Deserialize)]
struct CommunicateArgs {
    message: String,
}

impl From<BridgeError> for CapabilityError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::AgentNotFound(name) => CapabilityError::AgentNotFound(name),
            BridgeError::NoResponse => CapabilityError::NoResponse,
            other => CapabilityError::Unavailable(other.to_string()),
        }
    }
}

pub struct CapabilitySet {
    agent_name: String,
    kinds: Vec<CapabilityKind>,
    session: SessionHandle,
    bridge: BridgeHandle,
}

impl CapabilitySet {
    pub fn new(
        agent_name: impl Into<String>,
        kinds: Vec<CapabilityKind>,
        session: SessionHandle,
        bridge: BridgeHandle,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            kinds,
            session,
            bridge,
        }
    }

    pub fn kinds(&self) -> &[CapabilityKind] {
        &self.kinds
    }

    fn parse<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, CapabilityError> {
        serde_json::from_value(args).map_err(|e| CapabilityError::InvalidArguments {
            tool: tool.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ToolExecutor for CapabilitySet {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.kinds.iter().map(|kind| definition(*kind)).collect()
    }

    async fn invoke(&self, name: &str, args: Value) -> Result<Value, CapabilityError> {
        let kind = self
            .kinds
            .iter()
            .copied()
            .find(|kind| kind.tool_name() == name)
            .ok_or_else(|| CapabilityError::UnknownTool(name.to_string()))?;
        debug!(agent = %self.agent_name, tool = name, "Invoking capability");

        match kind {
            CapabilityKind::ShellControl => {
                let command: BashCommand = Self::parse(name, args)?;
                Ok(self.session.bash(&command).await?)
            }
            CapabilityKind::PointerKeyboardControl => {
                let command: ComputerCommand = Self::parse(name, args)?;
                Ok(self.session.computer(&command).await?)
            }
            CapabilityKind::FileEdit => {
                let command: EditCommand = Self::parse(name, args)?;
                Ok(self.session.edit(&command).await?)
            }
            CapabilityKind::Inspect => {
                let InspectArgs { agent_name } = Self::parse(name, args)?;
                let snapshot = self.bridge.inspect(&agent_name)?;
                serde_json::to_value(snapshot).map_err(|e| CapabilityError::InvalidArguments {
                    tool: name.to_string(),
                    reason: e.to_string(),
                })
            }
            CapabilityKind::Communicate => {
                let CommunicateArgs { message } = Self::parse(name, args)?;
                let reply = self.bridge.communicate(&self.agent_name, &message).await?;
                Ok(json!({
                    "from_agent": self.agent_name,
                    "to_agent": self.bridge.orchestrator_name(),
                    "message": message,
                    "orchestrator_response": reply,
                }))
            }
        }
    }
}

/// Tool description and input schema for a capability kind.
pub fn definition(kind: CapabilityKind) -> ToolDefinition {
    let (description, input_schema) = match kind {
        CapabilityKind::ShellControl => (
            "Execute bash commands in the shell",
            json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "The bash command to execute"},
                    "restart": {"type": "boolean", "description": "Whether to restart the shell", "default": false}
                }
            }),
        ),
        CapabilityKind::PointerKeyboardControl => (
            "Control mouse and keyboard for computer interaction",
            json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": [
                            "key", "type", "mouse_move", "left_click", "left_click_drag",
                            "right_click", "middle_click", "double_click", "screenshot",
                            "cursor_position"
                        ],
                        "description": "The computer action to execute"
                    },
                    "coordinate": {
                        "type": "array",
                        "items": {"type": "integer"},
                        "minItems": 2,
                        "maxItems": 2,
                        "description": "Coordinates for mouse actions"
                    },
                    "text": {"type": "string", "description": "Text for keyboard actions"}
                },
                "required": ["action"]
            }),
        ),
        CapabilityKind::FileEdit => (
            "View, create and edit files",
            json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "enum": ["view", "create", "str_replace", "insert", "undo_edit"],
                        "description": "The edit command to execute"
                    },
                    "path": {"type": "string", "description": "Absolute path to the file or directory"},
                    "file_text": {"type": "string", "description": "Content for the create command"},
                    "view_range": {
                        "type": "array",
                        "items": {"type": "integer"},
                        "minItems": 2,
                        "maxItems": 2,
                        "description": "Line range to view"
                    },
                    "old_str": {"type": "string", "description": "String to replace"},
                    "new_str": {"type": "string", "description": "Replacement or inserted string"},
                    "insert_line": {"type": "integer", "description": "Line after which to insert"}
                },
                "required": ["command", "path"]
            }),
        ),
        CapabilityKind::Inspect => (
            "Check an agent's work history to see what they've done or find specific information.",
            json!({
                "type": "object",
                "properties": {
                    "agent_name": {"type": "string", "description": "Name of the agent to inspect"}
                },
                "required": ["agent_name"]
            }),
        ),
        CapabilityKind::Communicate => (
            "Send a message to the Orchestrator to share information, request assistance, or provide updates.",
            json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string", "description": "The message content"}
                },
                "required": ["message"]
            }),
        ),
    };

    ToolDefinition {
        name: kind.tool_name().to_string(),
        description: description.to_string(),
        input_schema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_worker_set() {
        assert_eq!(
            assemble(AgentRole::Worker, None),
            vec![
                CapabilityKind::ShellControl,
                CapabilityKind::PointerKeyboardControl,
                CapabilityKind::FileEdit,
                CapabilityKind::Communicate,
            ]
        );
    }

    #[test]
    fn test_orchestrator_gets_inspect_last() {
        let kinds = assemble(AgentRole::Orchestrator, None);
        assert_eq!(kinds.last(), Some(&CapabilityKind::Inspect));
        assert!(!kinds.contains(&CapabilityKind::Communicate));
    }

    #[test]
    fn test_override_used_verbatim() {
        let overrides = [CapabilityKind::FileEdit, CapabilityKind::ShellControl];
        assert_eq!(
            assemble(AgentRole::Worker, Some(&overrides)),
            vec![
                CapabilityKind::FileEdit,
                CapabilityKind::ShellControl,
                CapabilityKind::Communicate,
            ]
        );
    }

    #[test]
    fn test_override_cannot_grant_other_role_capability() {
        let overrides = [CapabilityKind::Inspect, CapabilityKind::Communicate];
        assert_eq!(
            assemble(AgentRole::Worker, Some(&overrides)),
            vec![CapabilityKind::Communicate]
        );
        assert_eq!(
            assemble(AgentRole::Orchestrator, Some(&[])),
            vec![CapabilityKind::Inspect]
        );
    }

    #[test]
    fn test_definitions_match_tool_names() {
        for kind in [
            CapabilityKind::ShellControl,
            CapabilityKind::PointerKeyboardControl,
            CapabilityKind::FileEdit,
            CapabilityKind::Inspect,
            CapabilityKind::Communicate,
        ] {
            let def = definition(kind);
            assert_eq!(def.name, kind.tool_name());
            assert_eq!(def.input_schema["type"], "object");
        }
    }
}
