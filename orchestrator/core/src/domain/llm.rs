// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Llm
//!
//! Provides llm functionality for the system.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Conversation model and the agent backend interface

// Agent Backend Domain Interface (Anti-Corruption Layer)
//
// The backend owns the whole tool-use loop for one invocation: it talks to the
// model, dispatches tool calls to the capability set, reports each step and
// returns the conversation delta.
//
// Implementations in infrastructure/llm/ directory.

use crate::domain::capability::ToolExecutor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Tool results fed back to the model
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        args: Value,
    },
    ToolResult {
        id: String,
        name: String,
        result: Value,
        #[serde(default)]
        is_error: bool,
    },
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    /// Concatenated text parts, newline separated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub id: String,
    pub name: String,
    pub result: Value,
    #[serde(default)]
    pub is_error: bool,
}

/// One model turn plus the tool calls it issued and their results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default)]
    pub tool_results: Vec<ToolResultRecord>,
}

/// Everything the backend needs for one invocation.
pub struct ActRequest<'a> {
    pub model: &'a str,
    pub tools: &'a dyn ToolExecutor,
    pub system: &'a str,
    /// Instruction not yet seen by the model, sent as a new user turn.
    pub instruction: Option<&'a str>,
    pub history: &'a [Message],
    /// When present the output must conform to this JSON schema.
    pub schema: Option<&'a Value>,
    /// Called once per step, before `act` returns.
    pub on_step: &'a (dyn Fn(&Step) + Send + Sync),
}

#[derive(Debug, Clone, Default)]
pub struct ActResponse {
    /// Turns produced by this invocation, including the instruction turn.
    pub messages: Vec<Message>,
    pub steps: Vec<Step>,
    /// Text of the final assistant turn.
    pub text: String,
    /// Structured output, present only when a schema was requested.
    pub output: Option<Value>,
}

/// Domain interface for the language-model backend
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn act(&self, request: ActRequest<'_>) -> Result<ActResponse, LLMError>;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_text_skips_tool_parts() {
        let message = Message {
            role: Role::Assistant,
            content: vec![
                ContentPart::Text { text: "Looking".into() },
                ContentPart::ToolCall {
                    id: "t1".into(),
                    name: "bash".into(),
                    args: json!({"command": "ls"}),
                },
                ContentPart::Text { text: "done".into() },
            ],
        };
        assert_eq!(message.text(), "Looking\ndone");
    }

    #[test]
    fn test_content_part_wire_format() {
        let part = ContentPart::ToolResult {
            id: "t1".into(),
            name: "bash".into(),
            result: json!("ok"),
            is_error: false,
        };
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["type"], "tool_result");
        assert_eq!(value["name"], "bash");
    }
}
