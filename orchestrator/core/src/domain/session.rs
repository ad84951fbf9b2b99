// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Remote Session Interface
//!
//! A session is a remote, stateful sandbox (VM-like machine) that agents act
//! against. The provider creates and lists sessions; each handle exposes the
//! sandbox-control operations used by the default capabilities.
//!
//! Implementations in infrastructure/session/ directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Ubuntu,
    Browser,
    Windows,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Ubuntu => "ubuntu",
            SessionKind::Browser => "browser",
            SessionKind::Windows => "windows",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BashCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub restart: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputerAction {
    Key,
    Type,
    MouseMove,
    LeftClick,
    LeftClickDrag,
    RightClick,
    MiddleClick,
    DoubleClick,
    Screenshot,
    CursorPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputerCommand {
    pub action: ComputerAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<[i64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    View,
    Create,
    StrReplace,
    Insert,
    UndoEdit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditCommand {
    pub command: EditAction,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_range: Option<[i64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_line: Option<i64>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The provider answered with a non-success status.
    #[error("Error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

/// Handle to one live remote session.
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    async fn live_view_url(&self) -> Result<String, SessionError>;

    async fn bash(&self, command: &BashCommand) -> Result<Value, SessionError>;

    async fn computer(&self, command: &ComputerCommand) -> Result<Value, SessionError>;

    async fn edit(&self, command: &EditCommand) -> Result<Value, SessionError>;

    /// Stops higher-level sub-resources attached to the session (browser).
    async fn stop_browser(&self) -> Result<(), SessionError>;

    async fn stop(&self) -> Result<(), SessionError>;
}

pub type SessionHandle = Arc<dyn Session>;

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn create_session(
        &self,
        kind: SessionKind,
        timeout_hours: f64,
    ) -> Result<SessionHandle, SessionError>;

    async fn list_sessions(&self) -> Result<Vec<SessionHandle>, SessionError>;
}

/// Presents a session's live-view URL to a human.
pub trait LiveViewer: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}
