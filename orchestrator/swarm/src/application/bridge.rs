// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Orchestrator Bridge
//!
//! Every invocation of the orchestrator goes through one request/response
//! channel drained by a single [`BridgeWorker`]: the planning pass, each
//! worker's `communicate` call, assignments addressed to the orchestrator and
//! the aggregation pass. Requests are handled one at a time, so the
//! orchestrator's history is never folded by two invocations at once.
//!
//! `inspect` is read-only and is served directly from the roster under a
//! short lock. Routing it through the channel would deadlock, since the
//! orchestrator issues it from inside a bridged invocation.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Serialize orchestrator re-entry across concurrent workers
//! - **Integration:** `CapabilitySet` (communicate/inspect) and `Swarm`

use crate::application::runner::AgentRunner;
use crate::domain::{AgentSnapshot, Roster, SharedAgent};
use capyswarm_core::domain::events::AgentRunEvent;
use capyswarm_core::domain::llm::{ActResponse, Message};
use capyswarm_core::infrastructure::event_bus::EventBus;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Agent {0} not found")]
    AgentNotFound(String),

    #[error("Agent {0} cannot message the orchestrator")]
    InvalidSender(String),

    #[error("Failed to get response from orchestrator")]
    NoResponse,

    #[error("Orchestrator bridge is closed")]
    Closed,
}

/// State applied to the orchestrator before one bridged invocation.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorTurn {
    /// Replaces the current instruction; delivered on this invocation.
    pub instruction: Option<String>,
    /// Folded into the history before the instruction.
    pub seed_history: Option<Vec<Message>>,
    /// Appended to the history as is (tagged worker messages, aggregation).
    pub preamble: Option<Message>,
    /// Structured-output schema for this invocation only.
    pub schema: Option<Value>,
    pub interactive: bool,
}

impl OrchestratorTurn {
    pub fn planning(
        goal: impl Into<String>,
        history: Option<Vec<Message>>,
        schema: Value,
        interactive: bool,
    ) -> Self {
        Self {
            instruction: Some(goal.into()),
            seed_history: history,
            preamble: None,
            schema: Some(schema),
            interactive,
        }
    }

    pub fn assignment(prompt: impl Into<String>) -> Self {
        Self {
            instruction: Some(prompt.into()),
            ..Self::default()
        }
    }

    pub fn message(preamble: Message) -> Self {
        Self {
            preamble: Some(preamble),
            ..Self::default()
        }
    }
}

struct BridgeRequest {
    turn: OrchestratorTurn,
    reply: oneshot::Sender<Option<ActResponse>>,
}

/// Cloneable sending side of the bridge.
#[derive(Clone)]
pub struct BridgeHandle {
    sender: mpsc::Sender<BridgeRequest>,
    roster: Arc<Roster>,
    event_bus: EventBus,
}

impl BridgeHandle {
    /// Runs one orchestrator invocation and waits for its outcome.
    /// `Ok(None)` means the invocation itself failed.
    pub async fn invoke(&self, turn: OrchestratorTurn) -> Result<Option<ActResponse>, BridgeError> {
        metrics::counter!("capyswarm_bridge_requests_total").increment(1);
        let (reply, response) = oneshot::channel();
        self.sender
            .send(BridgeRequest { turn, reply })
            .await
            .map_err(|_| BridgeError::Closed)?;
        response.await.map_err(|_| BridgeError::Closed)
    }

    /// Posts `[from] message` into the orchestrator's history, re-runs the
    /// orchestrator and returns its reply text.
    pub async fn communicate(&self, from: &str, message: &str) -> Result<String, BridgeError> {
        if self.roster.get(from).is_none() {
            return Err(BridgeError::AgentNotFound(from.to_string()));
        }
        if self.roster.is_orchestrator(from) {
            return Err(BridgeError::InvalidSender(from.to_string()));
        }

        info!(from_agent = %from, "Agent messaging orchestrator");
        let preamble = Message::user(format!("[{}] {}", from, message));
        let response = self.invoke(OrchestratorTurn::message(preamble)).await?;

        self.event_bus.publish_agent_event(AgentRunEvent::OrchestratorMessaged {
            from_agent: from.to_string(),
            answered: response.is_some(),
            messaged_at: Utc::now(),
        });

        match response {
            Some(response) if response.text.is_empty() => {
                Ok("No response from orchestrator".to_string())
            }
            Some(response) => Ok(response.text),
            None => {
                warn!(from_agent = %from, "Orchestrator produced no response");
                Err(BridgeError::NoResponse)
            }
        }
    }

    /// Read-only snapshot of the named agent.
    pub fn inspect(&self, agent_name: &str) -> Result<AgentSnapshot, BridgeError> {
        self.roster
            .snapshot(agent_name)
            .ok_or_else(|| BridgeError::AgentNotFound(agent_name.to_string()))
    }

    pub fn orchestrator_name(&self) -> &str {
        self.roster.orchestrator_name()
    }
}

/// Creates a connected handle and worker.
pub fn channel(
    capacity: usize,
    roster: Arc<Roster>,
    event_bus: EventBus,
) -> (BridgeHandle, BridgeReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let orchestrator = roster.orchestrator().clone();
    (
        BridgeHandle {
            sender,
            roster,
            event_bus,
        },
        BridgeReceiver {
            receiver,
            orchestrator,
        },
    )
}

/// Receiving side of the bridge, waiting for a runner to drive it.
pub struct BridgeReceiver {
    receiver: mpsc::Receiver<BridgeRequest>,
    orchestrator: SharedAgent,
}

impl BridgeReceiver {
    pub fn into_worker(self, runner: Arc<AgentRunner>, cancel: CancellationToken) -> BridgeWorker {
        BridgeWorker {
            receiver: self.receiver,
            orchestrator: self.orchestrator,
            runner,
            cancel,
        }
    }
}

/// Single consumer that owns orchestrator invocations.
pub struct BridgeWorker {
    receiver: mpsc::Receiver<BridgeRequest>,
    orchestrator: SharedAgent,
    runner: Arc<AgentRunner>,
    cancel: CancellationToken,
}

impl BridgeWorker {
    pub async fn run(mut self) {
        debug!("Orchestrator bridge started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                request = self.receiver.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
            }
        }
        debug!("Orchestrator bridge stopped");
    }

    async fn handle(&self, request: BridgeRequest) {
        let BridgeRequest { turn, reply } = request;
        let has_schema = turn.schema.is_some();
        {
            let mut orchestrator = self.orchestrator.lock();
            if let Some(history) = turn.seed_history {
                orchestrator.fold_history(history);
            }
            if let Some(preamble) = turn.preamble {
                orchestrator.push_message(preamble);
            }
            match turn.instruction {
                Some(instruction) => orchestrator.set_instruction(instruction),
                // An instruction left over from a failed turn must not ride
                // along with a message or the aggregation prompt.
                None => orchestrator.mark_instruction_delivered(),
            }
            if has_schema {
                orchestrator.set_response_schema(turn.schema);
            }
        }

        let response = self.runner.run_once(&self.orchestrator, turn.interactive).await;

        if has_schema {
            self.orchestrator.lock().set_response_schema(None);
        }
        if reply.send(response).is_err() {
            debug!("Bridge caller went away before the reply");
        }
    }
}
