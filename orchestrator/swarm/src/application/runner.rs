// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Runner
//!
//! Executes one agent invocation: acquire the session, assemble the
//! capability set, call the backend and fold the conversation delta into the
//! agent's history.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Fault-isolated single-agent execution
//!
//! Failures of any kind are logged with the agent's name and reported as
//! `None`; a failing agent never aborts the batch it was launched in.

use crate::application::bridge::BridgeHandle;
use crate::application::capabilities::{assemble, CapabilitySet};
use crate::application::registry::SessionRegistry;
use crate::domain::SharedAgent;
use capyswarm_core::domain::agent::StepObserver;
use capyswarm_core::domain::events::AgentRunEvent;
use capyswarm_core::domain::llm::{ActRequest, ActResponse, AgentBackend, LLMError, Step};
use capyswarm_core::domain::session::SessionError;
use capyswarm_core::infrastructure::event_bus::EventBus;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Session unavailable: {0}")]
    Session(#[from] SessionError),

    #[error("Backend failed: {0}")]
    Backend(#[from] LLMError),
}

pub struct AgentRunner {
    backend: Arc<dyn AgentBackend>,
    registry: Arc<SessionRegistry>,
    bridge: BridgeHandle,
    event_bus: EventBus,
    default_observer: Arc<dyn StepObserver>,
}

impl AgentRunner {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        registry: Arc<SessionRegistry>,
        bridge: BridgeHandle,
        event_bus: EventBus,
        default_observer: Arc<dyn StepObserver>,
    ) -> Self {
        Self {
            backend,
            registry,
            bridge,
            event_bus,
            default_observer,
        }
    }

    /// Runs the agent's current instruction once. `None` on any failure.
    pub async fn run_once(&self, agent: &SharedAgent, interactive: bool) -> Option<ActResponse> {
        let agent_name = agent.lock().name().to_string();
        self.event_bus.publish_agent_event(AgentRunEvent::RunStarted {
            agent_name: agent_name.clone(),
            started_at: Utc::now(),
        });

        match self.try_run(agent, &agent_name, interactive).await {
            Ok(response) => {
                metrics::counter!("capyswarm_agent_runs_total", "outcome" => "success").increment(1);
                info!(agent = %agent_name, steps = response.steps.len(), "Agent run completed");
                self.event_bus.publish_agent_event(AgentRunEvent::RunCompleted {
                    agent_name,
                    steps: response.steps.len(),
                    completed_at: Utc::now(),
                });
                Some(response)
            }
            Err(e) => {
                metrics::counter!("capyswarm_agent_runs_total", "outcome" => "failure").increment(1);
                error!(agent = %agent_name, error = %e, "Error running agent {}: {}", agent_name, e);
                self.event_bus.publish_agent_event(AgentRunEvent::RunFailed {
                    agent_name,
                    error: e.to_string(),
                    failed_at: Utc::now(),
                });
                None
            }
        }
    }

    async fn try_run(
        &self,
        agent: &SharedAgent,
        agent_name: &str,
        interactive: bool,
    ) -> Result<ActResponse, RunnerError> {
        let session = self.registry.acquire(agent, interactive).await?;

        let (model, system, instruction, history, schema, kinds, observer, color) = {
            let agent = agent.lock();
            (
                agent.model.clone(),
                agent.system_prompt().to_string(),
                agent.pending_instruction().map(str::to_string),
                agent.history().to_vec(),
                agent.response_schema().cloned(),
                assemble(agent.role(), agent.capabilities()),
                agent.observer().unwrap_or_else(|| self.default_observer.clone()),
                agent.color,
            )
        };

        let tools = CapabilitySet::new(agent_name, kinds, session, self.bridge.clone());
        let on_step = |step: &Step| {
            observer.on_step(agent_name, color, step);
            agent.lock().record_step(step.clone());
        };

        let response = self
            .backend
            .act(ActRequest {
                model: &model,
                tools: &tools,
                system: &system,
                instruction: instruction.as_deref(),
                history: &history,
                schema: schema.as_ref(),
                on_step: &on_step,
            })
            .await?;

        {
            let mut agent = agent.lock();
            if instruction.is_some() {
                agent.mark_instruction_delivered();
            }
            agent.fold_history(response.messages.clone());
        }
        Ok(response)
    }
}
