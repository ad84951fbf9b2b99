// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm Scheduler
//!
//! Drives one run: a planning pass on the orchestrator, the plan's
//! assignments in descending priority tiers with a barrier between tiers,
//! then an aggregation pass whose text is the run's result.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Plan, execute tiers, aggregate
//!
//! `run` never fails for agent-level problems. A missing plan or report is
//! reported through [`PLANNING_FAILED`] / [`AGGREGATION_FAILED`].

use crate::application::bridge::{self, BridgeHandle, BridgeWorker, OrchestratorTurn};
use crate::application::registry::{SessionOptions, SessionRegistry};
use crate::application::runner::AgentRunner;
use crate::domain::{AgentSnapshot, Roster, SharedAgent, SwarmError};
use capyswarm_core::domain::agent::{Agent, StepObserver};
use capyswarm_core::domain::events::SwarmEvent;
use capyswarm_core::domain::llm::{AgentBackend, Message};
use capyswarm_core::domain::plan::{OrchestratorPlan, TaskAssignment};
use capyswarm_core::domain::session::{LiveViewer, SessionProvider};
use capyswarm_core::infrastructure::console::ConsoleStepObserver;
use capyswarm_core::infrastructure::event_bus::EventBus;
use capyswarm_core::infrastructure::prompt_template_engine::{RolePromptEngine, RosterEntry};
use capyswarm_core::infrastructure::viewer::BrowserViewer;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const PLANNING_FAILED: &str = "Failed to create initial plan";
pub const AGGREGATION_FAILED: &str = "Failed to generate final report";
pub const AGGREGATION_PROMPT: &str = "Based on all the information shared during this task:
1. Create a comprehensive final report
2. Include key findings and insights from all agents
3. Format the report in a clear, readable way using markdown";

pub struct SwarmOptions {
    pub sessions: SessionOptions,
    pub viewer: Arc<dyn LiveViewer>,
    /// Observer for agents that do not carry their own.
    pub observer: Arc<dyn StepObserver>,
    pub event_bus: EventBus,
    /// Pending orchestrator requests buffered before callers wait to send.
    pub bridge_capacity: usize,
}

impl Default for SwarmOptions {
    fn default() -> Self {
        Self {
            sessions: SessionOptions::default(),
            viewer: Arc::new(BrowserViewer),
            observer: Arc::new(ConsoleStepObserver),
            event_bus: EventBus::default(),
            bridge_capacity: 32,
        }
    }
}

impl SwarmOptions {
    pub fn with_sessions(mut self, sessions: SessionOptions) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_viewer(mut self, viewer: Arc<dyn LiveViewer>) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Open the live view of newly created sessions during planning.
    pub interactive: bool,
}

/// Per-tier tally of assignment outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub dropped: usize,
}

pub struct Swarm {
    roster: Arc<Roster>,
    runner: Arc<AgentRunner>,
    registry: Arc<SessionRegistry>,
    bridge: BridgeHandle,
    pending_worker: Mutex<Option<BridgeWorker>>,
    worker_task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    event_bus: EventBus,
}

impl Swarm {
    /// Validates the roster and installs every agent's role prompt.
    pub fn new(
        agents: Vec<Agent>,
        backend: Arc<dyn AgentBackend>,
        provider: Arc<dyn SessionProvider>,
        options: SwarmOptions,
    ) -> Result<Self, SwarmError> {
        let roster = Arc::new(Roster::new(agents)?);
        install_system_prompts(&roster)?;

        let event_bus = options.event_bus;
        let registry = Arc::new(SessionRegistry::new(
            provider,
            options.viewer,
            options.sessions,
            event_bus.clone(),
        ));
        let (bridge, receiver) =
            bridge::channel(options.bridge_capacity, roster.clone(), event_bus.clone());
        let runner = Arc::new(AgentRunner::new(
            backend,
            registry.clone(),
            bridge.clone(),
            event_bus.clone(),
            options.observer,
        ));
        let cancel = CancellationToken::new();
        let worker = receiver.into_worker(runner.clone(), cancel.child_token());

        info!(
            agents = roster.len(),
            orchestrator = %roster.orchestrator_name(),
            "Swarm assembled"
        );

        Ok(Self {
            roster,
            runner,
            registry,
            bridge,
            pending_worker: Mutex::new(Some(worker)),
            worker_task: Mutex::new(None),
            cancel,
            event_bus,
        })
    }

    /// Spawns the bridge worker on first use.
    fn ensure_bridge(&self) {
        if let Some(worker) = self.pending_worker.lock().take() {
            *self.worker_task.lock() = Some(tokio::spawn(worker.run()));
        }
    }

    pub async fn run(&self, prompt: &str) -> String {
        self.run_with(prompt, None, RunOptions::default()).await
    }

    /// Plans, executes every tier and returns the aggregated report.
    pub async fn run_with(
        &self,
        prompt: &str,
        history: Option<Vec<Message>>,
        options: RunOptions,
    ) -> String {
        self.ensure_bridge();

        let plan = match self.plan(prompt, history, options.interactive).await {
            Ok(plan) => plan,
            Err(reason) => {
                warn!(reason = %reason, "Planning pass failed");
                self.event_bus.publish_swarm_event(SwarmEvent::PlanningFailed {
                    reason,
                    failed_at: Utc::now(),
                });
                return PLANNING_FAILED.to_string();
            }
        };

        let tiers = plan.into_tiers();
        self.event_bus.publish_swarm_event(SwarmEvent::PlanCreated {
            assignment_count: tiers.iter().map(|(_, a)| a.len()).sum(),
            tier_count: tiers.len(),
            created_at: Utc::now(),
        });

        for (priority, assignments) in tiers {
            self.run_tier(priority, assignments).await;
        }

        self.aggregate().await
    }

    async fn plan(
        &self,
        prompt: &str,
        history: Option<Vec<Message>>,
        interactive: bool,
    ) -> Result<OrchestratorPlan, String> {
        info!(orchestrator = %self.roster.orchestrator_name(), "Planning pass started");
        self.event_bus.publish_swarm_event(SwarmEvent::PlanningStarted {
            orchestrator: self.roster.orchestrator_name().to_string(),
            started_at: Utc::now(),
        });

        let turn =
            OrchestratorTurn::planning(prompt, history, OrchestratorPlan::schema(), interactive);
        let response = self
            .bridge
            .invoke(turn)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "orchestrator invocation failed".to_string())?;
        let output = response
            .output
            .ok_or_else(|| "no structured plan in orchestrator response".to_string())?;
        OrchestratorPlan::from_output(&output).map_err(|e| format!("invalid plan: {}", e))
    }

    /// Runs one tier to completion. Assignments for the same agent run in
    /// order on one lane; lanes run concurrently.
    pub async fn run_tier(&self, priority: i64, assignments: Vec<TaskAssignment>) -> TierOutcome {
        self.ensure_bridge();
        info!(priority, assignments = assignments.len(), "Executing priority {} tasks", priority);
        self.event_bus.publish_swarm_event(SwarmEvent::TierStarted {
            priority,
            assignment_count: assignments.len(),
            started_at: Utc::now(),
        });

        let mut outcome = TierOutcome::default();
        let mut lanes: Vec<(String, Vec<String>)> = Vec::new();
        for assignment in assignments {
            if self.roster.get(&assignment.agent_name).is_none() {
                warn!(
                    agent = %assignment.agent_name,
                    priority,
                    "Dropping assignment for unknown agent"
                );
                self.event_bus.publish_swarm_event(SwarmEvent::AssignmentDropped {
                    agent_name: assignment.agent_name,
                    priority,
                    dropped_at: Utc::now(),
                });
                outcome.dropped += 1;
                continue;
            }
            match lanes.iter_mut().find(|(name, _)| *name == assignment.agent_name) {
                Some((_, prompts)) => prompts.push(assignment.prompt),
                None => lanes.push((assignment.agent_name, vec![assignment.prompt])),
            }
        }

        let mut tasks = JoinSet::new();
        for (agent_name, prompts) in lanes {
            let lane = Lane {
                agent: self.roster.get(&agent_name),
                is_orchestrator: self.roster.is_orchestrator(&agent_name),
                runner: self.runner.clone(),
                bridge: self.bridge.clone(),
            };
            tasks.spawn(lane.run(prompts));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((succeeded, failed)) => {
                    outcome.succeeded += succeeded;
                    outcome.failed += failed;
                }
                Err(e) => {
                    error!(priority, error = %e, "Agent task aborted");
                    outcome.failed += 1;
                }
            }
        }

        info!(
            priority,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Completed priority {} tasks",
            priority
        );
        self.event_bus.publish_swarm_event(SwarmEvent::TierCompleted {
            priority,
            succeeded: outcome.succeeded,
            failed: outcome.failed,
            completed_at: Utc::now(),
        });
        outcome
    }

    async fn aggregate(&self) -> String {
        let turn = OrchestratorTurn::message(Message::user(AGGREGATION_PROMPT));
        match self.bridge.invoke(turn).await {
            Ok(Some(response)) => {
                info!(report_len = response.text.len(), "Aggregation pass completed");
                self.event_bus.publish_swarm_event(SwarmEvent::AggregationCompleted {
                    report_len: response.text.len(),
                    completed_at: Utc::now(),
                });
                response.text
            }
            Ok(None) | Err(_) => {
                warn!("Aggregation pass failed");
                self.event_bus.publish_swarm_event(SwarmEvent::AggregationFailed {
                    failed_at: Utc::now(),
                });
                AGGREGATION_FAILED.to_string()
            }
        }
    }

    /// Sends `message` to the orchestrator on behalf of worker `from`.
    pub async fn communicate(&self, from: &str, message: &str) -> Result<String, bridge::BridgeError> {
        self.ensure_bridge();
        self.bridge.communicate(from, message).await
    }

    pub fn inspect(&self, agent_name: &str) -> Result<AgentSnapshot, bridge::BridgeError> {
        self.bridge.inspect(agent_name)
    }

    pub fn agent(&self, name: &str) -> Option<SharedAgent> {
        self.roster.get(name)
    }

    pub fn orchestrator(&self) -> &SharedAgent {
        self.roster.orchestrator()
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    pub fn runner(&self) -> &Arc<AgentRunner> {
        &self.runner
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    /// Stops the bridge worker and tears down every session.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let worker = self.worker_task.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "Orchestrator bridge ended abnormally");
            }
        }
        self.registry.shutdown().await;
        info!("Swarm shut down");
    }
}

impl Drop for Swarm {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Lane {
    agent: Option<SharedAgent>,
    is_orchestrator: bool,
    runner: Arc<AgentRunner>,
    bridge: BridgeHandle,
}

impl Lane {
    /// Returns `(succeeded, failed)`.
    async fn run(self, prompts: Vec<String>) -> (usize, usize) {
        let Some(agent) = self.agent else {
            return (0, prompts.len());
        };
        let mut succeeded = 0;
        let mut failed = 0;
        for prompt in prompts {
            let response = if self.is_orchestrator {
                self.bridge
                    .invoke(OrchestratorTurn::assignment(prompt))
                    .await
                    .ok()
                    .flatten()
            } else {
                agent.lock().set_instruction(prompt);
                self.runner.run_once(&agent, false).await
            };
            match response {
                Some(_) => succeeded += 1,
                None => failed += 1,
            }
        }
        (succeeded, failed)
    }
}

fn install_system_prompts(roster: &Roster) -> Result<(), SwarmError> {
    let engine = RolePromptEngine::new().map_err(|e| SwarmError::Prompt(e.to_string()))?;
    let entries: Vec<RosterEntry> = roster
        .agents()
        .iter()
        .map(|agent| {
            let agent = agent.lock();
            RosterEntry {
                name: agent.name().to_string(),
                description: agent.description.clone(),
                role: agent.role(),
            }
        })
        .collect();

    for (entry, agent) in entries.iter().zip(roster.agents()) {
        let prompt = engine
            .system_prompt(entry, &entries)
            .map_err(|e| SwarmError::Prompt(e.to_string()))?;
        agent.lock().install_system_prompt(prompt);
    }
    Ok(())
}
