// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use async_trait::async_trait;
use capyswarm_core::domain::agent::{Agent, AgentColor, StepObserver};
use capyswarm_core::domain::llm::{
    ActRequest, ActResponse, AgentBackend, LLMError, Message, Step,
};
use capyswarm_core::domain::session::{
    BashCommand, ComputerCommand, EditCommand, LiveViewer, Session, SessionError,
    SessionHandle, SessionKind, SessionProvider,
};
use capyswarm_swarm::{SessionOptions, Swarm, SwarmOptions};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const REPORT: &str = "# Final Report\n\nAll agents finished.";

// ============================================================================
// Backend
// ============================================================================

/// Deterministic backend keyed on the invoked agent.
///
/// The orchestrator is recognised by its `inspect_agent` tool; workers by the
/// name in their system prompt.
pub struct ScriptedBackend {
    plan: Option<Value>,
    fail_planning: bool,
    fail_aggregation: bool,
    failing: HashSet<String>,
    failing_instructions: HashSet<String>,
    chatty: HashSet<String>,
    delay: Duration,
    log: Mutex<Vec<String>>,
    aggregation_history: Mutex<Vec<Message>>,
}

impl ScriptedBackend {
    pub fn new(plan: Value) -> Self {
        Self {
            plan: Some(plan),
            fail_planning: false,
            fail_aggregation: false,
            failing: HashSet::new(),
            failing_instructions: HashSet::new(),
            chatty: HashSet::new(),
            delay: Duration::from_millis(30),
            log: Mutex::new(Vec::new()),
            aggregation_history: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_planning(mut self) -> Self {
        self.fail_planning = true;
        self
    }

    pub fn failing_aggregation(mut self) -> Self {
        self.fail_aggregation = true;
        self
    }

    pub fn failing_agent(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// The orchestrator fails when handed this instruction.
    pub fn failing_orchestrator_instruction(mut self, instruction: &str) -> Self {
        self.failing_instructions.insert(instruction.to_string());
        self
    }

    /// The named worker messages the orchestrator during its run.
    pub fn chatty_agent(mut self, name: &str) -> Self {
        self.chatty.insert(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Orchestrator history as seen by the aggregation pass.
    pub fn aggregation_history(&self) -> Vec<Message> {
        self.aggregation_history.lock().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().push(entry);
    }

    fn reply(request: &ActRequest<'_>, text: String, output: Option<Value>) -> ActResponse {
        let step = Step {
            text: Some(text.clone()),
            ..Step::default()
        };
        (request.on_step)(&step);
        let mut messages = Vec::new();
        if let Some(instruction) = request.instruction {
            messages.push(Message::user(instruction));
        }
        messages.push(Message::assistant(text.clone()));
        ActResponse {
            messages,
            steps: vec![step],
            text,
            output,
        }
    }

    async fn act_as_orchestrator(&self, request: ActRequest<'_>) -> Result<ActResponse, LLMError> {
        if request.schema.is_some() {
            self.record("plan".to_string());
            if self.fail_planning {
                return Err(LLMError::Provider("planning refused".into()));
            }
            return Ok(Self::reply(&request, "Plan ready".into(), self.plan.clone()));
        }

        if let Some(instruction) = request.instruction {
            self.record(format!("start:Orchestrator:{}", instruction));
            if self.failing_instructions.contains(instruction) {
                return Err(LLMError::Provider(format!("cannot {}", instruction)));
            }
            return Ok(Self::reply(&request, format!("done: {}", instruction), None));
        }

        let last = request.history.last().map(|m| m.text()).unwrap_or_default();
        if last.starts_with("Based on all the information") {
            self.record("aggregate".to_string());
            *self.aggregation_history.lock() = request.history.to_vec();
            if self.fail_aggregation {
                return Err(LLMError::RateLimit);
            }
            return Ok(Self::reply(&request, REPORT.into(), None));
        }

        self.record(format!("message:{}", last));
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(Self::reply(&request, format!("ack {}", last), None))
    }

    async fn act_as_worker(
        &self,
        name: &str,
        request: ActRequest<'_>,
    ) -> Result<ActResponse, LLMError> {
        self.record(format!("start:{}", name));
        tokio::time::sleep(self.delay).await;

        if self.chatty.contains(name) {
            request
                .tools
                .invoke("communicate", json!({"message": format!("{} checking in", name)}))
                .await
                .map_err(|e| LLMError::Provider(e.to_string()))?;
        }

        self.record(format!("end:{}", name));
        if self.failing.contains(name) {
            return Err(LLMError::Provider(format!("{} crashed", name)));
        }
        let instruction = request.instruction.unwrap_or_default().to_string();
        Ok(Self::reply(&request, format!("{} finished {}", name, instruction), None))
    }
}

fn worker_name(system: &str) -> String {
    system
        .split("<ROLE>\nYou are ")
        .nth(1)
        .and_then(|rest| rest.split(',').next())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn act(&self, request: ActRequest<'_>) -> Result<ActResponse, LLMError> {
        let is_orchestrator = request
            .tools
            .definitions()
            .iter()
            .any(|tool| tool.name == "inspect_agent");
        if is_orchestrator {
            self.act_as_orchestrator(request).await
        } else {
            let name = worker_name(request.system);
            self.act_as_worker(&name, request).await
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Debug)]
pub struct FakeSession {
    id: String,
    journal: Arc<Mutex<Vec<String>>>,
    fail_browser_stop: bool,
}

#[async_trait]
impl Session for FakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn live_view_url(&self) -> Result<String, SessionError> {
        Ok(format!("https://view.example/{}", self.id))
    }

    async fn bash(&self, command: &BashCommand) -> Result<Value, SessionError> {
        Ok(json!({"output": command.command.clone().unwrap_or_default()}))
    }

    async fn computer(&self, _command: &ComputerCommand) -> Result<Value, SessionError> {
        Ok(json!({"output": "ok"}))
    }

    async fn edit(&self, _command: &EditCommand) -> Result<Value, SessionError> {
        Ok(json!({"output": "ok"}))
    }

    async fn stop_browser(&self) -> Result<(), SessionError> {
        self.journal.lock().push(format!("stop_browser:{}", self.id));
        if self.fail_browser_stop {
            return Err(SessionError::Api {
                status: 500,
                body: "browser not running".into(),
            });
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), SessionError> {
        self.journal.lock().push(format!("stop:{}", self.id));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeProvider {
    created: AtomicUsize,
    existing: Vec<String>,
    fail_create: bool,
    fail_browser_stop: bool,
    pub journal: Arc<Mutex<Vec<String>>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions already running at the provider.
    pub fn with_existing(mut self, id: &str) -> Self {
        self.existing.push(id.to_string());
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_browser_stop(mut self) -> Self {
        self.fail_browser_stop = true;
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    fn session(&self, id: String) -> SessionHandle {
        Arc::new(FakeSession {
            id,
            journal: self.journal.clone(),
            fail_browser_stop: self.fail_browser_stop,
        })
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn create_session(
        &self,
        _kind: SessionKind,
        _timeout_hours: f64,
    ) -> Result<SessionHandle, SessionError> {
        if self.fail_create {
            return Err(SessionError::Api {
                status: 402,
                body: "quota exhausted".into(),
            });
        }
        // Widen the window for racing acquisitions
        tokio::time::sleep(Duration::from_millis(10)).await;
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.session(format!("s-{}", n)))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionHandle>, SessionError> {
        Ok(self
            .existing
            .iter()
            .map(|id| self.session(id.clone()))
            .collect())
    }
}

// ============================================================================
// Observers
// ============================================================================

pub struct SilentObserver;

impl StepObserver for SilentObserver {
    fn on_step(&self, _agent_name: &str, _color: AgentColor, _step: &Step) {}
}

#[derive(Default)]
pub struct RecordingViewer {
    pub opened: Mutex<Vec<String>>,
}

impl LiveViewer for RecordingViewer {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.opened.lock().push(url.to_string());
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn default_roster() -> Vec<Agent> {
    vec![
        Agent::worker("Browser Agent").with_description("Collects data from the web"),
        Agent::worker("Data Agent").with_description("Analyzes collected data"),
        Agent::worker("Report Agent"),
        Agent::worker("Archive Agent"),
        Agent::orchestrator("Orchestrator"),
    ]
}

pub fn assignment(agent: &str, prompt: &str, priority: i64) -> Value {
    json!({"agent_name": agent, "prompt": prompt, "priority": priority})
}

pub fn plan(assignments: Vec<Value>) -> Value {
    json!({
        "overall_task": "test task",
        "task_assignments": assignments,
        "execution_notes": ""
    })
}

pub fn quiet_options() -> SwarmOptions {
    SwarmOptions::default()
        .with_observer(Arc::new(SilentObserver))
        .with_viewer(Arc::new(RecordingViewer::default()))
        .with_sessions(SessionOptions {
            viewer_delay: Duration::from_millis(1),
            ..SessionOptions::default()
        })
}

pub fn swarm(
    agents: Vec<Agent>,
    backend: Arc<ScriptedBackend>,
    provider: Arc<FakeProvider>,
) -> Swarm {
    Swarm::new(agents, backend, provider, quiet_options()).unwrap()
}

pub fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{} not in {:?}", entry, log))
}
