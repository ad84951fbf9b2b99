// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod common;

use capyswarm_core::domain::events::AgentRunEvent;
use capyswarm_core::domain::llm::{Message, Role};
use capyswarm_swarm::BridgeError;
use common::*;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_messages_are_serialized() {
    let backend = Arc::new(ScriptedBackend::new(plan(vec![])));
    let swarm = swarm(default_roster(), backend, Arc::new(FakeProvider::new()));

    let (a, b) = tokio::join!(
        swarm.communicate("Browser Agent", "found 20 posts"),
        swarm.communicate("Data Agent", "need the posts"),
    );
    assert_eq!(a.unwrap(), "ack [Browser Agent] found 20 posts");
    assert_eq!(b.unwrap(), "ack [Data Agent] need the posts");

    let orchestrator = swarm.orchestrator().lock();
    let history = orchestrator.history();
    assert_eq!(history.len(), 4);
    // Each tagged message is immediately followed by its own reply
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].text(), format!("ack {}", pair[0].text()));
    }
}

#[tokio::test]
async fn test_message_from_unknown_agent_is_rejected() {
    let backend = Arc::new(ScriptedBackend::new(plan(vec![])));
    let swarm = swarm(default_roster(), backend.clone(), Arc::new(FakeProvider::new()));

    let err = swarm.communicate("Ghost Agent", "hello").await.unwrap_err();
    assert!(matches!(err, BridgeError::AgentNotFound(name) if name == "Ghost Agent"));
    assert!(swarm.orchestrator().lock().history().is_empty());
    assert!(backend.log().is_empty());
}

#[tokio::test]
async fn test_orchestrator_cannot_message_itself() {
    let backend = Arc::new(ScriptedBackend::new(plan(vec![])));
    let swarm = swarm(default_roster(), backend, Arc::new(FakeProvider::new()));

    let err = swarm.communicate("Orchestrator", "hello").await.unwrap_err();
    assert!(matches!(err, BridgeError::InvalidSender(_)));
}

#[tokio::test]
async fn test_message_publishes_event() {
    let backend = Arc::new(ScriptedBackend::new(plan(vec![])));
    let swarm = swarm(default_roster(), backend, Arc::new(FakeProvider::new()));
    let mut events = swarm.events().subscribe_agent("Data Agent");

    swarm.communicate("Data Agent", "status?").await.unwrap();

    let event = events.recv().await.unwrap();
    assert!(matches!(
        event,
        AgentRunEvent::OrchestratorMessaged { ref from_agent, answered: true, .. } if from_agent == "Data Agent"
    ));
}

#[tokio::test]
async fn test_inspect_reads_live_state() {
    let backend = Arc::new(ScriptedBackend::new(plan(vec![])));
    let swarm = swarm(default_roster(), backend, Arc::new(FakeProvider::new()));

    assert!(matches!(
        swarm.inspect("Ghost Agent"),
        Err(BridgeError::AgentNotFound(_))
    ));

    {
        let data = swarm.agent("Data Agent").unwrap();
        let mut data = data.lock();
        data.set_instruction("analyze posts");
        data.push_message(Message::user("analyze posts"));
    }

    let snapshot = swarm.inspect("Data Agent").unwrap();
    assert_eq!(snapshot.agent_name, "Data Agent");
    assert_eq!(snapshot.current_prompt.as_deref(), Some("analyze posts"));
    assert_eq!(snapshot.messages.len(), 1);
    assert!(snapshot.steps.is_empty());
}

#[tokio::test]
async fn test_bridge_closed_after_shutdown() {
    let backend = Arc::new(ScriptedBackend::new(plan(vec![])));
    let swarm = swarm(default_roster(), backend, Arc::new(FakeProvider::new()));

    swarm.communicate("Data Agent", "first").await.unwrap();
    swarm.shutdown().await;

    let err = swarm.communicate("Data Agent", "second").await.unwrap_err();
    assert!(matches!(err, BridgeError::Closed));
}
