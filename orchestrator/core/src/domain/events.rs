// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::session::SessionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scheduler-level events for one swarm run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwarmEvent {
    PlanningStarted {
        orchestrator: String,
        started_at: DateTime<Utc>,
    },
    PlanCreated {
        assignment_count: usize,
        tier_count: usize,
        created_at: DateTime<Utc>,
    },
    PlanningFailed {
        reason: String,
        failed_at: DateTime<Utc>,
    },
    TierStarted {
        priority: i64,
        assignment_count: usize,
        started_at: DateTime<Utc>,
    },
    TierCompleted {
        priority: i64,
        succeeded: usize,
        failed: usize,
        completed_at: DateTime<Utc>,
    },
    AssignmentDropped {
        agent_name: String,
        priority: i64,
        dropped_at: DateTime<Utc>,
    },
    AggregationCompleted {
        report_len: usize,
        completed_at: DateTime<Utc>,
    },
    AggregationFailed {
        failed_at: DateTime<Utc>,
    },
}

/// Events emitted around single agent invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentRunEvent {
    RunStarted {
        agent_name: String,
        started_at: DateTime<Utc>,
    },
    RunCompleted {
        agent_name: String,
        steps: usize,
        completed_at: DateTime<Utc>,
    },
    RunFailed {
        agent_name: String,
        error: String,
        failed_at: DateTime<Utc>,
    },
    /// A worker reached the orchestrator through the bridge
    OrchestratorMessaged {
        from_agent: String,
        answered: bool,
        messaged_at: DateTime<Utc>,
    },
}

impl AgentRunEvent {
    pub fn agent_name(&self) -> &str {
        match self {
            AgentRunEvent::RunStarted { agent_name, .. }
            | AgentRunEvent::RunCompleted { agent_name, .. }
            | AgentRunEvent::RunFailed { agent_name, .. } => agent_name,
            AgentRunEvent::OrchestratorMessaged { from_agent, .. } => from_agent,
        }
    }
}

/// Remote session lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    SessionCreated {
        session_id: String,
        kind: SessionKind,
        created_at: DateTime<Utc>,
    },
    /// Requested instance id was not live; the agent was moved to the shared session
    SessionFallback {
        agent_name: String,
        requested_id: String,
        fallback_at: DateTime<Utc>,
    },
    SessionStopped {
        session_id: String,
        stopped_at: DateTime<Utc>,
    },
    SessionStopFailed {
        session_id: String,
        error: String,
        failed_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_name_of_bridge_event_is_sender() {
        let event = AgentRunEvent::OrchestratorMessaged {
            from_agent: "Browser Agent".into(),
            answered: true,
            messaged_at: Utc::now(),
        };
        assert_eq!(event.agent_name(), "Browser Agent");
    }
}
