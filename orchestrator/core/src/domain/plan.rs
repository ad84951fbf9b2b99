// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Orchestrator Plan
//!
//! Structured output of the orchestrator's planning pass. Assignments are
//! grouped into priority tiers; higher priority runs first.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const DEFAULT_PRIORITY: i64 = 1;

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub agent_name: String,
    pub prompt: String,
    /// Higher number = executed earlier
    #[serde(default = "default_priority")]
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorPlan {
    /// The original task being broken down
    #[serde(default)]
    pub overall_task: String,
    pub task_assignments: Vec<TaskAssignment>,
    /// Additional notes about execution or coordination
    #[serde(default)]
    pub execution_notes: String,
}

impl OrchestratorPlan {
    /// JSON schema the planning pass is constrained to.
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "description": "The orchestrator's structured plan for task distribution",
            "properties": {
                "overall_task": {
                    "type": "string",
                    "description": "The original task being broken down"
                },
                "task_assignments": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "agent_name": { "type": "string" },
                            "prompt": { "type": "string" },
                            "priority": {
                                "type": "integer",
                                "description": "Higher number = higher priority",
                                "default": DEFAULT_PRIORITY
                            }
                        },
                        "required": ["agent_name", "prompt"]
                    }
                },
                "execution_notes": {
                    "type": "string",
                    "description": "Any additional notes about task execution or coordination"
                }
            },
            "required": ["overall_task", "task_assignments", "execution_notes"]
        })
    }

    pub fn from_output(output: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(output)
    }

    /// Assignments grouped by priority, highest tier first. Order within a
    /// tier follows the plan.
    pub fn into_tiers(self) -> Vec<(i64, Vec<TaskAssignment>)> {
        let mut tiers: BTreeMap<i64, Vec<TaskAssignment>> = BTreeMap::new();
        for assignment in self.task_assignments {
            tiers.entry(assignment.priority).or_default().push(assignment);
        }
        tiers.into_iter().rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(agent: &str, priority: i64) -> TaskAssignment {
        TaskAssignment {
            agent_name: agent.to_string(),
            prompt: format!("task for {agent}"),
            priority,
        }
    }

    #[test]
    fn test_tiers_descending() {
        let plan = OrchestratorPlan {
            overall_task: "demo".into(),
            task_assignments: vec![
                assignment("c", 1),
                assignment("a", 10),
                assignment("d", 5),
                assignment("b", 10),
            ],
            execution_notes: String::new(),
        };

        let tiers = plan.into_tiers();
        let priorities: Vec<i64> = tiers.iter().map(|(p, _)| *p).collect();
        assert_eq!(priorities, vec![10, 5, 1]);

        let top: Vec<&str> = tiers[0].1.iter().map(|a| a.agent_name.as_str()).collect();
        assert_eq!(top, vec!["a", "b"]);
    }

    #[test]
    fn test_priority_defaults_to_one() {
        let plan = OrchestratorPlan::from_output(&json!({
            "overall_task": "x",
            "task_assignments": [{"agent_name": "Data Agent", "prompt": "analyze"}],
            "execution_notes": ""
        }))
        .unwrap();
        assert_eq!(plan.task_assignments[0].priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn test_missing_assignments_is_rejected() {
        assert!(OrchestratorPlan::from_output(&json!({"overall_task": "x"})).is_err());
    }
}
