// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Swarm types and the interfaces of their external collaborators.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`agent`] | `Agent`, `AgentRole`, `SessionKey`, `StepObserver` |
//! | [`llm`] | `AgentBackend`, `ActRequest`, `ActResponse`, `Message`, `Step` |
//! | [`session`] | `SessionProvider`, `Session`, sandbox command types |
//! | [`capability`] | `CapabilityKind`, `ToolExecutor`, `ToolDefinition` |
//! | [`plan`] | `OrchestratorPlan`, `TaskAssignment` |
//! | [`events`] | `SwarmEvent`, `AgentRunEvent`, `SessionEvent` |
//! | [`swarm_config`] | `SwarmManifest` and its sections |

pub mod agent;
pub mod capability;
pub mod events;
pub mod llm;
pub mod plan;
pub mod session;
pub mod swarm_config;
