// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Application Layer
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`scheduler`] | `Swarm`, `SwarmOptions`, `RunOptions` |
//! | [`runner`] | `AgentRunner` |
//! | [`registry`] | `SessionRegistry`, `SessionOptions` |
//! | [`bridge`] | `BridgeHandle`, `BridgeWorker`, `OrchestratorTurn` |
//! | [`capabilities`] | `CapabilitySet`, `assemble` |

pub mod bridge;
pub mod capabilities;
pub mod registry;
pub mod runner;
pub mod scheduler;

pub use bridge::{BridgeError, BridgeHandle, OrchestratorTurn};
pub use capabilities::{assemble, CapabilitySet};
pub use registry::{SessionOptions, SessionRegistry};
pub use runner::{AgentRunner, RunnerError};
pub use scheduler::{
    RunOptions, Swarm, SwarmOptions, TierOutcome, AGGREGATION_FAILED, AGGREGATION_PROMPT,
    PLANNING_FAILED,
};
