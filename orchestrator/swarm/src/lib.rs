// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `capyswarm-swarm`: Multi-Agent Coordination Crate
//!
//! Runs a roster of agents (one orchestrator, any number of workers) against
//! shared or dedicated remote sessions.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Roster`, `SharedAgent`, `AgentSnapshot` |
//! | [`application`] | Application | `Swarm`, `AgentRunner`, `SessionRegistry`, orchestrator bridge |
//!
//! ## Key Concepts
//!
//! - **Planning pass**: the orchestrator turns the user goal into a structured
//!   plan of prioritized task assignments.
//! - **Tiers**: assignments sharing a priority run concurrently; the next tier
//!   starts only after every agent of the current one has finished.
//! - **Bridge**: workers reach the orchestrator through a single serialized
//!   channel (`communicate`); the orchestrator reads workers directly
//!   (`inspect_agent`).
//! - **Aggregation pass**: the orchestrator writes the final report from its
//!   accumulated history.

pub mod application;
pub mod domain;

pub use application::*;
pub use domain::*;
