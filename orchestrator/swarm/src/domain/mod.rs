// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Roster of shared agent records and the read-only views taken of them.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`swarm`] | `Roster`, `SharedAgent`, `AgentSnapshot`, `SwarmError` |

pub mod swarm;

pub use swarm::*;
