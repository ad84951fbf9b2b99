// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `capyswarm-core`: Domain Types and Provider Adapters
//!
//! Everything the swarm scheduler needs to talk about agents without knowing
//! which language model or sandbox vendor sits behind them.
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Agent`, `Message`, `Step`, `AgentBackend`, `SessionProvider`, `OrchestratorPlan`, `SwarmManifest` |
//! | [`infrastructure`] | Infrastructure | Anthropic backend, Scrapybara sessions, console renderer, event bus, role prompts |

pub mod domain;
pub mod infrastructure;

pub use domain::*;
