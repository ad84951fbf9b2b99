// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Agent Backend Infrastructure - Anti-Corruption Layer Implementations
//
// Each adapter translates between the AgentBackend domain interface and an
// external model API.

pub mod anthropic;

pub use anthropic::AnthropicBackend;

use crate::domain::llm::AgentBackend;
use crate::domain::swarm_config::{resolve_api_key, LlmConfig};
use std::sync::Arc;

/// Builds the backend named by `config.provider`.
pub fn backend_from_config(config: &LlmConfig) -> anyhow::Result<Arc<dyn AgentBackend>> {
    let backend: Arc<dyn AgentBackend> = match config.provider.as_str() {
        "anthropic" => {
            let api_key = resolve_api_key(&config.api_key)?;
            Arc::new(AnthropicBackend::new(
                config.endpoint.clone(),
                api_key,
                config.max_tokens,
                config.max_steps,
            ))
        }
        other => anyhow::bail!("Unsupported LLM provider: {}", other),
    };
    tracing::info!(provider = %config.provider, endpoint = %config.endpoint, "Agent backend configured");
    Ok(backend)
}
