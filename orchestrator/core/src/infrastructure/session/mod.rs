// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Remote Session Infrastructure - provider adapters

pub mod scrapybara;

pub use scrapybara::ScrapybaraProvider;

use crate::domain::session::SessionProvider;
use crate::domain::swarm_config::{resolve_api_key, SessionConfig};
use std::sync::Arc;

/// Builds the session provider named by `config.provider`.
pub fn provider_from_config(config: &SessionConfig) -> anyhow::Result<Arc<dyn SessionProvider>> {
    let provider: Arc<dyn SessionProvider> = match config.provider.as_str() {
        "scrapybara" => {
            let api_key = resolve_api_key(&config.api_key)?;
            if api_key.is_empty() {
                anyhow::bail!("Session provider 'scrapybara' requires an api_key");
            }
            Arc::new(ScrapybaraProvider::new(config.endpoint.clone(), api_key))
        }
        other => anyhow::bail!("Unsupported session provider: {}", other),
    };
    tracing::info!(provider = %config.provider, endpoint = %config.endpoint, "Session provider configured");
    Ok(provider)
}
