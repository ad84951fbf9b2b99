// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Swarm Configuration Types
//
// Defines the manifest a swarm is built from:
// - Kubernetes-style format (apiVersion/kind/metadata/spec)
// - Language-model backend settings
// - Remote session provider settings
// - Agent roster (exactly one orchestrator)

use crate::domain::agent::{Agent, AgentColor, SessionKey, DEFAULT_MODEL};
use crate::domain::capability::CapabilityKind;
use crate::domain::session::SessionKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "capyswarm/v1";
pub const KIND: &str = "Swarm";
pub const CONFIG_PATH_ENV: &str = "CAPYSWARM_CONFIG_PATH";

/// Top-level Kubernetes-style swarm manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmManifest {
    /// API version (must be "capyswarm/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "Swarm")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: SwarmSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmSpec {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub sessions: SessionConfig,

    #[serde(default)]
    pub agents: Vec<AgentSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend type (currently "anthropic")
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key (supports "env:VAR_NAME" for environment variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used by agents that do not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on model turns per agent invocation
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Provider type (currently "scrapybara")
    #[serde(default = "default_session_provider")]
    pub provider: String,

    #[serde(default = "default_session_endpoint")]
    pub endpoint: String,

    /// API key (supports "env:VAR_NAME" for environment variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub kind: SessionKind,

    #[serde(default = "default_timeout_hours")]
    pub timeout_hours: f64,

    /// Pause after opening the live view in interactive mode
    #[serde(default = "default_viewer_delay")]
    pub viewer_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,

    /// Specialty description shown to the other agents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub orchestrator: bool,

    /// "shared" (default) or the id of an already running session
    #[serde(default)]
    pub session: SessionKey,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sandbox capability override; omitted means the default set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<CapabilityKind>>,

    /// RGB color for console rendering; random when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
}

impl AgentSpec {
    /// Builds the agent record, falling back to `default_model`.
    pub fn to_agent(&self, default_model: &str) -> Agent {
        let mut agent = if self.orchestrator {
            Agent::orchestrator(&self.name)
        } else {
            Agent::worker(&self.name)
        };
        agent = agent
            .with_session(self.session.clone())
            .with_model(self.model.as_deref().unwrap_or(default_model));
        if let Some(description) = &self.description {
            agent = agent.with_description(description);
        }
        if let Some(capabilities) = &self.capabilities {
            agent = agent.with_capabilities(capabilities.clone());
        }
        if let Some(color) = self.color {
            agent = agent.with_color(AgentColor::from(color));
        }
        agent
    }
}

fn default_llm_provider() -> String {
    "anthropic".to_string()
}

fn default_llm_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_steps() -> usize {
    50
}

fn default_session_provider() -> String {
    "scrapybara".to_string()
}

fn default_session_endpoint() -> String {
    "https://api.scrapybara.com".to_string()
}

fn default_timeout_hours() -> f64 {
    1.0
}

fn default_viewer_delay() -> u64 {
    7
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            endpoint: default_llm_endpoint(),
            api_key: Some("env:ANTHROPIC_API_KEY".to_string()),
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            max_steps: default_max_steps(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            provider: default_session_provider(),
            endpoint: default_session_endpoint(),
            api_key: Some("env:SCRAPYBARA_API_KEY".to_string()),
            kind: SessionKind::default(),
            timeout_hours: default_timeout_hours(),
            viewer_delay_secs: default_viewer_delay(),
        }
    }
}

impl Default for SwarmManifest {
    fn default() -> Self {
        let worker = |name: &str, description: &str| AgentSpec {
            name: name.to_string(),
            description: Some(description.to_string()),
            orchestrator: false,
            session: SessionKey::Shared,
            model: None,
            capabilities: None,
            color: None,
        };

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "default-swarm".to_string(),
                labels: None,
            },
            spec: SwarmSpec {
                llm: LlmConfig::default(),
                sessions: SessionConfig::default(),
                agents: vec![
                    worker(
                        "Browser Agent",
                        "You are specialized in web browsing and data extraction.",
                    ),
                    worker(
                        "Data Agent",
                        "You are specialized in processing and analyzing data.",
                    ),
                    AgentSpec {
                        orchestrator: true,
                        description: None,
                        ..worker("Orchestrator", "")
                    },
                ],
            },
        }
    }
}

impl SwarmManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CAPYSWARM_CONFIG_PATH environment variable
    /// 2. ./capyswarm.yaml (working directory)
    /// 3. ~/.capyswarm/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./capyswarm.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".capyswarm").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("CAPYSWARM_MODEL") {
            tracing::info!("Environment override: CAPYSWARM_MODEL={}", model);
            self.spec.llm.default_model = model;
        }

        if let Ok(val) = std::env::var("CAPYSWARM_MAX_STEPS") {
            match val.parse::<usize>() {
                Ok(steps) if steps > 0 => {
                    tracing::info!("Environment override: CAPYSWARM_MAX_STEPS={}", steps);
                    self.spec.llm.max_steps = steps;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for CAPYSWARM_MAX_STEPS: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.llm.max_steps == 0 {
            anyhow::bail!("spec.llm.max_steps must be greater than zero");
        }

        if self.spec.sessions.timeout_hours <= 0.0 {
            anyhow::bail!("spec.sessions.timeout_hours must be positive");
        }

        let mut seen = HashSet::new();
        for agent in &self.spec.agents {
            if agent.name.trim().is_empty() {
                anyhow::bail!("Agent name cannot be empty");
            }
            if !seen.insert(agent.name.as_str()) {
                anyhow::bail!("Duplicate agent name: {}", agent.name);
            }
        }

        let orchestrators = self.spec.agents.iter().filter(|a| a.orchestrator).count();
        if orchestrators != 1 {
            anyhow::bail!(
                "Exactly one orchestrator agent is required, found {}",
                orchestrators
            );
        }

        Ok(())
    }

    /// Builds the roster described by the manifest.
    pub fn build_agents(&self) -> Vec<Agent> {
        self.spec
            .agents
            .iter()
            .map(|spec| spec.to_agent(&self.spec.llm.default_model))
            .collect()
    }
}

/// Resolve API key from config (supports "env:VAR_NAME" syntax)
pub fn resolve_api_key(key: &Option<String>) -> anyhow::Result<String> {
    match key {
        Some(k) => match k.strip_prefix("env:") {
            Some(var_name) => std::env::var(var_name)
                .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
            None => Ok(k.clone()),
        },
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentRole;

    const MANIFEST: &str = r#"
apiVersion: capyswarm/v1
kind: Swarm
metadata:
  name: hn-analysis
spec:
  llm:
    api_key: sk-test
    max_steps: 20
  sessions:
    kind: browser
  agents:
    - name: Browser Agent
      description: You are specialized in web browsing and data extraction.
      capabilities: [pointer_keyboard_control]
      color: [200, 120, 255]
    - name: Data Agent
      session: s-1234
      model: claude-3-5-haiku-latest
    - name: Orchestrator
      orchestrator: true
"#;

    #[test]
    fn test_default_manifest() {
        let manifest = SwarmManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.agents.len(), 3);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = SwarmManifest::from_yaml_str(MANIFEST).unwrap();
        manifest.validate().unwrap();

        assert_eq!(manifest.spec.llm.max_steps, 20);
        assert_eq!(manifest.spec.llm.provider, "anthropic");
        assert_eq!(manifest.spec.sessions.kind, SessionKind::Browser);
        assert_eq!(manifest.spec.sessions.viewer_delay_secs, 7);

        let agents = manifest.build_agents();
        assert_eq!(agents[0].capabilities(), Some(&[CapabilityKind::PointerKeyboardControl][..]));
        assert_eq!(agents[0].color, AgentColor::new(200, 120, 255));
        assert_eq!(agents[1].session_key, SessionKey::Instance("s-1234".into()));
        assert_eq!(agents[1].model, "claude-3-5-haiku-latest");
        assert_eq!(agents[2].role(), AgentRole::Orchestrator);
        assert_eq!(agents[2].model, DEFAULT_MODEL);
        assert!(agents[2].session_key.is_shared());
    }

    #[test]
    fn test_validation() {
        let mut manifest = SwarmManifest::default();
        manifest.spec.agents.retain(|a| !a.orchestrator);
        assert!(manifest.validate().is_err());

        let mut manifest = SwarmManifest::default();
        manifest.spec.agents[1].orchestrator = true;
        let err = manifest.validate().unwrap_err().to_string();
        assert!(err.contains("found 2"));

        let mut manifest = SwarmManifest::default();
        manifest.spec.agents[1].name = "Browser Agent".into();
        assert!(manifest.validate().is_err());

        let mut manifest = SwarmManifest::default();
        manifest.kind = "NodeConfig".into();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_resolve_api_key() {
        assert_eq!(resolve_api_key(&Some("literal".into())).unwrap(), "literal");
        assert_eq!(resolve_api_key(&None).unwrap(), "");
        assert!(resolve_api_key(&Some("env:CAPYSWARM_TEST_UNSET_VAR_41".into())).is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swarm.yaml");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = SwarmManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(manifest.metadata.name, "hn-analysis");

        let missing = dir.path().join("missing.yaml");
        assert!(SwarmManifest::load_or_default(Some(missing)).is_err());
    }
}
