// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Session Registry
//!
//! Sole owner of remote session handles. Agents hold only a [`SessionKey`];
//! the registry maps keys to live handles, creates sessions on demand and
//! tears all of them down at shutdown.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Session acquisition (idempotent per key), fallback from
//!   unknown instance ids to the shared session, teardown

use crate::domain::SharedAgent;
use capyswarm_core::domain::agent::SessionKey;
use capyswarm_core::domain::events::SessionEvent;
use capyswarm_core::domain::session::{
    LiveViewer, SessionError, SessionHandle, SessionKind, SessionProvider,
};
use capyswarm_core::infrastructure::event_bus::EventBus;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub kind: SessionKind,
    /// Lifetime requested from the provider at creation.
    pub timeout_hours: f64,
    /// Pause after opening the live view in interactive mode.
    pub viewer_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            kind: SessionKind::Ubuntu,
            timeout_hours: 1.0,
            viewer_delay: Duration::from_secs(7),
        }
    }
}

/// One key's handle. Locked for the whole acquisition of that key only.
type Slot = Arc<Mutex<Option<SessionHandle>>>;

pub struct SessionRegistry {
    provider: Arc<dyn SessionProvider>,
    viewer: Arc<dyn LiveViewer>,
    options: SessionOptions,
    slots: parking_lot::Mutex<HashMap<SessionKey, Slot>>,
    event_bus: EventBus,
}

impl SessionRegistry {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        viewer: Arc<dyn LiveViewer>,
        options: SessionOptions,
        event_bus: EventBus,
    ) -> Self {
        Self {
            provider,
            viewer,
            options,
            slots: parking_lot::Mutex::new(HashMap::new()),
            event_bus,
        }
    }

    fn slot(&self, key: &SessionKey) -> Slot {
        self.slots.lock().entry(key.clone()).or_default().clone()
    }

    /// Resolves the agent's session, creating it on first use.
    ///
    /// Concurrent acquisitions of one key resolve to a single remote session;
    /// other keys are not blocked meanwhile. An instance key that is not
    /// among the provider's live sessions is rewritten to the shared key on
    /// the agent record. Provider API errors are logged and returned.
    pub async fn acquire(
        &self,
        agent: &SharedAgent,
        interactive: bool,
    ) -> Result<SessionHandle, SessionError> {
        let (agent_name, key) = {
            let agent = agent.lock();
            (agent.name().to_string(), agent.session_key.clone())
        };

        let result = match &key {
            SessionKey::Shared => self.acquire_shared(interactive).await,
            SessionKey::Instance(id) => {
                let slot = self.slot(&key);
                let mut handle = slot.lock().await;
                if let Some(existing) = handle.as_ref() {
                    return Ok(existing.clone());
                }
                match self.find_live(id).await {
                    Ok(Some(live)) => {
                        info!(agent = %agent_name, session_id = %id, "Attached to existing session");
                        self.present(&live, interactive).await;
                        *handle = Some(live.clone());
                        Ok(live)
                    }
                    Ok(None) => {
                        warn!(
                            agent = %agent_name,
                            session_id = %id,
                            "Instance {} not found, falling back to shared instance",
                            id
                        );
                        agent.lock().session_key = SessionKey::Shared;
                        self.event_bus
                            .publish_session_event(SessionEvent::SessionFallback {
                                agent_name: agent_name.clone(),
                                requested_id: id.clone(),
                                fallback_at: Utc::now(),
                            });
                        // Instance slot before shared slot, never the reverse
                        self.acquire_shared(interactive).await
                    }
                    Err(e) => Err(e),
                }
            }
        };

        if let Err(SessionError::Api { status, body }) = &result {
            error!(agent = %agent_name, status, body = %body, "Error {}: {}", status, body);
        } else if let Err(e) = &result {
            error!(agent = %agent_name, error = %e, "Session acquisition failed");
        }
        result
    }

    async fn acquire_shared(&self, interactive: bool) -> Result<SessionHandle, SessionError> {
        let slot = self.slot(&SessionKey::Shared);
        let mut handle = slot.lock().await;
        if let Some(existing) = handle.as_ref() {
            return Ok(existing.clone());
        }
        let created = self.create(interactive).await?;
        *handle = Some(created.clone());
        Ok(created)
    }

    async fn create(&self, interactive: bool) -> Result<SessionHandle, SessionError> {
        let handle = self
            .provider
            .create_session(self.options.kind, self.options.timeout_hours)
            .await?;
        metrics::counter!("capyswarm_sessions_created_total").increment(1);
        info!(session_id = %handle.id(), kind = self.options.kind.as_str(), "Session created");
        self.event_bus.publish_session_event(SessionEvent::SessionCreated {
            session_id: handle.id().to_string(),
            kind: self.options.kind,
            created_at: Utc::now(),
        });
        self.present(&handle, interactive).await;
        Ok(handle)
    }

    async fn find_live(&self, id: &str) -> Result<Option<SessionHandle>, SessionError> {
        let live = self.provider.list_sessions().await?;
        Ok(live.into_iter().find(|session| session.id() == id))
    }

    /// Opens the live view and waits for the viewer to attach. Best effort.
    async fn present(&self, handle: &SessionHandle, interactive: bool) {
        if !interactive {
            return;
        }
        match handle.live_view_url().await {
            Ok(url) => {
                if let Err(e) = self.viewer.open(&url) {
                    warn!(session_id = %handle.id(), error = %e, "Failed to open live view");
                }
                tokio::time::sleep(self.options.viewer_delay).await;
            }
            Err(e) => {
                warn!(session_id = %handle.id(), error = %e, "Failed to get live view URL");
            }
        }
    }

    /// Handle currently mapped to `key`, if any.
    pub async fn get(&self, key: &SessionKey) -> Option<SessionHandle> {
        let slot = self.slots.lock().get(key).cloned()?;
        let handle = slot.lock().await;
        handle.clone()
    }

    pub async fn session_count(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    /// Stops every owned session: browser first, then the session itself.
    /// Failures are logged and never stop the remaining teardown.
    pub async fn shutdown(&self) {
        let slots: Vec<Slot> = self.slots.lock().drain().map(|(_, slot)| slot).collect();
        let mut drained = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(handle) = slot.lock().await.take() {
                drained.push(handle);
            }
        }

        let mut stopped = HashSet::new();
        for session in drained {
            if !stopped.insert(session.id().to_string()) {
                continue;
            }
            if let Err(e) = session.stop_browser().await {
                warn!(session_id = %session.id(), error = %e, "Failed to stop session browser");
            }
            match session.stop().await {
                Ok(()) => {
                    info!(session_id = %session.id(), "Session stopped");
                    self.event_bus.publish_session_event(SessionEvent::SessionStopped {
                        session_id: session.id().to_string(),
                        stopped_at: Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(session_id = %session.id(), error = %e, "Failed to stop session");
                    self.event_bus
                        .publish_session_event(SessionEvent::SessionStopFailed {
                            session_id: session.id().to_string(),
                            error: e.to_string(),
                            failed_at: Utc::now(),
                        });
                }
            }
        }
    }
}
