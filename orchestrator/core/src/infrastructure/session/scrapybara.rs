// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Scrapybara Session Provider Adapter
//
// Anti-Corruption Layer for the Scrapybara instance API. Every non-2xx answer
// is surfaced as SessionError::Api carrying the status and raw body.

use crate::domain::session::{
    BashCommand, ComputerCommand, EditCommand, Session, SessionError, SessionHandle, SessionKind,
    SessionProvider,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Instance states that count as live.
const LIVE_STATUSES: [&str; 3] = ["deploying", "running", "paused"];

struct ApiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct StartRequest<'a> {
    instance_type: &'a str,
    timeout_hours: f64,
}

#[derive(Deserialize)]
struct InstanceRecord {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct StreamUrlResponse {
    stream_url: String,
}

impl ApiClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn get(&self, path: &str) -> Result<Value, SessionError> {
        let request = self.http.get(self.url(path));
        self.send(request).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, SessionError> {
        let request = self.http.post(self.url(path)).json(body);
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, SessionError> {
        let response = request
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(SessionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| SessionError::Decode(e.to_string()))
    }
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, SessionError> {
    serde_json::from_value(value).map_err(|e| SessionError::Decode(e.to_string()))
}

pub struct ScrapybaraProvider {
    client: Arc<ApiClient>,
}

impl ScrapybaraProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            client: Arc::new(ApiClient {
                http: reqwest::Client::new(),
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_key: api_key.into(),
            }),
        }
    }

    fn handle(&self, id: String) -> SessionHandle {
        Arc::new(ScrapybaraSession {
            id,
            client: self.client.clone(),
        })
    }
}

#[async_trait]
impl SessionProvider for ScrapybaraProvider {
    async fn create_session(
        &self,
        kind: SessionKind,
        timeout_hours: f64,
    ) -> Result<SessionHandle, SessionError> {
        let value = self
            .client
            .post(
                "/v1/start",
                &StartRequest {
                    instance_type: kind.as_str(),
                    timeout_hours,
                },
            )
            .await?;
        let record: InstanceRecord = decode(value)?;
        debug!(session_id = %record.id, kind = kind.as_str(), "Instance started");
        Ok(self.handle(record.id))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionHandle>, SessionError> {
        let records: Vec<InstanceRecord> = decode(self.client.get("/v1/instances").await?)?;
        Ok(records
            .into_iter()
            .filter(|r| {
                r.status
                    .as_deref()
                    .is_none_or(|status| LIVE_STATUSES.contains(&status))
            })
            .map(|r| self.handle(r.id))
            .collect())
    }
}

pub struct ScrapybaraSession {
    id: String,
    client: Arc<ApiClient>,
}

impl fmt::Debug for ScrapybaraSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapybaraSession")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl ScrapybaraSession {
    fn path(&self, action: &str) -> String {
        format!("/v1/instance/{}/{}", self.id, action)
    }
}

#[async_trait]
impl Session for ScrapybaraSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn live_view_url(&self) -> Result<String, SessionError> {
        let response: StreamUrlResponse = decode(self.client.get(&self.path("stream_url")).await?)?;
        Ok(response.stream_url)
    }

    async fn bash(&self, command: &BashCommand) -> Result<Value, SessionError> {
        self.client.post(&self.path("bash"), command).await
    }

    async fn computer(&self, command: &ComputerCommand) -> Result<Value, SessionError> {
        self.client.post(&self.path("computer"), command).await
    }

    async fn edit(&self, command: &EditCommand) -> Result<Value, SessionError> {
        self.client.post(&self.path("edit"), command).await
    }

    async fn stop_browser(&self) -> Result<(), SessionError> {
        self.client.post(&self.path("browser/stop"), &json!({})).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), SessionError> {
        self.client.post(&self.path("stop"), &json!({})).await?;
        Ok(())
    }
}
