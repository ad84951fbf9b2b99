// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Anthropic Agent Backend Adapter
//
// Anti-Corruption Layer for the Anthropic Messages API. Runs the tool-use
// loop for one invocation: every model turn becomes a Step, tool calls are
// dispatched to the capability set and their results are fed back until the
// model answers without tools or the step budget is spent.
//
// Structured output is requested by exposing a `structured_output` tool whose
// input schema is the requested schema; its first call ends the loop.

use crate::domain::llm::{
    ActRequest, ActResponse, AgentBackend, ContentPart, LLMError, Message, Role, Step,
    ToolCallRecord, ToolResultRecord,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

pub const STRUCTURED_OUTPUT_TOOL: &str = "structured_output";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_tokens: u32,
    max_steps: usize,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicBlock>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
    /// Block types we do not act on (thinking, redacted_thinking, ...)
    #[serde(other)]
    Unsupported,
}

#[derive(Serialize, Clone)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

impl AnthropicBackend {
    pub fn new(endpoint: String, api_key: String, max_tokens: u32, max_steps: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            max_tokens,
            max_steps: max_steps.max(1),
        }
    }

    async fn send(
        &self,
        request: &AnthropicRequest<'_>,
    ) -> Result<AnthropicResponse, LLMError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.endpoint))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(if status == 401 || status == 403 {
                LLMError::Authentication(error_text)
            } else if status == 429 {
                LLMError::RateLimit
            } else if status == 404 {
                LLMError::ModelNotFound(request.model.to_string())
            } else {
                LLMError::Provider(format!("HTTP {}: {}", status, error_text))
            });
        }

        response
            .json()
            .await
            .map_err(|e| LLMError::Provider(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl AgentBackend for AnthropicBackend {
    async fn act(&self, request: ActRequest<'_>) -> Result<ActResponse, LLMError> {
        let mut tools: Vec<AnthropicTool> = request
            .tools
            .definitions()
            .into_iter()
            .map(|def| AnthropicTool {
                name: def.name,
                description: def.description,
                input_schema: def.input_schema,
            })
            .collect();
        if let Some(schema) = request.schema {
            tools.push(AnthropicTool {
                name: STRUCTURED_OUTPUT_TOOL.to_string(),
                description: "Submit your final answer. The input must follow the required schema."
                    .to_string(),
                input_schema: schema.clone(),
            });
        }

        let mut delta: Vec<Message> = Vec::new();
        if let Some(instruction) = request.instruction {
            delta.push(Message::user(instruction));
        }

        let mut steps = Vec::new();
        let mut output = None;
        let mut final_text = String::new();

        for turn in 0..self.max_steps {
            let body = AnthropicRequest {
                model: request.model,
                max_tokens: self.max_tokens,
                system: request.system,
                messages: to_wire_messages(request.history.iter().chain(delta.iter())),
                tools: tools.clone(),
            };
            let response = self.send(&body).await?;
            debug!(
                turn,
                stop_reason = ?response.stop_reason,
                blocks = response.content.len(),
                "Anthropic turn completed"
            );

            let assistant = from_wire_blocks(response.content);
            let text = assistant.text();
            let calls: Vec<ToolCallRecord> = assistant
                .content
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ToolCall { id, name, args } => Some(ToolCallRecord {
                        id: id.clone(),
                        name: name.clone(),
                        args: args.clone(),
                    }),
                    _ => None,
                })
                .collect();
            delta.push(assistant);
            final_text = text.clone();

            let mut step = Step {
                text: (!text.is_empty()).then_some(text),
                tool_calls: calls.clone(),
                tool_results: Vec::new(),
            };

            if calls.is_empty() {
                (request.on_step)(&step);
                steps.push(step);
                break;
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                let (result, is_error) = if call.name == STRUCTURED_OUTPUT_TOOL {
                    output = Some(call.args.clone());
                    (json!("Structured output recorded."), false)
                } else {
                    match request.tools.invoke(&call.name, call.args).await {
                        Ok(value) => (value, false),
                        Err(e) => (json!(e.to_string()), true),
                    }
                };
                results.push(ToolResultRecord {
                    id: call.id,
                    name: call.name,
                    result,
                    is_error,
                });
            }

            delta.push(Message {
                role: Role::Tool,
                content: results
                    .iter()
                    .map(|r| ContentPart::ToolResult {
                        id: r.id.clone(),
                        name: r.name.clone(),
                        result: r.result.clone(),
                        is_error: r.is_error,
                    })
                    .collect(),
            });
            step.tool_results = results;
            (request.on_step)(&step);
            steps.push(step);

            if output.is_some() {
                break;
            }
        }

        Ok(ActResponse {
            messages: delta,
            steps,
            text: final_text,
            output,
        })
    }
}

/// Maps domain messages to the wire format. Tool results travel as user
/// turns; consecutive turns of the same wire role are merged.
fn to_wire_messages<'m>(messages: impl Iterator<Item = &'m Message>) -> Vec<AnthropicMessage> {
    let mut wire: Vec<AnthropicMessage> = Vec::new();
    for message in messages {
        let role = match message.role {
            Role::Assistant => "assistant",
            Role::User | Role::Tool => "user",
        };
        let blocks = message.content.iter().map(to_wire_block);
        match wire.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => wire.push(AnthropicMessage {
                role,
                content: blocks.collect(),
            }),
        }
    }
    wire
}

fn to_wire_block(part: &ContentPart) -> AnthropicBlock {
    match part {
        ContentPart::Text { text } => AnthropicBlock::Text { text: text.clone() },
        ContentPart::ToolCall { id, name, args } => AnthropicBlock::ToolUse {
            id: id.clone(),
            name: name.clone(),
            input: args.clone(),
        },
        ContentPart::ToolResult {
            id,
            result,
            is_error,
            ..
        } => AnthropicBlock::ToolResult {
            tool_use_id: id.clone(),
            content: match result {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            is_error: *is_error,
        },
    }
}

fn from_wire_blocks(blocks: Vec<AnthropicBlock>) -> Message {
    let content = blocks
        .into_iter()
        .filter_map(|block| match block {
            AnthropicBlock::Text { text } => Some(ContentPart::Text { text }),
            AnthropicBlock::ToolUse { id, name, input } => Some(ContentPart::ToolCall {
                id,
                name,
                args: input,
            }),
            AnthropicBlock::ToolResult { .. } | AnthropicBlock::Unsupported => None,
        })
        .collect();
    Message {
        role: Role::Assistant,
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::capability::{CapabilityError, ToolDefinition, ToolExecutor};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTools {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl ToolExecutor for RecordingTools {
        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition {
                name: "bash".into(),
                description: "Run a shell command".into(),
                input_schema: json!({"type": "object"}),
            }]
        }

        async fn invoke(&self, name: &str, args: Value) -> Result<Value, CapabilityError> {
            self.calls.lock().push((name.to_string(), args));
            Ok(json!({"output": "file.txt"}))
        }
    }

    fn noop(_: &Step) {}

    fn request<'a>(
        tools: &'a RecordingTools,
        schema: Option<&'a Value>,
        on_step: &'a (dyn Fn(&Step) + Send + Sync),
    ) -> ActRequest<'a> {
        ActRequest {
            model: "claude-test",
            tools,
            system: "You are a test agent",
            instruction: Some("list files"),
            history: &[],
            schema,
            on_step,
        }
    }

    #[test]
    fn test_wire_messages_merge_tool_results_into_user_turn() {
        let history = vec![
            Message::user("first"),
            Message {
                role: Role::Assistant,
                content: vec![ContentPart::ToolCall {
                    id: "t1".into(),
                    name: "bash".into(),
                    args: json!({"command": "ls"}),
                }],
            },
            Message {
                role: Role::Tool,
                content: vec![ContentPart::ToolResult {
                    id: "t1".into(),
                    name: "bash".into(),
                    result: json!("ok"),
                    is_error: false,
                }],
            },
            Message::user("[Data Agent] hello"),
        ];

        let wire = to_wire_messages(history.iter());
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[2].role, "user");
        assert_eq!(wire[2].content.len(), 2);
        assert_eq!(
            wire[2].content[0],
            AnthropicBlock::ToolResult {
                tool_use_id: "t1".into(),
                content: "ok".into(),
                is_error: false,
            }
        );
    }

    #[test]
    fn test_unknown_blocks_are_ignored() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "text", "text": "done"}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        let message = from_wire_blocks(response.content);
        assert_eq!(message.content.len(), 1);
        assert_eq!(message.text(), "done");
    }

    #[tokio::test]
    async fn test_text_only_turn() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_body(
                json!({
                    "content": [{"type": "text", "text": "Nothing to do."}],
                    "stop_reason": "end_turn"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let backend = AnthropicBackend::new(server.url(), "test-key".into(), 1024, 5);
        let tools = RecordingTools::default();
        let seen = Mutex::new(0usize);
        let on_step = |_: &Step| *seen.lock() += 1;
        let response = backend.act(request(&tools, None, &on_step)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.text, "Nothing to do.");
        assert_eq!(response.steps.len(), 1);
        assert_eq!(*seen.lock(), 1);
        // instruction turn + assistant turn
        assert_eq!(response.messages.len(), 2);
        assert_eq!(response.messages[0].text(), "list files");
        assert!(response.output.is_none());
    }

    #[tokio::test]
    async fn test_tool_call_is_dispatched() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(
                json!({
                    "content": [
                        {"type": "text", "text": "Listing"},
                        {"type": "tool_use", "id": "tu_1", "name": "bash", "input": {"command": "ls"}}
                    ],
                    "stop_reason": "tool_use"
                })
                .to_string(),
            )
            .create_async()
            .await;

        // A single step keeps the exchange to one request
        let backend = AnthropicBackend::new(server.url(), "k".into(), 1024, 1);
        let tools = RecordingTools::default();
        let response = backend.act(request(&tools, None, &noop)).await.unwrap();

        assert_eq!(
            tools.calls.lock().clone(),
            vec![("bash".to_string(), json!({"command": "ls"}))]
        );
        assert_eq!(response.steps.len(), 1);
        assert_eq!(response.steps[0].tool_results.len(), 1);
        assert!(!response.steps[0].tool_results[0].is_error);
        // instruction, assistant, tool results
        assert_eq!(response.messages.len(), 3);
        assert_eq!(response.messages[2].role, Role::Tool);
    }

    #[tokio::test]
    async fn test_structured_output_ends_loop() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_body(mockito::Matcher::Regex(STRUCTURED_OUTPUT_TOOL.to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "content": [{
                        "type": "tool_use",
                        "id": "tu_9",
                        "name": STRUCTURED_OUTPUT_TOOL,
                        "input": {"overall_task": "x", "task_assignments": [], "execution_notes": ""}
                    }],
                    "stop_reason": "tool_use"
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let backend = AnthropicBackend::new(server.url(), "k".into(), 1024, 10);
        let tools = RecordingTools::default();
        let schema = json!({"type": "object"});
        let response = backend
            .act(request(&tools, Some(&schema), &noop))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.output.unwrap()["overall_task"], "x");
        assert!(tools.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body("invalid x-api-key")
            .create_async()
            .await;

        let backend = AnthropicBackend::new(server.url(), "bad".into(), 1024, 5);
        let tools = RecordingTools::default();
        let err = backend.act(request(&tools, None, &noop)).await.unwrap_err();
        assert!(matches!(err, LLMError::Authentication(body) if body.contains("invalid")));
    }

    #[tokio::test]
    async fn test_rate_limit_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .create_async()
            .await;

        let backend = AnthropicBackend::new(server.url(), "k".into(), 1024, 5);
        let tools = RecordingTools::default();
        let err = backend.act(request(&tools, None, &noop)).await.unwrap_err();
        assert!(matches!(err, LLMError::RateLimit));
    }
}
