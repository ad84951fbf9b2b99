// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Console step rendering
//!
//! Default [`StepObserver`]: prints each step in the agent's 24-bit color.
//! Text turns render as `Agent Name: text`, tool calls as `name(args)`.

use crate::domain::agent::{AgentColor, StepObserver};
use crate::domain::llm::Step;
use colored::Colorize;
use serde_json::Value;

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleStepObserver;

impl StepObserver for ConsoleStepObserver {
    fn on_step(&self, agent_name: &str, color: AgentColor, step: &Step) {
        for line in render_step(agent_name, color, step) {
            println!("{line}");
        }
    }
}

/// Renders one step as printable lines.
pub fn render_step(agent_name: &str, color: AgentColor, step: &Step) -> Vec<String> {
    let AgentColor { r, g, b } = color;
    let mut lines = Vec::new();

    if let Some(text) = step.text.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("{}: {}", agent_name.truecolor(r, g, b), text));
    }

    if step.tool_calls.len() > 1 {
        lines.push(String::new());
    }
    for call in &step.tool_calls {
        lines.push(format!(
            "{}({})",
            call.name.truecolor(r, g, b),
            render_args(&call.args)
        ));
    }

    for result in step.tool_results.iter().filter(|r| r.is_error) {
        let message = match &result.result {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        lines.push(format!("{} {}", format!("{} failed:", result.name).red(), message));
    }

    lines
}

/// Compact JSON of the arguments without the enclosing braces.
fn render_args(args: &Value) -> String {
    let rendered = args.to_string();
    match args {
        Value::Object(_) => rendered[1..rendered.len() - 1].to_string(),
        _ => rendered,
    }
}
