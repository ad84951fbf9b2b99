// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod console;
pub mod event_bus;
pub mod llm;
pub mod prompt_template_engine;
pub mod session;
pub mod viewer;

pub use console::ConsoleStepObserver;
pub use event_bus::{DomainEvent, EventBus, EventBusError, EventReceiver};
pub use prompt_template_engine::{RolePromptEngine, RosterEntry};
pub use viewer::BrowserViewer;
