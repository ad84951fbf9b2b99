// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Live-view presentation: opens a session's stream URL in the system browser.

use crate::domain::session::LiveViewer;

#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserViewer;

impl LiveViewer for BrowserViewer {
    fn open(&self, url: &str) -> std::io::Result<()> {
        tracing::info!(url = %url, "Opening live view");
        open::that(url)
    }
}
