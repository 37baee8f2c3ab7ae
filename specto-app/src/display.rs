//! Terminal display surface.
//!
//! The single designated writer for overlay text: every refresh goes
//! through `ConsoleSurface::render` and nothing else prints to the
//! overlay area. Refreshes arrive already throttled, so each one is
//! simply written out — no diffing here either.

use std::io::{self, Write};

/// Shown when the current overlay text is empty.
const EMPTY_PLACEHOLDER: &str = "(no labels above threshold)";

/// What one overlay refresh looks like on the terminal.
pub fn display_block(text: &str, tick: u64) -> String {
    let body = if text.is_empty() {
        EMPTY_PLACEHOLDER
    } else {
        text
    };
    format!("── overlay · tick {tick} ──\n{body}\n")
}

pub struct ConsoleSurface {
    out: io::Stdout,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }

    /// Write one refresh. Terminal write failures are swallowed — losing a
    /// redraw must not take the pipeline down.
    pub fn render(&mut self, text: &str, tick: u64) {
        let block = display_block(text, tick);
        let mut handle = self.out.lock();
        let _ = handle.write_all(block.as_bytes());
        let _ = handle.flush();
    }
}

impl Default for ConsoleSurface {
    fn default() -> Self {
        Self::new()
    }
}
