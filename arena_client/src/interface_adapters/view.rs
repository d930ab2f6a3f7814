// Console view controller: tracks the visible screen and prints match results.

use crate::domain::{ResultSummary, ViewEvents};
use std::io::{self, Write};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Waiting,
    CodeEntry,
    Arena,
    Results,
}

pub struct ConsoleView<W = io::Stdout> {
    out: W,
    screen: Screen,
    last_error: Option<String>,
    summary: Option<ResultSummary>,
}

impl ConsoleView {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            screen: Screen::Waiting,
            last_error: None,
            summary: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn summary(&self) -> Option<&ResultSummary> {
        self.summary.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn show(&mut self, screen: Screen) {
        if self.screen != screen {
            info!(from = ?self.screen, to = ?screen, "switching screen");
            self.screen = screen;
        }
    }

    fn print_summary(&mut self, summary: &ResultSummary) -> io::Result<()> {
        writeln!(self.out, "{}", summary.banner)?;
        if let Some(error_banner) = &summary.error_banner {
            writeln!(self.out, "{error_banner}")?;
        }
        for line in &summary.lines {
            writeln!(self.out, "  {line}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> ViewEvents for ConsoleView<W> {
    fn on_start_game(&mut self) {
        self.last_error = None;
        self.summary = None;
        self.show(Screen::CodeEntry);
    }

    fn on_start_simulation(&mut self) {
        self.show(Screen::Arena);
    }

    fn on_server_error(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        if let Err(e) = writeln!(self.out, "Error in player code:\n{message}") {
            warn!(error = %e, "failed to print server error");
        }
    }

    fn on_results(&mut self, summary: &ResultSummary) {
        if let Err(e) = self.print_summary(summary) {
            warn!(error = %e, "failed to print results");
        }
        self.summary = Some(summary.clone());
        self.show(Screen::Results);
    }

    fn on_closed(&mut self) {
        // Results stay visible after the server hangs up.
        if self.screen != Screen::Results {
            self.show(Screen::Waiting);
        }
    }
}
