//! Progress reporting for the pipeline
//!
//! Every stage reports through the [`Ui`] trait:
//! - Current phase (Cleaning, Importing, Transforming, Querying, Rendering)
//! - Progress (current/total with optional details)
//! - Activity log
//! - Result tables
//!
//! [`LogUi`] sends messages to the `log` facade and prints result tables,
//! [`UiApp`] draws a full-screen dashboard with ratatui, [`SilentUi`] is for
//! tests.

mod components;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use log::info;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Duration;

use components::{LogPanel, ProgressPanel, ResultsPanel, StatusPanel};

/// Pipeline phases shown in the status panel
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Cleaning,
    Importing,
    Transforming,
    Querying,
    Rendering,
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Cleaning => write!(f, "Cleaning spreadsheet"),
            Phase::Importing => write!(f, "Importing into SQLite"),
            Phase::Transforming => write!(f, "Transforming sales table"),
            Phase::Querying => write!(f, "Running analysis queries"),
            Phase::Rendering => write!(f, "Rendering charts"),
            Phase::Complete => write!(f, "Complete"),
        }
    }
}

/// Progress information for the current operation
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub label: String,
}

impl Progress {
    pub fn new(current: u64, total: u64, label: impl Into<String>) -> Self {
        Self {
            current,
            total,
            label: label.into(),
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// A query result ready for display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Render as aligned plain text, one line per row
    pub fn to_text(&self) -> String {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.len());
                }
            }
        }

        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = format!("{}\n{}\n", self.title, line(self.header.as_slice()));
        for row in &self.rows {
            out.push_str(&line(row.as_slice()));
            out.push('\n');
        }
        out
    }
}

/// Trait for UI implementations - allows log output, a full TUI and a silent test mode
pub trait Ui {
    fn set_phase(&mut self, phase: Phase);
    fn set_info(&mut self, info: impl Into<String>);
    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>);
    fn clear_progress(&mut self);
    fn log(&mut self, message: impl Into<String>);
    fn show_table(&mut self, table: ResultTable);
}

/// Full-screen dashboard
pub struct UiApp {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    status: StatusPanel,
    progress: ProgressPanel,
    results: ResultsPanel,
    log: LogPanel,
}

impl UiApp {
    /// Create a new UI application and enter the alternate screen
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            status: StatusPanel::new(),
            progress: ProgressPanel::new(),
            results: ResultsPanel::new(),
            log: LogPanel::new(),
        })
    }

    fn draw(&mut self) -> Result<()> {
        let status = &self.status;
        let progress = &self.progress;
        let results = &self.results;
        let log = &self.log;

        self.terminal.draw(|frame| {
            let area = frame.area();
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(5),  // Status panel
                    Constraint::Length(3),  // Progress bar
                    Constraint::Min(8),     // Latest result table
                    Constraint::Length(10), // Log panel
                ])
                .split(area);

            status.render(frame, chunks[0]);
            progress.render(frame, chunks[1]);
            results.render(frame, chunks[2]);
            log.render(frame, chunks[3]);
        })?;

        Ok(())
    }

    /// Finish the UI, wait for a key and restore the terminal
    pub fn finish(mut self, summary: &str) -> Result<()> {
        self.set_phase(Phase::Complete);
        self.clear_progress();
        self.log(summary);
        self.log("Press any key to exit...");
        self.draw()?;

        loop {
            if event::poll(Duration::from_millis(100))? {
                if let CrosstermEvent::Key(_) = event::read()? {
                    break;
                }
            }
        }

        self.restore()
    }

    /// Restore terminal without waiting
    pub fn restore(mut self) -> Result<()> {
        terminal::disable_raw_mode()?;
        self.terminal.backend_mut().execute(LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Ui for UiApp {
    fn set_phase(&mut self, phase: Phase) {
        self.status.set_phase(phase);
        self.draw().ok();
    }

    fn set_info(&mut self, info: impl Into<String>) {
        self.status.set_info(info);
        self.draw().ok();
    }

    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>) {
        self.progress
            .set_progress(Progress::new(current, total, label));
        self.draw().ok();
    }

    fn clear_progress(&mut self) {
        self.progress.clear();
        self.draw().ok();
    }

    fn log(&mut self, message: impl Into<String>) {
        self.log.add(message);
        self.draw().ok();
    }

    fn show_table(&mut self, table: ResultTable) {
        self.log.add(format!("{} ({} rows)", table.title, table.rows.len()));
        self.results.set_table(table);
        self.draw().ok();
    }
}

impl Drop for UiApp {
    fn drop(&mut self) {
        // Best effort cleanup
        terminal::disable_raw_mode().ok();
        self.terminal
            .backend_mut()
            .execute(LeaveAlternateScreen)
            .ok();
        self.terminal.show_cursor().ok();
    }
}

/// Reports through the `log` facade; result tables go to stdout
#[derive(Default)]
pub struct LogUi {
    last_percent: Option<u64>,
}

impl LogUi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ui for LogUi {
    fn set_phase(&mut self, phase: Phase) {
        info!("{}", phase);
    }

    fn set_info(&mut self, info: impl Into<String>) {
        info!("{}", info.into());
    }

    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>) {
        // One line per 25% step is plenty for a log
        let percent = (Progress::new(current, total, "").ratio() * 100.0) as u64;
        let step = percent / 25;
        if self.last_percent != Some(step) {
            self.last_percent = Some(step);
            info!("{}: {}/{}", label.into(), current, total);
        }
    }

    fn clear_progress(&mut self) {
        self.last_percent = None;
    }

    fn log(&mut self, message: impl Into<String>) {
        info!("{}", message.into());
    }

    fn show_table(&mut self, table: ResultTable) {
        println!("\n{}", table.to_text());
    }
}

/// Silent UI implementation for testing and non-interactive use
#[derive(Default)]
pub struct SilentUi;

impl SilentUi {
    pub fn new() -> Self {
        Self
    }
}

impl Ui for SilentUi {
    fn set_phase(&mut self, _phase: Phase) {}
    fn set_info(&mut self, _info: impl Into<String>) {}
    fn set_progress(&mut self, _current: u64, _total: u64, _label: impl Into<String>) {}
    fn clear_progress(&mut self) {}
    fn log(&mut self, _message: impl Into<String>) {}
    fn show_table(&mut self, _table: ResultTable) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratio() {
        assert_eq!(Progress::new(5, 10, "x").ratio(), 0.5);
        assert_eq!(Progress::new(5, 0, "x").ratio(), 0.0);
    }

    #[test]
    fn test_result_table_text() {
        let table = ResultTable {
            title: "Top Products by Region".to_string(),
            header: vec!["Region".to_string(), "Sub_Category".to_string()],
            rows: vec![vec!["East".to_string(), "Tables".to_string()]],
        };
        let text = table.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Top Products by Region");
        assert_eq!(lines[1], "Region  Sub_Category");
        assert_eq!(lines[2], "East    Tables");
    }
}
