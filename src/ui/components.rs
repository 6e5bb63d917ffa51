//! Panels of the dashboard

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Row, Table};
use ratatui::Frame;
use std::collections::VecDeque;

use super::{Phase, Progress, ResultTable};

/// Current phase and what it is working on
pub struct StatusPanel {
    phase: Phase,
    info: String,
}

impl StatusPanel {
    pub fn new() -> Self {
        Self {
            phase: Phase::Cleaning,
            info: String::new(),
        }
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let phase_style = match self.phase {
            Phase::Complete => Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            _ => Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        };

        let phase_indicator = match self.phase {
            Phase::Cleaning => "1/5",
            Phase::Importing => "2/5",
            Phase::Transforming => "3/5",
            Phase::Querying => "4/5",
            Phase::Rendering => "5/5",
            Phase::Complete => "done",
        };

        let lines = vec![
            Line::from(vec![
                Span::styled(format!(" {} ", phase_indicator), phase_style),
                Span::styled(self.phase.to_string(), phase_style),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::raw("   "),
                Span::styled(&self.info, Style::default().fg(Color::Gray)),
            ]),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Sales Report ")
            .border_style(Style::default().fg(Color::Blue));

        let paragraph = Paragraph::new(lines).block(block);
        frame.render_widget(paragraph, area);
    }
}

/// Row progress of the import
pub struct ProgressPanel {
    progress: Option<Progress>,
}

impl ProgressPanel {
    pub fn new() -> Self {
        Self { progress: None }
    }

    pub fn set_progress(&mut self, progress: Progress) {
        self.progress = Some(progress);
    }

    pub fn clear(&mut self) {
        self.progress = None;
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::LEFT | Borders::RIGHT)
            .border_style(Style::default().fg(Color::Blue));

        match &self.progress {
            Some(progress) => {
                let label = match progress.total {
                    0 => progress.label.clone(),
                    total => format!("{}: {} of {} rows", progress.label, progress.current, total),
                };

                let gauge = Gauge::default()
                    .block(block)
                    .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
                    .ratio(progress.ratio().clamp(0.0, 1.0))
                    .label(label);

                frame.render_widget(gauge, area);
            }
            None => {
                let paragraph = Paragraph::new("").block(block);
                frame.render_widget(paragraph, area);
            }
        }
    }
}

/// Most recent activity, newest at the bottom
pub struct LogPanel {
    entries: VecDeque<String>,
}

impl LogPanel {
    const CAPACITY: usize = 200;

    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(Self::CAPACITY),
        }
    }

    pub fn add(&mut self, message: impl Into<String>) {
        if self.entries.len() == Self::CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(message.into());
    }

    fn entry_style(entry: &str, newest: bool) -> Style {
        if entry.starts_with("Wrote") {
            Style::default().fg(Color::Green)
        } else if newest {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Activity ")
            .border_style(Style::default().fg(Color::Blue));

        let visible = area.height.saturating_sub(2) as usize;
        let skip = self.entries.len().saturating_sub(visible);
        let last = self.entries.len().saturating_sub(1);

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, entry)| {
                ListItem::new(Span::styled(
                    format!(" {}", entry),
                    Self::entry_style(entry, i == last),
                ))
            })
            .collect();

        frame.render_widget(List::new(items).block(block), area);
    }
}

/// Latest result table
pub struct ResultsPanel {
    table: Option<ResultTable>,
}

impl ResultsPanel {
    pub fn new() -> Self {
        Self { table: None }
    }

    pub fn set_table(&mut self, table: ResultTable) {
        self.table = Some(table);
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let title = self
            .table
            .as_ref()
            .map(|t| format!(" {} ", t.title))
            .unwrap_or_else(|| " Results ".to_string());
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Blue));

        let Some(table) = &self.table else {
            frame.render_widget(Paragraph::new("").block(block), area);
            return;
        };

        let widths: Vec<Constraint> = table
            .header
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let widest = table
                    .rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.len())
                    .max()
                    .unwrap_or(0)
                    .max(h.len());
                Constraint::Length(widest as u16 + 2)
            })
            .collect();

        let header = Row::new(table.header.clone()).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        let visible = area.height.saturating_sub(3) as usize;
        let rows = table.rows.iter().take(visible).map(|r| Row::new(r.clone()));

        let widget = Table::new(rows, widths).header(header).block(block);
        frame.render_widget(widget, area);
    }
}
