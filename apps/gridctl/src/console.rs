//! Terminal rendering of the grid and of feedback events.

use std::{
    collections::BTreeMap,
    io::{self, Write},
    sync::Arc,
};

use grid_engine::{GridEngine, LayoutAction, LayoutNamePrompt};
use shared::{
    domain::{Column, GridPosition, Row},
    protocol::{CellSnapshot, FeedbackEvent, HighlightTone},
};
use tokio::task::JoinHandle;
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream, StreamExt};
use tracing::warn;

const CELL_WIDTH: usize = 20;

pub fn render_grid(cells: &BTreeMap<GridPosition, CellSnapshot>) -> String {
    let mut lines = Vec::with_capacity(Row::ALL.len() + 1);
    let mut header = format!("{:<8}", "");
    for column in Column::ALL {
        header.push_str(&format!("{:<CELL_WIDTH$}", column.letter()));
    }
    lines.push(header.trim_end().to_string());

    for row in Row::ALL {
        let mut line = format!("{:<8}", format!("{row:?}"));
        for column in Column::ALL {
            let label = cells
                .get(&GridPosition::new(column, row))
                .and_then(|cell| cell.content.as_ref())
                .map(|program| program.to_string())
                .unwrap_or_else(|| "-".to_string());
            line.push_str(&format!("{label:<CELL_WIDTH$}"));
        }
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n") + "\n"
}

/// One line per event worth showing; expiry events are silent.
pub fn describe_event(event: &FeedbackEvent) -> Option<String> {
    match event {
        FeedbackEvent::Notice { level, message, .. } => Some(format!("[{level}] {message}")),
        FeedbackEvent::Highlight {
            positions, tone, ..
        } => {
            let cells: Vec<String> = positions.iter().map(ToString::to_string).collect();
            let marker = match tone {
                HighlightTone::Pending => "~",
                HighlightTone::Success => "+",
                HighlightTone::Error => "!",
            };
            Some(format!("  {marker} {}", cells.join(", ")))
        }
        FeedbackEvent::HighlightCleared { .. } | FeedbackEvent::NoticeExpired { .. } => None,
    }
}

pub fn spawn_feedback_printer(engine: &GridEngine) -> JoinHandle<()> {
    let mut events = BroadcastStream::new(engine.subscribe());
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    if let Some(line) = describe_event(&event) {
                        eprintln!("{line}");
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "feedback printer fell behind");
                }
            }
        }
    })
}

/// Reads one trimmed line from stdin; `None` at end of input.
pub fn read_line(prompt: &str) -> io::Result<Option<String>> {
    tokio::task::block_in_place(|| {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    })
}

/// Asks on the terminal for layout names the command left out.
pub struct StdinPrompt;

impl StdinPrompt {
    pub fn shared() -> Arc<dyn LayoutNamePrompt> {
        Arc::new(Self)
    }
}

impl LayoutNamePrompt for StdinPrompt {
    fn prompt(&self, action: LayoutAction) -> Option<String> {
        match read_line(&format!("layout name to {action}: ")) {
            Ok(Some(name)) if !name.is_empty() => Some(name),
            Ok(_) => None,
            Err(error) => {
                warn!(%error, "could not read layout name");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
