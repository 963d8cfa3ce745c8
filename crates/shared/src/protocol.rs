use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::{CellState, GridPosition, ProgramId},
    error::{ErrorCode, GridError},
};

/// Result of handing one utterance to the command interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub matched: bool,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

impl CommandOutcome {
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            success: false,
            message: String::new(),
            error: None,
            command_id: None,
        }
    }

    pub fn accepted(command_id: CommandId, message: impl Into<String>) -> Self {
        Self {
            matched: true,
            success: true,
            message: message.into(),
            error: None,
            command_id: Some(command_id),
        }
    }

    pub fn rejected(command_id: CommandId, error: &GridError) -> Self {
        Self {
            matched: true,
            success: false,
            message: error.to_string(),
            error: Some(error.code()),
            command_id: Some(command_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for FeedbackLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FeedbackLevel::Success => "success",
            FeedbackLevel::Info => "info",
            FeedbackLevel::Warning => "warning",
            FeedbackLevel::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightTone {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum FeedbackEvent {
    Highlight {
        command_id: CommandId,
        positions: Vec<GridPosition>,
        tone: HighlightTone,
    },
    HighlightCleared {
        command_id: CommandId,
        positions: Vec<GridPosition>,
    },
    Notice {
        command_id: Option<CommandId>,
        level: FeedbackLevel,
        message: String,
    },
    NoticeExpired {
        command_id: Option<CommandId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedProgramRecord {
    pub program: ProgramId,
    pub display_name: String,
    pub previous_positions: Vec<GridPosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    #[serde(default)]
    pub content: Option<ProgramId>,
    pub state: CellState,
}

/// Named, persisted copy of the grid's occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub cells: BTreeMap<GridPosition, CellSnapshot>,
}

impl Layout {
    pub fn occupied_count(&self) -> usize {
        self.cells
            .values()
            .filter(|cell| cell.content.is_some())
            .count()
    }

    /// Occupied positions grouped by program, positions in canonical order.
    pub fn groups(&self) -> BTreeMap<ProgramId, Vec<GridPosition>> {
        let mut groups: BTreeMap<ProgramId, Vec<GridPosition>> = BTreeMap::new();
        for (position, cell) in &self.cells {
            if let Some(program) = &cell.content {
                groups.entry(program.clone()).or_default().push(*position);
            }
        }
        groups
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub occupied_cells: usize,
}
