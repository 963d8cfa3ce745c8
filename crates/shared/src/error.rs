use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{GridPosition, ProgramId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ProgramNotFound,
    LocationNotRecognized,
    CellsUnavailable,
    SourceNotFound,
    TargetUnavailable,
    NotAdjacent,
    InvalidSwapArity,
    LayoutNotFound,
    NonRectangularSpan,
    ProgramAlreadyOpen,
    NotClosed,
    SelectionIncomplete,
    NoProgramSelected,
    NoActiveSession,
    LayoutNameRequired,
    StoreUnavailable,
    CorruptLayout,
}

/// Every way a grid operation can be refused.
///
/// None of these are fatal: the `Display` text is the feedback message shown
/// to the operator and the grid is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("I couldn't find a program called \"{0}\"")]
    ProgramNotFound(String),
    #[error("I couldn't tell which grid position you meant in \"{0}\"")]
    LocationNotRecognized(String),
    #[error("{} {} already occupied", join_positions(.0), is_or_are(.0))]
    CellsUnavailable(Vec<GridPosition>),
    #[error("there is nothing to act on at {0}")]
    SourceNotFound(String),
    #[error("{0} is not available")]
    TargetUnavailable(GridPosition),
    #[error("{target} is not next to {from}")]
    NotAdjacent {
        from: GridPosition,
        target: GridPosition,
    },
    #[error("swap needs exactly two single cells; {0} is part of a larger placement")]
    InvalidSwapArity(String),
    #[error("no saved layout named \"{0}\"")]
    LayoutNotFound(String),
    #[error("{} do not form a rectangle", join_positions(.0))]
    NonRectangularSpan(Vec<GridPosition>),
    #[error("{program} is already open at {}", join_positions(.positions))]
    ProgramAlreadyOpen {
        program: ProgramId,
        positions: Vec<GridPosition>,
    },
    #[error("{0} has not been closed")]
    NotClosed(ProgramId),
    #[error("select at least one target cell first")]
    SelectionIncomplete,
    #[error("choose a program to reopen first")]
    NoProgramSelected,
    #[error("no selection is in progress")]
    NoActiveSession,
    #[error("a layout name is required")]
    LayoutNameRequired,
    #[error("layout storage is unavailable: {0}")]
    StoreUnavailable(String),
    #[error("saved layout is unreadable: {0}")]
    CorruptLayout(String),
}

impl GridError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GridError::ProgramNotFound(_) => ErrorCode::ProgramNotFound,
            GridError::LocationNotRecognized(_) => ErrorCode::LocationNotRecognized,
            GridError::CellsUnavailable(_) => ErrorCode::CellsUnavailable,
            GridError::SourceNotFound(_) => ErrorCode::SourceNotFound,
            GridError::TargetUnavailable(_) => ErrorCode::TargetUnavailable,
            GridError::NotAdjacent { .. } => ErrorCode::NotAdjacent,
            GridError::InvalidSwapArity(_) => ErrorCode::InvalidSwapArity,
            GridError::LayoutNotFound(_) => ErrorCode::LayoutNotFound,
            GridError::NonRectangularSpan(_) => ErrorCode::NonRectangularSpan,
            GridError::ProgramAlreadyOpen { .. } => ErrorCode::ProgramAlreadyOpen,
            GridError::NotClosed(_) => ErrorCode::NotClosed,
            GridError::SelectionIncomplete => ErrorCode::SelectionIncomplete,
            GridError::NoProgramSelected => ErrorCode::NoProgramSelected,
            GridError::NoActiveSession => ErrorCode::NoActiveSession,
            GridError::LayoutNameRequired => ErrorCode::LayoutNameRequired,
            GridError::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            GridError::CorruptLayout(_) => ErrorCode::CorruptLayout,
        }
    }
}

fn join_positions(positions: &[GridPosition]) -> String {
    if positions.is_empty() {
        return "no cells".to_string();
    }
    let names: Vec<String> = positions.iter().map(ToString::to_string).collect();
    names.join(", ")
}

fn is_or_are(positions: &[GridPosition]) -> &'static str {
    if positions.len() == 1 {
        "is"
    } else {
        "are"
    }
}
