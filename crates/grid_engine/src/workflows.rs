//! Selection-then-confirm sessions driven by explicit cell picks instead of
//! text. Sessions only collect a selection; confirming yields a
//! [`Mutation`] for the engine to apply.

use std::collections::BTreeSet;

use shared::{
    domain::{GridPosition, ProgramId},
    error::GridError,
};

use crate::{grid::GridState, span::Mutation, span::SpanManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderSession {
    source: GridPosition,
    program: ProgramId,
    source_group: Vec<GridPosition>,
    targets: BTreeSet<GridPosition>,
}

impl ReorderSession {
    pub fn begin(source: GridPosition, grid: &GridState) -> Result<Self, GridError> {
        let group = grid
            .group_at(source)
            .ok_or_else(|| GridError::SourceNotFound(source.to_string()))?;
        Ok(Self {
            source,
            program: group.program,
            source_group: group.positions,
            targets: BTreeSet::new(),
        })
    }

    pub fn source(&self) -> GridPosition {
        self.source
    }

    pub fn program(&self) -> &ProgramId {
        &self.program
    }

    pub fn targets(&self) -> Vec<GridPosition> {
        self.targets.iter().copied().collect()
    }

    /// Selects or deselects `target`; returns whether it is now selected.
    ///
    /// Cells held by another program cannot be selected. Cells of the group
    /// being moved can.
    pub fn toggle_target(&mut self, target: GridPosition, grid: &GridState) -> Result<bool, GridError> {
        if self.targets.remove(&target) {
            return Ok(false);
        }
        let own = self.source_group.contains(&target);
        if !own && !grid.is_empty(target) {
            return Err(GridError::TargetUnavailable(target));
        }
        self.targets.insert(target);
        Ok(true)
    }

    pub fn can_confirm(&self) -> bool {
        !self.targets.is_empty()
    }

    pub fn confirm(&self) -> Result<Mutation, GridError> {
        if !self.can_confirm() {
            return Err(GridError::SelectionIncomplete);
        }
        Ok(Mutation::Move {
            sources: self.source_group.clone(),
            targets: self.targets(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReopenSession {
    selected: Option<ProgramId>,
    targets: BTreeSet<GridPosition>,
}

impl ReopenSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_program(&self) -> Option<&ProgramId> {
        self.selected.as_ref()
    }

    pub fn targets(&self) -> Vec<GridPosition> {
        self.targets.iter().copied().collect()
    }

    /// Picks a program from the closed-program records.
    pub fn select_program(&mut self, program: &ProgramId, spans: &SpanManager) -> Result<(), GridError> {
        if spans.closed_record(program).is_none() {
            return Err(GridError::NotClosed(program.clone()));
        }
        self.selected = Some(program.clone());
        Ok(())
    }

    /// Selects or deselects `target`; returns whether it is now selected.
    pub fn toggle_target(&mut self, target: GridPosition, grid: &GridState) -> Result<bool, GridError> {
        if self.selected.is_none() {
            return Err(GridError::NoProgramSelected);
        }
        if self.targets.remove(&target) {
            return Ok(false);
        }
        if !grid.is_empty(target) {
            return Err(GridError::TargetUnavailable(target));
        }
        self.targets.insert(target);
        Ok(true)
    }

    pub fn can_confirm(&self) -> bool {
        self.selected.is_some() && !self.targets.is_empty()
    }

    pub fn confirm(&self) -> Result<Mutation, GridError> {
        let program = self.selected.clone().ok_or(GridError::NoProgramSelected)?;
        if self.targets.is_empty() {
            return Err(GridError::SelectionIncomplete);
        }
        Ok(Mutation::Reopen {
            program,
            positions: self.targets(),
        })
    }
}

#[cfg(test)]
#[path = "tests/workflows_tests.rs"]
mod tests;
