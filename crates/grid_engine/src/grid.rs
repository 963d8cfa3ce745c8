use std::collections::BTreeMap;

use shared::{
    domain::{CellState, GridPosition, ProgramId, SpanGroup},
    error::GridError,
    protocol::CellSnapshot,
};

/// Authoritative occupancy of the eight grid cells.
///
/// A cell absent from the map is empty; cell state is always derived from the
/// occupant and never stored on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridState {
    cells: BTreeMap<GridPosition, ProgramId>,
}

impl GridState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, position: GridPosition, program: ProgramId) -> Result<(), GridError> {
        if self.cells.contains_key(&position) {
            return Err(GridError::CellsUnavailable(vec![position]));
        }
        self.cells.insert(position, program);
        Ok(())
    }

    /// Empties the cell and returns what was there. Clearing twice is harmless.
    pub fn clear(&mut self, position: GridPosition) -> Option<ProgramId> {
        self.cells.remove(&position)
    }

    pub fn clear_all(&mut self) {
        self.cells.clear();
    }

    pub fn occupant_of(&self, position: GridPosition) -> Option<&ProgramId> {
        self.cells.get(&position)
    }

    pub fn is_empty(&self, position: GridPosition) -> bool {
        !self.cells.contains_key(&position)
    }

    pub fn state_of(&self, position: GridPosition) -> CellState {
        CellState::of(self.occupant_of(position))
    }

    pub fn neighbors(&self, position: GridPosition) -> Vec<GridPosition> {
        position.neighbors()
    }

    pub fn positions_of(&self, program: &ProgramId) -> Vec<GridPosition> {
        self.cells
            .iter()
            .filter(|(_, occupant)| *occupant == program)
            .map(|(position, _)| *position)
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.len()
    }

    /// Span groups ordered by their anchor position.
    pub fn groups(&self) -> Vec<SpanGroup> {
        let mut by_program: BTreeMap<&ProgramId, Vec<GridPosition>> = BTreeMap::new();
        for (position, program) in &self.cells {
            by_program.entry(program).or_default().push(*position);
        }
        let mut groups: Vec<SpanGroup> = by_program
            .into_iter()
            .map(|(program, positions)| SpanGroup::new(program.clone(), positions))
            .collect();
        groups.sort_by_key(|group| group.anchor());
        groups
    }

    pub fn group_at(&self, position: GridPosition) -> Option<SpanGroup> {
        let program = self.occupant_of(position)?;
        Some(SpanGroup::new(program.clone(), self.positions_of(program)))
    }

    pub fn snapshot(&self) -> BTreeMap<GridPosition, CellSnapshot> {
        GridPosition::ALL
            .iter()
            .map(|position| {
                let content = self.occupant_of(*position).cloned();
                let state = self.state_of(*position);
                (*position, CellSnapshot { content, state })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/grid_tests.rs"]
mod tests;
