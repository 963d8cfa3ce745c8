use std::{collections::BTreeSet, sync::Arc};

use shared::{
    domain::{GridPosition, GridRect, ProgramId, SpanGroup},
    error::GridError,
    protocol::ClosedProgramRecord,
};
use tracing::debug;

use crate::{grid::GridState, programs::ProgramCatalog};

/// A validated grid change, ready to be applied to a [`SpanManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Open {
        program: ProgramId,
        positions: Vec<GridPosition>,
    },
    Move {
        sources: Vec<GridPosition>,
        targets: Vec<GridPosition>,
    },
    Expand {
        source: GridPosition,
        targets: Vec<GridPosition>,
    },
    Swap {
        first: GridPosition,
        second: GridPosition,
    },
    /// Closes every span group touching any of the listed positions.
    Close { positions: Vec<GridPosition> },
    Reopen {
        program: ProgramId,
        positions: Vec<GridPosition>,
    },
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Open { .. } => "open",
            Mutation::Move { .. } => "move",
            Mutation::Expand { .. } => "expand",
            Mutation::Swap { .. } => "swap",
            Mutation::Close { .. } => "close",
            Mutation::Reopen { .. } => "reopen",
        }
    }

    /// Cells worth highlighting while the change is pending.
    pub fn highlight_positions(&self) -> Vec<GridPosition> {
        let mut positions: Vec<GridPosition> = match self {
            Mutation::Open { positions, .. } | Mutation::Reopen { positions, .. } => {
                positions.clone()
            }
            Mutation::Move { sources, targets } => {
                sources.iter().chain(targets.iter()).copied().collect()
            }
            Mutation::Expand { source, targets } => {
                std::iter::once(*source).chain(targets.iter().copied()).collect()
            }
            Mutation::Swap { first, second } => vec![*first, *second],
            Mutation::Close { positions } => positions.clone(),
        };
        positions.sort();
        positions.dedup();
        positions
    }
}

/// Owns the grid and keeps span groups and closed-program records consistent.
#[derive(Debug, Clone)]
pub struct SpanManager {
    grid: GridState,
    closed: Vec<ClosedProgramRecord>,
    catalog: Arc<ProgramCatalog>,
}

impl SpanManager {
    pub fn new(catalog: Arc<ProgramCatalog>) -> Self {
        Self {
            grid: GridState::new(),
            closed: Vec::new(),
            catalog,
        }
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn catalog(&self) -> &ProgramCatalog {
        &self.catalog
    }

    pub fn closed_programs(&self) -> &[ClosedProgramRecord] {
        &self.closed
    }

    pub fn closed_record(&self, program: &ProgramId) -> Option<&ClosedProgramRecord> {
        self.closed.iter().find(|record| record.program == *program)
    }

    pub fn groups(&self) -> Vec<SpanGroup> {
        self.grid.groups()
    }

    /// Places `program` on `positions`.
    ///
    /// A multi-cell placement must exactly fill its bounding rectangle; the
    /// anchor is the first position in column-then-row order.
    pub fn open(
        &mut self,
        program: &ProgramId,
        positions: &[GridPosition],
    ) -> Result<SpanGroup, GridError> {
        if !self.catalog.contains(program) {
            return Err(GridError::ProgramNotFound(program.to_string()));
        }
        let positions = canonical(positions);
        if positions.is_empty() {
            return Err(GridError::LocationNotRecognized(String::new()));
        }

        let current = self.grid.positions_of(program);
        if !current.is_empty() {
            return Err(GridError::ProgramAlreadyOpen {
                program: program.clone(),
                positions: current,
            });
        }

        let occupied: Vec<GridPosition> = positions
            .iter()
            .copied()
            .filter(|position| !self.grid.is_empty(*position))
            .collect();
        if !occupied.is_empty() {
            return Err(GridError::CellsUnavailable(occupied));
        }

        ensure_rectangular(&positions)?;

        for position in &positions {
            self.grid.assign(*position, program.clone())?;
        }
        self.closed.retain(|record| record.program != *program);

        debug!(program = %program, cells = positions.len(), "span opened");
        Ok(SpanGroup::new(program.clone(), positions))
    }

    /// Clears the whole span group containing `position` and remembers it.
    pub fn close(&mut self, position: GridPosition) -> Result<ClosedProgramRecord, GridError> {
        let group = self
            .grid
            .group_at(position)
            .ok_or_else(|| GridError::SourceNotFound(position.to_string()))?;

        for cell in &group.positions {
            self.grid.clear(*cell);
        }

        let record = ClosedProgramRecord {
            display_name: self.catalog.display_name(&group.program),
            program: group.program,
            previous_positions: group.positions,
        };
        self.closed.retain(|existing| existing.program != record.program);
        self.closed.push(record.clone());

        debug!(program = %record.program, "span closed");
        Ok(record)
    }

    /// Relocates the span group that owns `sources[0]` onto `targets`.
    ///
    /// Targets may overlap the group being moved. Nothing changes unless the
    /// whole relocation succeeds.
    pub fn move_span(
        &mut self,
        sources: &[GridPosition],
        targets: &[GridPosition],
    ) -> Result<SpanGroup, GridError> {
        let first = sources
            .first()
            .copied()
            .ok_or_else(|| GridError::SourceNotFound("no cells".to_string()))?;
        let group = self
            .grid
            .group_at(first)
            .ok_or_else(|| GridError::SourceNotFound(first.to_string()))?;

        let mut next = self.clone();
        for cell in group.positions.iter().chain(sources.iter()) {
            if next.grid.occupant_of(*cell) == Some(&group.program) {
                next.grid.clear(*cell);
            }
        }
        let placed = next
            .open(&group.program, targets)
            .map_err(|err| match err {
                GridError::CellsUnavailable(cells) => match cells.first() {
                    Some(cell) => GridError::TargetUnavailable(*cell),
                    None => GridError::CellsUnavailable(cells),
                },
                other => other,
            })?;

        *self = next;
        debug!(program = %placed.program, "span moved");
        Ok(placed)
    }

    /// Exchanges the occupants of two single cells.
    pub fn swap(&mut self, first: GridPosition, second: GridPosition) -> Result<(), GridError> {
        if first == second {
            return Err(GridError::InvalidSwapArity(format!("{first} with itself")));
        }
        for position in [first, second] {
            if let Some(group) = self.grid.group_at(position) {
                if group.is_multi_cell() {
                    return Err(GridError::InvalidSwapArity(position.to_string()));
                }
            }
        }

        let a = self.grid.clear(first);
        let b = self.grid.clear(second);
        if a.is_none() && b.is_none() {
            return Err(GridError::SourceNotFound(format!("{first} or {second}")));
        }
        if let Some(program) = b {
            self.grid.assign(first, program)?;
        }
        if let Some(program) = a {
            self.grid.assign(second, program)?;
        }

        debug!(%first, %second, "cells swapped");
        Ok(())
    }

    /// Grows the span group at `source` by one adjacent empty cell.
    pub fn expand(
        &mut self,
        source: GridPosition,
        target: GridPosition,
    ) -> Result<SpanGroup, GridError> {
        self.expand_to(source, &[target])
    }

    /// Grows the span group at `source` over every cell in `targets` at once.
    ///
    /// Each target must be empty and reachable from `source` through the
    /// other targets; the grown span must still fill a rectangle.
    pub fn expand_to(
        &mut self,
        source: GridPosition,
        targets: &[GridPosition],
    ) -> Result<SpanGroup, GridError> {
        let group = self
            .grid
            .group_at(source)
            .ok_or_else(|| GridError::SourceNotFound(source.to_string()))?;
        let targets = canonical(targets);
        if targets.is_empty() {
            return Err(GridError::LocationNotRecognized(String::new()));
        }
        if let Some(taken) = targets.iter().find(|target| !self.grid.is_empty(**target)) {
            return Err(GridError::TargetUnavailable(*taken));
        }

        let mut reached = vec![source];
        let mut remaining = targets.clone();
        while let Some(target) = remaining.first().copied() {
            let before = remaining.len();
            remaining.retain(|target| {
                if reached.iter().any(|cell| cell.is_adjacent_to(*target)) {
                    reached.push(*target);
                    false
                } else {
                    true
                }
            });
            if remaining.len() == before {
                return Err(GridError::NotAdjacent {
                    from: source,
                    target,
                });
            }
        }

        let mut next = self.clone();
        for cell in &group.positions {
            next.grid.clear(*cell);
        }
        let mut positions = group.positions.clone();
        positions.extend(targets.iter().copied());
        let placed = next.open(&group.program, &positions)?;

        *self = next;
        debug!(program = %placed.program, cells = targets.len(), "span expanded");
        Ok(placed)
    }

    /// Opens a previously closed program and consumes its record.
    pub fn reopen(
        &mut self,
        program: &ProgramId,
        positions: &[GridPosition],
    ) -> Result<SpanGroup, GridError> {
        if self.closed_record(program).is_none() {
            return Err(GridError::NotClosed(program.clone()));
        }
        self.open(program, positions)
    }

    /// Empties every cell. Closed-program records are kept.
    pub fn clear_cells(&mut self) {
        self.grid.clear_all();
    }

    /// Applies a mutation atomically and returns the cells it touched.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<Vec<GridPosition>, GridError> {
        match mutation {
            Mutation::Open { program, positions } => {
                self.open(program, positions).map(|group| group.positions)
            }
            Mutation::Move { sources, targets } => {
                self.move_span(sources, targets).map(|group| group.positions)
            }
            Mutation::Expand { source, targets } => {
                self.expand_to(*source, targets).map(|group| group.positions)
            }
            Mutation::Swap { first, second } => {
                self.swap(*first, *second).map(|()| vec![*first, *second])
            }
            Mutation::Close { positions } => self.close_many(positions),
            Mutation::Reopen { program, positions } => {
                self.reopen(program, positions).map(|group| group.positions)
            }
        }
    }

    fn close_many(&mut self, positions: &[GridPosition]) -> Result<Vec<GridPosition>, GridError> {
        let mut next = self.clone();
        let mut cleared = Vec::new();
        for position in canonical(positions) {
            if next.grid.is_empty(position) {
                continue;
            }
            let record = next.close(position)?;
            cleared.extend(record.previous_positions);
        }
        if cleared.is_empty() {
            let names: Vec<String> = positions.iter().map(ToString::to_string).collect();
            return Err(GridError::SourceNotFound(names.join(", ")));
        }
        *self = next;
        cleared.sort();
        Ok(cleared)
    }
}

fn canonical(positions: &[GridPosition]) -> Vec<GridPosition> {
    let set: BTreeSet<GridPosition> = positions.iter().copied().collect();
    set.into_iter().collect()
}

fn ensure_rectangular(positions: &[GridPosition]) -> Result<(), GridError> {
    if positions.len() <= 1 {
        return Ok(());
    }
    match GridRect::bounding(positions) {
        Some(rect) if rect.area() == positions.len() => Ok(()),
        _ => Err(GridError::NonRectangularSpan(positions.to_vec())),
    }
}

#[cfg(test)]
#[path = "tests/span_tests.rs"]
mod tests;
