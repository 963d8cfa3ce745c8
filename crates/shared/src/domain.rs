use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    A,
    B,
    C,
    D,
}

impl Column {
    pub const ALL: [Column; 4] = [Column::A, Column::B, Column::C, Column::D];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn letter(self) -> char {
        match self {
            Column::A => 'A',
            Column::B => 'B',
            Column::C => 'C',
            Column::D => 'D',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'a' => Some(Column::A),
            'b' => Some(Column::B),
            'c' => Some(Column::C),
            'd' => Some(Column::D),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Row {
    Top,
    Bottom,
}

impl Row {
    pub const ALL: [Row; 2] = [Row::Top, Row::Bottom];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Accepts `top`/`upper` and `bottom`/`lower`, any casing.
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "top" | "upper" => Some(Row::Top),
            "bottom" | "lower" => Some(Row::Bottom),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Row::Top => "Top",
            Row::Bottom => "Bottom",
        }
    }
}

/// One of the eight fixed cells of the 4 x 2 grid.
///
/// Field order gives the derived `Ord` its column-then-row ordering, which is
/// the canonical iteration order everywhere in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridPosition {
    pub column: Column,
    pub row: Row,
}

impl GridPosition {
    pub const COUNT: usize = 8;

    pub const ALL: [GridPosition; 8] = [
        GridPosition::new(Column::A, Row::Top),
        GridPosition::new(Column::A, Row::Bottom),
        GridPosition::new(Column::B, Row::Top),
        GridPosition::new(Column::B, Row::Bottom),
        GridPosition::new(Column::C, Row::Top),
        GridPosition::new(Column::C, Row::Bottom),
        GridPosition::new(Column::D, Row::Top),
        GridPosition::new(Column::D, Row::Bottom),
    ];

    pub const fn new(column: Column, row: Row) -> Self {
        Self { column, row }
    }

    /// Positions one step away horizontally or vertically. No wraparound.
    pub fn neighbors(self) -> Vec<GridPosition> {
        let col = self.column.index();
        let mut out = Vec::with_capacity(3);
        if let Some(left) = col.checked_sub(1).and_then(Column::from_index) {
            out.push(GridPosition::new(left, self.row));
        }
        if let Some(right) = Column::from_index(col + 1) {
            out.push(GridPosition::new(right, self.row));
        }
        let other_row = match self.row {
            Row::Top => Row::Bottom,
            Row::Bottom => Row::Top,
        };
        out.push(GridPosition::new(self.column, other_row));
        out.sort();
        out
    }

    pub fn is_adjacent_to(self, other: GridPosition) -> bool {
        let dc = self.column.index().abs_diff(other.column.index());
        let dr = self.row.index().abs_diff(other.row.index());
        dc + dr == 1
    }

    pub fn row_positions(row: Row) -> Vec<GridPosition> {
        Column::ALL
            .iter()
            .map(|column| GridPosition::new(*column, row))
            .collect()
    }

    pub fn column_positions(column: Column) -> Vec<GridPosition> {
        Row::ALL
            .iter()
            .map(|row| GridPosition::new(column, *row))
            .collect()
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.column.letter(), self.row.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePositionError(pub String);

impl fmt::Display for ParsePositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid grid position '{}'", self.0)
    }
}

impl std::error::Error for ParsePositionError {}

impl FromStr for GridPosition {
    type Err = ParsePositionError;

    /// Parses `A-Top`, `a top`, `a_bottom` or `atop`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect();
        let mut chars = compact.chars();
        let column = chars
            .next()
            .and_then(Column::from_letter)
            .ok_or_else(|| ParsePositionError(raw.to_string()))?;
        let row = Row::from_word(chars.as_str()).ok_or_else(|| ParsePositionError(raw.to_string()))?;
        Ok(GridPosition::new(column, row))
    }
}

impl Serialize for GridPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GridPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Inclusive column/row bounds of a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRect {
    pub min_column: Column,
    pub max_column: Column,
    pub min_row: Row,
    pub max_row: Row,
}

impl GridRect {
    pub fn bounding(positions: &[GridPosition]) -> Option<Self> {
        let first = positions.first()?;
        let mut rect = GridRect {
            min_column: first.column,
            max_column: first.column,
            min_row: first.row,
            max_row: first.row,
        };
        for position in &positions[1..] {
            rect.min_column = rect.min_column.min(position.column);
            rect.max_column = rect.max_column.max(position.column);
            rect.min_row = rect.min_row.min(position.row);
            rect.max_row = rect.max_row.max(position.row);
        }
        Some(rect)
    }

    pub fn contains(&self, position: GridPosition) -> bool {
        (self.min_column..=self.max_column).contains(&position.column)
            && (self.min_row..=self.max_row).contains(&position.row)
    }

    pub fn positions(&self) -> Vec<GridPosition> {
        GridPosition::ALL
            .iter()
            .copied()
            .filter(|position| self.contains(*position))
            .collect()
    }

    pub fn column_span(&self) -> usize {
        self.max_column.index() - self.min_column.index() + 1
    }

    pub fn row_span(&self) -> usize {
        self.max_row.index() - self.min_row.index() + 1
    }

    pub fn area(&self) -> usize {
        self.column_span() * self.row_span()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub String);

impl ProgramId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProgramId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    #[default]
    Empty,
    Occupied,
}

impl CellState {
    pub fn of(occupant: Option<&ProgramId>) -> Self {
        match occupant {
            Some(_) => CellState::Occupied,
            None => CellState::Empty,
        }
    }
}

/// All positions currently assigned to one program, in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanGroup {
    pub program: ProgramId,
    pub positions: Vec<GridPosition>,
}

impl SpanGroup {
    pub fn new(program: ProgramId, mut positions: Vec<GridPosition>) -> Self {
        positions.sort();
        positions.dedup();
        Self { program, positions }
    }

    /// Render anchor: first position in column-then-row order.
    pub fn anchor(&self) -> Option<GridPosition> {
        self.positions.first().copied()
    }

    pub fn bounds(&self) -> Option<GridRect> {
        GridRect::bounding(&self.positions)
    }

    pub fn is_multi_cell(&self) -> bool {
        self.positions.len() > 1
    }

    pub fn contains(&self, position: GridPosition) -> bool {
        self.positions.binary_search(&position).is_ok()
    }
}
