//! Free-text command classification and argument extraction.
//!
//! Classification is a fixed, ordered rule table; the first rule whose
//! predicate holds decides the command kind. Handlers then resolve program
//! and location references into a [`Mutation`] or a layout request. Nothing
//! here touches the grid: preconditions that depend on live state are
//! checked by the engine against a probe copy.

mod locations;

use std::sync::Arc;

use shared::{
    domain::{GridPosition, ProgramId},
    error::GridError,
};

use crate::{
    programs::ProgramCatalog,
    span::{Mutation, SpanManager},
};

pub use locations::parse_locations;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Open,
    Move,
    Expand,
    Swap,
    Close,
    Save,
    Load,
    Delete,
    List,
    Reopen,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Open => "open",
            CommandKind::Move => "move",
            CommandKind::Expand => "expand",
            CommandKind::Swap => "swap",
            CommandKind::Close => "close",
            CommandKind::Save => "save",
            CommandKind::Load => "load",
            CommandKind::Delete => "delete",
            CommandKind::List => "list",
            CommandKind::Reopen => "reopen",
        }
    }
}

struct Rule {
    kind: CommandKind,
    matches: fn(&str) -> bool,
}

// Priority order is part of the command language: text containing both
// "move ... to" and "close" is a move.
const RULES: &[Rule] = &[
    Rule {
        kind: CommandKind::Open,
        matches: is_open,
    },
    Rule {
        kind: CommandKind::Move,
        matches: is_move,
    },
    Rule {
        kind: CommandKind::Expand,
        matches: is_expand,
    },
    Rule {
        kind: CommandKind::Swap,
        matches: is_swap,
    },
    Rule {
        kind: CommandKind::Close,
        matches: is_close,
    },
    Rule {
        kind: CommandKind::Save,
        matches: is_save,
    },
    Rule {
        kind: CommandKind::Load,
        matches: is_load,
    },
    Rule {
        kind: CommandKind::Delete,
        matches: is_delete,
    },
    Rule {
        kind: CommandKind::List,
        matches: is_list,
    },
    Rule {
        kind: CommandKind::Reopen,
        matches: is_reopen,
    },
];

fn is_open(t: &str) -> bool {
    t.contains("open") && [" in ", " on ", " across "].iter().any(|p| t.contains(p))
}

fn is_move(t: &str) -> bool {
    t.contains("move") && t.contains(" to ")
}

fn is_expand(t: &str) -> bool {
    t.contains("expand") && t.contains(" to ")
}

fn is_swap(t: &str) -> bool {
    t.contains("swap") && t.contains(" with ")
}

fn is_close(t: &str) -> bool {
    t.contains("close") || t.contains("clear")
}

fn is_save(t: &str) -> bool {
    t.contains("save layout")
}

fn is_load(t: &str) -> bool {
    t.contains("load layout")
}

fn is_delete(t: &str) -> bool {
    t.contains("delete layout")
}

fn is_list(t: &str) -> bool {
    t.contains("list layouts") || t.contains("show layouts")
}

fn is_reopen(t: &str) -> bool {
    t.contains("reopen")
}

const CLOSE_ALL_PHRASES: &[&str] = &[
    "all",
    "everything",
    "all programs",
    "all panels",
    "the grid",
    "grid",
    "the screen",
    "screen",
];

/// Collapses runs of whitespace and trims.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn classify(text: &str) -> Option<CommandKind> {
    classify_lower(&normalize_whitespace(text).to_ascii_lowercase())
}

fn classify_lower(lower: &str) -> Option<CommandKind> {
    RULES
        .iter()
        .find(|rule| (rule.matches)(lower))
        .map(|rule| rule.kind)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutRequest {
    Save { name: Option<String> },
    Load { name: Option<String> },
    Delete { name: Option<String> },
    List,
}

/// A grid change the interpreter has resolved, with operator-facing text
/// for the pending and completed states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPlan {
    pub kind: CommandKind,
    pub mutation: Mutation,
    pub pending: String,
    pub done: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    Unmatched,
    Rejected { kind: CommandKind, error: GridError },
    Grid(GridPlan),
    Layout(LayoutRequest),
}

/// Something a phrase refers to: explicit cells, or a program on the grid.
enum Subject {
    Cells(Vec<GridPosition>),
    Program(ProgramId),
}

#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    catalog: Arc<ProgramCatalog>,
}

impl CommandInterpreter {
    pub fn new(catalog: Arc<ProgramCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ProgramCatalog {
        &self.catalog
    }

    pub fn interpret(&self, text: &str, spans: &SpanManager) -> Interpretation {
        let original = normalize_whitespace(text);
        let lower = original.to_ascii_lowercase();
        let Some(kind) = classify_lower(&lower) else {
            return Interpretation::Unmatched;
        };

        let planned = match kind {
            CommandKind::Open => self.plan_open(&lower),
            CommandKind::Move => self.plan_move(&lower, spans),
            CommandKind::Expand => self.plan_expand(&lower, spans),
            CommandKind::Swap => self.plan_swap(&lower, spans),
            CommandKind::Close => self.plan_close(&lower, spans),
            CommandKind::Reopen => self.plan_reopen(&lower, spans),
            CommandKind::Save => {
                return Interpretation::Layout(LayoutRequest::Save {
                    name: layout_name(&original, &lower, "save layout"),
                })
            }
            CommandKind::Load => {
                return Interpretation::Layout(LayoutRequest::Load {
                    name: layout_name(&original, &lower, "load layout"),
                })
            }
            CommandKind::Delete => {
                return Interpretation::Layout(LayoutRequest::Delete {
                    name: layout_name(&original, &lower, "delete layout"),
                })
            }
            CommandKind::List => return Interpretation::Layout(LayoutRequest::List),
        };

        match planned {
            Ok((mutation, pending, done)) => Interpretation::Grid(GridPlan {
                kind,
                mutation,
                pending,
                done,
            }),
            Err(error) => Interpretation::Rejected { kind, error },
        }
    }

    fn plan_open(&self, lower: &str) -> Result<(Mutation, String, String), GridError> {
        let rest = after_keyword(lower, "open");
        let split = [" in ", " on ", " across "]
            .iter()
            .filter_map(|prep| rest.find(prep))
            .min()
            .unwrap_or(rest.len());
        let (program_phrase, location_phrase) = rest.split_at(split);

        let program = self.resolve_program(program_phrase)?;
        let positions = parse_locations(location_phrase);
        if positions.is_empty() {
            return Err(GridError::LocationNotRecognized(
                location_phrase.trim().to_string(),
            ));
        }

        let name = self.catalog.display_name(&program);
        let cells = describe_cells(&positions);
        Ok((
            Mutation::Open { program, positions },
            format!("Opening {name} in {cells}"),
            format!("{name} opened in {cells}"),
        ))
    }

    fn plan_move(
        &self,
        lower: &str,
        spans: &SpanManager,
    ) -> Result<(Mutation, String, String), GridError> {
        let (source_phrase, target_phrase) = split_once(after_keyword(lower, "move"), " to ");
        let sources = self.resolve_occupied(source_phrase, spans)?;
        let targets = parse_locations(target_phrase);
        if targets.is_empty() {
            return Err(GridError::LocationNotRecognized(target_phrase.trim().to_string()));
        }

        let name = self.occupant_name(&sources, spans);
        let cells = describe_cells(&targets);
        Ok((
            Mutation::Move { sources, targets },
            format!("Moving {name} to {cells}"),
            format!("{name} moved to {cells}"),
        ))
    }

    fn plan_expand(
        &self,
        lower: &str,
        spans: &SpanManager,
    ) -> Result<(Mutation, String, String), GridError> {
        let (source_phrase, target_phrase) = split_once(after_keyword(lower, "expand"), " to ");
        let group = self.resolve_occupied(source_phrase, spans)?;
        let targets = parse_locations(target_phrase);
        let Some(first_target) = targets.first().copied() else {
            return Err(GridError::LocationNotRecognized(target_phrase.trim().to_string()));
        };

        // Any member of the group next to a target can be the source.
        let source = group
            .iter()
            .copied()
            .find(|cell| targets.iter().any(|target| cell.is_adjacent_to(*target)))
            .or_else(|| group.first().copied())
            .unwrap_or(first_target);

        let name = self.occupant_name(&group, spans);
        let cells = describe_cells(&targets);
        Ok((
            Mutation::Expand { source, targets },
            format!("Expanding {name} to {cells}"),
            format!("{name} expanded to {cells}"),
        ))
    }

    fn plan_swap(
        &self,
        lower: &str,
        spans: &SpanManager,
    ) -> Result<(Mutation, String, String), GridError> {
        let (first_phrase, second_phrase) = split_once(after_keyword(lower, "swap"), " with ");
        let first = self.resolve_single_cell(first_phrase, spans)?;
        let second = self.resolve_single_cell(second_phrase, spans)?;
        Ok((
            Mutation::Swap { first, second },
            format!("Swapping {first} with {second}"),
            format!("Swapped {first} with {second}"),
        ))
    }

    fn plan_close(
        &self,
        lower: &str,
        spans: &SpanManager,
    ) -> Result<(Mutation, String, String), GridError> {
        let keyword = match (lower.find("close"), lower.find("clear")) {
            (Some(close), Some(clear)) if clear < close => "clear",
            (Some(_), _) => "close",
            _ => "clear",
        };
        let phrase = after_keyword(lower, keyword).trim();
        let phrase = phrase.trim_end_matches(|c: char| c.is_ascii_punctuation());

        if CLOSE_ALL_PHRASES.contains(&phrase) {
            return Ok((
                Mutation::Close {
                    positions: GridPosition::ALL.to_vec(),
                },
                "Clearing the grid".to_string(),
                "Grid cleared".to_string(),
            ));
        }

        let positions = match self.resolve_subject(phrase)? {
            Subject::Cells(cells) => cells,
            Subject::Program(program) => {
                let cells = spans.grid().positions_of(&program);
                if cells.is_empty() {
                    return Err(GridError::SourceNotFound(
                        self.catalog.display_name(&program),
                    ));
                }
                cells
            }
        };

        let name = self.occupant_name(&positions, spans);
        Ok((
            Mutation::Close { positions },
            format!("Closing {name}"),
            format!("{name} closed"),
        ))
    }

    fn plan_reopen(
        &self,
        lower: &str,
        spans: &SpanManager,
    ) -> Result<(Mutation, String, String), GridError> {
        let program = self.resolve_program(after_keyword(lower, "reopen"))?;
        let record = spans
            .closed_record(&program)
            .ok_or_else(|| GridError::NotClosed(program.clone()))?;
        let positions = record.previous_positions.clone();
        let cells = describe_cells(&positions);
        let name = record.display_name.clone();
        Ok((
            Mutation::Reopen { program, positions },
            format!("Reopening {name} in {cells}"),
            format!("{name} reopened in {cells}"),
        ))
    }

    fn resolve_program(&self, phrase: &str) -> Result<ProgramId, GridError> {
        self.catalog
            .find_program(phrase)
            .ok_or_else(|| GridError::ProgramNotFound(phrase.trim().to_string()))
    }

    /// Locations win over program names: location phrases are strict,
    /// program matching is deliberately loose.
    fn resolve_subject(&self, phrase: &str) -> Result<Subject, GridError> {
        let cells = parse_locations(phrase);
        if !cells.is_empty() {
            return Ok(Subject::Cells(cells));
        }
        if let Some(program) = self.catalog.find_program(phrase) {
            return Ok(Subject::Program(program));
        }
        Err(GridError::LocationNotRecognized(phrase.trim().to_string()))
    }

    /// Resolves a phrase to cells whose first entry holds a program.
    fn resolve_occupied(
        &self,
        phrase: &str,
        spans: &SpanManager,
    ) -> Result<Vec<GridPosition>, GridError> {
        match self.resolve_subject(phrase)? {
            Subject::Cells(cells) => match cells.first() {
                Some(first) if spans.grid().is_empty(*first) => {
                    Err(GridError::SourceNotFound(first.to_string()))
                }
                Some(_) => Ok(cells),
                None => Err(GridError::LocationNotRecognized(phrase.trim().to_string())),
            },
            Subject::Program(program) => {
                let cells = spans.grid().positions_of(&program);
                if cells.is_empty() {
                    return Err(GridError::SourceNotFound(
                        self.catalog.display_name(&program),
                    ));
                }
                Ok(cells)
            }
        }
    }

    fn resolve_single_cell(
        &self,
        phrase: &str,
        spans: &SpanManager,
    ) -> Result<GridPosition, GridError> {
        let cells = match self.resolve_subject(phrase)? {
            Subject::Cells(cells) => cells,
            Subject::Program(program) => {
                let cells = spans.grid().positions_of(&program);
                if cells.is_empty() {
                    return Err(GridError::SourceNotFound(
                        self.catalog.display_name(&program),
                    ));
                }
                cells
            }
        };
        match cells.as_slice() {
            [single] => Ok(*single),
            _ => Err(GridError::InvalidSwapArity(phrase.trim().to_string())),
        }
    }

    fn occupant_name(&self, cells: &[GridPosition], spans: &SpanManager) -> String {
        let mut names: Vec<String> = Vec::new();
        for cell in cells {
            if let Some(program) = spans.grid().occupant_of(*cell) {
                let name = self.catalog.display_name(program);
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        if names.is_empty() {
            describe_cells(cells)
        } else {
            names.join(" and ")
        }
    }
}

/// Text after the first occurrence of `keyword`, or the whole text.
fn after_keyword<'a>(lower: &'a str, keyword: &str) -> &'a str {
    match lower.find(keyword) {
        Some(index) => &lower[index + keyword.len()..],
        None => lower,
    }
}

fn split_once<'a>(text: &'a str, separator: &str) -> (&'a str, &'a str) {
    text.split_once(separator).unwrap_or((text, ""))
}

/// Layout name following `keyword` in the original casing, without a
/// leading "as"/"named"/"called" and trailing punctuation.
fn layout_name(original: &str, lower: &str, keyword: &str) -> Option<String> {
    let index = lower.find(keyword)? + keyword.len();
    let mut name = original[index..].trim();
    for prefix in ["as ", "named ", "called ", "to "] {
        if let Some(rest) = strip_prefix_ignore_case(name, prefix) {
            name = rest.trim_start();
            break;
        }
    }
    let name = name
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim_end_matches(['.', '!', '?'])
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

/// "A-Top", "A-Top and A-Bottom", "A-Top, B-Top and C-Top".
pub fn describe_cells(cells: &[GridPosition]) -> String {
    let names: Vec<String> = cells.iter().map(ToString::to_string).collect();
    match names.as_slice() {
        [] => "no cells".to_string(),
        [single] => single.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

#[cfg(test)]
#[path = "../tests/interpreter_tests.rs"]
mod tests;
