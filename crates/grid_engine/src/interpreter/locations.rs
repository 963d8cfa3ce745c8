use std::sync::OnceLock;

use regex_lite::Regex;
use shared::domain::{Column, GridPosition, Row};

struct LocationPatterns {
    cell: Regex,
    cell_reversed: Regex,
    side: Regex,
    column: Regex,
    row: Regex,
    column_pair: Regex,
    row_word: Regex,
}

fn patterns() -> &'static LocationPatterns {
    static PATTERNS: OnceLock<LocationPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LocationPatterns {
        cell: Regex::new(r"\b([a-d])[\s_-]*(top|bottom|upper|lower)\b").expect("cell regex"),
        cell_reversed: Regex::new(r"\b(top|bottom|upper|lower)[\s_-]*([a-d])\b")
            .expect("reversed cell regex"),
        side: Regex::new(r"\b(left|right)\s+(side|column|half)\b").expect("side regex"),
        column: Regex::new(r"\bcolumn\s*([a-d])\b").expect("column regex"),
        row: Regex::new(r"\b(top|bottom|upper|lower)\s+row\b").expect("row regex"),
        column_pair: Regex::new(r"\b([a-d])\s*(?:and|&|\+|,|-|to|through)?\s*([a-d])\b")
            .expect("column pair regex"),
        row_word: Regex::new(r"\b(top|bottom|upper|lower)\b").expect("row word regex"),
    })
}

/// Extracts every grid position named in `text`.
///
/// Recognizes explicit cells (`a top`, `B-Bottom`, `ctop`), sides
/// (`left side`), columns (`column b`), rows (`top row`) and, when the text
/// says "across", adjacent column pairs with a row (`across a and b top`).
/// Results are deduplicated and ordered by where they appear in the text.
pub fn parse_locations(text: &str) -> Vec<GridPosition> {
    let text = text.to_lowercase();
    let patterns = patterns();
    let mut found: Vec<(usize, GridPosition)> = Vec::new();

    for caps in patterns.cell.captures_iter(&text) {
        let (Some(whole), Some(column), Some(row)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if let Some(position) = cell(column.as_str(), row.as_str()) {
            found.push((whole.start(), position));
        }
    }

    if found.is_empty() {
        for caps in patterns.cell_reversed.captures_iter(&text) {
            let (Some(whole), Some(row), Some(column)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            if let Some(position) = cell(column.as_str(), row.as_str()) {
                found.push((whole.start(), position));
            }
        }
    }

    for caps in patterns.side.captures_iter(&text) {
        let (Some(whole), Some(side)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let column = if side.as_str() == "left" {
            Column::A
        } else {
            Column::D
        };
        for position in GridPosition::column_positions(column) {
            found.push((whole.start(), position));
        }
    }

    for caps in patterns.column.captures_iter(&text) {
        let (Some(whole), Some(letter)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if let Some(column) = letter.as_str().chars().next().and_then(Column::from_letter) {
            for position in GridPosition::column_positions(column) {
                found.push((whole.start(), position));
            }
        }
    }

    for caps in patterns.row.captures_iter(&text) {
        let (Some(whole), Some(word)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if let Some(row) = Row::from_word(word.as_str()) {
            for position in GridPosition::row_positions(row) {
                found.push((whole.start(), position));
            }
        }
    }

    if text.contains("across") {
        found.extend(across_pairs(&text, patterns));
    }

    found.sort_by_key(|(offset, _)| *offset);
    let mut positions: Vec<GridPosition> = Vec::with_capacity(found.len());
    for (_, position) in found {
        if !positions.contains(&position) {
            positions.push(position);
        }
    }
    positions
}

/// "across a and b top" style phrases: only the A+B and C+D pairs count,
/// and a row word must appear somewhere in the text.
fn across_pairs(text: &str, patterns: &LocationPatterns) -> Vec<(usize, GridPosition)> {
    let Some(row) = patterns
        .row_word
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|word| Row::from_word(word.as_str()))
    else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for caps in patterns.column_pair.captures_iter(text) {
        let (Some(whole), Some(first), Some(second)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let columns = match (first.as_str(), second.as_str()) {
            ("a", "b") | ("b", "a") => [Column::A, Column::B],
            ("c", "d") | ("d", "c") => [Column::C, Column::D],
            _ => continue,
        };
        for column in columns {
            found.push((whole.start(), GridPosition::new(column, row)));
        }
    }
    found
}

fn cell(column: &str, row: &str) -> Option<GridPosition> {
    let column = column.chars().next().and_then(Column::from_letter)?;
    let row = Row::from_word(row)?;
    Some(GridPosition::new(column, row))
}

#[cfg(test)]
#[path = "../tests/locations_tests.rs"]
mod tests;
