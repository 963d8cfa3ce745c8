use super::*;
use shared::{
    domain::{CellState, ProgramId},
    protocol::{CommandId, FeedbackLevel},
};

fn pos(text: &str) -> GridPosition {
    text.parse().expect("position")
}

#[test]
fn renders_occupants_and_blanks() {
    let mut cells: BTreeMap<GridPosition, CellSnapshot> = GridPosition::ALL
        .iter()
        .map(|position| {
            (
                *position,
                CellSnapshot {
                    content: None,
                    state: CellState::Empty,
                },
            )
        })
        .collect();
    cells.insert(
        pos("B-Bottom"),
        CellSnapshot {
            content: Some(ProgramId::from("voice")),
            state: CellState::Occupied,
        },
    );

    let rendered = render_grid(&cells);
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].trim_start().starts_with('A'));
    assert!(lines[1].starts_with("Top"));
    assert!(!lines[1].contains("voice"));
    assert!(lines[2].starts_with("Bottom"));
    assert!(lines[2].contains("voice"));
}

#[test]
fn describes_notices_and_highlights_but_not_expiry() {
    let id = CommandId::new();
    assert_eq!(
        describe_event(&FeedbackEvent::Notice {
            command_id: Some(id),
            level: FeedbackLevel::Error,
            message: "A-Top is already occupied".to_string(),
        }),
        Some("[error] A-Top is already occupied".to_string())
    );
    assert_eq!(
        describe_event(&FeedbackEvent::Highlight {
            command_id: id,
            positions: vec![pos("A-Top"), pos("A-Bottom")],
            tone: HighlightTone::Pending,
        }),
        Some("  ~ A-Top, A-Bottom".to_string())
    );
    assert_eq!(
        describe_event(&FeedbackEvent::NoticeExpired { command_id: None }),
        None
    );
}
