use std::sync::Arc;

use grid_engine::{parse_locations, ProgramCatalog, SpanManager};
use shared::{
    domain::{GridPosition, ProgramId},
    error::GridError,
};

fn pos(text: &str) -> GridPosition {
    text.parse().expect("position")
}

fn cells(list: &[&str]) -> Vec<GridPosition> {
    list.iter().map(|cell| pos(cell)).collect()
}

fn program(id: &str) -> ProgramId {
    ProgramId::from(id)
}

fn occupied(spans: &SpanManager) -> Vec<(String, String)> {
    GridPosition::ALL
        .iter()
        .filter_map(|cell| {
            spans
                .grid()
                .occupant_of(*cell)
                .map(|program| (cell.to_string(), program.to_string()))
        })
        .collect()
}

fn operating_room() -> SpanManager {
    let mut spans = SpanManager::new(Arc::new(ProgramCatalog::default()));
    spans
        .open(&program("patient-info"), &cells(&["A-Top", "A-Bottom"]))
        .expect("open patient info");
    spans
        .open(&program("volumetric-viewer"), &cells(&["B-Top"]))
        .expect("open 3d viewer");
    spans
        .move_span(&cells(&["A-Top", "A-Bottom"]), &cells(&["C-Top", "C-Bottom"]))
        .expect("move patient info");
    spans
}

#[test]
fn open_open_move_leaves_expected_grid() {
    let spans = operating_room();
    assert_eq!(
        occupied(&spans),
        vec![
            ("B-Top".to_string(), "volumetric-viewer".to_string()),
            ("C-Top".to_string(), "patient-info".to_string()),
            ("C-Bottom".to_string(), "patient-info".to_string()),
        ]
    );
}

#[test]
fn close_then_reopen_elsewhere_consumes_the_record() {
    let mut spans = operating_room();
    let record = spans.close(pos("B-Top")).expect("close");
    assert_eq!(record.program, program("volumetric-viewer"));
    assert_eq!(record.previous_positions, cells(&["B-Top"]));
    assert_eq!(spans.closed_programs().len(), 1);

    spans
        .reopen(&program("volumetric-viewer"), &cells(&["D-Top"]))
        .expect("reopen");
    assert!(spans.closed_programs().is_empty());
    assert_eq!(
        spans.grid().occupant_of(pos("D-Top")),
        Some(&program("volumetric-viewer"))
    );
}

#[test]
fn swap_into_a_span_is_rejected() {
    let mut spans = operating_room();
    let before = spans.grid().clone();
    assert!(matches!(
        spans.swap(pos("C-Top"), pos("D-Top")),
        Err(GridError::InvalidSwapArity(_))
    ));
    assert_eq!(spans.grid(), &before);
}

#[test]
fn move_there_and_back_restores_placement() {
    let mut spans = operating_room();
    let before = spans.grid().clone();
    spans
        .move_span(&cells(&["C-Top", "C-Bottom"]), &cells(&["D-Top", "D-Bottom"]))
        .expect("move out");
    spans
        .move_span(&cells(&["D-Top", "D-Bottom"]), &cells(&["C-Top", "C-Bottom"]))
        .expect("move back");
    assert_eq!(spans.grid(), &before);
}

#[test]
fn expand_rejects_far_targets() {
    let mut spans = SpanManager::new(Arc::new(ProgramCatalog::default()));
    spans
        .open(&program("monitoring"), &cells(&["A-Top"]))
        .expect("open");
    assert_eq!(
        spans.expand(pos("A-Top"), pos("D-Bottom")),
        Err(GridError::NotAdjacent {
            from: pos("A-Top"),
            target: pos("D-Bottom"),
        })
    );
}

#[test]
fn location_phrases() {
    assert_eq!(
        parse_locations("top row"),
        cells(&["A-Top", "B-Top", "C-Top", "D-Top"])
    );
    assert_eq!(parse_locations("left side"), cells(&["A-Top", "A-Bottom"]));
}
