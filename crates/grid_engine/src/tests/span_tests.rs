use super::*;
use shared::domain::{Column, Row};

fn manager() -> SpanManager {
    SpanManager::new(Arc::new(ProgramCatalog::default()))
}

fn p(raw: &str) -> GridPosition {
    raw.parse().expect("position")
}

fn id(raw: &str) -> ProgramId {
    ProgramId::from(raw)
}

#[test]
fn opens_single_cell() {
    let mut spans = manager();
    let group = spans.open(&id("voice"), &[p("B-Top")]).expect("open");
    assert_eq!(group.positions, vec![p("B-Top")]);
    assert_eq!(spans.grid().occupant_of(p("B-Top")), Some(&id("voice")));
    assert_eq!(spans.grid().occupied_count(), 1);
}

#[test]
fn opens_rectangular_span_with_first_cell_as_anchor() {
    let mut spans = manager();
    let group = spans
        .open(
            &id("dicom-viewer"),
            &[p("C-Bottom"), p("B-Top"), p("C-Top"), p("B-Bottom")],
        )
        .expect("open span");
    assert_eq!(group.anchor(), Some(p("B-Top")));
    assert_eq!(group.bounds().expect("bounds").area(), 4);
    for cell in ["B-Top", "B-Bottom", "C-Top", "C-Bottom"] {
        assert_eq!(spans.grid().occupant_of(p(cell)), Some(&id("dicom-viewer")));
    }
}

#[test]
fn rejects_non_contiguous_span_instead_of_overlapping_bounding_box() {
    let mut spans = manager();
    let err = spans
        .open(&id("monitoring"), &[p("A-Top"), p("D-Bottom")])
        .expect_err("non-rectangular");
    assert!(matches!(err, GridError::NonRectangularSpan(_)));
    assert_eq!(spans.grid().occupied_count(), 0);

    let err = spans
        .open(&id("monitoring"), &[p("A-Top"), p("A-Bottom"), p("B-Top")])
        .expect_err("l-shape");
    assert!(matches!(err, GridError::NonRectangularSpan(_)));
}

#[test]
fn open_refuses_occupied_cells_and_unknown_programs() {
    let mut spans = manager();
    spans.open(&id("voice"), &[p("A-Top")]).expect("open");

    let err = spans
        .open(&id("monitoring"), &[p("A-Top"), p("B-Top")])
        .expect_err("occupied");
    assert_eq!(err, GridError::CellsUnavailable(vec![p("A-Top")]));

    let err = spans
        .open(&id("voice"), &[p("C-Top")])
        .expect_err("already open");
    assert!(matches!(err, GridError::ProgramAlreadyOpen { .. }));

    let err = spans
        .open(&id("ultrasound"), &[p("C-Top")])
        .expect_err("unknown");
    assert!(matches!(err, GridError::ProgramNotFound(_)));
}

#[test]
fn close_clears_whole_group_from_any_member() {
    let mut spans = manager();
    spans
        .open(&id("patient-info"), &[p("A-Top"), p("A-Bottom")])
        .expect("open");

    let record = spans.close(p("A-Bottom")).expect("close");
    assert_eq!(record.program, id("patient-info"));
    assert_eq!(record.display_name, "Patient Information");
    assert_eq!(record.previous_positions, vec![p("A-Top"), p("A-Bottom")]);
    assert!(spans.grid().is_empty(p("A-Top")));
    assert!(spans.grid().is_empty(p("A-Bottom")));
    assert_eq!(spans.closed_programs().len(), 1);
}

#[test]
fn closing_same_program_twice_keeps_one_record() {
    let mut spans = manager();
    spans.open(&id("voice"), &[p("A-Top")]).expect("open");
    spans.close(p("A-Top")).expect("close");

    // Reopening elsewhere without consuming the record through reopen().
    spans.closed.push(ClosedProgramRecord {
        program: id("voice"),
        display_name: "Voice Assistant".into(),
        previous_positions: vec![p("A-Top")],
    });
    spans.grid.assign(p("C-Top"), id("voice")).expect("assign");
    spans.grid.assign(p("C-Bottom"), id("voice")).expect("assign");

    spans.close(p("C-Top")).expect("close again");
    let records: Vec<_> = spans
        .closed_programs()
        .iter()
        .filter(|record| record.program == id("voice"))
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].previous_positions, vec![p("C-Top"), p("C-Bottom")]);
}

#[test]
fn close_of_empty_cell_is_source_not_found() {
    let mut spans = manager();
    let err = spans.close(p("D-Top")).expect_err("empty");
    assert!(matches!(err, GridError::SourceNotFound(_)));
}

#[test]
fn move_relocates_whole_group_and_back() {
    let mut spans = manager();
    spans
        .open(&id("patient-info"), &[p("A-Top"), p("A-Bottom")])
        .expect("open");
    let before = spans.grid().clone();

    spans
        .move_span(&[p("A-Top")], &[p("C-Top"), p("C-Bottom")])
        .expect("move");
    assert!(spans.grid().is_empty(p("A-Top")));
    assert!(spans.grid().is_empty(p("A-Bottom")));
    assert_eq!(
        spans.grid().positions_of(&id("patient-info")),
        vec![p("C-Top"), p("C-Bottom")]
    );

    spans
        .move_span(&[p("C-Top"), p("C-Bottom")], &[p("A-Top"), p("A-Bottom")])
        .expect("move back");
    assert_eq!(spans.grid(), &before);
}

#[test]
fn move_into_own_cells_is_allowed() {
    let mut spans = manager();
    spans
        .open(&id("monitoring"), &[p("B-Top"), p("B-Bottom")])
        .expect("open");
    spans
        .move_span(&[p("B-Top")], &[p("B-Top"), p("C-Top")])
        .expect("shift");
    assert_eq!(
        spans.grid().positions_of(&id("monitoring")),
        vec![p("B-Top"), p("C-Top")]
    );
}

#[test]
fn failed_move_leaves_grid_untouched() {
    let mut spans = manager();
    spans.open(&id("voice"), &[p("A-Top")]).expect("open voice");
    spans.open(&id("monitoring"), &[p("B-Top")]).expect("open monitoring");
    let before = spans.grid().clone();

    let err = spans
        .move_span(&[p("A-Top")], &[p("B-Top")])
        .expect_err("target occupied");
    assert_eq!(err, GridError::TargetUnavailable(p("B-Top")));
    assert_eq!(spans.grid(), &before);

    let err = spans
        .move_span(&[p("D-Top")], &[p("D-Bottom")])
        .expect_err("no source");
    assert!(matches!(err, GridError::SourceNotFound(_)));
}

#[test]
fn swap_is_self_inverse_for_single_cells() {
    let mut spans = manager();
    spans.open(&id("voice"), &[p("A-Top")]).expect("open");
    spans.open(&id("monitoring"), &[p("D-Bottom")]).expect("open");
    let before = spans.grid().clone();

    spans.swap(p("A-Top"), p("D-Bottom")).expect("swap");
    assert_eq!(spans.grid().occupant_of(p("A-Top")), Some(&id("monitoring")));
    assert_eq!(spans.grid().occupant_of(p("D-Bottom")), Some(&id("voice")));

    spans.swap(p("A-Top"), p("D-Bottom")).expect("swap back");
    assert_eq!(spans.grid(), &before);
}

#[test]
fn swap_with_empty_cell_relocates() {
    let mut spans = manager();
    spans.open(&id("voice"), &[p("A-Top")]).expect("open");
    spans.swap(p("A-Top"), p("B-Bottom")).expect("swap");
    assert!(spans.grid().is_empty(p("A-Top")));
    assert_eq!(spans.grid().occupant_of(p("B-Bottom")), Some(&id("voice")));
}

#[test]
fn swap_rejects_multi_cell_span() {
    let mut spans = manager();
    spans
        .open(&id("patient-info"), &[p("C-Top"), p("C-Bottom")])
        .expect("open");
    spans.open(&id("voice"), &[p("D-Top")]).expect("open");
    let before = spans.grid().clone();

    let err = spans.swap(p("C-Top"), p("D-Top")).expect_err("span");
    assert_eq!(err, GridError::InvalidSwapArity("C-Top".into()));
    assert_eq!(spans.grid(), &before);
}

#[test]
fn expand_grows_to_adjacent_empty_cell() {
    let mut spans = manager();
    spans.open(&id("dicom-viewer"), &[p("B-Top")]).expect("open");
    let group = spans.expand(p("B-Top"), p("C-Top")).expect("expand");
    assert_eq!(group.positions, vec![p("B-Top"), p("C-Top")]);

    let group = spans.expand(p("B-Top"), p("B-Bottom"));
    assert!(matches!(group, Err(GridError::NonRectangularSpan(_))));
    spans.expand(p("C-Top"), p("C-Bottom")).expect_err("l-shape");
}

#[test]
fn expand_to_takes_every_target_or_none() {
    let mut spans = manager();
    spans
        .open(&id("patient-info"), &[p("A-Top"), p("A-Bottom")])
        .expect("open");
    let before = spans.grid().clone();

    let err = spans
        .expand_to(p("A-Top"), &[p("B-Top")])
        .expect_err("l-shape");
    assert!(matches!(err, GridError::NonRectangularSpan(_)));
    let err = spans
        .expand_to(p("A-Top"), &[p("B-Top"), p("D-Bottom")])
        .expect_err("unreachable");
    assert_eq!(
        err,
        GridError::NotAdjacent {
            from: p("A-Top"),
            target: p("D-Bottom"),
        }
    );
    assert_eq!(spans.grid(), &before);

    // C-Top is only reachable through B-Top.
    let group = spans
        .expand_to(p("A-Top"), &[p("C-Top"), p("B-Top"), p("B-Bottom"), p("C-Bottom")])
        .expect("expand");
    assert_eq!(group.positions.len(), 6);
    assert_eq!(group.anchor(), Some(p("A-Top")));
}

#[test]
fn expand_rejects_non_adjacent_and_occupied_targets() {
    let mut spans = manager();
    spans.open(&id("voice"), &[p("A-Top")]).expect("open");
    spans.open(&id("monitoring"), &[p("B-Top")]).expect("open");

    let err = spans.expand(p("A-Top"), p("D-Bottom")).expect_err("far");
    assert_eq!(
        err,
        GridError::NotAdjacent {
            from: p("A-Top"),
            target: p("D-Bottom"),
        }
    );
    let err = spans.expand(p("A-Top"), p("B-Top")).expect_err("occupied");
    assert_eq!(err, GridError::TargetUnavailable(p("B-Top")));
}

#[test]
fn reopen_consumes_record() {
    let mut spans = manager();
    spans.open(&id("volumetric-viewer"), &[p("B-Top")]).expect("open");
    spans.close(p("B-Top")).expect("close");
    assert!(spans.closed_record(&id("volumetric-viewer")).is_some());

    spans
        .reopen(&id("volumetric-viewer"), &[p("D-Top")])
        .expect("reopen");
    assert!(spans.closed_record(&id("volumetric-viewer")).is_none());
    assert_eq!(
        spans.grid().occupant_of(GridPosition::new(Column::D, Row::Top)),
        Some(&id("volumetric-viewer"))
    );

    let err = spans.reopen(&id("voice"), &[p("A-Top")]).expect_err("never closed");
    assert_eq!(err, GridError::NotClosed(id("voice")));
}

#[test]
fn close_mutation_closes_every_touched_group() {
    let mut spans = manager();
    spans.open(&id("voice"), &[p("A-Top")]).expect("open");
    spans
        .open(&id("monitoring"), &[p("B-Top"), p("C-Top")])
        .expect("open");

    let cleared = spans
        .apply(&Mutation::Close {
            positions: GridPosition::row_positions(Row::Top),
        })
        .expect("close row");
    assert_eq!(cleared, vec![p("A-Top"), p("B-Top"), p("C-Top")]);
    assert_eq!(spans.grid().occupied_count(), 0);
    assert_eq!(spans.closed_programs().len(), 2);

    let err = spans
        .apply(&Mutation::Close {
            positions: vec![p("A-Top")],
        })
        .expect_err("nothing left");
    assert!(matches!(err, GridError::SourceNotFound(_)));
}
