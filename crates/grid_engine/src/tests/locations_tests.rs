use super::*;

fn p(raw: &str) -> GridPosition {
    raw.parse().expect("position")
}

fn ps(raw: &[&str]) -> Vec<GridPosition> {
    raw.iter().map(|cell| p(cell)).collect()
}

#[test]
fn top_row_is_all_four_top_cells() {
    assert_eq!(
        parse_locations("top row"),
        ps(&["A-Top", "B-Top", "C-Top", "D-Top"])
    );
    assert_eq!(
        parse_locations("the lower row please"),
        ps(&["A-Bottom", "B-Bottom", "C-Bottom", "D-Bottom"])
    );
}

#[test]
fn sides_map_to_outer_columns() {
    assert_eq!(parse_locations("left side"), ps(&["A-Top", "A-Bottom"]));
    assert_eq!(parse_locations("Right Side"), ps(&["D-Top", "D-Bottom"]));
    assert_eq!(parse_locations("column c"), ps(&["C-Top", "C-Bottom"]));
}

#[test]
fn explicit_cells_accept_spacing_and_casing_variants() {
    for text in ["a top", "A-Top", "a_top", "ATOP", "cell a  top"] {
        assert_eq!(parse_locations(text), ps(&["A-Top"]), "{text}");
    }
    assert_eq!(parse_locations("d upper"), ps(&["D-Top"]));
    assert_eq!(parse_locations("top b"), ps(&["B-Top"]));
}

#[test]
fn multiple_cells_keep_text_order_and_dedupe() {
    assert_eq!(
        parse_locations("c bottom and b top and c-bottom"),
        ps(&["C-Bottom", "B-Top"])
    );
}

#[test]
fn across_pairs_adjacent_columns_with_row() {
    assert_eq!(
        parse_locations("across a and b top"),
        ps(&["A-Top", "B-Top"])
    );
    assert_eq!(
        parse_locations("across c & d bottom"),
        ps(&["C-Bottom", "D-Bottom"])
    );
    // B and C are not an accepted pair.
    assert_eq!(parse_locations("across b and c top"), ps(&["C-Top"]));
    // Without "across" a bare pair means nothing.
    assert!(parse_locations("a and b").is_empty());
}

#[test]
fn ignores_letters_inside_words() {
    assert!(parse_locations("open the dicom viewer").is_empty());
    assert!(parse_locations("bad topic").is_empty());
    assert!(parse_locations("").is_empty());
}
