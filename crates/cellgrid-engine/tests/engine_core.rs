use cellgrid_engine::{CellRef, CellValue, ErrorValue, Sheet, SheetError};
use pretty_assertions::assert_eq;

fn a1(label: &str) -> CellRef {
    CellRef::from_a1(label).unwrap()
}

fn number(sheet: &Sheet, label: &str) -> f64 {
    sheet
        .value(a1(label))
        .unwrap_or_else(|| panic!("{label} is unoccupied"))
        .as_number()
        .unwrap_or_else(|| panic!("{label} is not a number"))
}

#[test]
fn arithmetic_chain_recalculates_after_upstream_change() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("A1"), "2").unwrap();
    sheet.set_cell(a1("A2"), "=A1+3").unwrap();
    sheet.set_cell(a1("A3"), "=A2*A2").unwrap();

    assert_eq!(number(&sheet, "A1"), 2.0);
    assert_eq!(number(&sheet, "A2"), 5.0);
    assert_eq!(number(&sheet, "A3"), 25.0);

    let stats = sheet.stats();
    assert_eq!(stats.cells, 3);
    assert_eq!(stats.formula_cells, 2);
    assert_eq!(stats.edges, 2);

    sheet.set_cell(a1("A1"), "4").unwrap();
    assert_eq!(number(&sheet, "A2"), 7.0);
    assert_eq!(number(&sheet, "A3"), 49.0);
}

#[test]
fn cycle_rejection_restores_prior_state_exactly() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("A1"), "2").unwrap();
    sheet.set_cell(a1("A2"), "=A1+3").unwrap();
    sheet.set_cell(a1("A3"), "=A2*A2").unwrap();

    // Warm the caches so restoration covers them too.
    assert_eq!(number(&sheet, "A3"), 25.0);
    let stats_before = sheet.stats();

    let err = sheet.set_cell(a1("A1"), "=A3").unwrap_err();
    let SheetError::Cycle(cycle) = err else {
        panic!("expected a cycle rejection, got {err:?}");
    };
    // The reported chain starts and ends at the written cell.
    assert_eq!(cycle.path.first(), Some(&a1("A1")));
    assert_eq!(cycle.path.last(), Some(&a1("A1")));

    // Nothing moved: texts, values, edges, caches.
    assert_eq!(sheet.cell(a1("A1")).unwrap().text(), "2");
    assert_eq!(number(&sheet, "A1"), 2.0);
    assert_eq!(number(&sheet, "A2"), 5.0);
    assert_eq!(number(&sheet, "A3"), 25.0);
    assert_eq!(sheet.stats(), stats_before);
    assert_eq!(
        sheet.cell(a1("A3")).unwrap().cached_value(),
        Some(Ok(25.0))
    );
}

#[test]
fn self_reference_is_a_cycle() {
    let mut sheet = Sheet::new();
    assert!(matches!(
        sheet.set_cell(a1("A1"), "=A1"),
        Err(SheetError::Cycle(_))
    ));
    assert!(sheet.cell(a1("A1")).is_none());
}

#[test]
fn longer_cycles_are_found_through_the_graph() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("A1"), "1").unwrap();
    sheet.set_cell(a1("B1"), "=A1").unwrap();
    sheet.set_cell(a1("C1"), "=B1+B1").unwrap();
    sheet.set_cell(a1("D1"), "=C1*2").unwrap();

    let err = sheet.set_cell(a1("A1"), "=D1+1").unwrap_err();
    assert!(matches!(err, SheetError::Cycle(_)));
    // A1 is untouched, and the chain still evaluates.
    assert_eq!(sheet.cell(a1("A1")).unwrap().text(), "1");
    assert_eq!(number(&sheet, "D1"), 4.0);
}

#[test]
fn text_cells_coerce_to_numbers_in_formulas() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("B1"), "7").unwrap();
    sheet.set_cell(a1("B2"), "=B1+1").unwrap();
    assert_eq!(number(&sheet, "B2"), 8.0);

    sheet.set_cell(a1("B1"), "7a").unwrap();
    assert_eq!(
        sheet.value(a1("B2")),
        Some(CellValue::Error(ErrorValue::Value))
    );

    // Empty referenced text reads as zero.
    sheet.set_cell(a1("B1"), "").unwrap();
    assert_eq!(number(&sheet, "B2"), 1.0);
}

#[test]
fn division_by_zero_is_an_error_value_not_a_failure() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("C1"), "0").unwrap();
    sheet.set_cell(a1("C2"), "=1/C1").unwrap();
    assert_eq!(
        sheet.value(a1("C2")),
        Some(CellValue::Error(ErrorValue::Div0))
    );

    // Error values cache and invalidate like numbers.
    assert_eq!(
        sheet.cell(a1("C2")).unwrap().cached_value(),
        Some(Err(ErrorValue::Div0))
    );
    sheet.set_cell(a1("C1"), "4").unwrap();
    assert_eq!(number(&sheet, "C2"), 0.25);
}

#[test]
fn reference_errors_and_parse_errors_are_distinct() {
    let mut sheet = Sheet::new();

    // Syntactically valid but outside the sheet: evaluates to #REF!.
    sheet.set_cell(a1("D1"), "=ZZZZ9999999").unwrap();
    assert_eq!(
        sheet.value(a1("D1")),
        Some(CellValue::Error(ErrorValue::Ref))
    );
    assert_eq!(sheet.cell(a1("D1")).unwrap().text(), "=ZZZZ9999999");
    // Nothing was materialized for the unreachable reference.
    assert_eq!(sheet.cell_count(), 1);

    // Syntactically invalid: the write itself fails, the cell is untouched.
    assert!(matches!(
        sheet.set_cell(a1("D2"), "=1+"),
        Err(SheetError::Parse(_))
    ));
    assert!(sheet.cell(a1("D2")).is_none());
}

#[test]
fn out_of_bounds_positions_are_rejected() {
    let mut sheet = Sheet::new();
    let outside = CellRef::new(0, 16_384);
    assert!(matches!(
        sheet.set_cell(outside, "1"),
        Err(SheetError::OutOfBounds(_))
    ));
    assert!(matches!(
        sheet.clear_cell(outside),
        Err(SheetError::OutOfBounds(_))
    ));
}

#[test]
fn referencing_an_empty_position_materializes_it() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("A1"), "=B5").unwrap();

    assert_eq!(number(&sheet, "A1"), 0.0);
    let b5 = sheet.cell(a1("B5")).expect("materialized on demand");
    assert!(b5.is_empty());
    assert_eq!(sheet.dependents_of(a1("B5")), vec![a1("A1")]);
    assert_eq!(sheet.precedents_of(a1("A1")), vec![a1("B5")]);

    // Writing into the materialized cell flows into the dependent.
    sheet.set_cell(a1("B5"), "6").unwrap();
    assert_eq!(number(&sheet, "A1"), 6.0);
}

#[test]
fn adjacency_stays_symmetric_across_rewrites() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("A1"), "1").unwrap();
    sheet.set_cell(a1("B1"), "2").unwrap();
    sheet.set_cell(a1("C1"), "=A1+B1").unwrap();

    assert_eq!(sheet.precedents_of(a1("C1")), vec![a1("A1"), a1("B1")]);
    assert_eq!(sheet.dependents_of(a1("A1")), vec![a1("C1")]);
    assert_eq!(sheet.dependents_of(a1("B1")), vec![a1("C1")]);

    // Rewriting the formula drops the stale edge and keeps the live one.
    sheet.set_cell(a1("C1"), "=B1*2").unwrap();
    assert_eq!(sheet.precedents_of(a1("C1")), vec![a1("B1")]);
    assert!(sheet.dependents_of(a1("A1")).is_empty());
    assert_eq!(sheet.dependents_of(a1("B1")), vec![a1("C1")]);

    // Replacing the formula with text drops every incoming edge.
    sheet.set_cell(a1("C1"), "done").unwrap();
    assert!(sheet.dependents_of(a1("B1")).is_empty());
    assert_eq!(sheet.stats().edges, 0);
}

#[test]
fn memoized_values_invalidate_transitively_and_prune_below_clean_cells() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("A1"), "1").unwrap();
    sheet.set_cell(a1("A2"), "=A1*2").unwrap();
    sheet.set_cell(a1("A3"), "=A2*2").unwrap();
    sheet.set_cell(a1("A4"), "=A3*2").unwrap();

    // Reading the deepest cell fills every memo on the chain.
    assert_eq!(number(&sheet, "A4"), 8.0);
    for label in ["A2", "A3", "A4"] {
        assert!(sheet.cell(a1(label)).unwrap().cached_value().is_some());
    }

    sheet.set_cell(a1("A1"), "3").unwrap();
    for label in ["A2", "A3", "A4"] {
        assert!(
            sheet.cell(a1(label)).unwrap().cached_value().is_none(),
            "{label} should have been invalidated"
        );
    }
    assert_eq!(number(&sheet, "A4"), 24.0);
}

#[test]
fn cached_values_match_a_fresh_evaluation() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("A1"), "2.5").unwrap();
    sheet.set_cell(a1("B1"), "=A1*A1+1").unwrap();

    let first = sheet.value(a1("B1"));
    let cached = sheet.value(a1("B1"));
    assert_eq!(first, cached);
    assert_eq!(
        sheet.cell(a1("B1")).unwrap().cached_value(),
        Some(Ok(7.25))
    );
}

#[test]
fn formula_text_is_stored_in_canonical_form() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("A1"), "=  ( 1 + 2 ) * a2 ").unwrap();
    assert_eq!(sheet.cell(a1("A1")).unwrap().text(), "=(1+2)*A2");

    // Text inputs round-trip verbatim, escape sign included.
    sheet.set_cell(a1("B1"), "'=not a formula").unwrap();
    assert_eq!(sheet.cell(a1("B1")).unwrap().text(), "'=not a formula");
    assert_eq!(
        sheet.value(a1("B1")),
        Some(CellValue::String("=not a formula".into()))
    );

    // A lone `=` is text.
    sheet.set_cell(a1("C1"), "=").unwrap();
    assert_eq!(sheet.cell(a1("C1")).unwrap().text(), "=");
    assert_eq!(sheet.value(a1("C1")), Some(CellValue::String("=".into())));
}

#[test]
fn escape_after_formula_sign_is_consumed_before_parsing() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("B2"), "3").unwrap();
    sheet.set_cell(a1("A1"), "='B2").unwrap();
    assert_eq!(sheet.cell(a1("A1")).unwrap().text(), "=B2");
    assert_eq!(number(&sheet, "A1"), 3.0);
}

#[test]
fn error_values_propagate_through_chains() {
    let mut sheet = Sheet::new();
    sheet.set_cell(a1("A1"), "0").unwrap();
    sheet.set_cell(a1("A2"), "=1/A1").unwrap();
    sheet.set_cell(a1("A3"), "=A2+100").unwrap();
    assert_eq!(
        sheet.value(a1("A3")),
        Some(CellValue::Error(ErrorValue::Div0))
    );

    sheet.set_cell(a1("A1"), "2").unwrap();
    assert_eq!(number(&sheet, "A3"), 100.5);
}
