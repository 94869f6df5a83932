//! Tests for recalculation, invalidation and per-cell errors

use calcgraph::prelude::*;
use pretty_assertions::assert_eq;

fn number(n: f64) -> CellValue {
    CellValue::Number(n)
}

/// Constant, formula and write on a single sheet
#[test]
fn test_sheet_scenarios() {
    let mut engine = CalculationEngine::new();
    engine.define_constant("S!A1", 2.0).unwrap();
    engine.define_formula("S!A2", "=A1*3").unwrap();
    assert_eq!(engine.read("S!A2"), number(6.0));

    engine.write("S!A1", 5.0).unwrap();
    assert_eq!(engine.read("S!A2"), number(15.0));

    engine.define_formula("S!A3", "=IF(A1>0,1,0)").unwrap();
    assert_eq!(engine.read("S!A3"), number(1.0));
}

#[test]
fn test_sum_scenario() {
    let mut engine = CalculationEngine::new();
    engine.define_input("S!A1", 2.0).unwrap();
    engine.define_input("S!A2", 15.0).unwrap();
    engine.define_formula("S!A4", "=SUM(A1,A2)").unwrap();
    assert_eq!(engine.read("S!A4"), number(17.0));
}

/// Quoted, unquoted and bare references name the same cells
#[test]
fn test_reference_forms() {
    let mut engine = CalculationEngine::new();
    engine.define_constant("Crude Assay!B2", 4.0).unwrap();
    engine.define_constant("Units!C3", 10.0).unwrap();
    engine.define_constant("Calc!A1", 1.0).unwrap();
    engine
        .define_formula("Calc!A2", "='Crude Assay'!B2*Units!C3+A1")
        .unwrap();

    assert_eq!(engine.read("Calc!A2"), number(41.0));
    assert_eq!(
        engine.dependencies("Calc!A2"),
        ["Crude Assay!B2", "Units!C3", "Calc!A1"]
    );
}

#[test]
fn test_invalidation_closure() {
    let mut engine = CalculationEngine::new();
    engine.define_input("A1", 1.0).unwrap();
    engine.define_formula("B1", "=A1").unwrap();
    engine.define_formula("C1", "=B1*2").unwrap();
    engine.define_input("U1", 7.0).unwrap();
    engine.define_formula("V1", "=U1").unwrap();

    engine.recalculate_all();
    for addr in ["A1", "B1", "C1", "U1", "V1"] {
        assert!(engine.is_fresh(addr), "{addr} should be fresh");
    }

    engine.write("A1", 4.0).unwrap();

    let stale: Vec<_> = engine
        .addresses()
        .filter(|addr| !engine.is_fresh(addr.as_str()))
        .map(|addr| addr.as_str())
        .collect();
    assert_eq!(stale, ["B1", "C1"]);

    assert_eq!(engine.read("C1"), number(8.0));
    assert!(engine.is_fresh("B1"));
    assert!(engine.is_fresh("C1"));
}

#[test]
fn test_read_evaluates_only_what_it_needs() {
    let mut engine = CalculationEngine::new();
    engine.define_input("A1", 1.0).unwrap();
    engine.define_formula("B1", "=A1+1").unwrap();
    engine.define_formula("C1", "=B1*10").unwrap();
    engine.define_formula("D1", "=A1-1").unwrap();

    assert_eq!(engine.read("C1"), number(20.0));
    assert!(engine.is_fresh("B1"));
    assert!(!engine.is_fresh("D1"));

    engine.write("A1", 3.0).unwrap();
    assert!(!engine.is_fresh("B1"));
    assert!(!engine.is_fresh("C1"));
    assert!(engine.is_fresh("A1"));

    assert_eq!(engine.read("C1"), number(40.0));
    assert_eq!(engine.read("D1"), number(2.0));
}

#[test]
fn test_missing_reference_reads_as_zero() {
    let mut engine = CalculationEngine::new();
    engine.define_formula("B1", "=A1+5").unwrap();
    assert_eq!(engine.read("B1"), number(5.0));
    assert!(!engine.contains("A1"));

    // Defining the missing cell later refreshes its readers
    engine.define_constant("A1", 1.0).unwrap();
    assert!(!engine.is_fresh("B1"));
    assert_eq!(engine.read("B1"), number(6.0));
}

#[test]
fn test_unknown_address_reads_empty() {
    let mut engine = CalculationEngine::new();
    assert_eq!(engine.read("Nowhere!Z9"), CellValue::Empty);
    assert_eq!(engine.read(""), CellValue::Empty);
}

#[test]
fn test_cycle_terminates() {
    let mut engine = CalculationEngine::new();
    engine.define_formula("A1", "=B1").unwrap();
    engine.define_formula("B1", "=A1").unwrap();

    let recalc = engine.recalculate_all();
    assert_eq!(recalc.results.len(), 2);
    assert!(recalc.stats.circular_references > 0);

    // Reads after invalidation also terminate
    engine.define_formula("B1", "=A1+1").unwrap();
    let _ = engine.read("A1");
    let _ = engine.read("B1");
}

#[test]
fn test_self_reference_terminates() {
    let mut engine = CalculationEngine::new();
    engine.define_formula("A1", "=A1+1").unwrap();
    let _ = engine.read("A1");
    let recalc = engine.recalculate_all();
    assert_eq!(recalc.stats.circular_references, 1);
}

#[test]
fn test_recalculate_is_idempotent() {
    let mut engine = CalculationEngine::new();
    engine.define_input("A1", 3.0).unwrap();
    engine.define_formula("A2", "=A1^2").unwrap();
    engine.define_formula("A3", "=MAX(A1,A2)-MIN(A1,A2)").unwrap();
    engine.define_formula("A4", "=1/0").unwrap();

    let first = engine.recalculate_all();
    let second = engine.recalculate_all();
    assert_eq!(first.results, second.results);
    assert_eq!(first.value("A3"), Some(number(6.0)));
}

#[test]
fn test_errors_are_isolated() {
    let mut engine = CalculationEngine::new();
    engine.define_input("A1", 0.0).unwrap();
    engine.define_formula("B1", "=10/A1").unwrap();
    engine.define_formula("B2", "=A1+").unwrap();
    engine.define_formula("B3", "=MEDIAN(A1)").unwrap();
    engine.define_formula("B4", "=ABS(A1,A1)").unwrap();
    engine.define_formula("B5", "=A1+2").unwrap();
    engine.define_formula("B6", "=B1+1").unwrap();

    let recalc = engine.recalculate_all();
    assert_eq!(recalc.stats.formula_count, 6);
    assert_eq!(recalc.stats.errors, 4);
    assert!(!recalc.is_ok());

    assert!(matches!(recalc.get("B1"), Some(Err(FormulaError::Evaluation(_)))));
    assert!(matches!(recalc.get("B2"), Some(Err(FormulaError::Parse(_)))));
    assert!(matches!(
        recalc.get("B3"),
        Some(Err(FormulaError::UnknownFunction(_)))
    ));
    assert!(matches!(
        recalc.get("B4"),
        Some(Err(FormulaError::ArgumentCount { .. }))
    ));
    assert_eq!(recalc.value("B5"), Some(number(2.0)));

    // A failed cell reads as empty, which its readers see as zero
    assert_eq!(recalc.value("B6"), Some(number(1.0)));
    assert_eq!(engine.read("B1"), CellValue::Empty);
    assert!(engine.is_fresh("B1"));
    assert!(engine.error("B2").map_or(false, FormulaError::is_syntax));

    let failed: Vec<_> = recalc.errors().map(|(addr, _)| addr.as_str()).collect();
    assert_eq!(failed, ["B1", "B2", "B3", "B4"]);

    // Fixing the input clears the error
    engine.write("A1", 5.0).unwrap();
    assert_eq!(engine.read("B1"), number(2.0));
    assert_eq!(engine.error("B1"), None);
}

#[test]
fn test_redefinition_replaces_cell() {
    let mut engine = CalculationEngine::new();
    engine.define_input("A1", 2.0).unwrap();
    engine.define_input("A2", 3.0).unwrap();
    engine.define_formula("B1", "=A1*10").unwrap();
    engine.define_formula("C1", "=B1+1").unwrap();
    assert_eq!(engine.read("C1"), number(21.0));

    engine.define_formula("B1", "=A2*10").unwrap();
    assert!(!engine.is_fresh("C1"));
    assert_eq!(engine.read("C1"), number(31.0));
    assert_eq!(engine.dependencies("B1"), ["A2"]);
    assert!(engine.dependents("A1").is_empty());

    // A1 no longer feeds B1
    engine.write("A1", 100.0).unwrap();
    assert!(engine.is_fresh("C1"));

    // Formula to constant drops its dependencies
    engine.define_constant("B1", 7.0).unwrap();
    assert_eq!(engine.kind("B1"), Some(CellKind::Constant));
    assert!(engine.dependencies("B1").is_empty());
    assert_eq!(engine.read("C1"), number(8.0));
    assert_eq!(engine.len(), 4);
}

#[test]
fn test_nested_reductions() {
    let mut engine = CalculationEngine::new();
    engine.define_input("A1", 1.0).unwrap();
    engine.define_input("A2", 8.0).unwrap();
    engine.define_input("A3", -4.0).unwrap();
    engine
        .define_formula("B1", "=SUM(MAX(A1,A2),MIN(A2,A3),ABS(A3))+MAX(1,2)")
        .unwrap();
    assert_eq!(engine.read("B1"), number(10.0));
}

#[test]
fn test_booleans_in_arithmetic() {
    let mut engine = CalculationEngine::new();
    engine.define_constant("A1", true).unwrap();
    engine.define_formula("A2", "=A1+1").unwrap();
    engine.define_formula("A3", "=A2>1").unwrap();
    engine.define_formula("A4", "=IF(A3,ROUND(-2.5),0)").unwrap();

    assert_eq!(engine.read("A2"), number(2.0));
    assert_eq!(engine.read("A3"), CellValue::Boolean(true));
    assert_eq!(engine.read("A4"), number(-3.0));
}

#[test]
fn test_lazy_if_skips_untaken_branch() {
    let mut engine = CalculationEngine::new();
    engine.define_input("A1", 0.0).unwrap();
    engine.define_formula("A2", "=IF(A1=0,0,1/A1)").unwrap();
    assert_eq!(engine.read("A2"), number(0.0));
    assert_eq!(engine.error("A2"), None);
}

#[test]
fn test_calculation_order_is_topological() {
    let mut engine = CalculationEngine::new();
    engine.define_formula("D1", "=B1+C1").unwrap();
    engine.define_formula("C1", "=A1*2").unwrap();
    engine.define_formula("B1", "=A1+1").unwrap();
    engine.define_input("A1", 1.0).unwrap();

    let order: Vec<String> = engine
        .calculation_order()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(order, ["A1", "B1", "C1", "D1"]);
}

/// Deep nesting fails only its own cell; long operator runs still compute
#[test]
fn test_deeply_nested_formula_fails_alone() {
    let mut engine = CalculationEngine::new();
    engine.define_input("S!A1", 1.0).unwrap();
    let nested = format!("={}1{}", "(".repeat(300), ")".repeat(300));
    engine.define_formula("S!B1", nested).unwrap();
    engine
        .define_formula("S!B2", format!("=1{}", "+A1".repeat(5000)))
        .unwrap();
    engine.define_formula("S!B3", "=A1+1").unwrap();
    engine.define_formula("S!B4", "=B1+B3").unwrap();

    let recalc = engine.recalculate_all();
    assert!(matches!(recalc.get("S!B1"), Some(Err(FormulaError::Parse(_)))));
    assert_eq!(recalc.value("S!B2"), Some(number(5001.0)));
    assert_eq!(recalc.value("S!B3"), Some(number(2.0)));
    assert_eq!(recalc.value("S!B4"), Some(number(2.0)));
    assert_eq!(recalc.stats.errors, 1);

    engine.write("S!A1", 2.0).unwrap();
    assert_eq!(engine.read("S!B2"), number(10_001.0));
    assert_eq!(engine.read("S!B1"), CellValue::Empty);
    assert!(engine.error("S!B1").map_or(false, FormulaError::is_syntax));
}

/// Redefining a cell drops the cached order
#[test]
fn test_redefinition_reorders() {
    let mut engine = CalculationEngine::new();
    engine.define_formula("B1", "=C1+1").unwrap();
    engine.define_constant("C1", 1.0).unwrap();
    engine.define_formula("A1", "=2").unwrap();

    let order: Vec<String> = engine
        .calculation_order()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(order, ["C1", "B1", "A1"]);

    // C1 now reads A1, which must come first
    engine.define_formula("C1", "=A1*5").unwrap();
    let order: Vec<String> = engine
        .calculation_order()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(order, ["A1", "C1", "B1"]);

    let recalc = engine.recalculate_all();
    assert_eq!(recalc.stats.cells_calculated, 3);
    assert_eq!(recalc.value("A1"), Some(number(2.0)));
    assert_eq!(recalc.value("C1"), Some(number(10.0)));
    assert_eq!(recalc.value("B1"), Some(number(11.0)));
}
