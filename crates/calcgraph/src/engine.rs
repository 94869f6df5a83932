//! Calculation engine
//!
//! Holds the cells, the dependency graph between them and the function
//! registry, and keeps formula values up to date.
//!
//! Values are memoized: a formula cell is evaluated when it is read while
//! stale, or by [`CalculationEngine::recalculate_all`]. Writing an input
//! marks every cell that transitively reads it stale.
//!
//! # Example
//!
//! ```rust
//! use calcgraph::prelude::*;
//!
//! let mut engine = CalculationEngine::new();
//! engine.define_constant("S!A1", 2.0).unwrap();
//! engine.define_formula("S!B1", "=A1*3").unwrap();
//! engine.define_formula("S!C1", "=B1+1").unwrap();
//!
//! assert_eq!(engine.read("S!C1"), CellValue::Number(7.0));
//!
//! engine.write("S!A1", 10.0).unwrap();
//! assert!(!engine.is_fresh("S!C1"));
//! assert_eq!(engine.read("S!C1"), CellValue::Number(31.0));
//! ```

use crate::store::{Cell, CellStore, Formula};
use calcgraph_core::{CellAddress, CellKind, CellValue, Error, Result};
use calcgraph_formula::{
    evaluate, extract_dependencies, parse_formula, CalculationOrder, CellId, DependencyGraph,
    EvaluationContext, FormulaError, FormulaResult, FunctionRegistry,
};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// Options for calculation
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    /// Re-evaluate every formula cell in `recalculate_all`, even fresh ones
    pub force_full_calculation: bool,
    /// Log formula errors at `warn` level as they occur
    pub log_formula_errors: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            force_full_calculation: false,
            log_formula_errors: true,
        }
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells
    pub formula_count: usize,
    /// Number of cells calculated
    pub cells_calculated: usize,
    /// Number of circular references detected (edges ignored for ordering)
    pub circular_references: usize,
    /// Number of formula cells whose value is an error
    pub errors: usize,
}

/// What to store in a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    /// Fixed value
    Constant(CellValue),
    /// User-supplied value
    Input(CellValue),
    /// Formula text, starting with `=`
    Formula(String),
}

impl CellContent {
    /// The kind of cell this content creates
    pub fn kind(&self) -> CellKind {
        match self {
            CellContent::Constant(_) => CellKind::Constant,
            CellContent::Input(_) => CellKind::Input,
            CellContent::Formula(_) => CellKind::Formula,
        }
    }
}

/// Outcome of [`CalculationEngine::recalculate_all`]
#[derive(Debug, Clone, Default)]
pub struct Recalculation {
    /// Value or error of every formula cell
    pub results: BTreeMap<CellAddress, FormulaResult<CellValue>>,
    /// Run statistics
    pub stats: CalculationStats,
}

impl Recalculation {
    /// Result for one formula cell
    pub fn get(&self, address: &str) -> Option<&FormulaResult<CellValue>> {
        self.results.get(address)
    }

    /// Value of a formula cell, if it evaluated without error
    pub fn value(&self, address: &str) -> Option<CellValue> {
        match self.results.get(address) {
            Some(Ok(value)) => Some(*value),
            _ => None,
        }
    }

    /// Cells whose evaluation failed
    pub fn errors(&self) -> impl Iterator<Item = (&CellAddress, &FormulaError)> + '_ {
        self.results
            .iter()
            .filter_map(|(address, result)| result.as_ref().err().map(|e| (address, e)))
    }

    /// Whether every formula cell evaluated
    pub fn is_ok(&self) -> bool {
        self.stats.errors == 0
    }
}

/// The calculation engine
///
/// Single-threaded; callers that share one across threads wrap it in a
/// `Mutex`.
#[derive(Debug)]
pub struct CalculationEngine {
    options: CalculationOptions,
    store: CellStore,
    /// Edges from formula cells to the cells they read
    dependency_graph: DependencyGraph,
    functions: FunctionRegistry,
    /// Order over all defined cells, dropped on every `define`
    full_order: Option<CalculationOrder>,
}

impl CalculationEngine {
    /// Create an empty engine with default options
    pub fn new() -> Self {
        Self::with_options(CalculationOptions::default())
    }

    /// Create an empty engine with custom options
    pub fn with_options(options: CalculationOptions) -> Self {
        Self {
            options,
            store: CellStore::new(),
            dependency_graph: DependencyGraph::new(),
            functions: FunctionRegistry::new(),
            full_order: None,
        }
    }

    // === Definition ===

    /// Create or replace the cell at `address`
    ///
    /// Formula cells start stale; their references are extracted and their
    /// text parsed now, so a syntax error surfaces when the cell is
    /// evaluated. Every cell that transitively reads `address` becomes stale.
    pub fn define<A: AsRef<str>>(&mut self, address: A, content: CellContent) -> Result<()> {
        let address = CellAddress::new(address.as_ref())?;
        let kind = content.kind();

        let (cell, precedents) = match content {
            CellContent::Constant(value) | CellContent::Input(value) => {
                (Cell::with_value(address.clone(), kind, value), Vec::new())
            }
            CellContent::Formula(text) => {
                if text.trim().is_empty() {
                    return Err(Error::EmptyFormula(address.to_string()));
                }
                let dependencies = extract_dependencies(&text, &address);
                let precedents: Vec<CellId> = dependencies
                    .iter()
                    .map(|dep| self.store.intern(dep))
                    .collect();
                let ast = parse_formula(&text);
                let formula = Formula { text, ast };
                (
                    Cell::with_formula(address.clone(), formula, dependencies),
                    precedents,
                )
            }
        };

        debug!(cell = %address, %kind, dependencies = precedents.len(), "define");

        let id = self.store.intern(&address);
        self.dependency_graph.ensure_node(id);
        self.dependency_graph.set_precedents(id, precedents);
        self.store.insert(id, cell);
        self.full_order = None;

        self.invalidate(id);
        Ok(())
    }

    /// Define a constant cell
    pub fn define_constant<A: AsRef<str>>(
        &mut self,
        address: A,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        self.define(address, CellContent::Constant(value.into()))
    }

    /// Define an input cell
    pub fn define_input<A: AsRef<str>>(
        &mut self,
        address: A,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        self.define(address, CellContent::Input(value.into()))
    }

    /// Define a formula cell
    pub fn define_formula<A: AsRef<str>>(
        &mut self,
        address: A,
        formula: impl Into<String>,
    ) -> Result<()> {
        self.define(address, CellContent::Formula(formula.into()))
    }

    // === Mutation ===

    /// Set the value of an input or constant cell
    ///
    /// An unknown address becomes a new input cell. Formula cells cannot be
    /// written and are left untouched.
    pub fn write<A: AsRef<str>>(&mut self, address: A, value: impl Into<CellValue>) -> Result<()> {
        let address = address.as_ref();
        let value = value.into();

        let id = match self.store.id(address) {
            Some(id) if self.store.is_defined(id) => id,
            _ => return self.define(address, CellContent::Input(value)),
        };

        if let Some(cell) = self.store.get_mut(id) {
            if !cell.kind.is_writable() {
                return Err(Error::InvalidKind {
                    address: address.to_string(),
                    kind: cell.kind,
                });
            }
            cell.value = value;
            cell.is_fresh = true;
        }

        debug!(cell = address, %value, "write");
        self.invalidate(id);
        Ok(())
    }

    /// Mark every cell that transitively reads `id` stale
    fn invalidate(&mut self, id: CellId) {
        let dependents = self.dependency_graph.collect_dependents(id);
        let mut marked = 0;
        for dependent in dependents {
            if let Some(cell) = self.store.get_mut(dependent) {
                if cell.is_formula() && cell.is_fresh {
                    cell.is_fresh = false;
                    marked += 1;
                }
            }
        }
        if marked > 0 {
            trace!(
                cell = self.store.address(id).map(CellAddress::as_str),
                marked,
                "invalidate"
            );
        }
    }

    // === Reading ===

    /// Current value of the cell at `address`
    ///
    /// A stale formula cell is evaluated first, after any stale cells it
    /// reads. Unknown addresses read as [`CellValue::Empty`]. A formula
    /// whose evaluation failed reads as empty; see [`Self::error`].
    pub fn read<A: AsRef<str>>(&mut self, address: A) -> CellValue {
        let id = match self.store.id(address.as_ref()) {
            Some(id) => id,
            None => return CellValue::Empty,
        };

        if self.store.is_stale_formula(id) {
            self.evaluate_stale_closure(id);
        }

        self.store
            .get(id)
            .map_or(CellValue::Empty, |cell| cell.value)
    }

    /// Stale formula cells `root` needs, in evaluation order, ending with
    /// `root` itself
    fn stale_closure(&self, root: CellId) -> CalculationOrder {
        self.dependency_graph
            .calculation_order([root], |id| self.store.is_stale_formula(id))
    }

    fn evaluate_stale_closure(&mut self, root: CellId) {
        let order = self.stale_closure(root);
        if order.dropped_edges > 0 {
            warn!(
                cell = self.store.address(root).map(CellAddress::as_str),
                circular_references = order.dropped_edges,
                "circular reference ignored"
            );
        }
        for id in order.cells {
            self.evaluate_cell(id);
        }
    }

    // === Recalculation ===

    /// Evaluate every stale formula cell (every formula cell with
    /// [`CalculationOptions::force_full_calculation`]) in dependency order
    ///
    /// Formula errors do not stop the run; they are returned per cell.
    pub fn recalculate_all(&mut self) -> Recalculation {
        let order = self.full_order();
        let mut stats = CalculationStats {
            circular_references: order.dropped_edges,
            ..Default::default()
        };

        if order.dropped_edges > 0 {
            warn!(
                circular_references = order.dropped_edges,
                "circular references ignored"
            );
        }

        for &id in &order.cells {
            let due = match self.store.get(id) {
                Some(cell) if cell.is_formula() => {
                    stats.formula_count += 1;
                    self.options.force_full_calculation || !cell.is_fresh
                }
                _ => false,
            };
            if due {
                self.evaluate_cell(id);
                stats.cells_calculated += 1;
            }
        }

        let mut results = BTreeMap::new();
        for cell in self.store.cells().filter(|cell| cell.is_formula()) {
            let result = match &cell.error {
                Some(error) => Err(error.clone()),
                None => Ok(cell.value),
            };
            results.insert(cell.address.clone(), result);
        }
        stats.errors = results.values().filter(|r| r.is_err()).count();

        debug!(
            formulas = stats.formula_count,
            calculated = stats.cells_calculated,
            errors = stats.errors,
            "recalculate_all"
        );

        self.full_order = Some(order);
        Recalculation { results, stats }
    }

    /// Every defined cell in evaluation order: each cell after the defined
    /// cells it reads, apart from edges that close a cycle
    pub fn calculation_order(&mut self) -> Vec<CellAddress> {
        let order = self.full_order();
        let addresses = order
            .cells
            .iter()
            .filter_map(|&id| self.store.address(id).cloned())
            .collect();
        self.full_order = Some(order);
        addresses
    }

    /// Cached order over all defined cells, computed if missing
    ///
    /// Callers put it back into `self.full_order` when done.
    fn full_order(&mut self) -> CalculationOrder {
        match self.full_order.take() {
            Some(order) => order,
            None => self.dependency_graph.calculation_order(
                self.store.defined_ids().iter().copied(),
                |id| self.store.is_defined(id),
            ),
        }
    }

    /// Evaluate one formula cell from the current values of its precedents
    fn evaluate_cell(&mut self, id: CellId) {
        let result = match self.store.get(id) {
            Some(Cell {
                address,
                formula: Some(formula),
                ..
            }) => match &formula.ast {
                Ok(ast) => {
                    let ctx =
                        EvaluationContext::new(&self.store, address.sheet(), &self.functions);
                    evaluate(ast, &ctx)
                }
                Err(error) => Err(error.clone()),
            },
            _ => return,
        };

        let log_errors = self.options.log_formula_errors;
        if let Some(cell) = self.store.get_mut(id) {
            match result {
                Ok(value) => {
                    trace!(cell = %cell.address, %value, "evaluate");
                    cell.value = value;
                    cell.error = None;
                }
                Err(error) => {
                    if log_errors {
                        warn!(cell = %cell.address, %error, "formula error");
                    }
                    cell.value = CellValue::Empty;
                    cell.error = Some(error);
                }
            }
            cell.is_fresh = true;
        }
    }

    // === Introspection ===

    /// The cell at `address`, if defined
    pub fn cell(&self, address: &str) -> Option<&Cell> {
        self.store.lookup(address)
    }

    /// Whether a cell is defined at `address`
    pub fn contains(&self, address: &str) -> bool {
        self.cell(address).is_some()
    }

    /// Number of defined cells
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no cell is defined
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of the cell at `address`
    pub fn kind(&self, address: &str) -> Option<CellKind> {
        self.cell(address).map(Cell::kind)
    }

    /// Formula text of the cell at `address`
    pub fn formula_text(&self, address: &str) -> Option<&str> {
        self.cell(address).and_then(Cell::formula_text)
    }

    /// Whether the cell at `address` is defined and up to date
    pub fn is_fresh(&self, address: &str) -> bool {
        self.cell(address).map_or(false, Cell::is_fresh)
    }

    /// Addresses the formula at `address` reads
    pub fn dependencies(&self, address: &str) -> &[CellAddress] {
        self.cell(address).map(Cell::dependencies).unwrap_or(&[])
    }

    /// Formula cells that read `address` directly
    pub fn dependents(&self, address: &str) -> Vec<CellAddress> {
        match self.store.id(address) {
            Some(id) => self
                .dependency_graph
                .dependents(id)
                .iter()
                .filter_map(|&dep| self.store.address(dep).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Error from the last evaluation of the formula at `address`
    pub fn error(&self, address: &str) -> Option<&FormulaError> {
        self.cell(address).and_then(Cell::error)
    }

    /// Defined addresses, in order of first definition
    pub fn addresses(&self) -> impl Iterator<Item = &CellAddress> + '_ {
        self.store.cells().map(Cell::address)
    }
}

impl Default for CalculationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_calculation() {
        let mut engine = CalculationEngine::new();
        engine.define_constant("A1", 10.0).unwrap();
        engine.define_constant("A2", 20.0).unwrap();
        engine.define_formula("A3", "=A1+A2").unwrap();

        let recalc = engine.recalculate_all();
        assert_eq!(recalc.stats.formula_count, 1);
        assert_eq!(recalc.stats.cells_calculated, 1);
        assert_eq!(recalc.value("A3"), Some(CellValue::Number(30.0)));
    }

    #[test]
    fn test_chain_calculation() {
        let mut engine = CalculationEngine::new();
        engine.define_formula("C1", "=B1*2").unwrap();
        engine.define_formula("B1", "=A1+1").unwrap();
        engine.define_input("A1", 5.0).unwrap();

        let recalc = engine.recalculate_all();
        assert_eq!(recalc.value("B1"), Some(CellValue::Number(6.0)));
        assert_eq!(recalc.value("C1"), Some(CellValue::Number(12.0)));
        assert_eq!(
            engine.calculation_order(),
            vec![
                CellAddress::new("A1").unwrap(),
                CellAddress::new("B1").unwrap(),
                CellAddress::new("C1").unwrap(),
            ]
        );
    }

    #[test]
    fn test_second_recalculation_skips_fresh_cells() {
        let mut engine = CalculationEngine::new();
        engine.define_input("A1", 1.0).unwrap();
        engine.define_formula("B1", "=A1+1").unwrap();
        engine.define_formula("C1", "=5").unwrap();

        assert_eq!(engine.recalculate_all().stats.cells_calculated, 2);
        assert_eq!(engine.recalculate_all().stats.cells_calculated, 0);

        engine.write("A1", 2.0).unwrap();
        let recalc = engine.recalculate_all();
        assert_eq!(recalc.stats.cells_calculated, 1);
        assert_eq!(recalc.value("B1"), Some(CellValue::Number(3.0)));
    }

    #[test]
    fn test_force_full_calculation() {
        let mut engine = CalculationEngine::with_options(CalculationOptions {
            force_full_calculation: true,
            ..Default::default()
        });
        engine.define_formula("A1", "=1").unwrap();
        engine.define_formula("A2", "=A1+1").unwrap();

        engine.recalculate_all();
        assert_eq!(engine.recalculate_all().stats.cells_calculated, 2);
    }

    #[test]
    fn test_circular_reference_detection() {
        let mut engine = CalculationEngine::new();
        engine.define_formula("A1", "=B1+1").unwrap();
        engine.define_formula("B1", "=A1+1").unwrap();

        let recalc = engine.recalculate_all();
        assert_eq!(recalc.stats.circular_references, 1);
        assert_eq!(recalc.stats.cells_calculated, 2);
        // B1 is evaluated first, reading A1 as zero
        assert_eq!(recalc.value("B1"), Some(CellValue::Number(1.0)));
        assert_eq!(recalc.value("A1"), Some(CellValue::Number(2.0)));
    }

    #[test]
    fn test_formula_cell_not_writable() {
        let mut engine = CalculationEngine::new();
        engine.define_formula("A1", "=1").unwrap();
        assert_eq!(
            engine.write("A1", 2.0),
            Err(Error::InvalidKind {
                address: "A1".into(),
                kind: CellKind::Formula,
            })
        );
        assert_eq!(engine.read("A1"), CellValue::Number(1.0));
    }

    #[test]
    fn test_write_unknown_creates_input() {
        let mut engine = CalculationEngine::new();
        engine.write("S!A1", true).unwrap();
        assert_eq!(engine.kind("S!A1"), Some(CellKind::Input));
        assert_eq!(engine.read("S!A1"), CellValue::Boolean(true));
    }

    #[test]
    fn test_define_rejects_empty_address_and_formula() {
        let mut engine = CalculationEngine::new();
        assert!(matches!(
            engine.define_constant("", 1.0),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            engine.define_formula("A1", "  "),
            Err(Error::EmptyFormula(_))
        ));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_introspection() {
        let mut engine = CalculationEngine::new();
        engine.define_constant("S!A1", 2.0).unwrap();
        engine.define_formula("S!B1", "=A1+Other!A1").unwrap();

        assert_eq!(engine.len(), 2);
        assert!(engine.contains("S!A1"));
        assert!(!engine.contains("Other!A1"));
        assert_eq!(engine.formula_text("S!B1"), Some("=A1+Other!A1"));
        assert_eq!(engine.formula_text("S!A1"), None);
        assert_eq!(engine.dependencies("S!B1"), ["S!A1", "Other!A1"]);
        assert_eq!(engine.dependents("S!A1"), ["S!B1"]);
        assert_eq!(engine.dependents("Other!A1"), ["S!B1"]);
        assert_eq!(
            engine.addresses().map(CellAddress::as_str).collect::<Vec<_>>(),
            ["S!A1", "S!B1"]
        );
    }
}
