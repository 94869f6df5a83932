//! Cell storage
//!
//! Addresses are interned to [`CellId`]s the first time they are seen, either
//! as a defined cell or as a reference inside a formula. Slots for addresses
//! that are referenced but never defined stay empty.

use ahash::AHashMap;
use calcgraph_core::{CellAddress, CellKind, CellValue};
use calcgraph_formula::{CellId, CellLookup, FormulaError, FormulaExpr, FormulaResult};

/// A defined cell
#[derive(Debug, Clone)]
pub struct Cell {
    pub(crate) address: CellAddress,
    pub(crate) kind: CellKind,
    pub(crate) value: CellValue,
    pub(crate) formula: Option<Formula>,
    pub(crate) dependencies: Vec<CellAddress>,
    pub(crate) is_fresh: bool,
    pub(crate) error: Option<FormulaError>,
}

/// Formula text with its parsed form
#[derive(Debug, Clone)]
pub(crate) struct Formula {
    pub(crate) text: String,
    pub(crate) ast: FormulaResult<FormulaExpr>,
}

impl Cell {
    pub(crate) fn with_value(address: CellAddress, kind: CellKind, value: CellValue) -> Self {
        Self {
            address,
            kind,
            value,
            formula: None,
            dependencies: Vec::new(),
            is_fresh: true,
            error: None,
        }
    }

    pub(crate) fn with_formula(
        address: CellAddress,
        formula: Formula,
        dependencies: Vec<CellAddress>,
    ) -> Self {
        Self {
            address,
            kind: CellKind::Formula,
            value: CellValue::Empty,
            formula: Some(formula),
            dependencies,
            is_fresh: false,
            error: None,
        }
    }

    /// The cell's address
    pub fn address(&self) -> &CellAddress {
        &self.address
    }

    /// How the cell obtains its value
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// Last stored value; for a stale formula cell this is out of date
    pub fn value(&self) -> CellValue {
        self.value
    }

    /// Formula text, for formula cells
    pub fn formula_text(&self) -> Option<&str> {
        self.formula.as_ref().map(|f| f.text.as_str())
    }

    /// Addresses the formula reads, resolved against this cell's sheet
    pub fn dependencies(&self) -> &[CellAddress] {
        &self.dependencies
    }

    /// Whether the stored value reflects the current inputs
    pub fn is_fresh(&self) -> bool {
        self.is_fresh
    }

    /// Error from the last evaluation, if it failed
    pub fn error(&self) -> Option<&FormulaError> {
        self.error.as_ref()
    }

    pub(crate) fn is_formula(&self) -> bool {
        self.kind == CellKind::Formula
    }
}

#[derive(Debug, Clone)]
struct Slot {
    address: CellAddress,
    cell: Option<Cell>,
}

/// Interned cell table
#[derive(Debug, Default, Clone)]
pub(crate) struct CellStore {
    slots: Vec<Slot>,
    index: AHashMap<CellAddress, CellId>,
    /// Defined cells, in order of first definition
    defined: Vec<CellId>,
}

impl CellStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Id for `address`, allocating an empty slot if it is new
    pub(crate) fn intern(&mut self, address: &CellAddress) -> CellId {
        if let Some(&id) = self.index.get(address) {
            return id;
        }
        let id = CellId::new(self.slots.len());
        self.slots.push(Slot {
            address: address.clone(),
            cell: None,
        });
        self.index.insert(address.clone(), id);
        id
    }

    pub(crate) fn id(&self, address: &str) -> Option<CellId> {
        self.index.get(address).copied()
    }

    pub(crate) fn address(&self, id: CellId) -> Option<&CellAddress> {
        self.slots.get(id.index()).map(|slot| &slot.address)
    }

    pub(crate) fn get(&self, id: CellId) -> Option<&Cell> {
        self.slots.get(id.index())?.cell.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.slots.get_mut(id.index())?.cell.as_mut()
    }

    pub(crate) fn lookup(&self, address: &str) -> Option<&Cell> {
        self.get(self.id(address)?)
    }

    /// Put `cell` in slot `id`, replacing any previous cell
    pub(crate) fn insert(&mut self, id: CellId, cell: Cell) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            if slot.cell.is_none() {
                self.defined.push(id);
            }
            slot.cell = Some(cell);
        }
    }

    pub(crate) fn is_defined(&self, id: CellId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn is_stale_formula(&self, id: CellId) -> bool {
        self.get(id)
            .map_or(false, |cell| cell.is_formula() && !cell.is_fresh)
    }

    /// Defined cells, in order of first definition
    pub(crate) fn defined_ids(&self) -> &[CellId] {
        &self.defined
    }

    pub(crate) fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.defined.iter().filter_map(|&id| self.get(id))
    }

    pub(crate) fn len(&self) -> usize {
        self.defined.len()
    }
}

impl CellLookup for CellStore {
    fn value(&self, address: &CellAddress) -> CellValue {
        self.lookup(address.as_str())
            .map_or(CellValue::Empty, |cell| cell.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> CellAddress {
        CellAddress::new(text).unwrap()
    }

    #[test]
    fn test_intern_is_stable() {
        let mut store = CellStore::new();
        let a = store.intern(&addr("S!A1"));
        let b = store.intern(&addr("S!B1"));
        assert_ne!(a, b);
        assert_eq!(store.intern(&addr("S!A1")), a);
        assert_eq!(store.id("S!B1"), Some(b));
        assert_eq!(store.id("S!C1"), None);
        assert_eq!(store.address(b), Some(&addr("S!B1")));
    }

    #[test]
    fn test_referenced_slot_is_undefined() {
        let mut store = CellStore::new();
        let id = store.intern(&addr("S!A1"));
        assert!(!store.is_defined(id));
        assert_eq!(store.len(), 0);
        assert_eq!(store.value(&addr("S!A1")), CellValue::Empty);
    }

    #[test]
    fn test_insert_keeps_definition_order() {
        let mut store = CellStore::new();
        let b = store.intern(&addr("B1"));
        let a = store.intern(&addr("A1"));

        store.insert(a, Cell::with_value(addr("A1"), CellKind::Input, 1.0.into()));
        store.insert(b, Cell::with_value(addr("B1"), CellKind::Constant, 2.0.into()));
        store.insert(a, Cell::with_value(addr("A1"), CellKind::Input, 3.0.into()));

        assert_eq!(store.defined_ids(), &[a, b]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.value(&addr("A1")), CellValue::Number(3.0));
    }
}
