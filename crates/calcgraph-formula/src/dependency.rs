//! Dependency tracking for formula calculation

use crate::tokenizer::{Token, Tokenizer};
use calcgraph_core::CellAddress;
use ahash::{AHashMap, AHashSet};

/// Dense handle for a cell known to the graph
///
/// Handles are handed out by whoever owns the address table; the graph only
/// uses them as indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u32);

impl CellId {
    /// Create a handle from a table index
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Index into per-cell tables
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for CellId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<CellId> for u32 {
    fn from(id: CellId) -> Self {
        id.0
    }
}

/// Result of ordering a set of cells for evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationOrder {
    /// Cells in evaluation order: every cell after the cells it reads
    pub cells: Vec<CellId>,
    /// Edges closing a cycle; these were ignored to produce the order
    pub dropped_edges: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Dependency graph for formula cells
///
/// Stores both directions of every edge so that invalidation can walk from
/// a cell to its readers without scanning all formulas.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell → cells it reads, in first-appearance order
    precedents: Vec<Vec<CellId>>,
    /// Cell → cells that read it
    dependents: Vec<Vec<CellId>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells the graph has slots for
    pub fn node_count(&self) -> usize {
        self.precedents.len()
    }

    /// Make sure `cell` has a slot
    pub fn ensure_node(&mut self, cell: CellId) {
        let needed = cell.index() + 1;
        if self.precedents.len() < needed {
            self.precedents.resize_with(needed, Vec::new);
            self.dependents.resize_with(needed, Vec::new);
        }
    }

    /// Replace the cells `cell` reads
    ///
    /// Old edges are removed from the reverse index before the new ones are
    /// added. Duplicates in `precedents` are dropped, keeping the first.
    pub fn set_precedents(&mut self, cell: CellId, precedents: Vec<CellId>) {
        self.ensure_node(cell);

        // Remove from the old precedents' dependents lists
        let old = std::mem::take(&mut self.precedents[cell.index()]);
        for precedent in old {
            self.dependents[precedent.index()].retain(|&d| d != cell);
        }

        let mut seen = AHashSet::with_capacity(precedents.len());
        let mut unique = Vec::with_capacity(precedents.len());
        for precedent in precedents {
            if seen.insert(precedent) {
                self.ensure_node(precedent);
                self.dependents[precedent.index()].push(cell);
                unique.push(precedent);
            }
        }
        self.precedents[cell.index()] = unique;
    }

    /// Remove every edge out of `cell`
    pub fn clear_precedents(&mut self, cell: CellId) {
        self.set_precedents(cell, Vec::new());
    }

    /// Cells that `cell` reads
    pub fn precedents(&self, cell: CellId) -> &[CellId] {
        self.precedents
            .get(cell.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cells that read `cell` directly
    pub fn dependents(&self, cell: CellId) -> &[CellId] {
        self.dependents
            .get(cell.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every cell that reads `root`, directly or through other cells
    ///
    /// `root` itself is only included when it sits on a cycle. Each cell is
    /// visited once, so cycles terminate. Work is proportional to the size of
    /// the result, not of the graph.
    pub fn collect_dependents(&self, root: CellId) -> Vec<CellId> {
        let mut visited = AHashSet::new();
        let mut result = Vec::new();
        let mut worklist: Vec<CellId> = self.dependents(root).to_vec();

        while let Some(cell) = worklist.pop() {
            if !visited.insert(cell) {
                continue;
            }
            result.push(cell);
            worklist.extend(
                self.dependents(cell)
                    .iter()
                    .filter(|d| !visited.contains(*d)),
            );
        }

        result
    }

    /// Check if a cell reads itself through some chain of references
    pub fn has_circular_reference(&self, cell: CellId) -> bool {
        self.collect_dependents(cell).contains(&cell)
    }

    /// Order `roots` and everything they transitively read for evaluation
    ///
    /// Only cells accepted by `include` are visited; the rest are treated as
    /// already available. Roots are visited in the order given and
    /// precedents in first-appearance order, so the result is deterministic.
    /// An edge that leads back to a cell still being visited closes a cycle;
    /// it is skipped and counted in [`CalculationOrder::dropped_edges`].
    /// Only visited cells are tracked, so ordering a small closure is cheap
    /// in a large graph.
    pub fn calculation_order<I, F>(&self, roots: I, include: F) -> CalculationOrder
    where
        I: IntoIterator<Item = CellId>,
        F: Fn(CellId) -> bool,
    {
        let mut state: AHashMap<CellId, VisitState> = AHashMap::new();
        let mut order = CalculationOrder::default();
        let mut stack: Vec<(CellId, usize)> = Vec::new();

        for root in roots {
            if root.index() >= self.node_count() || state.contains_key(&root) || !include(root) {
                continue;
            }

            state.insert(root, VisitState::InProgress);
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let cell = frame.0;
                let next = self.precedents(cell).get(frame.1).copied();
                frame.1 += 1;

                match next {
                    Some(precedent) => {
                        if !include(precedent) {
                            continue;
                        }
                        match state.get(&precedent) {
                            None => {
                                state.insert(precedent, VisitState::InProgress);
                                stack.push((precedent, 0));
                            }
                            Some(VisitState::InProgress) => order.dropped_edges += 1,
                            Some(VisitState::Done) => {}
                        }
                    }
                    None => {
                        stack.pop();
                        state.insert(cell, VisitState::Done);
                        order.cells.push(cell);
                    }
                }
            }
        }

        order
    }
}

/// Addresses a formula reads, resolved against the sheet of `owner`
///
/// Quoted (`'Sheet'!A1`), unquoted (`Sheet!A1`) and bare (`A1`) references
/// are recognized; bare ones are placed on the owner's sheet. Each address
/// appears once, in order of first appearance. Malformed formulas still
/// yield whatever well-formed references they contain.
///
/// # Examples
/// ```
/// use calcgraph_core::CellAddress;
/// use calcgraph_formula::extract_dependencies;
///
/// let owner = CellAddress::new("Blend!C1").unwrap();
/// let deps = extract_dependencies("='Crude'!A1 * A2 + A2", &owner);
/// assert_eq!(deps, ["Crude!A1", "Blend!A2"]);
/// ```
pub fn extract_dependencies(formula: &str, owner: &CellAddress) -> Vec<CellAddress> {
    let body = formula.strip_prefix('=').unwrap_or(formula);
    let sheet = owner.sheet();

    let mut seen = AHashSet::new();
    let mut addresses = Vec::new();
    for token in Tokenizer::new(body) {
        if let Token::Reference(reference) = token {
            let address = reference.resolve(sheet);
            if seen.insert(address.clone()) {
                addresses.push(address);
            }
        }
    }
    addresses
}
