use std::collections::{BTreeMap, HashMap};
use std::io;

use cellgrid_model::{CellRef, CellValue};

use crate::cell::{Cell, CellContent};
use crate::error::SheetError;
use crate::formula::ValueResolver;
use crate::graph::{self, CycleError, GraphStats};

/// Dimensions of the printable rectangle. The origin is always `(0, 0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub rows: u32,
    pub cols: u32,
}

/// A single sheet of cells with a live dependency graph.
///
/// The sheet owns every cell, keyed by position; dependency edges are
/// position sets inside the cells, so edge symmetry and liveness are plain
/// map invariants. Absent positions consume no memory; a position referenced
/// by a formula is materialized as an empty cell so dependents can attach
/// edges to it.
///
/// Every mutating call provides the strong exception guarantee: it either
/// succeeds with all invariants restored, or fails leaving the sheet exactly
/// as it was. Parsing and cycle detection run before the first write, so
/// there is no rollback path.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: HashMap<CellRef, Cell>,
    /// Occupied-position counts per row/column; the printable size is the
    /// largest key of each plus one.
    row_cells: BTreeMap<u32, u32>,
    col_cells: BTreeMap<u32, u32>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `input` to `pos`, replacing whatever the cell held.
    ///
    /// Text starting with `=` (and at least two characters long) is parsed
    /// as a formula and stored in canonical form; everything else is stored
    /// verbatim. On success the dependency edges are rewired and every
    /// memoized value downstream of `pos` is invalidated.
    pub fn set_cell(&mut self, pos: CellRef, input: &str) -> Result<(), SheetError> {
        if !pos.is_in_bounds() {
            return Err(SheetError::OutOfBounds(pos));
        }

        // Parse before touching the sheet: a malformed formula changes
        // nothing.
        let content = CellContent::parse(input)?;
        let references: Vec<CellRef> = content.referenced_cells().to_vec();

        // The cycle check runs on the pre-commit graph. Stale edges into
        // `pos` cannot influence it: the search only follows edges out of
        // cells reachable from `pos`.
        if let Some(path) = graph::find_cycle(&self.cells, pos, &references) {
            log::debug!("rejected write to {pos}: would close a dependency cycle");
            return Err(CycleError { path }.into());
        }

        // Commit. Nothing below can fail.
        self.materialize(pos);

        let stale: Vec<CellRef> = {
            let cell = self.cells.get_mut(&pos).expect("cell was just materialized");
            let stale = cell.predecessors.iter().copied().collect();
            cell.set_content(content);
            stale
        };
        for prev in stale {
            if let Some(cell) = self.cells.get_mut(&prev) {
                cell.successors.remove(&pos);
            }
        }

        for &reference in &references {
            self.materialize(reference);
            self.cells
                .get_mut(&reference)
                .expect("cell was just materialized")
                .successors
                .insert(pos);
        }
        self.cells
            .get_mut(&pos)
            .expect("cell was just materialized")
            .predecessors = references.into_iter().collect();

        // Invalidation strictly follows rewiring so freshly attached
        // dependents are covered.
        graph::invalidate_from(&self.cells, pos);
        Ok(())
    }

    /// Remove the cell at `pos`.
    ///
    /// A cell that other formulas still reference stays materialized as an
    /// empty cell (it reads as `0` in formulas, like any cell materialized
    /// on demand); a cell with no dependents is dropped entirely and stops
    /// occupying its row and column. Clearing an absent cell is a no-op.
    pub fn clear_cell(&mut self, pos: CellRef) -> Result<(), SheetError> {
        if !pos.is_in_bounds() {
            return Err(SheetError::OutOfBounds(pos));
        }
        let Some(cell) = self.cells.get(&pos) else {
            return Ok(());
        };

        let stale: Vec<CellRef> = cell.predecessors.iter().copied().collect();
        for prev in stale {
            if let Some(cell) = self.cells.get_mut(&prev) {
                cell.successors.remove(&pos);
            }
        }

        // Downstream memos go stale the moment this cell reads as empty.
        graph::invalidate_from(&self.cells, pos);

        let keep = !self
            .cells
            .get(&pos)
            .expect("cell is still present")
            .successors
            .is_empty();
        if keep {
            self.cells
                .get_mut(&pos)
                .expect("cell is still present")
                .reset_to_empty();
        } else {
            self.cells.remove(&pos);
            self.forget(pos);
        }
        Ok(())
    }

    /// The cell at `pos`, or `None` when the position is unoccupied.
    pub fn cell(&self, pos: CellRef) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    /// The value at `pos`, or `None` when the position is unoccupied.
    ///
    /// O(1) on a memo hit; otherwise evaluates the formula, reading upstream
    /// cells through the graph.
    pub fn value(&self, pos: CellRef) -> Option<CellValue> {
        self.cells.get(&pos).map(|cell| cell.value(self))
    }

    /// Number of occupied positions, materialized empty cells included.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The minimal rectangle `[0, rows) x [0, cols)` covering every occupied
    /// position, or `{0, 0}` for an empty sheet.
    pub fn printable_size(&self) -> Size {
        match (
            self.row_cells.last_key_value(),
            self.col_cells.last_key_value(),
        ) {
            (Some((&max_row, _)), Some((&max_col, _))) => Size {
                rows: max_row + 1,
                cols: max_col + 1,
            },
            _ => Size::default(),
        }
    }

    /// Render cell values over the printable rectangle: tab between
    /// columns, LF after each row, unoccupied positions blank.
    pub fn print_values<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |sheet, pos, out| match sheet.value(pos) {
            Some(value) => write!(out, "{value}"),
            None => Ok(()),
        })
    }

    /// Render cell texts over the printable rectangle, verbatim.
    pub fn print_texts<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |sheet, pos, out| match sheet.cell(pos) {
            Some(cell) => out.write_all(cell.text().as_bytes()),
            None => Ok(()),
        })
    }

    /// The cells `pos` reads, sorted row-major. Empty for non-formula cells.
    pub fn precedents_of(&self, pos: CellRef) -> Vec<CellRef> {
        self.cells
            .get(&pos)
            .map(|cell| cell.predecessors.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The cells whose formulas read `pos`, sorted row-major.
    pub fn dependents_of(&self, pos: CellRef) -> Vec<CellRef> {
        self.cells
            .get(&pos)
            .map(|cell| cell.successors.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Counts useful for asserting the graph representation in tests.
    pub fn stats(&self) -> GraphStats {
        graph::stats(&self.cells)
    }

    fn print_with<W, F>(&self, out: &mut W, render: F) -> io::Result<()>
    where
        W: io::Write,
        F: Fn(&Self, CellRef, &mut W) -> io::Result<()>,
    {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                render(self, CellRef::new(row, col), out)?;
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Ensure a cell exists at `pos`, counting it toward the printable zone.
    fn materialize(&mut self, pos: CellRef) {
        if self.cells.contains_key(&pos) {
            return;
        }
        self.cells.insert(pos, Cell::empty());
        *self.row_cells.entry(pos.row).or_insert(0) += 1;
        *self.col_cells.entry(pos.col).or_insert(0) += 1;
        log::trace!("materialized empty cell at {pos}");
    }

    fn forget(&mut self, pos: CellRef) {
        if let Some(count) = self.row_cells.get_mut(&pos.row) {
            *count -= 1;
            if *count == 0 {
                self.row_cells.remove(&pos.row);
            }
        }
        if let Some(count) = self.col_cells.get_mut(&pos.col) {
            *count -= 1;
            if *count == 0 {
                self.col_cells.remove(&pos.col);
            }
        }
    }
}

impl ValueResolver for Sheet {
    fn cell_value(&self, cell: CellRef) -> Option<CellValue> {
        self.cells.get(&cell).map(|cell| cell.value(self))
    }
}
