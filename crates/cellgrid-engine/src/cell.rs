use std::collections::BTreeSet;

use cellgrid_model::{CellRef, CellValue, ErrorValue};

use crate::formula::{Formula, ValueResolver};
use crate::parser::FormulaParseError;

/// First character of a formula cell's text.
pub const FORMULA_SIGN: char = '=';

/// Escape character: a leading `'` makes the rest of the text literal.
pub const ESCAPE_SIGN: char = '\'';

type EvalOutcome = Result<f64, ErrorValue>;

/// What a piece of input text means for a cell.
///
/// Input starting with `=` and at least two characters long is a formula
/// (with the `='`-escape quirk: one escape character after `=` is consumed
/// before parsing); everything else, including a lone `=`, is plain text
/// stored verbatim. Formula text is normalized to `"=" + canonical form`.
#[derive(Debug, Clone)]
pub(crate) enum CellContent {
    Text(String),
    Formula { text: String, formula: Formula },
}

impl CellContent {
    pub(crate) fn parse(input: &str) -> Result<Self, FormulaParseError> {
        if let Some(body) = input.strip_prefix(FORMULA_SIGN) {
            if !body.is_empty() {
                let body = body.strip_prefix(ESCAPE_SIGN).unwrap_or(body);
                let formula = Formula::parse(body)?;
                let text = format!("{FORMULA_SIGN}{}", formula.expression());
                return Ok(CellContent::Formula { text, formula });
            }
        }
        Ok(CellContent::Text(input.to_string()))
    }

    pub(crate) fn referenced_cells(&self) -> &[CellRef] {
        match self {
            CellContent::Text(_) => &[],
            CellContent::Formula { formula, .. } => formula.referenced_cells(),
        }
    }
}

/// A single grid entry.
///
/// Holds the stored text, the parsed formula when the text is one, a
/// memoized evaluation outcome, and the two adjacency sets of the dependency
/// graph. Edges are positions into the owning sheet's cell map, so removal
/// cannot leave a dangling edge. The memo is interior-mutable `Copy` state:
/// reads fill it under shared borrows.
#[derive(Debug, Default)]
pub struct Cell {
    text: String,
    formula: Option<Formula>,
    cache: std::cell::Cell<Option<EvalOutcome>>,
    pub(crate) predecessors: BTreeSet<CellRef>,
    pub(crate) successors: BTreeSet<CellRef>,
}

impl Cell {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    /// Replace this cell's content, keeping its successors.
    ///
    /// Predecessors are cleared; the sheet rewires them from the new
    /// formula's referenced cells.
    pub(crate) fn set_content(&mut self, content: CellContent) {
        match content {
            CellContent::Text(text) => {
                self.text = text;
                self.formula = None;
            }
            CellContent::Formula { text, formula } => {
                self.text = text;
                self.formula = Some(formula);
            }
        }
        self.cache.set(None);
        self.predecessors.clear();
    }

    /// Reset to the empty state, keeping successors (the cell stays
    /// materialized for the formulas that reference it).
    pub(crate) fn reset_to_empty(&mut self) {
        self.text.clear();
        self.formula = None;
        self.cache.set(None);
        self.predecessors.clear();
    }

    /// Clear the memoized outcome. Returns whether one was present, which is
    /// what lets invalidation prune below already-clean cells.
    pub(crate) fn invalidate(&self) -> bool {
        self.cache.take().is_some()
    }

    /// The stored text, verbatim: formula cells read `"=" + canonical
    /// expression`, text cells include their escape sign if any.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns true if the cell holds a formula.
    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Returns true if the cell holds neither text nor a formula.
    ///
    /// Empty cells still exist in the sheet when some formula references
    /// them.
    pub fn is_empty(&self) -> bool {
        self.formula.is_none() && self.text.is_empty()
    }

    /// The cell's value.
    ///
    /// Text cells return their text minus one leading escape sign. Formula
    /// cells return the memoized outcome when present, otherwise they
    /// evaluate through `resolver`, memoize the outcome (numbers and errors
    /// alike), and return it.
    pub fn value<R: ValueResolver>(&self, resolver: &R) -> CellValue {
        match &self.formula {
            Some(formula) => {
                let outcome = match self.cache.get() {
                    Some(outcome) => outcome,
                    None => {
                        let outcome = formula.evaluate(resolver);
                        self.cache.set(Some(outcome));
                        outcome
                    }
                };
                match outcome {
                    Ok(n) => CellValue::Number(n),
                    Err(e) => CellValue::Error(e),
                }
            }
            None => {
                let text = self.text.strip_prefix(ESCAPE_SIGN).unwrap_or(&self.text);
                CellValue::String(text.to_string())
            }
        }
    }

    /// The cells this cell's formula references, deduplicated and sorted
    /// row-major. Empty for text and empty cells.
    pub fn referenced_cells(&self) -> &[CellRef] {
        self.formula
            .as_ref()
            .map(Formula::referenced_cells)
            .unwrap_or(&[])
    }

    /// The memoized evaluation outcome, if any. Exposed for auditing and
    /// cache-soundness assertions.
    pub fn cached_value(&self) -> Option<Result<f64, ErrorValue>> {
        self.cache.get()
    }
}
