use thiserror::Error;

use cellgrid_model::CellRef;

use crate::graph::CycleError;
use crate::parser::FormulaParseError;

/// Errors a sheet mutation can fail with.
///
/// Every failing call leaves the sheet exactly as it was: the strong
/// exception guarantee of the mutation protocol.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SheetError {
    #[error("cell {0} is outside the sheet bounds")]
    OutOfBounds(CellRef),
    #[error(transparent)]
    Parse(#[from] FormulaParseError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
}
