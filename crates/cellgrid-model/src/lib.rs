#![forbid(unsafe_code)]

//! `cellgrid-model` defines the core in-memory data types of the cellgrid
//! spreadsheet engine.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the evaluation engine (dependency graph, formula evaluation)
//! - host layers (rendering, persistence) via `serde` (JSON-safe schema)

mod address;
mod error;
mod value;

pub use address::{col_to_name, A1ParseError, CellRef, MAX_COLS, MAX_ROWS};
pub use error::ErrorValue;
pub use value::CellValue;
