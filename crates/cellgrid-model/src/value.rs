use core::fmt;

use serde::{Deserialize, Serialize};

use crate::ErrorValue;

/// The value a cell reads as.
///
/// The enum uses an explicit `{type, value}` tagged layout for stable
/// host-facing payloads. An empty cell reads as `String("")`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// IEEE-754 double precision number.
    Number(f64),
    /// Plain text.
    String(String),
    /// Evaluation error.
    Error(ErrorValue),
}

impl CellValue {
    /// Returns true if the value is [`CellValue::Number`].
    pub fn is_number(&self) -> bool {
        matches!(self, CellValue::Number(_))
    }

    /// Returns true if the value is [`CellValue::Error`].
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// The numeric payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The error payload, if any.
    pub fn as_error(&self) -> Option<ErrorValue> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::String(String::new())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<ErrorValue> for CellValue {
    fn from(e: ErrorValue) -> Self {
        CellValue::Error(e)
    }
}

/// Renders the value the way the sheet prints it: numbers as
/// locale-independent decimals, text verbatim, errors as their mnemonic.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => f.write_str(s),
            CellValue::Error(e) => f.write_str(e.as_code()),
        }
    }
}
