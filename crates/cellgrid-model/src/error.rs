use core::fmt;

use serde::{Deserialize, Serialize};

/// Evaluation error values.
///
/// These are ordinary cell values, not failures of the API: formulas produce
/// them, caches store them, and arithmetic propagates them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorValue {
    /// `#REF!` — a reference to a position outside the sheet bounds.
    Ref,
    /// `#VALUE!` — a referenced cell holds text that is not a number.
    Value,
    /// `#DIV/0!` — a non-finite arithmetic result (division by zero,
    /// overflow, NaN).
    Div0,
}

impl ErrorValue {
    /// Canonical spelling of the error (including punctuation).
    pub const fn as_code(self) -> &'static str {
        match self {
            ErrorValue::Ref => "#REF!",
            ErrorValue::Value => "#VALUE!",
            ErrorValue::Div0 => "#DIV/0!",
        }
    }

    /// Parse an error mnemonic (e.g. `#DIV/0!`) into an [`ErrorValue`].
    ///
    /// Returns `None` for unknown mnemonics.
    pub fn from_code(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("#REF!") {
            return Some(ErrorValue::Ref);
        }
        if raw.eq_ignore_ascii_case("#VALUE!") {
            return Some(ErrorValue::Value);
        }
        if raw.eq_ignore_ascii_case("#DIV/0!") {
            return Some(ErrorValue::Div0);
        }
        None
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl std::error::Error for ErrorValue {}
