use std::collections::BTreeSet;

use cellgrid_model::{CellRef, CellValue, ErrorValue};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::parser::{self, FormulaParseError};

/// The engine's seam to cell storage during evaluation.
///
/// Returning `None` means the position holds no cell; formulas read it as
/// `0.0`.
pub trait ValueResolver {
    fn cell_value(&self, cell: CellRef) -> Option<CellValue>;
}

/// An immutable parsed formula.
///
/// Holds the expression tree and the deduplicated, row-major-sorted list of
/// in-bounds cells the expression references. Out-of-bounds references stay
/// in the tree (they evaluate to `#REF!`) but are not reported as referenced
/// cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
    referenced: Vec<CellRef>,
}

impl Formula {
    /// Parse an expression (without the leading `=`).
    pub fn parse(expression: &str) -> Result<Self, FormulaParseError> {
        let expr = parser::parse_expression(expression)?;
        let mut refs = BTreeSet::new();
        collect_refs(&expr, &mut refs);
        Ok(Self {
            expr,
            referenced: refs.into_iter().collect(),
        })
    }

    /// Evaluate the expression bottom-up against `resolver`.
    ///
    /// Errors are ordinary outcomes: any error operand short-circuits the
    /// enclosing operation, first-encountered in evaluation order wins. Every
    /// `Ok` result is finite; non-finite arithmetic results become
    /// [`ErrorValue::Div0`] at the op that produced them.
    pub fn evaluate<R: ValueResolver>(&self, resolver: &R) -> Result<f64, ErrorValue> {
        eval_expr(&self.expr, resolver)
    }

    /// The canonical, minimally-parenthesized reprint of the expression.
    pub fn expression(&self) -> String {
        self.expr.to_string()
    }

    /// The in-bounds cells the expression references, deduplicated and
    /// sorted row-major.
    pub fn referenced_cells(&self) -> &[CellRef] {
        &self.referenced
    }
}

fn collect_refs(expr: &Expr, out: &mut BTreeSet<CellRef>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Reference(raw) => {
            if let Some(cell) = raw.resolve() {
                out.insert(cell);
            }
        }
        Expr::Unary { expr, .. } => collect_refs(expr, out),
        Expr::Binary { left, right, .. } => {
            collect_refs(left, out);
            collect_refs(right, out);
        }
    }
}

fn eval_expr<R: ValueResolver>(expr: &Expr, resolver: &R) -> Result<f64, ErrorValue> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Reference(raw) => {
            let Some(cell) = raw.resolve() else {
                return Err(ErrorValue::Ref);
            };
            match resolver.cell_value(cell) {
                None => Ok(0.0),
                Some(CellValue::Number(n)) => Ok(n),
                Some(CellValue::Error(e)) => Err(e),
                Some(CellValue::String(s)) => number_from_text(&s),
            }
        }
        Expr::Unary { op, expr } => {
            let v = eval_expr(expr, resolver)?;
            Ok(match op {
                UnaryOp::Plus => v,
                UnaryOp::Minus => -v,
            })
        }
        Expr::Binary { op, left, right } => {
            let l = eval_expr(left, resolver)?;
            let r = eval_expr(right, resolver)?;
            let out = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
            };
            if out.is_finite() {
                Ok(out)
            } else {
                Err(ErrorValue::Div0)
            }
        }
    }
}

/// Coerce a referenced cell's text to a number.
///
/// The empty string reads as `0.0`. Otherwise the whole string must parse as
/// a locale-independent decimal (`.` separator) to a finite value; the first
/// character must be a digit, a sign, or `.`, which keeps spellings like
/// `inf` out.
fn number_from_text(s: &str) -> Result<f64, ErrorValue> {
    if s.is_empty() {
        return Ok(0.0);
    }
    let first = s.as_bytes()[0];
    if !(first.is_ascii_digit() || first == b'+' || first == b'-' || first == b'.') {
        return Err(ErrorValue::Value);
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ErrorValue::Value),
    }
}
