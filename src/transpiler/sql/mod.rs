//! Dialect generators.

pub mod postgres;
pub mod sqlserver;

use crate::ast::{Expr, FunctionExpr};
use crate::error::{TranspileError, TranspileResult};

/// Sequence named by the argument of `VECTOR(seq)`.
pub(crate) fn sequence_argument(function: &FunctionExpr) -> TranspileResult<String> {
    match function.args.first() {
        Some(Expr::Scalar(scalar)) => Ok(scalar.literal.clone()),
        Some(Expr::Column(column)) => Ok(column.identifier.clone()),
        Some(Expr::Variable(variable)) => Ok(variable.identifier.clone()),
        _ => Err(TranspileError::statement(
            function.id,
            "VECTOR: sequence name argument is expected.",
        )),
    }
}
