//! Operator symbol table: host operators to CUDA C operator tokens.

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::TranspileError;

/// Kernel-language token for a binary operator. Used for infix operations
/// and, with `=` appended, for augmented assignments.
pub fn binary_symbol(op: BinaryOperator) -> Result<&'static str, TranspileError> {
    match op {
        BinaryOperator::Mul => Ok("*"),
        BinaryOperator::Add => Ok("+"),
        BinaryOperator::Sub => Ok("-"),
        BinaryOperator::Mod => Ok("%"),
        BinaryOperator::Div => Ok("/"),
        BinaryOperator::BitXor => Ok("^"),
        BinaryOperator::BitAnd => Ok("&"),
        BinaryOperator::BitOr => Ok("|"),
        BinaryOperator::FloorDiv
        | BinaryOperator::Pow
        | BinaryOperator::MatMul
        | BinaryOperator::LShift
        | BinaryOperator::RShift
        | BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::Less
        | BinaryOperator::Greater
        | BinaryOperator::LessEq
        | BinaryOperator::GreaterEq
        | BinaryOperator::And
        | BinaryOperator::Or => Err(TranspileError::unsupported_operator(op)),
    }
}

/// No unary operator has a kernel mapping.
pub fn unary_symbol(op: UnaryOperator) -> Result<&'static str, TranspileError> {
    Err(TranspileError::unsupported_operator(op))
}
