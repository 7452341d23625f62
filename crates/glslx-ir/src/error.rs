//! Error types for the glslx IR.

use crate::expr::{BinaryOp, UnaryOp};
use crate::types::Type;

/// Errors raised while building typed IR nodes.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum IrError {
    /// The operand shapes are not valid for a binary operator.
    #[error("operator `{op}` is not defined for `{left}` and `{right}`")]
    ShapeMismatch {
        op: BinaryOp,
        left: Type,
        right: Type,
    },

    /// The operand is not valid for a unary operator.
    #[error("operator `{op}` is not defined for `{operand}`")]
    UnaryMismatch { op: UnaryOp, operand: Type },

    /// A swizzle mixes letter sets, is too long, or selects a missing
    /// component.
    #[error("invalid swizzle `.{0}`")]
    InvalidSwizzle(String),

    /// A struct has no member of that name.
    #[error("`{ty}` has no field `{field}`")]
    UnknownField { ty: Type, field: String },

    /// The base of an index expression is not an array, vector or matrix.
    #[error("`{0}` cannot be indexed")]
    NotIndexable(Type),

    /// The branches of a conditional disagree.
    #[error("conditional branches differ: `{accept}` and `{reject}`")]
    BranchMismatch { accept: Type, reject: Type },
}
