//! Type inference errors.

use std::fmt;

use glslx_ir::{IrError, Type};

/// Where an inference failure happened: the enclosing function (if any)
/// and the offending node rendered as GLSL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub function: Option<String>,
    pub node: String,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(function) => write!(f, "`{}` in function `{function}`", self.node),
            None => write!(f, "`{}` at module scope", self.node),
        }
    }
}

/// What went wrong during inference.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TypeErrorKind {
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{function}` does not take {found} argument(s)")]
    ArityMismatch { function: String, found: usize },
    #[error("{0}")]
    ShapeMismatch(String),
    #[error("invalid swizzle `.{0}`")]
    InvalidSwizzle(String),
    #[error("`{ty}` has no field `{field}`")]
    UnknownField { ty: Type, field: String },
    #[error("expression is not assignable")]
    NotAssignable,
    #[error("returning `{found}` from a function declared to return `{expected}`")]
    ReturnMismatch { expected: Type, found: Type },
}

impl From<IrError> for TypeErrorKind {
    fn from(err: IrError) -> Self {
        match err {
            IrError::InvalidSwizzle(swizzle) => Self::InvalidSwizzle(swizzle),
            IrError::UnknownField { ty, field } => Self::UnknownField { ty, field },
            other => Self::ShapeMismatch(other.to_string()),
        }
    }
}

/// A type inference failure. Inference stops at the first one.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{kind} at {location}")]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub location: Location,
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslx_ir::{BinaryOp, VectorSize};

    #[test]
    fn display_error() {
        let err = TypeError {
            kind: TypeErrorKind::UnknownIdentifier("k".into()),
            location: Location {
                function: Some("shade".into()),
                node: "k * 2.0".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "unknown identifier `k` at `k * 2.0` in function `shade`"
        );
    }

    #[test]
    fn ir_errors_map_to_kinds() {
        let kind = TypeErrorKind::from(IrError::InvalidSwizzle("xq".into()));
        assert_eq!(kind, TypeErrorKind::InvalidSwizzle("xq".into()));

        let kind = TypeErrorKind::from(IrError::ShapeMismatch {
            op: BinaryOp::Add,
            left: Type::vec(VectorSize::Tri),
            right: Type::mat(VectorSize::Quad),
        });
        assert_eq!(
            kind,
            TypeErrorKind::ShapeMismatch(
                "operator `+` is not defined for `vec3` and `mat4`".into()
            )
        );
    }
}
