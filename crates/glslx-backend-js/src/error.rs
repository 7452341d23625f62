//! Lowering errors.

use glslx_backend_core::BackendError;
use glslx_ir::Type;

/// Why a node could not be lowered.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LoweringErrorKind {
    /// A built-in without a runtime mapping for its operand shape.
    #[error("no runtime mapping for `{0}`")]
    UnmappedBuiltin(String),
    /// A type gl-matrix has no representation for (`ivec`, `bvec`,
    /// non-square matrices, unknown types).
    #[error("type `{0}` has no runtime representation")]
    UnrepresentableType(Type),
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
}

/// A lowering failure and the node it occurred at.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{kind} at `{node}`")]
pub struct LoweringError {
    pub kind: LoweringErrorKind,
    /// The offending node rendered as GLSL.
    pub node: String,
}

impl LoweringError {
    pub fn new(kind: LoweringErrorKind, node: impl ToString) -> Self {
        Self {
            kind,
            node: node.to_string(),
        }
    }
}

impl From<LoweringError> for BackendError {
    fn from(err: LoweringError) -> Self {
        BackendError::Unsupported {
            message: err.kind.to_string(),
            node: err.node,
        }
    }
}
