//! Differentiation errors.

use glslx_analysis::TypeError;
use glslx_ir::IrError;

/// Why a derivative could not be produced.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DiffErrorKind {
    /// The construct has no derivative in this model (loops, dynamic
    /// branches, Jacobians, comparisons, ...).
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// A built-in without a derivative rule.
    #[error("no derivative rule for `{0}`")]
    MissingRule(String),
    /// The function body does not reduce to a single return expression.
    #[error("not a simple function: {0}")]
    NonSimpleFunction(String),
    /// The variable is not a parameter of the function.
    #[error("`{0}` is not a parameter")]
    UnknownParameter(String),
}

/// A differentiation failure and the node it occurred at.
///
/// Differentiation never returns a partial result.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{kind} at `{node}`")]
pub struct DiffError {
    pub kind: DiffErrorKind,
    /// The offending node rendered as GLSL.
    pub node: String,
}

impl DiffError {
    pub fn new(kind: DiffErrorKind, node: impl ToString) -> Self {
        Self {
            kind,
            node: node.to_string(),
        }
    }

    pub(crate) fn unsupported(what: impl Into<String>, node: impl ToString) -> Self {
        Self::new(DiffErrorKind::Unsupported(what.into()), node)
    }

    /// Fills in the location if it is still unknown.
    pub(crate) fn locate(mut self, node: impl ToString) -> Self {
        if self.node.is_empty() {
            self.node = node.to_string();
        }
        self
    }
}

impl From<IrError> for DiffError {
    fn from(err: IrError) -> Self {
        Self::new(DiffErrorKind::Unsupported(err.to_string()), "")
    }
}

/// Errors from [`differentiate_module`](crate::differentiate_module).
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error("derivative of `{function}` with respect to `{parameter}`: {source}")]
    Derivative {
        function: String,
        parameter: String,
        #[source]
        source: DiffError,
    },
}
