//! Function definitions and their parameters.

use crate::stmt::Block;
use crate::types::Type;

/// Parameter passing mode.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub enum ParameterQualifier {
    #[default]
    In,
    Out,
    InOut,
}

/// A function parameter declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionArgument {
    /// Parameter name.
    pub name: String,
    /// The type of this parameter.
    pub ty: Type,
    /// `in`, `out` or `inout`.
    pub qualifier: ParameterQualifier,
}

impl FunctionArgument {
    /// An `in` parameter.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            qualifier: ParameterQualifier::In,
        }
    }
}

/// A function definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Formal parameters, in order.
    pub arguments: Vec<FunctionArgument>,
    /// Return type.
    pub result: Type,
    /// The function body.
    pub body: Block,
}

impl Function {
    /// Creates a function with no parameters and an empty body.
    pub fn new(name: impl Into<String>, result: Type) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            result,
            body: Vec::new(),
        }
    }

    /// The function's type.
    pub fn signature(&self) -> Type {
        Type::Function {
            parameters: self.arguments.iter().map(|arg| arg.ty.clone()).collect(),
            result: Box::new(self.result.clone()),
        }
    }

    /// Looks up a parameter by name.
    pub fn argument(&self, name: &str) -> Option<&FunctionArgument> {
        self.arguments.iter().find(|arg| arg.name == name)
    }
}
