//! Module-scope items: struct declarations and global variables.

use crate::expr::Expression;
use crate::func::Function;
use crate::types::{StructMember, Type};

/// Storage qualifier of a global variable.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum StorageQualifier {
    Const,
    Uniform,
    In,
    Out,
}

/// A module-scope variable.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalVariable {
    /// Variable name.
    pub name: String,
    /// The type of this variable.
    pub ty: Type,
    /// `const`, `uniform`, `in` or `out`, if any.
    pub qualifier: Option<StorageQualifier>,
    /// Optional initializer expression.
    pub init: Option<Expression>,
}

/// A `struct` declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDeclaration {
    pub name: String,
    pub members: Vec<StructMember>,
}

impl StructDeclaration {
    /// The struct type this declaration introduces.
    pub fn to_type(&self) -> Type {
        Type::Struct {
            name: self.name.clone(),
            members: self.members.clone(),
        }
    }
}

/// A top-level item of a [`Module`](crate::Module).
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Struct(StructDeclaration),
    Global(GlobalVariable),
    Function(Function),
}
