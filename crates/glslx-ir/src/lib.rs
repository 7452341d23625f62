//! glslx intermediate representation.
//!
//! A tree-shaped, typed syntax model for a practical subset of GLSL:
//! scalars, vectors, matrices, arrays, structs and the common built-in
//! function set. Every [`Expression`] carries its resolved [`Type`], which
//! is [`Type::Unknown`] until type inference has run.
//!
//! The [`display`](crate::dump_module) module renders the tree back to
//! formatted GLSL source.

mod display;
mod error;
mod expr;
mod func;
mod global;
mod stmt;
mod types;

pub use display::{dump_module, format_float, format_function, format_statement};
pub use error::IrError;
pub use expr::{
    BinaryOp, Builtin, Expression, ExpressionKind, Literal, Swizzle, SwizzleComponent,
    SwizzleLetters, UnaryOp,
};
pub use func::{Function, FunctionArgument, ParameterQualifier};
pub use global::{GlobalVariable, Item, StorageQualifier, StructDeclaration};
pub use stmt::{Block, Statement};
pub use types::{ScalarKind, StructMember, Type, VectorSize};

/// A translation unit: struct declarations, globals and functions in
/// source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    /// Top-level items in declaration order.
    pub items: Vec<Item>,
}

impl Module {
    /// Creates an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates over the functions defined in this module.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(func) => Some(func),
            _ => None,
        })
    }

    /// Iterates mutably over the functions defined in this module.
    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.items.iter_mut().filter_map(|item| match item {
            Item::Function(func) => Some(func),
            _ => None,
        })
    }

    /// Returns the first function with the given name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions().find(|func| func.name == name)
    }

    /// Iterates over the struct declarations of this module.
    pub fn structs(&self) -> impl Iterator<Item = &StructDeclaration> {
        self.items.iter().filter_map(|item| match item {
            Item::Struct(decl) => Some(decl),
            _ => None,
        })
    }

    /// Iterates over the global variables of this module.
    pub fn globals(&self) -> impl Iterator<Item = &GlobalVariable> {
        self.items.iter().filter_map(|item| match item {
            Item::Global(var) => Some(var),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_item_accessors() {
        let mut module = Module::new();
        module.items.push(Item::Struct(StructDeclaration {
            name: "Light".into(),
            members: vec![StructMember {
                name: "position".into(),
                ty: Type::vec(VectorSize::Tri),
            }],
        }));
        module.items.push(Item::Global(GlobalVariable {
            name: "time".into(),
            ty: Type::FLOAT,
            qualifier: Some(StorageQualifier::Uniform),
            init: None,
        }));
        module.items.push(Item::Function(Function::new("f", Type::FLOAT)));

        assert_eq!(module.functions().count(), 1);
        assert_eq!(module.structs().count(), 1);
        assert_eq!(module.globals().count(), 1);
        assert!(module.function("f").is_some());
        assert!(module.function("g").is_none());
    }
}
