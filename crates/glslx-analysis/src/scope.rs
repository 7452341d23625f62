//! Lexically scoped symbol table.
//!
//! Scopes are stored as frames in a flat arena with parent links. Entering
//! a block pushes a frame whose parent is the current one; leaving it only
//! moves the cursor back, so frames outlive their blocks and a
//! [`FrameId`] stays valid for the life of the table.

use std::collections::HashMap;
use std::fmt;

use glslx_ir::{StructDeclaration, Type};

/// A typed index into the frame arena of a [`SymbolTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u32);

impl FrameId {
    /// The module-scope frame.
    pub const GLOBAL: Self = Self(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

#[derive(Clone, Debug, Default)]
struct Frame {
    parent: Option<FrameId>,
    symbols: HashMap<String, Type>,
}

/// One overload of a user-defined function.
#[derive(Clone, Debug, PartialEq)]
pub struct Overload {
    pub parameters: Vec<glslx_ir::FunctionArgument>,
    pub result: Type,
}

/// Variables, user function signatures and struct declarations visible
/// while checking a module.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    frames: Vec<Frame>,
    current: FrameId,
    functions: HashMap<String, Vec<Overload>>,
    structs: HashMap<String, Type>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates a table holding only the empty global frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            current: FrameId::GLOBAL,
            functions: HashMap::new(),
            structs: HashMap::new(),
        }
    }

    /// The innermost open frame.
    pub fn current_frame(&self) -> FrameId {
        self.current
    }

    /// Number of frames ever opened, including the global one.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Opens a nested scope and makes it current.
    pub fn push_scope(&mut self) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(Frame {
            parent: Some(self.current),
            symbols: HashMap::new(),
        });
        self.current = id;
        id
    }

    /// Returns to the parent of the current scope. The global scope is
    /// never closed.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.frames[self.current.index()].parent {
            self.current = parent;
        }
    }

    /// Declares `name` in the current scope, shadowing outer declarations.
    /// Returns the previous type if `name` was already declared in this
    /// same scope.
    pub fn declare(&mut self, name: impl Into<String>, ty: Type) -> Option<Type> {
        self.frames[self.current.index()]
            .symbols
            .insert(name.into(), ty)
    }

    /// Resolves `name` from the current scope outwards.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.lookup_from(self.current, name)
    }

    /// Resolves `name` starting at `frame` and walking parent links.
    pub fn lookup_from(&self, frame: FrameId, name: &str) -> Option<&Type> {
        let mut cursor = Some(frame);
        while let Some(id) = cursor {
            let frame = self.frames.get(id.index())?;
            if let Some(ty) = frame.symbols.get(name) {
                return Some(ty);
            }
            cursor = frame.parent;
        }
        None
    }

    /// Registers a user function overload.
    pub fn declare_function(&mut self, name: impl Into<String>, overload: Overload) {
        let overloads = self.functions.entry(name.into()).or_default();
        if !overloads.contains(&overload) {
            overloads.push(overload);
        }
    }

    /// All overloads declared under `name`.
    pub fn overloads(&self, name: &str) -> &[Overload] {
        self.functions.get(name).map_or(&[], Vec::as_slice)
    }

    /// Registers a struct declaration.
    pub fn declare_struct(&mut self, decl: &StructDeclaration) {
        let ty = self.resolve_type(&decl.to_type());
        self.structs.insert(decl.name.clone(), ty);
    }

    /// The full type of a declared struct.
    pub fn struct_type(&self, name: &str) -> Option<&Type> {
        self.structs.get(name)
    }

    /// Replaces struct references that carry only a name with the declared
    /// struct, recursively through arrays and members.
    pub fn resolve_type(&self, ty: &Type) -> Type {
        match ty {
            Type::Struct { name, members } if members.is_empty() => self
                .structs
                .get(name)
                .cloned()
                .unwrap_or_else(|| ty.clone()),
            Type::Struct { name, members } => Type::Struct {
                name: name.clone(),
                members: members
                    .iter()
                    .map(|m| glslx_ir::StructMember {
                        name: m.name.clone(),
                        ty: self.resolve_type(&m.ty),
                    })
                    .collect(),
            },
            Type::Array { base, size } => Type::Array {
                base: Box::new(self.resolve_type(base)),
                size: *size,
            },
            other => other.clone(),
        }
    }
}
