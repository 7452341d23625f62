//! Name resolution and type inference for glslx.

pub mod builtins;
pub mod error;
pub mod infer;
pub mod scope;

pub use builtins::{BuiltinTable, Param, Ret, Signature};
pub use error::{Location, TypeError, TypeErrorKind};
pub use infer::{infer_expression, infer_function, infer_module};
pub use scope::{FrameId, Overload, SymbolTable};
