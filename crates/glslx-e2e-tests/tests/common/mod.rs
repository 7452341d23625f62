use glslx_backend_core::{Backend, BackendError, BackendOptions, BackendOutput};
use glslx_ir::{
    BinaryOp, Expression, ExpressionKind, Function, FunctionArgument, GlobalVariable, Item,
    Module, Statement, StorageQualifier, Type,
};

#[allow(dead_code)]
pub fn ident(name: &str) -> Expression {
    Expression::untyped(ExpressionKind::Identifier(name.into()))
}

#[allow(dead_code)]
pub fn bin(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::untyped(ExpressionKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[allow(dead_code)]
pub fn call(function: &str, arguments: Vec<Expression>) -> Expression {
    Expression::untyped(ExpressionKind::Call {
        function: function.into(),
        arguments,
    })
}

/// A function whose body is a single `return value;`.
#[allow(dead_code)]
pub fn returning(name: &str, result: Type, params: &[(&str, Type)], value: Expression) -> Item {
    let mut func = Function::new(name, result);
    func.arguments = params
        .iter()
        .map(|(name, ty)| FunctionArgument::new(*name, ty.clone()))
        .collect();
    func.body = vec![Statement::Return(Some(value))];
    Item::Function(func)
}

#[allow(dead_code)]
pub fn uniform(name: &str, ty: Type) -> Item {
    Item::Global(GlobalVariable {
        name: name.into(),
        ty,
        qualifier: Some(StorageQualifier::Uniform),
        init: None,
    })
}

#[allow(dead_code)]
pub fn module(items: Vec<Item>) -> Module {
    Module { items }
}

/// Compile with the backend, panicking on failure.
#[allow(dead_code)]
pub fn compile(backend: &dyn Backend, module: &Module, opts: &BackendOptions) -> BackendOutput {
    try_compile(backend, module, opts).expect("backend compilation failed")
}

#[allow(dead_code)]
pub fn try_compile(
    backend: &dyn Backend,
    module: &Module,
    opts: &BackendOptions,
) -> Result<BackendOutput, BackendError> {
    backend.compile(module, opts)
}

/// The text of the single emitted file.
#[allow(dead_code)]
pub fn text(output: &BackendOutput) -> &str {
    output.text().expect("backend should emit text")
}
