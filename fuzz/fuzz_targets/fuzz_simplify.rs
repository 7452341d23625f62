#![no_main]

use glslx_analysis::{BuiltinTable, SymbolTable, infer_expression};
use glslx_autodiff::{Differentiator, differentiate};
use glslx_ir::{
    BinaryOp, Expression, ExpressionKind, Function, FunctionArgument, Statement, Type,
};
use libfuzzer_sys::fuzz_target;

const CALLS: [&str; 8] = ["sin", "cos", "exp", "sqrt", "abs", "floor", "pow", "max"];

/// Decodes a float expression over `x` and `y` from the byte stream.
fn decode(bytes: &mut impl Iterator<Item = u8>, depth: u32) -> Expression {
    let tag = bytes.next().unwrap_or(0);
    if depth > 6 {
        return Expression::untyped(ExpressionKind::Identifier("x".into()));
    }
    match tag % 8 {
        0 => Expression::untyped(ExpressionKind::Identifier("x".into())),
        1 => Expression::untyped(ExpressionKind::Identifier("y".into())),
        2 => Expression::float(f32::from(bytes.next().unwrap_or(0)) / 16.0),
        3 | 4 => {
            let op = [
                BinaryOp::Add,
                BinaryOp::Subtract,
                BinaryOp::Multiply,
                BinaryOp::Divide,
            ][usize::from(tag / 8 % 4)];
            Expression::untyped(ExpressionKind::Binary {
                op,
                left: Box::new(decode(bytes, depth + 1)),
                right: Box::new(decode(bytes, depth + 1)),
            })
        }
        5 => Expression::untyped(ExpressionKind::Unary {
            op: glslx_ir::UnaryOp::Negate,
            expr: Box::new(decode(bytes, depth + 1)),
        }),
        _ => {
            let function = CALLS[usize::from(tag / 8) % CALLS.len()];
            let arity = if matches!(function, "pow" | "max") { 2 } else { 1 };
            Expression::untyped(ExpressionKind::Call {
                function: function.into(),
                arguments: (0..arity).map(|_| decode(bytes, depth + 1)).collect(),
            })
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let expr = decode(&mut data.iter().copied(), 0);
    let mut symbols = SymbolTable::new();
    symbols.declare("x", Type::FLOAT);
    symbols.declare("y", Type::FLOAT);
    let Ok(typed) = infer_expression(&expr, &symbols, BuiltinTable::shared()) else {
        return;
    };

    // Simplification keeps the type and never panics.
    let simplified = glslx_opt::simplify(&typed);
    assert_eq!(simplified.ty, typed.ty);

    let mut func = Function::new("f", Type::FLOAT);
    func.arguments = vec![
        FunctionArgument::new("x", Type::FLOAT),
        FunctionArgument::new("y", Type::FLOAT),
    ];
    func.body = vec![Statement::Return(Some(typed))];
    if let Ok(derivative) = differentiate(&func, "x", &Differentiator::new()) {
        assert_eq!(derivative.ty, Type::FLOAT);
        let _ = glslx_backend_js::lower_expression(&derivative);
    }
});
