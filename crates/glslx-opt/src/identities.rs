//! Algebraic identities.
//!
//! Zero and one are recognized both as literals and as splat
//! constructors, so `v * vec3(1.0)` and `m * mat3(1.0)` reduce like
//! `x * 1.0`. A rewrite is kept only when the replacement has the type of
//! the node it replaces; `vec3(1.0) * m` is therefore left alone.

use glslx_ir::{BinaryOp, Builtin, Expression, ExpressionKind, Literal, UnaryOp};

use crate::Rule;

/// Removes neutral elements and collapses double negations.
#[derive(Debug)]
pub struct AlgebraicIdentities;

impl Rule for AlgebraicIdentities {
    fn name(&self) -> &str {
        "algebraic-identities"
    }

    fn rewrite(&self, expr: &Expression) -> Option<Expression> {
        let keep = |candidate: Option<Expression>| candidate.filter(|c| c.ty == expr.ty);
        match &expr.kind {
            ExpressionKind::Binary { op, left, right } => match op {
                BinaryOp::Add => keep(when(right.is_zero(), || Some((**left).clone())))
                    .or_else(|| keep(when(left.is_zero(), || Some((**right).clone()))))
                    .or_else(|| keep(negated(right).and_then(|y| sub(left, y))))
                    .or_else(|| keep(negated(left).and_then(|x| sub(right, x)))),
                BinaryOp::Subtract => keep(when(right.is_zero(), || Some((**left).clone())))
                    .or_else(|| keep(when(left.is_zero(), || negate((**right).clone()))))
                    .or_else(|| {
                        keep(negated(right).and_then(|y| {
                            Expression::binary(BinaryOp::Add, (**left).clone(), y).ok()
                        }))
                    }),
                BinaryOp::Multiply => keep(when(right.is_one(), || Some((**left).clone())))
                    .or_else(|| keep(when(left.is_one(), || Some((**right).clone()))))
                    .or_else(|| {
                        keep(when(left.is_zero() || right.is_zero(), || {
                            Expression::zero(&expr.ty)
                        }))
                    })
                    .or_else(|| keep(when(is_minus_one(left), || negate((**right).clone()))))
                    .or_else(|| keep(when(is_minus_one(right), || negate((**left).clone()))))
                    .or_else(|| match (left.as_unary(), right.as_unary()) {
                        (Some((UnaryOp::Negate, a)), Some((UnaryOp::Negate, b))) => keep(
                            Expression::binary(BinaryOp::Multiply, a.clone(), b.clone()).ok(),
                        ),
                        _ => None,
                    }),
                BinaryOp::Divide => keep(when(right.is_one(), || Some((**left).clone()))),
                _ => None,
            },
            ExpressionKind::Unary { op, expr: operand } => match (op, operand.as_unary()) {
                (UnaryOp::Negate, Some((UnaryOp::Negate, inner)))
                | (UnaryOp::Not, Some((UnaryOp::Not, inner))) => keep(Some(inner.clone())),
                _ => None,
            },
            ExpressionKind::Call { arguments, .. } if expr.builtin() == Some(Builtin::Pow) => {
                match arguments.as_slice() {
                    [base, exponent] if exponent.is_one() => keep(Some(base.clone())),
                    [_, exponent] if exponent.is_zero() => keep(Expression::one(&expr.ty)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn when(cond: bool, f: impl FnOnce() -> Option<Expression>) -> Option<Expression> {
    if cond { f() } else { None }
}

fn negate(expr: Expression) -> Option<Expression> {
    Expression::unary(UnaryOp::Negate, expr).ok()
}

fn sub(left: &Expression, right: Expression) -> Option<Expression> {
    Expression::binary(BinaryOp::Subtract, left.clone(), right).ok()
}

fn is_minus_one(expr: &Expression) -> bool {
    expr.as_literal().and_then(|lit| lit.as_f64()) == Some(-1.0)
}

/// `y` for `-y` or for a negative literal `-c`.
fn negated(expr: &Expression) -> Option<Expression> {
    if let Some((UnaryOp::Negate, inner)) = expr.as_unary() {
        return Some(inner.clone());
    }
    match expr.as_literal()? {
        Literal::Float(v) if v < 0.0 => Some(Expression::float(-v)),
        Literal::Int(v) if v < 0 => v.checked_neg().map(Expression::int),
        _ => None,
    }
}
