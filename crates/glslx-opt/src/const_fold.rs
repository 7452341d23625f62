//! Constant folding.
//!
//! Evaluates operators, scalar conversions and built-in calls whose
//! operands are all literals. Float results are kept only when finite,
//! so folding never introduces `inf` or `NaN` literals.

use glslx_ir::{BinaryOp, Builtin, Expression, ExpressionKind, Literal, ScalarKind, Type, UnaryOp};

use crate::Rule;

/// Folds literal-only subtrees into a single literal.
#[derive(Debug)]
pub struct ConstantFolding;

impl Rule for ConstantFolding {
    fn name(&self) -> &str {
        "constant-folding"
    }

    fn rewrite(&self, expr: &Expression) -> Option<Expression> {
        let folded = match &expr.kind {
            ExpressionKind::Unary { op, expr: operand } => fold_unary(*op, operand.as_literal()?),
            ExpressionKind::Binary { op, left, right } => {
                fold_binary(*op, left.as_literal()?, right.as_literal()?)
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => {
                let args = arguments
                    .iter()
                    .map(Expression::as_literal)
                    .collect::<Option<Vec<_>>>()?;
                fold_call(function, &args, &expr.ty)
            }
            _ => None,
        }?;
        match folded {
            Literal::Float(v) if !v.is_finite() => None,
            lit => Some(Expression::literal(lit)),
        }
    }
}

fn fold_unary(op: UnaryOp, lit: Literal) -> Option<Literal> {
    match (op, lit) {
        (UnaryOp::Negate, Literal::Float(v)) => Some(Literal::Float(-v)),
        (UnaryOp::Negate, Literal::Int(v)) => v.checked_neg().map(Literal::Int),
        (UnaryOp::Not, Literal::Bool(v)) => Some(Literal::Bool(!v)),
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, left: Literal, right: Literal) -> Option<Literal> {
    match (left, right) {
        (Literal::Int(l), Literal::Int(r)) => fold_i32(op, l, r),
        (Literal::Bool(l), Literal::Bool(r)) => fold_bool(op, l, r),
        (Literal::Bool(_), _) | (_, Literal::Bool(_)) => None,
        _ => fold_f32(op, as_f32(left)?, as_f32(right)?),
    }
}

fn as_f32(lit: Literal) -> Option<f32> {
    match lit {
        Literal::Float(v) => Some(v),
        Literal::Int(v) => Some(v as f32),
        Literal::Bool(_) => None,
    }
}

fn fold_f32(op: BinaryOp, l: f32, r: f32) -> Option<Literal> {
    match op {
        BinaryOp::Add => Some(Literal::Float(l + r)),
        BinaryOp::Subtract => Some(Literal::Float(l - r)),
        BinaryOp::Multiply => Some(Literal::Float(l * r)),
        BinaryOp::Divide => Some(Literal::Float(l / r)),
        BinaryOp::Equal => Some(Literal::Bool(l == r)),
        BinaryOp::NotEqual => Some(Literal::Bool(l != r)),
        BinaryOp::Less => Some(Literal::Bool(l < r)),
        BinaryOp::LessEqual => Some(Literal::Bool(l <= r)),
        BinaryOp::Greater => Some(Literal::Bool(l > r)),
        BinaryOp::GreaterEqual => Some(Literal::Bool(l >= r)),
        _ => None,
    }
}

fn fold_i32(op: BinaryOp, l: i32, r: i32) -> Option<Literal> {
    match op {
        BinaryOp::Add => l.checked_add(r).map(Literal::Int),
        BinaryOp::Subtract => l.checked_sub(r).map(Literal::Int),
        BinaryOp::Multiply => l.checked_mul(r).map(Literal::Int),
        BinaryOp::Divide => l.checked_div(r).map(Literal::Int),
        BinaryOp::Modulo => l.checked_rem(r).map(Literal::Int),
        BinaryOp::Equal => Some(Literal::Bool(l == r)),
        BinaryOp::NotEqual => Some(Literal::Bool(l != r)),
        BinaryOp::Less => Some(Literal::Bool(l < r)),
        BinaryOp::LessEqual => Some(Literal::Bool(l <= r)),
        BinaryOp::Greater => Some(Literal::Bool(l > r)),
        BinaryOp::GreaterEqual => Some(Literal::Bool(l >= r)),
        _ => None,
    }
}

fn fold_bool(op: BinaryOp, l: bool, r: bool) -> Option<Literal> {
    match op {
        BinaryOp::Equal => Some(Literal::Bool(l == r)),
        BinaryOp::NotEqual => Some(Literal::Bool(l != r)),
        BinaryOp::LogicalAnd => Some(Literal::Bool(l && r)),
        BinaryOp::LogicalOr => Some(Literal::Bool(l || r)),
        _ => None,
    }
}

/// Scalar conversions and scalar built-ins.
fn fold_call(function: &str, args: &[Literal], ty: &Type) -> Option<Literal> {
    match (Type::from_glsl_name(function), args) {
        (Some(Type::Scalar(kind)), [arg]) => return convert(*arg, kind),
        (Some(_), _) => return None,
        (None, _) => {}
    }
    let builtin = Builtin::from_name(function)?;
    match ty {
        Type::Scalar(ScalarKind::Float) => {
            let args = args.iter().map(|&a| as_f32(a)).collect::<Option<Vec<_>>>()?;
            fold_math(builtin, &args).map(Literal::Float)
        }
        Type::Scalar(ScalarKind::Int) => {
            let args = args
                .iter()
                .map(|a| match a {
                    Literal::Int(v) => Some(*v),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?;
            fold_integral(builtin, &args).map(Literal::Int)
        }
        _ => None,
    }
}

fn convert(lit: Literal, kind: ScalarKind) -> Option<Literal> {
    Some(match (lit, kind) {
        (Literal::Float(v), ScalarKind::Int) => {
            if !v.is_finite() || v.abs() >= i32::MAX as f32 {
                return None;
            }
            Literal::Int(v.trunc() as i32)
        }
        (Literal::Bool(v), ScalarKind::Int) => Literal::Int(i32::from(v)),
        (Literal::Bool(v), ScalarKind::Float) => Literal::Float(f32::from(u8::from(v))),
        (Literal::Int(v), ScalarKind::Float) => Literal::Float(v as f32),
        (Literal::Bool(v), ScalarKind::Bool) => Literal::Bool(v),
        (lit, ScalarKind::Bool) => Literal::Bool(as_f32(lit)? != 0.0),
        (lit, _) => lit,
    })
}

fn fold_integral(builtin: Builtin, args: &[i32]) -> Option<i32> {
    match (builtin, args) {
        (Builtin::Abs, [a]) => a.checked_abs(),
        (Builtin::Sign, [a]) => Some(a.signum()),
        (Builtin::Min, [a, b]) => Some(*a.min(b)),
        (Builtin::Max, [a, b]) => Some(*a.max(b)),
        (Builtin::Clamp, [x, lo, hi]) if lo <= hi => Some(*x.clamp(lo, hi)),
        _ => None,
    }
}

/// Evaluates a scalar float built-in with GLSL's definitions.
fn fold_math(builtin: Builtin, args: &[f32]) -> Option<f32> {
    let v = match (builtin, args) {
        (Builtin::Radians, [a]) => a.to_radians(),
        (Builtin::Degrees, [a]) => a.to_degrees(),
        (Builtin::Sin, [a]) => a.sin(),
        (Builtin::Cos, [a]) => a.cos(),
        (Builtin::Tan, [a]) => a.tan(),
        (Builtin::Asin, [a]) => a.asin(),
        (Builtin::Acos, [a]) => a.acos(),
        (Builtin::Atan, [a]) => a.atan(),
        (Builtin::Atan, [y, x]) => y.atan2(*x),
        (Builtin::Sinh, [a]) => a.sinh(),
        (Builtin::Cosh, [a]) => a.cosh(),
        (Builtin::Tanh, [a]) => a.tanh(),
        (Builtin::Pow, [a, b]) => a.powf(*b),
        (Builtin::Exp, [a]) => a.exp(),
        (Builtin::Log, [a]) => a.ln(),
        (Builtin::Exp2, [a]) => a.exp2(),
        (Builtin::Log2, [a]) => a.log2(),
        (Builtin::Sqrt, [a]) => a.sqrt(),
        (Builtin::InverseSqrt, [a]) => 1.0 / a.sqrt(),
        (Builtin::Abs, [a]) => a.abs(),
        (Builtin::Sign, [a]) => {
            if *a == 0.0 {
                0.0
            } else {
                a.signum()
            }
        }
        (Builtin::Floor, [a]) => a.floor(),
        (Builtin::Ceil, [a]) => a.ceil(),
        (Builtin::Round, [a]) => a.round(),
        (Builtin::Trunc, [a]) => a.trunc(),
        (Builtin::Fract, [a]) => a - a.floor(),
        (Builtin::Mod, [a, b]) => a - b * (a / b).floor(),
        (Builtin::Min, [a, b]) => a.min(*b),
        (Builtin::Max, [a, b]) => a.max(*b),
        (Builtin::Clamp, [x, lo, hi]) if lo <= hi => x.clamp(*lo, *hi),
        (Builtin::Mix, [a, b, t]) => a * (1.0 - t) + b * t,
        (Builtin::Step, [edge, x]) => {
            if x < edge {
                0.0
            } else {
                1.0
            }
        }
        (Builtin::SmoothStep, [e0, e1, x]) if e0 != e1 => {
            let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
            t * t * (3.0 - 2.0 * t)
        }
        (Builtin::Length, [a]) => a.abs(),
        (Builtin::Distance, [a, b]) => (a - b).abs(),
        (Builtin::Dot, [a, b]) => a * b,
        (Builtin::Normalize, [a]) => a / a.abs(),
        (Builtin::FaceForward, [n, i, nref]) => {
            if nref * i < 0.0 {
                *n
            } else {
                -n
            }
        }
        (Builtin::Reflect, [i, n]) => i - 2.0 * n * i * n,
        (Builtin::Refract, [i, n, eta]) => {
            let d = n * i;
            let k = 1.0 - eta * eta * (1.0 - d * d);
            if k < 0.0 {
                0.0
            } else {
                eta * i - (eta * d + k.sqrt()) * n
            }
        }
        _ => return None,
    };
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(expr: &Expression) -> Option<Expression> {
        ConstantFolding.rewrite(expr)
    }

    fn bin(op: BinaryOp, l: Expression, r: Expression) -> Expression {
        Expression::binary(op, l, r).unwrap()
    }

    #[test]
    fn fold_f32_multiply() {
        let e = bin(
            BinaryOp::Multiply,
            Expression::float(2.0),
            Expression::float(3.0),
        );
        assert_eq!(fold(&e), Some(Expression::float(6.0)));
    }

    #[test]
    fn fold_mixed_promotes() {
        let e = bin(BinaryOp::Add, Expression::int(1), Expression::float(0.5));
        assert_eq!(fold(&e), Some(Expression::float(1.5)));
    }

    #[test]
    fn fold_i32_division_by_zero_is_kept() {
        let e = bin(BinaryOp::Divide, Expression::int(1), Expression::int(0));
        assert_eq!(fold(&e), None);
        let e = bin(BinaryOp::Modulo, Expression::int(7), Expression::int(3));
        assert_eq!(fold(&e), Some(Expression::int(1)));
    }

    #[test]
    fn non_finite_results_are_not_folded() {
        let e = bin(
            BinaryOp::Divide,
            Expression::float(1.0),
            Expression::float(0.0),
        );
        assert_eq!(fold(&e), None);
        let e = Expression::call("log", vec![Expression::float(-1.0)], Type::FLOAT);
        assert_eq!(fold(&e), None);
    }

    #[test]
    fn fold_comparison() {
        let e = bin(BinaryOp::Less, Expression::float(1.0), Expression::float(2.0));
        assert_eq!(fold(&e), Some(Expression::bool(true)));
    }

    #[test]
    fn fold_unary() {
        let e = Expression::unary(UnaryOp::Negate, Expression::float(2.0)).unwrap();
        assert_eq!(fold(&e), Some(Expression::float(-2.0)));
        let e = Expression::unary(UnaryOp::Not, Expression::bool(false)).unwrap();
        assert_eq!(fold(&e), Some(Expression::bool(true)));
    }

    #[test]
    fn fold_builtins() {
        let call = |name: &str, args: &[f32]| {
            let args = args.iter().map(|&v| Expression::float(v)).collect();
            fold(&Expression::call(name, args, Type::FLOAT))
        };
        assert_eq!(call("sqrt", &[4.0]), Some(Expression::float(2.0)));
        assert_eq!(call("abs", &[-3.0]), Some(Expression::float(3.0)));
        assert_eq!(call("clamp", &[5.0, 0.0, 1.0]), Some(Expression::float(1.0)));
        assert_eq!(call("fract", &[-0.25]), Some(Expression::float(0.75)));
        assert_eq!(call("mod", &[-1.0, 3.0]), Some(Expression::float(2.0)));
        assert_eq!(call("step", &[0.5, 0.25]), Some(Expression::float(0.0)));
        assert_eq!(call("mix", &[0.0, 4.0, 0.5]), Some(Expression::float(2.0)));
        assert_eq!(call("pow", &[2.0, 3.0]), Some(Expression::float(8.0)));
    }

    #[test]
    fn fold_conversions() {
        let e = Expression::call("float", vec![Expression::int(3)], Type::FLOAT);
        assert_eq!(fold(&e), Some(Expression::float(3.0)));
        let e = Expression::call("int", vec![Expression::float(-2.7)], Type::INT);
        assert_eq!(fold(&e), Some(Expression::int(-2)));
    }

    #[test]
    fn no_fold_non_literal_operands() {
        let x = Expression::identifier("x", Type::FLOAT);
        let e = bin(BinaryOp::Add, x.clone(), Expression::float(1.0));
        assert_eq!(fold(&e), None);
        let e = Expression::call("sin", vec![x], Type::FLOAT);
        assert_eq!(fold(&e), None);
        // Vector constructors stay as they are.
        let e = Expression::call(
            "vec2",
            vec![Expression::float(1.0)],
            Type::vec(glslx_ir::VectorSize::Bi),
        );
        assert_eq!(fold(&e), None);
    }
}
