//! Collection of like terms.

use glslx_ir::{BinaryOp, Expression, Literal, ScalarKind};

use crate::Rule;

/// Combines sums and differences of the same term:
/// `e + e` becomes `2.0 * e`, `a * e + b * e` becomes `(a + b) * e`,
/// `e + a * e` becomes `(1.0 + a) * e`. Subtraction is handled the same
/// way, with `e - e` becoming zero.
#[derive(Debug)]
pub struct LikeTerms;

impl Rule for LikeTerms {
    fn name(&self) -> &str {
        "like-terms"
    }

    fn rewrite(&self, expr: &Expression) -> Option<Expression> {
        let (op, left, right) = expr.as_binary()?;
        if !matches!(op, BinaryOp::Add | BinaryOp::Subtract) {
            return None;
        }

        if left == right {
            return match op {
                BinaryOp::Add => {
                    let two = match left.ty.scalar_kind()? {
                        ScalarKind::Int => Literal::Int(2),
                        _ => Literal::Float(2.0),
                    };
                    Expression::binary(BinaryOp::Multiply, Expression::literal(two), left.clone())
                        .ok()
                }
                _ => Expression::zero(&expr.ty),
            };
        }

        let (a, e1) = split(left);
        let (b, e2) = split(right);
        if e1 != e2 || (a.is_none() && b.is_none()) {
            return None;
        }
        let a = coefficient(a, b)?;
        let b = coefficient(b, Some(&a))?;
        let sum = Expression::binary(op, a, b).ok()?;
        Expression::binary(BinaryOp::Multiply, sum, e1.clone()).ok()
    }
}

/// `(Some(a), e)` for a product `a * e`, else `(None, expr)`.
fn split(expr: &Expression) -> (Option<&Expression>, &Expression) {
    match expr.as_binary() {
        Some((BinaryOp::Multiply, a, e)) => (Some(a), e),
        _ => (None, expr),
    }
}

/// The explicit coefficient, or the multiplicative identity matching the
/// other side's coefficient.
fn coefficient(own: Option<&Expression>, other: Option<&Expression>) -> Option<Expression> {
    match own {
        Some(c) => Some(c.clone()),
        None => Expression::one(&other?.ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslx_ir::{Type, VectorSize};

    fn bin(op: BinaryOp, l: Expression, r: Expression) -> Expression {
        Expression::binary(op, l, r).unwrap()
    }

    fn x() -> Expression {
        Expression::identifier("x", Type::FLOAT)
    }

    fn rewrite(e: &Expression) -> Option<String> {
        LikeTerms.rewrite(e).map(|e| e.to_string())
    }

    #[test]
    fn doubling() {
        assert_eq!(rewrite(&bin(BinaryOp::Add, x(), x())).unwrap(), "2.0 * x");
        let i = Expression::identifier("i", Type::INT);
        assert_eq!(rewrite(&bin(BinaryOp::Add, i.clone(), i)).unwrap(), "2 * i");
    }

    #[test]
    fn coefficients_combine() {
        let e = bin(
            BinaryOp::Add,
            bin(BinaryOp::Multiply, Expression::float(2.0), x()),
            bin(BinaryOp::Multiply, Expression::float(3.0), x()),
        );
        assert_eq!(rewrite(&e).unwrap(), "(2.0 + 3.0) * x");

        let e = bin(
            BinaryOp::Add,
            x(),
            bin(BinaryOp::Multiply, Expression::float(3.0), x()),
        );
        assert_eq!(rewrite(&e).unwrap(), "(1.0 + 3.0) * x");

        let e = bin(
            BinaryOp::Subtract,
            bin(BinaryOp::Multiply, Expression::float(3.0), x()),
            x(),
        );
        assert_eq!(rewrite(&e).unwrap(), "(3.0 - 1.0) * x");
    }

    #[test]
    fn vector_terms() {
        let v = Expression::identifier("v", Type::vec(VectorSize::Tri));
        let e = bin(
            BinaryOp::Add,
            bin(BinaryOp::Multiply, x(), v.clone()),
            v,
        );
        assert_eq!(rewrite(&e).unwrap(), "(x + 1.0) * v");
    }

    #[test]
    fn difference_of_equal_terms() {
        assert_eq!(rewrite(&bin(BinaryOp::Subtract, x(), x())).unwrap(), "0.0");
    }

    #[test]
    fn unrelated_terms() {
        let y = Expression::identifier("y", Type::FLOAT);
        assert_eq!(rewrite(&bin(BinaryOp::Add, x(), y.clone())), None);
        let e = bin(
            BinaryOp::Add,
            bin(BinaryOp::Multiply, Expression::float(2.0), x()),
            bin(BinaryOp::Multiply, Expression::float(2.0), y),
        );
        assert_eq!(rewrite(&e), None);
    }
}
