//! Reassociation of commutative, associative operators.
//!
//! Moves literal factors to the left of products and turns right-nested
//! `+` and `*` chains into left-nested ones, so constants meet and fold:
//! `x * 2.0 * 3.0` and `2.0 * (3.0 * x)` both become `6.0 * x`.
//!
//! Matrix products are not commutative and are never touched. The
//! rewrite can change floating-point rounding.

use glslx_ir::{BinaryOp, Expression};

use crate::Rule;

/// Canonicalizes operand order and nesting of `+` and `*`.
#[derive(Debug)]
pub struct Reassociation;

impl Rule for Reassociation {
    fn name(&self) -> &str {
        "reassociation"
    }

    fn rewrite(&self, expr: &Expression) -> Option<Expression> {
        let (op, left, right) = expr.as_binary()?;
        if !matches!(op, BinaryOp::Add | BinaryOp::Multiply)
            || [&expr.ty, &left.ty, &right.ty].iter().any(|ty| ty.is_matrix())
        {
            return None;
        }

        if op == BinaryOp::Multiply && right.as_literal().is_some() && left.as_literal().is_none()
        {
            return Expression::binary(op, right.clone(), left.clone()).ok();
        }

        // a op (b op c) => (a op b) op c
        let (inner_op, b, c) = right.as_binary()?;
        if inner_op != op || b.ty.is_matrix() || c.ty.is_matrix() {
            return None;
        }
        let ab = Expression::binary(op, left.clone(), b.clone()).ok()?;
        Expression::binary(op, ab, c.clone()).ok()
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

    #[test]
    fn literal_factor_moves_left() {
        let e = bin(BinaryOp::Multiply, x(), Expression::float(2.0));
        assert_eq!(
            Reassociation.rewrite(&e).unwrap().to_string(),
            "2.0 * x"
        );
    }

    #[test]
    fn right_nested_chains_flatten() {
        let y = Expression::identifier("y", Type::FLOAT);
        let z = Expression::identifier("z", Type::FLOAT);
        let e = bin(BinaryOp::Add, x(), bin(BinaryOp::Add, y, z));
        let out = Reassociation.rewrite(&e).unwrap();
        assert_eq!(out.to_string(), "x + y + z");
        assert!(matches!(out.as_binary(), Some((BinaryOp::Add, l, _)) if l.as_binary().is_some()));
    }

    #[test]
    fn broadcasts_keep_their_type() {
        let v = Expression::identifier("v", Type::vec(VectorSize::Tri));
        let e = bin(
            BinaryOp::Multiply,
            Expression::float(2.0),
            bin(BinaryOp::Multiply, Expression::float(3.0), v),
        );
        let out = Reassociation.rewrite(&e).unwrap();
        assert_eq!(out.to_string(), "2.0 * 3.0 * v");
        assert_eq!(out.ty, Type::vec(VectorSize::Tri));
    }

    #[test]
    fn matrices_are_left_alone() {
        let m = Expression::identifier("m", Type::mat(VectorSize::Tri));
        let v = Expression::identifier("v", Type::vec(VectorSize::Tri));
        let e = bin(BinaryOp::Multiply, m.clone(), bin(BinaryOp::Multiply, m, v));
        assert_eq!(Reassociation.rewrite(&e), None);
        let m = Expression::identifier("m", Type::mat(VectorSize::Tri));
        let e = bin(BinaryOp::Multiply, m, Expression::float(2.0));
        assert_eq!(Reassociation.rewrite(&e), None);
    }
}
