//! Conditional elimination.

use glslx_ir::{Expression, ExpressionKind, Literal};

use crate::Rule;

/// Replaces `c ? a : b` by the taken branch when `c` is a literal, and by
/// `a` when both branches are identical.
#[derive(Debug)]
pub struct ConditionalElimination;

impl Rule for ConditionalElimination {
    fn name(&self) -> &str {
        "conditional-elimination"
    }

    fn rewrite(&self, expr: &Expression) -> Option<Expression> {
        let ExpressionKind::Conditional {
            condition,
            accept,
            reject,
        } = &expr.kind
        else {
            return None;
        };
        match condition.as_literal() {
            Some(Literal::Bool(true)) => Some((**accept).clone()),
            Some(Literal::Bool(false)) => Some((**reject).clone()),
            _ if accept == reject => Some((**accept).clone()),
            _ => None,
        }
    }
}
