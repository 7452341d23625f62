//! Statements: declarations, control flow and expression statements.

use crate::expr::Expression;
use crate::types::Type;

/// A block of statements.
pub type Block = Vec<Statement>;

/// A statement in a function body.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// Declare a local variable, optionally initialized.
    Declaration {
        name: String,
        ty: Type,
        init: Option<Expression>,
    },
    /// Evaluate an expression (usually an assignment or a call).
    Expression(Expression),
    /// Return from the function.
    Return(Option<Expression>),
    /// Conditional branch. An empty `reject` block means no `else`.
    If {
        condition: Expression,
        accept: Block,
        reject: Block,
    },
    /// `for (init; condition; step) body`; a `while` loop has neither
    /// `init` nor `step`.
    Loop {
        init: Option<Box<Statement>>,
        condition: Option<Expression>,
        step: Option<Expression>,
        body: Block,
    },
    /// A nested scope.
    Block(Block),
    /// Break out of the innermost loop.
    Break,
    /// Continue to the next iteration of the innermost loop.
    Continue,
}

impl Statement {
    /// Visits every expression owned by this statement and nested
    /// statements, outermost first.
    pub fn for_each_expression_mut(&mut self, f: &mut impl FnMut(&mut Expression)) {
        match self {
            Self::Declaration { init, .. } => {
                if let Some(init) = init {
                    f(init);
                }
            }
            Self::Expression(expr) => f(expr),
            Self::Return(value) => {
                if let Some(value) = value {
                    f(value);
                }
            }
            Self::If {
                condition,
                accept,
                reject,
            } => {
                f(condition);
                for stmt in accept.iter_mut().chain(reject.iter_mut()) {
                    stmt.for_each_expression_mut(f);
                }
            }
            Self::Loop {
                init,
                condition,
                step,
                body,
            } => {
                if let Some(init) = init {
                    init.for_each_expression_mut(f);
                }
                if let Some(condition) = condition {
                    f(condition);
                }
                if let Some(step) = step {
                    f(step);
                }
                for stmt in body {
                    stmt.for_each_expression_mut(f);
                }
            }
            Self::Block(block) => {
                for stmt in block {
                    stmt.for_each_expression_mut(f);
                }
            }
            Self::Break | Self::Continue => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_if_statement() {
        let stmt = Statement::If {
            condition: Expression::bool(true),
            accept: vec![Statement::Return(Some(Expression::float(1.0)))],
            reject: vec![],
        };
        if let Statement::If { accept, reject, .. } = &stmt {
            assert_eq!(accept.len(), 1);
            assert!(reject.is_empty());
        } else {
            panic!("expected If");
        }
    }

    #[test]
    fn visits_nested_expressions() {
        let mut stmt = Statement::Loop {
            init: Some(Box::new(Statement::Declaration {
                name: "i".into(),
                ty: Type::INT,
                init: Some(Expression::int(0)),
            })),
            condition: Some(Expression::bool(true)),
            step: None,
            body: vec![Statement::Block(vec![Statement::Expression(
                Expression::int(3),
            )])],
        };
        let mut count = 0;
        stmt.for_each_expression_mut(&mut |_| count += 1);
        assert_eq!(count, 3);
    }
}
