//! Reduction of a function body to a single return expression.
//!
//! Local declarations and assignments to plain variables are substituted
//! into later statements, nested blocks are spliced in, and `if`
//! statements whose condition simplifies to a literal are replaced by the
//! branch taken.

use std::collections::HashMap;

use glslx_ir::{BinaryOp, Block, Expression, ExpressionKind, Function, Literal, Statement, Type};

use crate::error::{DiffError, DiffErrorKind};

/// Current values of the variables in scope, innermost scope last.
///
/// A local declared without an initializer maps to `None` until its
/// first assignment. Parameters are only present once reassigned.
#[derive(Debug, Default)]
struct Env {
    scopes: Vec<HashMap<String, Option<Expression>>>,
}

impl Env {
    fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    fn lookup(&self, name: &str) -> Option<&Option<Expression>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn declare(&mut self, name: &str, value: Option<Expression>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    /// Rebinds the innermost variable called `name`, or records a
    /// reassigned parameter in the outermost scope.
    fn assign(&mut self, name: &str, value: Expression) {
        let scope = match self.scopes.iter().rposition(|scope| scope.contains_key(name)) {
            Some(index) => &mut self.scopes[index],
            None => &mut self.scopes[0],
        };
        scope.insert(name.to_string(), Some(value));
    }

    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Replaces bound identifiers by their current values.
    fn substitute(&self, expr: &Expression) -> Result<Expression, DiffError> {
        if let ExpressionKind::Identifier(name) = &expr.kind {
            match self.lookup(name) {
                Some(Some(value)) => return Ok(value.clone()),
                Some(None) => {
                    return Err(DiffError::new(
                        DiffErrorKind::NonSimpleFunction(format!(
                            "`{name}` is read before it is assigned"
                        )),
                        expr,
                    ));
                }
                None => {}
            }
        }
        let mut expr = expr.clone();
        for child in expr.children_mut() {
            *child = self.substitute(child)?;
        }
        Ok(expr)
    }
}

/// The expression `func` returns, with every local inlined.
pub fn reduce_to_expression(func: &Function) -> Result<Expression, DiffError> {
    let mut env = Env::new();
    reduce_block(&func.body, &mut env)?.ok_or_else(|| {
        DiffError::new(
            DiffErrorKind::NonSimpleFunction("missing return statement".into()),
            &func.name,
        )
    })
}

/// Wraps `value` in a constructor when its type differs from the
/// variable's (`float y = 1;`).
fn convert(value: Expression, ty: &Type) -> Expression {
    if value.ty == *ty {
        value
    } else {
        Expression::call(ty.to_string(), vec![value], ty.clone())
    }
}

fn reduce_scope(block: &Block, env: &mut Env) -> Result<Option<Expression>, DiffError> {
    env.push();
    let result = reduce_block(block, env);
    env.pop();
    result
}

fn reduce_block(block: &Block, env: &mut Env) -> Result<Option<Expression>, DiffError> {
    for stmt in block {
        match stmt {
            Statement::Declaration { name, ty, init } => {
                let value = match init {
                    Some(init) => Some(convert(env.substitute(init)?, ty)),
                    None => None,
                };
                env.declare(name, value);
            }
            Statement::Expression(expr) => assign(expr, env)?,
            Statement::Return(Some(value)) => return env.substitute(value).map(Some),
            Statement::Block(inner) => {
                if let Some(value) = reduce_scope(inner, env)? {
                    return Ok(Some(value));
                }
            }
            Statement::If {
                condition,
                accept,
                reject,
            } => {
                let condition = glslx_opt::simplify(&env.substitute(condition)?);
                let taken = match condition.as_literal() {
                    Some(Literal::Bool(true)) => accept,
                    Some(Literal::Bool(false)) => reject,
                    _ => {
                        return Err(DiffError::unsupported(
                            "branch on a non-constant condition",
                            format!("if ({condition})"),
                        ));
                    }
                };
                if let Some(value) = reduce_scope(taken, env)? {
                    return Ok(Some(value));
                }
            }
            Statement::Loop { .. } => {
                return Err(DiffError::unsupported("loops", first_line(stmt)));
            }
            other => {
                return Err(DiffError::new(
                    DiffErrorKind::NonSimpleFunction("statement cannot be inlined".into()),
                    first_line(other),
                ));
            }
        }
    }
    Ok(None)
}

/// Applies `y = e`, `y += e`, `y -= e`, `y *= e` or `y /= e` to the
/// environment. Other expression statements cannot be inlined.
fn assign(expr: &Expression, env: &mut Env) -> Result<(), DiffError> {
    let not_simple = || {
        DiffError::new(
            DiffErrorKind::NonSimpleFunction("statement cannot be inlined".into()),
            format!("{expr};"),
        )
    };
    let ExpressionKind::Assign { op, target, value } = &expr.kind else {
        return Err(not_simple());
    };
    let ExpressionKind::Identifier(name) = &target.kind else {
        return Err(not_simple());
    };
    let value = env.substitute(value)?;
    let value = match op {
        None => value,
        Some(
            op @ (BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide),
        ) => {
            let current = env.substitute(target)?;
            Expression::binary(*op, current, value).map_err(|e| DiffError::from(e).locate(expr))?
        }
        Some(_) => return Err(not_simple()),
    };
    env.assign(name, convert(value, &target.ty));
    Ok(())
}

fn first_line(stmt: &Statement) -> String {
    stmt.to_string().lines().next().unwrap_or_default().to_string()
}
