//! Algebraic simplification of typed GLSL expressions.
//!
//! Provides a [`Rule`] trait, a [`Simplifier`] that applies rules
//! bottom-up until a fixed point, and the built-in rule set (constant
//! folding, algebraic identities, conditional elimination, reassociation
//! and like-term collection).
//!
//! Simplification is total: it never fails, and running it on its own
//! output changes nothing.

mod conditional;
mod const_fold;
mod identities;
mod like_terms;
mod reassociate;

pub use conditional::ConditionalElimination;
pub use const_fold::ConstantFolding;
pub use identities::AlgebraicIdentities;
pub use like_terms::LikeTerms;
pub use reassociate::Reassociation;

use std::fmt::Debug;

use glslx_ir::{Expression, Function, Module, Type};

/// A local rewrite applied at a single node.
pub trait Rule: Debug + Send + Sync {
    /// Human-readable name of the rule.
    fn name(&self) -> &str;

    /// The replacement for `expr`, if this rule matches at its root.
    /// Children have already been simplified.
    fn rewrite(&self, expr: &Expression) -> Option<Expression>;

    /// Rewrites `expr` in place. Returns `true` if anything changed.
    ///
    /// A replacement whose type differs from the node's is discarded.
    fn apply(&self, expr: &mut Expression) -> bool {
        match self.rewrite(expr) {
            Some(new) if new != *expr && (new.ty == expr.ty || expr.ty == Type::Unknown) => {
                *expr = new;
                true
            }
            _ => false,
        }
    }
}

/// Maximum number of full passes before giving up.
const MAX_ITERATIONS: usize = 64;

/// Applies a rule list bottom-up until a full pass changes nothing.
#[derive(Debug)]
pub struct Simplifier {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Simplifier {
    fn default() -> Self {
        let mut simplifier = Self::new();
        simplifier.add_rule(Box::new(ConstantFolding));
        simplifier.add_rule(Box::new(AlgebraicIdentities));
        simplifier.add_rule(Box::new(ConditionalElimination));
        simplifier.add_rule(Box::new(Reassociation));
        simplifier.add_rule(Box::new(LikeTerms));
        simplifier
    }
}

impl Simplifier {
    /// Creates a simplifier with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule. Rules run in insertion order at each node.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Names of the configured rules, in order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// One bottom-up pass. Returns the number of rewrites.
    fn pass(&self, expr: &mut Expression) -> usize {
        let mut rewrites = 0;
        for child in expr.children_mut() {
            rewrites += self.pass(child);
        }
        for rule in &self.rules {
            if rule.apply(expr) {
                log::trace!("{} fired", rule.name());
                rewrites += 1;
            }
        }
        rewrites
    }

    /// Simplifies `expr` in place. Returns `true` if anything changed.
    pub fn run(&self, expr: &mut Expression) -> bool {
        let mut total = 0;
        for iteration in 1..=MAX_ITERATIONS {
            let rewrites = self.pass(expr);
            if rewrites == 0 {
                if total > 0 {
                    log::debug!("simplified with {total} rewrite(s) in {iteration} pass(es)");
                }
                return total > 0;
            }
            total += rewrites;
        }
        log::warn!(
            "simplification did not reach a fixed point after {MAX_ITERATIONS} passes: {expr}"
        );
        true
    }

    /// Simplifies every expression in a function body.
    pub fn run_function(&self, func: &mut Function) -> bool {
        let mut changed = false;
        for stmt in &mut func.body {
            stmt.for_each_expression_mut(&mut |expr| changed |= self.run(expr));
        }
        changed
    }

    /// Simplifies every function body and global initializer of a module.
    pub fn run_module(&self, module: &mut Module) -> bool {
        let mut changed = false;
        for item in &mut module.items {
            match item {
                glslx_ir::Item::Function(func) => changed |= self.run_function(func),
                glslx_ir::Item::Global(var) => {
                    if let Some(init) = &mut var.init {
                        changed |= self.run(init);
                    }
                }
                glslx_ir::Item::Struct(_) => {}
            }
        }
        changed
    }
}

/// Simplifies an expression with the built-in rule set.
pub fn simplify(expr: &Expression) -> Expression {
    let mut expr = expr.clone();
    Simplifier::default().run(&mut expr);
    expr
}

/// Simplifies every expression of a function with the built-in rule set.
pub fn simplify_function(func: &Function) -> Function {
    let mut func = func.clone();
    Simplifier::default().run_function(&mut func);
    func
}

/// Simplifies a whole module with the built-in rule set.
pub fn simplify_module(module: &Module) -> Module {
    let mut module = module.clone();
    Simplifier::default().run_module(&mut module);
    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslx_ir::{BinaryOp, ExpressionKind, Statement, UnaryOp, VectorSize};

    fn x() -> Expression {
        Expression::identifier("x", Type::FLOAT)
    }

    fn bin(op: BinaryOp, l: Expression, r: Expression) -> Expression {
        Expression::binary(op, l, r).unwrap()
    }

    #[test]
    fn listed_examples() {
        let e = bin(BinaryOp::Multiply, x(), Expression::float(1.0));
        assert_eq!(simplify(&e), x());

        let y = Expression::identifier("y", Type::FLOAT);
        let e = bin(BinaryOp::Add, Expression::float(0.0), y.clone());
        assert_eq!(simplify(&e), y);

        let z = Expression::identifier("z", Type::FLOAT);
        let e = Expression::call("pow", vec![z.clone(), Expression::float(1.0)], Type::FLOAT);
        assert_eq!(simplify(&e), z);

        let e = bin(
            BinaryOp::Multiply,
            Expression::float(2.0),
            Expression::float(3.0),
        );
        assert_eq!(simplify(&e), Expression::float(6.0));
    }

    #[test]
    fn product_rule_shape_collapses() {
        // 1.0 * x + x * 1.0
        let e = bin(
            BinaryOp::Add,
            bin(BinaryOp::Multiply, Expression::float(1.0), x()),
            bin(BinaryOp::Multiply, x(), Expression::float(1.0)),
        );
        assert_eq!(simplify(&e).to_string(), "2.0 * x");
    }

    #[test]
    fn idempotent() {
        let v = Expression::identifier("v", Type::vec(VectorSize::Tri));
        let inputs = [
            bin(
                BinaryOp::Add,
                bin(BinaryOp::Multiply, x(), Expression::float(3.0)),
                bin(BinaryOp::Multiply, Expression::float(2.0), x()),
            ),
            bin(
                BinaryOp::Multiply,
                v.clone(),
                bin(BinaryOp::Multiply, Expression::float(2.0), x()),
            ),
            Expression::unary(UnaryOp::Negate, Expression::unary(UnaryOp::Negate, v).unwrap())
                .unwrap(),
            bin(
                BinaryOp::Subtract,
                Expression::float(0.0),
                bin(BinaryOp::Subtract, x(), Expression::float(-1.0)),
            ),
        ];
        for input in inputs {
            let once = simplify(&input);
            let twice = simplify(&once);
            assert_eq!(once, twice, "not idempotent on `{input}`");
        }
    }

    #[test]
    fn idempotent_on_nested_mixed_operators() {
        let y = || Expression::identifier("y", Type::FLOAT);
        let a = || Expression::identifier("a", Type::FLOAT);
        let two = || Expression::float(2.0);
        let one = || Expression::float(1.0);
        let inputs = [
            // x * (y * 2.0) + 2.0 * x * y
            bin(
                BinaryOp::Add,
                bin(BinaryOp::Multiply, x(), bin(BinaryOp::Multiply, y(), two())),
                bin(BinaryOp::Multiply, bin(BinaryOp::Multiply, two(), x()), y()),
            ),
            // (a + 1.0) - (1.0 + a)
            bin(
                BinaryOp::Subtract,
                bin(BinaryOp::Add, a(), one()),
                bin(BinaryOp::Add, one(), a()),
            ),
            // (x - y) * 2.0 + y * (2.0 - x)
            bin(
                BinaryOp::Add,
                bin(BinaryOp::Multiply, bin(BinaryOp::Subtract, x(), y()), two()),
                bin(BinaryOp::Multiply, y(), bin(BinaryOp::Subtract, two(), x())),
            ),
            // x / (2.0 * y) - -(x * 1.0)
            bin(
                BinaryOp::Subtract,
                bin(BinaryOp::Divide, x(), bin(BinaryOp::Multiply, two(), y())),
                Expression::unary(UnaryOp::Negate, bin(BinaryOp::Multiply, x(), one()))
                    .unwrap(),
            ),
            // x + x * x + (x + 1.0) * x
            bin(
                BinaryOp::Add,
                bin(BinaryOp::Add, x(), bin(BinaryOp::Multiply, x(), x())),
                bin(BinaryOp::Multiply, bin(BinaryOp::Add, x(), one()), x()),
            ),
        ];
        for input in inputs {
            let once = simplify(&input);
            let twice = simplify(&once);
            assert_eq!(once, twice, "not idempotent on `{input}`");
            assert_eq!(once.ty, input.ty);
        }
    }

    #[test]
    fn empty_simplifier_changes_nothing() {
        let e = bin(BinaryOp::Multiply, x(), Expression::float(1.0));
        let mut copy = e.clone();
        assert!(!Simplifier::new().run(&mut copy));
        assert_eq!(copy, e);
    }

    #[test]
    fn default_rule_order() {
        assert_eq!(
            Simplifier::default().rule_names(),
            [
                "constant-folding",
                "algebraic-identities",
                "conditional-elimination",
                "reassociation",
                "like-terms"
            ]
        );
    }

    #[test]
    fn simplifies_function_bodies() {
        let mut func = Function::new("f", Type::FLOAT);
        func.body = vec![
            Statement::Expression(Expression::new(
                ExpressionKind::Assign {
                    op: None,
                    target: Box::new(x()),
                    value: Box::new(bin(BinaryOp::Add, x(), Expression::float(0.0))),
                },
                Type::FLOAT,
            )),
            Statement::Return(Some(bin(
                BinaryOp::Divide,
                x(),
                Expression::float(1.0),
            ))),
        ];
        let out = simplify_function(&func);
        assert_eq!(out.body[1], Statement::Return(Some(x())));
        assert_eq!(out.body[0].to_string(), "x = x;");
    }
}
