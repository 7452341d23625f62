//! Symbolic differentiation of simple GLSL functions.
//!
//! A function is simple when its body reduces to a single returned
//! expression (see [`reduce_to_expression`]). [`differentiate`] produces
//! the simplified derivative of that expression with respect to one
//! parameter; [`differentiate_module`] does so for every parameter of
//! every function and emits `dd<param>_<function>` definitions.

mod derive;
mod error;
mod module;
mod reduce;
mod table;

pub use derive::{derivative_name, derivative_type};
pub use error::{DiffError, DiffErrorKind, ModuleError};
pub use module::{differentiate_module, DerivativeOptions, DerivedModule, InputHandling, Skipped};
pub use reduce::reduce_to_expression;
pub use table::DerivativeTable;

use std::collections::{HashMap, HashSet};

use glslx_ir::{Expression, Function, Module, ParameterQualifier, Type};

use crate::derive::Derivation;

/// User functions whose calls can be differentiated with the chain rule.
///
/// A function qualifies when its result and every parameter are `float`
/// inputs; the call `g(a, b)` then differentiates to
/// `dda_g(a, b) * da + ddb_g(a, b) * db`.
#[derive(Clone, Debug, Default)]
pub struct Differentiator {
    functions: HashMap<String, Vec<String>>,
    /// Derivative functions known not to exist, by derivative name.
    missing: HashSet<String>,
}

impl Differentiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every qualifying function of `module`.
    pub fn for_module(module: &Module) -> Self {
        let mut differentiator = Self::new();
        for func in module.functions() {
            differentiator.register(func);
        }
        differentiator
    }

    /// Registers `func` if it qualifies. Returns `true` if it did.
    pub fn register(&mut self, func: &Function) -> bool {
        let qualifies = func.result == Type::FLOAT
            && !func.arguments.is_empty()
            && func
                .arguments
                .iter()
                .all(|arg| arg.ty == Type::FLOAT && arg.qualifier == ParameterQualifier::In);
        if qualifies {
            let parameters = func.arguments.iter().map(|arg| arg.name.clone()).collect();
            self.functions.insert(func.name.clone(), parameters);
        }
        qualifies
    }

    /// Marks the derivative of `function` with respect to `parameter`
    /// as unavailable. Calls that need it then fail to differentiate
    /// instead of referring to a function that is never emitted.
    pub fn unregister_derivative(&mut self, function: &str, parameter: &str) {
        self.missing.insert(derivative_name(parameter, function));
    }

    pub(crate) fn parameters(&self, function: &str) -> Option<&[String]> {
        self.functions.get(function).map(Vec::as_slice)
    }

    pub(crate) fn has_derivative(&self, function: &str, parameter: &str) -> bool {
        !self.missing.contains(&derivative_name(parameter, function))
    }
}

/// The simplified derivative of an annotated function with respect to
/// the parameter `wrt`.
///
/// The result has the type given by [`derivative_type`] for the
/// function's result and the parameter's type.
pub fn differentiate(
    func: &Function,
    wrt: &str,
    differentiator: &Differentiator,
) -> Result<Expression, DiffError> {
    let parameter = func.argument(wrt).ok_or_else(|| {
        DiffError::new(DiffErrorKind::UnknownParameter(wrt.into()), &func.name)
    })?;
    if parameter.qualifier != ParameterQualifier::In {
        return Err(DiffError::unsupported(
            format!("derivative with respect to `{}` parameter", parameter.qualifier),
            &func.name,
        ));
    }
    let target = derivative_type(&func.result, &parameter.ty).ok_or_else(|| {
        DiffError::unsupported(
            format!(
                "derivative of `{}` with respect to `{}`",
                func.result, parameter.ty
            ),
            &func.name,
        )
    })?;

    let body = reduce_to_expression(func)?;
    let raw = Derivation::new(wrt, parameter.ty.clone(), differentiator).derive(&body)?;
    let derivative = glslx_opt::simplify(&raw);
    log::debug!(
        "d{}/d{wrt}: {} nodes, {} after simplification",
        func.name,
        raw.node_count(),
        derivative.node_count()
    );
    Ok(coerce(derivative, &target))
}

/// Broadcasts a scalar derivative to the vector type it stands for.
fn coerce(expr: Expression, target: &Type) -> Expression {
    if expr.ty.is_scalar() && target.is_vector() {
        Expression::call(target.to_string(), vec![expr], target.clone())
    } else {
        expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslx_ir::{BinaryOp, FunctionArgument, Statement, VectorSize};

    fn square() -> Function {
        let x = Expression::identifier("x", Type::FLOAT);
        Function {
            name: "square".into(),
            arguments: vec![FunctionArgument::new("x", Type::FLOAT)],
            result: Type::FLOAT,
            body: vec![Statement::Return(Some(
                Expression::binary(BinaryOp::Multiply, x.clone(), x).unwrap(),
            ))],
        }
    }

    #[test]
    fn registers_float_functions_only() {
        let mut differentiator = Differentiator::new();
        assert!(differentiator.register(&square()));
        let mut vector = square();
        vector.name = "v".into();
        vector.arguments[0].ty = Type::vec(VectorSize::Tri);
        assert!(!differentiator.register(&vector));
        assert_eq!(differentiator.parameters("square"), Some(&["x".to_string()][..]));
        assert_eq!(differentiator.parameters("v"), None);
    }

    #[test]
    fn unknown_parameter() {
        let err = differentiate(&square(), "y", &Differentiator::new()).unwrap_err();
        assert_eq!(err.kind, DiffErrorKind::UnknownParameter("y".into()));
        assert_eq!(err.node, "square");
    }

    #[test]
    fn out_parameter() {
        let mut func = square();
        func.arguments[0].qualifier = ParameterQualifier::Out;
        let err = differentiate(&func, "x", &Differentiator::new()).unwrap_err();
        assert!(matches!(err.kind, DiffErrorKind::Unsupported(_)));
    }

    #[test]
    fn chain_through_user_function() {
        let x = Expression::identifier("x", Type::FLOAT);
        let sin = Expression::call("sin", vec![x], Type::FLOAT);
        let call = Expression::call("square", vec![sin], Type::FLOAT);
        let func = Function {
            name: "f".into(),
            arguments: vec![FunctionArgument::new("x", Type::FLOAT)],
            result: Type::FLOAT,
            body: vec![Statement::Return(Some(call))],
        };
        let mut differentiator = Differentiator::new();
        differentiator.register(&square());
        let d = differentiate(&func, "x", &differentiator).unwrap();
        assert_eq!(d.to_string(), "ddx_square(sin(x)) * cos(x)");
    }

    #[test]
    fn scalar_result_is_broadcast() {
        let coerced = coerce(Expression::float(0.0), &Type::vec(VectorSize::Bi));
        assert_eq!(coerced.to_string(), "vec2(0.0)");
        assert_eq!(coerced.ty, Type::vec(VectorSize::Bi));
    }
}
