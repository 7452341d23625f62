//! Structural differentiation of a reduced expression.
//!
//! Vectors are differentiated component-wise: the derivative of a vector
//! with respect to a vector is the diagonal of the Jacobian, and mixing
//! components (swizzles that move a component, cross products, matrix
//! products) is rejected unless the variable is a scalar.

use glslx_ir::{
    BinaryOp, Builtin, Expression, ExpressionKind, Literal, ScalarKind, Type, UnaryOp,
};

use crate::error::{DiffError, DiffErrorKind};
use crate::table::DerivativeTable;
use crate::Differentiator;

/// The type of `d(value)/d(variable)`, or `None` if the pair would need
/// a Jacobian or is not differentiable at all.
pub fn derivative_type(value: &Type, variable: &Type) -> Option<Type> {
    let value = match value {
        Type::Matrix { .. } => value.clone(),
        other => other.with_kind(ScalarKind::Float)?,
    };
    match (&value, variable) {
        (Type::Scalar(_), Type::Scalar(ScalarKind::Float)) => Some(Type::FLOAT),
        (Type::Scalar(_), Type::Vector { size, kind: ScalarKind::Float }) => {
            Some(Type::vec(*size))
        }
        (Type::Vector { size, .. }, Type::Scalar(ScalarKind::Float)) => Some(Type::vec(*size)),
        (Type::Vector { size: a, .. }, Type::Vector { size: b, kind: ScalarKind::Float })
            if a == b =>
        {
            Some(Type::vec(*a))
        }
        (Type::Matrix { .. }, Type::Scalar(ScalarKind::Float)) => Some(value.clone()),
        _ => None,
    }
}

/// Differentiates expressions with respect to one variable.
pub(crate) struct Derivation<'a> {
    wrt: &'a str,
    wrt_ty: Type,
    differentiator: &'a Differentiator,
}

impl<'a> Derivation<'a> {
    pub(crate) fn new(wrt: &'a str, wrt_ty: Type, differentiator: &'a Differentiator) -> Self {
        Self {
            wrt,
            wrt_ty,
            differentiator,
        }
    }

    /// Returns `true` if the differentiation variable is a scalar.
    pub(crate) fn scalar_variable(&self) -> bool {
        self.wrt_ty.is_scalar()
    }

    /// Returns `true` if `expr` mentions the differentiation variable.
    pub(crate) fn depends(&self, expr: &Expression) -> bool {
        expr.references(self.wrt)
    }

    /// The unsimplified derivative of `expr`.
    pub(crate) fn derive(&self, expr: &Expression) -> Result<Expression, DiffError> {
        self.derive_node(expr).map_err(|err| err.locate(expr))
    }

    /// The zero derivative of a value of type `ty`.
    pub(crate) fn zero(&self, ty: &Type) -> Result<Expression, DiffError> {
        derivative_type(ty, &self.wrt_ty)
            .and_then(|ty| Expression::zero(&ty))
            .ok_or_else(|| self.jacobian(ty))
    }

    fn jacobian(&self, ty: &Type) -> DiffError {
        DiffError::unsupported(
            format!("derivative of `{ty}` with respect to `{}`", self.wrt_ty),
            "",
        )
    }

    fn derive_node(&self, expr: &Expression) -> Result<Expression, DiffError> {
        if !self.depends(expr) {
            return self.zero(&expr.ty);
        }
        match &expr.kind {
            ExpressionKind::Identifier(_) => {
                Expression::one(&self.wrt_ty).ok_or_else(|| self.jacobian(&self.wrt_ty))
            }
            ExpressionKind::Unary {
                op: UnaryOp::Negate,
                expr: operand,
            } => Ok(negate(self.derive(operand)?)?),
            ExpressionKind::Binary { op, left, right } => self.derive_binary(*op, left, right),
            ExpressionKind::Field { base, field } => self.derive_field(base, field),
            ExpressionKind::Index { base, index } => self.derive_index(base, index),
            ExpressionKind::Conditional {
                condition,
                accept,
                reject,
            } => {
                let condition = glslx_opt::simplify(condition);
                match condition.as_literal() {
                    Some(Literal::Bool(true)) => self.derive(accept),
                    Some(Literal::Bool(false)) => self.derive(reject),
                    _ => Err(DiffError::unsupported(
                        "conditional on a non-constant condition",
                        expr,
                    )),
                }
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => self.derive_call(expr, function, arguments),
            ExpressionKind::Unary { op, .. } => {
                Err(DiffError::unsupported(format!("operator `{op}`"), expr))
            }
            ExpressionKind::Assign { .. } => Err(DiffError::unsupported("assignment", expr)),
            ExpressionKind::Literal(_) => self.zero(&expr.ty),
        }
    }

    fn derive_binary(
        &self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<Expression, DiffError> {
        match op {
            BinaryOp::Add | BinaryOp::Subtract => {
                Ok(binary(op, self.derive(left)?, self.derive(right)?)?)
            }
            BinaryOp::Multiply => {
                if (left.ty.is_matrix() || right.ty.is_matrix()) && !self.scalar_variable() {
                    return Err(DiffError::unsupported(
                        "matrix product with respect to a vector",
                        "",
                    ));
                }
                match (self.depends(left), self.depends(right)) {
                    (false, _) => Ok(multiply(left.clone(), self.derive(right)?)?),
                    (_, false) => Ok(multiply(self.derive(left)?, right.clone())?),
                    _ => Ok(add(
                        multiply(self.derive(left)?, right.clone())?,
                        multiply(left.clone(), self.derive(right)?)?,
                    )?),
                }
            }
            BinaryOp::Divide => {
                if !self.depends(right) {
                    return Ok(divide(self.derive(left)?, right.clone())?);
                }
                let denominator = multiply(right.clone(), right.clone())?;
                if !self.depends(left) {
                    let numerator = multiply(left.clone(), self.derive(right)?)?;
                    return Ok(negate(divide(numerator, denominator)?)?);
                }
                let numerator = subtract(
                    multiply(self.derive(left)?, right.clone())?,
                    multiply(left.clone(), self.derive(right)?)?,
                )?;
                Ok(divide(numerator, denominator)?)
            }
            _ => Err(DiffError::unsupported(format!("operator `{op}`"), "")),
        }
    }

    fn derive_field(&self, base: &Expression, field: &str) -> Result<Expression, DiffError> {
        let Type::Vector { size, .. } = base.ty else {
            return Err(DiffError::unsupported("struct member access", ""));
        };
        let swizzle = glslx_ir::Swizzle::parse(field)?;
        let db = self.derive(base)?;
        if self.scalar_variable() {
            return Ok(Expression::field(db, field)?);
        }
        if swizzle.is_identity(size) {
            return Ok(db);
        }
        match swizzle.pattern.as_slice() {
            [component] => self.select_component(db, component.index()),
            _ => Err(DiffError::unsupported("swizzle that mixes components", "")),
        }
    }

    fn derive_index(&self, base: &Expression, index: &Expression) -> Result<Expression, DiffError> {
        let component = match index.as_literal() {
            Some(Literal::Int(i)) if base.ty.is_vector() && i >= 0 => i as usize,
            _ => return Err(DiffError::unsupported("dynamic or non-vector indexing", "")),
        };
        let db = self.derive(base)?;
        if self.scalar_variable() {
            Ok(Expression::index(db, index.clone())?)
        } else {
            self.select_component(db, component)
        }
    }

    /// `d(v[i])/dx` for a vector variable: the gradient keeps only the
    /// `i`-th component of the component-wise derivative of `v`.
    fn select_component(&self, db: Expression, component: usize) -> Result<Expression, DiffError> {
        let size = self
            .wrt_ty
            .vector_size()
            .filter(|size| component < size.count())
            .ok_or_else(|| DiffError::unsupported("component outside the variable", ""))?;
        let picked = match db.splat_value() {
            Some(value) => Expression::float(value as f32),
            None => Expression::index(db, Expression::int(component as i32))?,
        };
        let arguments = (0..size.count())
            .map(|i| {
                if i == component {
                    picked.clone()
                } else {
                    Expression::float(0.0)
                }
            })
            .collect();
        let ty = Type::vec(size);
        Ok(Expression::call(ty.to_string(), arguments, ty))
    }

    fn derive_call(
        &self,
        expr: &Expression,
        function: &str,
        arguments: &[Expression],
    ) -> Result<Expression, DiffError> {
        if let Some(ty) = Type::from_glsl_name(function) {
            return self.derive_constructor(&ty, arguments);
        }
        if let Some(builtin) = Builtin::from_name(function) {
            let rule = DerivativeTable::shared()
                .rule(builtin)
                .ok_or_else(|| DiffError::new(DiffErrorKind::MissingRule(function.into()), ""))?;
            return rule(self, arguments);
        }
        if let Some(parameters) = self.differentiator.parameters(function) {
            return self.chain_user_function(expr, function, parameters, arguments);
        }
        Err(DiffError::unsupported(
            format!("call to `{function}`"),
            "",
        ))
    }

    fn derive_constructor(
        &self,
        ty: &Type,
        arguments: &[Expression],
    ) -> Result<Expression, DiffError> {
        match ty {
            Type::Scalar(ScalarKind::Float) => match arguments {
                [value] => self.derive(value),
                _ => Err(DiffError::unsupported("constructor arity", "")),
            },
            Type::Vector {
                kind: ScalarKind::Float,
                ..
            }
            | Type::Matrix { .. }
                if self.scalar_variable() =>
            {
                let derived = arguments
                    .iter()
                    .map(|arg| self.derive(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expression::call(ty.to_string(), derived, ty.clone()))
            }
            _ => Err(DiffError::unsupported(
                format!("`{ty}` constructor with respect to `{}`", self.wrt_ty),
                "",
            )),
        }
    }

    /// Chain rule through the derivative functions the module pass emits:
    /// `d g(a, b) = ddp_g(a, b) * da + ddq_g(a, b) * db`.
    fn chain_user_function(
        &self,
        expr: &Expression,
        function: &str,
        parameters: &[String],
        arguments: &[Expression],
    ) -> Result<Expression, DiffError> {
        if parameters.len() != arguments.len() {
            return Err(DiffError::unsupported("overloaded user function", ""));
        }
        let mut total: Option<Expression> = None;
        for (parameter, argument) in parameters.iter().zip(arguments) {
            if !self.depends(argument) {
                continue;
            }
            if !self.differentiator.has_derivative(function, parameter) {
                return Err(DiffError::unsupported(
                    format!(
                        "`{}` could not be derived",
                        derivative_name(parameter, function)
                    ),
                    expr,
                ));
            }
            let partial = Expression::call(
                derivative_name(parameter, function),
                arguments.to_vec(),
                Type::FLOAT,
            );
            let term = multiply(partial, self.derive(argument)?)?;
            total = Some(match total {
                Some(sum) => add(sum, term)?,
                None => term,
            });
        }
        match total {
            Some(total) => Ok(total),
            None => self.zero(&expr.ty),
        }
    }
}

/// Name of the derivative of `function` with respect to `parameter`.
pub fn derivative_name(parameter: &str, function: &str) -> String {
    format!("dd{parameter}_{function}")
}

pub(crate) fn binary(
    op: BinaryOp,
    left: Expression,
    right: Expression,
) -> Result<Expression, DiffError> {
    Ok(Expression::binary(op, left, right)?)
}

pub(crate) fn add(left: Expression, right: Expression) -> Result<Expression, DiffError> {
    binary(BinaryOp::Add, left, right)
}

pub(crate) fn subtract(left: Expression, right: Expression) -> Result<Expression, DiffError> {
    binary(BinaryOp::Subtract, left, right)
}

pub(crate) fn multiply(left: Expression, right: Expression) -> Result<Expression, DiffError> {
    binary(BinaryOp::Multiply, left, right)
}

pub(crate) fn divide(left: Expression, right: Expression) -> Result<Expression, DiffError> {
    binary(BinaryOp::Divide, left, right)
}

pub(crate) fn negate(expr: Expression) -> Result<Expression, DiffError> {
    Ok(Expression::unary(UnaryOp::Negate, expr)?)
}

pub(crate) fn less(left: Expression, right: Expression) -> Result<Expression, DiffError> {
    binary(BinaryOp::Less, left, right)
}

pub(crate) fn greater(left: Expression, right: Expression) -> Result<Expression, DiffError> {
    binary(BinaryOp::Greater, left, right)
}

/// A built-in call with an explicit result type.
pub(crate) fn call(builtin: Builtin, arguments: Vec<Expression>, ty: Type) -> Expression {
    Expression::call(builtin.name(), arguments, ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslx_ir::VectorSize;

    fn float(name: &str) -> Expression {
        Expression::identifier(name, Type::FLOAT)
    }

    fn vec3(name: &str) -> Expression {
        Expression::identifier(name, Type::vec(VectorSize::Tri))
    }

    fn derive(expr: &Expression, wrt: &str, ty: Type) -> Result<Expression, DiffError> {
        let differentiator = Differentiator::new();
        Derivation::new(wrt, ty, &differentiator).derive(expr)
    }

    #[test]
    fn shapes() {
        let v3 = Type::vec(VectorSize::Tri);
        assert_eq!(derivative_type(&Type::FLOAT, &Type::FLOAT), Some(Type::FLOAT));
        assert_eq!(derivative_type(&Type::FLOAT, &v3), Some(v3.clone()));
        assert_eq!(derivative_type(&v3, &Type::FLOAT), Some(v3.clone()));
        assert_eq!(derivative_type(&v3, &v3), Some(v3.clone()));
        assert_eq!(derivative_type(&v3, &Type::vec(VectorSize::Bi)), None);
        assert_eq!(derivative_type(&Type::FLOAT, &Type::INT), None);
        assert_eq!(derivative_type(&Type::mat(VectorSize::Tri), &v3), None);
    }

    #[test]
    fn unrelated_identifier_is_zero() {
        let d = derive(&float("a"), "x", Type::FLOAT).unwrap();
        assert!(d.is_zero());
        let d = derive(&float("a"), "x", Type::vec(VectorSize::Tri)).unwrap();
        assert_eq!(d.to_string(), "vec3(0.0)");
    }

    #[test]
    fn product_rule() {
        let e = Expression::binary(BinaryOp::Multiply, float("x"), float("x")).unwrap();
        let d = derive(&e, "x", Type::FLOAT).unwrap();
        assert_eq!(d.to_string(), "1.0 * x + x * 1.0");
    }

    #[test]
    fn constant_factor_shortcut() {
        let e = Expression::binary(BinaryOp::Multiply, float("a"), float("x")).unwrap();
        let d = derive(&e, "x", Type::FLOAT).unwrap();
        assert_eq!(d.to_string(), "a * 1.0");
    }

    #[test]
    fn quotient_with_constant_numerator() {
        let e = Expression::binary(BinaryOp::Divide, Expression::float(1.0), float("x")).unwrap();
        let d = derive(&e, "x", Type::FLOAT).unwrap();
        assert_eq!(d.to_string(), "-(1.0 * 1.0 / (x * x))");
    }

    #[test]
    fn component_of_vector_variable() {
        let e = Expression::field(vec3("p"), "y").unwrap();
        let d = derive(&e, "p", Type::vec(VectorSize::Tri)).unwrap();
        assert_eq!(d.to_string(), "vec3(0.0, 1.0, 0.0)");
    }

    #[test]
    fn mixing_swizzle_is_rejected() {
        let e = Expression::field(vec3("p"), "zyx").unwrap();
        let err = derive(&e, "p", Type::vec(VectorSize::Tri)).unwrap_err();
        assert!(matches!(err.kind, DiffErrorKind::Unsupported(_)));
        assert_eq!(err.node, "p.zyx");
    }

    #[test]
    fn comparison_is_unsupported() {
        let e = Expression::binary(BinaryOp::Less, float("x"), Expression::float(1.0)).unwrap();
        let err = derive(&e, "x", Type::FLOAT).unwrap_err();
        assert!(matches!(err.kind, DiffErrorKind::Unsupported(_)));
    }

    #[test]
    fn vector_constructor_with_scalar_variable() {
        let e = Expression::call(
            "vec2",
            vec![float("x"), float("a")],
            Type::vec(VectorSize::Bi),
        );
        let d = derive(&e, "x", Type::FLOAT).unwrap();
        assert_eq!(d.to_string(), "vec2(1.0, 0.0)");
    }
}
