//! Derivative rules for built-in functions.

use std::collections::HashMap;
use std::f32::consts::{LN_2, PI};
use std::sync::OnceLock;

use glslx_ir::{Builtin, Expression, Type};

use crate::derive::{
    add, call, divide, greater, less, multiply, negate, subtract, Derivation,
};
use crate::error::{DiffError, DiffErrorKind};

/// Computes the derivative of a call from its arguments.
pub(crate) type Rule = fn(&Derivation<'_>, &[Expression]) -> Result<Expression, DiffError>;

/// Built-in function to derivative rule.
#[derive(Debug)]
pub struct DerivativeTable {
    rules: HashMap<Builtin, Rule>,
}

impl DerivativeTable {
    pub fn new() -> Self {
        let entries: [(Builtin, Rule); 36] = [
            (Builtin::Sin, d_sin),
            (Builtin::Cos, d_cos),
            (Builtin::Tan, d_tan),
            (Builtin::Asin, d_asin),
            (Builtin::Acos, d_acos),
            (Builtin::Atan, d_atan),
            (Builtin::Sinh, d_sinh),
            (Builtin::Cosh, d_cosh),
            (Builtin::Tanh, d_tanh),
            (Builtin::Exp, d_exp),
            (Builtin::Exp2, d_exp2),
            (Builtin::Log, d_log),
            (Builtin::Log2, d_log2),
            (Builtin::Sqrt, d_sqrt),
            (Builtin::InverseSqrt, d_inversesqrt),
            (Builtin::Pow, d_pow),
            (Builtin::Abs, d_abs),
            (Builtin::Sign, d_piecewise_constant),
            (Builtin::Floor, d_piecewise_constant),
            (Builtin::Ceil, d_piecewise_constant),
            (Builtin::Round, d_piecewise_constant),
            (Builtin::Trunc, d_piecewise_constant),
            (Builtin::Step, d_piecewise_constant),
            (Builtin::Fract, d_fract),
            (Builtin::Radians, d_radians),
            (Builtin::Degrees, d_degrees),
            (Builtin::Min, d_min),
            (Builtin::Max, d_max),
            (Builtin::Clamp, d_clamp),
            (Builtin::Mix, d_mix),
            (Builtin::SmoothStep, d_smoothstep),
            (Builtin::Dot, d_dot),
            (Builtin::Length, d_length),
            (Builtin::Distance, d_distance),
            (Builtin::Cross, d_cross),
            (Builtin::Normalize, d_normalize),
        ];
        Self {
            rules: entries.into_iter().collect(),
        }
    }

    /// The process-wide table.
    pub fn shared() -> &'static Self {
        static TABLE: OnceLock<DerivativeTable> = OnceLock::new();
        TABLE.get_or_init(Self::new)
    }

    /// Returns `true` if `builtin` has a derivative rule.
    pub fn contains(&self, builtin: Builtin) -> bool {
        self.rules.contains_key(&builtin)
    }

    pub(crate) fn rule(&self, builtin: Builtin) -> Option<Rule> {
        self.rules.get(&builtin).copied()
    }
}

impl Default for DerivativeTable {
    fn default() -> Self {
        Self::new()
    }
}

fn float(value: f32) -> Expression {
    Expression::float(value)
}

/// `f(u)` with the result type of `u`.
fn apply(builtin: Builtin, u: &Expression) -> Expression {
    call(builtin, vec![u.clone()], u.ty.clone())
}

fn unary_argument<'e>(builtin: Builtin, args: &'e [Expression]) -> Result<&'e Expression, DiffError> {
    match args {
        [u] => Ok(u),
        _ => Err(missing(builtin)),
    }
}

fn missing(builtin: Builtin) -> DiffError {
    DiffError::new(DiffErrorKind::MissingRule(builtin.name().into()), "")
}

fn scalar_only(builtin: Builtin) -> DiffError {
    DiffError::unsupported(format!("`{}` of non-scalar arguments", builtin.name()), "")
}

/// `f'(u) * du` for single-argument built-ins.
fn chain(
    d: &Derivation<'_>,
    builtin: Builtin,
    args: &[Expression],
    outer: impl FnOnce(&Expression) -> Result<Expression, DiffError>,
) -> Result<Expression, DiffError> {
    let u = unary_argument(builtin, args)?;
    multiply(outer(u)?, d.derive(u)?)
}

fn d_sin(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Sin, args, |u| Ok(apply(Builtin::Cos, u)))
}

fn d_cos(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Cos, args, |u| negate(apply(Builtin::Sin, u)))
}

fn d_tan(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let u = unary_argument(Builtin::Tan, args)?;
    let cos = apply(Builtin::Cos, u);
    divide(d.derive(u)?, multiply(cos.clone(), cos)?)
}

/// `sqrt(1 - u * u)`
fn unit_root(u: &Expression) -> Result<Expression, DiffError> {
    let inner = subtract(float(1.0), multiply(u.clone(), u.clone())?)?;
    Ok(apply(Builtin::Sqrt, &inner))
}

fn d_asin(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let u = unary_argument(Builtin::Asin, args)?;
    divide(d.derive(u)?, unit_root(u)?)
}

fn d_acos(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let u = unary_argument(Builtin::Acos, args)?;
    negate(divide(d.derive(u)?, unit_root(u)?)?)
}

fn d_atan(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let u = unary_argument(Builtin::Atan, args)?;
    divide(
        d.derive(u)?,
        add(float(1.0), multiply(u.clone(), u.clone())?)?,
    )
}

fn d_sinh(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Sinh, args, |u| Ok(apply(Builtin::Cosh, u)))
}

fn d_cosh(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Cosh, args, |u| Ok(apply(Builtin::Sinh, u)))
}

fn d_tanh(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Tanh, args, |u| {
        let tanh = apply(Builtin::Tanh, u);
        subtract(float(1.0), multiply(tanh.clone(), tanh)?)
    })
}

fn d_exp(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Exp, args, |u| Ok(apply(Builtin::Exp, u)))
}

fn d_exp2(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Exp2, args, |u| {
        multiply(float(LN_2), apply(Builtin::Exp2, u))
    })
}

fn d_log(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let u = unary_argument(Builtin::Log, args)?;
    divide(d.derive(u)?, u.clone())
}

fn d_log2(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let u = unary_argument(Builtin::Log2, args)?;
    divide(d.derive(u)?, multiply(u.clone(), float(LN_2))?)
}

fn d_sqrt(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let u = unary_argument(Builtin::Sqrt, args)?;
    divide(d.derive(u)?, multiply(float(2.0), apply(Builtin::Sqrt, u))?)
}

fn d_inversesqrt(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let u = unary_argument(Builtin::InverseSqrt, args)?;
    let scaled = multiply(float(-0.5), d.derive(u)?)?;
    divide(
        multiply(scaled, apply(Builtin::InverseSqrt, u))?,
        u.clone(),
    )
}

fn d_pow(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let [u, v] = args else {
        return Err(missing(Builtin::Pow));
    };
    let pow = |exponent: Expression| call(Builtin::Pow, vec![u.clone(), exponent], u.ty.clone());
    let mut terms = Vec::with_capacity(2);
    if d.depends(u) {
        let lowered = subtract(v.clone(), float(1.0))?;
        terms.push(multiply(
            multiply(v.clone(), pow(lowered))?,
            d.derive(u)?,
        )?);
    }
    if d.depends(v) {
        terms.push(multiply(
            multiply(apply(Builtin::Log, u), pow(v.clone()))?,
            d.derive(v)?,
        )?);
    }
    sum(d, terms, &u.ty)
}

fn d_abs(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Abs, args, |u| Ok(apply(Builtin::Sign, u)))
}

/// Zero almost everywhere.
fn d_piecewise_constant(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let value = args.last().ok_or_else(|| missing(Builtin::Step))?;
    d.zero(&value.ty)
}

fn d_fract(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    d.derive(unary_argument(Builtin::Fract, args)?)
}

fn d_radians(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Radians, args, |_| Ok(float(PI / 180.0)))
}

fn d_degrees(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    chain(d, Builtin::Degrees, args, |_| Ok(float(180.0 / PI)))
}

fn select(
    condition: Expression,
    accept: Expression,
    reject: Expression,
) -> Result<Expression, DiffError> {
    Ok(Expression::conditional(condition, accept, reject)?)
}

fn d_min(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let [u, v] = args else {
        return Err(missing(Builtin::Min));
    };
    if !u.ty.is_scalar() || !v.ty.is_scalar() {
        return Err(scalar_only(Builtin::Min));
    }
    select(less(u.clone(), v.clone())?, d.derive(u)?, d.derive(v)?)
}

fn d_max(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let [u, v] = args else {
        return Err(missing(Builtin::Max));
    };
    if !u.ty.is_scalar() || !v.ty.is_scalar() {
        return Err(scalar_only(Builtin::Max));
    }
    select(greater(u.clone(), v.clone())?, d.derive(u)?, d.derive(v)?)
}

fn d_clamp(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let [u, lo, hi] = args else {
        return Err(missing(Builtin::Clamp));
    };
    if !u.ty.is_scalar() {
        return Err(scalar_only(Builtin::Clamp));
    }
    let inner = select(greater(u.clone(), hi.clone())?, d.derive(hi)?, d.derive(u)?)?;
    select(less(u.clone(), lo.clone())?, d.derive(lo)?, inner)
}

fn d_mix(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let [a, b, t] = args else {
        return Err(missing(Builtin::Mix));
    };
    let mut terms = Vec::with_capacity(3);
    if d.depends(a) {
        terms.push(multiply(d.derive(a)?, subtract(float(1.0), t.clone())?)?);
    }
    if d.depends(b) {
        terms.push(multiply(d.derive(b)?, t.clone())?);
    }
    if d.depends(t) {
        terms.push(multiply(subtract(b.clone(), a.clone())?, d.derive(t)?)?);
    }
    sum(d, terms, &a.ty)
}

fn d_smoothstep(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let [edge0, edge1, u] = args else {
        return Err(missing(Builtin::SmoothStep));
    };
    if d.depends(edge0) || d.depends(edge1) {
        return Err(DiffError::unsupported("`smoothstep` with variable edges", ""));
    }
    let width = subtract(edge1.clone(), edge0.clone())?;
    let scaled = divide(subtract(u.clone(), edge0.clone())?, width.clone())?;
    let ty = scaled.ty.clone();
    let t = call(Builtin::Clamp, vec![scaled, float(0.0), float(1.0)], ty);
    let slope = multiply(
        multiply(float(6.0), t.clone())?,
        subtract(float(1.0), t)?,
    )?;
    divide(multiply(slope, d.derive(u)?)?, width)
}

fn d_dot(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let [u, v] = args else {
        return Err(missing(Builtin::Dot));
    };
    let product = |a: Expression, b: Expression| {
        if d.scalar_variable() {
            Ok(call(Builtin::Dot, vec![a, b], Type::FLOAT))
        } else {
            multiply(a, b)
        }
    };
    let mut terms = Vec::with_capacity(2);
    if d.depends(u) {
        terms.push(product(d.derive(u)?, v.clone())?);
    }
    if d.depends(v) {
        terms.push(product(u.clone(), d.derive(v)?)?);
    }
    sum(d, terms, &Type::FLOAT)
}

fn length_of(d: &Derivation<'_>, u: &Expression) -> Result<Expression, DiffError> {
    let direction = apply(Builtin::Normalize, u);
    let du = d.derive(u)?;
    if d.scalar_variable() {
        Ok(call(Builtin::Dot, vec![direction, du], Type::FLOAT))
    } else {
        multiply(direction, du)
    }
}

fn d_length(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    length_of(d, unary_argument(Builtin::Length, args)?)
}

fn d_distance(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let [u, v] = args else {
        return Err(missing(Builtin::Distance));
    };
    length_of(d, &subtract(u.clone(), v.clone())?)
}

fn d_cross(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let [u, v] = args else {
        return Err(missing(Builtin::Cross));
    };
    if !d.scalar_variable() {
        return Err(DiffError::unsupported("`cross` with respect to a vector", ""));
    }
    let cross = |a: Expression, b: Expression| call(Builtin::Cross, vec![a, b], u.ty.clone());
    let mut terms = Vec::with_capacity(2);
    if d.depends(u) {
        terms.push(cross(d.derive(u)?, v.clone()));
    }
    if d.depends(v) {
        terms.push(cross(u.clone(), d.derive(v)?));
    }
    sum(d, terms, &u.ty)
}

fn d_normalize(d: &Derivation<'_>, args: &[Expression]) -> Result<Expression, DiffError> {
    let u = unary_argument(Builtin::Normalize, args)?;
    if !d.scalar_variable() {
        return Err(DiffError::unsupported("`normalize` with respect to a vector", ""));
    }
    let n = apply(Builtin::Normalize, u);
    let du = d.derive(u)?;
    let along = call(Builtin::Dot, vec![n.clone(), du.clone()], Type::FLOAT);
    let tangent = subtract(du, multiply(n, along)?)?;
    divide(tangent, call(Builtin::Length, vec![u.clone()], Type::FLOAT))
}

/// Adds up derivative terms; no terms means a zero of `ty`'s derivative.
fn sum(d: &Derivation<'_>, terms: Vec<Expression>, ty: &Type) -> Result<Expression, DiffError> {
    let mut terms = terms.into_iter();
    match terms.next() {
        Some(first) => terms.try_fold(first, add),
        None => d.zero(ty),
    }
}
