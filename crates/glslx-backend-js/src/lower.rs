//! Lowering of annotated GLSL trees to the JavaScript tree.
//!
//! Scalars become JavaScript numbers and booleans; float vectors and
//! square matrices become gl-matrix values. Aggregates are copied
//! whenever an lvalue flows into a new binding so that GLSL value
//! semantics survive JavaScript's reference semantics.

use std::collections::{HashMap, HashSet};

use glslx_ir::{
    BinaryOp, Builtin, Expression, ExpressionKind, Function, Item, Literal, Module,
    ParameterQualifier, ScalarKind, Statement, StorageQualifier, StructMember, Swizzle, Type,
    UnaryOp, VectorSize,
};

use crate::ast::{JsBinaryOp, JsExpr, JsFunction, JsItem, JsModule, JsParam, JsStmt, JsUnaryOp};
use crate::error::{LoweringError, LoweringErrorKind};
use crate::runtime::{self, RuntimeCall};

/// Words GLSL allows as identifiers but JavaScript does not, plus the
/// names the preamble binds.
const RESERVED: &[&str] = &[
    "arguments", "await", "case", "catch", "class", "debugger", "default", "delete",
    "enum", "eval", "export", "extends", "finally", "function", "implements", "import",
    "in", "Infinity", "instanceof", "interface", "let", "Math", "NaN", "new", "null",
    "package", "private", "protected", "public", "static", "super", "switch", "this",
    "throw", "try", "typeof", "undefined", "var", "with", "yield", "glsl", "vec2", "vec3",
    "vec4", "mat2", "mat3", "mat4", "Float32Array", "structuredClone",
];

/// The JavaScript spelling of a GLSL identifier.
pub fn mangle(name: &str) -> String {
    if RESERVED.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Runtime representation of a GLSL value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    Number,
    Boolean,
    Vector(VectorSize),
    Matrix(VectorSize),
    /// Arrays and structs: plain JavaScript arrays and objects.
    Aggregate,
}

fn shape(ty: &Type) -> Option<Shape> {
    match ty {
        Type::Scalar(ScalarKind::Bool) => Some(Shape::Boolean),
        Type::Scalar(_) => Some(Shape::Number),
        Type::Vector {
            size,
            kind: ScalarKind::Float,
        } => Some(Shape::Vector(*size)),
        Type::Matrix { columns, rows } if columns == rows => Some(Shape::Matrix(*columns)),
        Type::Array { base, .. } => shape(base).map(|_| Shape::Aggregate),
        Type::Struct { .. } => Some(Shape::Aggregate),
        _ => None,
    }
}

/// The JSDoc type of a GLSL type.
fn doc_type(ty: &Type) -> Option<String> {
    Some(match shape(ty)? {
        Shape::Number => "number".into(),
        Shape::Boolean => "boolean".into(),
        Shape::Vector(_) | Shape::Matrix(_) => ty.to_string(),
        Shape::Aggregate => match ty {
            Type::Array { base, .. } => format!("Array<{}>", doc_type(base)?),
            Type::Struct { name, .. } => name.clone(),
            _ => return None,
        },
    })
}

fn vector_ns(size: VectorSize) -> String {
    format!("vec{}", size.count())
}

fn matrix_ns(size: VectorSize) -> String {
    format!("mat{}", size.count())
}

/// `ns.name(args...)`
fn runtime_call(ns: &str, name: &str, arguments: Vec<JsExpr>) -> JsExpr {
    JsExpr::call(format!("{ns}.{name}"), arguments)
}

/// `ns.name(ns.create(), args...)`
fn out_call(ns: &str, name: &str, arguments: Vec<JsExpr>) -> JsExpr {
    let mut all = Vec::with_capacity(arguments.len() + 1);
    all.push(runtime_call(ns, "create", vec![]));
    all.extend(arguments);
    runtime_call(ns, name, all)
}

fn splat(size: VectorSize, value: JsExpr) -> JsExpr {
    JsExpr::call("glsl.splat", vec![JsExpr::int(size.count() as i64), value])
}

/// A fresh copy of a value of the given shape.
fn copy(shape: Shape, value: JsExpr) -> JsExpr {
    match shape {
        Shape::Vector(size) => runtime_call(&vector_ns(size), "clone", vec![value]),
        Shape::Matrix(size) => runtime_call(&matrix_ns(size), "clone", vec![value]),
        Shape::Aggregate => JsExpr::call("structuredClone", vec![value]),
        Shape::Number | Shape::Boolean => value,
    }
}

fn unsupported(what: impl Into<String>, node: impl ToString) -> LoweringError {
    LoweringError::new(LoweringErrorKind::UnsupportedConstruct(what.into()), node)
}

fn unrepresentable(ty: &Type, node: impl ToString) -> LoweringError {
    LoweringError::new(LoweringErrorKind::UnrepresentableType(ty.clone()), node)
}

fn shape_of(expr: &Expression) -> Result<Shape, LoweringError> {
    shape(&expr.ty).ok_or_else(|| unrepresentable(&expr.ty, expr))
}

/// Lowering state shared by the functions of one module.
#[derive(Debug, Default)]
struct Lowerer {
    /// Struct members by struct name, for default values.
    structs: HashMap<String, Vec<StructMember>>,
}

impl Lowerer {
    /// Members of a struct type, looking up the declaration when the
    /// type is a by-name reference.
    fn members<'a>(&'a self, name: &str, members: &'a [StructMember]) -> &'a [StructMember] {
        match self.structs.get(name) {
            Some(declared) if members.is_empty() => declared,
            _ => members,
        }
    }

    fn expression(&self, expr: &Expression) -> Result<JsExpr, LoweringError> {
        if expr.ty != Type::Void {
            shape_of(expr)?;
        }
        match &expr.kind {
            ExpressionKind::Literal(lit) => Ok(match *lit {
                Literal::Bool(value) => JsExpr::Bool(value),
                Literal::Int(value) => JsExpr::int(value.into()),
                Literal::Float(value) => JsExpr::float(value),
            }),
            ExpressionKind::Identifier(name) => Ok(JsExpr::Ident(mangle(name))),
            ExpressionKind::Field { base, field } => {
                let object = self.expression(base)?;
                if !base.ty.is_vector() {
                    return Ok(JsExpr::member(object, field.as_str()));
                }
                let swizzle = Swizzle::parse(field).map_err(|e| unsupported(e.to_string(), expr))?;
                Ok(match swizzle.pattern.as_slice() {
                    [component] => JsExpr::index(object, JsExpr::int(component.index() as i64)),
                    pattern => {
                        let mut arguments = vec![object];
                        arguments.extend(pattern.iter().map(|c| JsExpr::int(c.index() as i64)));
                        JsExpr::call("glsl.swizzle", arguments)
                    }
                })
            }
            ExpressionKind::Index { base, index } => {
                let object = self.expression(base)?;
                let index = self.expression(index)?;
                match shape_of(base)? {
                    Shape::Matrix(size) => Ok(JsExpr::call(
                        "glsl.column",
                        vec![object, JsExpr::int(size.count() as i64), index],
                    )),
                    _ => Ok(JsExpr::index(object, index)),
                }
            }
            ExpressionKind::Unary { op, expr: operand } => {
                let value = self.expression(operand)?;
                Ok(match (op, shape_of(operand)?) {
                    (UnaryOp::Not, _) => JsExpr::unary(JsUnaryOp::Not, value),
                    (UnaryOp::Negate, Shape::Vector(size)) => {
                        out_call(&vector_ns(size), "negate", vec![value])
                    }
                    (UnaryOp::Negate, Shape::Matrix(size)) => {
                        out_call(&matrix_ns(size), "multiplyScalar", vec![value, JsExpr::int(-1)])
                    }
                    (UnaryOp::Negate, _) => JsExpr::unary(JsUnaryOp::Minus, value),
                })
            }
            ExpressionKind::Binary { op, left, right } => self.binary(expr, *op, left, right),
            ExpressionKind::Call {
                function,
                arguments,
            } => self.call(expr, function, arguments),
            ExpressionKind::Conditional {
                condition,
                accept,
                reject,
            } => Ok(JsExpr::conditional(
                self.expression(condition)?,
                self.value(accept)?,
                self.value(reject)?,
            )),
            ExpressionKind::Assign { op, target, value } => {
                self.assignment(expr, *op, target, value)
            }
        }
    }

    /// Lowers `expr` for storage in a new binding, copying aggregates
    /// that would otherwise alias an existing variable.
    fn value(&self, expr: &Expression) -> Result<JsExpr, LoweringError> {
        let lowered = self.expression(expr)?;
        let fresh = match &expr.kind {
            ExpressionKind::Field { base, .. } => base.ty.is_vector(),
            ExpressionKind::Index { base, .. } => base.ty.is_matrix(),
            _ => false,
        };
        if !expr.is_lvalue() || fresh {
            return Ok(lowered);
        }
        Ok(copy(shape_of(expr)?, lowered))
    }

    fn binary(
        &self,
        expr: &Expression,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<JsExpr, LoweringError> {
        let (ls, rs) = (shape_of(left)?, shape_of(right)?);
        let (l, r) = (self.expression(left)?, self.expression(right)?);
        let native = match op {
            BinaryOp::LogicalAnd => Some(JsBinaryOp::And),
            BinaryOp::LogicalOr => Some(JsBinaryOp::Or),
            BinaryOp::Less => Some(JsBinaryOp::Lt),
            BinaryOp::LessEqual => Some(JsBinaryOp::Le),
            BinaryOp::Greater => Some(JsBinaryOp::Gt),
            BinaryOp::GreaterEqual => Some(JsBinaryOp::Ge),
            BinaryOp::Equal if matches!(ls, Shape::Number | Shape::Boolean) => {
                Some(JsBinaryOp::StrictEq)
            }
            BinaryOp::NotEqual if matches!(ls, Shape::Number | Shape::Boolean) => {
                Some(JsBinaryOp::StrictNe)
            }
            _ => None,
        };
        if let Some(js_op) = native {
            return Ok(JsExpr::binary(js_op, l, r));
        }
        if !matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) {
            return self.arithmetic(expr, op, (ls, l), (rs, r));
        }
        let equal = match ls {
            Shape::Vector(size) => runtime_call(&vector_ns(size), "exactEquals", vec![l, r]),
            Shape::Matrix(size) => runtime_call(&matrix_ns(size), "exactEquals", vec![l, r]),
            _ => return Err(unsupported("comparison of arrays or structs", expr)),
        };
        Ok(if op == BinaryOp::Equal {
            equal
        } else {
            JsExpr::unary(JsUnaryOp::Not, equal)
        })
    }

    fn arithmetic(
        &self,
        expr: &Expression,
        op: BinaryOp,
        (ls, l): (Shape, JsExpr),
        (rs, r): (Shape, JsExpr),
    ) -> Result<JsExpr, LoweringError> {
        let component_wise = match op {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            _ => "",
        };
        let reciprocal = |value| JsExpr::binary(JsBinaryOp::Div, JsExpr::int(1), value);
        let lowered = match (ls, rs) {
            (Shape::Number, Shape::Number) => {
                let js_op = match op {
                    BinaryOp::Add => JsBinaryOp::Add,
                    BinaryOp::Subtract => JsBinaryOp::Sub,
                    BinaryOp::Multiply => JsBinaryOp::Mul,
                    BinaryOp::Divide => JsBinaryOp::Div,
                    _ => JsBinaryOp::Rem,
                };
                let value = JsExpr::binary(js_op, l, r);
                if op == BinaryOp::Divide && expr.ty == Type::INT {
                    JsExpr::call("Math.trunc", vec![value])
                } else {
                    value
                }
            }
            (Shape::Vector(size), Shape::Vector(_)) if !component_wise.is_empty() => {
                out_call(&vector_ns(size), component_wise, vec![l, r])
            }
            (Shape::Vector(size), Shape::Number) => match op {
                BinaryOp::Multiply => out_call(&vector_ns(size), "scale", vec![l, r]),
                BinaryOp::Divide => out_call(&vector_ns(size), "scale", vec![l, reciprocal(r)]),
                BinaryOp::Add | BinaryOp::Subtract => {
                    out_call(&vector_ns(size), component_wise, vec![l, splat(size, r)])
                }
                _ => return Err(unsupported(format!("operator `{op}`"), expr)),
            },
            (Shape::Number, Shape::Vector(size)) => match op {
                BinaryOp::Multiply => out_call(&vector_ns(size), "scale", vec![r, l]),
                BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Divide => {
                    out_call(&vector_ns(size), component_wise, vec![splat(size, l), r])
                }
                _ => return Err(unsupported(format!("operator `{op}`"), expr)),
            },
            (Shape::Matrix(size), Shape::Vector(_)) if op == BinaryOp::Multiply => {
                let n = size.count();
                out_call(&vector_ns(size), &format!("transformMat{n}"), vec![r, l])
            }
            (Shape::Vector(size), Shape::Matrix(_)) if op == BinaryOp::Multiply => {
                let n = size.count();
                let transposed = out_call(&matrix_ns(size), "transpose", vec![r]);
                out_call(&vector_ns(size), &format!("transformMat{n}"), vec![l, transposed])
            }
            (Shape::Matrix(size), Shape::Matrix(_)) => match op {
                BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply => {
                    out_call(&matrix_ns(size), component_wise, vec![l, r])
                }
                _ => return Err(unsupported("component-wise matrix division", expr)),
            },
            (Shape::Matrix(size), Shape::Number) => match op {
                BinaryOp::Multiply => out_call(&matrix_ns(size), "multiplyScalar", vec![l, r]),
                BinaryOp::Divide => {
                    out_call(&matrix_ns(size), "multiplyScalar", vec![l, reciprocal(r)])
                }
                _ => return Err(unsupported(format!("matrix `{op}` scalar"), expr)),
            },
            (Shape::Number, Shape::Matrix(size)) if op == BinaryOp::Multiply => {
                out_call(&matrix_ns(size), "multiplyScalar", vec![r, l])
            }
            _ => return Err(unsupported(format!("operator `{op}` on these operands"), expr)),
        };
        Ok(lowered)
    }

    fn call(
        &self,
        expr: &Expression,
        function: &str,
        arguments: &[Expression],
    ) -> Result<JsExpr, LoweringError> {
        if let Some(ty) = Type::from_glsl_name(function) {
            return self.constructor(expr, &ty, arguments);
        }
        if let Some(builtin) = Builtin::from_name(function) {
            return self.builtin(expr, builtin, arguments);
        }
        if let Type::Struct { name, members } = &expr.ty {
            if name == function {
                let properties = self
                    .members(name, members)
                    .iter()
                    .zip(arguments)
                    .map(|(member, arg)| Ok((member.name.clone(), self.value(arg)?)))
                    .collect::<Result<Vec<_>, LoweringError>>()?;
                return Ok(JsExpr::Object(properties));
            }
        }
        let arguments = arguments
            .iter()
            .map(|arg| self.expression(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(JsExpr::call(mangle(function), arguments))
    }

    fn constructor(
        &self,
        expr: &Expression,
        ty: &Type,
        arguments: &[Expression],
    ) -> Result<JsExpr, LoweringError> {
        let shapes = arguments
            .iter()
            .map(shape_of)
            .collect::<Result<Vec<_>, _>>()?;
        let mut lowered = arguments
            .iter()
            .map(|arg| self.expression(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let target = shape(ty).ok_or_else(|| unrepresentable(ty, expr))?;

        match (target, shapes.as_slice()) {
            (Shape::Number | Shape::Boolean, [source]) => {
                let value = lowered.remove(0);
                // The first component of a vector, or m[0][0] of a matrix.
                let value = match source {
                    Shape::Vector(_) | Shape::Matrix(_) => JsExpr::index(value, JsExpr::int(0)),
                    _ => value,
                };
                let source_kind = arguments[0].ty.scalar_kind();
                Ok(match (ty.scalar_kind(), source_kind) {
                    (Some(ScalarKind::Bool), Some(ScalarKind::Bool)) => value,
                    (Some(ScalarKind::Bool), _) => {
                        JsExpr::binary(JsBinaryOp::StrictNe, value, JsExpr::int(0))
                    }
                    (_, Some(ScalarKind::Bool)) => {
                        JsExpr::conditional(value, JsExpr::int(1), JsExpr::int(0))
                    }
                    (Some(ScalarKind::Int), Some(ScalarKind::Float)) => {
                        JsExpr::call("Math.trunc", vec![value])
                    }
                    _ => value,
                })
            }
            (Shape::Vector(size), [Shape::Number]) => Ok(splat(size, lowered.remove(0))),
            (Shape::Vector(size), [Shape::Vector(source)]) if *source == size => {
                Ok(copy(target, lowered.remove(0)))
            }
            (Shape::Vector(size), all)
                if all.len() == size.count() && all.iter().all(|s| *s == Shape::Number) =>
            {
                Ok(runtime_call(&vector_ns(size), "fromValues", lowered))
            }
            (Shape::Vector(size), _) => {
                lowered.insert(0, JsExpr::int(size.count() as i64));
                Ok(JsExpr::call("glsl.vector", lowered))
            }
            (Shape::Matrix(size), [Shape::Number]) => Ok(JsExpr::call(
                "glsl.matrix",
                vec![JsExpr::int(size.count() as i64), lowered.remove(0)],
            )),
            (Shape::Matrix(size), [Shape::Matrix(source)]) => Ok(if *source == size {
                copy(target, lowered.remove(0))
            } else {
                JsExpr::call(
                    "glsl.resize",
                    vec![
                        JsExpr::int(size.count() as i64),
                        JsExpr::int(source.count() as i64),
                        lowered.remove(0),
                    ],
                )
            }),
            (Shape::Matrix(size), all)
                if all.len() == size.count() * size.count()
                    && all.iter().all(|s| *s == Shape::Number) =>
            {
                Ok(runtime_call(&matrix_ns(size), "fromValues", lowered))
            }
            (Shape::Matrix(size), _) => {
                lowered.insert(0, JsExpr::int(size.count() as i64));
                Ok(JsExpr::call("glsl.matrix", lowered))
            }
            _ => Err(unsupported(format!("`{ty}` constructor"), expr)),
        }
    }

    fn builtin(
        &self,
        expr: &Expression,
        builtin: Builtin,
        arguments: &[Expression],
    ) -> Result<JsExpr, LoweringError> {
        let shapes = arguments
            .iter()
            .map(shape_of)
            .collect::<Result<Vec<_>, _>>()?;
        let operand = shapes
            .iter()
            .copied()
            .find(|s| matches!(s, Shape::Matrix(_)))
            .or_else(|| shapes.iter().copied().find(|s| matches!(s, Shape::Vector(_))))
            .unwrap_or(Shape::Number);
        let mapping = runtime::mapping(builtin);
        let unmapped =
            || LoweringError::new(LoweringErrorKind::UnmappedBuiltin(builtin.name().into()), expr);
        let call = match operand {
            Shape::Matrix(_) => mapping.matrix,
            Shape::Vector(_) => mapping.vector,
            _ => mapping.scalar,
        }
        .ok_or_else(unmapped)?;

        let mut lowered = arguments
            .iter()
            .map(|arg| self.expression(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match (call, operand) {
            (RuntimeCall::Function(path), _) => JsExpr::call(path, lowered),
            (RuntimeCall::Map(path), _) => {
                lowered.insert(0, JsExpr::ident(path));
                JsExpr::call("glsl.map", lowered)
            }
            (RuntimeCall::VectorOut(name), Shape::Vector(size)) => {
                let lowered = lowered
                    .into_iter()
                    .zip(&shapes)
                    .map(|(arg, s)| if *s == Shape::Number { splat(size, arg) } else { arg })
                    .collect();
                out_call(&vector_ns(size), name, lowered)
            }
            (RuntimeCall::VectorValue(name), Shape::Vector(size)) => {
                runtime_call(&vector_ns(size), name, lowered)
            }
            (RuntimeCall::MatrixOut(name), Shape::Matrix(size)) => {
                out_call(&matrix_ns(size), name, lowered)
            }
            (RuntimeCall::MatrixValue(name), Shape::Matrix(size)) => {
                runtime_call(&matrix_ns(size), name, lowered)
            }
            _ => return Err(unmapped()),
        })
    }

    fn assignment(
        &self,
        expr: &Expression,
        op: Option<BinaryOp>,
        target: &Expression,
        value: &Expression,
    ) -> Result<JsExpr, LoweringError> {
        // Compound assignment to a number stays native, except integer
        // division which must truncate.
        let native = shape_of(target)? == Shape::Number
            && shape_of(value)? == Shape::Number
            && target.swizzle().map_or(true, |s| s.len() == 1)
            && !(op == Some(BinaryOp::Divide) && target.ty == Type::INT);
        match op {
            None => self.store(expr, target, self.value(value)?),
            Some(op) if native => {
                let js_op = match op {
                    BinaryOp::Add => JsBinaryOp::Add,
                    BinaryOp::Subtract => JsBinaryOp::Sub,
                    BinaryOp::Multiply => JsBinaryOp::Mul,
                    BinaryOp::Divide => JsBinaryOp::Div,
                    _ => JsBinaryOp::Rem,
                };
                Ok(JsExpr::assign(
                    Some(js_op),
                    self.place(target)?,
                    self.expression(value)?,
                ))
            }
            Some(op) => {
                let combined = Expression::binary(op, target.clone(), value.clone())
                    .map_err(|e| unsupported(e.to_string(), expr))?;
                let combined = self.expression(&combined)?;
                self.store(expr, target, combined)
            }
        }
    }

    /// Writes `value` to the storage `target` denotes.
    fn store(
        &self,
        expr: &Expression,
        target: &Expression,
        value: JsExpr,
    ) -> Result<JsExpr, LoweringError> {
        match &target.kind {
            ExpressionKind::Field { base, field } if base.ty.is_vector() => {
                let swizzle = Swizzle::parse(field).map_err(|e| unsupported(e.to_string(), expr))?;
                let object = self.place(base)?;
                Ok(match swizzle.pattern.as_slice() {
                    [component] => JsExpr::assign(
                        None,
                        JsExpr::index(object, JsExpr::int(component.index() as i64)),
                        value,
                    ),
                    pattern => JsExpr::call(
                        "glsl.assignSwizzle",
                        vec![
                            object,
                            JsExpr::Array(
                                pattern.iter().map(|c| JsExpr::int(c.index() as i64)).collect(),
                            ),
                            value,
                        ],
                    ),
                })
            }
            ExpressionKind::Index { base, index } if base.ty.is_matrix() => {
                let rows = shape_of(base)?;
                let Shape::Matrix(size) = rows else {
                    return Err(unrepresentable(&base.ty, expr));
                };
                Ok(JsExpr::call(
                    "glsl.setColumn",
                    vec![
                        self.place(base)?,
                        JsExpr::int(size.count() as i64),
                        self.expression(index)?,
                        value,
                    ],
                ))
            }
            _ => Ok(JsExpr::assign(None, self.place(target)?, value)),
        }
    }

    /// The JavaScript lvalue for a GLSL lvalue that names whole storage.
    fn place(&self, target: &Expression) -> Result<JsExpr, LoweringError> {
        match &target.kind {
            ExpressionKind::Identifier(name) => Ok(JsExpr::Ident(mangle(name))),
            ExpressionKind::Field { base, field } if !base.ty.is_vector() => {
                Ok(JsExpr::member(self.place(base)?, field.as_str()))
            }
            ExpressionKind::Field { base, field } => match Swizzle::parse(field) {
                Ok(swizzle) if swizzle.len() == 1 => Ok(JsExpr::index(
                    self.place(base)?,
                    JsExpr::int(swizzle.pattern[0].index() as i64),
                )),
                _ => Err(unsupported("write through a multi-component swizzle", target)),
            },
            ExpressionKind::Index { base, index } => match &base.kind {
                // m[c][r] is element c * rows + r of the column-major array.
                ExpressionKind::Index {
                    base: matrix,
                    index: column,
                } if matrix.ty.is_matrix() => {
                    let Some(Shape::Matrix(size)) = shape(&matrix.ty) else {
                        return Err(unrepresentable(&matrix.ty, target));
                    };
                    let n = size.count() as i64;
                    let element = match (column.as_literal(), index.as_literal()) {
                        (Some(Literal::Int(c)), Some(Literal::Int(r))) => {
                            JsExpr::int(i64::from(c) * n + i64::from(r))
                        }
                        _ => JsExpr::binary(
                            JsBinaryOp::Add,
                            JsExpr::binary(JsBinaryOp::Mul, self.expression(column)?, JsExpr::int(n)),
                            self.expression(index)?,
                        ),
                    };
                    Ok(JsExpr::index(self.place(matrix)?, element))
                }
                _ if base.ty.is_matrix() => {
                    Err(unsupported("matrix column used as storage", target))
                }
                _ => Ok(JsExpr::index(self.place(base)?, self.expression(index)?)),
            },
            _ => Err(unsupported("assignment target", target)),
        }
    }

    fn default_value(&self, ty: &Type, node: &str) -> Result<JsExpr, LoweringError> {
        match ty {
            Type::Array { base, size } => {
                let element = self.default_value(base, node)?;
                Ok(JsExpr::Array(vec![element; *size as usize]))
            }
            Type::Struct { name, members } => {
                let properties = self
                    .members(name, members)
                    .iter()
                    .map(|m| Ok((m.name.clone(), self.default_value(&m.ty, node)?)))
                    .collect::<Result<Vec<_>, LoweringError>>()?;
                Ok(JsExpr::Object(properties))
            }
            _ => match shape(ty).ok_or_else(|| unrepresentable(ty, node))? {
                Shape::Number => Ok(JsExpr::int(0)),
                Shape::Boolean => Ok(JsExpr::Bool(false)),
                Shape::Vector(size) => Ok(runtime_call(&vector_ns(size), "create", vec![])),
                Shape::Matrix(size) => Ok(runtime_call(&matrix_ns(size), "create", vec![])),
                Shape::Aggregate => Err(unrepresentable(ty, node)),
            },
        }
    }

    fn block(&self, block: &[Statement]) -> Result<Vec<JsStmt>, LoweringError> {
        block.iter().map(|stmt| self.statement(stmt)).collect()
    }

    fn statement(&self, stmt: &Statement) -> Result<JsStmt, LoweringError> {
        Ok(match stmt {
            Statement::Declaration { name, ty, init } => {
                if doc_type(ty).is_none() {
                    return Err(unrepresentable(ty, name));
                }
                let init = match init {
                    Some(init) => self.value(init)?,
                    None => self.default_value(ty, name)?,
                };
                JsStmt::Let {
                    name: mangle(name),
                    init,
                }
            }
            Statement::Expression(expr) => JsStmt::Expr(self.expression(expr)?),
            Statement::Return(value) => {
                JsStmt::Return(value.as_ref().map(|v| self.value(v)).transpose()?)
            }
            Statement::If {
                condition,
                accept,
                reject,
            } => JsStmt::If {
                condition: self.expression(condition)?,
                accept: self.block(accept)?,
                reject: self.block(reject)?,
            },
            Statement::Loop {
                init,
                condition,
                step,
                body,
            } => JsStmt::For {
                init: init
                    .as_deref()
                    .map(|s| self.statement(s).map(Box::new))
                    .transpose()?,
                condition: condition.as_ref().map(|c| self.expression(c)).transpose()?,
                step: step.as_ref().map(|s| self.expression(s)).transpose()?,
                body: self.block(body)?,
            },
            Statement::Block(block) => JsStmt::Block(self.block(block)?),
            Statement::Break => JsStmt::Break,
            Statement::Continue => JsStmt::Continue,
        })
    }

    fn function(&self, func: &Function) -> Result<JsFunction, LoweringError> {
        let mut params = Vec::with_capacity(func.arguments.len());
        for arg in &func.arguments {
            if arg.qualifier != ParameterQualifier::In {
                return Err(unsupported(
                    format!("`{}` parameter", arg.qualifier),
                    format!("{} {} {}", arg.qualifier, arg.ty, arg.name),
                ));
            }
            params.push(JsParam {
                name: mangle(&arg.name),
                doc_type: doc_type(&arg.ty).ok_or_else(|| unrepresentable(&arg.ty, &arg.name))?,
            });
        }
        let returns = match func.result {
            Type::Void => None,
            ref ty => Some(doc_type(ty).ok_or_else(|| unrepresentable(ty, &func.name))?),
        };

        let mut written = HashSet::new();
        assigned_roots(&func.body, &mut written);
        let mut body = Vec::new();
        for arg in &func.arguments {
            if !written.contains(&arg.name) {
                continue;
            }
            let param_shape = match shape(&arg.ty) {
                Some(Shape::Number | Shape::Boolean) | None => continue,
                Some(param_shape) => param_shape,
            };
            let name = JsExpr::Ident(mangle(&arg.name));
            body.push(JsStmt::Expr(JsExpr::assign(
                None,
                name.clone(),
                copy(param_shape, name),
            )));
        }
        body.extend(self.block(&func.body)?);

        log::debug!("lowered function `{}`", func.name);
        Ok(JsFunction {
            name: mangle(&func.name),
            params,
            returns,
            body,
        })
    }
}

/// Collects the root variables of every assignment target in `block`.
fn assigned_roots(block: &[Statement], out: &mut HashSet<String>) {
    fn visit(expr: &Expression, out: &mut HashSet<String>) {
        if let ExpressionKind::Assign { target, .. } = &expr.kind {
            let mut root = &**target;
            while let ExpressionKind::Field { base, .. } | ExpressionKind::Index { base, .. } =
                &root.kind
            {
                root = &**base;
            }
            if let ExpressionKind::Identifier(name) = &root.kind {
                out.insert(name.clone());
            }
        }
        for child in expr.children() {
            visit(child, out);
        }
    }

    for stmt in block {
        match stmt {
            Statement::Declaration {
                init: Some(expr), ..
            }
            | Statement::Expression(expr)
            | Statement::Return(Some(expr)) => visit(expr, out),
            Statement::If {
                condition,
                accept,
                reject,
            } => {
                visit(condition, out);
                assigned_roots(accept, out);
                assigned_roots(reject, out);
            }
            Statement::Loop {
                init,
                condition,
                step,
                body,
            } => {
                if let Some(init) = init {
                    assigned_roots(std::slice::from_ref(&**init), out);
                }
                for expr in condition.iter().chain(step) {
                    visit(expr, out);
                }
                assigned_roots(body, out);
            }
            Statement::Block(inner) => assigned_roots(inner, out),
            _ => {}
        }
    }
}

/// Lowers an annotated expression.
pub fn lower_expression(expr: &Expression) -> Result<JsExpr, LoweringError> {
    Lowerer::default().expression(expr)
}

/// Lowers an annotated function to an exported JavaScript function.
pub fn lower_function(func: &Function) -> Result<JsFunction, LoweringError> {
    Lowerer::default().function(func)
}

/// Lowers an annotated module.
///
/// Structs become JSDoc typedefs, `const` globals `export const`,
/// other globals `export let` (with a setter for `uniform` and `in`
/// globals) and functions `export function`. Overloaded functions are
/// rejected since JavaScript has a single namespace for them.
pub fn lower_module(module: &Module) -> Result<JsModule, LoweringError> {
    let mut seen = HashSet::new();
    for func in module.functions() {
        if !seen.insert(func.name.as_str()) {
            return Err(unsupported("overloaded function", &func.name));
        }
    }

    let lowerer = Lowerer {
        structs: module
            .structs()
            .map(|decl| (decl.name.clone(), decl.members.clone()))
            .collect(),
    };
    let mut items = Vec::with_capacity(module.items.len());
    for item in &module.items {
        items.push(match item {
            Item::Struct(decl) => JsItem::Typedef {
                name: decl.name.clone(),
                properties: decl
                    .members
                    .iter()
                    .map(|m| {
                        Ok(JsParam {
                            name: m.name.clone(),
                            doc_type: doc_type(&m.ty)
                                .ok_or_else(|| unrepresentable(&m.ty, &decl.name))?,
                        })
                    })
                    .collect::<Result<_, LoweringError>>()?,
            },
            Item::Global(var) => {
                let doc_type =
                    doc_type(&var.ty).ok_or_else(|| unrepresentable(&var.ty, &var.name))?;
                let value = match &var.init {
                    Some(init) => lowerer.value(init)?,
                    None => lowerer.default_value(&var.ty, &var.name)?,
                };
                let name = mangle(&var.name);
                match var.qualifier {
                    Some(StorageQualifier::Const) => JsItem::Const {
                        name,
                        doc_type,
                        value,
                    },
                    qualifier => JsItem::Let {
                        name,
                        doc_type,
                        value,
                        setter: matches!(
                            qualifier,
                            Some(StorageQualifier::Uniform | StorageQualifier::In)
                        ),
                    },
                }
            }
            Item::Function(func) => JsItem::Function(lowerer.function(func)?),
        });
    }
    log::debug!("lowered module: {} items", items.len());
    Ok(JsModule { items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslx_analysis::{BuiltinTable, SymbolTable, infer_expression, infer_module};
    use glslx_ir::{FunctionArgument, GlobalVariable, StructDeclaration};

    fn ident(name: &str) -> Expression {
        Expression::untyped(ExpressionKind::Identifier(name.into()))
    }

    fn bin(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        Expression::untyped(ExpressionKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn field(base: Expression, name: &str) -> Expression {
        Expression::untyped(ExpressionKind::Field {
            base: Box::new(base),
            field: name.into(),
        })
    }

    fn call(function: &str, arguments: Vec<Expression>) -> Expression {
        Expression::untyped(ExpressionKind::Call {
            function: function.into(),
            arguments,
        })
    }

    fn assign(op: Option<BinaryOp>, target: Expression, value: Expression) -> Expression {
        Expression::untyped(ExpressionKind::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn symbols() -> SymbolTable {
        let mut symbols = SymbolTable::new();
        symbols.declare("x", Type::FLOAT);
        symbols.declare("a", Type::INT);
        symbols.declare("b", Type::INT);
        symbols.declare("v", Type::vec(VectorSize::Tri));
        symbols.declare("w", Type::vec(VectorSize::Tri));
        symbols.declare("m", Type::mat(VectorSize::Tri));
        symbols.declare(
            "iv",
            Type::Vector {
                size: VectorSize::Tri,
                kind: ScalarKind::Int,
            },
        );
        symbols.declare(
            "rect",
            Type::Matrix {
                columns: VectorSize::Bi,
                rows: VectorSize::Tri,
            },
        );
        symbols
    }

    fn lower(expr: Expression) -> Result<String, LoweringError> {
        let typed = infer_expression(&expr, &symbols(), BuiltinTable::shared())
            .expect("expression should type-check");
        lower_expression(&typed).map(|js| js.to_string())
    }

    #[test]
    fn matrix_times_vector_transforms() {
        let product = bin(BinaryOp::Multiply, ident("m"), ident("v"));
        assert_eq!(
            lower(product).unwrap(),
            "vec3.transformMat3(vec3.create(), v, m)"
        );
    }

    #[test]
    fn swizzles() {
        assert_eq!(lower(field(ident("v"), "zyx")).unwrap(), "glsl.swizzle(v, 2, 1, 0)");
        assert_eq!(lower(field(ident("v"), "xy")).unwrap(), "glsl.swizzle(v, 0, 1)");
        assert_eq!(lower(field(ident("v"), "y")).unwrap(), "v[1]");
    }

    #[test]
    fn scalar_broadcast() {
        let scaled = bin(BinaryOp::Multiply, ident("v"), Expression::float(2.0));
        assert_eq!(lower(scaled).unwrap(), "vec3.scale(vec3.create(), v, 2)");
        let shifted = bin(BinaryOp::Add, ident("v"), Expression::float(1.0));
        assert_eq!(
            lower(shifted).unwrap(),
            "vec3.add(vec3.create(), v, glsl.splat(3, 1))"
        );
    }

    #[test]
    fn integer_division_truncates() {
        let quotient = bin(BinaryOp::Divide, ident("a"), ident("b"));
        assert_eq!(lower(quotient).unwrap(), "Math.trunc(a / b)");
    }

    #[test]
    fn vector_equality() {
        let equal = bin(BinaryOp::Equal, ident("v"), ident("w"));
        assert_eq!(lower(equal).unwrap(), "vec3.exactEquals(v, w)");
        let differ = bin(BinaryOp::NotEqual, ident("v"), ident("w"));
        assert_eq!(lower(differ).unwrap(), "!vec3.exactEquals(v, w)");
    }

    #[test]
    fn builtins_by_shape() {
        assert_eq!(lower(call("sin", vec![ident("x")])).unwrap(), "Math.sin(x)");
        assert_eq!(
            lower(call("sin", vec![ident("v")])).unwrap(),
            "glsl.map(Math.sin, v)"
        );
        assert_eq!(
            lower(call("normalize", vec![ident("v")])).unwrap(),
            "vec3.normalize(vec3.create(), v)"
        );
        assert_eq!(
            lower(call("min", vec![ident("v"), Expression::float(1.0)])).unwrap(),
            "vec3.min(vec3.create(), v, glsl.splat(3, 1))"
        );
        assert_eq!(
            lower(call("dot", vec![ident("v"), ident("w")])).unwrap(),
            "vec3.dot(v, w)"
        );
    }

    #[test]
    fn constructors() {
        assert_eq!(
            lower(call("vec3", vec![Expression::float(1.0)])).unwrap(),
            "glsl.splat(3, 1)"
        );
        assert_eq!(lower(call("vec3", vec![ident("v")])).unwrap(), "vec3.clone(v)");
        let parts = vec![field(ident("v"), "xy"), ident("x")];
        assert_eq!(
            lower(call("vec3", parts)).unwrap(),
            "glsl.vector(3, glsl.swizzle(v, 0, 1), x)"
        );
        assert_eq!(lower(call("int", vec![ident("x")])).unwrap(), "Math.trunc(x)");
    }

    #[test]
    fn scalar_from_aggregate_takes_first_component() {
        let from_matrix = Expression::call(
            "float",
            vec![Expression::identifier("m", Type::mat(VectorSize::Tri))],
            Type::FLOAT,
        );
        assert_eq!(lower_expression(&from_matrix).unwrap().to_string(), "m[0]");
        let from_vector = Expression::call(
            "int",
            vec![Expression::identifier("v", Type::vec(VectorSize::Tri))],
            Type::INT,
        );
        assert_eq!(
            lower_expression(&from_vector).unwrap().to_string(),
            "Math.trunc(v[0])"
        );
    }

    #[test]
    fn unrepresentable_types() {
        let err = lower(ident("iv")).unwrap_err();
        assert!(matches!(err.kind, LoweringErrorKind::UnrepresentableType(_)));
        assert_eq!(err.node, "iv");

        let err = lower(ident("rect")).unwrap_err();
        assert!(matches!(err.kind, LoweringErrorKind::UnrepresentableType(_)));
    }

    #[test]
    fn unmapped_builtin() {
        let cross = Expression::call(
            "cross",
            vec![
                Expression::identifier("x", Type::FLOAT),
                Expression::identifier("x", Type::FLOAT),
            ],
            Type::FLOAT,
        );
        let err = lower_expression(&cross).unwrap_err();
        assert_eq!(err.kind, LoweringErrorKind::UnmappedBuiltin("cross".into()));
        assert_eq!(err.node, "cross(x, x)");
    }

    #[test]
    fn assignments() {
        let copy = assign(None, ident("w"), ident("v"));
        assert_eq!(lower(copy).unwrap(), "w = vec3.clone(v)");
        let component = assign(Some(BinaryOp::Add), field(ident("v"), "x"), ident("x"));
        assert_eq!(lower(component).unwrap(), "v[0] += x");
        let swizzle = assign(None, field(ident("v"), "xy"), field(ident("w"), "yx"));
        assert_eq!(
            lower(swizzle).unwrap(),
            "glsl.assignSwizzle(v, [0, 1], glsl.swizzle(w, 1, 0))"
        );
        let scaled = assign(Some(BinaryOp::Multiply), ident("v"), ident("x"));
        assert_eq!(lower(scaled).unwrap(), "v = vec3.scale(vec3.create(), v, x)");
        let halved = assign(Some(BinaryOp::Divide), ident("a"), ident("b"));
        assert_eq!(lower(halved).unwrap(), "a = Math.trunc(a / b)");
    }

    #[test]
    fn reserved_names_are_mangled() {
        assert_eq!(mangle("new"), "new_");
        assert_eq!(mangle("vec3"), "vec3_");
        assert_eq!(mangle("speed"), "speed");
    }

    #[test]
    fn module_items() {
        let light = StructDeclaration {
            name: "Light".into(),
            members: vec![
                StructMember {
                    name: "dir".into(),
                    ty: Type::vec(VectorSize::Tri),
                },
                StructMember {
                    name: "power".into(),
                    ty: Type::FLOAT,
                },
            ],
        };
        let scale = GlobalVariable {
            name: "scale".into(),
            ty: Type::FLOAT,
            qualifier: Some(StorageQualifier::Uniform),
            init: None,
        };
        let mut shade = Function::new("shade", Type::vec(VectorSize::Tri));
        shade.arguments = vec![FunctionArgument::new("n", Type::vec(VectorSize::Tri))];
        shade.body = vec![
            Statement::Expression(assign(
                Some(BinaryOp::Multiply),
                ident("n"),
                ident("scale"),
            )),
            Statement::Return(Some(ident("n"))),
        ];
        let module = Module {
            items: vec![
                Item::Struct(light),
                Item::Global(scale),
                Item::Function(shade),
            ],
        };
        let typed = infer_module(&module, BuiltinTable::shared()).unwrap();
        let js = lower_module(&typed).unwrap().to_string();
        assert_eq!(
            js,
            "/**\n * @typedef {Object} Light\n * @property {vec3} dir\n * @property {number} power\n */\n\
             \n\
             /** @type {number} */\nexport let scale = 0;\n\
             /** @param {number} value */\nexport function setScale(value) {\n  scale = value;\n}\n\
             \n\
             /**\n * @param {vec3} n\n * @returns {vec3}\n */\n\
             export function shade(n) {\n  n = vec3.clone(n);\n  n = vec3.scale(vec3.create(), n, scale);\n  return vec3.clone(n);\n}\n"
        );
    }

    #[test]
    fn overloads_are_rejected() {
        let one = Function::new("f", Type::Void);
        let mut two = Function::new("f", Type::Void);
        two.arguments = vec![FunctionArgument::new("x", Type::FLOAT)];
        let module = Module {
            items: vec![Item::Function(one), Item::Function(two)],
        };
        let err = lower_module(&module).unwrap_err();
        assert_eq!(
            err.kind,
            LoweringErrorKind::UnsupportedConstruct("overloaded function".into())
        );
    }
}
