//! Type inference.
//!
//! Inference walks the tree post-order and returns an annotated copy in
//! which every expression carries a concrete type. The input is never
//! modified, so a failure leaves the caller's tree untouched.

use std::fmt;

use glslx_ir::{
    Block, Builtin, Expression, ExpressionKind, Function, FunctionArgument, Item, Module,
    ParameterQualifier, Statement, Type,
};

use crate::builtins::BuiltinTable;
use crate::error::{Location, TypeError, TypeErrorKind};
use crate::scope::{Overload, SymbolTable};

/// Annotates a single expression against `symbols`.
pub fn infer_expression(
    expr: &Expression,
    symbols: &SymbolTable,
    builtins: &BuiltinTable,
) -> Result<Expression, TypeError> {
    Inferencer::new(symbols.clone(), builtins).expression(expr)
}

/// Annotates a function body. Parameters are declared in a fresh scope
/// on top of `symbols`.
pub fn infer_function(
    func: &Function,
    symbols: &SymbolTable,
    builtins: &BuiltinTable,
) -> Result<Function, TypeError> {
    Inferencer::new(symbols.clone(), builtins).function(func)
}

/// Annotates every item of a module in declaration order.
///
/// Struct declarations and user function signatures are registered before
/// any body is checked; globals become visible from their declaration on.
pub fn infer_module(module: &Module, builtins: &BuiltinTable) -> Result<Module, TypeError> {
    let mut symbols = SymbolTable::new();
    for decl in module.structs() {
        symbols.declare_struct(decl);
    }
    for func in module.functions() {
        symbols.declare_function(func.name.clone(), overload_of(func, &symbols));
    }

    let mut cx = Inferencer::new(symbols, builtins);
    let mut items = Vec::with_capacity(module.items.len());
    for item in &module.items {
        let item = match item {
            Item::Struct(decl) => Item::Struct(decl.clone()),
            Item::Global(var) => {
                let ty = cx.symbols.resolve_type(&var.ty);
                let init = match &var.init {
                    Some(init) => {
                        let init = cx.expression(init)?;
                        cx.check_initializer(&var.name, &ty, &init)?;
                        Some(init)
                    }
                    None => None,
                };
                cx.symbols.declare(var.name.clone(), ty.clone());
                Item::Global(glslx_ir::GlobalVariable {
                    name: var.name.clone(),
                    ty,
                    qualifier: var.qualifier,
                    init,
                })
            }
            Item::Function(func) => Item::Function(cx.function(func)?),
        };
        items.push(item);
    }
    log::debug!(
        "inferred types for {} item(s), {} function(s)",
        items.len(),
        module.functions().count()
    );
    Ok(Module { items })
}

fn overload_of(func: &Function, symbols: &SymbolTable) -> Overload {
    Overload {
        parameters: func
            .arguments
            .iter()
            .map(|arg| FunctionArgument {
                name: arg.name.clone(),
                ty: symbols.resolve_type(&arg.ty),
                qualifier: arg.qualifier,
            })
            .collect(),
        result: symbols.resolve_type(&func.result),
    }
}

fn describe(types: &[Type]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

struct Inferencer<'a> {
    symbols: SymbolTable,
    builtins: &'a BuiltinTable,
    function: Option<String>,
    result: Type,
}

impl<'a> Inferencer<'a> {
    fn new(symbols: SymbolTable, builtins: &'a BuiltinTable) -> Self {
        Self {
            symbols,
            builtins,
            function: None,
            result: Type::Void,
        }
    }

    fn error(&self, kind: impl Into<TypeErrorKind>, node: &impl fmt::Display) -> TypeError {
        let node = node.to_string();
        let node = node.lines().next().unwrap_or_default().trim().to_string();
        TypeError {
            kind: kind.into(),
            location: Location {
                function: self.function.clone(),
                node,
            },
        }
    }

    fn function(&mut self, func: &Function) -> Result<Function, TypeError> {
        let Overload { parameters, result } = overload_of(func, &self.symbols);
        self.function = Some(func.name.clone());
        self.result = result.clone();

        self.symbols.push_scope();
        for arg in &parameters {
            self.symbols.declare(arg.name.clone(), arg.ty.clone());
        }
        let body = self.block(&func.body, false);
        self.symbols.pop_scope();
        self.function = None;

        log::debug!("inferred function `{}`", func.name);
        Ok(Function {
            name: func.name.clone(),
            arguments: parameters,
            result,
            body: body?,
        })
    }

    fn block(&mut self, block: &Block, scoped: bool) -> Result<Block, TypeError> {
        if scoped {
            self.symbols.push_scope();
        }
        let result = block.iter().map(|stmt| self.statement(stmt)).collect();
        if scoped {
            self.symbols.pop_scope();
        }
        result
    }

    fn check_initializer(
        &self,
        name: &str,
        ty: &Type,
        init: &Expression,
    ) -> Result<(), TypeError> {
        if init.ty.converts_to(ty) {
            Ok(())
        } else {
            Err(self.error(
                TypeErrorKind::ShapeMismatch(format!(
                    "cannot initialize `{ty} {name}` with `{}`",
                    init.ty
                )),
                init,
            ))
        }
    }

    fn condition(&mut self, condition: &Expression) -> Result<Expression, TypeError> {
        let condition = self.expression(condition)?;
        if condition.ty != Type::BOOL {
            return Err(self.error(
                TypeErrorKind::ShapeMismatch(format!(
                    "condition must be `bool`, found `{}`",
                    condition.ty
                )),
                &condition,
            ));
        }
        Ok(condition)
    }

    fn statement(&mut self, stmt: &Statement) -> Result<Statement, TypeError> {
        Ok(match stmt {
            Statement::Declaration { name, ty, init } => {
                let ty = self.symbols.resolve_type(ty);
                if matches!(ty, Type::Void | Type::Unknown | Type::Function { .. }) {
                    return Err(self.error(
                        TypeErrorKind::ShapeMismatch(format!("cannot declare `{name}` as `{ty}`")),
                        stmt,
                    ));
                }
                let init = match init {
                    Some(init) => {
                        let init = self.expression(init)?;
                        self.check_initializer(name, &ty, &init)?;
                        Some(init)
                    }
                    None => None,
                };
                self.symbols.declare(name.clone(), ty.clone());
                Statement::Declaration {
                    name: name.clone(),
                    ty,
                    init,
                }
            }
            Statement::Expression(expr) => Statement::Expression(self.expression(expr)?),
            Statement::Return(Some(value)) => {
                let value = self.expression(value)?;
                if !value.ty.converts_to(&self.result) {
                    return Err(self.error(
                        TypeErrorKind::ReturnMismatch {
                            expected: self.result.clone(),
                            found: value.ty.clone(),
                        },
                        &value,
                    ));
                }
                Statement::Return(Some(value))
            }
            Statement::Return(None) => {
                if self.result != Type::Void {
                    return Err(self.error(
                        TypeErrorKind::ReturnMismatch {
                            expected: self.result.clone(),
                            found: Type::Void,
                        },
                        stmt,
                    ));
                }
                Statement::Return(None)
            }
            Statement::If {
                condition,
                accept,
                reject,
            } => Statement::If {
                condition: self.condition(condition)?,
                accept: self.block(accept, true)?,
                reject: self.block(reject, true)?,
            },
            Statement::Loop {
                init,
                condition,
                step,
                body,
            } => {
                self.symbols.push_scope();
                let result = self.loop_parts(init.as_deref(), condition.as_ref(), step.as_ref(), body);
                self.symbols.pop_scope();
                result?
            }
            Statement::Block(block) => Statement::Block(self.block(block, true)?),
            Statement::Break => Statement::Break,
            Statement::Continue => Statement::Continue,
        })
    }

    fn loop_parts(
        &mut self,
        init: Option<&Statement>,
        condition: Option<&Expression>,
        step: Option<&Expression>,
        body: &Block,
    ) -> Result<Statement, TypeError> {
        let init = init
            .map(|init| self.statement(init).map(Box::new))
            .transpose()?;
        let condition = condition.map(|c| self.condition(c)).transpose()?;
        let step = step.map(|s| self.expression(s)).transpose()?;
        let body = self.block(body, true)?;
        Ok(Statement::Loop {
            init,
            condition,
            step,
            body,
        })
    }

    fn expression(&mut self, expr: &Expression) -> Result<Expression, TypeError> {
        match &expr.kind {
            ExpressionKind::Literal(lit) => Ok(Expression::literal(*lit)),
            ExpressionKind::Identifier(name) => match self.symbols.lookup(name) {
                Some(ty) => Ok(Expression::identifier(name.clone(), ty.clone())),
                None => Err(self.error(TypeErrorKind::UnknownIdentifier(name.clone()), expr)),
            },
            ExpressionKind::Field { base, field } => {
                let base = self.expression(base)?;
                Expression::field(base, field.clone()).map_err(|e| self.error(e, expr))
            }
            ExpressionKind::Index { base, index } => {
                let base = self.expression(base)?;
                let index = self.expression(index)?;
                if index.ty != Type::INT {
                    return Err(self.error(
                        TypeErrorKind::ShapeMismatch(format!(
                            "index must be `int`, found `{}`",
                            index.ty
                        )),
                        expr,
                    ));
                }
                Expression::index(base, index).map_err(|e| self.error(e, expr))
            }
            ExpressionKind::Unary { op, expr: operand } => {
                let operand = self.expression(operand)?;
                Expression::unary(*op, operand).map_err(|e| self.error(e, expr))
            }
            ExpressionKind::Binary { op, left, right } => {
                let left = self.expression(left)?;
                let right = self.expression(right)?;
                Expression::binary(*op, left, right).map_err(|e| self.error(e, expr))
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => {
                let arguments = arguments
                    .iter()
                    .map(|arg| self.expression(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let ty = self.call_type(function, &arguments, expr)?;
                Ok(Expression::call(function.clone(), arguments, ty))
            }
            ExpressionKind::Conditional {
                condition,
                accept,
                reject,
            } => {
                let condition = self.condition(condition)?;
                let accept = self.expression(accept)?;
                let reject = self.expression(reject)?;
                Expression::conditional(condition, accept, reject).map_err(|e| self.error(e, expr))
            }
            ExpressionKind::Assign { op, target, value } => {
                let target = self.expression(target)?;
                if !target.is_lvalue() {
                    return Err(self.error(TypeErrorKind::NotAssignable, expr));
                }
                let value = self.expression(value)?;
                let compatible = match op {
                    None => value.ty.converts_to(&target.ty),
                    Some(op) => {
                        op.is_compound_assignable()
                            && target.ty.binary_result(*op, &value.ty).as_ref() == Ok(&target.ty)
                    }
                };
                if !compatible {
                    return Err(self.error(
                        TypeErrorKind::ShapeMismatch(format!(
                            "cannot assign `{}` to `{}`",
                            value.ty, target.ty
                        )),
                        expr,
                    ));
                }
                let ty = target.ty.clone();
                Ok(Expression::new(
                    ExpressionKind::Assign {
                        op: *op,
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    ty,
                ))
            }
        }
    }

    /// Resolves a call as a type constructor, a struct constructor, a
    /// built-in, then a user function.
    fn call_type(
        &self,
        function: &str,
        arguments: &[Expression],
        node: &Expression,
    ) -> Result<Type, TypeError> {
        let types: Vec<Type> = arguments.iter().map(|arg| arg.ty.clone()).collect();
        if let Some(ty) = Type::from_glsl_name(function) {
            return construct(&ty, &types)
                .map(|()| ty)
                .map_err(|kind| self.error(kind, node));
        }
        if let Some(ty) = self.symbols.struct_type(function) {
            return construct_struct(ty, &types)
                .map(|()| ty.clone())
                .map_err(|kind| self.error(kind, node));
        }
        if let Some(builtin) = Builtin::from_name(function) {
            return self
                .builtins
                .resolve(builtin, &types)
                .map_err(|kind| self.error(kind, node));
        }

        let overloads = self.symbols.overloads(function);
        if overloads.is_empty() {
            return Err(self.error(TypeErrorKind::UnknownFunction(function.to_string()), node));
        }
        let exact = overloads.iter().find(|o| {
            o.parameters.len() == types.len()
                && o.parameters.iter().zip(&types).all(|(p, t)| p.ty == *t)
        });
        let overload = exact.or_else(|| {
            overloads.iter().find(|o| {
                o.parameters.len() == types.len()
                    && o.parameters.iter().zip(&types).all(|(p, t)| t.converts_to(&p.ty))
            })
        });
        let Some(overload) = overload else {
            let kind = if overloads.iter().all(|o| o.parameters.len() != types.len()) {
                TypeErrorKind::ArityMismatch {
                    function: function.to_string(),
                    found: types.len(),
                }
            } else {
                TypeErrorKind::ShapeMismatch(format!(
                    "no overload of `{function}` takes ({})",
                    describe(&types)
                ))
            };
            return Err(self.error(kind, node));
        };
        for (param, arg) in overload.parameters.iter().zip(arguments) {
            if param.qualifier != ParameterQualifier::In && !arg.is_lvalue() {
                return Err(self.error(TypeErrorKind::NotAssignable, arg));
            }
        }
        Ok(overload.result.clone())
    }
}

/// Checks the arguments of a scalar, vector or matrix constructor.
fn construct(ty: &Type, args: &[Type]) -> Result<(), TypeErrorKind> {
    let arity = || TypeErrorKind::ArityMismatch {
        function: ty.to_string(),
        found: args.len(),
    };
    let shape = || {
        TypeErrorKind::ShapeMismatch(format!("cannot construct `{ty}` from ({})", describe(args)))
    };
    let Some(wanted) = ty.component_count() else {
        return Err(shape());
    };
    if args.is_empty() {
        return Err(arity());
    }
    let mut total = 0;
    for arg in args {
        total += arg.component_count().ok_or_else(shape)?;
    }
    match (ty, args) {
        (Type::Scalar(_), [_]) => Ok(()),
        (Type::Scalar(_), _) => Err(arity()),
        (Type::Vector { .. }, [single]) if single.is_scalar() => Ok(()),
        (Type::Vector { .. }, [single]) if single.is_vector() && total >= wanted => Ok(()),
        (Type::Matrix { .. }, [single]) if single.is_scalar() || single.is_matrix() => Ok(()),
        _ if args.iter().any(Type::is_matrix) => Err(shape()),
        _ if total == wanted => Ok(()),
        _ => Err(shape()),
    }
}

fn construct_struct(ty: &Type, args: &[Type]) -> Result<(), TypeErrorKind> {
    let Type::Struct { name, members } = ty else {
        return Err(TypeErrorKind::UnknownFunction(ty.to_string()));
    };
    if members.len() != args.len() {
        return Err(TypeErrorKind::ArityMismatch {
            function: name.clone(),
            found: args.len(),
        });
    }
    if members.iter().zip(args).all(|(m, arg)| arg.converts_to(&m.ty)) {
        Ok(())
    } else {
        Err(TypeErrorKind::ShapeMismatch(format!(
            "cannot construct `{name}` from ({})",
            describe(args)
        )))
    }
}
