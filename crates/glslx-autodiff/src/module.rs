//! Module-level differentiation.

use glslx_analysis::{infer_module, BuiltinTable};
use glslx_ir::{Function, Item, Module, Statement};

use crate::derive::{derivative_name, derivative_type};
use crate::error::{DiffError, ModuleError};
use crate::{differentiate, Differentiator};

/// What happens to the input functions in the derived module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputHandling {
    /// Drop the input functions; keep structs and globals.
    #[default]
    Omit,
    /// Keep each input function immediately followed by its derivatives.
    Embed,
    /// Keep the input module as is and append every derivative after it.
    Prepend,
}

/// Options for [`differentiate_module`].
#[derive(Clone, Debug, Default)]
pub struct DerivativeOptions {
    pub input: InputHandling,
    /// Log and skip derivatives that cannot be produced instead of
    /// failing the whole module.
    pub skip_unsupported: bool,
}

/// A derivative that was not emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct Skipped {
    pub function: String,
    pub parameter: String,
    pub error: DiffError,
}

/// The result of [`differentiate_module`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivedModule {
    /// The annotated output module.
    pub module: Module,
    /// Derivatives left out under [`DerivativeOptions::skip_unsupported`].
    pub skipped: Vec<Skipped>,
}

/// Emits `dd<param>_<function>` for every parameter of every function.
///
/// The module is type-checked first. Each derivative function takes the
/// same parameters as its source and returns the simplified derivative.
pub fn differentiate_module(
    module: &Module,
    options: &DerivativeOptions,
) -> Result<DerivedModule, ModuleError> {
    let annotated = infer_module(module, BuiltinTable::shared())?;
    let mut differentiator = Differentiator::for_module(&annotated);
    let functions: Vec<&Function> = annotated
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Function(func) => Some(func),
            _ => None,
        })
        .collect();

    // A failed derivative is unregistered, which can make its callers fail
    // in turn, wherever they appear in the module. Repeat until stable.
    let mut derived: Vec<Vec<Result<Function, DiffError>>>;
    loop {
        derived = functions
            .iter()
            .map(|func| {
                func.arguments
                    .iter()
                    .map(|parameter| derive_function(func, &parameter.name, &differentiator))
                    .collect()
            })
            .collect();
        let mut changed = false;
        for (func, results) in functions.iter().zip(&derived) {
            for (parameter, result) in func.arguments.iter().zip(results) {
                if result.is_err() && differentiator.has_derivative(&func.name, &parameter.name) {
                    differentiator.unregister_derivative(&func.name, &parameter.name);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let mut items = Vec::with_capacity(annotated.items.len());
    let mut appended = Vec::new();
    let mut skipped = Vec::new();
    let mut derived = derived.into_iter();
    for item in &annotated.items {
        let Item::Function(func) = item else {
            items.push(item.clone());
            continue;
        };
        if options.input != InputHandling::Omit {
            items.push(item.clone());
        }
        let results = derived.next().unwrap_or_default();
        for (parameter, result) in func.arguments.iter().zip(results) {
            match result {
                Ok(derived) => {
                    let target = if options.input == InputHandling::Prepend {
                        &mut appended
                    } else {
                        &mut items
                    };
                    target.push(Item::Function(derived));
                }
                Err(error) if options.skip_unsupported => {
                    log::warn!(
                        "skipping derivative of `{}` with respect to `{}`: {error}",
                        func.name,
                        parameter.name
                    );
                    skipped.push(Skipped {
                        function: func.name.clone(),
                        parameter: parameter.name.clone(),
                        error,
                    });
                }
                Err(source) => {
                    return Err(ModuleError::Derivative {
                        function: func.name.clone(),
                        parameter: parameter.name.clone(),
                        source,
                    });
                }
            }
        }
    }
    items.extend(appended);

    log::debug!(
        "differentiated module: {} items, {} skipped",
        items.len(),
        skipped.len()
    );
    Ok(DerivedModule {
        module: Module { items },
        skipped,
    })
}

fn derive_function(
    func: &Function,
    wrt: &str,
    differentiator: &Differentiator,
) -> Result<Function, DiffError> {
    let body = differentiate(func, wrt, differentiator)?;
    let result = func
        .argument(wrt)
        .and_then(|parameter| derivative_type(&func.result, &parameter.ty))
        .unwrap_or_else(|| body.ty.clone());
    Ok(Function {
        name: derivative_name(wrt, &func.name),
        arguments: func.arguments.clone(),
        result,
        body: vec![Statement::Return(Some(body))],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslx_ir::{
        BinaryOp, Expression, ExpressionKind, FunctionArgument, GlobalVariable,
        StorageQualifier, Type,
    };

    fn square(name: &str) -> Item {
        let x = || Box::new(Expression::untyped(ExpressionKind::Identifier("x".into())));
        let body = Expression::untyped(ExpressionKind::Binary {
            op: BinaryOp::Multiply,
            left: x(),
            right: x(),
        });
        Item::Function(Function {
            name: name.into(),
            arguments: vec![FunctionArgument::new("x", Type::FLOAT)],
            result: Type::FLOAT,
            body: vec![Statement::Return(Some(body))],
        })
    }

    fn module() -> Module {
        Module {
            items: vec![
                Item::Global(GlobalVariable {
                    name: "scale".into(),
                    ty: Type::FLOAT,
                    qualifier: Some(StorageQualifier::Uniform),
                    init: None,
                }),
                square("f"),
                square("g"),
            ],
        }
    }

    fn names(module: &Module) -> Vec<&str> {
        module
            .items
            .iter()
            .map(|item| match item {
                Item::Global(var) => var.name.as_str(),
                Item::Function(func) => func.name.as_str(),
                Item::Struct(decl) => decl.name.as_str(),
            })
            .collect()
    }

    fn derive_with(input: InputHandling) -> DerivedModule {
        let options = DerivativeOptions {
            input,
            ..Default::default()
        };
        differentiate_module(&module(), &options).unwrap()
    }

    #[test]
    fn omit_keeps_globals_only() {
        let derived = derive_with(InputHandling::Omit);
        assert_eq!(names(&derived.module), ["scale", "ddx_f", "ddx_g"]);
        let ddx = derived.module.function("ddx_f").unwrap();
        assert_eq!(ddx.body[0].to_string(), "return 2.0 * x;");
        assert!(derived.skipped.is_empty());
    }

    #[test]
    fn embed_interleaves() {
        let derived = derive_with(InputHandling::Embed);
        assert_eq!(names(&derived.module), ["scale", "f", "ddx_f", "g", "ddx_g"]);
    }

    #[test]
    fn prepend_appends_all_derivatives() {
        let derived = derive_with(InputHandling::Prepend);
        assert_eq!(names(&derived.module), ["scale", "f", "g", "ddx_f", "ddx_g"]);
    }

    #[test]
    fn skipped_callee_fails_its_callers() {
        // float g(float x) { while (false) {} return x; }
        let g = Function {
            name: "g".into(),
            arguments: vec![FunctionArgument::new("x", Type::FLOAT)],
            result: Type::FLOAT,
            body: vec![
                Statement::Loop {
                    init: None,
                    condition: Some(Expression::bool(false)),
                    step: None,
                    body: vec![],
                },
                Statement::Return(Some(Expression::untyped(ExpressionKind::Identifier(
                    "x".into(),
                )))),
            ],
        };
        // float f(float x) { return g(x); }
        let call = Expression::untyped(ExpressionKind::Call {
            function: "g".into(),
            arguments: vec![Expression::untyped(ExpressionKind::Identifier("x".into()))],
        });
        let f = Function {
            name: "f".into(),
            arguments: vec![FunctionArgument::new("x", Type::FLOAT)],
            result: Type::FLOAT,
            body: vec![Statement::Return(Some(call))],
        };
        let input = Module {
            items: vec![
                Item::Function(g.clone()),
                square("h"),
                Item::Function(f.clone()),
            ],
        };
        let options = DerivativeOptions {
            skip_unsupported: true,
            ..Default::default()
        };
        let derived = differentiate_module(&input, &options).unwrap();
        assert_eq!(names(&derived.module), ["ddx_h"]);
        let skipped: Vec<_> = derived
            .skipped
            .iter()
            .map(|s| (s.function.as_str(), s.parameter.as_str()))
            .collect();
        assert_eq!(skipped, [("g", "x"), ("f", "x")]);
        assert_eq!(derived.skipped[1].error.node, "g(x)");

        let err = differentiate_module(&input, &DerivativeOptions::default()).unwrap_err();
        assert!(matches!(err, ModuleError::Derivative { ref function, .. } if function == "g"));

        // The caller may come first.
        let input = Module {
            items: vec![Item::Function(f), Item::Function(g)],
        };
        let derived = differentiate_module(&input, &options).unwrap();
        assert!(names(&derived.module).is_empty());
        let skipped: Vec<_> = derived.skipped.iter().map(|s| s.function.as_str()).collect();
        assert_eq!(skipped, ["f", "g"]);
    }

    #[test]
    fn unsupported_parameters() {
        let mut input = module();
        if let Item::Function(func) = &mut input.items[2] {
            func.arguments.push(FunctionArgument::new("n", Type::INT));
        }

        let err = differentiate_module(&input, &DerivativeOptions::default()).unwrap_err();
        match err {
            ModuleError::Derivative {
                function, parameter, ..
            } => assert_eq!((function.as_str(), parameter.as_str()), ("g", "n")),
            other => panic!("expected a derivative error, got {other:?}"),
        }

        let options = DerivativeOptions {
            skip_unsupported: true,
            ..Default::default()
        };
        let derived = differentiate_module(&input, &options).unwrap();
        assert_eq!(names(&derived.module), ["scale", "ddx_f", "ddx_g"]);
        assert_eq!(derived.skipped.len(), 1);
        assert_eq!(derived.skipped[0].parameter, "n");
    }
}
