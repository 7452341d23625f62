//! JavaScript backend for glslx.
//!
//! Lowers a type-checked GLSL module to an ES module that runs on top of
//! [gl-matrix](https://glmatrix.net): float vectors and square matrices
//! become `Float32Array`s, built-ins become `Math` or gl-matrix calls,
//! and a small `glsl` helper object covers the rest.

use glslx_backend_core::{
    Backend, BackendError, BackendOptions, BackendOutput, Diagnostic, DiagnosticLevel,
    OutputContent, OutputFile, prepare,
};
use glslx_ir::Module;

pub mod ast;
mod emit;
mod error;
mod lower;
pub mod runtime;

pub use emit::{emit_module, setter_name};
pub use error::{LoweringError, LoweringErrorKind};
pub use lower::{lower_expression, lower_function, lower_module, mangle};

/// Backend that compiles GLSL into a gl-matrix based ES module.
#[derive(Debug)]
pub struct JsBackend;

impl Backend for JsBackend {
    fn name(&self) -> &str {
        "JavaScript"
    }

    fn targets(&self) -> &[&str] {
        &["js", "javascript"]
    }

    fn compile(
        &self,
        module: &Module,
        opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError> {
        let prepared = prepare(module, opts)?;
        let lowered = lower_module(&prepared.module)?;
        let text = emit_module(&lowered);

        let mut diagnostics = prepared.diagnostics;
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Info,
            message: format!(
                "emitted {} items for {} {}",
                lowered.items.len(),
                runtime::RUNTIME_PACKAGE,
                runtime::RUNTIME_VERSION
            ),
        });
        log::info!("js: emitted {} bytes", text.len());

        Ok(BackendOutput {
            files: vec![OutputFile {
                name: "module.js".into(),
                content: OutputContent::Text(text),
            }],
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslx_backend_core::BackendRegistry;
    use glslx_ir::{
        Expression, ExpressionKind, Function, FunctionArgument, Item, Statement, Type,
        VectorSize,
    };

    fn ident(name: &str) -> Expression {
        Expression::untyped(ExpressionKind::Identifier(name.into()))
    }

    fn module(result: Type, param: Type) -> Module {
        let mut func = Function::new("f", result);
        func.arguments = vec![FunctionArgument::new("p", param)];
        func.body = vec![Statement::Return(Some(ident("p")))];
        Module {
            items: vec![Item::Function(func)],
        }
    }

    #[test]
    fn compiles_to_a_single_module() {
        let output = JsBackend
            .compile(&module(Type::FLOAT, Type::FLOAT), &BackendOptions::default())
            .unwrap();
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.files[0].name, "module.js");
        let text = output.text().unwrap();
        assert!(text.starts_with("import { vec2, vec3, vec4, mat2, mat3, mat4 } from \"gl-matrix\";"));
        assert!(text.contains("export function f(p) {\n  return p;\n}"));
        assert!(
            output
                .diagnostics
                .iter()
                .any(|d| d.level == DiagnosticLevel::Info && d.message.contains("gl-matrix"))
        );
    }

    #[test]
    fn default_options_lower_the_source_as_written() {
        let sum = |left: Expression, right: Expression| {
            Expression::untyped(ExpressionKind::Binary {
                op: glslx_ir::BinaryOp::Add,
                left: Box::new(left),
                right: Box::new(right),
            })
        };
        let mut func = Function::new("f", Type::FLOAT);
        func.arguments = ["a", "b", "c"]
            .into_iter()
            .map(|name| FunctionArgument::new(name, Type::FLOAT))
            .collect();
        func.body = vec![Statement::Return(Some(sum(
            ident("a"),
            sum(ident("b"), ident("c")),
        )))];
        let module = Module {
            items: vec![Item::Function(func)],
        };
        let output = JsBackend
            .compile(&module, &BackendOptions::default())
            .unwrap();
        assert!(output.text().unwrap().contains("return a + (b + c);"));
    }

    #[test]
    fn unrepresentable_type_is_an_error() {
        let ivec = Type::Vector {
            size: VectorSize::Bi,
            kind: glslx_ir::ScalarKind::Int,
        };
        let err = JsBackend
            .compile(&module(ivec.clone(), ivec), &BackendOptions::default())
            .unwrap_err();
        assert!(matches!(err, BackendError::Unsupported { .. }), "{err}");
    }

    #[test]
    fn registers_alongside_glsl() {
        let mut registry = BackendRegistry::with_builtins();
        registry.register(Box::new(JsBackend));
        assert_eq!(registry.list_targets(), vec!["glsl", "js", "javascript"]);
        assert_eq!(registry.find("js").map(|b| b.name()), Some("JavaScript"));
    }
}
