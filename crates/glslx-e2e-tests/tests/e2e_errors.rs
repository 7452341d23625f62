mod common;

use common::*;
use glslx_autodiff::{DerivativeOptions, ModuleError};
use glslx_backend_core::{BackendError, BackendOptions, GlslBackend};
use glslx_backend_js::JsBackend;
use glslx_ir::{BinaryOp, Expression, Module, ScalarKind, Type, VectorSize};

#[test]
fn empty_module_compiles() {
    let opts = BackendOptions::default();
    assert_eq!(text(&compile(&GlslBackend, &Module::default(), &opts)), "");
    let js = compile(&JsBackend, &Module::default(), &opts);
    assert!(text(&js).starts_with("import"));
}

#[test]
fn type_errors_stop_every_backend() {
    let body = bin(BinaryOp::Add, ident("x"), Expression::bool(true));
    let bad = module(vec![returning("f", Type::FLOAT, &[("x", Type::FLOAT)], body)]);
    let opts = BackendOptions::default();
    assert!(matches!(
        try_compile(&GlslBackend, &bad, &opts),
        Err(BackendError::Type(_))
    ));
    assert!(matches!(
        try_compile(&JsBackend, &bad, &opts),
        Err(BackendError::Type(_))
    ));
}

#[test]
fn unsupported_derivative_names_function_and_parameter() {
    let scaled = returning(
        "scaled",
        Type::FLOAT,
        &[("x", Type::FLOAT), ("n", Type::INT)],
        bin(BinaryOp::Multiply, ident("x"), ident("n")),
    );
    let opts = BackendOptions {
        derivatives: Some(DerivativeOptions::default()),
        ..Default::default()
    };
    match try_compile(&GlslBackend, &module(vec![scaled]), &opts) {
        Err(BackendError::Derivative(ModuleError::Derivative {
            function,
            parameter,
            ..
        })) => {
            assert_eq!(function, "scaled");
            assert_eq!(parameter, "n");
        }
        other => panic!("expected a derivative error, got {other:?}"),
    }
}

#[test]
fn integer_vectors_are_unrepresentable_in_javascript() {
    let ivec = Type::Vector {
        size: VectorSize::Tri,
        kind: ScalarKind::Int,
    };
    let f = returning("f", ivec.clone(), &[("v", ivec)], ident("v"));
    let module = module(vec![f]);
    let opts = BackendOptions::default();
    assert!(try_compile(&GlslBackend, &module, &opts).is_ok());
    let err = try_compile(&JsBackend, &module, &opts).unwrap_err();
    assert!(err.to_string().contains("ivec3"), "{err}");
}
