//! Integration test: build a small lighting module programmatically and
//! verify the GLSL dump.

use glslx_ir::*;

fn ident(name: &str) -> Expression {
    Expression::untyped(ExpressionKind::Identifier(name.into()))
}

fn member(base: Expression, field: &str) -> Expression {
    Expression::untyped(ExpressionKind::Field {
        base: Box::new(base),
        field: field.into(),
    })
}

fn bin(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::untyped(ExpressionKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// ```glsl
/// struct Light { vec3 dir; float power; };
/// uniform Light light;
/// const float AMBIENT = 0.1;
///
/// float diffuse(vec3 n) {
///     float d = dot(n, light.dir);
///     if (d < 0.0) {
///         return AMBIENT;
///     }
///     return d * light.power + AMBIENT;
/// }
/// ```
#[test]
fn build_lighting_module() {
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
    let light_ty = light.to_type();

    let mut diffuse = Function::new("diffuse", Type::FLOAT);
    diffuse
        .arguments
        .push(FunctionArgument::new("n", Type::vec(VectorSize::Tri)));
    diffuse.body = vec![
        Statement::Declaration {
            name: "d".into(),
            ty: Type::FLOAT,
            init: Some(Expression::untyped(ExpressionKind::Call {
                function: "dot".into(),
                arguments: vec![ident("n"), member(ident("light"), "dir")],
            })),
        },
        Statement::If {
            condition: bin(BinaryOp::Less, ident("d"), Expression::float(0.0)),
            accept: vec![Statement::Return(Some(ident("AMBIENT")))],
            reject: vec![],
        },
        Statement::Return(Some(bin(
            BinaryOp::Add,
            bin(BinaryOp::Multiply, ident("d"), member(ident("light"), "power")),
            ident("AMBIENT"),
        ))),
    ];

    let module = Module {
        items: vec![
            Item::Struct(light),
            Item::Global(GlobalVariable {
                name: "light".into(),
                ty: light_ty,
                qualifier: Some(StorageQualifier::Uniform),
                init: None,
            }),
            Item::Global(GlobalVariable {
                name: "AMBIENT".into(),
                ty: Type::FLOAT,
                qualifier: Some(StorageQualifier::Const),
                init: Some(Expression::float(0.1)),
            }),
            Item::Function(diffuse),
        ],
    };

    assert_eq!(module.structs().count(), 1);
    assert_eq!(module.globals().count(), 2);
    assert!(module.function("diffuse").is_some());

    let expected = "\
struct Light {
    vec3 dir;
    float power;
};

uniform Light light;

const float AMBIENT = 0.1;

float diffuse(vec3 n) {
    float d = dot(n, light.dir);
    if (d < 0.0) {
        return AMBIENT;
    }
    return d * light.power + AMBIENT;
}
";
    assert_eq!(dump_module(&module), expected);
}

#[test]
fn typed_constructors_check_shapes() {
    let v3 = Expression::identifier("v", Type::vec(VectorSize::Tri));
    let v2 = Expression::identifier("u", Type::vec(VectorSize::Bi));
    assert!(Expression::binary(BinaryOp::Add, v3.clone(), v2).is_err());

    let scaled = Expression::binary(BinaryOp::Multiply, v3.clone(), Expression::float(2.0)).unwrap();
    assert_eq!(scaled.ty, Type::vec(VectorSize::Tri));

    let swizzled = Expression::field(v3.clone(), "zx").unwrap();
    assert_eq!(swizzled.ty, Type::vec(VectorSize::Bi));
    assert!(swizzled.is_lvalue());
    assert!(Expression::field(v3, "xw").is_err());
}

#[test]
fn matrix_columns() {
    let m = Expression::identifier("m", Type::mat(VectorSize::Quad));
    let column = Expression::index(m, Expression::int(1)).unwrap();
    assert_eq!(column.ty, Type::vec(VectorSize::Quad));
    assert_eq!(column.to_string(), "m[1]");
}
