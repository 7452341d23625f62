//! Signatures of the built-in GLSL functions.
//!
//! `genType` stands for `float` or a float vector. Entries flagged as
//! integral also accept `int` and `ivec` arguments as long as every
//! generic argument is integral; otherwise integers promote to float.

use std::collections::HashMap;
use std::sync::OnceLock;

use glslx_ir::{Builtin, ScalarKind, Type, VectorSize};

use crate::error::TypeErrorKind;

/// A parameter pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Param {
    /// The call's generic type.
    Gen,
    /// The generic type or a scalar of its kind.
    GenOrScalar,
    /// A `float`.
    Float,
    /// A `vec3`.
    Vec3,
    /// Any matrix; all `Matrix` parameters must agree.
    Matrix,
    /// A square matrix.
    SquareMatrix,
}

/// A result pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ret {
    Gen,
    Float,
    Vec3,
    /// The matrix argument's type.
    Matrix,
    /// The matrix argument with rows and columns swapped.
    Transposed,
}

/// One overload of a built-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub params: &'static [Param],
    pub result: Ret,
    /// Accepts integral generic arguments.
    pub integral: bool,
}

impl Signature {
    const fn new(params: &'static [Param], result: Ret) -> Self {
        Self {
            params,
            result,
            integral: false,
        }
    }

    const fn integral(params: &'static [Param], result: Ret) -> Self {
        Self {
            params,
            result,
            integral: true,
        }
    }

    /// The result type for these argument types, if they match.
    pub fn resolve(&self, args: &[Type]) -> Option<Type> {
        if args.len() != self.params.len() {
            return None;
        }
        let generic = self.generic_type(args)?;
        let matrix = self
            .params
            .iter()
            .zip(args)
            .find(|(p, _)| matches!(p, Param::Matrix | Param::SquareMatrix))
            .map(|(_, ty)| ty.clone());

        for (param, arg) in self.params.iter().zip(args) {
            let ok = match param {
                Param::Gen => generic.as_ref().is_some_and(|g| arg.converts_to(g)),
                Param::GenOrScalar => generic.as_ref().is_some_and(|g| {
                    arg.converts_to(g)
                        || g.scalar_kind()
                            .is_some_and(|kind| arg.converts_to(&Type::Scalar(kind)))
                }),
                Param::Float => arg.converts_to(&Type::FLOAT),
                Param::Vec3 => arg.converts_to(&Type::vec(VectorSize::Tri)),
                Param::Matrix => arg.is_matrix() && Some(arg) == matrix.as_ref(),
                Param::SquareMatrix => {
                    matches!(arg, Type::Matrix { columns, rows } if columns == rows)
                }
            };
            if !ok {
                return None;
            }
        }

        match self.result {
            Ret::Gen => generic,
            Ret::Float => Some(Type::FLOAT),
            Ret::Vec3 => Some(Type::vec(VectorSize::Tri)),
            Ret::Matrix => matrix,
            Ret::Transposed => match matrix? {
                Type::Matrix { columns, rows } => Some(Type::Matrix {
                    columns: rows,
                    rows: columns,
                }),
                _ => None,
            },
        }
    }

    /// Binds `genType` from the first `Gen` argument, falling back to the
    /// first `GenOrScalar` one. `Ok(None)` means the signature is not
    /// generic; `None` means the arguments cannot bind it.
    fn generic_type(&self, args: &[Type]) -> Option<Option<Type>> {
        let position = |wanted: Param| self.params.iter().position(|&p| p == wanted);
        let Some(index) = position(Param::Gen).or_else(|| position(Param::GenOrScalar)) else {
            return Some(None);
        };
        let bound = &args[index];
        let kind = bound.scalar_kind().filter(|k| k.is_numeric())?;
        if !(bound.is_scalar() || bound.is_vector()) {
            return None;
        }
        let all_integral = self
            .params
            .iter()
            .zip(args)
            .filter(|(p, _)| matches!(p, Param::Gen | Param::GenOrScalar))
            .all(|(_, ty)| ty.scalar_kind() == Some(ScalarKind::Int));
        let kind = if kind == ScalarKind::Int && self.integral && all_integral {
            ScalarKind::Int
        } else {
            ScalarKind::Float
        };
        Some(bound.with_kind(kind))
    }
}

/// Immutable table of built-in signatures.
#[derive(Debug)]
pub struct BuiltinTable {
    signatures: HashMap<Builtin, Vec<Signature>>,
}

impl Default for BuiltinTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinTable {
    /// Builds the table.
    pub fn new() -> Self {
        use Param::*;

        const UNARY: &[Param] = &[Gen];
        const BINARY: &[Param] = &[Gen, Gen];

        let mut signatures: HashMap<Builtin, Vec<Signature>> = HashMap::new();
        let mut add = |builtin: Builtin, sig: Signature| {
            signatures.entry(builtin).or_default().push(sig);
        };

        for builtin in [
            Builtin::Radians,
            Builtin::Degrees,
            Builtin::Sin,
            Builtin::Cos,
            Builtin::Tan,
            Builtin::Asin,
            Builtin::Acos,
            Builtin::Sinh,
            Builtin::Cosh,
            Builtin::Tanh,
            Builtin::Exp,
            Builtin::Log,
            Builtin::Exp2,
            Builtin::Log2,
            Builtin::Sqrt,
            Builtin::InverseSqrt,
            Builtin::Floor,
            Builtin::Ceil,
            Builtin::Fract,
            Builtin::Round,
            Builtin::Trunc,
            Builtin::Normalize,
        ] {
            add(builtin, Signature::new(UNARY, Ret::Gen));
        }
        add(Builtin::Abs, Signature::integral(UNARY, Ret::Gen));
        add(Builtin::Sign, Signature::integral(UNARY, Ret::Gen));

        add(Builtin::Atan, Signature::new(UNARY, Ret::Gen));
        add(Builtin::Atan, Signature::new(BINARY, Ret::Gen));
        add(Builtin::Pow, Signature::new(BINARY, Ret::Gen));
        add(Builtin::Mod, Signature::new(&[Gen, GenOrScalar], Ret::Gen));
        add(Builtin::Min, Signature::integral(&[Gen, GenOrScalar], Ret::Gen));
        add(Builtin::Max, Signature::integral(&[Gen, GenOrScalar], Ret::Gen));
        add(
            Builtin::Clamp,
            Signature::integral(&[Gen, GenOrScalar, GenOrScalar], Ret::Gen),
        );
        add(Builtin::Mix, Signature::new(&[Gen, Gen, GenOrScalar], Ret::Gen));
        add(Builtin::Step, Signature::new(&[GenOrScalar, Gen], Ret::Gen));
        add(
            Builtin::SmoothStep,
            Signature::new(&[GenOrScalar, GenOrScalar, Gen], Ret::Gen),
        );

        add(Builtin::Length, Signature::new(UNARY, Ret::Float));
        add(Builtin::Distance, Signature::new(BINARY, Ret::Float));
        add(Builtin::Dot, Signature::new(BINARY, Ret::Float));
        add(Builtin::Cross, Signature::new(&[Vec3, Vec3], Ret::Vec3));
        add(Builtin::Reflect, Signature::new(BINARY, Ret::Gen));
        add(Builtin::Refract, Signature::new(&[Gen, Gen, Float], Ret::Gen));
        add(Builtin::FaceForward, Signature::new(&[Gen, Gen, Gen], Ret::Gen));

        add(
            Builtin::MatrixCompMult,
            Signature::new(&[Matrix, Matrix], Ret::Matrix),
        );
        add(Builtin::Transpose, Signature::new(&[Matrix], Ret::Transposed));
        add(Builtin::Inverse, Signature::new(&[SquareMatrix], Ret::Matrix));
        add(Builtin::Determinant, Signature::new(&[SquareMatrix], Ret::Float));

        Self { signatures }
    }

    /// A process-wide instance, built on first use.
    pub fn shared() -> &'static Self {
        static TABLE: OnceLock<BuiltinTable> = OnceLock::new();
        TABLE.get_or_init(Self::new)
    }

    /// The overloads of `builtin`.
    pub fn signatures(&self, builtin: Builtin) -> &[Signature] {
        self.signatures.get(&builtin).map_or(&[], Vec::as_slice)
    }

    /// Resolves a call to `builtin` with the given argument types.
    pub fn resolve(&self, builtin: Builtin, args: &[Type]) -> Result<Type, TypeErrorKind> {
        let signatures = self.signatures(builtin);
        if let Some(ty) = signatures.iter().find_map(|sig| sig.resolve(args)) {
            return Ok(ty);
        }
        if signatures.iter().all(|sig| sig.params.len() != args.len()) {
            return Err(TypeErrorKind::ArityMismatch {
                function: builtin.name().to_string(),
                found: args.len(),
            });
        }
        let args: Vec<_> = args.iter().map(ToString::to_string).collect();
        Err(TypeErrorKind::ShapeMismatch(format!(
            "no overload of `{}` takes ({})",
            builtin.name(),
            args.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VEC2: Type = Type::vec(VectorSize::Bi);
    const VEC3: Type = Type::vec(VectorSize::Tri);
    const IVEC3: Type = Type::Vector {
        size: VectorSize::Tri,
        kind: ScalarKind::Int,
    };

    fn resolve(builtin: Builtin, args: &[Type]) -> Result<Type, TypeErrorKind> {
        BuiltinTable::shared().resolve(builtin, args)
    }

    #[test]
    fn every_builtin_has_a_signature() {
        let table = BuiltinTable::new();
        for builtin in Builtin::ALL {
            assert!(
                !table.signatures(builtin).is_empty(),
                "{} has no signature",
                builtin.name()
            );
        }
    }

    #[test]
    fn gen_type_follows_argument() {
        assert_eq!(resolve(Builtin::Sin, &[Type::FLOAT]), Ok(Type::FLOAT));
        assert_eq!(resolve(Builtin::Sin, &[VEC3.clone()]), Ok(VEC3));
        assert_eq!(resolve(Builtin::Length, &[VEC3.clone()]), Ok(Type::FLOAT));
        assert_eq!(resolve(Builtin::Sqrt, &[Type::INT]), Ok(Type::FLOAT));
        assert!(resolve(Builtin::Sin, &[Type::BOOL]).is_err());
    }

    #[test]
    fn scalar_alternatives() {
        assert_eq!(
            resolve(Builtin::Mix, &[VEC3.clone(), VEC3.clone(), Type::FLOAT]),
            Ok(VEC3)
        );
        assert_eq!(
            resolve(Builtin::Clamp, &[VEC2.clone(), Type::FLOAT, Type::FLOAT]),
            Ok(VEC2)
        );
        assert_eq!(
            resolve(Builtin::Step, &[Type::FLOAT, VEC3.clone()]),
            Ok(VEC3)
        );
        assert!(matches!(
            resolve(Builtin::Dot, &[VEC3.clone(), VEC2.clone()]),
            Err(TypeErrorKind::ShapeMismatch(_))
        ));
    }

    #[test]
    fn integral_overloads() {
        assert_eq!(resolve(Builtin::Abs, &[Type::INT]), Ok(Type::INT));
        assert_eq!(resolve(Builtin::Max, &[IVEC3.clone(), Type::INT]), Ok(IVEC3));
        assert_eq!(
            resolve(Builtin::Max, &[Type::INT, Type::FLOAT]),
            Ok(Type::FLOAT)
        );
    }

    #[test]
    fn atan_has_two_forms() {
        assert_eq!(resolve(Builtin::Atan, &[Type::FLOAT]), Ok(Type::FLOAT));
        assert_eq!(
            resolve(Builtin::Atan, &[Type::FLOAT, Type::FLOAT]),
            Ok(Type::FLOAT)
        );
        assert!(matches!(
            resolve(Builtin::Atan, &[Type::FLOAT; 3]),
            Err(TypeErrorKind::ArityMismatch { found: 3, .. })
        ));
    }

    #[test]
    fn matrix_builtins() {
        let mat2x3 = Type::Matrix {
            columns: VectorSize::Bi,
            rows: VectorSize::Tri,
        };
        let mat3x2 = Type::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Bi,
        };
        assert_eq!(resolve(Builtin::Transpose, &[mat2x3.clone()]), Ok(mat3x2));
        assert!(resolve(Builtin::Inverse, &[mat2x3.clone()]).is_err());
        assert_eq!(
            resolve(Builtin::Determinant, &[Type::mat(VectorSize::Quad)]),
            Ok(Type::FLOAT)
        );
        assert_eq!(
            resolve(Builtin::MatrixCompMult, &[mat2x3.clone(), mat2x3.clone()]),
            Ok(mat2x3)
        );
        assert_eq!(
            resolve(Builtin::Cross, &[VEC3.clone(), VEC3.clone()]),
            Ok(VEC3)
        );
    }
}
