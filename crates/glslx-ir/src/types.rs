//! Type system for GLSL values.

use crate::error::IrError;
use crate::expr::{BinaryOp, UnaryOp};

/// The kind of a scalar, or of the components of a vector.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ScalarKind {
    /// Boolean.
    Bool,
    /// Signed 32-bit integer.
    Int,
    /// 32-bit floating point.
    Float,
}

impl ScalarKind {
    /// Returns `true` for kinds that support arithmetic.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Bool)
    }

    /// The kind both operands convert to, following GLSL's implicit
    /// `int -> float` conversion.
    fn unify(self, other: Self) -> Option<Self> {
        match (self, other) {
            (a, b) if a == b && a.is_numeric() => Some(a),
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => Some(Self::Float),
            _ => None,
        }
    }
}

/// Number of components in a vector, or columns/rows of a matrix.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum VectorSize {
    /// 2 components.
    Bi = 2,
    /// 3 components.
    Tri = 3,
    /// 4 components.
    Quad = 4,
}

impl VectorSize {
    /// Converts a component count into a vector size.
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            2 => Some(Self::Bi),
            3 => Some(Self::Tri),
            4 => Some(Self::Quad),
            _ => None,
        }
    }

    /// Number of components.
    pub fn count(self) -> usize {
        self as usize
    }
}

/// A named member of a struct type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
}

/// A GLSL type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Type {
    /// No value (function results only).
    Void,
    /// A single scalar.
    Scalar(ScalarKind),
    /// A vector of 2–4 scalars.
    Vector { size: VectorSize, kind: ScalarKind },
    /// A float matrix of column vectors (`matCxR`).
    Matrix {
        columns: VectorSize,
        rows: VectorSize,
    },
    /// A fixed-size array.
    Array { base: Box<Type>, size: u32 },
    /// A user-declared struct.
    Struct {
        name: String,
        members: Vec<StructMember>,
    },
    /// A function signature.
    Function {
        parameters: Vec<Type>,
        result: Box<Type>,
    },
    /// Not yet inferred.
    Unknown,
}

impl Type {
    pub const BOOL: Self = Self::Scalar(ScalarKind::Bool);
    pub const INT: Self = Self::Scalar(ScalarKind::Int);
    pub const FLOAT: Self = Self::Scalar(ScalarKind::Float);

    /// A float vector (`vecN`).
    pub const fn vec(size: VectorSize) -> Self {
        Self::Vector {
            size,
            kind: ScalarKind::Float,
        }
    }

    /// A square float matrix (`matN`).
    pub const fn mat(size: VectorSize) -> Self {
        Self::Matrix {
            columns: size,
            rows: size,
        }
    }

    /// Resolves a built-in GLSL type name such as `vec3`, `ivec2`,
    /// `mat2x3` or `float`.
    pub fn from_glsl_name(name: &str) -> Option<Self> {
        let size_of = |digit: &str| -> Option<VectorSize> {
            VectorSize::from_count(digit.parse().ok()?)
        };
        match name {
            "void" => return Some(Self::Void),
            "bool" => return Some(Self::BOOL),
            "int" => return Some(Self::INT),
            "float" => return Some(Self::FLOAT),
            _ => {}
        }
        if let Some(rest) = name.strip_prefix("mat") {
            return match rest.split_once('x') {
                Some((columns, rows)) => Some(Self::Matrix {
                    columns: size_of(columns)?,
                    rows: size_of(rows)?,
                }),
                None => Some(Self::mat(size_of(rest)?)),
            };
        }
        let (kind, rest) = if let Some(rest) = name.strip_prefix("ivec") {
            (ScalarKind::Int, rest)
        } else if let Some(rest) = name.strip_prefix("bvec") {
            (ScalarKind::Bool, rest)
        } else {
            (ScalarKind::Float, name.strip_prefix("vec")?)
        };
        Some(Self::Vector {
            size: size_of(rest)?,
            kind,
        })
    }

    /// Returns `true` if no part of this type is [`Type::Unknown`].
    pub fn is_known(&self) -> bool {
        match self {
            Self::Unknown => false,
            Self::Array { base, .. } => base.is_known(),
            Self::Struct { members, .. } => members.iter().all(|m| m.ty.is_known()),
            Self::Function { parameters, result } => {
                parameters.iter().all(Type::is_known) && result.is_known()
            }
            _ => true,
        }
    }

    /// Scalar kind of a scalar or vector type.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match *self {
            Self::Scalar(kind) | Self::Vector { kind, .. } => Some(kind),
            Self::Matrix { .. } => Some(ScalarKind::Float),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::Matrix { .. })
    }

    /// `float` or a float vector: GLSL's `genType`.
    pub fn is_gen_float(&self) -> bool {
        matches!(
            self,
            Self::Scalar(ScalarKind::Float)
                | Self::Vector {
                    kind: ScalarKind::Float,
                    ..
                }
        )
    }

    /// Size of a vector type.
    pub fn vector_size(&self) -> Option<VectorSize> {
        match *self {
            Self::Vector { size, .. } => Some(size),
            _ => None,
        }
    }

    /// Total number of scalar components of a scalar, vector or matrix.
    pub fn component_count(&self) -> Option<usize> {
        match *self {
            Self::Scalar(_) => Some(1),
            Self::Vector { size, .. } => Some(size.count()),
            Self::Matrix { columns, rows } => Some(columns.count() * rows.count()),
            _ => None,
        }
    }

    /// The same shape with a different scalar kind.
    pub fn with_kind(&self, kind: ScalarKind) -> Option<Self> {
        match *self {
            Self::Scalar(_) => Some(Self::Scalar(kind)),
            Self::Vector { size, .. } => Some(Self::Vector { size, kind }),
            _ => None,
        }
    }

    /// The type produced by `base[i]`.
    pub fn element_type(&self) -> Option<Self> {
        match self {
            Self::Array { base, .. } => Some((**base).clone()),
            Self::Vector { kind, .. } => Some(Self::Scalar(*kind)),
            Self::Matrix { rows, .. } => Some(Self::vec(*rows)),
            _ => None,
        }
    }

    /// Looks up a struct member by name.
    pub fn member(&self, name: &str) -> Option<&Type> {
        match self {
            Self::Struct { members, .. } => members.iter().find(|m| m.name == name).map(|m| &m.ty),
            _ => None,
        }
    }

    /// Returns `true` if a value of this type converts implicitly to
    /// `target` (identity, or `int`-based to `float`-based of equal shape).
    pub fn converts_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (Self::Scalar(ScalarKind::Int), Self::Scalar(ScalarKind::Float)) => true,
            (
                Self::Vector {
                    size: a,
                    kind: ScalarKind::Int,
                },
                Self::Vector {
                    size: b,
                    kind: ScalarKind::Float,
                },
            ) => a == b,
            _ => false,
        }
    }

    /// Result type of applying a unary operator.
    pub fn unary_result(&self, op: UnaryOp) -> Result<Self, IrError> {
        let ok = match op {
            UnaryOp::Negate => {
                self.is_matrix() || self.scalar_kind().is_some_and(ScalarKind::is_numeric)
            }
            UnaryOp::Not => *self == Self::BOOL,
        };
        if ok {
            Ok(self.clone())
        } else {
            Err(IrError::UnaryMismatch {
                op,
                operand: self.clone(),
            })
        }
    }

    /// Result type of `self op rhs`, following GLSL's operator rules.
    ///
    /// `==` and `!=` compare whole values and always produce a scalar
    /// `bool`; component-wise comparison is the `equal()` family of
    /// built-ins, which this model does not include.
    pub fn binary_result(&self, op: BinaryOp, rhs: &Type) -> Result<Self, IrError> {
        let result = match op {
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                (*self == Self::BOOL && *rhs == Self::BOOL).then_some(Self::BOOL)
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                let comparable = !matches!(self, Self::Void | Self::Function { .. })
                    && (self.converts_to(rhs) || rhs.converts_to(self));
                comparable.then_some(Self::BOOL)
            }
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                match (self, rhs) {
                    (Self::Scalar(a), Self::Scalar(b)) => a.unify(*b).map(|_| Self::BOOL),
                    _ => None,
                }
            }
            BinaryOp::Modulo => component_wise(self, rhs)
                .filter(|ty| ty.scalar_kind() == Some(ScalarKind::Int)),
            BinaryOp::Multiply if self.is_matrix() || rhs.is_matrix() => {
                linear_product(self, rhs).or_else(|| scaled_matrix(self, rhs))
            }
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
                component_wise(self, rhs)
            }
        };
        result.ok_or_else(|| IrError::ShapeMismatch {
            op,
            left: self.clone(),
            right: rhs.clone(),
        })
    }
}

/// Component-wise result of two scalar/vector/matrix operands, with
/// scalar broadcasting.
fn component_wise(left: &Type, right: &Type) -> Option<Type> {
    match (left, right) {
        (Type::Scalar(a), Type::Scalar(b)) => a.unify(*b).map(Type::Scalar),
        (Type::Scalar(a), Type::Vector { size, kind })
        | (Type::Vector { size, kind }, Type::Scalar(a)) => a.unify(*kind).map(|kind| {
            Type::Vector { size: *size, kind }
        }),
        (
            Type::Vector { size: s1, kind: k1 },
            Type::Vector { size: s2, kind: k2 },
        ) if s1 == s2 => k1.unify(*k2).map(|kind| Type::Vector { size: *s1, kind }),
        (Type::Matrix { .. }, Type::Matrix { .. }) if left == right => Some(left.clone()),
        _ => scaled_matrix(left, right),
    }
}

/// A matrix combined with a numeric scalar.
fn scaled_matrix(left: &Type, right: &Type) -> Option<Type> {
    match (left, right) {
        (Type::Matrix { .. }, Type::Scalar(kind)) if kind.is_numeric() => Some(left.clone()),
        (Type::Scalar(kind), Type::Matrix { .. }) if kind.is_numeric() => Some(right.clone()),
        _ => None,
    }
}

/// Linear-algebra product involving at least one matrix.
fn linear_product(left: &Type, right: &Type) -> Option<Type> {
    match (left, right) {
        (Type::Matrix { columns, rows }, Type::Vector { size, kind })
            if size == columns && kind.is_numeric() =>
        {
            Some(Type::vec(*rows))
        }
        (Type::Vector { size, kind }, Type::Matrix { columns, rows })
            if size == rows && kind.is_numeric() =>
        {
            Some(Type::vec(*columns))
        }
        (
            Type::Matrix {
                columns: c1,
                rows: r1,
            },
            Type::Matrix {
                columns: c2,
                rows: r2,
            },
        ) if c1 == r2 => Some(Type::Matrix {
            columns: *c2,
            rows: *r1,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VEC3: Type = Type::vec(VectorSize::Tri);
    const MAT3: Type = Type::mat(VectorSize::Tri);

    #[test]
    fn glsl_type_names() {
        assert_eq!(Type::from_glsl_name("float"), Some(Type::FLOAT));
        assert_eq!(Type::from_glsl_name("vec3"), Some(VEC3));
        assert_eq!(
            Type::from_glsl_name("ivec2"),
            Some(Type::Vector {
                size: VectorSize::Bi,
                kind: ScalarKind::Int
            })
        );
        assert_eq!(Type::from_glsl_name("mat3"), Some(MAT3));
        assert_eq!(
            Type::from_glsl_name("mat2x4"),
            Some(Type::Matrix {
                columns: VectorSize::Bi,
                rows: VectorSize::Quad
            })
        );
        assert_eq!(Type::from_glsl_name("vec5"), None);
        assert_eq!(Type::from_glsl_name("light"), None);
    }

    #[test]
    fn scalar_vector_broadcast() {
        let ty = Type::FLOAT.binary_result(BinaryOp::Multiply, &VEC3).unwrap();
        assert_eq!(ty, VEC3);
        let ty = VEC3.binary_result(BinaryOp::Add, &Type::FLOAT).unwrap();
        assert_eq!(ty, VEC3);
    }

    #[test]
    fn int_promotes_to_float() {
        let ty = Type::INT.binary_result(BinaryOp::Add, &Type::FLOAT).unwrap();
        assert_eq!(ty, Type::FLOAT);
        assert!(Type::INT.converts_to(&Type::FLOAT));
        assert!(!Type::FLOAT.converts_to(&Type::INT));
    }

    #[test]
    fn vector_sizes_must_match() {
        let vec2 = Type::vec(VectorSize::Bi);
        assert!(VEC3.binary_result(BinaryOp::Add, &vec2).is_err());
    }

    #[test]
    fn matrix_products_are_linear() {
        assert_eq!(
            MAT3.binary_result(BinaryOp::Multiply, &VEC3).unwrap(),
            VEC3
        );
        assert_eq!(
            VEC3.binary_result(BinaryOp::Multiply, &MAT3).unwrap(),
            VEC3
        );
        let mat2x3 = Type::Matrix {
            columns: VectorSize::Bi,
            rows: VectorSize::Tri,
        };
        let mat3x2 = Type::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Bi,
        };
        // 3 rows x 2 columns times 2 rows x 3 columns.
        assert_eq!(
            mat2x3.binary_result(BinaryOp::Multiply, &mat3x2).unwrap(),
            MAT3
        );
        // Same-shape non-square matrices do not multiply.
        assert!(mat2x3.binary_result(BinaryOp::Multiply, &mat2x3).is_err());
    }

    #[test]
    fn matrix_add_is_component_wise() {
        assert_eq!(MAT3.binary_result(BinaryOp::Add, &MAT3).unwrap(), MAT3);
        let mat4 = Type::mat(VectorSize::Quad);
        let err = VEC3.binary_result(BinaryOp::Add, &mat4).unwrap_err();
        assert!(matches!(err, IrError::ShapeMismatch { .. }));
    }

    #[test]
    fn comparisons_need_scalars() {
        assert_eq!(
            Type::FLOAT.binary_result(BinaryOp::Less, &Type::INT).unwrap(),
            Type::BOOL
        );
        assert!(VEC3.binary_result(BinaryOp::Less, &VEC3).is_err());
    }

    #[test]
    fn equality_yields_scalar_bool() {
        assert_eq!(
            VEC3.binary_result(BinaryOp::Equal, &VEC3).unwrap(),
            Type::BOOL
        );
        assert!(VEC3.binary_result(BinaryOp::NotEqual, &MAT3).is_err());
    }

    #[test]
    fn modulo_is_integral() {
        assert!(Type::INT.binary_result(BinaryOp::Modulo, &Type::INT).is_ok());
        assert!(
            Type::FLOAT
                .binary_result(BinaryOp::Modulo, &Type::FLOAT)
                .is_err()
        );
    }

    #[test]
    fn logical_operators() {
        assert!(Type::BOOL.binary_result(BinaryOp::LogicalAnd, &Type::BOOL).is_ok());
        assert!(Type::INT.binary_result(BinaryOp::LogicalOr, &Type::BOOL).is_err());
        assert!(Type::BOOL.unary_result(UnaryOp::Not).is_ok());
        assert!(Type::FLOAT.unary_result(UnaryOp::Not).is_err());
        assert!(MAT3.unary_result(UnaryOp::Negate).is_ok());
    }

    #[test]
    fn element_types() {
        assert_eq!(VEC3.element_type(), Some(Type::FLOAT));
        assert_eq!(MAT3.element_type(), Some(VEC3));
        let array = Type::Array {
            base: Box::new(VEC3),
            size: 4,
        };
        assert_eq!(array.element_type(), Some(VEC3));
        assert_eq!(Type::FLOAT.element_type(), None);
    }

    #[test]
    fn unknown_is_not_known() {
        assert!(!Type::Unknown.is_known());
        let array = Type::Array {
            base: Box::new(Type::Unknown),
            size: 2,
        };
        assert!(!array.is_known());
        assert!(VEC3.is_known());
    }
}
