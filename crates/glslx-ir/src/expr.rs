//! Expressions: typed, exclusively-owned trees.

use crate::error::IrError;
use crate::types::{ScalarKind, Type, VectorSize};

/// A literal constant value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Float(f32),
}

impl Literal {
    /// Returns the scalar kind of this literal.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::Float(_) => ScalarKind::Float,
        }
    }

    /// Numeric value, if this is an `int` or `float` literal.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(f64::from(v)),
            Self::Float(v) => Some(f64::from(v)),
            Self::Bool(_) => None,
        }
    }

    /// A literal of the given kind holding `value`.
    pub fn of_kind(kind: ScalarKind, value: f64) -> Self {
        match kind {
            ScalarKind::Bool => Self::Bool(value != 0.0),
            ScalarKind::Int => Self::Int(value as i32),
            ScalarKind::Float => Self::Float(value as f32),
        }
    }
}

/// A unary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// A binary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    /// Operators that produce a `bool` from two operands.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Less
                | Self::LessEqual
                | Self::Greater
                | Self::GreaterEqual
                | Self::Equal
                | Self::NotEqual
        )
    }

    /// Operators usable in compound assignment (`+=`, `-=`, `*=`, `/=`).
    pub fn is_compound_assignable(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }
}

/// A vector swizzle component.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum SwizzleComponent {
    X = 0,
    Y = 1,
    Z = 2,
    W = 3,
}

impl SwizzleComponent {
    /// Zero-based component index.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The letter set a swizzle was written with.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SwizzleLetters {
    /// `xyzw`
    Position,
    /// `rgba`
    Color,
    /// `stpq`
    Texture,
}

impl SwizzleLetters {
    fn alphabet(self) -> [char; 4] {
        match self {
            Self::Position => ['x', 'y', 'z', 'w'],
            Self::Color => ['r', 'g', 'b', 'a'],
            Self::Texture => ['s', 't', 'p', 'q'],
        }
    }

    fn of(letter: char) -> Option<(Self, SwizzleComponent)> {
        const COMPONENTS: [SwizzleComponent; 4] = [
            SwizzleComponent::X,
            SwizzleComponent::Y,
            SwizzleComponent::Z,
            SwizzleComponent::W,
        ];
        [Self::Position, Self::Color, Self::Texture]
            .into_iter()
            .find_map(|set| {
                let index = set.alphabet().iter().position(|&c| c == letter)?;
                Some((set, COMPONENTS[index]))
            })
    }

    /// The letter for a component in this set.
    pub fn letter(self, component: SwizzleComponent) -> char {
        self.alphabet()[component.index()]
    }
}

/// A parsed swizzle selector such as `.xyz` or `.ba`.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Swizzle {
    pub pattern: Vec<SwizzleComponent>,
    pub letters: SwizzleLetters,
}

impl Swizzle {
    /// Parses a field name as a swizzle. All letters must come from the
    /// same set and there may be at most four of them.
    pub fn parse(field: &str) -> Result<Self, IrError> {
        let invalid = || IrError::InvalidSwizzle(field.to_string());
        if field.is_empty() || field.chars().count() > 4 {
            return Err(invalid());
        }
        let mut letters = None;
        let mut pattern = Vec::with_capacity(4);
        for c in field.chars() {
            let (set, component) = SwizzleLetters::of(c).ok_or_else(invalid)?;
            if *letters.get_or_insert(set) != set {
                return Err(invalid());
            }
            pattern.push(component);
        }
        Ok(Self {
            pattern,
            letters: letters.ok_or_else(invalid)?,
        })
    }

    /// Number of selected components.
    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// Type of `base.<self>`: a scalar for one selector, else a vector.
    pub fn result_type(&self, base: &Type) -> Result<Type, IrError> {
        let invalid = || IrError::InvalidSwizzle(self.to_string());
        let Type::Vector { size, kind } = *base else {
            return Err(invalid());
        };
        if self.pattern.iter().any(|c| c.index() >= size.count()) {
            return Err(invalid());
        }
        match VectorSize::from_count(self.len()) {
            Some(size) => Ok(Type::Vector { size, kind }),
            None => Ok(Type::Scalar(kind)),
        }
    }

    /// Returns `true` if this selects every component of a `size` vector
    /// in order (e.g. `.xyz` on a `vec3`).
    pub fn is_identity(&self, size: VectorSize) -> bool {
        self.len() == size.count() && self.pattern.iter().enumerate().all(|(i, c)| c.index() == i)
    }

    /// Returns `true` if no component is selected twice.
    pub fn is_distinct(&self) -> bool {
        let mut seen = [false; 4];
        self.pattern
            .iter()
            .all(|c| !std::mem::replace(&mut seen[c.index()], true))
    }
}

/// A built-in GLSL function.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Builtin {
    // Angle and trigonometry
    Radians,
    Degrees,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    // Exponential
    Pow,
    Exp,
    Log,
    Exp2,
    Log2,
    Sqrt,
    InverseSqrt,
    // Common
    Abs,
    Sign,
    Floor,
    Ceil,
    Round,
    Trunc,
    Fract,
    Mod,
    Min,
    Max,
    Clamp,
    Mix,
    Step,
    SmoothStep,
    // Geometric
    Length,
    Distance,
    Dot,
    Cross,
    Normalize,
    FaceForward,
    Reflect,
    Refract,
    // Matrix
    MatrixCompMult,
    Transpose,
    Inverse,
    Determinant,
}

impl Builtin {
    /// Every built-in, in declaration order.
    pub const ALL: [Self; 44] = [
        Self::Radians,
        Self::Degrees,
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::Asin,
        Self::Acos,
        Self::Atan,
        Self::Sinh,
        Self::Cosh,
        Self::Tanh,
        Self::Pow,
        Self::Exp,
        Self::Log,
        Self::Exp2,
        Self::Log2,
        Self::Sqrt,
        Self::InverseSqrt,
        Self::Abs,
        Self::Sign,
        Self::Floor,
        Self::Ceil,
        Self::Round,
        Self::Trunc,
        Self::Fract,
        Self::Mod,
        Self::Min,
        Self::Max,
        Self::Clamp,
        Self::Mix,
        Self::Step,
        Self::SmoothStep,
        Self::Length,
        Self::Distance,
        Self::Dot,
        Self::Cross,
        Self::Normalize,
        Self::FaceForward,
        Self::Reflect,
        Self::Refract,
        Self::MatrixCompMult,
        Self::Transpose,
        Self::Inverse,
        Self::Determinant,
    ];

    /// The GLSL spelling of this built-in.
    pub fn name(self) -> &'static str {
        match self {
            Self::Radians => "radians",
            Self::Degrees => "degrees",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Pow => "pow",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Exp2 => "exp2",
            Self::Log2 => "log2",
            Self::Sqrt => "sqrt",
            Self::InverseSqrt => "inversesqrt",
            Self::Abs => "abs",
            Self::Sign => "sign",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
            Self::Trunc => "trunc",
            Self::Fract => "fract",
            Self::Mod => "mod",
            Self::Min => "min",
            Self::Max => "max",
            Self::Clamp => "clamp",
            Self::Mix => "mix",
            Self::Step => "step",
            Self::SmoothStep => "smoothstep",
            Self::Length => "length",
            Self::Distance => "distance",
            Self::Dot => "dot",
            Self::Cross => "cross",
            Self::Normalize => "normalize",
            Self::FaceForward => "faceforward",
            Self::Reflect => "reflect",
            Self::Refract => "refract",
            Self::MatrixCompMult => "matrixCompMult",
            Self::Transpose => "transpose",
            Self::Inverse => "inverse",
            Self::Determinant => "determinant",
        }
    }

    /// Looks up a built-in by its GLSL name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

/// An expression node together with its resolved type.
///
/// Children are boxed and owned exclusively by their parent, so an
/// expression is always a tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    /// [`Type::Unknown`] until type inference has annotated the node.
    pub ty: Type,
}

/// The shape of an expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum ExpressionKind {
    /// A literal constant.
    Literal(Literal),
    /// A reference to a variable, parameter or global.
    Identifier(String),
    /// Struct member access or vector swizzle, depending on the base type.
    Field {
        base: Box<Expression>,
        field: String,
    },
    /// Array, vector or matrix-column indexing.
    Index {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    /// Apply a unary operator.
    Unary { op: UnaryOp, expr: Box<Expression> },
    /// Apply a binary operator.
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// A call to a built-in, a type constructor or a user function.
    Call {
        function: String,
        arguments: Vec<Expression>,
    },
    /// `condition ? accept : reject`
    Conditional {
        condition: Box<Expression>,
        accept: Box<Expression>,
        reject: Box<Expression>,
    },
    /// Plain (`op == None`) or compound assignment. Only valid as the
    /// top-level expression of a statement.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expression>,
        value: Box<Expression>,
    },
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: Type) -> Self {
        Self { kind, ty }
    }

    /// A node that has not been through type inference yet.
    pub fn untyped(kind: ExpressionKind) -> Self {
        Self::new(kind, Type::Unknown)
    }

    pub fn literal(literal: Literal) -> Self {
        Self::new(ExpressionKind::Literal(literal), Type::Scalar(literal.kind()))
    }

    pub fn float(value: f32) -> Self {
        Self::literal(Literal::Float(value))
    }

    pub fn int(value: i32) -> Self {
        Self::literal(Literal::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::literal(Literal::Bool(value))
    }

    pub fn identifier(name: impl Into<String>, ty: Type) -> Self {
        Self::new(ExpressionKind::Identifier(name.into()), ty)
    }

    /// A call node with an explicitly supplied result type.
    pub fn call(function: impl Into<String>, arguments: Vec<Expression>, ty: Type) -> Self {
        Self::new(
            ExpressionKind::Call {
                function: function.into(),
                arguments,
            },
            ty,
        )
    }

    /// A unary node typed from its operand.
    pub fn unary(op: UnaryOp, expr: Expression) -> Result<Self, IrError> {
        let ty = expr.ty.unary_result(op)?;
        Ok(Self::new(
            ExpressionKind::Unary {
                op,
                expr: Box::new(expr),
            },
            ty,
        ))
    }

    /// A binary node typed from its operands.
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Result<Self, IrError> {
        let ty = left.ty.binary_result(op, &right.ty)?;
        Ok(Self::new(
            ExpressionKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
        ))
    }

    /// A swizzle or struct-member access typed from the base.
    pub fn field(base: Expression, field: impl Into<String>) -> Result<Self, IrError> {
        let field = field.into();
        let ty = match &base.ty {
            Type::Vector { .. } => Swizzle::parse(&field)?.result_type(&base.ty)?,
            other => other
                .member(&field)
                .cloned()
                .ok_or_else(|| IrError::UnknownField {
                    ty: other.clone(),
                    field: field.clone(),
                })?,
        };
        Ok(Self::new(
            ExpressionKind::Field {
                base: Box::new(base),
                field,
            },
            ty,
        ))
    }

    /// An indexing node typed from the base.
    pub fn index(base: Expression, index: Expression) -> Result<Self, IrError> {
        let ty = base
            .ty
            .element_type()
            .ok_or_else(|| IrError::NotIndexable(base.ty.clone()))?;
        Ok(Self::new(
            ExpressionKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            ty,
        ))
    }

    /// A conditional node; both branches must have the same type.
    pub fn conditional(
        condition: Expression,
        accept: Expression,
        reject: Expression,
    ) -> Result<Self, IrError> {
        if accept.ty != reject.ty {
            return Err(IrError::BranchMismatch {
                accept: accept.ty,
                reject: reject.ty,
            });
        }
        let ty = accept.ty.clone();
        Ok(Self::new(
            ExpressionKind::Conditional {
                condition: Box::new(condition),
                accept: Box::new(accept),
                reject: Box::new(reject),
            },
            ty,
        ))
    }

    /// A constant of type `ty` built from `value`: a literal for scalars,
    /// a single-argument constructor for vectors and matrices. For a
    /// matrix this is `value` times the identity, as in GLSL.
    pub fn constant(ty: &Type, value: f64) -> Option<Self> {
        match ty {
            Type::Scalar(kind) if kind.is_numeric() => {
                Some(Self::literal(Literal::of_kind(*kind, value)))
            }
            Type::Vector { kind, .. } if kind.is_numeric() => Some(Self::call(
                ty.to_string(),
                vec![Self::literal(Literal::of_kind(*kind, value))],
                ty.clone(),
            )),
            Type::Matrix { .. } => Some(Self::call(
                ty.to_string(),
                vec![Self::float(value as f32)],
                ty.clone(),
            )),
            _ => None,
        }
    }

    /// The additive identity of `ty`.
    pub fn zero(ty: &Type) -> Option<Self> {
        Self::constant(ty, 0.0)
    }

    /// The multiplicative identity of `ty` (the identity matrix for
    /// matrices).
    pub fn one(ty: &Type) -> Option<Self> {
        Self::constant(ty, 1.0)
    }

    /// The literal, if this node is one.
    pub fn as_literal(&self) -> Option<Literal> {
        match self.kind {
            ExpressionKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Operator and operands, if this is a binary node.
    pub fn as_binary(&self) -> Option<(BinaryOp, &Expression, &Expression)> {
        match &self.kind {
            ExpressionKind::Binary { op, left, right } => Some((*op, left, right)),
            _ => None,
        }
    }

    /// Operator and operand, if this is a unary node.
    pub fn as_unary(&self) -> Option<(UnaryOp, &Expression)> {
        match &self.kind {
            ExpressionKind::Unary { op, expr } => Some((*op, expr)),
            _ => None,
        }
    }

    /// Callee name and arguments, if this is a call.
    pub fn as_call(&self) -> Option<(&str, &[Expression])> {
        match &self.kind {
            ExpressionKind::Call {
                function,
                arguments,
            } => Some((function, arguments)),
            _ => None,
        }
    }

    /// The built-in this node calls, if any.
    pub fn builtin(&self) -> Option<Builtin> {
        Builtin::from_name(self.as_call()?.0)
    }

    /// The value of a numeric literal or of a single-literal constructor
    /// such as `vec3(0.0)` or `mat2(1.0)`.
    pub fn splat_value(&self) -> Option<f64> {
        match &self.kind {
            ExpressionKind::Literal(lit) => lit.as_f64(),
            ExpressionKind::Call {
                function,
                arguments,
            } if arguments.len() == 1
                && (self.ty.is_vector() || self.ty.is_matrix())
                && Type::from_glsl_name(function).as_ref() == Some(&self.ty) =>
            {
                arguments[0].as_literal()?.as_f64()
            }
            _ => None,
        }
    }

    /// Returns `true` for literal or splatted zero.
    pub fn is_zero(&self) -> bool {
        self.splat_value() == Some(0.0)
    }

    /// Returns `true` for literal one, a splatted one vector, or the
    /// identity matrix.
    pub fn is_one(&self) -> bool {
        self.splat_value() == Some(1.0)
    }

    /// Returns `true` if the value is fixed at compile time: built only
    /// from literals, operators, constructors and built-in calls.
    pub fn is_constant(&self) -> bool {
        match &self.kind {
            ExpressionKind::Literal(_) => true,
            ExpressionKind::Identifier(_) | ExpressionKind::Assign { .. } => false,
            ExpressionKind::Call {
                function,
                arguments,
            } => {
                (Type::from_glsl_name(function).is_some() || Builtin::from_name(function).is_some())
                    && arguments.iter().all(Expression::is_constant)
            }
            _ => self.children().into_iter().all(Expression::is_constant),
        }
    }

    /// Returns `true` if `name` occurs as an identifier anywhere in the tree.
    pub fn references(&self, name: &str) -> bool {
        match &self.kind {
            ExpressionKind::Identifier(ident) => ident == name,
            _ => self.children().into_iter().any(|child| child.references(name)),
        }
    }

    /// The parsed swizzle, if this is a field access on a vector.
    pub fn swizzle(&self) -> Option<Swizzle> {
        match &self.kind {
            ExpressionKind::Field { base, field } if base.ty.is_vector() => {
                Swizzle::parse(field).ok()
            }
            _ => None,
        }
    }

    /// Returns `true` if the node can be assigned to.
    pub fn is_lvalue(&self) -> bool {
        match &self.kind {
            ExpressionKind::Identifier(_) => true,
            ExpressionKind::Field { base, .. } => {
                base.is_lvalue() && self.swizzle().is_none_or(|s| s.is_distinct())
            }
            ExpressionKind::Index { base, .. } => base.is_lvalue(),
            _ => false,
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            ExpressionKind::Literal(_) | ExpressionKind::Identifier(_) => Vec::new(),
            ExpressionKind::Field { base, .. } => vec![base.as_ref()],
            ExpressionKind::Index { base, index } => vec![base.as_ref(), index.as_ref()],
            ExpressionKind::Unary { expr, .. } => vec![expr.as_ref()],
            ExpressionKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExpressionKind::Call { arguments, .. } => arguments.iter().collect(),
            ExpressionKind::Conditional {
                condition,
                accept,
                reject,
            } => vec![condition.as_ref(), accept.as_ref(), reject.as_ref()],
            ExpressionKind::Assign { target, value, .. } => vec![target.as_ref(), value.as_ref()],
        }
    }

    /// Direct children, mutably.
    pub fn children_mut(&mut self) -> Vec<&mut Expression> {
        match &mut self.kind {
            ExpressionKind::Literal(_) | ExpressionKind::Identifier(_) => Vec::new(),
            ExpressionKind::Field { base, .. } => vec![base.as_mut()],
            ExpressionKind::Index { base, index } => vec![base.as_mut(), index.as_mut()],
            ExpressionKind::Unary { expr, .. } => vec![expr.as_mut()],
            ExpressionKind::Binary { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            ExpressionKind::Call { arguments, .. } => arguments.iter_mut().collect(),
            ExpressionKind::Conditional {
                condition,
                accept,
                reject,
            } => vec![condition.as_mut(), accept.as_mut(), reject.as_mut()],
            ExpressionKind::Assign { target, value, .. } => vec![target.as_mut(), value.as_mut()],
        }
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Expression::node_count)
            .sum::<usize>()
    }
}
