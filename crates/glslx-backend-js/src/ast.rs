//! A small JavaScript syntax tree, just large enough for lowered GLSL.

/// A JavaScript expression.
#[derive(Clone, Debug, PartialEq)]
pub enum JsExpr {
    /// A numeric literal, already formatted.
    Number(String),
    Bool(bool),
    /// A name or a dotted path such as `vec3.add`.
    Ident(String),
    Member {
        object: Box<JsExpr>,
        property: String,
    },
    Index {
        object: Box<JsExpr>,
        index: Box<JsExpr>,
    },
    Unary {
        op: JsUnaryOp,
        expr: Box<JsExpr>,
    },
    Binary {
        op: JsBinaryOp,
        left: Box<JsExpr>,
        right: Box<JsExpr>,
    },
    Conditional {
        condition: Box<JsExpr>,
        accept: Box<JsExpr>,
        reject: Box<JsExpr>,
    },
    Call {
        callee: Box<JsExpr>,
        arguments: Vec<JsExpr>,
    },
    Array(Vec<JsExpr>),
    /// An object literal; property order is preserved.
    Object(Vec<(String, JsExpr)>),
    Assign {
        op: Option<JsBinaryOp>,
        target: Box<JsExpr>,
        value: Box<JsExpr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsUnaryOp {
    Minus,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    StrictEq,
    StrictNe,
    And,
    Or,
}

impl JsBinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::StrictEq => "===",
            Self::StrictNe => "!==",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl JsExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    pub fn int(value: i64) -> Self {
        Self::Number(value.to_string())
    }

    /// A float literal in the shortest form that reads back as `value`.
    pub fn float(value: f32) -> Self {
        let text = if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
        } else {
            value.to_string()
        };
        Self::Number(text)
    }

    /// `callee(arguments...)` where `callee` is a name or dotted path.
    pub fn call(callee: impl Into<String>, arguments: Vec<JsExpr>) -> Self {
        Self::Call {
            callee: Box::new(Self::Ident(callee.into())),
            arguments,
        }
    }

    pub fn unary(op: JsUnaryOp, expr: JsExpr) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: JsBinaryOp, left: JsExpr, right: JsExpr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn index(object: JsExpr, index: JsExpr) -> Self {
        Self::Index {
            object: Box::new(object),
            index: Box::new(index),
        }
    }

    pub fn member(object: JsExpr, property: impl Into<String>) -> Self {
        Self::Member {
            object: Box::new(object),
            property: property.into(),
        }
    }

    pub fn conditional(condition: JsExpr, accept: JsExpr, reject: JsExpr) -> Self {
        Self::Conditional {
            condition: Box::new(condition),
            accept: Box::new(accept),
            reject: Box::new(reject),
        }
    }

    pub fn assign(op: Option<JsBinaryOp>, target: JsExpr, value: JsExpr) -> Self {
        Self::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        }
    }
}

/// A JavaScript statement.
#[derive(Clone, Debug, PartialEq)]
pub enum JsStmt {
    Let {
        name: String,
        init: JsExpr,
    },
    Expr(JsExpr),
    Return(Option<JsExpr>),
    /// An empty `reject` block means no `else`.
    If {
        condition: JsExpr,
        accept: Vec<JsStmt>,
        reject: Vec<JsStmt>,
    },
    /// `for (init; condition; step)`, or `while (condition)` when there
    /// is neither an initializer nor a step.
    For {
        init: Option<Box<JsStmt>>,
        condition: Option<JsExpr>,
        step: Option<JsExpr>,
        body: Vec<JsStmt>,
    },
    Block(Vec<JsStmt>),
    Break,
    Continue,
}

/// A function parameter with its JSDoc type.
#[derive(Clone, Debug, PartialEq)]
pub struct JsParam {
    pub name: String,
    pub doc_type: String,
}

/// An exported function.
#[derive(Clone, Debug, PartialEq)]
pub struct JsFunction {
    pub name: String,
    pub params: Vec<JsParam>,
    /// JSDoc return type; `None` for `void`.
    pub returns: Option<String>,
    pub body: Vec<JsStmt>,
}

/// A top-level item.
#[derive(Clone, Debug, PartialEq)]
pub enum JsItem {
    /// A JSDoc `@typedef` for a struct.
    Typedef {
        name: String,
        properties: Vec<JsParam>,
    },
    /// `export const`
    Const {
        name: String,
        doc_type: String,
        value: JsExpr,
    },
    /// `export let`, with a `set<Name>` function when the host provides
    /// the value.
    Let {
        name: String,
        doc_type: String,
        value: JsExpr,
        setter: bool,
    },
    Function(JsFunction),
}

/// A lowered translation unit, without the runtime preamble.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsModule {
    pub items: Vec<JsItem>,
}
