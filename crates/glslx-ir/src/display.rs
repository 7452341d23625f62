//! GLSL source rendering.
//!
//! Every node renders as valid GLSL. Parentheses are inserted only where
//! precedence or associativity requires them, and float literals always
//! carry a decimal point so they never read back as integers.

use std::fmt::{self, Write as _};

use crate::Module;
use crate::expr::{BinaryOp, Expression, ExpressionKind, Literal, Swizzle, UnaryOp};
use crate::func::{Function, FunctionArgument, ParameterQualifier};
use crate::global::{GlobalVariable, Item, StorageQualifier, StructDeclaration};
use crate::stmt::{Block, Statement};
use crate::types::{ScalarKind, Type, VectorSize};

const INDENT: usize = 4;

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
        }
    }
}

impl fmt::Display for VectorSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u32)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Vector { size, kind } => match kind {
                ScalarKind::Float => write!(f, "vec{size}"),
                ScalarKind::Int => write!(f, "ivec{size}"),
                ScalarKind::Bool => write!(f, "bvec{size}"),
            },
            Self::Matrix { columns, rows } if columns == rows => write!(f, "mat{columns}"),
            Self::Matrix { columns, rows } => write!(f, "mat{columns}x{rows}"),
            Self::Array { base, size } => write!(f, "{base}[{size}]"),
            Self::Struct { name, .. } => write!(f, "{name}"),
            Self::Function { parameters, result } => {
                let params: Vec<_> = parameters.iter().map(ToString::to_string).collect();
                write!(f, "{result}({})", params.join(", "))
            }
            Self::Unknown => write!(f, "<unknown>"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&format_float(v)),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negate => write!(f, "-"),
            Self::Not => write!(f, "!"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &component in &self.pattern {
            f.write_char(self.letters.letter(component))?;
        }
        Ok(())
    }
}

impl fmt::Display for ParameterQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "in"),
            Self::Out => write!(f, "out"),
            Self::InOut => write!(f, "inout"),
        }
    }
}

impl fmt::Display for StorageQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const => write!(f, "const"),
            Self::Uniform => write!(f, "uniform"),
            Self::In => write!(f, "in"),
            Self::Out => write!(f, "out"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(format_statement(self, 0).trim_end())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_function(self))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&dump_module(self))
    }
}

/// Formats a float so that it always parses back as a float.
pub fn format_float(value: f32) -> String {
    if value.is_nan() {
        return "(0.0 / 0.0)".into();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("({sign}1.0 / 0.0)");
    }
    let mut s = value.to_string();
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

// Binding strength, loosest first.
const PREC_ASSIGN: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_UNARY: u8 = 9;
const PREC_POSTFIX: u8 = 10;
const PREC_PRIMARY: u8 = 11;

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::LogicalOr => 3,
        BinaryOp::LogicalAnd => 4,
        BinaryOp::Equal | BinaryOp::NotEqual => 5,
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => 6,
        BinaryOp::Add | BinaryOp::Subtract => 7,
        BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 8,
    }
}

fn is_negative_literal(expr: &Expression) -> bool {
    match expr.as_literal() {
        Some(Literal::Int(v)) => v < 0,
        Some(Literal::Float(v)) => v.is_sign_negative(),
        _ => false,
    }
}

fn precedence(expr: &Expression) -> u8 {
    match &expr.kind {
        ExpressionKind::Literal(_) if is_negative_literal(expr) => PREC_UNARY,
        ExpressionKind::Literal(_)
        | ExpressionKind::Identifier(_)
        | ExpressionKind::Call { .. } => PREC_PRIMARY,
        ExpressionKind::Field { .. } | ExpressionKind::Index { .. } => PREC_POSTFIX,
        ExpressionKind::Unary { .. } => PREC_UNARY,
        ExpressionKind::Binary { op, .. } => binary_precedence(*op),
        ExpressionKind::Conditional { .. } => PREC_CONDITIONAL,
        ExpressionKind::Assign { .. } => PREC_ASSIGN,
    }
}

fn write_operand(f: &mut impl fmt::Write, expr: &Expression, parens: bool) -> fmt::Result {
    if parens {
        f.write_char('(')?;
        write_expr(f, expr)?;
        f.write_char(')')
    } else {
        write_expr(f, expr)
    }
}

fn write_expr(f: &mut impl fmt::Write, expr: &Expression) -> fmt::Result {
    match &expr.kind {
        ExpressionKind::Literal(lit) => write!(f, "{lit}"),
        ExpressionKind::Identifier(name) => f.write_str(name),
        ExpressionKind::Field { base, field } => {
            write_operand(f, base, precedence(base) < PREC_POSTFIX)?;
            write!(f, ".{field}")
        }
        ExpressionKind::Index { base, index } => {
            write_operand(f, base, precedence(base) < PREC_POSTFIX)?;
            f.write_char('[')?;
            write_expr(f, index)?;
            f.write_char(']')
        }
        ExpressionKind::Unary { op, expr: operand } => {
            write!(f, "{op}")?;
            let nested_negation = matches!(
                operand.kind,
                ExpressionKind::Unary {
                    op: UnaryOp::Negate,
                    ..
                }
            ) || is_negative_literal(operand);
            write_operand(
                f,
                operand,
                precedence(operand) < PREC_UNARY || nested_negation,
            )
        }
        ExpressionKind::Binary { op, left, right } => {
            let prec = binary_precedence(*op);
            write_operand(f, left, precedence(left) < prec)?;
            write!(f, " {op} ")?;
            write_operand(f, right, precedence(right) <= prec)
        }
        ExpressionKind::Call {
            function,
            arguments,
        } => {
            write!(f, "{function}(")?;
            for (i, arg) in arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_operand(f, arg, precedence(arg) <= PREC_ASSIGN)?;
            }
            f.write_char(')')
        }
        ExpressionKind::Conditional {
            condition,
            accept,
            reject,
        } => {
            write_operand(f, condition, precedence(condition) <= PREC_CONDITIONAL)?;
            f.write_str(" ? ")?;
            write_operand(f, accept, precedence(accept) <= PREC_ASSIGN)?;
            f.write_str(" : ")?;
            write_operand(f, reject, precedence(reject) < PREC_CONDITIONAL)
        }
        ExpressionKind::Assign { op, target, value } => {
            write_expr(f, target)?;
            match op {
                Some(op) => write!(f, " {op}= ")?,
                None => f.write_str(" = ")?,
            }
            write_expr(f, value)
        }
    }
}

/// `float name`, or `float name[4]` for arrays.
fn declarator(ty: &Type, name: &str) -> String {
    match ty {
        Type::Array { base, size } => format!("{base} {name}[{size}]"),
        _ => format!("{ty} {name}"),
    }
}

fn simple_statement(stmt: &Statement) -> Option<String> {
    match stmt {
        Statement::Declaration { name, ty, init } => Some(match init {
            Some(init) => format!("{} = {init};", declarator(ty, name)),
            None => format!("{};", declarator(ty, name)),
        }),
        Statement::Expression(expr) => Some(format!("{expr};")),
        _ => None,
    }
}

fn write_block(out: &mut String, block: &Block, indent: usize) {
    for stmt in block {
        write_stmt(out, stmt, indent);
    }
}

fn write_stmt(out: &mut String, stmt: &Statement, indent: usize) {
    let pad = " ".repeat(indent);
    if let Some(line) = simple_statement(stmt) {
        out.push_str(&format!("{pad}{line}\n"));
        return;
    }
    match stmt {
        Statement::Return(Some(value)) => out.push_str(&format!("{pad}return {value};\n")),
        Statement::Return(None) => out.push_str(&format!("{pad}return;\n")),
        Statement::If {
            condition,
            accept,
            reject,
        } => {
            out.push_str(&format!("{pad}if ({condition}) {{\n"));
            write_else_chain(out, accept, reject, indent);
        }
        Statement::Loop {
            init: None,
            condition: Some(condition),
            step: None,
            body,
        } => {
            out.push_str(&format!("{pad}while ({condition}) {{\n"));
            write_block(out, body, indent + INDENT);
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::Loop {
            init,
            condition,
            step,
            body,
        } => {
            let init = init
                .as_deref()
                .and_then(simple_statement)
                .unwrap_or_else(|| ";".into());
            let condition = condition.as_ref().map(ToString::to_string).unwrap_or_default();
            let step = step.as_ref().map(ToString::to_string).unwrap_or_default();
            let header = format!("for ({init} {condition}; {step}")
                .trim_end()
                .to_string();
            out.push_str(&format!("{pad}{header}) {{\n"));
            write_block(out, body, indent + INDENT);
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::Block(block) => {
            out.push_str(&format!("{pad}{{\n"));
            write_block(out, block, indent + INDENT);
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::Break => out.push_str(&format!("{pad}break;\n")),
        Statement::Continue => out.push_str(&format!("{pad}continue;\n")),
        Statement::Declaration { .. } | Statement::Expression(_) => {}
    }
}

/// Writes the rest of an `if` after its header, folding a lone nested
/// `if` in the else block into `else if`.
fn write_else_chain(out: &mut String, accept: &Block, reject: &Block, indent: usize) {
    let pad = " ".repeat(indent);
    write_block(out, accept, indent + INDENT);
    match reject.as_slice() {
        [] => out.push_str(&format!("{pad}}}\n")),
        [
            Statement::If {
                condition,
                accept,
                reject,
            },
        ] => {
            out.push_str(&format!("{pad}}} else if ({condition}) {{\n"));
            write_else_chain(out, accept, reject, indent);
        }
        _ => {
            out.push_str(&format!("{pad}}} else {{\n"));
            write_block(out, reject, indent + INDENT);
            out.push_str(&format!("{pad}}}\n"));
        }
    }
}

/// Renders a statement at the given indentation, one line per simple
/// statement, with a trailing newline.
pub fn format_statement(stmt: &Statement, indent: usize) -> String {
    let mut out = String::new();
    write_stmt(&mut out, stmt, indent);
    out
}

fn format_argument(arg: &FunctionArgument) -> String {
    match arg.qualifier {
        ParameterQualifier::In => declarator(&arg.ty, &arg.name),
        qualifier => format!("{qualifier} {}", declarator(&arg.ty, &arg.name)),
    }
}

/// Renders a function definition.
pub fn format_function(func: &Function) -> String {
    let args: Vec<_> = func.arguments.iter().map(format_argument).collect();
    let mut out = format!("{} {}({}) {{\n", func.result, func.name, args.join(", "));
    write_block(&mut out, &func.body, INDENT);
    out.push_str("}\n");
    out
}

fn format_struct(decl: &StructDeclaration) -> String {
    let mut out = format!("struct {} {{\n", decl.name);
    for member in &decl.members {
        out.push_str(&format!(
            "{}{};\n",
            " ".repeat(INDENT),
            declarator(&member.ty, &member.name)
        ));
    }
    out.push_str("};\n");
    out
}

fn format_global(var: &GlobalVariable) -> String {
    let mut out = String::new();
    if let Some(qualifier) = var.qualifier {
        out.push_str(&format!("{qualifier} "));
    }
    out.push_str(&declarator(&var.ty, &var.name));
    if let Some(init) = &var.init {
        out.push_str(&format!(" = {init}"));
    }
    out.push_str(";\n");
    out
}

/// Renders a whole module as GLSL source, items separated by blank lines.
pub fn dump_module(module: &Module) -> String {
    let rendered: Vec<_> = module
        .items
        .iter()
        .map(|item| match item {
            Item::Struct(decl) => format_struct(decl),
            Item::Global(var) => format_global(var),
            Item::Function(func) => format_function(func),
        })
        .collect();
    rendered.join("\n")
}
